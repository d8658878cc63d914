use serde::{Deserialize, Serialize};

use crate::state::community::Community;

/// File attached to a trivia question, re-uploaded whenever the question is posted.
///
/// Older documents name the file `name`, or not at all; the name then comes from the URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "RawAttachment")]
pub struct AttachmentEntity {
    /// Download URL of the original upload.
    pub url: String,
    /// File name shown in the chat client.
    pub filename: String,
}

#[derive(Deserialize)]
struct RawAttachment {
    url: String,
    #[serde(default, alias = "name")]
    filename: Option<String>,
}

impl From<RawAttachment> for AttachmentEntity {
    fn from(raw: RawAttachment) -> Self {
        let filename = raw
            .filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| filename_from_url(&raw.url));
        Self {
            url: raw.url,
            filename,
        }
    }
}

fn filename_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => "attachment".to_owned(),
    }
}

/// Trivia question as stored in the `trivia` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriviaQuestionEntity {
    /// Opaque 32 character lowercase hexadecimal identifier.
    pub id: String,
    /// Question text, posted verbatim.
    pub question: String,
    /// Ordered attachments posted alongside the question.
    #[serde(default)]
    pub attachments: Vec<AttachmentEntity>,
    /// Accepted answers, lowercased at creation time.
    pub answers: Vec<String>,
    /// Set once the question has been posted; used questions are never selected again.
    #[serde(default)]
    pub used: bool,
}

/// Per-user running totals as stored in the `points` collection.
///
/// Missing fields are zero scores and not disqualified; a missing record means the same.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreRecordEntity {
    /// Discord user id, stored as a string since snowflakes overflow signed 64-bit BSON.
    pub user: String,
    /// Points earned in the Itto channel.
    #[serde(default)]
    pub itto: f64,
    /// Points earned in the Shenhe channel.
    #[serde(default)]
    pub shenhe: f64,
    /// Moderator-set disqualification flag.
    #[serde(default)]
    pub dq: bool,
}

impl ScoreRecordEntity {
    /// Empty record for `user`.
    pub fn new(user: u64) -> Self {
        Self {
            user: user.to_string(),
            itto: 0.0,
            shenhe: 0.0,
            dq: false,
        }
    }

    /// Points held for `community`.
    pub fn points(&self, community: Community) -> f64 {
        match community {
            Community::Itto => self.itto,
            Community::Shenhe => self.shenhe,
        }
    }

    /// Add `amount` to the `community` total.
    pub fn add_points(&mut self, community: Community, amount: f64) {
        match community {
            Community::Itto => self.itto += amount,
            Community::Shenhe => self.shenhe += amount,
        }
    }

    /// Numeric user id, if the stored value is a valid snowflake.
    pub fn user_id(&self) -> Option<u64> {
        self.user.parse().ok()
    }
}
