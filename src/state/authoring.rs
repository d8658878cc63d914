use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::dao::models::AttachmentEntity;

/// How long a started question waits for its answers.
pub const AUTHORING_TTL: Duration = Duration::from_secs(300);

/// Location of a message the bot sent, so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    /// Channel holding the message.
    pub channel_id: u64,
    /// Message id.
    pub message_id: u64,
}

/// A question waiting for its answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthoring {
    /// When the question text was received.
    pub started_at: Instant,
    /// Question text.
    pub question: String,
    /// Attachments sent with the question.
    pub attachments: Vec<AttachmentEntity>,
    /// Setup prompt the bot replied with.
    pub prompt: Option<MessageRef>,
}

impl PendingAuthoring {
    /// Whether the session is still within [`AUTHORING_TTL`] at `now`.
    pub fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) < AUTHORING_TTL
    }
}

/// In-progress questions keyed by author id. At most one per author.
#[derive(Debug, Default)]
pub struct AuthoringSessions {
    pending: DashMap<u64, PendingAuthoring>,
}

impl AuthoringSessions {
    /// No sessions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the author's session if it is still live. A stale session is
    /// discarded.
    pub fn take_live(&self, author: u64, now: Instant) -> Option<PendingAuthoring> {
        let (_, session) = self.pending.remove(&author)?;
        session.is_live(now).then_some(session)
    }

    /// Start a session, replacing any previous one.
    pub fn begin(&self, author: u64, session: PendingAuthoring) {
        self.pending.insert(author, session);
    }

    /// Remember the setup prompt for the author's session.
    pub fn attach_prompt(&self, author: u64, prompt: MessageRef) {
        if let Some(mut session) = self.pending.get_mut(&author) {
            session.prompt = Some(prompt);
        }
    }

    /// Put back a session taken with [`Self::take_live`] that could not be completed.
    pub fn restore(&self, author: u64, session: PendingAuthoring) {
        self.pending.entry(author).or_insert(session);
    }

    /// Drop the author's session whatever its age. Returns whether one existed.
    pub fn cancel(&self, author: u64) -> bool {
        self.pending.remove(&author).is_some()
    }

    /// Whether the author has a session, live or not.
    pub fn contains(&self, author: u64) -> bool {
        self.pending.contains_key(&author)
    }
}

/// Split an answer message into lowercased answers, one per line.
pub fn parse_answers(text: &str) -> Vec<String> {
    text.split(['\r', '\n', '\x0c'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(started_at: Instant) -> PendingAuthoring {
        PendingAuthoring {
            started_at,
            question: "2+2?".into(),
            attachments: Vec::new(),
            prompt: None,
        }
    }

    #[test]
    fn answers_split_on_any_line_break() {
        assert_eq!(
            parse_answers("Four\r\n 4 \x0c\n\nFOUR"),
            vec!["four", "4", "four"]
        );
        assert!(parse_answers("\n \r\n").is_empty());
    }

    #[test]
    fn live_sessions_are_taken_once() {
        let sessions = AuthoringSessions::new();
        let now = Instant::now();
        sessions.begin(1, session(now));

        assert!(sessions.take_live(1, now + Duration::from_secs(299)).is_some());
        assert!(sessions.take_live(1, now).is_none());
    }

    #[test]
    fn stale_sessions_are_discarded() {
        let sessions = AuthoringSessions::new();
        let now = Instant::now();
        sessions.begin(1, session(now));

        assert!(sessions.take_live(1, now + AUTHORING_TTL).is_none());
        assert!(!sessions.contains(1));
    }

    #[test]
    fn cancel_ignores_age_and_prompt_is_recorded() {
        let sessions = AuthoringSessions::new();
        sessions.begin(1, session(Instant::now()));
        let prompt = MessageRef {
            channel_id: 5,
            message_id: 6,
        };
        sessions.attach_prompt(1, prompt);

        let taken = sessions.take_live(1, Instant::now()).unwrap();
        assert_eq!(taken.prompt, Some(prompt));
        sessions.restore(1, taken);

        assert!(sessions.cancel(1));
        assert!(!sessions.cancel(1));
    }
}
