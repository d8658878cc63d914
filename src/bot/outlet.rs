use std::sync::Arc;

use futures::future::BoxFuture;
use serenity::all::{ChannelId, CreateAttachment, CreateMessage, EditChannel, Http};
use tracing::warn;

use crate::{
    bot::render,
    config::AppConfig,
    dao::models::{AttachmentEntity, TriviaQuestionEntity},
    error::PlatformError,
    services::trivia_service::TriviaOutlet,
    state::{community::Community, scheduler::RoundExpiry},
};

/// [`TriviaOutlet`] posting to the two configured community channels.
#[derive(Clone)]
pub struct DiscordOutlet {
    http: Arc<Http>,
    itto: ChannelId,
    shenhe: ChannelId,
}

impl DiscordOutlet {
    /// Outlet for the channels named in `config`.
    pub fn new(http: Arc<Http>, config: &AppConfig) -> Self {
        Self {
            http,
            itto: ChannelId::new(config.community(Community::Itto).channel),
            shenhe: ChannelId::new(config.community(Community::Shenhe).channel),
        }
    }

    fn channel(&self, community: Community) -> ChannelId {
        match community {
            Community::Itto => self.itto,
            Community::Shenhe => self.shenhe,
        }
    }
}

/// Download stored attachments so they can be re-uploaded. Attachments that can no longer
/// be fetched are skipped.
pub async fn fetch_attachments(http: &Http, attachments: &[AttachmentEntity]) -> Vec<CreateAttachment> {
    let mut files = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        match CreateAttachment::url(http, &attachment.url).await {
            Ok(mut file) => {
                file.filename = attachment.filename.clone();
                files.push(file);
            }
            Err(err) => warn!(error = %err, url = %attachment.url, "failed to fetch attachment"),
        }
    }
    files
}

impl TriviaOutlet for DiscordOutlet {
    fn post_question(
        &self,
        community: Community,
        question: TriviaQuestionEntity,
    ) -> BoxFuture<'static, Result<(), PlatformError>> {
        let outlet = self.clone();
        Box::pin(async move {
            let files = fetch_attachments(&outlet.http, &question.attachments).await;
            let message = CreateMessage::new()
                .embed(render::question_embed(&question))
                .add_files(files);
            outlet
                .channel(community)
                .send_message(&outlet.http, message)
                .await?;
            Ok(())
        })
    }

    fn announce_expired(
        &self,
        expiry: RoundExpiry,
    ) -> BoxFuture<'static, Result<(), PlatformError>> {
        let outlet = self.clone();
        Box::pin(async move {
            let message = CreateMessage::new().embed(render::expired_embed(&expiry));
            outlet
                .channel(expiry.community)
                .send_message(&outlet.http, message)
                .await?;
            Ok(())
        })
    }

    fn set_slowmode(&self, seconds: u16) -> BoxFuture<'static, Result<(), PlatformError>> {
        let outlet = self.clone();
        Box::pin(async move {
            for community in Community::ALL {
                outlet
                    .channel(community)
                    .edit(&outlet.http, EditChannel::new().rate_limit_per_user(seconds))
                    .await?;
            }
            Ok(())
        })
    }
}
