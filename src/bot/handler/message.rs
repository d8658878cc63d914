use serenity::all::{
    ChannelId, Context, CreateAllowedMentions, CreateAttachment, CreateEmbed, CreateMessage,
    GuildId, Message, MessageId, UserId,
};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    bot::{
        commands::{CommunityCommand, ModeratorCommand, requires_ban_permission},
        outlet::fetch_attachments,
        render,
    },
    config::AppConfig,
    dao::models::AttachmentEntity,
    error::{PlatformError, ServiceError},
    services::{
        authoring_service::{self, AuthoringStep},
        leaderboard_service, question_service, registry_service, scoring_service,
    },
    state::{SharedState, authoring::MessageRef, community::Community},
};

pub async fn handle(state: &SharedState, ctx: &Context, msg: &Message) {
    if msg.author.bot {
        return;
    }

    let result = match msg.guild_id {
        None => handle_direct(state, ctx, msg).await,
        Some(guild) => handle_guild(state, ctx, msg, guild).await,
    };
    if let Err(err) = result {
        warn!(error = %err, channel = %msg.channel_id, author = %msg.author.id, "failed to handle message");
    }
}

async fn handle_direct(state: &SharedState, ctx: &Context, msg: &Message) -> Result<(), ServiceError> {
    let author = msg.author.id.get();
    if !state.config().is_author(author) {
        return Ok(());
    }

    if let Some(command) = ModeratorCommand::parse(&msg.content) {
        return handle_moderator(state, ctx, msg, command).await;
    }

    let attachments = msg
        .attachments
        .iter()
        .map(|attachment| AttachmentEntity {
            url: attachment.url.clone(),
            filename: attachment.filename.clone(),
        })
        .collect();
    let step = authoring_service::handle_direct_message(
        state,
        author,
        &msg.content,
        attachments,
        Instant::now(),
    )
    .await?;

    match step {
        AuthoringStep::Ignored => {}
        AuthoringStep::Started {
            question,
            attachment_count,
        } => {
            let prompt = msg
                .channel_id
                .send_message(
                    &ctx.http,
                    CreateMessage::new()
                        .embed(render::setup_embed(&question, attachment_count))
                        .components(vec![render::setup_buttons()]),
                )
                .await?;
            state.authoring().attach_prompt(
                author,
                MessageRef {
                    channel_id: prompt.channel_id.get(),
                    message_id: prompt.id.get(),
                },
            );
        }
        AuthoringStep::NoAnswers => {
            msg.channel_id
                .say(&ctx.http, "Please specify at least one answer.")
                .await?;
        }
        AuthoringStep::Created { question, prompt } => {
            if let Some(prompt) = prompt {
                let deleted = ChannelId::new(prompt.channel_id)
                    .delete_message(&ctx.http, MessageId::new(prompt.message_id))
                    .await;
                if let Err(err) = deleted {
                    debug!(error = %err, "setup prompt already gone");
                }
            }
            msg.channel_id
                .send_message(
                    &ctx.http,
                    CreateMessage::new()
                        .embed(render::created_embed(&question))
                        .components(vec![render::created_buttons(&question.id)]),
                )
                .await?;
        }
    }
    Ok(())
}

async fn handle_moderator(
    state: &SharedState,
    ctx: &Context,
    msg: &Message,
    command: ModeratorCommand,
) -> Result<(), ServiceError> {
    let channel = msg.channel_id;
    match command {
        ModeratorCommand::Start => {
            let outlet = state
                .outlet()
                .await
                .ok_or(ServiceError::Platform(PlatformError::NotConnected))?;
            question_service::start_posting(state, outlet).await?;
            channel.say(&ctx.http, "Trivia posting started.").await?;
        }
        ModeratorCommand::Cooldown(minutes) => {
            let store = state.require_store().await?;
            question_service::set_cooldown(store.as_ref(), minutes).await?;
            channel.say(&ctx.http, render::cooldown_reply(minutes)).await?;
        }
        ModeratorCommand::List => {
            let store = state.require_store().await?;
            let text = question_service::export_questions(store.as_ref()).await?;
            let file = CreateAttachment::bytes(text.into_bytes(), "questions.txt");
            channel
                .send_message(&ctx.http, CreateMessage::new().add_file(file))
                .await?;
        }
        ModeratorCommand::Count => {
            let store = state.require_store().await?;
            let count = question_service::count_questions(store.as_ref()).await?;
            channel.say(&ctx.http, render::count_reply(count)).await?;
        }
        ModeratorCommand::Delete(id) => {
            let store = state.require_store().await?;
            let reply = match question_service::delete_question(store.as_ref(), &id).await {
                Ok(_) => "Question deleted.",
                Err(ServiceError::NotFound(_)) => "Question not found.",
                Err(err) => return Err(err),
            };
            channel.say(&ctx.http, reply).await?;
        }
        ModeratorCommand::Search(needle) => {
            let store = state.require_store().await?;
            let hits = question_service::search_questions(store.as_ref(), &needle).await?;
            if hits.is_empty() {
                channel
                    .say(&ctx.http, "Search did not return any results.")
                    .await?;
            }
            for question in hits {
                let files = fetch_attachments(&ctx.http, &question.attachments).await;
                channel
                    .send_message(
                        &ctx.http,
                        CreateMessage::new()
                            .embed(render::search_embed(&question))
                            .add_files(files),
                    )
                    .await?;
            }
        }
        ModeratorCommand::Usage(text) => {
            channel.say(&ctx.http, text).await?;
        }
    }
    Ok(())
}

/// Where a guild message goes. Commands are answered and, in a community channel, the
/// message is scored like any other.
#[derive(Debug, PartialEq, Eq)]
struct GuildRoute {
    command: Option<CommunityCommand>,
    community: Option<Community>,
}

impl GuildRoute {
    fn resolve(config: &AppConfig, channel: u64, content: &str) -> Self {
        Self {
            command: CommunityCommand::parse(content),
            community: config.community_for_channel(channel),
        }
    }
}

async fn handle_guild(
    state: &SharedState,
    ctx: &Context,
    msg: &Message,
    guild: GuildId,
) -> Result<(), ServiceError> {
    let route = GuildRoute::resolve(state.config(), msg.channel_id.get(), &msg.content);

    if let Some(command) = route.command {
        if let Err(err) = handle_community(state, ctx, msg, guild, command).await {
            warn!(error = %err, channel = %msg.channel_id, "failed to handle community command");
        }
    }

    let Some(community) = route.community else {
        return Ok(());
    };
    let outcome = scoring_service::record_message(
        state,
        msg.author.id.get(),
        community,
        &msg.content,
        msg.timestamp.timestamp_millis(),
    )
    .await?;

    if let Some(win) = outcome.win {
        msg.channel_id
            .send_message(
                &ctx.http,
                CreateMessage::new()
                    .embed(render::answered_embed(&win))
                    .reference_message(msg),
            )
            .await?;
    }
    Ok(())
}

async fn handle_community(
    state: &SharedState,
    ctx: &Context,
    msg: &Message,
    guild: GuildId,
    command: CommunityCommand,
) -> Result<(), ServiceError> {
    if requires_ban_permission(&msg.content) && !can_ban(ctx, guild, msg).await {
        msg.react(&ctx.http, '❌').await?;
        return Ok(());
    }

    match command {
        CommunityCommand::Help => {
            reply_embed(ctx, msg, render::help_embed()).await?;
        }
        CommunityCommand::Score(target) => {
            let user = target.unwrap_or_else(|| msg.author.id.get());
            let Some((name, avatar)) = lookup_user(ctx, guild, user).await else {
                reply_text(ctx, msg, format!("Could not find a user with ID `{user}`!")).await?;
                return Ok(());
            };
            let store = state.require_store().await?;
            let card = leaderboard_service::score_card(store.as_ref(), user).await?;
            let mut reply = CreateMessage::new()
                .embed(render::score_embed(&card, &name, Some(avatar)))
                .reference_message(msg)
                .allowed_mentions(CreateAllowedMentions::new());
            if let Some(notice) = render::disqualified_notice(&card, user == msg.author.id.get()) {
                reply = reply.content(notice);
            }
            msg.channel_id.send_message(&ctx.http, reply).await?;
        }
        CommunityCommand::Leaderboard { page } => {
            let community = state
                .config()
                .community_for_server(guild.get())
                .unwrap_or(Community::Shenhe);
            let store = state.require_store().await?;
            let board = leaderboard_service::leaderboard(store.as_ref(), community, page).await?;
            reply_embed(ctx, msg, render::leaderboard_embed(&board)).await?;
        }
        CommunityCommand::Disqualify(user) => {
            set_disqualified(state, ctx, msg, user, true).await?;
        }
        CommunityCommand::Pardon(user) => {
            set_disqualified(state, ctx, msg, user, false).await?;
        }
        CommunityCommand::Usage(text) => {
            reply_text(ctx, msg, text).await?;
        }
    }
    Ok(())
}

async fn set_disqualified(
    state: &SharedState,
    ctx: &Context,
    msg: &Message,
    user: u64,
    disqualified: bool,
) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    registry_service::set_disqualified(store.as_ref(), user, disqualified).await?;
    reply_text(ctx, msg, render::moderation_reply(disqualified, user)).await?;
    Ok(())
}

async fn can_ban(ctx: &Context, guild: GuildId, msg: &Message) -> bool {
    let member = match guild.member(ctx, msg.author.id).await {
        Ok(member) => member,
        Err(err) => {
            debug!(error = %err, "could not resolve command author as a member");
            return false;
        }
    };
    #[allow(deprecated)]
    let permissions = member.permissions(&ctx.cache);
    permissions.is_ok_and(|permissions| permissions.ban_members())
}

/// Display name and avatar of `user`, preferring their guild profile.
async fn lookup_user(ctx: &Context, guild: GuildId, user: u64) -> Option<(String, String)> {
    let id = UserId::new(user);
    if let Ok(member) = guild.member(ctx, id).await {
        return Some((member.display_name().to_owned(), member.face()));
    }
    match id.to_user(ctx).await {
        Ok(user) => Some((user.name.clone(), user.face())),
        Err(err) => {
            debug!(error = %err, user, "user lookup failed");
            None
        }
    }
}

async fn reply_text(ctx: &Context, msg: &Message, text: String) -> Result<(), PlatformError> {
    msg.channel_id
        .send_message(
            &ctx.http,
            CreateMessage::new()
                .content(text)
                .reference_message(msg)
                .allowed_mentions(CreateAllowedMentions::new()),
        )
        .await?;
    Ok(())
}

async fn reply_embed(
    ctx: &Context,
    msg: &Message,
    embed: CreateEmbed,
) -> Result<(), PlatformError> {
    msg.channel_id
        .send_message(
            &ctx.http,
            CreateMessage::new()
                .embed(embed)
                .reference_message(msg)
                .allowed_mentions(CreateAllowedMentions::new()),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.itto.channel = 10;
        config.shenhe.channel = 20;
        config
    }

    #[test]
    fn commands_in_community_channels_are_also_scored() {
        let route = GuildRoute::resolve(&config(), 10, "%score");
        assert_eq!(route.command, Some(CommunityCommand::Score(None)));
        assert_eq!(route.community, Some(Community::Itto));

        let malformed = GuildRoute::resolve(&config(), 20, "%score 1 2");
        assert!(matches!(malformed.command, Some(CommunityCommand::Usage(_))));
        assert_eq!(malformed.community, Some(Community::Shenhe));
    }

    #[test]
    fn other_channels_only_answer_commands() {
        let route = GuildRoute::resolve(&config(), 99, "%help");
        assert_eq!(route.command, Some(CommunityCommand::Help));
        assert_eq!(route.community, None);

        let chatter = GuildRoute::resolve(&config(), 10, "hello");
        assert_eq!(chatter.command, None);
        assert_eq!(chatter.community, Some(Community::Itto));
    }
}
