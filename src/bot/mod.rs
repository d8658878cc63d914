//! Discord gateway surface: event handling, command parsing and message rendering.

pub mod commands;
pub mod handler;
pub mod outlet;
pub mod render;

use serenity::all::{Client, GatewayIntents};
use tracing::info;

use crate::{error::PlatformError, state::SharedState};

use self::handler::Handler;

/// Connect to the gateway and process events until the client shuts down.
pub async fn start_bot(state: SharedState) -> Result<(), PlatformError> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let token = state.config().discord_token.clone();

    let mut client = Client::builder(&token, intents)
        .event_handler(Handler::new(state))
        .await?;

    info!("starting Discord bot");
    client.start().await?;
    Ok(())
}
