mod interaction;
mod message;
mod ready;

use serenity::all::{Context, EventHandler, Interaction, Message, Ready};
use serenity::async_trait;

use crate::state::SharedState;

/// Gateway event handler. Each event is handled to completion; failures are logged and
/// never escape the handler.
pub struct Handler {
    state: SharedState,
}

impl Handler {
    /// Handler operating on `state`.
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        ready::handle(&self.state, &ctx, &ready).await;
    }

    async fn message(&self, ctx: Context, message: Message) {
        message::handle(&self.state, &ctx, &message).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        interaction::handle(&self.state, &ctx, interaction).await;
    }
}
