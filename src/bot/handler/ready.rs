use std::sync::Arc;

use serenity::all::{ChannelId, Context, Ready};
use tracing::{debug, info, warn};

use crate::{
    bot::outlet::DiscordOutlet,
    services::trivia_service::{self, TriviaOutlet},
    state::{SharedState, community::Community},
};

pub async fn handle(state: &SharedState, ctx: &Context, ready: &Ready) {
    info!(user = %ready.user.name, "connected to Discord");

    for community in Community::ALL {
        let channel = ChannelId::new(state.config().community(community).channel);
        if let Err(err) = channel.to_channel(ctx).await {
            warn!(%community, %channel, error = %err, "community channel is not reachable");
        }
    }

    let outlet: Arc<dyn TriviaOutlet> = Arc::new(DiscordOutlet::new(ctx.http.clone(), state.config()));
    state.install_outlet(outlet.clone()).await;

    // Storage may still be connecting; resuming waits for it.
    let state = state.clone();
    tokio::spawn(async move {
        state.wait_for_store().await;
        match trivia_service::resume_if_enabled(&state, outlet).await {
            Ok(true) => info!("resumed trivia posting"),
            Ok(false) => debug!("trivia posting not enabled or already running"),
            Err(err) => warn!(error = %err, "failed to resume trivia posting"),
        }
    });
}
