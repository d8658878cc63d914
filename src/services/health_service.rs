use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping storage and report whether the bot is degraded.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let trivia = state.trivia_running();
    match state.require_store().await {
        Ok(store) => match store.health_check().await {
            Ok(()) => HealthResponse::ok(trivia),
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                HealthResponse::degraded(trivia)
            }
        },
        Err(_) => {
            warn!("storage unavailable (degraded mode)");
            HealthResponse::degraded(trivia)
        }
    }
}
