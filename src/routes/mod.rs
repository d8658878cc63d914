use axum::Router;

use crate::state::SharedState;

/// Health check route.
pub mod health;

/// Compose all route trees and wire in the shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router().with_state(state)
}
