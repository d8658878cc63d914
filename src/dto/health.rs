use serde::Serialize;

/// Payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: &'static str,
    /// Whether the trivia loop runs in this process.
    pub trivia: bool,
}

impl HealthResponse {
    /// Storage reachable.
    pub fn ok(trivia: bool) -> Self {
        Self {
            status: "ok",
            trivia,
        }
    }

    /// Running without storage.
    pub fn degraded(trivia: bool) -> Self {
        Self {
            status: "degraded",
            trivia,
        }
    }
}
