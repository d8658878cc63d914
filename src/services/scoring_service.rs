use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

use crate::{
    error::ServiceError,
    services::trivia_service,
    state::{
        SharedState,
        community::Community,
        scheduler::{RoundWin, TRIVIA_BONUS},
    },
};

/// How often stale activity timestamps are dropped.
pub const ACTIVITY_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Result of scoring one channel message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageOutcome {
    /// Points credited to the author, bonus included.
    pub points: f64,
    /// Set when the message answered the open trivia question.
    pub win: Option<RoundWin>,
}

/// Score a message sent by `user` in the `community` channel at `at_ms` (Unix millis).
///
/// Every message counts towards chat activity and earns decaying points, disqualified
/// authors and command messages included. Nothing is recorded while storage is unavailable. A correct trivia answer adds [`TRIVIA_BONUS`] to the same increment.
pub async fn record_message(
    state: &SharedState,
    user: u64,
    community: Community,
    content: &str,
    at_ms: i64,
) -> Result<MessageOutcome, ServiceError> {
    let store = state.require_store().await?;
    state.scheduler().lock().await.record_activity();
    let mut points = state.activity().score_message(user, at_ms);

    let win = match trivia_service::try_answer(state, user, community, content).await {
        Ok(win) => win,
        Err(err) => {
            warn!(error = %err, user, "could not resolve trivia answer");
            None
        }
    };
    if win.is_some() {
        points += TRIVIA_BONUS;
    }

    store.increment_score(user, community, points).await?;
    debug!(user, %community, points, "scored message");

    Ok(MessageOutcome { points, win })
}

/// Periodically forget users whose next message would earn full points anyway.
pub async fn run_activity_sweep(state: SharedState) {
    let mut ticker = interval(ACTIVITY_SWEEP_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let removed = state.activity().prune(now_millis());
        if removed > 0 {
            debug!(removed, remaining = state.activity().len(), "pruned activity timestamps");
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::contest_store::{ContestStore, memory::MemoryContestStore},
        state::AppState,
    };

    async fn state_with_store() -> (SharedState, MemoryContestStore) {
        let store = MemoryContestStore::new();
        let state = AppState::new(AppConfig::default());
        state.install_store(Arc::new(store.clone())).await;
        (state, store)
    }

    #[tokio::test]
    async fn messages_accrue_decaying_points() {
        let (state, store) = state_with_store().await;

        record_message(&state, 1, Community::Itto, "hi", 0).await.unwrap();
        let second = record_message(&state, 1, Community::Itto, "hi", 20_000)
            .await
            .unwrap();
        record_message(&state, 1, Community::Shenhe, "hi", 60_000)
            .await
            .unwrap();

        assert_eq!(second.points, 5.0);
        let record = store.find_score(1).await.unwrap().unwrap();
        assert_eq!(record.itto, 15.0);
        assert_eq!(record.shenhe, 10.0);
    }

    #[tokio::test]
    async fn disqualified_users_still_accrue() {
        let (state, store) = state_with_store().await;
        store.set_disqualified(2, true).await.unwrap();

        record_message(&state, 2, Community::Shenhe, "hello", 0)
            .await
            .unwrap();
        assert_eq!(store.find_score(2).await.unwrap().unwrap().shenhe, 10.0);
    }

    #[tokio::test]
    async fn every_message_counts_as_activity() {
        let (state, _store) = state_with_store().await;
        for at in 0..3 {
            record_message(&state, 3, Community::Itto, "x", at).await.unwrap();
        }
        assert_eq!(state.scheduler().lock().await.counters().recent_messages, 3);
    }

    #[tokio::test]
    async fn degraded_mode_rejects_scoring() {
        let state = AppState::new(AppConfig::default());
        let err = record_message(&state, 1, Community::Itto, "hi", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
        assert!(state.activity().is_empty());
        assert_eq!(state.scheduler().lock().await.counters().recent_messages, 0);
    }

    #[tokio::test]
    async fn command_messages_are_scored_and_counted() {
        let (state, store) = state_with_store().await;

        let outcome = record_message(&state, 4, Community::Itto, "%score", 0)
            .await
            .unwrap();

        assert_eq!(outcome.points, 10.0);
        assert_eq!(store.find_score(4).await.unwrap().unwrap().itto, 10.0);
        assert_eq!(state.scheduler().lock().await.counters().recent_messages, 1);
        assert_eq!(state.activity().score_message(4, 4_000), 1.0);
    }
}
