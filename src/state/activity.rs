use dashmap::DashMap;

/// Points granted for a message sent after a full ramp (or a user's first message).
pub const MAX_MESSAGE_POINTS: f64 = 10.0;
/// Milliseconds of silence that earn one point.
pub const MS_PER_POINT: f64 = 4_000.0;
/// Gap after which a message is worth [`MAX_MESSAGE_POINTS`].
pub const RAMP_MS: i64 = 40_000;
/// Extra age an entry must reach before it is pruned. Pruning compares the host clock
/// with message timestamps, so an entry is only dropped well past the ramp.
pub const PRUNE_SLACK_MS: i64 = 600_000;

/// Last-message timestamps per user, in milliseconds since the Unix epoch.
///
/// Entries are independent; a user's timestamp is only touched by that user's messages.
#[derive(Debug, Default)]
pub struct ActivityTracker {
    last_seen: DashMap<u64, i64>,
}

impl ActivityTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Points earned by a message from `user` created at `at_ms`. The user's timestamp is
    /// updated regardless of the amount awarded.
    pub fn score_message(&self, user: u64, at_ms: i64) -> f64 {
        match self.last_seen.insert(user, at_ms) {
            None => MAX_MESSAGE_POINTS,
            Some(previous) => {
                let elapsed = (at_ms - previous).max(0) as f64;
                (elapsed / MS_PER_POINT).min(MAX_MESSAGE_POINTS)
            }
        }
    }

    /// Drop timestamps old enough that the next message would earn full points anyway,
    /// allowing [`PRUNE_SLACK_MS`] of clock skew. Returns the number of entries removed.
    pub fn prune(&self, now_ms: i64) -> usize {
        let before = self.last_seen.len();
        self.last_seen
            .retain(|_, seen| now_ms - *seen < RAMP_MS + PRUNE_SLACK_MS);
        before.saturating_sub(self.last_seen.len())
    }

    /// Number of users currently tracked.
    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    /// Whether no user is tracked.
    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_is_worth_full_points() {
        let tracker = ActivityTracker::new();
        assert_eq!(tracker.score_message(1, 1_000), 10.0);
    }

    #[test]
    fn points_scale_linearly_with_the_gap() {
        let tracker = ActivityTracker::new();
        tracker.score_message(1, 0);

        assert_eq!(tracker.score_message(1, 20_000), 5.0);
        assert_eq!(tracker.score_message(1, 21_000), 0.25);
        assert_eq!(tracker.score_message(1, 121_000), 10.0);
    }

    #[test]
    fn out_of_order_timestamps_score_zero() {
        let tracker = ActivityTracker::new();
        tracker.score_message(1, 10_000);
        assert_eq!(tracker.score_message(1, 5_000), 0.0);
    }

    #[test]
    fn users_are_tracked_independently() {
        let tracker = ActivityTracker::new();
        tracker.score_message(1, 0);
        assert_eq!(tracker.score_message(2, 100), 10.0);
        assert_eq!(tracker.score_message(1, 4_000), 1.0);
    }

    #[test]
    fn pruning_does_not_change_scores() {
        let pruned = ActivityTracker::new();
        let kept = ActivityTracker::new();
        for tracker in [&pruned, &kept] {
            tracker.score_message(1, 0);
            tracker.score_message(2, 30_000);
        }

        let now = RAMP_MS + PRUNE_SLACK_MS + 5_000;
        assert_eq!(pruned.prune(now), 1);
        assert_eq!(pruned.len(), 1);

        for user in [1, 2] {
            assert_eq!(
                pruned.score_message(user, now + 5_000),
                kept.score_message(user, now + 5_000)
            );
        }
    }

    #[test]
    fn host_clock_ahead_of_messages_keeps_recent_entries() {
        let tracker = ActivityTracker::new();
        tracker.score_message(1, 100_000);

        // Host clock five minutes ahead of the message timestamps.
        assert_eq!(tracker.prune(100_000 + 300_000), 0);
        assert_eq!(tracker.score_message(1, 120_000), 5.0);
    }

    #[test]
    fn same_millisecond_repeat_scores_zero() {
        let tracker = ActivityTracker::new();
        tracker.score_message(1, 7_000);
        assert_eq!(tracker.score_message(1, 7_000), 0.0);
    }
}
