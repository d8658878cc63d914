use std::{collections::HashSet, fmt, time::Duration};

use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{dao::models::TriviaQuestionEntity, state::community::Community};

/// Shortest pause between two trivia cycles.
pub const MIN_WAIT: Duration = Duration::from_secs(600);
/// Upper (exclusive) bound of the pause between two trivia cycles.
pub const MAX_WAIT: Duration = Duration::from_secs(1_200);
/// How long a posted question accepts answers.
pub const ANSWER_WINDOW: Duration = Duration::from_secs(120);
/// Messages during a round at or above which chat counts as active.
pub const HIGH_ACTIVITY_MESSAGES: u32 = 5;
/// Points awarded on top of the message score for answering a question.
pub const TRIVIA_BONUS: f64 = 100.0;

/// Identifier of one posted question, so late resolutions can be told apart from the
/// current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoundId(Uuid);

impl RoundId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where the scheduler currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Posting has not been started in this process.
    Idle,
    /// Between rounds, sleeping until the next cycle.
    Waiting,
    /// A question is posted and accepting answers.
    OpenRound(OpenTriviaRound),
}

/// The question currently accepting answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTriviaRound {
    /// Round identifier.
    pub id: RoundId,
    /// Identifier of the posted question.
    pub question_id: String,
    /// Normalized accepted answers. Emptied the moment the round is won.
    pub answers: HashSet<String>,
    /// Answers as stored, shown when the round expires.
    pub display_answers: Vec<String>,
    /// Channel the question was posted in.
    pub community: Community,
    /// When the question was posted.
    pub posted_at: Instant,
}

/// Counters driving the adaptive interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityCounters {
    /// Messages in either channel since the current question was posted.
    pub recent_messages: u32,
    /// Back-to-back low-activity rounds nobody answered.
    pub consecutive_empty_rounds: u32,
    /// Cycles still to skip before the next question is posted.
    pub skip_count: u32,
}

/// Outcome of the start of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDecision {
    /// The cycle posts nothing; `remaining` more cycles will be skipped after this one.
    Skip {
        /// Skips left after this one.
        remaining: u32,
    },
    /// A question should be posted.
    Post,
}

/// How an expired round changed the posting interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceChange {
    /// Chat was active; a raised interval went back to normal.
    Reset,
    /// Chat was quiet; upcoming cycles will be skipped.
    Raised,
    /// Nothing worth announcing.
    Unchanged,
}

/// A successful answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundWin {
    /// Round that was won.
    pub round_id: RoundId,
    /// Answered question.
    pub question_id: String,
    /// Winning user.
    pub user: u64,
    /// Channel the winning answer was sent in.
    pub community: Community,
    /// Whether the win brought a raised interval back to normal.
    pub interval_reset: bool,
}

/// A round that ran out of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundExpiry {
    /// Round that expired.
    pub round_id: RoundId,
    /// Question that went unanswered.
    pub question_id: String,
    /// Channel the question was posted in.
    pub community: Community,
    /// Accepted answers, revealed in the announcement.
    pub display_answers: Vec<String>,
    /// Effect on the posting interval.
    pub cadence: CadenceChange,
}

/// Operations attempted from a phase that does not allow them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Posting was already started.
    #[error("trivia posting is already running")]
    AlreadyStarted,
    /// Posting has not been started.
    #[error("trivia posting has not been started")]
    NotStarted,
    /// A question is still open.
    #[error("trivia round `{0}` is still open")]
    RoundOpen(RoundId),
}

/// Trivia scheduler state. Holds no I/O; the runtime drives it and performs the side
/// effects each transition reports.
#[derive(Debug, Clone)]
pub struct SchedulerState {
    phase: SchedulerPhase,
    counters: ActivityCounters,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerState {
    /// Idle scheduler with zeroed counters.
    pub fn new() -> Self {
        Self {
            phase: SchedulerPhase::Idle,
            counters: ActivityCounters::default(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> &SchedulerPhase {
        &self.phase
    }

    /// Current counters.
    pub fn counters(&self) -> ActivityCounters {
        self.counters
    }

    /// The open round, if any.
    pub fn current_round(&self) -> Option<&OpenTriviaRound> {
        match &self.phase {
            SchedulerPhase::OpenRound(round) => Some(round),
            _ => None,
        }
    }

    /// Whether `round_id` is still accepting answers.
    pub fn is_open(&self, round_id: RoundId) -> bool {
        self.current_round().is_some_and(|round| round.id == round_id)
    }

    /// Whether posting was started.
    pub fn is_running(&self) -> bool {
        !matches!(self.phase, SchedulerPhase::Idle)
    }

    /// Leave [`SchedulerPhase::Idle`].
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyStarted);
        }
        self.phase = SchedulerPhase::Waiting;
        Ok(())
    }

    /// Draw the pause before the next cycle, uniform in `[MIN_WAIT, MAX_WAIT)`.
    pub fn next_wait<R: Rng + ?Sized>(rng: &mut R) -> Duration {
        let millis = rng.random_range(MIN_WAIT.as_millis() as u64..MAX_WAIT.as_millis() as u64);
        Duration::from_millis(millis)
    }

    /// Decide whether this cycle posts a question or consumes one pending skip.
    pub fn begin_cycle(&mut self) -> Result<CycleDecision, SchedulerError> {
        self.ensure_waiting()?;
        if self.counters.skip_count > 0 {
            self.counters.skip_count -= 1;
            return Ok(CycleDecision::Skip {
                remaining: self.counters.skip_count,
            });
        }
        Ok(CycleDecision::Post)
    }

    /// Open a round for a question just posted in `community`.
    pub fn open_round(
        &mut self,
        question: &TriviaQuestionEntity,
        community: Community,
        posted_at: Instant,
    ) -> Result<RoundId, SchedulerError> {
        self.ensure_waiting()?;

        let id = RoundId::new();
        let answers = question
            .answers
            .iter()
            .map(|answer| normalize_answer(answer))
            .filter(|answer| !answer.is_empty())
            .collect();

        self.counters.recent_messages = 0;
        self.phase = SchedulerPhase::OpenRound(OpenTriviaRound {
            id,
            question_id: question.id.clone(),
            answers,
            display_answers: question.answers.clone(),
            community,
            posted_at,
        });
        Ok(id)
    }

    /// Count one message in either channel.
    pub fn record_activity(&mut self) {
        self.counters.recent_messages = self.counters.recent_messages.saturating_add(1);
    }

    /// Round that `content` would answer, without resolving it.
    pub fn match_answer(&self, content: &str) -> Option<RoundId> {
        let round = self.current_round()?;
        round
            .answers
            .contains(&normalize_answer(content))
            .then_some(round.id)
    }

    /// Resolve `round_id` in favour of `user`. Returns `None` when the round is no longer
    /// open or `content` does not answer it, so at most one caller ever wins a round.
    pub fn claim_win(
        &mut self,
        round_id: RoundId,
        content: &str,
        user: u64,
        community: Community,
    ) -> Option<RoundWin> {
        let round = match &mut self.phase {
            SchedulerPhase::OpenRound(round) if round.id == round_id => round,
            _ => return None,
        };
        if !round.answers.contains(&normalize_answer(content)) {
            return None;
        }
        round.answers.clear();

        let win = RoundWin {
            round_id,
            question_id: round.question_id.clone(),
            user,
            community,
            interval_reset: self.counters.consecutive_empty_rounds > 0,
        };
        self.counters = ActivityCounters::default();
        self.phase = SchedulerPhase::Waiting;
        Some(win)
    }

    /// Close `round_id` after its answer window elapsed. Returns `None` when the round was
    /// already won.
    pub fn expire(&mut self, round_id: RoundId) -> Option<RoundExpiry> {
        if !self.is_open(round_id) {
            return None;
        }
        let SchedulerPhase::OpenRound(round) =
            std::mem::replace(&mut self.phase, SchedulerPhase::Waiting)
        else {
            return None;
        };

        let counters = &mut self.counters;
        let active = counters.recent_messages >= HIGH_ACTIVITY_MESSAGES;
        let cadence = if active {
            if counters.consecutive_empty_rounds > 0 {
                CadenceChange::Reset
            } else {
                CadenceChange::Unchanged
            }
        } else if counters.skip_count == 0 {
            CadenceChange::Raised
        } else {
            CadenceChange::Unchanged
        };

        if active {
            counters.consecutive_empty_rounds = 0;
        }
        if !active && counters.skip_count == 0 {
            counters.consecutive_empty_rounds += 1;
        }
        if counters.skip_count == 0 {
            counters.skip_count = counters.consecutive_empty_rounds;
        }

        Some(RoundExpiry {
            round_id,
            question_id: round.question_id,
            community: round.community,
            display_answers: round.display_answers,
            cadence,
        })
    }

    fn ensure_waiting(&self) -> Result<(), SchedulerError> {
        match &self.phase {
            SchedulerPhase::Idle => Err(SchedulerError::NotStarted),
            SchedulerPhase::Waiting => Ok(()),
            SchedulerPhase::OpenRound(round) => Err(SchedulerError::RoundOpen(round.id)),
        }
    }
}

/// Canonical form used to compare answers.
pub fn normalize_answer(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn question(answers: &[&str]) -> TriviaQuestionEntity {
        TriviaQuestionEntity {
            id: "0123456789abcdef0123456789abcdef".into(),
            question: "Who eats the most noodles?".into(),
            attachments: Vec::new(),
            answers: answers.iter().map(|answer| (*answer).to_owned()).collect(),
            used: true,
        }
    }

    fn running() -> SchedulerState {
        let mut state = SchedulerState::new();
        state.start().unwrap();
        state
    }

    fn open(state: &mut SchedulerState, answers: &[&str]) -> RoundId {
        assert_eq!(state.begin_cycle().unwrap(), CycleDecision::Post);
        state
            .open_round(&question(answers), Community::Itto, Instant::now())
            .unwrap()
    }

    fn expire_quiet_round(state: &mut SchedulerState) -> RoundExpiry {
        let round = open(state, &["itto"]);
        state.expire(round).unwrap()
    }

    #[test]
    fn waits_stay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1_000 {
            let wait = SchedulerState::next_wait(&mut rng);
            assert!(wait >= MIN_WAIT);
            assert!(wait < MAX_WAIT);
        }
    }

    #[test]
    fn cycles_require_start() {
        let mut state = SchedulerState::new();
        assert_eq!(state.begin_cycle(), Err(SchedulerError::NotStarted));
        state.start().unwrap();
        assert_eq!(state.start(), Err(SchedulerError::AlreadyStarted));
    }

    #[test]
    fn answers_are_matched_case_and_whitespace_insensitively() {
        let mut state = running();
        let round = open(&mut state, &["  Noodles "]);

        assert_eq!(state.match_answer("NOODLES"), Some(round));
        assert_eq!(state.match_answer(" noodles\n"), Some(round));
        assert_eq!(state.match_answer("noodle"), None);
    }

    #[test]
    fn only_the_first_claim_wins() {
        let mut state = running();
        let round = open(&mut state, &["4", "four"]);

        let win = state.claim_win(round, "four", 1, Community::Shenhe).unwrap();
        assert_eq!(win.user, 1);
        assert!(!win.interval_reset);

        assert!(state.claim_win(round, "4", 2, Community::Itto).is_none());
        assert!(state.match_answer("4").is_none());
        assert!(state.expire(round).is_none());
        assert_eq!(*state.phase(), SchedulerPhase::Waiting);
    }

    #[test]
    fn open_round_resets_the_activity_counter() {
        let mut state = running();
        state.record_activity();
        state.record_activity();
        open(&mut state, &["a"]);
        assert_eq!(state.counters().recent_messages, 0);
    }

    #[test]
    fn cannot_open_two_rounds_at_once() {
        let mut state = running();
        let round = open(&mut state, &["a"]);
        assert_eq!(state.begin_cycle(), Err(SchedulerError::RoundOpen(round)));
    }

    #[test]
    fn quiet_rounds_back_off_progressively() {
        let mut state = running();

        assert_eq!(expire_quiet_round(&mut state).cadence, CadenceChange::Raised);
        assert_eq!(state.counters().skip_count, 1);
        assert_eq!(
            state.begin_cycle().unwrap(),
            CycleDecision::Skip { remaining: 0 }
        );

        assert_eq!(expire_quiet_round(&mut state).cadence, CadenceChange::Raised);
        assert_eq!(state.counters().consecutive_empty_rounds, 2);
        assert_eq!(state.counters().skip_count, 2);
        assert_eq!(
            state.begin_cycle().unwrap(),
            CycleDecision::Skip { remaining: 1 }
        );
        assert_eq!(
            state.begin_cycle().unwrap(),
            CycleDecision::Skip { remaining: 0 }
        );

        expire_quiet_round(&mut state);
        assert_eq!(state.counters().skip_count, 3);
    }

    #[test]
    fn active_expiry_resets_a_raised_interval() {
        let mut state = running();
        expire_quiet_round(&mut state);
        state.begin_cycle().unwrap();

        let round = open(&mut state, &["a"]);
        for _ in 0..HIGH_ACTIVITY_MESSAGES {
            state.record_activity();
        }
        let expiry = state.expire(round).unwrap();

        assert_eq!(expiry.cadence, CadenceChange::Reset);
        assert_eq!(state.counters().consecutive_empty_rounds, 0);
        assert_eq!(state.counters().skip_count, 0);
    }

    #[test]
    fn active_expiry_at_normal_interval_announces_nothing() {
        let mut state = running();
        let round = open(&mut state, &["a"]);
        for _ in 0..HIGH_ACTIVITY_MESSAGES {
            state.record_activity();
        }
        assert_eq!(state.expire(round).unwrap().cadence, CadenceChange::Unchanged);
    }

    #[test]
    fn win_after_backoff_resets_every_counter() {
        let mut state = running();
        expire_quiet_round(&mut state);
        state.begin_cycle().unwrap();

        let round = open(&mut state, &["a"]);
        state.record_activity();
        let win = state.claim_win(round, "A", 5, Community::Itto).unwrap();

        assert!(win.interval_reset);
        assert_eq!(state.counters(), ActivityCounters::default());
    }

    #[test]
    fn expiry_reveals_answers_as_stored() {
        let mut state = running();
        let round = open(&mut state, &["Raiden Shogun", "ei"]);
        let expiry = state.expire(round).unwrap();
        assert_eq!(expiry.display_answers, vec!["Raiden Shogun", "ei"]);
        assert_eq!(expiry.community, Community::Itto);
    }
}
