use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, error, info, warn};

use crate::{
    dao::{contest_store::ContestStore, models::TriviaQuestionEntity},
    error::{PlatformError, ServiceError},
    services::registry_service,
    state::{
        SharedState,
        community::Community,
        scheduler::{ANSWER_WINDOW, CycleDecision, RoundExpiry, RoundId, RoundWin, SchedulerState},
    },
};

/// Delay between posting a question and slowing both channels down.
pub const SLOWMODE_DELAY: Duration = Duration::from_millis(2_500);
/// Per-user rate limit applied while a question is open.
pub const SLOWMODE_SECONDS: u16 = 20;

/// Chat side effects of the trivia loop.
pub trait TriviaOutlet: Send + Sync {
    /// Post `question` in the `community` channel.
    fn post_question(
        &self,
        community: Community,
        question: TriviaQuestionEntity,
    ) -> BoxFuture<'static, Result<(), PlatformError>>;
    /// Tell the channel the question was posted in that nobody answered.
    fn announce_expired(&self, expiry: RoundExpiry)
    -> BoxFuture<'static, Result<(), PlatformError>>;
    /// Set the per-user rate limit of both community channels.
    fn set_slowmode(&self, seconds: u16) -> BoxFuture<'static, Result<(), PlatformError>>;
}

/// What one cycle of the loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The cycle was skipped because of the raised interval.
    Skipped {
        /// Skips left after this one.
        remaining: u32,
    },
    /// No unused question was left.
    PoolEmpty,
    /// The question was answered in time.
    Answered(RoundId),
    /// Nobody answered in time.
    Expired(RoundExpiry),
}

/// Start the trivia loop unless it already runs in this process. Returns whether a new loop
/// was spawned.
pub async fn ensure_running(state: &SharedState, outlet: Arc<dyn TriviaOutlet>) -> bool {
    if !state.claim_trivia_loop() {
        debug!("trivia loop already running");
        return false;
    }
    if let Err(err) = state.scheduler().lock().await.start() {
        warn!(error = %err, "trivia scheduler was not idle");
    }

    let scheduler = TriviaScheduler::new(state.clone(), outlet, StdRng::from_os_rng());
    tokio::spawn(scheduler.run());
    info!("trivia loop started");
    true
}

/// Resume posting after a restart when it was enabled before.
pub async fn resume_if_enabled(
    state: &SharedState,
    outlet: Arc<dyn TriviaOutlet>,
) -> Result<bool, ServiceError> {
    let store = state.require_store().await?;
    if !store.posting_enabled().await? {
        return Ok(false);
    }
    Ok(ensure_running(state, outlet).await)
}

/// Resolve a message against the open round. Returns the win if `content` answered it and
/// `user` is eligible; only one caller ever gets a win for a given round.
pub async fn try_answer(
    state: &SharedState,
    user: u64,
    community: Community,
    content: &str,
) -> Result<Option<RoundWin>, ServiceError> {
    let Some(round_id) = state.scheduler().lock().await.match_answer(content) else {
        return Ok(None);
    };

    let store = state.require_store().await?;
    if registry_service::is_disqualified(store.as_ref(), user).await? {
        debug!(user, %round_id, "ignoring answer from disqualified user");
        return Ok(None);
    }

    let win = state
        .scheduler()
        .lock()
        .await
        .claim_win(round_id, content, user, community);
    if let Some(win) = &win {
        state.round_closed().notify_one();
        info!(
            user,
            %round_id,
            question = %win.question_id,
            %community,
            "trivia question answered"
        );
    }
    Ok(win)
}

/// Pick a random unused question and mark it used. Candidates claimed concurrently by
/// another instance are dropped and the next one is tried.
pub async fn reserve_question<R: Rng + ?Sized>(
    store: &dyn ContestStore,
    rng: &mut R,
) -> Result<Option<TriviaQuestionEntity>, ServiceError> {
    let mut candidates = store.list_unused_questions().await?;
    while !candidates.is_empty() {
        let candidate = candidates.swap_remove(rng.random_range(0..candidates.len()));
        if store.claim_question(candidate.id.clone()).await? {
            return Ok(Some(TriviaQuestionEntity {
                used: true,
                ..candidate
            }));
        }
        debug!(question = %candidate.id, "question claimed elsewhere; trying another");
    }
    Ok(None)
}

/// The process-wide posting loop.
pub struct TriviaScheduler {
    state: SharedState,
    outlet: Arc<dyn TriviaOutlet>,
    rng: StdRng,
}

impl TriviaScheduler {
    /// Loop driving `state`'s scheduler through `outlet`.
    pub fn new(state: SharedState, outlet: Arc<dyn TriviaOutlet>, rng: StdRng) -> Self {
        Self { state, outlet, rng }
    }

    /// Wait, run a cycle, repeat. Never returns; cycle failures are logged.
    pub async fn run(mut self) {
        loop {
            let wait = SchedulerState::next_wait(&mut self.rng);
            debug!(wait_ms = wait.as_millis() as u64, "waiting for next trivia cycle");
            sleep(wait).await;

            match self.step().await {
                Ok(outcome) => debug!(?outcome, "trivia cycle finished"),
                Err(err) => error!(error = %err, "trivia cycle failed"),
            }
        }
    }

    /// Run one cycle: skip it, or post a question and wait until it is answered or expires.
    pub async fn step(&mut self) -> Result<StepOutcome, ServiceError> {
        let decision = self.state.scheduler().lock().await.begin_cycle()?;
        if let CycleDecision::Skip { remaining } = decision {
            info!(remaining, "skipping trivia cycle due to inactivity");
            return Ok(StepOutcome::Skipped { remaining });
        }

        let store = self.state.require_store().await?;
        let Some(question) = reserve_question(store.as_ref(), &mut self.rng).await? else {
            warn!("no unused trivia questions left; skipping cycle");
            return Ok(StepOutcome::PoolEmpty);
        };

        let community = Community::random(&mut self.rng);
        self.outlet
            .post_question(community, question.clone())
            .await?;

        let posted_at = Instant::now();
        let round_id = self
            .state
            .scheduler()
            .lock()
            .await
            .open_round(&question, community, posted_at)?;
        info!(%round_id, question = %question.id, %community, "posted trivia question");

        self.schedule_slowmode(round_id);
        let outcome = self.await_resolution(round_id, posted_at + ANSWER_WINDOW).await;
        self.release_slowmode();

        if let StepOutcome::Expired(expiry) = &outcome {
            info!(%round_id, cadence = ?expiry.cadence, "trivia question expired");
            if let Err(err) = self.outlet.announce_expired(expiry.clone()).await {
                warn!(error = %err, %round_id, "failed to announce expired question");
            }
        }
        Ok(outcome)
    }

    async fn await_resolution(&self, round_id: RoundId, deadline: Instant) -> StepOutcome {
        loop {
            let closed = self.state.round_closed().notified();
            if !self.state.scheduler().lock().await.is_open(round_id) {
                return StepOutcome::Answered(round_id);
            }
            tokio::select! {
                _ = closed => continue,
                _ = sleep_until(deadline) => break,
            }
        }

        match self.state.scheduler().lock().await.expire(round_id) {
            Some(expiry) => StepOutcome::Expired(expiry),
            None => StepOutcome::Answered(round_id),
        }
    }

    fn schedule_slowmode(&self, round_id: RoundId) {
        let state = self.state.clone();
        let outlet = self.outlet.clone();
        tokio::spawn(async move {
            sleep(SLOWMODE_DELAY).await;
            if !state.scheduler().lock().await.is_open(round_id) {
                return;
            }
            if let Err(err) = outlet.set_slowmode(SLOWMODE_SECONDS).await {
                warn!(error = %err, %round_id, "failed to enable slow-mode");
            }
        });
    }

    fn release_slowmode(&self) {
        let outlet = self.outlet.clone();
        tokio::spawn(async move {
            if let Err(err) = outlet.set_slowmode(0).await {
                warn!(error = %err, "failed to disable slow-mode");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::contest_store::memory::MemoryContestStore,
        state::{AppState, scheduler::CadenceChange},
    };

    #[derive(Default)]
    struct CountingOutlet {
        posted: Mutex<Vec<Community>>,
    }

    impl TriviaOutlet for CountingOutlet {
        fn post_question(
            &self,
            community: Community,
            _question: TriviaQuestionEntity,
        ) -> BoxFuture<'static, Result<(), PlatformError>> {
            self.posted.lock().unwrap().push(community);
            Box::pin(async { Ok(()) })
        }

        fn announce_expired(
            &self,
            _expiry: RoundExpiry,
        ) -> BoxFuture<'static, Result<(), PlatformError>> {
            Box::pin(async { Ok(()) })
        }

        fn set_slowmode(&self, _seconds: u16) -> BoxFuture<'static, Result<(), PlatformError>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn question(id: &str) -> TriviaQuestionEntity {
        TriviaQuestionEntity {
            id: id.into(),
            question: format!("question {id}"),
            attachments: Vec::new(),
            answers: vec![format!("answer {id}")],
            used: false,
        }
    }

    async fn running_state(store: MemoryContestStore) -> SharedState {
        let state = AppState::new(AppConfig::default());
        state.install_store(Arc::new(store)).await;
        state.scheduler().lock().await.start().unwrap();
        state
    }

    #[tokio::test]
    async fn reservation_claims_each_question_once() {
        let store = MemoryContestStore::new();
        for id in ["a", "b", "c"] {
            store.insert_question(question(id)).await.unwrap();
        }
        let mut rng = StdRng::seed_from_u64(3);

        let mut drawn = Vec::new();
        while let Some(question) = reserve_question(&store, &mut rng).await.unwrap() {
            assert!(question.used);
            drawn.push(question.id);
        }
        drawn.sort();

        assert_eq!(drawn, vec!["a", "b", "c"]);
        assert!(store.list_unused_questions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_pool_skips_without_posting() {
        let state = running_state(MemoryContestStore::new()).await;
        let outlet = Arc::new(CountingOutlet::default());
        let mut scheduler =
            TriviaScheduler::new(state.clone(), outlet.clone(), StdRng::seed_from_u64(1));

        assert_eq!(scheduler.step().await.unwrap(), StepOutcome::PoolEmpty);
        assert!(outlet.posted.lock().unwrap().is_empty());
        assert!(state.scheduler().lock().await.current_round().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_round_expires_after_the_window() {
        let store = MemoryContestStore::new();
        store.insert_question(question("q")).await.unwrap();
        let state = running_state(store).await;
        let outlet = Arc::new(CountingOutlet::default());
        let mut scheduler =
            TriviaScheduler::new(state.clone(), outlet.clone(), StdRng::seed_from_u64(2));

        let started = Instant::now();
        let outcome = scheduler.step().await.unwrap();

        assert!(started.elapsed() >= ANSWER_WINDOW);
        match outcome {
            StepOutcome::Expired(expiry) => {
                assert_eq!(expiry.question_id, "q");
                assert_eq!(expiry.cadence, CadenceChange::Raised);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(outlet.posted.lock().unwrap().len(), 1);
        assert_eq!(
            scheduler.step().await.unwrap(),
            StepOutcome::Skipped { remaining: 0 }
        );
    }

    #[tokio::test]
    async fn answers_without_an_open_round_are_ignored() {
        let state = running_state(MemoryContestStore::new()).await;
        let win = try_answer(&state, 1, Community::Itto, "anything")
            .await
            .unwrap();
        assert!(win.is_none());
    }
}
