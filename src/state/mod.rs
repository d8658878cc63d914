pub mod activity;
pub mod authoring;
pub mod community;
pub mod scheduler;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::{Mutex, Notify, RwLock, watch};

use crate::{
    config::AppConfig,
    dao::contest_store::ContestStore,
    error::ServiceError,
    services::trivia_service::TriviaOutlet,
};

use self::{activity::ActivityTracker, authoring::AuthoringSessions, scheduler::SchedulerState};

pub type SharedState = Arc<AppState>;

/// Central application state: configuration, the storage handle and every in-memory
/// structure shared between the Discord handlers and the background tasks.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn ContestStore>>>,
    degraded: watch::Sender<bool>,
    activity: ActivityTracker,
    authoring: AuthoringSessions,
    scheduler: Mutex<SchedulerState>,
    round_closed: Notify,
    trivia_running: AtomicBool,
    outlet: RwLock<Option<Arc<dyn TriviaOutlet>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            store: RwLock::new(None),
            degraded: degraded_tx,
            activity: ActivityTracker::new(),
            authoring: AuthoringSessions::new(),
            scheduler: Mutex::new(SchedulerState::new()),
            round_closed: Notify::new(),
            trivia_running: AtomicBool::new(false),
            outlet: RwLock::new(None),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn ContestStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] while storage is unavailable.
    pub async fn require_store(&self) -> Result<Arc<dyn ContestStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn ContestStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.set_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.set_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn set_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Wait until storage is available and return it.
    pub async fn wait_for_store(&self) -> Arc<dyn ContestStore> {
        let mut watcher = self.degraded_watcher();
        loop {
            if let Ok(store) = self.require_store().await {
                return store;
            }
            if watcher.wait_for(|degraded| !degraded).await.is_err() {
                // The sender lives as long as `self`, so this only happens on teardown.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Message timestamps used for activity scoring.
    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }

    /// Trivia questions being authored over DM.
    pub fn authoring(&self) -> &AuthoringSessions {
        &self.authoring
    }

    /// Trivia scheduler state.
    pub fn scheduler(&self) -> &Mutex<SchedulerState> {
        &self.scheduler
    }

    /// Signalled when an open round is won.
    pub fn round_closed(&self) -> &Notify {
        &self.round_closed
    }

    /// Claim the right to run the trivia loop. Returns `false` if it already runs.
    pub fn claim_trivia_loop(&self) -> bool {
        !self.trivia_running.swap(true, Ordering::AcqRel)
    }

    /// Whether the trivia loop runs in this process.
    pub fn trivia_running(&self) -> bool {
        self.trivia_running.load(Ordering::Acquire)
    }

    /// Platform outlet used by the trivia loop, once the bot is connected.
    pub async fn outlet(&self) -> Option<Arc<dyn TriviaOutlet>> {
        let guard = self.outlet.read().await;
        guard.as_ref().cloned()
    }

    /// Install the platform outlet.
    pub async fn install_outlet(&self, outlet: Arc<dyn TriviaOutlet>) {
        let mut guard = self.outlet.write().await;
        *guard = Some(outlet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::contest_store::memory::MemoryContestStore;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .install_store(Arc::new(MemoryContestStore::new()))
            .await;
        assert!(!state.is_degraded());
        assert!(state.require_store().await.is_ok());

        state.set_degraded(true);
        assert!(state.require_store().await.is_err());
    }

    #[tokio::test]
    async fn waiters_resume_once_storage_is_back() {
        let state = AppState::new(AppConfig::default());
        let waiter = tokio::spawn({
            let state = state.clone();
            async move {
                state.wait_for_store().await;
            }
        });

        state
            .install_store(Arc::new(MemoryContestStore::new()))
            .await;
        waiter.await.unwrap();
    }

    #[test]
    fn trivia_loop_is_claimed_once() {
        let state = AppState::new(AppConfig::default());
        assert!(state.claim_trivia_loop());
        assert!(!state.claim_trivia_loop());
        assert!(state.trivia_running());
    }
}
