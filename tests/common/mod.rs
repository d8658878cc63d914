#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::future::BoxFuture;
use noodle_judge::{
    config::AppConfig,
    dao::{
        contest_store::{ContestStore, memory::MemoryContestStore},
        models::TriviaQuestionEntity,
    },
    error::PlatformError,
    services::trivia_service::TriviaOutlet,
    state::{
        AppState, SharedState,
        community::Community,
        scheduler::{RoundExpiry, RoundId},
    },
};

/// Outlet that records every side effect instead of talking to Discord.
#[derive(Default)]
pub struct RecordingOutlet {
    posted: Mutex<Vec<(Community, TriviaQuestionEntity)>>,
    expired: Mutex<Vec<RoundExpiry>>,
    slowmode: Mutex<Vec<u16>>,
    reject_slowmode: bool,
}

impl RecordingOutlet {
    /// Outlet whose slow-mode requests are recorded and then rejected.
    pub fn rejecting_slowmode() -> Self {
        Self {
            reject_slowmode: true,
            ..Self::default()
        }
    }

    pub fn posted(&self) -> Vec<(Community, TriviaQuestionEntity)> {
        self.posted.lock().unwrap().clone()
    }

    pub fn expired(&self) -> Vec<RoundExpiry> {
        self.expired.lock().unwrap().clone()
    }

    pub fn slowmode(&self) -> Vec<u16> {
        self.slowmode.lock().unwrap().clone()
    }
}

impl TriviaOutlet for RecordingOutlet {
    fn post_question(
        &self,
        community: Community,
        question: TriviaQuestionEntity,
    ) -> BoxFuture<'static, Result<(), PlatformError>> {
        self.posted.lock().unwrap().push((community, question));
        Box::pin(async { Ok(()) })
    }

    fn announce_expired(&self, expiry: RoundExpiry) -> BoxFuture<'static, Result<(), PlatformError>> {
        self.expired.lock().unwrap().push(expiry);
        Box::pin(async { Ok(()) })
    }

    fn set_slowmode(&self, seconds: u16) -> BoxFuture<'static, Result<(), PlatformError>> {
        self.slowmode.lock().unwrap().push(seconds);
        let reject = self.reject_slowmode;
        Box::pin(async move {
            if reject {
                Err(PlatformError::NotConnected)
            } else {
                Ok(())
            }
        })
    }
}

/// State backed by a fresh memory store with the scheduler already started.
pub async fn running_state() -> (SharedState, MemoryContestStore, Arc<RecordingOutlet>) {
    let store = MemoryContestStore::new();
    let state = AppState::new(AppConfig::default());
    state.install_store(Arc::new(store.clone())).await;
    state.scheduler().lock().await.start().unwrap();
    (state, store, Arc::new(RecordingOutlet::default()))
}

pub fn question(id: &str, answers: &[&str]) -> TriviaQuestionEntity {
    TriviaQuestionEntity {
        id: id.into(),
        question: format!("question {id}"),
        attachments: Vec::new(),
        answers: answers.iter().map(|answer| (*answer).to_owned()).collect(),
        used: false,
    }
}

pub async fn seed(store: &MemoryContestStore, questions: &[TriviaQuestionEntity]) {
    for question in questions {
        store.insert_question(question.clone()).await.unwrap();
    }
}

/// Poll until a round is open and return its id.
pub async fn wait_for_round(state: &SharedState) -> RoundId {
    loop {
        if let Some(round) = state.scheduler().lock().await.current_round() {
            return round.id;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
