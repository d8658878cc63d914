use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::dao::{
    contest_store::ContestStore,
    models::{ScoreRecordEntity, TriviaQuestionEntity},
    storage::StorageResult,
};
use crate::state::community::Community;

/// Process-local [`ContestStore`]. Questions keep insertion order; per-user records are
/// sharded in a [`DashMap`] so increments lock a single entry.
#[derive(Clone, Default)]
pub struct MemoryContestStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    questions: RwLock<Vec<TriviaQuestionEntity>>,
    scores: DashMap<u64, ScoreRecordEntity>,
    settings: RwLock<MemorySettings>,
}

#[derive(Default)]
struct MemorySettings {
    posting_enabled: bool,
    cooldown_minutes: Option<u32>,
}

impl MemoryContestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContestStore for MemoryContestStore {
    fn insert_question(
        &self,
        question: TriviaQuestionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.questions.write().await.push(question);
            Ok(())
        })
    }

    fn find_question(
        &self,
        id: String,
    ) -> BoxFuture<'static, StorageResult<Option<TriviaQuestionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let questions = inner.questions.read().await;
            Ok(questions.iter().find(|question| question.id == id).cloned())
        })
    }

    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<TriviaQuestionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.questions.read().await.clone()) })
    }

    fn list_unused_questions(
        &self,
    ) -> BoxFuture<'static, StorageResult<Vec<TriviaQuestionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let questions = inner.questions.read().await;
            Ok(questions
                .iter()
                .filter(|question| !question.used)
                .cloned()
                .collect())
        })
    }

    fn claim_question(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut questions = inner.questions.write().await;
            match questions
                .iter_mut()
                .find(|question| question.id == id && !question.used)
            {
                Some(question) => {
                    question.used = true;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn delete_question(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut questions = inner.questions.write().await;
            let before = questions.len();
            questions.retain(|question| question.id != id);
            Ok(questions.len() != before)
        })
    }

    fn find_score(
        &self,
        user: u64,
    ) -> BoxFuture<'static, StorageResult<Option<ScoreRecordEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.scores.get(&user).map(|entry| entry.value().clone())) })
    }

    fn list_scores(&self) -> BoxFuture<'static, StorageResult<Vec<ScoreRecordEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .scores
                .iter()
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn increment_score(
        &self,
        user: u64,
        community: Community,
        amount: f64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner
                .scores
                .entry(user)
                .or_insert_with(|| ScoreRecordEntity::new(user))
                .add_points(community, amount);
            Ok(())
        })
    }

    fn set_disqualified(
        &self,
        user: u64,
        disqualified: bool,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner
                .scores
                .entry(user)
                .or_insert_with(|| ScoreRecordEntity::new(user))
                .dq = disqualified;
            Ok(())
        })
    }

    fn posting_enabled(&self) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.settings.read().await.posting_enabled) })
    }

    fn set_posting_enabled(&self, enabled: bool) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.settings.write().await.posting_enabled = enabled;
            Ok(())
        })
    }

    fn cooldown_minutes(&self) -> BoxFuture<'static, StorageResult<Option<u32>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.settings.read().await.cooldown_minutes) })
    }

    fn set_cooldown_minutes(&self, minutes: u32) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.settings.write().await.cooldown_minutes = Some(minutes);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
