pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{ScoreRecordEntity, TriviaQuestionEntity};
use crate::dao::storage::StorageResult;
use crate::state::community::Community;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for trivia questions, scores and settings.
///
/// Every operation is atomic at the single-document level; callers never read, modify
/// and write back a document themselves.
pub trait ContestStore: Send + Sync {
    fn insert_question(&self, question: TriviaQuestionEntity)
    -> BoxFuture<'static, StorageResult<()>>;
    fn find_question(
        &self,
        id: String,
    ) -> BoxFuture<'static, StorageResult<Option<TriviaQuestionEntity>>>;
    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<TriviaQuestionEntity>>>;
    fn list_unused_questions(&self)
    -> BoxFuture<'static, StorageResult<Vec<TriviaQuestionEntity>>>;
    /// Flip `used` on an unused question. Returns `false` when the question is missing or
    /// was already claimed, so two concurrent claims never both succeed.
    fn claim_question(&self, id: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Returns whether a question was deleted.
    fn delete_question(&self, id: String) -> BoxFuture<'static, StorageResult<bool>>;
    fn find_score(&self, user: u64) -> BoxFuture<'static, StorageResult<Option<ScoreRecordEntity>>>;
    fn list_scores(&self) -> BoxFuture<'static, StorageResult<Vec<ScoreRecordEntity>>>;
    /// Add `amount` to the user's `community` total, creating the record if absent.
    fn increment_score(
        &self,
        user: u64,
        community: Community,
        amount: f64,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn set_disqualified(&self, user: u64, disqualified: bool)
    -> BoxFuture<'static, StorageResult<()>>;
    fn posting_enabled(&self) -> BoxFuture<'static, StorageResult<bool>>;
    fn set_posting_enabled(&self, enabled: bool) -> BoxFuture<'static, StorageResult<()>>;
    fn cooldown_minutes(&self) -> BoxFuture<'static, StorageResult<Option<u32>>>;
    fn set_cooldown_minutes(&self, minutes: u32) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
