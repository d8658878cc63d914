//! Moderator operations on the trivia question bank and posting settings.

use std::sync::Arc;

use tracing::info;

use crate::{
    config::AppConfig,
    dao::{contest_store::ContestStore, models::TriviaQuestionEntity},
    error::ServiceError,
    services::trivia_service::{self, TriviaOutlet},
    state::SharedState,
};

/// Question counts reported by `%count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionCount {
    /// Questions never posted.
    pub unused: usize,
    /// All stored questions.
    pub total: usize,
}

/// Reject question-bank changes from users outside the author allowlist.
pub fn require_author(config: &AppConfig, user: u64) -> Result<(), ServiceError> {
    if config.is_author(user) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(format!(
            "user {user} is not a trivia author"
        )))
    }
}

/// Enable trivia posting. The loop is spawned only when the persisted flag was off; the
/// flag is then set so the loop resumes after a restart.
pub async fn start_posting(
    state: &SharedState,
    outlet: Arc<dyn TriviaOutlet>,
) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    if !store.posting_enabled().await? {
        trivia_service::ensure_running(state, outlet).await;
        store.set_posting_enabled(true).await?;
        info!("trivia posting enabled");
    }
    Ok(())
}

/// Store the posting cooldown. The value is kept for operators; the posting interval does
/// not read it.
pub async fn set_cooldown(store: &dyn ContestStore, minutes: u32) -> Result<(), ServiceError> {
    if minutes == 0 {
        return Err(ServiceError::InvalidInput(
            "cooldown must be a positive number of minutes".into(),
        ));
    }
    store.set_cooldown_minutes(minutes).await?;
    info!(minutes, "trivia cooldown updated");
    Ok(())
}

/// Every stored question rendered as `[id] question` followed by one `- answer` line per
/// accepted answer.
pub async fn export_questions(store: &dyn ContestStore) -> Result<String, ServiceError> {
    let questions = store.list_questions().await?;
    Ok(render_export(&questions))
}

fn render_export(questions: &[TriviaQuestionEntity]) -> String {
    questions
        .iter()
        .map(|question| {
            let mut entry = format!("[{}] {}", question.id, question.question);
            for answer in &question.answers {
                entry.push_str("\n- ");
                entry.push_str(answer);
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Unused and total question counts.
pub async fn count_questions(store: &dyn ContestStore) -> Result<QuestionCount, ServiceError> {
    let questions = store.list_questions().await?;
    Ok(QuestionCount {
        unused: questions.iter().filter(|question| !question.used).count(),
        total: questions.len(),
    })
}

/// Delete a question by id, returning it.
pub async fn delete_question(
    store: &dyn ContestStore,
    id: &str,
) -> Result<TriviaQuestionEntity, ServiceError> {
    let question = store
        .find_question(id.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("question `{id}`")))?;
    if !store.delete_question(id.to_owned()).await? {
        return Err(ServiceError::NotFound(format!("question `{id}`")));
    }
    info!(question = %id, "deleted trivia question");
    Ok(question)
}

/// Questions whose text contains `needle`, ignoring case.
pub async fn search_questions(
    store: &dyn ContestStore,
    needle: &str,
) -> Result<Vec<TriviaQuestionEntity>, ServiceError> {
    let needle = needle.trim().to_lowercase();
    let questions = store.list_questions().await?;
    Ok(questions
        .into_iter()
        .filter(|question| question.question.to_lowercase().contains(&needle))
        .collect())
}
