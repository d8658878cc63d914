use tokio::time::Instant;
use tracing::{debug, info};

use crate::{
    dao::models::{AttachmentEntity, TriviaQuestionEntity},
    error::ServiceError,
    state::{
        SharedState,
        authoring::{MessageRef, PendingAuthoring, parse_answers},
    },
};

/// What a direct message from a trivia author did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthoringStep {
    /// A new question was started and now waits for its answers.
    Started {
        /// Question text.
        question: String,
        /// Number of attachments sent with it.
        attachment_count: usize,
    },
    /// Nothing to do: no text and no question in progress.
    Ignored,
    /// The answer message held no answers; the question still waits.
    NoAnswers,
    /// The question was saved.
    Created {
        /// Stored question.
        question: TriviaQuestionEntity,
        /// Setup prompt to clean up.
        prompt: Option<MessageRef>,
    },
}

/// Advance `author`'s authoring workflow with a direct message received at `now`.
///
/// Within five minutes of a question, the next message supplies its answers, one per line.
/// Otherwise a non-empty message starts a new question, replacing any stale one.
pub async fn handle_direct_message(
    state: &SharedState,
    author: u64,
    text: &str,
    attachments: Vec<AttachmentEntity>,
    now: Instant,
) -> Result<AuthoringStep, ServiceError> {
    let sessions = state.authoring();

    let Some(session) = sessions.take_live(author, now) else {
        if text.trim().is_empty() {
            return Ok(AuthoringStep::Ignored);
        }
        let attachment_count = attachments.len();
        sessions.begin(
            author,
            PendingAuthoring {
                started_at: now,
                question: text.to_owned(),
                attachments,
                prompt: None,
            },
        );
        debug!(author, attachment_count, "started trivia question");
        return Ok(AuthoringStep::Started {
            question: text.to_owned(),
            attachment_count,
        });
    };

    let answers = parse_answers(text);
    if answers.is_empty() {
        sessions.restore(author, session);
        return Ok(AuthoringStep::NoAnswers);
    }

    let question = TriviaQuestionEntity {
        id: new_question_id(),
        question: session.question.clone(),
        attachments: session.attachments.clone(),
        answers,
        used: false,
    };

    let stored: Result<(), ServiceError> = match state.require_store().await {
        Ok(store) => store.insert_question(question.clone()).await.map_err(Into::into),
        Err(err) => Err(err),
    };
    if let Err(err) = stored {
        sessions.restore(author, session);
        return Err(err);
    }

    info!(author, question = %question.id, answers = question.answers.len(), "created trivia question");
    Ok(AuthoringStep::Created {
        question,
        prompt: session.prompt,
    })
}

/// Abandon the author's question in progress, whatever its age.
pub fn cancel(state: &SharedState, author: u64) -> bool {
    let cancelled = state.authoring().cancel(author);
    if cancelled {
        debug!(author, "cancelled trivia question");
    }
    cancelled
}

/// 128 random bits as 32 lowercase hexadecimal characters.
fn new_question_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::contest_store::{ContestStore, memory::MemoryContestStore},
        state::{AppState, authoring::AUTHORING_TTL},
    };

    async fn state_with_store() -> (SharedState, MemoryContestStore) {
        let store = MemoryContestStore::new();
        let state = AppState::new(AppConfig::default());
        state.install_store(Arc::new(store.clone())).await;
        (state, store)
    }

    #[test]
    fn ids_are_32_lowercase_hex_characters() {
        let id = new_question_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn question_then_answers_creates_an_unused_question() {
        let (state, store) = state_with_store().await;
        let now = Instant::now();

        let started = handle_direct_message(&state, 1, "2+2?", Vec::new(), now)
            .await
            .unwrap();
        assert_eq!(
            started,
            AuthoringStep::Started {
                question: "2+2?".into(),
                attachment_count: 0
            }
        );

        let created = handle_direct_message(&state, 1, "4\nFour", Vec::new(), now)
            .await
            .unwrap();
        let AuthoringStep::Created { question, .. } = created else {
            panic!("expected a created question, got {created:?}");
        };
        assert_eq!(question.answers, vec!["4", "four"]);
        assert!(!question.used);

        let stored = store.find_question(question.id.clone()).await.unwrap();
        assert_eq!(stored, Some(question));
        assert!(!state.authoring().contains(1));
    }

    #[tokio::test]
    async fn blank_answers_keep_the_session() {
        let (state, _store) = state_with_store().await;
        let now = Instant::now();
        handle_direct_message(&state, 1, "q?", Vec::new(), now)
            .await
            .unwrap();

        let step = handle_direct_message(&state, 1, " \n ", Vec::new(), now)
            .await
            .unwrap();
        assert_eq!(step, AuthoringStep::NoAnswers);
        assert!(state.authoring().contains(1));
    }

    #[tokio::test]
    async fn stale_sessions_start_over() {
        let (state, store) = state_with_store().await;
        let now = Instant::now();
        handle_direct_message(&state, 1, "old?", Vec::new(), now)
            .await
            .unwrap();

        let later = now + AUTHORING_TTL + Duration::from_secs(1);
        let step = handle_direct_message(&state, 1, "new?", Vec::new(), later)
            .await
            .unwrap();
        assert!(matches!(step, AuthoringStep::Started { ref question, .. } if question == "new?"));
        assert!(store.list_questions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_message_without_session_is_ignored() {
        let (state, _store) = state_with_store().await;
        let step = handle_direct_message(&state, 1, "", Vec::new(), Instant::now())
            .await
            .unwrap();
        assert_eq!(step, AuthoringStep::Ignored);
    }

    #[tokio::test]
    async fn cancelled_sessions_do_not_capture_the_next_message() {
        let (state, _store) = state_with_store().await;
        let now = Instant::now();
        handle_direct_message(&state, 1, "q?", Vec::new(), now)
            .await
            .unwrap();
        assert!(cancel(&state, 1));

        let step = handle_direct_message(&state, 1, "answer", Vec::new(), now)
            .await
            .unwrap();
        assert!(matches!(step, AuthoringStep::Started { .. }));
    }

    #[tokio::test]
    async fn failed_saves_keep_the_session() {
        let state = AppState::new(AppConfig::default());
        let now = Instant::now();
        handle_direct_message(&state, 1, "q?", Vec::new(), now)
            .await
            .unwrap();

        let err = handle_direct_message(&state, 1, "a", Vec::new(), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
        assert!(state.authoring().contains(1));
    }
}
