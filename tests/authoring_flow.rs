mod common;

use std::time::Duration;

use noodle_judge::{
    dao::contest_store::ContestStore,
    services::{
        authoring_service::{AuthoringStep, handle_direct_message},
        scoring_service::record_message,
        trivia_service::{StepOutcome, TriviaScheduler},
    },
    state::{authoring::AUTHORING_TTL, community::Community},
};
use rand::{SeedableRng, rngs::StdRng};
use tokio::time::Instant;

use common::{running_state, wait_for_round};

const AUTHOR: u64 = 42;

#[tokio::test(start_paused = true)]
async fn authored_question_is_posted_once() {
    let (state, store, outlet) = running_state().await;
    let now = Instant::now();

    let started = handle_direct_message(&state, AUTHOR, "2+2?", Vec::new(), now)
        .await
        .unwrap();
    assert_eq!(
        started,
        AuthoringStep::Started {
            question: "2+2?".into(),
            attachment_count: 0
        }
    );

    let created = handle_direct_message(&state, AUTHOR, "4\nFour\n", Vec::new(), now)
        .await
        .unwrap();
    let AuthoringStep::Created { question, .. } = created else {
        panic!("expected a created question, got {created:?}");
    };
    assert_eq!(question.answers, vec!["4", "four"]);
    assert!(!state.authoring().contains(AUTHOR));

    let mut scheduler = TriviaScheduler::new(state.clone(), outlet.clone(), StdRng::seed_from_u64(9));
    let cycle = tokio::spawn(async move {
        let first = scheduler.step().await;
        (scheduler, first)
    });
    wait_for_round(&state).await;
    let outcome = record_message(&state, 7, Community::Itto, "four", 0)
        .await
        .unwrap();
    assert!(outcome.win.is_some());

    let (mut scheduler, first) = cycle.await.unwrap();
    assert!(matches!(first.unwrap(), StepOutcome::Answered(_)));
    assert_eq!(outlet.posted()[0].1.id, question.id);
    assert!(store.find_question(question.id.clone()).await.unwrap().unwrap().used);

    assert_eq!(scheduler.step().await.unwrap(), StepOutcome::PoolEmpty);
    assert_eq!(outlet.posted().len(), 1);
}

#[tokio::test]
async fn blank_answers_keep_the_question_waiting() {
    let (state, store, _outlet) = running_state().await;
    let now = Instant::now();

    handle_direct_message(&state, AUTHOR, "Who runs the noodle stall?", Vec::new(), now)
        .await
        .unwrap();
    let step = handle_direct_message(&state, AUTHOR, " \n \n", Vec::new(), now)
        .await
        .unwrap();

    assert_eq!(step, AuthoringStep::NoAnswers);
    assert!(state.authoring().contains(AUTHOR));
    assert!(store.list_questions().await.unwrap().is_empty());
}

#[tokio::test]
async fn stale_questions_are_replaced() {
    let (state, store, _outlet) = running_state().await;
    let now = Instant::now();

    handle_direct_message(&state, AUTHOR, "old question", Vec::new(), now)
        .await
        .unwrap();
    let later = now + AUTHORING_TTL + Duration::from_secs(1);
    let step = handle_direct_message(&state, AUTHOR, "new question", Vec::new(), later)
        .await
        .unwrap();

    assert_eq!(
        step,
        AuthoringStep::Started {
            question: "new question".into(),
            attachment_count: 0
        }
    );
    assert!(store.list_questions().await.unwrap().is_empty());
}
