//! Verification flow against a real store: native activity checks, legacy
//! endpoints over a mock HTTP server, attempt accounting, and the terminal
//! failure transition.

mod common;

use common::{seed_quest, test_db, FakeConnectorClient};
use questline::domain::errors::EngineError;
use questline::domain::models::{
    ActivityKind, AssignmentStatus, ComparisonOp, ConditionOp, ConnectorCheck, IdentifierType,
    LegacyCheck, NativeCheck, Quest, SuccessCondition, Task, TaskCompletion, VerificationConfig,
    VerificationSettings,
};
use questline::domain::ports::{
    ActivitySource, AtomicAssignOutcome, ConnectorClient, QuestRepository, StoreError,
};
use questline::infrastructure::{SqliteActivitySource, SqliteQuestRepository};
use questline::services::{SubmitResult, VerificationDispatcher, VerificationService};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

struct Harness {
    _db: common::TestDb,
    repo: Arc<dyn QuestRepository>,
    activity: Arc<SqliteActivitySource>,
    connectors: Arc<FakeConnectorClient>,
    verifier: VerificationService,
}

async fn harness(max_attempts: u32) -> Harness {
    let db = test_db().await;
    let repo: Arc<dyn QuestRepository> = Arc::new(SqliteQuestRepository::new(db.pool.clone()));
    let activity = Arc::new(SqliteActivitySource::new(db.pool.clone()));
    let connectors = Arc::new(FakeConnectorClient::default());
    let settings = VerificationSettings {
        max_attempts,
        legacy_timeout_secs: 2,
    };
    let dispatcher = VerificationDispatcher::new(
        Arc::clone(&activity) as Arc<dyn ActivitySource>,
        Arc::clone(&connectors) as Arc<dyn ConnectorClient>,
        &settings,
    )
    .unwrap();
    let verifier = VerificationService::new(Arc::clone(&repo), dispatcher, &settings);
    Harness {
        _db: db,
        repo,
        activity,
        connectors,
        verifier,
    }
}

fn native_task(quest: &Quest, threshold: i64, points: i64, position: i32) -> Task {
    Task::new(
        quest.id,
        format!("Send {threshold} messages"),
        points,
        VerificationConfig::Native(NativeCheck {
            activity: ActivityKind::MessagesSent,
            operator: ComparisonOp::Gte,
            threshold,
            within_secs: None,
            channel_id: None,
        }),
        position,
    )
}

async fn assign(h: &Harness, quest: &Quest, tasks: &[Task]) {
    seed_quest(h.repo.as_ref(), quest, tasks).await;
    h.repo.atomic_assign("u1", "g1", quest.id).await.unwrap();
}

async fn record_messages(h: &Harness, n: usize) {
    for _ in 0..n {
        h.activity
            .record_event("g1", "u1", None, "message_sent", chrono::Utc::now())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn submitting_without_active_assignment_is_user_input_error() {
    let h = harness(3).await;
    let err = h.verifier.submit_proof("u1", "g1", None).await.unwrap_err();
    assert!(matches!(err, EngineError::UserInput(_)));
}

#[tokio::test]
async fn native_check_counts_then_verifies() {
    let h = harness(3).await;
    let quest = Quest::new("g1", "Chatter", "Talk a bit", 0);
    let tasks = vec![native_task(&quest, 2, 30, 0)];
    assign(&h, &quest, &tasks).await;

    record_messages(&h, 1).await;
    let miss = h.verifier.submit_proof("u1", "g1", None).await.unwrap();
    let SubmitResult::NotVerified {
        remaining_attempts, ..
    } = miss
    else {
        panic!("expected NotVerified, got {miss:?}");
    };
    assert_eq!(remaining_attempts, 3);

    record_messages(&h, 1).await;
    let hit = h.verifier.submit_proof("u1", "g1", None).await.unwrap();
    let SubmitResult::TaskVerified {
        points_awarded,
        quest_completed,
        total_xp,
        ..
    } = hit
    else {
        panic!("expected TaskVerified, got {hit:?}");
    };
    assert_eq!(points_awarded, 30);
    assert!(quest_completed);
    assert_eq!(total_xp, 30);

    // Assignment moved to its terminal completed state.
    assert!(h.repo.get_active_assignment("u1", "g1").await.unwrap().is_none());
}

#[tokio::test]
async fn multi_task_quest_completes_in_position_order() {
    let h = harness(3).await;
    let quest = Quest::new("g1", "Two Steps", "Do both", 0);
    let tasks = vec![
        native_task(&quest, 1, 10, 0),
        Task::new(
            quest.id,
            "Verify your wallet",
            25,
            VerificationConfig::Connector(ConnectorCheck {
                connector_id: 9,
                identifier_type: IdentifierType::Wallet,
            }),
            1,
        ),
    ];
    assign(&h, &quest, &tasks).await;
    record_messages(&h, 1).await;

    let first = h.verifier.submit_proof("u1", "g1", None).await.unwrap();
    let SubmitResult::TaskVerified {
        quest_completed, ..
    } = first
    else {
        panic!("expected first task verified, got {first:?}");
    };
    assert!(!quest_completed);

    let second = h
        .verifier
        .submit_proof("u1", "g1", Some("0xabc"))
        .await
        .unwrap();
    let SubmitResult::TaskVerified {
        quest_completed,
        total_xp,
        ..
    } = second
    else {
        panic!("expected second task verified, got {second:?}");
    };
    assert!(quest_completed);
    assert_eq!(total_xp, 35);

    // The connector saw the wallet variable.
    let calls = h.connectors.test_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, 9);
    assert_eq!(calls[0].1.get("wallet").map(String::as_str), Some("0xabc"));
}

#[tokio::test]
async fn connector_task_without_identifier_costs_no_attempt() {
    let h = harness(3).await;
    let quest = Quest::new("g1", "Holder", "Prove it", 0);
    let tasks = vec![Task::new(
        quest.id,
        "Verify your wallet",
        25,
        VerificationConfig::Connector(ConnectorCheck {
            connector_id: 1,
            identifier_type: IdentifierType::Wallet,
        }),
        0,
    )];
    assign(&h, &quest, &tasks).await;

    let err = h.verifier.submit_proof("u1", "g1", None).await.unwrap_err();
    assert!(matches!(err, EngineError::UserInput(_)));

    let assignment = h.repo.get_active_assignment("u1", "g1").await.unwrap().unwrap();
    assert_eq!(assignment.attempts, 0);
    assert!(h.connectors.test_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn exceeding_the_attempt_cap_fails_the_assignment() {
    let h = harness(1).await;
    let quest = Quest::new("g1", "Hard", "Unreachable bar", 0);
    let tasks = vec![native_task(&quest, 100, 10, 0)];
    assign(&h, &quest, &tasks).await;

    // Cap of 1 failure: first miss is counted, second miss is terminal.
    let first = h.verifier.submit_proof("u1", "g1", None).await.unwrap();
    assert!(matches!(first, SubmitResult::NotVerified { remaining_attempts: 1, .. }));

    let second = h.verifier.submit_proof("u1", "g1", None).await.unwrap_err();
    assert!(matches!(second, EngineError::AttemptsExhausted));

    // Terminal: no active assignment remains, and a further submit is
    // rejected as user input (nothing to verify against).
    assert!(h.repo.get_active_assignment("u1", "g1").await.unwrap().is_none());
    let row = sqlx::query_as::<_, (String,)>("SELECT status FROM assignments WHERE user_id = 'u1'")
        .fetch_one(&h._db.pool)
        .await
        .unwrap();
    assert_eq!(AssignmentStatus::from_str(&row.0), Some(AssignmentStatus::Failed));
}

#[tokio::test]
async fn legacy_endpoint_verifies_through_condition() {
    let h = harness(3).await;
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/holders/0xabc")
        .with_status(200)
        .with_body(json!({"balance": "250"}).to_string())
        .create_async()
        .await;

    let quest = Quest::new("g1", "Holder", "Prove holdings", 0);
    let tasks = vec![Task::new(
        quest.id,
        "Hold 100 tokens",
        50,
        VerificationConfig::Legacy(LegacyCheck {
            endpoint: format!("{}/holders/{{wallet}}", server.url()),
            method: questline::domain::models::HttpMethod::Get,
            headers: HashMap::new(),
            body: None,
            success: SuccessCondition {
                field: "balance".to_string(),
                operator: ConditionOp::Gte,
                value: json!(100),
            },
        }),
        0,
    )];
    assign(&h, &quest, &tasks).await;

    let result = h
        .verifier
        .submit_proof("u1", "g1", Some("0xabc"))
        .await
        .unwrap();
    assert!(matches!(result, SubmitResult::TaskVerified { points_awarded: 50, .. }));
}

#[tokio::test]
async fn legacy_endpoint_failure_counts_as_attempt_not_error() {
    let h = harness(3).await;
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/holders/0xabc")
        .with_status(503)
        .create_async()
        .await;

    let quest = Quest::new("g1", "Holder", "Prove holdings", 0);
    let tasks = vec![Task::new(
        quest.id,
        "Hold tokens",
        50,
        VerificationConfig::Legacy(LegacyCheck {
            endpoint: format!("{}/holders/{{wallet}}", server.url()),
            method: questline::domain::models::HttpMethod::Get,
            headers: HashMap::new(),
            body: None,
            success: SuccessCondition {
                field: "balance".to_string(),
                operator: ConditionOp::Gt,
                value: json!(0),
            },
        }),
        0,
    )];
    assign(&h, &quest, &tasks).await;

    let result = h
        .verifier
        .submit_proof("u1", "g1", Some("0xabc"))
        .await
        .unwrap();
    let SubmitResult::NotVerified {
        remaining_attempts, ..
    } = result
    else {
        panic!("transient endpoint failure must fold into NotVerified");
    };
    assert_eq!(remaining_attempts, 3);
}

#[tokio::test]
async fn racing_duplicate_completion_awards_points_once() {
    let h = harness(3).await;
    let quest = Quest::new("g1", "Chatter", "Talk a bit", 0);
    let task = native_task(&quest, 1, 30, 0);
    seed_quest(h.repo.as_ref(), &quest, std::slice::from_ref(&task)).await;
    let outcome = h.repo.atomic_assign("u1", "g1", quest.id).await.unwrap();
    let AtomicAssignOutcome::Created(assignment) = outcome else {
        panic!("expected a fresh assignment, got {outcome:?}");
    };

    let winner = TaskCompletion::new(&assignment, task.id, task.points, None);
    assert_eq!(h.repo.complete_task(&winner, true).await.unwrap(), 30);

    // The loser of the race hits the uniqueness guard, not a raw store
    // fault, and the ledger is untouched.
    let loser = TaskCompletion::new(&assignment, task.id, task.points, None);
    let err = h.repo.complete_task(&loser, true).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateCompletion));
    assert_eq!(h.repo.xp_total("u1", "g1").await.unwrap(), 30);
}

#[tokio::test]
async fn taskless_quest_completes_on_submission() {
    let h = harness(3).await;
    let quest = Quest::new("g1", "Welcome", "Just show up", 15);
    assign(&h, &quest, &[]).await;

    let result = h.verifier.submit_proof("u1", "g1", None).await.unwrap();
    let SubmitResult::TaskVerified {
        quest_completed,
        points_awarded,
        total_xp,
        ..
    } = result
    else {
        panic!("expected TaskVerified, got {result:?}");
    };
    assert!(quest_completed);
    assert_eq!(points_awarded, 15);
    assert_eq!(total_xp, 15);
}
