//! Shared fixtures for integration tests: a migrated temp database and
//! in-memory fakes for the external ports.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use questline::domain::models::{
    ChatTurn, ConnectorDefinition, ConnectorTestResult, Quest, Task, TestMode,
};
use questline::domain::ports::{CompletionClient, ConnectorClient, QuestRepository};
use questline::infrastructure::DatabaseConnection;
use sqlx::SqlitePool;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

/// A migrated SQLite database in a temp directory. Keep the struct alive for
/// the duration of the test; dropping it deletes the files.
pub struct TestDb {
    _dir: TempDir,
    pub pool: SqlitePool,
}

pub async fn test_db() -> TestDb {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("questline-test.db");
    let db = DatabaseConnection::new(&format!("sqlite:{}", path.display()), 5)
        .await
        .expect("open test database");
    db.migrate().await.expect("run migrations");
    TestDb {
        _dir: dir,
        pool: db.pool().clone(),
    }
}

/// Completion backend that replays a fixed script of replies.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedCompletion {
    pub fn new(replies: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, _system: &str, _transcript: &[ChatTurn]) -> Result<String> {
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .ok_or_else(|| anyhow!("scripted completion exhausted"))
    }
}

/// Connector service fake: hands out sequential ids and judges every test
/// call with a configurable verdict.
pub struct FakeConnectorClient {
    next_id: AtomicI64,
    pub fail_register: AtomicBool,
    pub verdict: AtomicBool,
    pub registered: Mutex<Vec<ConnectorDefinition>>,
    pub test_calls: Mutex<Vec<(i64, HashMap<String, String>)>>,
}

impl Default for FakeConnectorClient {
    fn default() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            fail_register: AtomicBool::new(false),
            verdict: AtomicBool::new(true),
            registered: Mutex::new(Vec::new()),
            test_calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ConnectorClient for FakeConnectorClient {
    async fn register_or_update(&self, definition: &ConnectorDefinition) -> Result<i64> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(anyhow!("connector service unavailable"));
        }
        self.registered
            .lock()
            .expect("registered lock")
            .push(definition.clone());
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn test(
        &self,
        id: i64,
        _mode: TestMode,
        variables: &HashMap<String, String>,
    ) -> Result<ConnectorTestResult> {
        self.test_calls
            .lock()
            .expect("test_calls lock")
            .push((id, variables.clone()));
        let verdict = self.verdict.load(Ordering::SeqCst);
        Ok(ConnectorTestResult {
            status: Some(200),
            is_valid: Some(verdict),
            data: None,
            error: None,
        })
    }
}

/// Insert a quest with its tasks directly through the repository.
pub async fn seed_quest(repo: &dyn QuestRepository, quest: &Quest, tasks: &[Task]) {
    repo.create_quest(quest, tasks).await.expect("seed quest");
}
