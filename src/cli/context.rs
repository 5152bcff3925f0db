//! Shared wiring for CLI commands: configuration, database, and services.

use crate::domain::models::Config;
use crate::domain::ports::{
    ActivitySource, CompletionClient, ConnectorClient, ConversationRepository, QuestRepository,
};
use crate::infrastructure::{
    AnthropicCompletionClient, ConfigLoader, DatabaseConnection, HttpConnectorClient,
    SqliteActivitySource, SqliteConversationRepository, SqliteQuestRepository,
};
use crate::services::{
    FixedWindowRateLimiter, QuestAssigner, QuestBuilder, VerificationDispatcher,
    VerificationService,
};
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct AppContext {
    pub config: Config,
    pub db: DatabaseConnection,
    pub quests: Arc<dyn QuestRepository>,
    pub activity: Arc<SqliteActivitySource>,
    pub assigner: QuestAssigner,
    pub verifier: VerificationService,
    pub builder: QuestBuilder,
    pub limiter: Arc<FixedWindowRateLimiter>,
}

impl AppContext {
    /// Load configuration, open the database, and wire every service.
    pub async fn init() -> Result<Self> {
        let config = ConfigLoader::load()?;
        Self::with_config(config).await
    }

    pub async fn with_config(config: Config) -> Result<Self> {
        let db = DatabaseConnection::new(
            &format!("sqlite:{}", config.database.path),
            config.database.max_connections,
        )
        .await
        .context("Failed to open database")?;
        db.migrate().await.context("Failed to run migrations")?;

        let pool = db.pool().clone();
        let quests: Arc<dyn QuestRepository> = Arc::new(SqliteQuestRepository::new(pool.clone()));
        let conversations: Arc<dyn ConversationRepository> =
            Arc::new(SqliteConversationRepository::new(pool.clone()));
        let activity = Arc::new(SqliteActivitySource::new(pool));
        let connectors: Arc<dyn ConnectorClient> = Arc::new(HttpConnectorClient::new(
            config.connector.base_url.clone(),
            config.connector.timeout_secs,
        )?);
        let completion: Arc<dyn CompletionClient> =
            Arc::new(AnthropicCompletionClient::new(&config.llm)?);

        let dispatcher = VerificationDispatcher::new(
            Arc::clone(&activity) as Arc<dyn ActivitySource>,
            Arc::clone(&connectors),
            &config.verification,
        )?;
        let assigner = QuestAssigner::new(Arc::clone(&quests));
        let verifier =
            VerificationService::new(Arc::clone(&quests), dispatcher, &config.verification);
        let builder = QuestBuilder::new(
            conversations,
            Arc::clone(&quests),
            completion,
            connectors,
            config.builder.conversation_ttl_secs,
        );
        let limiter = Arc::new(FixedWindowRateLimiter::new(config.rate_limit.clone()));

        Ok(Self {
            config,
            db,
            quests,
            activity,
            assigner,
            verifier,
            builder,
            limiter,
        })
    }
}
