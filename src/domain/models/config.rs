//! Main configuration structure for Questline.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Verification configuration
    #[serde(default)]
    pub verification: VerificationSettings,

    /// Text-completion backend configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Connector protocol configuration
    #[serde(default)]
    pub connector: ConnectorConfig,

    /// Quest builder configuration
    #[serde(default)]
    pub builder: BuilderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            rate_limit: RateLimitConfig::default(),
            verification: VerificationSettings::default(),
            llm: LlmConfig::default(),
            connector: ConnectorConfig::default(),
            builder: BuilderConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".questline/questline.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Fixed-window rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Default per-action ceiling within one window
    #[serde(default = "default_max_per_window")]
    pub max_per_window: u32,

    /// Per-action ceiling overrides, keyed by action name
    #[serde(default)]
    pub action_limits: std::collections::HashMap<String, u32>,

    /// Size ceiling that triggers eager eviction
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Interval between background sweeps, in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

const fn default_window_secs() -> u64 {
    60
}

const fn default_max_per_window() -> u32 {
    5
}

const fn default_max_entries() -> usize {
    10_000
}

const fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_per_window: default_max_per_window(),
            action_limits: std::collections::HashMap::new(),
            max_entries: default_max_entries(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VerificationSettings {
    /// Failed-attempt cap. The counter exceeding this cap is an irreversible
    /// terminal transition.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Timeout for legacy endpoint calls, in seconds
    #[serde(default = "default_legacy_timeout_secs")]
    pub legacy_timeout_secs: u64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_legacy_timeout_secs() -> u64 {
    10
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            legacy_timeout_secs: default_legacy_timeout_secs(),
        }
    }
}

/// Text-completion backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,

    /// Initial retry backoff in milliseconds
    #[serde(default = "default_llm_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum retry backoff in milliseconds
    #[serde(default = "default_llm_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_llm_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_llm_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

const fn default_llm_max_tokens() -> u32 {
    2048
}

const fn default_llm_timeout_secs() -> u64 {
    120
}

const fn default_llm_max_retries() -> u32 {
    3
}

const fn default_llm_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_llm_max_backoff_ms() -> u64 {
    30_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: String::new(),
            model: default_llm_model(),
            max_tokens: default_llm_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_llm_max_retries(),
            initial_backoff_ms: default_llm_initial_backoff_ms(),
            max_backoff_ms: default_llm_max_backoff_ms(),
        }
    }
}

/// Connector protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConnectorConfig {
    #[serde(default = "default_connector_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_connector_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_connector_base_url() -> String {
    "http://localhost:8090".to_string()
}

const fn default_connector_timeout_secs() -> u64 {
    15
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            base_url: default_connector_base_url(),
            timeout_secs: default_connector_timeout_secs(),
        }
    }
}

/// Quest builder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BuilderConfig {
    /// Inactivity window after which an authoring conversation expires, in
    /// seconds
    #[serde(default = "default_conversation_ttl_secs")]
    pub conversation_ttl_secs: i64,
}

const fn default_conversation_ttl_secs() -> i64 {
    1_800
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            conversation_ttl_secs: default_conversation_ttl_secs(),
        }
    }
}
