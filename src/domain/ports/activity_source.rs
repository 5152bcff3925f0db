use crate::domain::models::ActivityKind;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Optional filters over an activity aggregate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityWindow {
    /// Only count activity at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Only count activity in this channel.
    pub channel_id: Option<String>,
}

/// Port over the platform event source. The engine never interprets raw
/// platform protocol, only these derived counts.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Aggregate count for the activity kind. Role membership yields 0 or 1
    /// and ignores the window.
    async fn count(
        &self,
        user_id: &str,
        guild_id: &str,
        kind: &ActivityKind,
        window: &ActivityWindow,
    ) -> Result<i64>;
}
