//! CLI command implementations.

pub mod activity;
pub mod assign;
pub mod author;
pub mod init;
pub mod quest;
pub mod status;
pub mod verify;

use crate::services::{Decision, FixedWindowRateLimiter};
use anyhow::{bail, Result};

/// Check the per-user throttle for an action before running it.
pub(crate) async fn enforce_rate_limit(
    limiter: &FixedWindowRateLimiter,
    user_id: &str,
    action: &str,
) -> Result<()> {
    match limiter.check(user_id, action).await {
        Decision::Allowed => Ok(()),
        Decision::Limited { retry_after_secs } => {
            bail!("Rate limited; retry in {retry_after_secs}s")
        }
    }
}
