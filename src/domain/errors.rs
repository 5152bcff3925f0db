//! Domain errors for the quest engine.

use thiserror::Error;

/// Errors surfaced by the engine's services.
///
/// A failed verification is not an error: the dispatcher reports it as a
/// normal `VerificationOutcome { verified: false, .. }` and the verifier
/// translates it into an attempt-counter increment.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or missing user input. No retry, no attempt-counter effect.
    #[error("{0}")]
    UserInput(String),

    /// The assignment's attempt cap is exhausted; the quest is failed.
    #[error("No attempts remaining; the quest has been failed")]
    AttemptsExhausted,

    /// Normal throttling outcome, not a fault.
    #[error("Rate limited; retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Transient failure from an external call (timeout, connection error,
    /// non-2xx). Folded into a not-verified outcome inside the verification
    /// path; surfaced directly elsewhere.
    #[error("Integration failure: {0}")]
    Integration(String),

    /// Store unavailable, registration failure mid-creation, and other
    /// faults the user cannot act on.
    #[error("Infrastructure fault: {0}")]
    Infrastructure(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<crate::domain::ports::StoreError> for EngineError {
    fn from(err: crate::domain::ports::StoreError) -> Self {
        Self::Infrastructure(err.to_string())
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        Self::Infrastructure(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Infrastructure(err.to_string())
    }
}
