//! Service layer: the engine's business logic, written against the domain
//! ports so every external seam can be faked in tests.

pub mod assigner;
pub mod builder;
pub mod dispatcher;
pub mod evaluator;
pub mod extractor;
pub mod rate_limiter;
pub mod verifier;

pub use assigner::{AssignOutcome, QuestAssigner};
pub use builder::{BuilderReply, QuestBuilder};
pub use dispatcher::{VerificationDispatcher, VerificationOutcome};
pub use rate_limiter::{Decision, FixedWindowRateLimiter};
pub use verifier::{SubmitResult, VerificationService};
