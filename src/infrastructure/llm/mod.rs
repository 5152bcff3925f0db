pub mod client;
pub mod retry;
pub mod types;

pub use client::AnthropicCompletionClient;
pub use retry::{CompletionApiError, RetryPolicy};
