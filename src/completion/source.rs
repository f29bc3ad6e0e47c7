//! The capability every completion source implements.

use super::context::CompletionContext;
use super::suggestion::CompletionItem;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name} timed out after {elapsed:?}")]
    Timeout {
        source_name: String,
        elapsed: Duration,
    },
    #[error("{source_name} provider failed: {message}")]
    Provider {
        source_name: String,
        message: String,
    },
}

/// A provider of completion items.
///
/// Sources are queried concurrently and must not depend on each other. A
/// source that fails only loses its own items.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    fn name(&self) -> &str;

    /// Higher priorities are merged first and win ties
    fn priority(&self) -> i32;

    async fn complete(&self, ctx: &CompletionContext) -> Result<Vec<CompletionItem>, SourceError>;
}
