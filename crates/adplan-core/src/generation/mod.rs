//! Generation clients: the seam to the external text-generating collaborator.
//!
//! A client takes a task description and returns free-form text. Clients
//! never retry; the pruning controller decides what a failure means.

pub mod claude_cli;
pub mod http;
pub mod scripted;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use claude_cli::ClaudeCliClient;
pub use http::{HttpGenerationClient, HttpGenerationConfig};
pub use scripted::ScriptedGenerationClient;

/// One call to the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub task: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Why a generation call produced no usable text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("collaborator returned empty output")]
    EmptyOutput,

    #[error("unexpected response: {0}")]
    Response(String),
}

/// Adapter interface for text-generation backends.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Short backend name for logs (e.g. "http", "claude-cli").
    fn name(&self) -> &str;

    /// Send one task description and return the raw text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

#[async_trait]
impl GenerationClient for Arc<dyn GenerationClient> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        (**self).generate(request).await
    }
}

const _: () = {
    fn _assert_object_safe(_: &dyn GenerationClient) {}
};

/// Map blank output onto [`GenerationError::EmptyOutput`].
pub(crate) fn non_empty(text: String) -> Result<String, GenerationError> {
    if text.trim().is_empty() {
        Err(GenerationError::EmptyOutput)
    } else {
        Ok(text)
    }
}
