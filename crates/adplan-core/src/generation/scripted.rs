//! A generation client that replays queued responses and records requests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{GenerationClient, GenerationError, GenerationRequest};

/// Replays a fixed script of responses in order.
///
/// Every request is recorded so callers can assert on call counts,
/// temperatures and prompt contents. Once the script runs out, further
/// calls fail with [`GenerationError::Response`].
#[derive(Debug, Default)]
pub struct ScriptedGenerationClient {
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerationClient {
    pub fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Script only successful responses.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| Ok(t.into())).collect())
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerationClient for ScriptedGenerationClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self
            .responses
            .lock()
            .map_err(|_| GenerationError::Response("script lock poisoned".to_string()))?
            .pop_front();
        next.unwrap_or_else(|| Err(GenerationError::Response("script exhausted".to_string())))
    }
}
