//! OpenAI-compatible chat-completion client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::{GenerationClient, GenerationError, GenerationRequest, non_empty};

const SYSTEM_PROMPT: &str = "You are a media buyer assembling advertising campaigns. \
Reply with one JSON object only.";

#[derive(Debug, Clone)]
pub struct HttpGenerationConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for HttpGenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 120,
        }
    }
}

pub struct HttpGenerationClient {
    client: reqwest::Client,
    config: HttpGenerationConfig,
}

impl std::fmt::Debug for HttpGenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGenerationClient")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .finish()
    }
}

impl HttpGenerationClient {
    pub fn new(config: HttpGenerationConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn headers(&self) -> Result<HeaderMap, GenerationError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| GenerationError::Transport(format!("invalid API key header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

fn chat_body<'a>(model: &'a str, request: &'a GenerationRequest) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT,
            },
            ChatMessage {
                role: "user",
                content: &request.task,
            },
        ],
        temperature: request.temperature,
        max_tokens: request.max_output_tokens,
    }
}

/// Pull the first choice's text out of a chat-completion response body.
fn parse_chat_response(body: &str) -> Result<String, GenerationError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Response(format!("malformed completion body: {e}")))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::Response("completion has no choices".to_string()))?
        .message
        .content
        .unwrap_or_default();
    non_empty(content)
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .headers(self.headers()?)
            .json(&chat_body(&self.config.model, request))
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::RateLimited(text));
        }
        if !status.is_success() {
            return Err(GenerationError::Response(format!("HTTP {status}: {text}")));
        }

        parse_chat_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_forwards_temperature_and_token_budget() {
        let request = GenerationRequest {
            task: "plan it".to_string(),
            temperature: 0.2,
            max_output_tokens: 512,
        };
        let body = serde_json::to_value(chat_body("m", &request)).unwrap();
        assert_eq!(body["model"], "m");
        assert_eq!(body["max_tokens"], 512);
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(body["messages"][1]["content"], "plan it");
    }

    #[test]
    fn parses_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"totalCost\":1}"}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap(), r#"{"totalCost":1}"#);
    }

    #[test]
    fn empty_content_is_empty_output() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert_eq!(parse_chat_response(body), Err(GenerationError::EmptyOutput));
    }

    #[test]
    fn missing_choices_is_a_response_error() {
        assert!(matches!(
            parse_chat_response(r#"{"choices":[]}"#),
            Err(GenerationError::Response(_))
        ));
        assert!(matches!(
            parse_chat_response("<html>"),
            Err(GenerationError::Response(_))
        ));
    }

    #[test]
    fn api_key_becomes_bearer_header() {
        let client = HttpGenerationClient::new(HttpGenerationConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        })
        .unwrap();
        let headers = client.headers().unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-test");
    }
}
