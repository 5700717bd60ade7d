//! `claude` CLI subprocess client.
//!
//! Runs `claude -p --output-format json`, writes the task description to
//! stdin and reads a single JSON result object from stdout. The CLI has no
//! temperature flag, so temperature is not forwarded.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{GenerationClient, GenerationError, GenerationRequest, non_empty};

#[derive(Debug, Clone)]
pub struct ClaudeCliClient {
    /// Path to the `claude` binary. Defaults to `"claude"` (found via `$PATH`).
    binary: String,
    model: Option<String>,
}

impl ClaudeCliClient {
    pub fn new() -> Self {
        Self {
            binary: "claude".to_string(),
            model: None,
        }
    }

    /// Use a binary at a custom path.
    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            binary: path.into(),
            model: None,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            "--output-format".to_string(),
            "json".to_string(),
        ];
        if let Some(model) = &self.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        args
    }
}

impl Default for ClaudeCliClient {
    fn default() -> Self {
        Self::new()
    }
}

/// The final result object printed by `--output-format json`.
#[derive(Debug, Deserialize)]
struct CliResult {
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    result: Option<String>,
}

fn parse_cli_output(stdout: &str) -> Result<String, GenerationError> {
    let parsed: CliResult = serde_json::from_str(stdout.trim())
        .map_err(|e| GenerationError::Response(format!("malformed CLI output: {e}")))?;
    let result = parsed.result.unwrap_or_default();
    if parsed.is_error {
        let detail = if result.is_empty() {
            parsed.subtype.unwrap_or_else(|| "unknown error".to_string())
        } else {
            result
        };
        if detail.to_ascii_lowercase().contains("rate limit") {
            return Err(GenerationError::RateLimited(detail));
        }
        return Err(GenerationError::Response(detail));
    }
    non_empty(result)
}

#[async_trait]
impl GenerationClient for ClaudeCliClient {
    fn name(&self) -> &str {
        "claude-cli"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        debug!(binary = %self.binary, "spawning claude CLI");
        let mut child = Command::new(&self.binary)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GenerationError::Transport(format!("failed to spawn {}: {e}", self.binary)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.task.as_bytes())
                .await
                .map_err(|e| GenerationError::Transport(format!("writing prompt: {e}")))?;
            // Dropping stdin closes the pipe so the CLI sees EOF.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() && stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenerationError::Transport(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        parse_cli_output(&stdout)
    }
}
