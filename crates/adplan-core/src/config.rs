//! Engine tuning knobs.

use serde::{Deserialize, Serialize};

/// Settings threaded explicitly through the pruning controller.
///
/// Deserializes from the `[engine]` table of the CLI config file; every
/// field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Temperature for the initial generation pass.
    pub initial_temperature: f32,
    /// Temperature for correction passes.
    pub correction_temperature: f32,
    pub max_output_tokens: u32,
    /// When false, a generation failure during a correction pass ends the
    /// loop and keeps the last plan instead of failing the request.
    pub abort_on_correction_failure: bool,
    /// Character budget for prompts and raw output in debug logs.
    pub log_truncation_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 0.7,
            correction_temperature: 0.2,
            max_output_tokens: 8192,
            abort_on_correction_failure: true,
            log_truncation_chars: 2000,
        }
    }
}

/// Truncate `text` to at most `max_chars` characters for logging.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}... (truncated)")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.initial_temperature, 0.7);
        assert_eq!(cfg.correction_temperature, 0.2);
        assert_eq!(cfg.max_output_tokens, 8192);
        assert!(cfg.abort_on_correction_failure);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: EngineConfig = toml::from_str("correction_temperature = 0.1").unwrap();
        assert_eq!(cfg.correction_temperature, 0.1);
        assert_eq!(cfg.max_output_tokens, 8192);
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("abcdef", 3), "abc... (truncated)");
        assert_eq!(truncate_for_log("ééé", 2), "éé... (truncated)");
    }
}
