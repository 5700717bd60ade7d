//! Response extractor: recovers a [`CandidatePlan`] from free-form text.
//!
//! All tolerance for malformed collaborator output lives here. The steps
//! are fixed:
//!
//! 1. drop lines that are nothing but a fenced-block delimiter
//! 2. trim
//! 3. slice from the first `{` to the last `}`
//! 4. remove stray backticks from the slice
//! 5. strict JSON parse, then a relaxed parse (see [`super::relaxed`])

use thiserror::Error;

use super::CandidatePlan;
use super::relaxed;

/// Characters of context kept around a failure position.
const EXCERPT_RADIUS: usize = 60;

/// Collaborator output that could not be turned into a plan.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unrecoverable collaborator output: {reason} (near {excerpt:?})")]
pub struct ParseFailure {
    pub reason: String,
    /// Text around the failure.
    pub excerpt: String,
    /// Approximate character offset of the failure inside the extracted
    /// payload, when the parser reported one.
    pub offset: Option<usize>,
}

impl ParseFailure {
    fn new(reason: impl Into<String>, text: &str, offset: Option<usize>) -> Self {
        Self {
            reason: reason.into(),
            excerpt: excerpt_around(text, offset.unwrap_or(0)),
            offset,
        }
    }
}

/// Recover the structured payload and return it as compact JSON text.
pub fn extract_payload(raw: &str) -> Result<String, ParseFailure> {
    let value = extract_value(raw)?;
    serde_json::to_string(&value)
        .map_err(|e| ParseFailure::new(format!("re-encoding payload: {e}"), raw, None))
}

/// Recover a [`CandidatePlan`] from raw collaborator output.
pub fn extract_plan(raw: &str) -> Result<CandidatePlan, ParseFailure> {
    let value = extract_value(raw)?;
    serde_json::from_value::<CandidatePlan>(value.clone()).map_err(|e| {
        let text = value.to_string();
        ParseFailure::new(format!("payload does not match the plan shape: {e}"), &text, None)
    })
}

fn extract_value(raw: &str) -> Result<serde_json::Value, ParseFailure> {
    let unfenced: Vec<&str> = raw.lines().filter(|l| !is_fence_line(l)).collect();
    let cleaned = unfenced.join("\n");
    let cleaned = cleaned.trim();

    let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) else {
        return Err(ParseFailure::new("no braced payload found", cleaned, None));
    };
    if end < start {
        return Err(ParseFailure::new(
            "closing brace precedes opening brace",
            cleaned,
            Some(end),
        ));
    }

    let payload: String = cleaned[start..=end].chars().filter(|c| *c != '`').collect();

    let strict_err = match serde_json::from_str::<serde_json::Value>(&payload) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let relaxed_text = relaxed::normalize(&payload);
    match serde_json::from_str::<serde_json::Value>(&relaxed_text) {
        Ok(value) => {
            tracing::debug!(error = %strict_err, "strict parse failed; relaxed parse succeeded");
            Ok(value)
        }
        Err(_) => {
            let offset = error_offset(&payload, &strict_err);
            Err(ParseFailure::new(strict_err.to_string(), &payload, offset))
        }
    }
}

/// A line consisting only of a fence delimiter and an optional language tag.
fn is_fence_line(line: &str) -> bool {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return false;
    };
    rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Convert serde_json's 1-based line/column into a character offset.
fn error_offset(text: &str, err: &serde_json::Error) -> Option<usize> {
    if err.line() == 0 {
        return None;
    }
    let mut offset = 0;
    for (idx, line) in text.split('\n').enumerate() {
        if idx + 1 == err.line() {
            return Some(offset + err.column().saturating_sub(1).min(line.chars().count()));
        }
        offset += line.chars().count() + 1;
    }
    Some(text.chars().count())
}

fn excerpt_around(text: &str, offset: usize) -> String {
    let start = offset.saturating_sub(EXCERPT_RADIUS);
    text.chars().skip(start).take(EXCERPT_RADIUS * 2).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::tests::plan_with_totals;

    #[test]
    fn recovers_payload_from_inline_fence_and_prose() {
        let raw = "Sure! ```json {\"totalCost\": 100} ``` Hope that helps!";
        assert_eq!(extract_payload(raw).unwrap(), r#"{"totalCost":100}"#);
    }

    #[test]
    fn strips_fence_lines() {
        let raw = "Here is the plan:\n```json\n{\n  \"totalCost\": 250\n}\n```\n";
        let plan = extract_plan(raw).unwrap();
        assert_eq!(plan.total_cost, Some(250.0));
        assert!(plan.selected_publications.is_empty());
    }

    #[test]
    fn well_formed_plan_round_trips() {
        let mut plan = plan_with_totals(&[(1, 4000.0), (2, 3500.5)]);
        plan.warnings = vec!["thin coverage".to_string()];
        plan.reasoning = Some("balanced".to_string());
        let text = serde_json::to_string_pretty(&plan).unwrap();
        assert_eq!(extract_plan(&text).unwrap(), plan);
    }

    #[test]
    fn falls_back_to_relaxed_parse() {
        let raw = "{ totalCost: 100, 'warnings': ['tight budget',], }";
        let plan = extract_plan(raw).unwrap();
        assert_eq!(plan.total_cost, Some(100.0));
        assert_eq!(plan.warnings, vec!["tight budget".to_string()]);
    }

    #[test]
    fn no_braces_is_a_failure() {
        let err = extract_plan("I could not build a plan, sorry.").unwrap_err();
        assert!(err.reason.contains("no braced payload"));
        assert_eq!(err.offset, None);
        assert!(err.excerpt.contains("could not build"));
    }

    #[test]
    fn reversed_braces_is_a_failure() {
        assert!(extract_plan("} nothing here {").is_err());
    }

    #[test]
    fn unrecoverable_payload_reports_offset() {
        let raw = "{\n  \"totalCost\": 100,\n  \"warnings\": [oops oops]\n}";
        let err = extract_plan(raw).unwrap_err();
        let offset = err.offset.expect("offset should be derivable");
        assert!(offset > 20, "offset {offset} should point into line three");
        assert!(err.excerpt.contains("oops"));
    }

    #[test]
    fn shape_mismatch_is_a_failure() {
        let err = extract_plan(r#"{"selectedPublications": "none"}"#).unwrap_err();
        assert!(err.reason.contains("plan shape"), "got: {}", err.reason);
    }

    #[test]
    fn stray_backticks_are_removed() {
        let plan = extract_plan("{\"totalCost\": `100`}").unwrap();
        assert_eq!(plan.total_cost, Some(100.0));
    }
}
