//! Pruning controller: the bounded generate, validate, correct loop.
//!
//! ```text
//! generating -> validating
//! validating -> accepted
//! validating -> correcting
//! validating -> exhausted
//! correcting -> validating
//! correcting -> exhausted   (unreadable output, or a tolerated generation failure)
//! ```
//!
//! One external call is made while generating and one per correction pass,
//! so a request never makes more than `1 + max_correction_passes` calls.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, truncate_for_log};
use crate::context::RequestContext;
use crate::error::EngineError;
use crate::generation::{GenerationClient, GenerationError, GenerationRequest};
use crate::plan::{CandidatePlan, extract_plan};
use crate::prompt::{compose_repair, compose_task};
use crate::validate::{Validator, Verdict};

/// Controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    Generating,
    Validating,
    Correcting,
    Accepted,
    Exhausted,
}

impl PassState {
    pub fn is_valid_transition(from: PassState, to: PassState) -> bool {
        use PassState::*;
        matches!(
            (from, to),
            (Generating, Validating)
                | (Validating, Accepted)
                | (Validating, Correcting)
                | (Validating, Exhausted)
                | (Correcting, Validating)
                | (Correcting, Exhausted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PassState::Accepted | PassState::Exhausted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PassState::Generating => "generating",
            PassState::Validating => "validating",
            PassState::Correcting => "correcting",
            PassState::Accepted => "accepted",
            PassState::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated plan in the pass history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassRecord {
    /// 0 for the initial generation, then 1.. for corrections.
    pub pass: u8,
    pub total_cost: Option<f64>,
    /// Sum of the lines at catalog rates.
    pub line_item_total: f64,
    pub publication_count: usize,
    pub violations: usize,
}

/// What the controller hands back.
#[derive(Debug, Clone)]
pub struct PruningOutcome {
    /// `Accepted` or `Exhausted`.
    pub state: PassState,
    pub plan: CandidatePlan,
    pub initial_plan: CandidatePlan,
    /// Verdict on `plan`.
    pub verdict: Verdict,
    pub passes_used: u8,
    pub calls_made: u8,
    pub history: Vec<PassRecord>,
    /// Why the loop ended before its pass budget, if it did.
    pub early_stop: Option<String>,
    /// The initial task description.
    pub task: String,
}

impl PruningOutcome {
    pub fn is_accepted(&self) -> bool {
        self.state == PassState::Accepted
    }
}

/// Drives one request through the pass loop.
pub struct PruningController<'a> {
    client: &'a dyn GenerationClient,
    config: &'a EngineConfig,
}

impl<'a> PruningController<'a> {
    pub fn new(client: &'a dyn GenerationClient, config: &'a EngineConfig) -> Self {
        Self { client, config }
    }

    pub async fn run(&self, ctx: &RequestContext<'_>) -> Result<PruningOutcome, EngineError> {
        let max_passes = ctx.profile.constraints.max_correction_passes;
        let validator = Validator::new(ctx.guardrails, ctx.profile).with_catalog(ctx.catalog);

        let mut state = PassState::Generating;
        let mut calls_made: u8 = 0;
        let mut passes_used: u8 = 0;
        let mut history = Vec::new();
        let mut early_stop = None;

        info!(
            hub_id = %ctx.catalog.hub_id,
            profile = %ctx.profile.id,
            max_passes,
            client = self.client.name(),
            "pruning loop starting"
        );

        let task = compose_task(ctx);
        calls_made += 1;
        let raw = self
            .call(&task, self.config.initial_temperature, 0)
            .await
            .map_err(|source| EngineError::Generation { pass: 0, source })?;
        let mut current =
            extract_plan(&raw).map_err(|source| EngineError::Parse { pass: 0, source })?;
        let initial_plan = current.clone();

        let verdict = loop {
            self.advance(&mut state, PassState::Validating, passes_used);
            let verdict = validator.validate(&current);
            history.push(PassRecord {
                pass: passes_used,
                total_cost: current.total_cost,
                line_item_total: current.billed_total(Some(ctx.catalog)),
                publication_count: current.publication_count(),
                violations: verdict.violations.len(),
            });
            info!(
                pass = passes_used,
                total_cost = current.total_cost.unwrap_or(f64::NAN),
                violations = verdict.violations.len(),
                warnings = verdict.warnings.len(),
                "plan validated"
            );

            if !verdict.needs_correction() {
                self.advance(&mut state, PassState::Accepted, passes_used);
                break verdict;
            }
            if passes_used >= max_passes {
                self.advance(&mut state, PassState::Exhausted, passes_used);
                break verdict;
            }

            self.advance(&mut state, PassState::Correcting, passes_used);
            passes_used += 1;
            let repair = compose_repair(ctx, &current, &verdict);
            calls_made += 1;

            let raw = match self
                .call(&repair, self.config.correction_temperature, passes_used)
                .await
            {
                Ok(raw) => raw,
                Err(source) if self.config.abort_on_correction_failure => {
                    return Err(EngineError::Generation {
                        pass: passes_used,
                        source,
                    });
                }
                Err(source) => {
                    warn!(pass = passes_used, error = %source, "correction pass failed; keeping previous plan");
                    early_stop = Some(format!("correction pass {passes_used} failed: {source}"));
                    self.advance(&mut state, PassState::Exhausted, passes_used);
                    break verdict;
                }
            };

            match extract_plan(&raw) {
                Ok(plan) => current = plan,
                Err(failure) => {
                    warn!(pass = passes_used, error = %failure, "correction output unreadable; keeping previous plan");
                    early_stop = Some(format!(
                        "correction pass {passes_used} output unreadable: {}",
                        failure.reason
                    ));
                    self.advance(&mut state, PassState::Exhausted, passes_used);
                    break verdict;
                }
            }
        };

        info!(
            state = %state,
            passes_used,
            calls_made,
            total_cost = current.total_cost.unwrap_or(f64::NAN),
            "pruning loop finished"
        );

        Ok(PruningOutcome {
            state,
            plan: current,
            initial_plan,
            verdict,
            passes_used,
            calls_made,
            history,
            early_stop,
            task,
        })
    }

    async fn call(&self, task: &str, temperature: f32, pass: u8) -> Result<String, GenerationError> {
        let budget = self.config.log_truncation_chars;
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(pass, temperature, prompt = %truncate_for_log(task, budget), "sending task");
        }

        let request = GenerationRequest {
            task: task.to_string(),
            temperature,
            max_output_tokens: self.config.max_output_tokens,
        };
        let raw = self.client.generate(&request).await?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(pass, output = %truncate_for_log(&raw, budget), "raw collaborator output");
        }
        Ok(raw)
    }

    fn advance(&self, state: &mut PassState, next: PassState, pass: u8) {
        debug_assert!(
            PassState::is_valid_transition(*state, next),
            "invalid pass transition {state} -> {next}"
        );
        info!(pass, from = %state, to = %next, "pass state transition");
        *state = next;
    }
}
