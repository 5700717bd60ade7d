//! Guardrails: the dollar limits derived from a profile and a budget.
//!
//! Both the prompt composer and the validator read limits from one
//! [`Guardrails`] value, so the numbers the collaborator is told and the
//! numbers it is judged against are the same numbers.

use serde::Serialize;

use crate::profile::StrategyProfile;

/// Share of total spend the three largest publications may take before a
/// soft concentration warning is raised.
pub const TOP_THREE_CONCENTRATION_LIMIT: f64 = 0.85;

/// Absolute tolerance for dollar comparisons (half a cent).
pub const AMOUNT_TOLERANCE: f64 = 0.005;

/// Limits for one (profile, budget) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guardrails {
    pub budget: f64,
    /// Overage actually tolerated; zero under a strict budget.
    pub overage_percent: f64,
    /// `budget * (1 + overage_percent)`.
    pub budget_ceiling: f64,
    /// Smallest total an included publication may have.
    pub publication_floor: f64,
    /// Largest total any publication may have.
    pub publication_ceiling: f64,
    pub max_publication_percent: f64,
    pub concentration_limit: f64,
    /// Publication count range the collaborator is asked to hit.
    pub min_publications: u32,
    pub max_publications: u32,
    /// Budget-derived count below which a soft warning is raised.
    pub target_publications: u32,
}

impl Guardrails {
    pub fn derive(profile: &StrategyProfile, budget: f64) -> Self {
        let c = &profile.constraints;

        let overage_percent = if c.strict_budget {
            0.0
        } else {
            c.max_overage_percent
        };
        let budget_ceiling = budget * (1.0 + overage_percent);
        let publication_floor = c.min_publication_spend;
        let publication_ceiling = budget * c.max_publication_percent;

        // How many publications the floor lets the budget cover at all.
        let feasible_max = if publication_floor > 0.0 {
            (budget_ceiling / publication_floor).floor() as u32
        } else {
            c.max_publications
        };
        let max_publications = c.max_publications.min(feasible_max).max(1);
        let min_publications = c.min_publications.min(max_publications);

        let tier = if budget < 5_000.0 {
            3
        } else if budget < 15_000.0 {
            6
        } else if budget < 50_000.0 {
            10
        } else {
            15
        };
        let target_publications = tier.clamp(min_publications, max_publications);

        Self {
            budget,
            overage_percent,
            budget_ceiling,
            publication_floor,
            publication_ceiling,
            max_publication_percent: c.max_publication_percent,
            concentration_limit: TOP_THREE_CONCENTRATION_LIMIT,
            min_publications,
            max_publications,
            target_publications,
        }
    }

    pub fn exceeds_budget(&self, total: f64) -> bool {
        total > self.budget_ceiling + AMOUNT_TOLERANCE
    }

    pub fn below_floor(&self, publication_total: f64) -> bool {
        publication_total + AMOUNT_TOLERANCE < self.publication_floor
    }

    pub fn above_ceiling(&self, publication_total: f64) -> bool {
        publication_total > self.publication_ceiling + AMOUNT_TOLERANCE
    }
}
