//! Constraint validator.
//!
//! A pure check of one [`CandidatePlan`] against the [`Guardrails`] derived
//! from a strategy profile. Hard violations drive the correction loop; soft
//! findings are warnings only. The same inputs always produce the same
//! [`Verdict`].
//!
//! Given the catalog, lines are priced with [`crate::plan::PlannedItem::billed`],
//! so a plan is judged at the rates it will be billed at.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::guardrails::Guardrails;
use crate::plan::{CandidatePlan, SelectedPublication};
use crate::profile::StrategyProfile;

/// Relative disagreement between the declared total and the line items
/// above which a warning is raised.
const TOTAL_MISMATCH_TOLERANCE: f64 = 0.01;

/// A hard constraint the plan fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    MissingTotal,
    NonFiniteTotal,
    NonPositiveTotal {
        total: f64,
    },
    OverBudget {
        total: f64,
        ceiling: f64,
    },
    BelowMinimumSpend {
        publication_id: i64,
        publication_name: String,
        total: f64,
        floor: f64,
    },
    OverPublicationCap {
        publication_id: i64,
        publication_name: String,
        total: f64,
        ceiling: f64,
    },
    /// A line whose quantity or cost is not a positive finite number.
    InvalidLine {
        publication_id: i64,
        publication_name: String,
        item: String,
        quantity: f64,
        cost: f64,
    },
    /// A publication without lines whose declared total is not positive.
    EmptyPublication {
        publication_id: i64,
        publication_name: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTotal => write!(f, "plan does not state a total cost"),
            Self::NonFiniteTotal => write!(f, "plan total cost is not a finite number"),
            Self::NonPositiveTotal { total } => {
                write!(f, "plan total cost {} is not positive", money(*total))
            }
            Self::OverBudget { total, ceiling } => write!(
                f,
                "total cost {} exceeds the budget ceiling of {}",
                money(*total),
                money(*ceiling)
            ),
            Self::BelowMinimumSpend {
                publication_id,
                publication_name,
                total,
                floor,
            } => write!(
                f,
                "{publication_name} (#{publication_id}) total {} is below the minimum spend of {}",
                money(*total),
                money(*floor)
            ),
            Self::OverPublicationCap {
                publication_id,
                publication_name,
                total,
                ceiling,
            } => write!(
                f,
                "{publication_name} (#{publication_id}) total {} exceeds the per-publication cap of {}",
                money(*total),
                money(*ceiling)
            ),
            Self::InvalidLine {
                publication_id,
                publication_name,
                item,
                quantity,
                cost,
            } => write!(
                f,
                "{item} in {publication_name} (#{publication_id}) has quantity {quantity} costing {}; \
                 quantity and cost must be positive",
                money(*cost)
            ),
            Self::EmptyPublication {
                publication_id,
                publication_name,
            } => write!(
                f,
                "{publication_name} (#{publication_id}) lists no items and no positive total"
            ),
        }
    }
}

/// Result of validating one plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub violations: Vec<Violation>,
    pub warnings: Vec<String>,
}

impl Verdict {
    /// True when any hard constraint fails.
    pub fn needs_correction(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn violation_messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

/// Validates plans for one (profile, budget) pair.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    guardrails: &'a Guardrails,
    profile: &'a StrategyProfile,
    catalog: Option<&'a Catalog>,
}

impl<'a> Validator<'a> {
    pub fn new(guardrails: &'a Guardrails, profile: &'a StrategyProfile) -> Self {
        Self {
            guardrails,
            profile,
            catalog: None,
        }
    }

    /// Price lines at `catalog` rates and warn about plan entries that do
    /// not exist in it.
    pub fn with_catalog(mut self, catalog: &'a Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn needs_correction(&self, plan: &CandidatePlan) -> bool {
        self.validate(plan).needs_correction()
    }

    pub fn validate(&self, plan: &CandidatePlan) -> Verdict {
        let mut verdict = Verdict::default();
        self.check_total(plan, &mut verdict);
        self.check_publications(plan, &mut verdict);
        self.check_concentration(plan, &mut verdict);
        self.check_counts(plan, &mut verdict);
        self.check_catalog_references(plan, &mut verdict);
        verdict
    }

    /// Publication total as it will be billed.
    fn publication_total(&self, publication: &SelectedPublication) -> f64 {
        publication.billed_total(self.catalog)
    }

    // -----------------------------------------------------------------------
    // Hard checks
    // -----------------------------------------------------------------------

    fn check_total(&self, plan: &CandidatePlan, verdict: &mut Verdict) {
        let Some(declared) = plan.total_cost else {
            verdict.violations.push(Violation::MissingTotal);
            return;
        };
        if !declared.is_finite() {
            verdict.violations.push(Violation::NonFiniteTotal);
            return;
        }
        if declared <= 0.0 {
            verdict
                .violations
                .push(Violation::NonPositiveTotal { total: declared });
            return;
        }

        // A plan cannot pass the budget check by under-declaring its total.
        let line_total = plan.billed_total(self.catalog);
        let effective = declared.max(line_total);
        if self.guardrails.exceeds_budget(effective) {
            verdict.violations.push(Violation::OverBudget {
                total: effective,
                ceiling: self.guardrails.budget_ceiling,
            });
        }

        if line_total > 0.0 && (declared - line_total).abs() / declared > TOTAL_MISMATCH_TOLERANCE {
            verdict.warnings.push(format!(
                "declared total {} differs from the line-item sum {}",
                money(declared),
                money(line_total)
            ));
        }
    }

    fn check_publications(&self, plan: &CandidatePlan, verdict: &mut Verdict) {
        for publication in &plan.selected_publications {
            self.check_lines(publication, verdict);
            let total = self.publication_total(publication);
            if self.guardrails.below_floor(total) {
                verdict.violations.push(Violation::BelowMinimumSpend {
                    publication_id: publication.publication_id,
                    publication_name: publication.publication_name.clone(),
                    total,
                    floor: self.guardrails.publication_floor,
                });
            }
            if self.guardrails.above_ceiling(total) {
                verdict.violations.push(Violation::OverPublicationCap {
                    publication_id: publication.publication_id,
                    publication_name: publication.publication_name.clone(),
                    total,
                    ceiling: self.guardrails.publication_ceiling,
                });
            }
        }
    }

    fn check_lines(&self, publication: &SelectedPublication, verdict: &mut Verdict) {
        if publication.inventory_items.is_empty() {
            let declared = publication.publication_total.unwrap_or(0.0);
            if !declared.is_finite() || declared <= 0.0 {
                verdict.violations.push(Violation::EmptyPublication {
                    publication_id: publication.publication_id,
                    publication_name: publication.publication_name.clone(),
                });
            }
            return;
        }
        for (item, _, line) in publication.billed_lines(self.catalog) {
            if !line.is_billable() {
                verdict.violations.push(Violation::InvalidLine {
                    publication_id: publication.publication_id,
                    publication_name: publication.publication_name.clone(),
                    item: if item.item_name.is_empty() {
                        item.item_path.clone()
                    } else {
                        item.item_name.clone()
                    },
                    quantity: line.quantity,
                    cost: line.cost,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Soft checks
    // -----------------------------------------------------------------------

    fn check_concentration(&self, plan: &CandidatePlan, verdict: &mut Verdict) {
        if plan.publication_count() <= 3 {
            return;
        }
        let mut totals: Vec<f64> = plan
            .selected_publications
            .iter()
            .map(|p| self.publication_total(p))
            .collect();
        totals.sort_by(|a, b| b.total_cmp(a));
        let sum: f64 = totals.iter().sum();
        if sum <= 0.0 {
            return;
        }
        let top_three: f64 = totals.iter().take(3).sum();
        let share = top_three / sum;
        if share > self.guardrails.concentration_limit {
            verdict.warnings.push(format!(
                "top three publications take {:.0}% of spend (limit {:.0}%)",
                share * 100.0,
                self.guardrails.concentration_limit * 100.0
            ));
        }
    }

    fn check_counts(&self, plan: &CandidatePlan, verdict: &mut Verdict) {
        let count = plan.publication_count() as u32;
        let c = &self.profile.constraints;

        if count < self.guardrails.target_publications {
            verdict.warnings.push(format!(
                "plan includes {count} publications; {} are expected at this budget",
                self.guardrails.target_publications
            ));
        }
        if count < c.min_publications || count > c.max_publications {
            verdict.warnings.push(format!(
                "publication count {count} is outside the profile range {}-{}",
                c.min_publications, c.max_publications
            ));
        }
        if !self.profile.budget_in_range(self.guardrails.budget) {
            verdict.warnings.push(format!(
                "budget {} is outside the range profile {:?} is designed for",
                money(self.guardrails.budget),
                self.profile.id
            ));
        }
    }

    fn check_catalog_references(&self, plan: &CandidatePlan, verdict: &mut Verdict) {
        let Some(catalog) = self.catalog else {
            return;
        };
        for publication in &plan.selected_publications {
            if catalog.find_publication(publication.publication_id).is_none() {
                verdict.warnings.push(format!(
                    "publication #{} ({}) is not in the catalog",
                    publication.publication_id, publication.publication_name
                ));
                continue;
            }
            for item in &publication.inventory_items {
                if catalog
                    .find_item(publication.publication_id, &item.item_path, &item.item_name)
                    .is_none()
                {
                    verdict.warnings.push(format!(
                        "item {:?} is not offered by publication #{}",
                        if item.item_path.is_empty() {
                            &item.item_name
                        } else {
                            &item.item_path
                        },
                        publication.publication_id
                    ));
                }
            }
        }
    }
}

/// Format a dollar amount as `$12,345.67`.
pub fn money(amount: f64) -> String {
    if !amount.is_finite() {
        return format!("${amount}");
    }
    let negative = amount < 0.0;
    let fixed = format!("{:.2}", amount.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((&fixed, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${grouped}.{frac}", if negative { "-" } else { "" })
}
