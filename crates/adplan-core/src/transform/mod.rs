//! Plan transformer: turns a controller outcome into the outbound result.
//!
//! Lines are priced with [`PlannedItem::billed`], the same pricing the
//! validator judged: quantity times the catalog rate under the catalog
//! pricing model. Lines that are not billable are dropped with a note.
//! Missing specifications are filled from the catalog entry, and reach is
//! estimated by a [`ReachCalculator`].

pub mod reach;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::BillingCycle;
use crate::catalog::{AudienceMetric, InventoryItem, PricingModel};
use crate::context::RequestContext;
use crate::guardrails::AMOUNT_TOLERANCE;
use crate::plan::{BilledLine, PlannedItem, SelectedPublication};
use crate::pruning::PruningOutcome;
use crate::validate::money;

pub use reach::{AudienceReachCalculator, PerformanceEstimate, ReachCalculator};

/// The order representation handed to the rest of the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningResult {
    pub selected_inventory: Vec<SelectedInventory>,
    pub pricing: PricingSummary,
    pub estimated_performance: PerformanceEstimate,
    pub warnings: Vec<String>,
    pub algorithm: AlgorithmInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedInventory {
    pub publication_id: i64,
    pub publication_name: String,
    pub publication_total: f64,
    pub items: Vec<InventoryLine>,
}

/// One priced line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLine {
    pub item_path: String,
    pub item_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing_model: Option<PricingModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    pub item_cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<AudienceMetric>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub specifications: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSummary {
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub budget: f64,
    /// Sum of every publication total, per billing cycle.
    pub total: f64,
    pub monthly_total: f64,
    /// Spend over the whole campaign.
    pub campaign_total: f64,
    pub remaining_budget: f64,
    pub duration_months: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub executed_at: DateTime<Utc>,
}

/// Builds a [`PlanningResult`] from a finished controller run.
pub struct PlanTransformer<'a> {
    reach: &'a dyn ReachCalculator,
}

impl<'a> PlanTransformer<'a> {
    pub fn new(reach: &'a dyn ReachCalculator) -> Self {
        Self { reach }
    }

    pub fn transform(
        &self,
        outcome: &PruningOutcome,
        ctx: &RequestContext<'_>,
        executed_at: DateTime<Utc>,
    ) -> PlanningResult {
        let mut notes = Vec::new();
        let selected_inventory: Vec<SelectedInventory> = outcome
            .plan
            .selected_publications
            .iter()
            .filter_map(|p| self.convert_publication(p, ctx, &mut notes))
            .collect();

        let total: f64 = selected_inventory.iter().map(|p| p.publication_total).sum();
        let pricing = pricing_summary(total, ctx);
        let estimated_performance = self.reach.estimate(&selected_inventory, total);

        let warnings = collect_warnings(outcome, ctx, &selected_inventory, notes);

        PlanningResult {
            selected_inventory,
            pricing,
            estimated_performance,
            warnings,
            algorithm: AlgorithmInfo {
                id: ctx.profile.id.clone(),
                name: ctx.profile.name.clone(),
                version: ctx.profile.version.clone(),
                executed_at,
            },
        }
    }

    fn convert_publication(
        &self,
        publication: &SelectedPublication,
        ctx: &RequestContext<'_>,
        notes: &mut Vec<String>,
    ) -> Option<SelectedInventory> {
        let items: Vec<InventoryLine> = publication
            .billed_lines(Some(ctx.catalog))
            .filter_map(|(item, entry, billed)| {
                if billed.is_billable() {
                    Some(convert_line(item, entry, billed, notes))
                } else {
                    notes.push(format!(
                        "dropped {} from publication #{}: quantity {} costing {} is not billable",
                        line_label(item, entry),
                        publication.publication_id,
                        billed.quantity,
                        money(billed.cost)
                    ));
                    None
                }
            })
            .collect();
        let publication_total = publication.billed_total(Some(ctx.catalog));
        if items.is_empty() && publication_total <= 0.0 {
            return None;
        }

        let publication_name = if publication.publication_name.is_empty() {
            ctx.catalog
                .find_publication(publication.publication_id)
                .map(|p| p.name.clone())
                .unwrap_or_default()
        } else {
            publication.publication_name.clone()
        };

        Some(SelectedInventory {
            publication_id: publication.publication_id,
            publication_name,
            publication_total,
            items,
        })
    }
}

fn line_label(item: &PlannedItem, entry: Option<&InventoryItem>) -> String {
    match entry {
        Some(e) => e.name.clone(),
        None if item.item_name.is_empty() => item.item_path.clone(),
        None => item.item_name.clone(),
    }
}

fn convert_line(
    item: &PlannedItem,
    entry: Option<&InventoryItem>,
    billed: BilledLine,
    notes: &mut Vec<String>,
) -> InventoryLine {
    if let (Some(e), Some(proposed)) = (entry, item.unit_price) {
        if (proposed - e.unit_price).abs() > AMOUNT_TOLERANCE {
            notes.push(format!(
                "rate for {} corrected from {} to the catalog rate {}",
                e.name,
                money(proposed),
                money(e.unit_price)
            ));
        }
    }

    let mut specifications = item.specifications.clone();
    if let Some(e) = entry {
        for (key, value) in &e.specifications {
            specifications
                .entry(key.clone())
                .or_insert_with(|| serde_json::Value::String(value.clone()));
        }
    }

    InventoryLine {
        item_path: if item.item_path.is_empty() {
            entry.map(|e| e.path.clone()).unwrap_or_default()
        } else {
            item.item_path.clone()
        },
        item_name: if item.item_name.is_empty() {
            entry.map(|e| e.name.clone()).unwrap_or_default()
        } else {
            item.item_name.clone()
        },
        channel: item
            .channel
            .clone()
            .or_else(|| entry.map(|e| e.channel.to_string())),
        quantity: billed.quantity,
        unit_price: billed.unit_price,
        pricing_model: billed.pricing_model,
        frequency: item
            .frequency
            .clone()
            .or_else(|| entry.and_then(|e| e.frequency.clone())),
        item_cost: billed.cost,
        audience: entry.map(|e| e.audience),
        specifications,
    }
}

fn pricing_summary(total: f64, ctx: &RequestContext<'_>) -> PricingSummary {
    let campaign = ctx.campaign;
    let months = campaign.duration_months.max(1);
    let (monthly_total, campaign_total) = match campaign.billing_cycle {
        BillingCycle::Monthly => (total, total * months as f64),
        BillingCycle::OneTime => (total / months as f64, total),
    };
    PricingSummary {
        currency: campaign.currency.clone(),
        billing_cycle: campaign.billing_cycle,
        budget: campaign.budget,
        total,
        monthly_total,
        campaign_total,
        remaining_budget: campaign.budget - total,
        duration_months: months,
    }
}

/// Union of collaborator warnings, violations, soft findings and notes,
/// in that order, without duplicates.
fn collect_warnings(
    outcome: &PruningOutcome,
    ctx: &RequestContext<'_>,
    inventory: &[SelectedInventory],
    notes: Vec<String>,
) -> Vec<String> {
    let mut warnings = Vec::new();
    warnings.extend(outcome.plan.warnings.iter().cloned());

    if !outcome.is_accepted() {
        warnings.push(format!(
            "plan still breaks {} hard limit(s) after {} correction pass(es)",
            outcome.verdict.violations.len(),
            outcome.passes_used
        ));
        warnings.extend(outcome.verdict.violation_messages());
    }
    warnings.extend(outcome.verdict.warnings.iter().cloned());
    if let Some(reason) = &outcome.early_stop {
        warnings.push(reason.clone());
    }
    warnings.extend(notes);

    warnings.push(format!(
        "{} publications selected (target {})",
        inventory.len(),
        ctx.guardrails.target_publications
    ));

    let mut seen = BTreeSet::new();
    warnings.retain(|w| seen.insert(w.clone()));
    warnings
}
