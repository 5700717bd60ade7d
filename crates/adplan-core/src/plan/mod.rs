//! Candidate plans proposed by the generation collaborator.
//!
//! A [`CandidatePlan`] is the strict intermediate shape every pass produces.
//! Plans are never edited in place: each generation or correction pass
//! yields a fresh value from [`extract::extract_plan`]. Field decoding is
//! forgiving about how numbers are written (`"$9,000"`, `"12"`) because the
//! payload comes from free-form model output.

pub mod extract;
pub mod relaxed;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::{Catalog, InventoryItem, PricingModel};

pub use extract::{ParseFailure, extract_payload, extract_plan};

/// One proposed plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePlan {
    #[serde(default, alias = "publications")]
    pub selected_publications: Vec<SelectedPublication>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_amount"
    )]
    pub total_cost: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_amount"
    )]
    pub monthly_cost: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_amount"
    )]
    pub confidence: Option<f64>,
    /// Warnings the collaborator declared about its own plan.
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// A publication included in a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedPublication {
    #[serde(deserialize_with = "lenient_id")]
    pub publication_id: i64,
    #[serde(default)]
    pub publication_name: String,
    #[serde(default, alias = "items")]
    pub inventory_items: Vec<PlannedItem>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_amount"
    )]
    pub publication_total: Option<f64>,
}

/// One line of a plan: a catalog item with a chosen quantity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedItem {
    #[serde(default)]
    pub item_path: String,
    #[serde(default)]
    pub item_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_amount"
    )]
    pub quantity: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_amount"
    )]
    pub unit_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(
        default,
        alias = "cost",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_amount"
    )]
    pub item_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub specifications: BTreeMap<String, serde_json::Value>,
}

impl PlannedItem {
    /// Parsed pricing model, if the line declares a known one.
    pub fn model(&self) -> Option<PricingModel> {
        self.pricing_model.as_deref().and_then(|m| m.parse().ok())
    }

    /// Price the line for billing. A resolved catalog entry supplies the
    /// rate and pricing model; the line's own figures are used otherwise.
    /// Without a usable rate the declared `itemCost` stands.
    pub fn billed(&self, entry: Option<&InventoryItem>) -> BilledLine {
        let pricing_model = entry.map(|e| e.pricing_model).or_else(|| self.model());
        let unit_price = match entry {
            Some(e) => e.unit_price,
            None => self.unit_price.unwrap_or(0.0),
        };

        let quantity = self.quantity.unwrap_or_else(|| {
            match (self.item_cost, pricing_model) {
                (Some(cost), Some(PricingModel::Cpm)) if unit_price > 0.0 => cost / unit_price * 1000.0,
                (Some(cost), Some(_)) if unit_price > 0.0 => cost / unit_price,
                _ => 1.0,
            }
        });

        let cost = match pricing_model {
            Some(model) if unit_price > 0.0 => model.cost(unit_price, quantity),
            _ => self.item_cost.unwrap_or(0.0),
        };

        BilledLine {
            quantity,
            unit_price,
            pricing_model,
            cost,
        }
    }
}

/// A plan line priced the way it will be billed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilledLine {
    pub quantity: f64,
    pub unit_price: f64,
    pub pricing_model: Option<PricingModel>,
    pub cost: f64,
}

impl BilledLine {
    /// Quantity and cost are both finite and positive.
    pub fn is_billable(&self) -> bool {
        self.quantity.is_finite() && self.quantity > 0.0 && self.cost.is_finite() && self.cost > 0.0
    }
}

impl SelectedPublication {
    /// Each line with its catalog entry, if any, and billed price.
    pub fn billed_lines<'a>(
        &'a self,
        catalog: Option<&'a Catalog>,
    ) -> impl Iterator<Item = (&'a PlannedItem, Option<&'a InventoryItem>, BilledLine)> + 'a {
        self.inventory_items.iter().map(move |item| {
            let entry = catalog
                .and_then(|c| c.find_item(self.publication_id, &item.item_path, &item.item_name));
            (item, entry, item.billed(entry))
        })
    }

    /// Publication total as billed: the sum of billable lines, or the
    /// declared total when the publication lists no lines. Amounts that
    /// are not positive count as zero.
    pub fn billed_total(&self, catalog: Option<&Catalog>) -> f64 {
        if self.inventory_items.is_empty() {
            return self
                .publication_total
                .filter(|t| t.is_finite() && *t > 0.0)
                .unwrap_or(0.0);
        }
        self.billed_lines(catalog)
            .filter(|(_, _, line)| line.is_billable())
            .map(|(_, _, line)| line.cost)
            .sum()
    }
}

impl CandidatePlan {
    pub fn publication_count(&self) -> usize {
        self.selected_publications.len()
    }

    /// Sum of billed publication totals.
    pub fn billed_total(&self, catalog: Option<&Catalog>) -> f64 {
        self.selected_publications
            .iter()
            .map(|p| p.billed_total(catalog))
            .sum()
    }

    /// `(publication_id, billed total)` pairs, largest first.
    pub fn billed_totals_descending(&self, catalog: Option<&Catalog>) -> Vec<(i64, f64)> {
        let mut totals: Vec<(i64, f64)> = self
            .selected_publications
            .iter()
            .map(|p| (p.publication_id, p.billed_total(catalog)))
            .collect();
        totals.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        totals
    }
}

// ---------------------------------------------------------------------------
// Forgiving field decoders
// ---------------------------------------------------------------------------

/// Parse a number written as `1200`, `"1200"`, `"$1,200.50"` or `null`.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' ' | '%'))
                .collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            cleaned
                .parse::<f64>()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("expected a number, got {s:?}")))
        }
        Some(other) => Err(D::Error::custom(format!("expected a number, got {other}"))),
    }
}

/// Parse a publication id written as a number or a numeric string.
fn lenient_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| D::Error::custom(format!("invalid publication id {n}"))),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("invalid publication id {s:?}"))),
        other => Err(D::Error::custom(format!("invalid publication id {other}"))),
    }
}
