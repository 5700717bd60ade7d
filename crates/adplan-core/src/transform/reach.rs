//! Reach and impression estimation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::SelectedInventory;
use crate::catalog::PricingModel;

/// Default share of summed audiences counted as unique reach.
pub const DEFAULT_OVERLAP_FACTOR: f64 = 0.85;

/// Aggregate performance figures for a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceEstimate {
    pub reach: u64,
    pub impressions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpm: Option<f64>,
    pub publication_count: usize,
    pub channel_count: usize,
}

/// Estimates audience figures for a set of selected inventory.
pub trait ReachCalculator: Send + Sync {
    fn estimate(&self, inventory: &[SelectedInventory], total_cost: f64) -> PerformanceEstimate;
}

/// Audience-based estimator.
///
/// Impressions per line: the quantity itself for CPM lines, otherwise the
/// item's audience times the quantity. Reach is each publication's largest
/// audience, summed and scaled by the overlap factor.
#[derive(Debug, Clone)]
pub struct AudienceReachCalculator {
    pub overlap_factor: f64,
}

impl Default for AudienceReachCalculator {
    fn default() -> Self {
        Self {
            overlap_factor: DEFAULT_OVERLAP_FACTOR,
        }
    }
}

impl ReachCalculator for AudienceReachCalculator {
    fn estimate(&self, inventory: &[SelectedInventory], total_cost: f64) -> PerformanceEstimate {
        let mut impressions = 0.0;
        let mut audience_sum = 0.0;
        let mut channels = BTreeSet::new();

        for publication in inventory {
            let mut largest = 0u64;
            for line in &publication.items {
                let audience = line.audience.map(|a| a.value).unwrap_or(0);
                largest = largest.max(audience);
                impressions += match line.pricing_model {
                    Some(PricingModel::Cpm) => line.quantity,
                    _ => audience as f64 * line.quantity,
                };
                if let Some(channel) = &line.channel {
                    channels.insert(channel.as_str());
                }
            }
            audience_sum += largest as f64;
        }

        let impressions = impressions.max(0.0).round() as u64;
        let cpm = (impressions > 0 && total_cost > 0.0)
            .then(|| total_cost / impressions as f64 * 1000.0);

        PerformanceEstimate {
            reach: (audience_sum * self.overlap_factor).round() as u64,
            impressions,
            cpm,
            publication_count: inventory.len(),
            channel_count: channels.len(),
        }
    }
}
