//! Fixtures shared by the engine integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use serde_json::json;

use adplan_core::campaign::{BillingCycle, BudgetSpec, CampaignRequest, Objectives, Timeline};
use adplan_core::catalog::{RawPublication, StaticCatalogSource};
use adplan_core::profile::{ProfileConstraints, ProfileRegistry, ScoringWeights, StrategyProfile};

pub const HUB: &str = "metro";
pub const PROFILE_ID: &str = "strict-test";
pub const ITEM_PATH: &str = "distributionChannels.print[0].advertisingOpportunities[0]";

/// `count` publications, ids 1..=count, each with one flat print
/// placement at `rate` for [`HUB`].
pub fn publications(count: i64, rate: f64) -> Vec<RawPublication> {
    (1..=count)
        .map(|id| {
            serde_json::from_value(json!({
                "publicationId": id,
                "name": format!("Pub {id}"),
                "distributionChannels": {
                    "print": [{
                        "name": "Print Edition",
                        "circulation": 10_000 * id,
                        "advertisingOpportunities": [{
                            "name": "Full Page",
                            "format": { "dimensions": "10x12" },
                            "hubPricing": [{
                                "hubId": HUB,
                                "price": rate,
                                "pricingModel": "flat",
                                "frequency": "monthly"
                            }]
                        }]
                    }]
                }
            }))
            .expect("fixture publication should deserialize")
        })
        .collect()
}

pub fn catalog_source(count: i64, rate: f64) -> StaticCatalogSource {
    StaticCatalogSource::new(publications(count, rate))
}

pub fn strict_profile(max_publication_percent: f64, max_correction_passes: u8) -> StrategyProfile {
    StrategyProfile {
        id: PROFILE_ID.to_string(),
        name: "Strict Test".to_string(),
        version: "0.1.0".to_string(),
        description: "Hard cap on budget and per-publication share.".to_string(),
        constraints: ProfileConstraints {
            min_publications: 1,
            max_publications: 10,
            min_budget: None,
            max_budget: None,
            strict_budget: true,
            max_overage_percent: 0.0,
            max_publication_percent,
            min_publication_spend: 500.0,
            max_correction_passes,
        },
        weights: ScoringWeights::default(),
        guidance: "Never exceed the budget.".to_string(),
    }
}

pub fn registry(profile: StrategyProfile) -> ProfileRegistry {
    let mut registry = ProfileRegistry::with_builtins();
    registry.register(profile).expect("fixture profile should validate");
    registry
}

pub fn request(budget: f64) -> CampaignRequest {
    CampaignRequest {
        hub_id: HUB.to_string(),
        objectives: Objectives {
            budget: BudgetSpec {
                total_budget: budget,
                currency: "USD".to_string(),
                billing_cycle: BillingCycle::Monthly,
            },
            primary_goal: "awareness".to_string(),
            target_audience: "local families".to_string(),
            channels: None,
        },
        timeline: Timeline {
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 31).expect("valid date"),
        },
        strategy_profile_id: PROFILE_ID.to_string(),
        exclude_channels: None,
    }
}

/// Collaborator output for a plan buying `quantity` units at `rate` from
/// each listed publication, wrapped in prose and a fence the way a chatty
/// collaborator answers.
pub fn plan_text(lines: &[(i64, f64)], rate: f64) -> String {
    let publications: Vec<serde_json::Value> = lines
        .iter()
        .map(|(id, quantity)| {
            json!({
                "publicationId": id,
                "publicationName": format!("Pub {id}"),
                "inventoryItems": [{
                    "itemPath": ITEM_PATH,
                    "itemName": "Print Edition - Full Page",
                    "channel": "print",
                    "quantity": quantity,
                    "unitPrice": rate,
                    "pricingModel": "flat",
                    "itemCost": quantity * rate
                }],
                "publicationTotal": quantity * rate
            })
        })
        .collect();
    let total: f64 = lines.iter().map(|(_, q)| q * rate).sum();
    let plan = json!({
        "selectedPublications": publications,
        "totalCost": total,
        "monthlyCost": total,
        "confidence": 0.8,
        "warnings": []
    });
    format!("Here is the plan:\n```json\n{plan:#}\n```\nLet me know if you need changes.")
}

/// `count` publications at one unit each.
pub fn uniform_plan(count: i64, rate: f64) -> String {
    let lines: Vec<(i64, f64)> = (1..=count).map(|id| (id, 1.0)).collect();
    plan_text(&lines, rate)
}
