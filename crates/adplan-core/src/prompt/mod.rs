//! Prompt composition for generation and correction passes.
//!
//! Pure string building. Every number in a prompt comes from the
//! [`Guardrails`] and [`CampaignParams`] passed in; nothing here knows which
//! strategy profile it is describing.

use serde_json::json;

use crate::campaign::{BillingCycle, CampaignParams};
use crate::catalog::Catalog;
use crate::context::RequestContext;
use crate::guardrails::Guardrails;
use crate::plan::CandidatePlan;
use crate::profile::ScoringWeights;
use crate::validate::{Verdict, money};

// ---------------------------------------------------------------------------
// Fixed sections
// ---------------------------------------------------------------------------

/// Output contract included in every prompt.
const OUTPUT_SCHEMA: &str = r#"## Output Format

Reply with exactly one JSON object and nothing else:

```json
{
  "selectedPublications": [
    {
      "publicationId": 123,
      "publicationName": "string",
      "inventoryItems": [
        {
          "itemPath": "string (copy the catalog path exactly)",
          "itemName": "string",
          "channel": "string",
          "quantity": 1,
          "unitPrice": 0.0,
          "pricingModel": "cpm | per_send | flat | per_ad",
          "frequency": "string or null",
          "itemCost": 0.0
        }
      ],
      "publicationTotal": 0.0
    }
  ],
  "totalCost": 0.0,
  "monthlyCost": 0.0,
  "confidence": 0.0,
  "warnings": ["string"],
  "reasoning": "string"
}
```

### Cost arithmetic
- `cpm`: quantity is impressions; itemCost = unitPrice * quantity / 1000.
- `per_send`, `flat`, `per_ad`: itemCost = unitPrice * quantity.
- publicationTotal is the sum of its itemCost values.
- totalCost is the sum of every publicationTotal.
- confidence is between 0 and 1.
"#;

/// Rules for correction passes.
const REPAIR_RULES: &str = r#"## Correction Rules

1. Change only `quantity` values, or remove items or whole publications.
2. Never change a `unitPrice`, `pricingModel` or `itemPath`.
3. Fix over-cap publications by reducing quantities on the largest publications first. Remove a publication only when reducing its quantities cannot satisfy the limits.
4. Do not add publications, items or channels that are absent from the previous plan.
5. Recompute every `itemCost`, `publicationTotal` and `totalCost` after your changes.
6. Record each change you made in `warnings`.
"#;

// ---------------------------------------------------------------------------
// Task description
// ---------------------------------------------------------------------------

/// Build the initial task description.
pub fn compose_task(ctx: &RequestContext<'_>) -> String {
    let mut prompt = String::with_capacity(8192);

    prompt.push_str("# Advertising Campaign Plan\n\n");
    prompt.push_str(
        "Select publications and advertising inventory from the catalog below \
         to build a campaign that fits the budget and the strategy. Use only \
         publications and items listed in the catalog, at their listed prices.\n\n",
    );

    push_campaign(&mut prompt, ctx.campaign);

    prompt.push_str(&format!(
        "## Strategy: {} ({} v{})\n\n",
        ctx.profile.name, ctx.profile.id, ctx.profile.version
    ));
    if !ctx.profile.description.is_empty() {
        prompt.push_str(ctx.profile.description.trim());
        prompt.push_str("\n\n");
    }
    prompt.push_str(ctx.profile.guidance.trim());
    prompt.push_str("\n\n");
    push_weights(&mut prompt, &ctx.profile.weights);

    push_guardrails(&mut prompt, ctx.guardrails);

    prompt.push_str(&format!(
        "## Inventory Catalog\n\n{} publications, {} items. Compact JSON:\n\n",
        ctx.catalog.publications.len(),
        ctx.catalog.item_count()
    ));
    prompt.push_str(&compact_catalog(ctx.catalog));
    prompt.push_str("\n\n");

    prompt.push_str(OUTPUT_SCHEMA);
    prompt
}

/// Build the repair description for a correction pass.
///
/// Carries the previous plan verbatim plus the hard violations it failed.
pub fn compose_repair(ctx: &RequestContext<'_>, previous: &CandidatePlan, verdict: &Verdict) -> String {
    let mut prompt = String::with_capacity(4096);

    prompt.push_str("# Campaign Plan Correction\n\n");
    prompt.push_str(
        "The plan below breaks hard limits. Return a corrected plan in the same \
         format that satisfies every limit.\n\n",
    );

    prompt.push_str("## Violations\n\n");
    for violation in &verdict.violations {
        prompt.push_str(&format!("- {violation}\n"));
    }
    prompt.push('\n');

    push_campaign(&mut prompt, ctx.campaign);
    push_guardrails(&mut prompt, ctx.guardrails);

    prompt.push_str("## Publication Totals (largest first, at catalog rates)\n\n");
    for (id, total) in previous.billed_totals_descending(Some(ctx.catalog)) {
        let marker = if ctx.guardrails.above_ceiling(total) {
            " -- over cap"
        } else if ctx.guardrails.below_floor(total) {
            " -- under minimum"
        } else {
            ""
        };
        prompt.push_str(&format!("- #{id}: {}{marker}\n", money(total)));
    }
    prompt.push('\n');

    prompt.push_str("## Previous Plan\n\n```json\n");
    let previous_json = serde_json::to_string_pretty(previous)
        .unwrap_or_else(|e| format!("<plan could not be serialized: {e}>"));
    prompt.push_str(&previous_json);
    prompt.push_str("\n```\n\n");

    prompt.push_str(REPAIR_RULES);
    prompt.push('\n');
    prompt.push_str(OUTPUT_SCHEMA);
    prompt
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn push_campaign(prompt: &mut String, campaign: &CampaignParams) {
    let cycle = match campaign.billing_cycle {
        BillingCycle::Monthly => "monthly",
        BillingCycle::OneTime => "one-time",
    };
    prompt.push_str("## Campaign\n\n");
    prompt.push_str(&format!(
        "- **Budget:** {} {} ({cycle} billing)\n",
        money(campaign.budget),
        campaign.currency
    ));
    prompt.push_str(&format!(
        "- **Dates:** {} to {} ({} days, {} weeks, {} months)\n",
        campaign.start_date,
        campaign.end_date,
        campaign.duration_days,
        campaign.duration_weeks,
        campaign.duration_months
    ));
    if !campaign.primary_goal.is_empty() {
        prompt.push_str(&format!("- **Primary goal:** {}\n", campaign.primary_goal));
    }
    if !campaign.target_audience.is_empty() {
        prompt.push_str(&format!("- **Target audience:** {}\n", campaign.target_audience));
    }
    prompt.push('\n');
}

/// Scoring weights as shares of their sum, heaviest first.
fn push_weights(prompt: &mut String, w: &ScoringWeights) {
    let sum = w.reach + w.diversity + w.cost + w.community;
    if sum <= 0.0 {
        return;
    }
    let mut ranked = [
        ("audience reach", w.reach),
        ("diversity across publications and channels", w.diversity),
        ("cost efficiency", w.cost),
        ("community and local focus", w.community),
    ];
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    prompt.push_str("## Selection Priorities\n\n");
    for (label, weight) in ranked {
        prompt.push_str(&format!("- {label}: {:.0}%\n", weight / sum * 100.0));
    }
    prompt.push('\n');
}

fn push_guardrails(prompt: &mut String, g: &Guardrails) {
    prompt.push_str("## Hard Limits\n\n");
    if g.overage_percent > 0.0 {
        prompt.push_str(&format!(
            "- totalCost must not exceed {} (budget plus {:.0}% overage).\n",
            money(g.budget_ceiling),
            g.overage_percent * 100.0
        ));
    } else {
        prompt.push_str(&format!(
            "- totalCost must not exceed {}. No overage is allowed.\n",
            money(g.budget_ceiling)
        ));
    }
    if g.publication_floor > 0.0 {
        prompt.push_str(&format!(
            "- Every included publication must total at least {}.\n",
            money(g.publication_floor)
        ));
    }
    prompt.push_str(&format!(
        "- No publication may total more than {} ({:.0}% of the budget).\n\n",
        money(g.publication_ceiling),
        g.max_publication_percent * 100.0
    ));

    prompt.push_str("## Targets\n\n");
    prompt.push_str(&format!(
        "- Include between {} and {} publications; aim for about {}.\n",
        g.min_publications, g.max_publications, g.target_publications
    ));
    prompt.push_str(&format!(
        "- Keep the three largest publications under {:.0}% of total spend.\n\n",
        g.concentration_limit * 100.0
    ));
}

/// One-line JSON rendering of the catalog with only the fields a plan needs.
fn compact_catalog(catalog: &Catalog) -> String {
    let publications: Vec<serde_json::Value> = catalog
        .publications
        .iter()
        .map(|p| {
            let items: Vec<serde_json::Value> = p
                .items()
                .map(|i| {
                    let mut item = json!({
                        "path": i.path,
                        "name": i.name,
                        "channel": i.channel,
                        "unitPrice": i.unit_price,
                        "pricingModel": i.pricing_model,
                        "audience": i.audience.value,
                    });
                    if let Some(freq) = &i.frequency {
                        item["frequency"] = json!(freq);
                    }
                    item
                })
                .collect();
            json!({ "id": p.id, "name": p.name, "items": items })
        })
        .collect();
    serde_json::Value::Array(publications).to_string()
}
