//! Inbound planning request and the campaign numerics derived from it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Channel, ChannelFilter};

/// A campaign planning request as received from the outer layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRequest {
    pub hub_id: String,
    pub objectives: Objectives,
    pub timeline: Timeline,
    pub strategy_profile_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_channels: Option<Vec<Channel>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objectives {
    pub budget: BudgetSpec,
    #[serde(default)]
    pub primary_goal: String,
    #[serde(default)]
    pub target_audience: String,
    /// Restrict the catalog to these channels when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<Channel>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSpec {
    pub total_budget: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
}

/// How the advertiser is billed. Informs the monthly figures in the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BillingCycle {
    #[default]
    Monthly,
    #[serde(alias = "one_time", alias = "total")]
    OneTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Why a request was rejected before any planning work.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("hubId must not be empty")]
    MissingHub,

    #[error("strategyProfileId must not be empty")]
    MissingProfile,

    #[error("totalBudget must be a positive amount, got {0}")]
    InvalidBudget(f64),

    #[error("endDate {end} is before startDate {start}")]
    ReversedTimeline { start: NaiveDate, end: NaiveDate },
}

/// Validated campaign numerics threaded through every component.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignParams {
    pub budget: f64,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Inclusive day count.
    pub duration_days: i64,
    pub duration_weeks: i64,
    pub duration_months: i64,
    pub primary_goal: String,
    pub target_audience: String,
}

impl CampaignRequest {
    /// Validate the request and derive campaign numerics.
    pub fn campaign_params(&self) -> Result<CampaignParams, RequestError> {
        if self.hub_id.trim().is_empty() {
            return Err(RequestError::MissingHub);
        }
        if self.strategy_profile_id.trim().is_empty() {
            return Err(RequestError::MissingProfile);
        }

        let budget = self.objectives.budget.total_budget;
        if !budget.is_finite() || budget <= 0.0 {
            return Err(RequestError::InvalidBudget(budget));
        }

        let start = self.timeline.start_date;
        let end = self.timeline.end_date;
        if end < start {
            return Err(RequestError::ReversedTimeline { start, end });
        }

        let duration_days = (end - start).num_days() + 1;
        let duration_weeks = (duration_days + 6) / 7;
        let duration_months = ((duration_days + 29) / 30).max(1);

        Ok(CampaignParams {
            budget,
            currency: self.objectives.budget.currency.clone(),
            billing_cycle: self.objectives.budget.billing_cycle,
            start_date: start,
            end_date: end,
            duration_days,
            duration_weeks,
            duration_months,
            primary_goal: self.objectives.primary_goal.clone(),
            target_audience: self.objectives.target_audience.clone(),
        })
    }

    /// Channel include/exclude lists for the catalog builder.
    pub fn channel_filter(&self) -> ChannelFilter {
        ChannelFilter::new(
            self.objectives.channels.clone(),
            self.exclude_channels.clone().unwrap_or_default(),
        )
    }
}
