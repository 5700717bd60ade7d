//! Planner service: runs one campaign request end to end.
//!
//! validate -> resolve profile -> fetch catalog -> build catalog ->
//! pruning controller -> transform -> audit -> result.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditDocument, AuditStore, NoopAuditStore};
use crate::campaign::CampaignRequest;
use crate::catalog::{CatalogSource, build_catalog};
use crate::config::EngineConfig;
use crate::context::RequestContext;
use crate::error::{EngineError, PlanningError};
use crate::generation::GenerationClient;
use crate::guardrails::Guardrails;
use crate::profile::ProfileRegistry;
use crate::pruning::PruningController;
use crate::transform::{AudienceReachCalculator, PlanTransformer, PlanningResult, ReachCalculator};

/// Wires the collaborators together.
pub struct Planner {
    profiles: ProfileRegistry,
    catalog_source: Arc<dyn CatalogSource>,
    client: Arc<dyn GenerationClient>,
    audit: Arc<dyn AuditStore>,
    reach: Arc<dyn ReachCalculator>,
    config: EngineConfig,
}

impl Planner {
    /// A planner with the default reach estimator, engine config and no
    /// audit store.
    pub fn new(
        profiles: ProfileRegistry,
        catalog_source: Arc<dyn CatalogSource>,
        client: Arc<dyn GenerationClient>,
    ) -> Self {
        Self {
            profiles,
            catalog_source,
            client,
            audit: Arc::new(NoopAuditStore),
            reach: Arc::new(AudienceReachCalculator::default()),
            config: EngineConfig::default(),
        }
    }

    pub fn with_audit_store(mut self, audit: Arc<dyn AuditStore>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_reach_calculator(mut self, reach: Arc<dyn ReachCalculator>) -> Self {
        self.reach = reach;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    /// Plan one request under a fresh request id.
    pub async fn plan(&self, request: &CampaignRequest) -> Result<PlanningResult, PlanningError> {
        self.plan_with_id(Uuid::new_v4(), request).await
    }

    /// Plan one request. Every failure carries `request_id` and the
    /// request's hub and profile.
    pub async fn plan_with_id(
        &self,
        request_id: Uuid,
        request: &CampaignRequest,
    ) -> Result<PlanningResult, PlanningError> {
        self.run(request_id, request)
            .await
            .map_err(|source| PlanningError {
                request_id,
                hub_id: request.hub_id.clone(),
                profile_id: request.strategy_profile_id.clone(),
                source,
            })
    }

    async fn run(
        &self,
        request_id: Uuid,
        request: &CampaignRequest,
    ) -> Result<PlanningResult, EngineError> {
        let campaign = request.campaign_params()?;

        let profile = self
            .profiles
            .get(&request.strategy_profile_id)
            .ok_or_else(|| EngineError::UnknownProfile(request.strategy_profile_id.clone()))?;

        let raw = self
            .catalog_source
            .publications_for_hub(&request.hub_id)
            .await
            .map_err(EngineError::Catalog)?;
        let catalog = build_catalog(&request.hub_id, &raw, &request.channel_filter())?;

        let guardrails = Guardrails::derive(profile, campaign.budget);
        info!(
            %request_id,
            hub_id = %request.hub_id,
            profile = %profile.id,
            budget = campaign.budget,
            publications = catalog.publications.len(),
            items = catalog.item_count(),
            "planning request started"
        );

        let ctx = RequestContext {
            catalog: &catalog,
            profile,
            campaign: &campaign,
            guardrails: &guardrails,
        };

        let controller = PruningController::new(self.client.as_ref(), &self.config);
        let outcome = controller.run(&ctx).await?;

        let executed_at = Utc::now();
        let result = PlanTransformer::new(self.reach.as_ref()).transform(&outcome, &ctx, executed_at);

        let document = AuditDocument::from_outcome(
            request_id,
            &request.hub_id,
            &profile.id,
            campaign.budget,
            &outcome,
            Some(&catalog),
            executed_at,
        );
        if let Err(e) = self.audit.record(&document).await {
            warn!(%request_id, error = %e, "failed to record planning audit");
        }

        info!(
            %request_id,
            state = %outcome.state,
            passes = outcome.passes_used,
            calls = outcome.calls_made,
            total_cost = result.pricing.total,
            warnings = result.warnings.len(),
            "planning request finished"
        );
        Ok(result)
    }
}
