//! Request-scoped inputs shared by the composer, controller and transformer.

use crate::campaign::CampaignParams;
use crate::catalog::Catalog;
use crate::guardrails::Guardrails;
use crate::profile::StrategyProfile;

/// Immutable per-request values, borrowed by every stage of a request.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub catalog: &'a Catalog,
    pub profile: &'a StrategyProfile,
    pub campaign: &'a CampaignParams,
    pub guardrails: &'a Guardrails,
}
