//! Budget-constrained advertising inventory planner.
//!
//! A text-generating collaborator proposes a plan from a priced catalog;
//! the engine validates it against strategy-profile guardrails and asks for
//! corrections until the plan complies or the pass budget runs out.

pub mod audit;
pub mod campaign;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod generation;
pub mod guardrails;
pub mod plan;
pub mod planner;
pub mod profile;
pub mod prompt;
pub mod pruning;
pub mod store;
pub mod transform;
pub mod validate;

pub use campaign::{CampaignParams, CampaignRequest, RequestError};
pub use config::EngineConfig;
pub use error::{EngineError, PlanningError};
pub use planner::Planner;
pub use transform::PlanningResult;
