//! Engine-level errors.

use thiserror::Error;
use uuid::Uuid;

use crate::campaign::RequestError;
use crate::catalog::CatalogError;
use crate::generation::GenerationError;
use crate::plan::ParseFailure;

/// A failure that ends a planning request.
///
/// Hard constraint violations are not errors; they travel on the
/// [`crate::pruning::PruningOutcome`]. Audit failures are logged and never
/// reach this type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid planning request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("unknown strategy profile {0:?}")]
    UnknownProfile(String),

    #[error("no priced inventory for hub {hub_id:?}")]
    CatalogEmpty { hub_id: String },

    #[error("catalog unavailable: {0:#}")]
    Catalog(#[source] anyhow::Error),

    #[error("generation failed on pass {pass}: {source}")]
    Generation {
        pass: u8,
        #[source]
        source: GenerationError,
    },

    #[error("could not read the generated plan on pass {pass}: {source}")]
    Parse {
        pass: u8,
        #[source]
        source: ParseFailure,
    },
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Empty { hub_id } => Self::CatalogEmpty { hub_id },
            CatalogError::Source(source) => Self::Catalog(source),
        }
    }
}

/// An [`EngineError`] with the request it belongs to.
#[derive(Debug, Error)]
#[error("planning request {request_id} (hub {hub_id:?}, profile {profile_id:?}) failed: {source}")]
pub struct PlanningError {
    pub request_id: Uuid,
    pub hub_id: String,
    pub profile_id: String,
    #[source]
    pub source: EngineError,
}

impl PlanningError {
    pub fn kind(&self) -> &EngineError {
        &self.source
    }
}
