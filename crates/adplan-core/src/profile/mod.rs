//! Strategy profiles: declarative constraints, weights and guidance text.
//!
//! A profile is pure data. The engine never branches on a profile's id;
//! the guidance text goes to the prompt composer and the numeric fields go
//! to [`crate::guardrails::Guardrails`]. Four canonical profiles are
//! embedded from `profiles.toml` at compile time.

pub mod registry;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use registry::ProfileRegistry;

/// Upper bound on correction passes any profile may request.
pub const MAX_CORRECTION_PASSES: u8 = 4;

/// Errors from loading or validating a strategy profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profile file {path:?}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("profile TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("profile {profile:?}: {reason}")]
    Invalid { profile: String, reason: String },
}

/// One selection policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    pub id: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub constraints: ProfileConstraints,
    #[serde(default)]
    pub weights: ScoringWeights,
    /// Free text handed to the collaborator verbatim.
    #[serde(default)]
    pub guidance: String,
}

/// Numeric limits enforced by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConstraints {
    pub min_publications: u32,
    pub max_publications: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
    /// When set, no overage is tolerated regardless of `max_overage_percent`.
    #[serde(default)]
    pub strict_budget: bool,
    /// Allowed overage as a fraction of the budget.
    #[serde(default)]
    pub max_overage_percent: f64,
    /// Largest share of the budget one publication may take, as a fraction.
    pub max_publication_percent: f64,
    #[serde(default)]
    pub min_publication_spend: f64,
    #[serde(default = "default_correction_passes")]
    pub max_correction_passes: u8,
}

/// Relative importance of each scoring dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub reach: f64,
    pub diversity: f64,
    pub cost: f64,
    pub community: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            reach: 0.25,
            diversity: 0.25,
            cost: 0.25,
            community: 0.25,
        }
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_correction_passes() -> u8 {
    2
}

impl StrategyProfile {
    /// Check the profile's numeric fields for internal consistency.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let c = &self.constraints;
        let invalid = |reason: String| ProfileError::Invalid {
            profile: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty".to_string()));
        }
        if c.min_publications == 0 {
            return Err(invalid("min_publications must be at least 1".to_string()));
        }
        if c.min_publications > c.max_publications {
            return Err(invalid(format!(
                "min_publications {} exceeds max_publications {}",
                c.min_publications, c.max_publications
            )));
        }
        if !(c.max_publication_percent.is_finite()
            && c.max_publication_percent > 0.0
            && c.max_publication_percent <= 1.0)
        {
            return Err(invalid(format!(
                "max_publication_percent {} must be in (0, 1]",
                c.max_publication_percent
            )));
        }
        if !(c.max_overage_percent.is_finite() && (0.0..=1.0).contains(&c.max_overage_percent)) {
            return Err(invalid(format!(
                "max_overage_percent {} must be in [0, 1]",
                c.max_overage_percent
            )));
        }
        if !(c.min_publication_spend.is_finite() && c.min_publication_spend >= 0.0) {
            return Err(invalid(format!(
                "min_publication_spend {} must be a non-negative amount",
                c.min_publication_spend
            )));
        }
        if c.max_correction_passes > MAX_CORRECTION_PASSES {
            return Err(invalid(format!(
                "max_correction_passes {} exceeds the ceiling of {MAX_CORRECTION_PASSES}",
                c.max_correction_passes
            )));
        }
        if let (Some(min), Some(max)) = (c.min_budget, c.max_budget) {
            if min > max {
                return Err(invalid(format!("min_budget {min} exceeds max_budget {max}")));
            }
        }
        let w = &self.weights;
        if [w.reach, w.diversity, w.cost, w.community]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(invalid("weights must be non-negative".to_string()));
        }

        Ok(())
    }

    /// Whether `budget` falls inside the profile's optional budget range.
    pub fn budget_in_range(&self, budget: f64) -> bool {
        let c = &self.constraints;
        c.min_budget.is_none_or(|min| budget >= min) && c.max_budget.is_none_or(|max| budget <= max)
    }
}

/// Container for deserializing profile TOML.
#[derive(Debug, Deserialize)]
struct ProfileLibrary {
    profiles: Vec<StrategyProfile>,
}

/// The embedded profile library.
static PROFILES_TOML: &str = include_str!("profiles.toml");

/// Load the built-in profiles.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed or a built-in profile fails
/// validation. Both are fixed at compile time.
pub fn builtin_profiles() -> Vec<StrategyProfile> {
    let lib: ProfileLibrary =
        toml::from_str(PROFILES_TOML).expect("embedded profiles.toml is invalid");
    for profile in &lib.profiles {
        if let Err(e) = profile.validate() {
            panic!("embedded profile failed validation: {e}");
        }
    }
    lib.profiles
}

/// Parse and validate profiles from TOML text.
///
/// Accepts either a single profile document or a `[[profiles]]` library.
pub fn parse_profiles(content: &str) -> Result<Vec<StrategyProfile>, ProfileError> {
    let profiles = match toml::from_str::<ProfileLibrary>(content) {
        Ok(lib) => lib.profiles,
        Err(_) => vec![toml::from_str::<StrategyProfile>(content)?],
    };
    for profile in &profiles {
        profile.validate()?;
    }
    Ok(profiles)
}

/// Load and validate profiles from a TOML file.
pub fn load_profile_file(path: &Path) -> Result<Vec<StrategyProfile>, ProfileError> {
    let content = std::fs::read_to_string(path).map_err(|e| ProfileError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_profiles(&content)
}
