//! Raw publication documents and the collaborator that supplies them.
//!
//! These types mirror the stored publication document shape (camelCase
//! JSON). They are deliberately permissive: every section is optional so a
//! sparse document still deserializes, and the builder decides what is
//! usable.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A publication document as stored by the marketplace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPublication {
    pub publication_id: i64,
    #[serde(alias = "publicationName")]
    pub name: String,
    #[serde(default)]
    pub distribution_channels: RawChannels,
}

/// Channel sections of a publication document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChannels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<RawOutlet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub print: Vec<RawOutlet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub newsletters: Vec<RawOutlet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub radio_stations: Vec<RawOutlet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub podcasts: Vec<RawOutlet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<RawOutlet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub streaming_video: Vec<RawOutlet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub social_media: Vec<RawOutlet>,
}

/// One outlet within a channel section (a newsletter, a radio station, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOutlet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub metrics: RawMetrics,
    #[serde(default)]
    pub advertising_opportunities: Vec<RawOpportunity>,
}

/// Audience figures an outlet may report. Which one applies depends on the
/// channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_visitors: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circulation: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_listeners: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_downloads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_attendance: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
}

/// An advertising opportunity with per-hub pricing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOpportunity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<RawFormat>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub specifications: BTreeMap<String, String>,
    #[serde(default)]
    pub hub_pricing: Vec<RawHubPrice>,
}

/// Structured format block carried by some opportunities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_formats: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Hub-specific price for an opportunity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHubPrice {
    pub hub_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default)]
    pub pricing_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

/// Read-only collaborator returning the publications of a hub.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn publications_for_hub(&self, hub_id: &str) -> Result<Vec<RawPublication>>;
}

/// In-memory catalog source, loadable from a JSON array of documents.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    publications: Vec<RawPublication>,
}

impl StaticCatalogSource {
    pub fn new(publications: Vec<RawPublication>) -> Self {
        Self { publications }
    }

    /// Load a JSON array of publication documents from disk.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file {}", path.display()))?;
        let publications: Vec<RawPublication> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse catalog file {}", path.display()))?;
        Ok(Self::new(publications))
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    /// Returns publications with at least one price for `hub_id`.
    async fn publications_for_hub(&self, hub_id: &str) -> Result<Vec<RawPublication>> {
        Ok(self
            .publications
            .iter()
            .filter(|p| has_hub_pricing(p, hub_id))
            .cloned()
            .collect())
    }
}

fn has_hub_pricing(publication: &RawPublication, hub_id: &str) -> bool {
    let ch = &publication.distribution_channels;
    ch.website
        .iter()
        .chain(&ch.print)
        .chain(&ch.newsletters)
        .chain(&ch.radio_stations)
        .chain(&ch.podcasts)
        .chain(&ch.events)
        .chain(&ch.streaming_video)
        .chain(&ch.social_media)
        .flat_map(|outlet| &outlet.advertising_opportunities)
        .flat_map(|opp| &opp.hub_pricing)
        .any(|price| price.hub_id == hub_id)
}
