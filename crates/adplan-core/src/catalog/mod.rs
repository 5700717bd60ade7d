//! Normalized inventory catalog: publications and their priced placements.
//!
//! A [`Catalog`] is built once per request by [`build_catalog`] from raw
//! publication documents and is read-only afterwards. Every downstream
//! component (prompt composer, plan transformer) looks items up here.

pub mod builder;
pub mod source;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use builder::{ChannelFilter, build_catalog};
pub use source::{CatalogSource, RawPublication, StaticCatalogSource};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or building a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no priced inventory for hub {hub_id:?}")]
    Empty { hub_id: String },

    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Distribution channel an inventory item belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    #[serde(alias = "web")]
    Website,
    Print,
    #[serde(alias = "newsletters")]
    Newsletter,
    #[serde(alias = "radio_stations")]
    Radio,
    #[serde(alias = "podcasts")]
    Podcast,
    #[serde(alias = "events")]
    Event,
    #[serde(alias = "streaming_video")]
    Streaming,
    #[serde(alias = "social_media")]
    Social,
}

impl Channel {
    /// Every channel, in catalog walk order.
    pub const ALL: [Channel; 8] = [
        Channel::Website,
        Channel::Print,
        Channel::Newsletter,
        Channel::Radio,
        Channel::Podcast,
        Channel::Event,
        Channel::Streaming,
        Channel::Social,
    ];

    /// The audience metric reported for items on this channel.
    pub fn audience_kind(self) -> AudienceKind {
        match self {
            Self::Website => AudienceKind::MonthlyVisitors,
            Self::Print => AudienceKind::Circulation,
            Self::Newsletter => AudienceKind::Subscribers,
            Self::Radio => AudienceKind::WeeklyListeners,
            Self::Podcast => AudienceKind::Downloads,
            Self::Event => AudienceKind::Attendance,
            Self::Streaming => AudienceKind::Subscribers,
            Self::Social => AudienceKind::Followers,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Website => "website",
            Self::Print => "print",
            Self::Newsletter => "newsletter",
            Self::Radio => "radio",
            Self::Podcast => "podcast",
            Self::Event => "event",
            Self::Streaming => "streaming",
            Self::Social => "social",
        };
        f.write_str(s)
    }
}

impl FromStr for Channel {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "website" | "web" => Ok(Self::Website),
            "print" => Ok(Self::Print),
            "newsletter" | "newsletters" => Ok(Self::Newsletter),
            "radio" | "radio_stations" => Ok(Self::Radio),
            "podcast" | "podcasts" => Ok(Self::Podcast),
            "event" | "events" => Ok(Self::Event),
            "streaming" | "streaming_video" => Ok(Self::Streaming),
            "social" | "social_media" => Ok(Self::Social),
            other => Err(ChannelParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Channel`] string.
#[derive(Debug, Clone, Error)]
#[error("invalid channel: {0:?}")]
pub struct ChannelParseError(pub String);

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Formula family converting a quantity into a cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    /// Rate per thousand impressions; quantity is an impression count.
    Cpm,
    /// Rate per newsletter send.
    PerSend,
    /// Fixed rate per period.
    #[serde(alias = "flat_rate")]
    Flat,
    /// Rate per insertion, spot, episode or post.
    PerAd,
}

impl PricingModel {
    /// Cost of `quantity` units at `rate`.
    pub fn cost(self, rate: f64, quantity: f64) -> f64 {
        match self {
            Self::Cpm => rate * quantity / 1000.0,
            Self::PerSend | Self::Flat | Self::PerAd => rate * quantity,
        }
    }
}

impl fmt::Display for PricingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cpm => "cpm",
            Self::PerSend => "per_send",
            Self::Flat => "flat",
            Self::PerAd => "per_ad",
        };
        f.write_str(s)
    }
}

impl FromStr for PricingModel {
    type Err = PricingModelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "cpm" => Ok(Self::Cpm),
            "per_send" => Ok(Self::PerSend),
            "flat" | "flat_rate" | "monthly" => Ok(Self::Flat),
            "per_ad" | "per_spot" | "per_insertion" | "per_episode" | "per_post" => {
                Ok(Self::PerAd)
            }
            other => Err(PricingModelParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an unknown [`PricingModel`] string.
#[derive(Debug, Clone, Error)]
#[error("unknown pricing model: {0:?}")]
pub struct PricingModelParseError(pub String);

// ---------------------------------------------------------------------------
// Audience
// ---------------------------------------------------------------------------

/// What an audience figure counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceKind {
    MonthlyVisitors,
    Circulation,
    Subscribers,
    WeeklyListeners,
    Downloads,
    Attendance,
    Followers,
}

/// Audience size attached to an inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudienceMetric {
    #[serde(rename = "type")]
    pub kind: AudienceKind,
    pub value: u64,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// A single advertising placement with a resolved hub rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub name: String,
    /// Locator of the opportunity inside the source publication document.
    pub path: String,
    pub channel: Channel,
    pub unit_price: f64,
    pub pricing_model: PricingModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    pub audience: AudienceMetric,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub specifications: BTreeMap<String, String>,
}

/// A publication with at least one priced item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub id: i64,
    pub name: String,
    pub channels: BTreeMap<Channel, Vec<InventoryItem>>,
}

impl Publication {
    /// Iterate every item across all channels.
    pub fn items(&self) -> impl Iterator<Item = &InventoryItem> {
        self.channels.values().flatten()
    }

    pub fn item_count(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    /// Find an item by its locator path.
    pub fn find_item(&self, path: &str) -> Option<&InventoryItem> {
        self.items().find(|item| item.path == path)
    }

    /// Largest audience figure across the publication's items.
    pub fn max_audience(&self) -> u64 {
        self.items().map(|i| i.audience.value).max().unwrap_or(0)
    }
}

/// Priced inventory for one hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub hub_id: String,
    pub publications: Vec<Publication>,
}

impl Catalog {
    pub fn find_publication(&self, id: i64) -> Option<&Publication> {
        self.publications.iter().find(|p| p.id == id)
    }

    /// Resolve a plan line back to its catalog entry.
    ///
    /// Matches on path first and falls back to an exact item name match
    /// within the publication.
    pub fn find_item(&self, publication_id: i64, path: &str, name: &str) -> Option<&InventoryItem> {
        let publication = self.find_publication(publication_id)?;
        publication
            .find_item(path)
            .or_else(|| publication.items().find(|i| !name.is_empty() && i.name == name))
    }

    pub fn item_count(&self) -> usize {
        self.publications.iter().map(Publication::item_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.publications.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Publications `1..=count`, each with one flat print item at `price`
    /// whose path is `p{id}.item`.
    pub(crate) fn sample_catalog(count: i64, price: f64) -> Catalog {
        let publications = (1..=count)
            .map(|id| {
                let item = InventoryItem {
                    name: format!("Pub {id} - Full Page"),
                    path: format!("p{id}.item"),
                    channel: Channel::Print,
                    unit_price: price,
                    pricing_model: PricingModel::Flat,
                    frequency: Some("monthly".to_string()),
                    audience: AudienceMetric {
                        kind: AudienceKind::Circulation,
                        value: 10_000 * id as u64,
                    },
                    specifications: BTreeMap::from([(
                        "dimensions".to_string(),
                        "10x12".to_string(),
                    )]),
                };
                Publication {
                    id,
                    name: format!("Pub {id}"),
                    channels: BTreeMap::from([(Channel::Print, vec![item])]),
                }
            })
            .collect();
        Catalog {
            hub_id: "metro".to_string(),
            publications,
        }
    }

    #[test]
    fn cpm_cost_is_per_thousand() {
        assert_eq!(PricingModel::Cpm.cost(12.0, 50_000.0), 600.0);
    }

    #[test]
    fn unit_models_multiply() {
        assert_eq!(PricingModel::PerAd.cost(250.0, 4.0), 1000.0);
        assert_eq!(PricingModel::PerSend.cost(300.0, 2.0), 600.0);
        assert_eq!(PricingModel::Flat.cost(5000.0, 1.0), 5000.0);
    }

    #[test]
    fn pricing_model_aliases() {
        assert_eq!("flat_rate".parse::<PricingModel>().unwrap(), PricingModel::Flat);
        assert_eq!("per-spot".parse::<PricingModel>().unwrap(), PricingModel::PerAd);
        assert_eq!("CPM".parse::<PricingModel>().unwrap(), PricingModel::Cpm);
        assert!("barter".parse::<PricingModel>().is_err());
    }

    #[test]
    fn channel_roundtrips_through_display() {
        for channel in Channel::ALL {
            let parsed: Channel = channel.to_string().parse().unwrap();
            assert_eq!(parsed, channel);
        }
    }

    #[test]
    fn channel_accepts_source_section_names() {
        assert_eq!("radio_stations".parse::<Channel>().unwrap(), Channel::Radio);
        assert_eq!("social_media".parse::<Channel>().unwrap(), Channel::Social);
        assert!("billboard".parse::<Channel>().is_err());
    }

    #[test]
    fn channel_audience_mapping() {
        assert_eq!(Channel::Print.audience_kind(), AudienceKind::Circulation);
        assert_eq!(Channel::Newsletter.audience_kind(), AudienceKind::Subscribers);
        assert_eq!(Channel::Radio.audience_kind(), AudienceKind::WeeklyListeners);
    }
}
