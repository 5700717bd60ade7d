//! Catalog builder: normalizes raw publication documents into priced items.
//!
//! For each publication the builder walks the eight channel sections, keeps
//! opportunities that carry a positive price for the requested hub, attaches
//! the channel's audience metric and backfills missing specification fields
//! from sibling structured fields. Publications left without any priced item
//! are dropped, and an empty result is an error.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::source::{RawOpportunity, RawOutlet, RawPublication};
use super::{AudienceKind, AudienceMetric, Catalog, CatalogError, Channel, InventoryItem, Publication};

/// Channel include/exclude lists from the inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelFilter {
    /// When set, only these channels are considered.
    pub include: Option<BTreeSet<Channel>>,
    /// Channels removed after the include list is applied.
    pub exclude: BTreeSet<Channel>,
}

impl ChannelFilter {
    pub fn new(include: Option<Vec<Channel>>, exclude: Vec<Channel>) -> Self {
        Self {
            include: include
                .filter(|list| !list.is_empty())
                .map(|list| list.into_iter().collect()),
            exclude: exclude.into_iter().collect(),
        }
    }

    pub fn allows(&self, channel: Channel) -> bool {
        if self.exclude.contains(&channel) {
            return false;
        }
        match &self.include {
            Some(include) => include.contains(&channel),
            None => true,
        }
    }
}

/// Build the priced catalog for `hub_id`.
///
/// Returns [`CatalogError::Empty`] when no publication has a usable item.
pub fn build_catalog(
    hub_id: &str,
    raw: &[RawPublication],
    filter: &ChannelFilter,
) -> Result<Catalog, CatalogError> {
    let mut publications = Vec::new();

    for doc in raw {
        let channels = collect_channels(hub_id, doc, filter);
        if channels.is_empty() {
            debug!(
                hub_id,
                publication_id = doc.publication_id,
                "publication has no priced inventory, skipping"
            );
            continue;
        }
        publications.push(Publication {
            id: doc.publication_id,
            name: doc.name.clone(),
            channels,
        });
    }

    if publications.is_empty() {
        return Err(CatalogError::Empty {
            hub_id: hub_id.to_owned(),
        });
    }

    publications.sort_by_key(|p| p.id);
    Ok(Catalog {
        hub_id: hub_id.to_owned(),
        publications,
    })
}

/// Channel sections of a document paired with their locator prefix.
fn sections(doc: &RawPublication) -> Vec<(Channel, String, &RawOutlet)> {
    let ch = &doc.distribution_channels;
    let mut out = Vec::new();

    if let Some(website) = &ch.website {
        out.push((
            Channel::Website,
            "distributionChannels.website".to_string(),
            website,
        ));
    }

    let lists: [(Channel, &str, &Vec<RawOutlet>); 7] = [
        (Channel::Print, "print", &ch.print),
        (Channel::Newsletter, "newsletters", &ch.newsletters),
        (Channel::Radio, "radioStations", &ch.radio_stations),
        (Channel::Podcast, "podcasts", &ch.podcasts),
        (Channel::Event, "events", &ch.events),
        (Channel::Streaming, "streamingVideo", &ch.streaming_video),
        (Channel::Social, "socialMedia", &ch.social_media),
    ];
    for (channel, key, outlets) in lists {
        for (idx, outlet) in outlets.iter().enumerate() {
            out.push((channel, format!("distributionChannels.{key}[{idx}]"), outlet));
        }
    }

    out
}

fn collect_channels(
    hub_id: &str,
    doc: &RawPublication,
    filter: &ChannelFilter,
) -> BTreeMap<Channel, Vec<InventoryItem>> {
    let mut channels: BTreeMap<Channel, Vec<InventoryItem>> = BTreeMap::new();

    for (channel, prefix, outlet) in sections(doc) {
        if !filter.allows(channel) {
            continue;
        }
        let audience = AudienceMetric {
            kind: channel.audience_kind(),
            value: audience_value(channel.audience_kind(), outlet),
        };
        for (idx, opp) in outlet.advertising_opportunities.iter().enumerate() {
            let path = format!("{prefix}.advertisingOpportunities[{idx}]");
            if let Some(item) = price_item(hub_id, channel, path, outlet, opp, audience) {
                channels.entry(channel).or_default().push(item);
            }
        }
    }

    channels
}

fn audience_value(kind: AudienceKind, outlet: &RawOutlet) -> u64 {
    let m = &outlet.metrics;
    let value = match kind {
        AudienceKind::MonthlyVisitors => m.monthly_visitors,
        AudienceKind::Circulation => m.circulation,
        AudienceKind::Subscribers => m.subscribers,
        AudienceKind::WeeklyListeners => m.weekly_listeners,
        AudienceKind::Downloads => m.average_downloads,
        AudienceKind::Attendance => m.average_attendance,
        AudienceKind::Followers => m.followers,
    };
    value.unwrap_or(0)
}

/// Resolve one opportunity into an item, or `None` when it has no usable
/// hub price.
fn price_item(
    hub_id: &str,
    channel: Channel,
    path: String,
    outlet: &RawOutlet,
    opp: &RawOpportunity,
    audience: AudienceMetric,
) -> Option<InventoryItem> {
    let hub_price = opp.hub_pricing.iter().find(|p| p.hub_id == hub_id)?;

    let price = hub_price.price.filter(|p| p.is_finite() && *p > 0.0)?;

    let pricing_model = match hub_price.pricing_model.parse() {
        Ok(model) => model,
        Err(e) => {
            debug!(hub_id, path = %path, error = %e, "dropping opportunity");
            return None;
        }
    };

    let name = match &outlet.name {
        Some(outlet_name) if !outlet_name.is_empty() => format!("{outlet_name} - {}", opp.name),
        _ => opp.name.clone(),
    };

    Some(InventoryItem {
        name,
        path,
        channel,
        unit_price: price,
        pricing_model,
        frequency: hub_price.frequency.clone(),
        audience,
        specifications: backfill_specifications(opp),
    })
}

/// Start from the explicit specification map and fill gaps from the
/// opportunity's structured fields.
fn backfill_specifications(opp: &RawOpportunity) -> BTreeMap<String, String> {
    let mut specs = opp.specifications.clone();

    let dimensions = opp
        .dimensions
        .clone()
        .or_else(|| opp.format.as_ref().and_then(|f| f.dimensions.clone()));
    if let Some(dimensions) = dimensions {
        specs.entry("dimensions".to_string()).or_insert(dimensions);
    }
    if let Some(ad_format) = &opp.ad_format {
        specs
            .entry("format".to_string())
            .or_insert_with(|| ad_format.clone());
    }
    if let Some(format) = &opp.format {
        if let Some(file_formats) = &format.file_formats {
            specs
                .entry("fileFormats".to_string())
                .or_insert_with(|| file_formats.clone());
        }
        if let Some(color) = &format.color {
            specs
                .entry("color".to_string())
                .or_insert_with(|| color.clone());
        }
    }

    specs
}
