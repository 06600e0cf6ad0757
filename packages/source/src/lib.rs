#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone feature normalization.
//!
//! Raw records arrive per zone from three providers: occupational-injury
//! claims, roadway work-zone accidents, and live urban activity (flow
//! counters and worksite permits). [`normalize_zone`] turns them into one
//! [`LayerFeatureSet`] per layer plus the parsed [`Worksite`] list that
//! feeds the capacity tracker.
//!
//! Normalization never fails. Malformed records are skipped and reported in
//! a [`DataQualityReport`]; missing fields default to zero. The same raw
//! snapshot always normalizes to the same values.

pub mod accident;
pub mod activity;
pub mod injury;
pub mod parsing;
pub mod quality;

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use urban_risk_models::{
    FeatureLayer, LayerFeatureSet, SeverityBand, WeatherCondition, Worksite, ZoneFeatures,
};

pub use quality::{DataQualityReport, DataQualityWarning};

/// Provenance tag of the injury layer when none is given.
pub const DEFAULT_INJURY_SOURCE: &str = "cnesst";
/// Provenance tag of the accident layer when none is given.
pub const DEFAULT_ACCIDENT_SOURCE: &str = "saaq";
/// Provenance tag of the activity layer when none is given.
pub const DEFAULT_ACTIVITY_SOURCE: &str = "montreal_open_data";

/// Errors that can occur while reading raw territory files.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw records of one zone, as delivered by the three providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawZoneRecords {
    #[serde(default)]
    pub injuries: Vec<serde_json::Value>,
    #[serde(default)]
    pub accidents: Vec<serde_json::Value>,
    #[serde(default)]
    pub activity: Vec<serde_json::Value>,
    /// Current weather over the zone.
    #[serde(default)]
    pub weather: WeatherCondition,
    /// Provenance tags overriding the defaults, by layer.
    #[serde(default)]
    pub sources: BTreeMap<FeatureLayer, String>,
}

impl RawZoneRecords {
    fn source(&self, layer: FeatureLayer) -> &str {
        self.sources.get(&layer).map_or(
            match layer {
                FeatureLayer::Injury => DEFAULT_INJURY_SOURCE,
                FeatureLayer::Accident => DEFAULT_ACCIDENT_SOURCE,
                FeatureLayer::Activity => DEFAULT_ACTIVITY_SOURCE,
            },
            String::as_str,
        )
    }
}

/// A territory-wide raw snapshot: every zone's records plus the bands
/// persisted at the previous scoring cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTerritory {
    /// Date the activity layer describes.
    pub as_of: NaiveDate,
    /// When the snapshot was taken. Defaults to midnight UTC of `as_of`.
    #[serde(default)]
    pub taken_at: Option<DateTime<Utc>>,
    /// Raw records by zone code.
    #[serde(default)]
    pub zones: BTreeMap<String, RawZoneRecords>,
    /// Bands persisted for each zone at the last scoring.
    #[serde(default)]
    pub previous_bands: BTreeMap<String, SeverityBand>,
}

impl RawTerritory {
    /// Timestamp of the snapshot.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.taken_at.unwrap_or_else(|| {
            self.as_of
                .and_hms_opt(0, 0, 0)
                .unwrap_or_default()
                .and_utc()
        })
    }
}

/// Reads a raw territory snapshot from a JSON file.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or is not a valid
/// territory document.
pub fn load_territory(path: impl AsRef<Path>) -> Result<RawTerritory, SourceError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let territory: RawTerritory = serde_json::from_str(&contents)?;
    log::info!(
        "Loaded territory snapshot as of {} with {} zones from {}",
        territory.as_of,
        territory.zones.len(),
        path.as_ref().display()
    );
    Ok(territory)
}

/// Everything normalization produces for one zone.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedZone {
    pub features: ZoneFeatures,
    pub worksites: Vec<Worksite>,
    pub quality: DataQualityReport,
}

/// Normalizes a zone's raw records as of a date.
#[must_use]
pub fn normalize_zone(zone: &str, raw: &RawZoneRecords, as_of: NaiveDate) -> NormalizedZone {
    let mut quality = DataQualityReport::default();

    let injury = injury::normalize(
        zone,
        raw.source(FeatureLayer::Injury),
        &raw.injuries,
        &mut quality,
    );
    let accident = accident::normalize(
        zone,
        raw.source(FeatureLayer::Accident),
        &raw.accidents,
        &mut quality,
    );
    let activity = activity::normalize(
        zone,
        raw.source(FeatureLayer::Activity),
        &raw.activity,
        as_of,
        &mut quality,
    );

    if !quality.is_clean() {
        log::warn!(
            "Zone {zone}: skipped {} malformed records (injury={}, accident={}, activity={})",
            quality.count(),
            quality.count_for(FeatureLayer::Injury),
            quality.count_for(FeatureLayer::Accident),
            quality.count_for(FeatureLayer::Activity),
        );
    }

    NormalizedZone {
        features: ZoneFeatures {
            injury,
            accident,
            activity: activity.features,
        },
        worksites: activity.worksites,
        quality,
    }
}

/// Convenience for a single layer set lookup by layer.
#[must_use]
pub const fn layer(features: &ZoneFeatures, layer: FeatureLayer) -> &LayerFeatureSet {
    match layer {
        FeatureLayer::Injury => &features.injury,
        FeatureLayer::Accident => &features.accident,
        FeatureLayer::Activity => &features.activity,
    }
}
