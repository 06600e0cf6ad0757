//! Normalized per-zone indicators for each data layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Injury-layer indicator names.
pub mod injury {
    pub const INJURY_COUNT: &str = "injury_count";
    pub const URBAN_RISK_INDEX: &str = "urban_risk_index";
    pub const MSD_RATE_PCT: &str = "msd_rate_pct";
    pub const TREND_PCT: &str = "trend_pct";
}

/// Accident-layer indicator names.
pub mod accident {
    pub const ACCIDENT_COUNT: &str = "accident_count";
    pub const GRAVITY_INDEX: &str = "gravity_index";
    pub const PEDESTRIAN_ACCIDENTS: &str = "pedestrian_accidents";
    pub const CYCLIST_ACCIDENTS: &str = "cyclist_accidents";
    pub const VULNERABLE_USER_COUNT: &str = "vulnerable_user_count";
    pub const FATAL_SERIOUS_ACCIDENTS: &str = "fatal_serious_accidents";
    pub const HEAVY_VEHICLE_ACCIDENTS: &str = "heavy_vehicle_accidents";
}

/// Activity-layer indicator names.
pub mod activity {
    pub const PEDESTRIAN_FLOW: &str = "pedestrian_flow";
    pub const CYCLIST_FLOW: &str = "cyclist_flow";
    pub const ACTIVE_SITES: &str = "active_sites";
    pub const PLANNED_SITES: &str = "planned_sites";
    pub const UNDATED_SITES: &str = "undated_sites";
}

/// One of the three data layers feeding the composite score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeatureLayer {
    /// Historical occupational injuries on worksites
    Injury,
    /// Historical roadway work-zone accidents
    Accident,
    /// Live urban activity and permits
    Activity,
}

impl FeatureLayer {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Injury, Self::Accident, Self::Activity]
    }
}

/// Named numeric indicators computed for one zone from one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerFeatureSet {
    /// Zone code.
    pub zone: String,
    /// Source layer.
    pub layer: FeatureLayer,
    /// Provenance tag of the raw data.
    pub source: String,
    /// Raw records that contributed (malformed records excluded).
    pub records: usize,
    /// Indicator values by name.
    pub values: BTreeMap<String, f64>,
}

impl LayerFeatureSet {
    /// Creates an empty feature set.
    #[must_use]
    pub fn new(zone: &str, layer: FeatureLayer, source: &str) -> Self {
        Self {
            zone: zone.to_string(),
            layer,
            source: source.to_string(),
            records: 0,
            values: BTreeMap::new(),
        }
    }

    /// Returns an indicator, or zero when absent.
    #[must_use]
    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    /// Sets an indicator.
    pub fn set(&mut self, key: &str, value: f64) {
        self.values.insert(key.to_string(), value);
    }

    /// Whether any record contributed to this set.
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.records > 0
    }
}

/// The three feature sets of a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneFeatures {
    pub injury: LayerFeatureSet,
    pub accident: LayerFeatureSet,
    pub activity: LayerFeatureSet,
}

impl ZoneFeatures {
    /// Empty feature sets for a zone without any data.
    #[must_use]
    pub fn empty(zone: &str) -> Self {
        Self {
            injury: LayerFeatureSet::new(zone, FeatureLayer::Injury, "none"),
            accident: LayerFeatureSet::new(zone, FeatureLayer::Accident, "none"),
            activity: LayerFeatureSet::new(zone, FeatureLayer::Activity, "none"),
        }
    }

    /// Layers that had at least one usable record.
    #[must_use]
    pub fn layers_present(&self) -> Vec<FeatureLayer> {
        [&self.injury, &self.accident, &self.activity]
            .into_iter()
            .filter(|set| set.has_data())
            .map(|set| set.layer)
            .collect()
    }
}
