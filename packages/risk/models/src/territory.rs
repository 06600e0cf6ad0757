//! Zones, corridors, worksites and the conditions that modulate them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{SeverityBand, permit::WorkType};

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Coordinates {
    /// Creates a point from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Calendar season used for seasonal risk modifiers.
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
pub enum Season {
    /// Frost, snow clearing and short daylight
    Winter,
    /// Thaw and pothole season
    Spring,
    /// Festivals, terraces and tourism
    Summer,
    /// School return and heavy rain
    Autumn,
}

impl Season {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Winter, Self::Spring, Self::Summer, Self::Autumn]
    }
}

/// Current weather reported for a zone.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    Rain,
    HeavyRain,
    Snow,
    HeavySnow,
    Storm,
    FreezingRain,
    Fog,
    Thunderstorm,
    StrongWind,
    HeatWave,
}

impl WeatherCondition {
    /// Multiplicative risk factor applied to the ambient zone score.
    #[must_use]
    pub const fn factor(self) -> f64 {
        match self {
            Self::Clear => 1.0,
            Self::Rain | Self::Snow | Self::Fog => 1.15,
            Self::HeavyRain | Self::Thunderstorm => 1.2,
            Self::HeavySnow | Self::Storm | Self::StrongWind => 1.3,
            Self::FreezingRain => 1.4,
            Self::HeatWave => 1.1,
        }
    }
}

/// Kind of traffic a protected corridor carries.
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
pub enum CorridorCategory {
    Pedestrian,
    Cyclable,
    Emergency,
    Transit,
}

/// A named, capacity-constrained route that construction must not choke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corridor {
    /// Stable identifier (e.g. `"COR-STC"`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Traffic carried.
    pub category: CorridorCategory,
    /// Priority rank, 1 (lowest) to 10 (highest).
    pub priority: u8,
    /// Maximum number of concurrent worksites.
    pub capacity: u32,
    /// Street fragments identifying the corridor in free-text locations.
    pub keywords: Vec<String>,
    /// Zone codes the corridor crosses.
    #[serde(default)]
    pub zones: Vec<String>,
}

impl Corridor {
    /// Case-insensitive substring match of any keyword against `text`.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && haystack.contains(&k.to_lowercase()))
    }

    /// Whether this corridor crosses the given zone.
    #[must_use]
    pub fn crosses(&self, zone: &str) -> bool {
        self.zones.iter().any(|z| z == zone)
    }
}

/// Occupancy status of a corridor.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CorridorStatus {
    /// No active worksite
    Free,
    /// Occupied below capacity
    Active,
    /// Occupancy has reached capacity
    Saturated,
}

impl CorridorStatus {
    /// Derives the status from an occupancy and its ceiling.
    #[must_use]
    pub const fn from_occupancy(occupancy: u32, capacity: u32) -> Self {
        if occupancy >= capacity {
            Self::Saturated
        } else if occupancy == 0 {
            Self::Free
        } else {
            Self::Active
        }
    }
}

/// Share of a zone's worksite capacity in use.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UtilizationStatus {
    /// Below 70% of capacity
    Available,
    /// At least 70% of capacity
    Busy,
    /// At least 90% of capacity
    Saturated,
}

impl UtilizationStatus {
    /// Derives the status from an `active / capacity` ratio.
    #[must_use]
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.9 {
            Self::Saturated
        } else if ratio >= 0.7 {
            Self::Busy
        } else {
            Self::Available
        }
    }
}

/// Point-in-time occupancy of a corridor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridorState {
    /// Corridor identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Traffic carried.
    pub category: CorridorCategory,
    /// Priority rank.
    pub priority: u8,
    /// Maximum number of concurrent worksites.
    pub capacity: u32,
    /// Active worksites on the corridor.
    pub occupancy: u32,
    /// Worksites on the corridor starting after the as-of date.
    pub planned: u32,
    /// Derived occupancy status.
    pub status: CorridorStatus,
}

/// A construction worksite parsed from the live activity layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worksite {
    /// Source identifier of the worksite.
    pub id: String,
    /// Zone code the worksite belongs to.
    pub zone: String,
    /// Free-text street or location.
    pub street: String,
    /// Location, when the source provides one.
    pub coordinates: Option<Coordinates>,
    /// Kind of work.
    pub work_type: WorkType,
    /// First day of work.
    pub start: Option<NaiveDate>,
    /// Last day of work.
    pub end: Option<NaiveDate>,
}

impl Worksite {
    /// Whether both start and end dates are known.
    #[must_use]
    pub const fn is_dated(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Whether work is underway on `date` (start and end inclusive).
    #[must_use]
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }

    /// Whether work is scheduled to begin after `date`.
    #[must_use]
    pub fn is_planned_on(&self, date: NaiveDate) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(_)) => start > date,
            _ => false,
        }
    }

    /// Whether the worksite's dates intersect the inclusive range
    /// `from..=to`.
    #[must_use]
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= to && end >= from,
            _ => false,
        }
    }
}

/// Scoring state of a zone, superseded on every scoring cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Administrative-area code.
    pub code: String,
    /// Administrative-area label.
    pub name: String,
    /// Geographic centre.
    pub centroid: Coordinates,
    /// Radius in meters.
    pub radius_m: f64,
    /// Active worksites at the last scoring.
    pub active_sites: u32,
    /// Daily pedestrian flow.
    pub pedestrian_flow: f64,
    /// Daily cyclist flow.
    pub cyclist_flow: f64,
    /// Most recent composite score.
    pub last_score: Option<f64>,
    /// Band of the most recent composite score.
    pub severity: Option<SeverityBand>,
    /// When the zone was last scored.
    pub updated_at: Option<DateTime<Utc>>,
}
