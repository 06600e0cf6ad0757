#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared domain types for construction-zone risk scoring.
//!
//! This crate defines the vocabulary every other `urban_risk` crate speaks:
//! severity bands and the user profiles they notify, zones, corridors and
//! worksites, permit requests, risk scores with their breakdowns, alerts,
//! and what-if scenarios. Nothing here computes a score; the engine crate
//! does that.

pub mod features;
pub mod permit;
pub mod scenario;
pub mod score;
pub mod territory;

pub use features::{FeatureLayer, LayerFeatureSet, ZoneFeatures};
pub use permit::{
    ConditionKind, CorridorHit, EvaluationResult, MitigationCondition, ObstructionKind,
    PermitRequest, Recommendation, WorkType, WorkWindow,
};
pub use scenario::{ImpactLevel, Scenario, ScenarioKind, ScenarioSet, SimulationParams};
pub use score::{ComponentKind, Modifier, ModifierKind, RiskScore, ScoreComponent, ScoreFormula};
pub use territory::{
    Coordinates, Corridor, CorridorCategory, CorridorState, CorridorStatus, Season,
    UtilizationStatus, WeatherCondition, Worksite, Zone,
};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Severity band of a 0-100 risk score, ordered from least to most severe.
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
pub enum SeverityBand {
    /// Normal conditions, coordinators only
    Green = 1,
    /// Elevated risk for pedestrians and cyclists
    Yellow = 2,
    /// High risk, mandatory human review
    Orange = 3,
    /// Critical risk, every profile notified
    Red = 4,
}

impl SeverityBand {
    /// Returns the numeric rank of this band (1 = green, 4 = red).
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Whether a score in this band must be validated by a person before
    /// any decision is acted on.
    #[must_use]
    pub const fn requires_human_review(self) -> bool {
        matches!(self, Self::Orange | Self::Red)
    }

    /// Returns the user profiles notified at this band.
    ///
    /// Each band's set is a superset of the set of every lower band.
    #[must_use]
    pub const fn target_profiles(self) -> &'static [UserProfile] {
        match self {
            Self::Green => &[UserProfile::Coordinator],
            Self::Yellow => &[
                UserProfile::Pedestrian,
                UserProfile::Cyclist,
                UserProfile::Coordinator,
            ],
            Self::Orange => &[
                UserProfile::ReducedMobility,
                UserProfile::Pedestrian,
                UserProfile::Cyclist,
                UserProfile::Coordinator,
            ],
            Self::Red => UserProfile::all(),
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Green, Self::Yellow, Self::Orange, Self::Red]
    }
}

/// A class of road or sidewalk user that can receive risk alerts.
///
/// Variants are declared from most to least vulnerable.
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
pub enum UserProfile {
    /// Wheelchair users and other persons with reduced mobility
    ReducedMobility,
    /// People on foot
    Pedestrian,
    /// People on bicycles
    Cyclist,
    /// Bus and metro riders
    TransitRider,
    /// Residents of the affected blocks
    Resident,
    /// Delivery and logistics operators
    Delivery,
    /// Private drivers
    Driver,
    /// Police, fire and ambulance services
    EmergencyServices,
    /// Worksite and municipal coordinators
    Coordinator,
}

impl UserProfile {
    /// Returns all variants of this enum, most vulnerable first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ReducedMobility,
            Self::Pedestrian,
            Self::Cyclist,
            Self::TransitRider,
            Self::Resident,
            Self::Delivery,
            Self::Driver,
            Self::EmergencyServices,
            Self::Coordinator,
        ]
    }
}

/// Stateless classification of a single score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityResult {
    /// Band the score falls in.
    pub band: SeverityBand,
    /// Profiles to notify, most vulnerable first.
    pub profiles: Vec<UserProfile>,
    /// Whether the band mandates human review.
    pub requires_human_review: bool,
}

/// Raised when a zone's composite score moves into a different severity
/// band than the one last persisted for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Unique alert identifier.
    pub id: uuid::Uuid,
    /// Administrative-area code of the zone.
    pub zone: String,
    /// When the crossing was observed.
    pub at: chrono::DateTime<chrono::Utc>,
    /// Score that triggered the crossing.
    pub score: f64,
    /// New band.
    pub severity: SeverityBand,
    /// Band persisted before this observation.
    pub previous: SeverityBand,
    /// Profiles to notify.
    pub profiles: Vec<UserProfile>,
    /// Whether the new band mandates human review.
    pub requires_human_review: bool,
}

impl Alert {
    /// Whether the crossing moved the zone to a more severe band.
    #[must_use]
    pub fn is_escalation(&self) -> bool {
        self.severity > self.previous
    }
}
