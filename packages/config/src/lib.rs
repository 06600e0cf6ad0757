#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Versioned configuration for risk scoring.
//!
//! A configuration table carries every tunable of the engine: severity band
//! thresholds, permit recommendation thresholds, the coactivity step
//! function, season definitions, zone capacities and protected corridors.
//!
//! Built-in tables are TOML files in `packages/config/tables/` baked into
//! the binary with [`include_str!`]. A custom table can be loaded from disk
//! with [`RiskConfig::load`]. Every table is validated on load; a table that
//! fails validation is never handed out.

mod validate;

use std::path::Path;

use serde::{Deserialize, Serialize};
use urban_risk_models::{Coordinates, Corridor, Season};

/// Tables embedded at compile time.
const TABLES: &[(&str, &str)] = &[("montreal", include_str!("../tables/montreal.toml"))];

/// Name of the table used when no other is requested.
pub const DEFAULT_TABLE: &str = "montreal";

/// Errors raised while loading or validating a configuration table.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The table file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The table is not valid TOML or does not match the schema.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// No embedded table has this name.
    #[error("Unknown configuration table: {0}")]
    UnknownTable(String),

    /// Severity thresholds are not strictly increasing inside (0, 100].
    #[error("Overlapping severity bands: yellow={yellow}, orange={orange}, red={red}")]
    OverlappingBands {
        /// Lower bound of yellow.
        yellow: f64,
        /// Lower bound of orange.
        orange: f64,
        /// Lower bound of red.
        red: f64,
    },

    /// Permit recommendation thresholds are not strictly increasing inside
    /// (0, 100].
    #[error("Invalid permit thresholds: monitoring={monitoring}, conditions={conditions}, defer={defer}")]
    PermitThresholds {
        /// Lower bound of approve-with-monitoring.
        monitoring: f64,
        /// Lower bound of approve-with-conditions.
        conditions: f64,
        /// Lower bound of defer.
        defer: f64,
    },

    /// A month is claimed by zero or several seasons.
    #[error("Month {month} is covered by {matches} seasons, expected exactly one")]
    SeasonCoverage {
        /// Calendar month, 1-12.
        month: u32,
        /// Number of seasons listing it.
        matches: usize,
    },

    /// A season lists a month outside 1-12.
    #[error("Season {season} lists invalid month {month}")]
    InvalidMonth {
        /// Offending season.
        season: Season,
        /// Offending month.
        month: u32,
    },

    /// A season is defined twice.
    #[error("Season {0} is defined more than once")]
    DuplicateSeason(Season),

    /// A seasonal modifier would reduce risk.
    #[error("Season {season} has modifier {modifier}, expected >= 1.0")]
    InvalidModifier {
        /// Offending season.
        season: Season,
        /// Offending modifier.
        modifier: f64,
    },

    /// Winter must carry the highest seasonal modifier.
    #[error("Season {season} has a higher modifier than winter")]
    WinterNotHighest {
        /// Season outranking winter.
        season: Season,
    },

    /// A zone or corridor has a zero capacity.
    #[error("{id} has an invalid capacity")]
    InvalidCapacity {
        /// Zone code or corridor identifier.
        id: String,
    },

    /// Two zones share a code.
    #[error("Duplicate zone code: {0}")]
    DuplicateZone(String),

    /// Two corridors share an identifier.
    #[error("Duplicate corridor id: {0}")]
    DuplicateCorridor(String),

    /// A corridor cannot be matched because it has no keywords.
    #[error("Corridor {0} has no keywords")]
    EmptyKeywords(String),

    /// A corridor crosses a zone that is not configured.
    #[error("Corridor {corridor} references unknown zone {zone}")]
    UnknownCorridorZone {
        /// Corridor identifier.
        corridor: String,
        /// Unknown zone code.
        zone: String,
    },

    /// Any other invalid value.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Lower bounds of the yellow, orange and red bands. Green starts at 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub yellow: f64,
    pub orange: f64,
    pub red: f64,
}

/// Base daily exposure per affected user group, before conflicts and
/// density amplification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureBase {
    pub pedestrians: f64,
    pub cyclists: f64,
    pub transit: f64,
}

impl Default for ExposureBase {
    fn default() -> Self {
        Self {
            pedestrians: 500.0,
            cyclists: 200.0,
            transit: 300.0,
        }
    }
}

/// Permit decision policy.
///
/// Recommendation thresholds are independent of the severity bands and
/// validated separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermitPolicy {
    /// Scores at or above this are approved with monitoring.
    pub monitoring: f64,
    /// Scores at or above this are approved with conditions.
    pub conditions: f64,
    /// Scores at or above this are deferred.
    pub defer: f64,
    /// Zone saturation ratio requiring a coordination meeting.
    pub saturation_condition: f64,
    /// Durations above this require progress reports.
    pub long_duration_days: u32,
    /// Conflict count requiring a coordinated signage plan.
    pub conflict_signage_min: u32,
    /// Coactivity component value requiring restricted work hours.
    pub restricted_hours_min: f64,
    /// Days scanned when searching for a better start window.
    pub optimal_window_days: u32,
    /// Capacity of zones absent from the zone table.
    pub default_capacity: u32,
    #[serde(default)]
    pub exposure: ExposureBase,
}

/// One step of the coactivity multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoactivityStep {
    /// Smallest cluster size this step applies to.
    pub min_sites: u32,
    /// Multiplier for clusters of at least `min_sites`.
    pub multiplier: f64,
}

/// Coactivity clustering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoactivityConfig {
    /// Sites closer than this (meters) are coactive.
    pub radius_m: f64,
    /// Steps ordered by `min_sites`.
    pub steps: Vec<CoactivityStep>,
}

impl CoactivityConfig {
    /// Multiplier for a cluster of `sites` active worksites.
    ///
    /// Returns 1.0 below the first step.
    #[must_use]
    pub fn multiplier(&self, sites: u32) -> f64 {
        self.steps
            .iter()
            .take_while(|step| step.min_sites <= sites)
            .last()
            .map_or(1.0, |step| step.multiplier)
    }
}

/// Ambient score tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Factor applied when a corridor crossing the zone is saturated.
    pub corridor_saturation_factor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            corridor_saturation_factor: 1.1,
        }
    }
}

/// What-if simulation constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Incidents per 1000 exposed pedestrians per day.
    pub pedestrian_incident_rate: f64,
    /// Incidents per 1000 exposed cyclists per day.
    pub cyclist_incident_rate: f64,
    /// Days the deferred scenario pushes the work back.
    pub deferral_days: u32,
    /// Share of current sites still active after each 30 days of deferral.
    pub deferred_activity_ratio: f64,
    pub deferred_flow_ratio: f64,
    pub deferred_ambient_ratio: f64,
    /// Redirected users per score point.
    pub redirect_divisor: f64,
    pub deferred_redirect_divisor: f64,
    /// Score points per predicted incident when ranking scenarios.
    pub incident_weight: f64,
    pub low_impact_max: f64,
    pub moderate_impact_max: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            pedestrian_incident_rate: 0.036,
            cyclist_incident_rate: 0.048,
            deferral_days: 30,
            deferred_activity_ratio: 0.7,
            deferred_flow_ratio: 0.8,
            deferred_ambient_ratio: 0.85,
            redirect_divisor: 100.0,
            deferred_redirect_divisor: 120.0,
            incident_weight: 50.0,
            low_impact_max: 10.0,
            moderate_impact_max: 25.0,
        }
    }
}

/// A season and the months it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonDefinition {
    pub season: Season,
    /// Calendar months, 1-12.
    pub months: Vec<u32>,
    /// Multiplicative risk modifier, at least 1.0.
    pub modifier: f64,
    /// Operating constraints in force, in display order.
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// Static description of a scoring zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneProfile {
    /// Administrative-area code.
    pub code: String,
    /// Administrative-area label.
    pub name: String,
    /// Maximum concurrent worksites.
    pub capacity: u32,
    /// Population density amplification of vulnerable exposure.
    #[serde(default = "default_density_factor")]
    pub density_factor: f64,
    /// Radius in meters.
    pub radius_m: f64,
    pub centroid: Coordinates,
}

const fn default_density_factor() -> f64 {
    1.0
}

/// A complete, validated configuration table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Table version, reported alongside results.
    pub version: String,
    pub severity: SeverityThresholds,
    pub permit: PermitPolicy,
    pub coactivity: CoactivityConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    pub seasons: Vec<SeasonDefinition>,
    pub zones: Vec<ZoneProfile>,
    #[serde(default)]
    pub corridors: Vec<Corridor>,
}

impl RiskConfig {
    /// Loads the default embedded table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded table fails to parse or
    /// validate.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::named(DEFAULT_TABLE)
    }

    /// Loads an embedded table by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTable`] if no table has this name, or
    /// a parse/validation error.
    pub fn named(name: &str) -> Result<Self, ConfigError> {
        let (_, toml) = TABLES
            .iter()
            .find(|(table, _)| *table == name)
            .ok_or_else(|| ConfigError::UnknownTable(name.to_string()))?;
        Self::from_toml_str(toml)
    }

    /// Reads and validates a table from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&contents)?;
        log::info!(
            "Loaded configuration {} from {}",
            config.version,
            path.as_ref().display()
        );
        Ok(config)
    }

    /// Parses and validates a table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or the table is
    /// invalid.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(s)?;
        config.validate()?;
        log::debug!(
            "Validated configuration {}: {} zones, {} corridors",
            config.version,
            config.zones.len(),
            config.corridors.len()
        );
        Ok(config)
    }

    /// Looks up a zone by code.
    #[must_use]
    pub fn zone(&self, code: &str) -> Option<&ZoneProfile> {
        self.zones.iter().find(|z| z.code == code)
    }

    /// First corridor, in table order, whose keywords match `location`.
    #[must_use]
    pub fn match_corridor(&self, location: &str) -> Option<&Corridor> {
        self.corridors.iter().find(|c| c.matches(location))
    }
}

/// Names of the embedded tables.
#[must_use]
pub fn table_names() -> Vec<&'static str> {
    TABLES.iter().map(|(name, _)| *name).collect()
}
