//! Composite risk scores and their explanations.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::SeverityBand;

/// Which formula produced a score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreFormula {
    /// Ambient zone score from the three data layers
    Ambient,
    /// Marginal score of a permit request
    Permit,
}

/// A weighted term of a score.
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
pub enum ComponentKind {
    // ambient
    OnSiteInjury,
    InTransitAccident,
    RealTimeExposure,
    // permit
    Coactivity,
    VulnerableExposure,
    HistoricalBaseRate,
    CascadeEffect,
    ZoneSaturation,
}

/// One term of a score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreComponent {
    /// Component identity.
    pub kind: ComponentKind,
    /// Weight in the aggregate.
    pub weight: f64,
    /// Component value on 0-100.
    pub value: f64,
    /// `weight * value`.
    pub contribution: f64,
}

impl ScoreComponent {
    /// Builds a component and its contribution.
    #[must_use]
    pub fn new(kind: ComponentKind, weight: f64, value: f64) -> Self {
        Self {
            kind,
            weight,
            value,
            contribution: weight * value,
        }
    }
}

/// Situational multiplier applied after aggregation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifierKind {
    Coactivity,
    Weather,
    CorridorSaturation,
    Seasonal,
}

/// An applied modifier with the reason it applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifier {
    /// Modifier identity.
    pub kind: ModifierKind,
    /// Multiplicative factor.
    pub factor: f64,
    /// Short human-readable reason.
    pub detail: String,
}

/// A 0-100 risk score with its explanation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskScore {
    /// Final clamped score.
    pub value: f64,
    /// Weighted sum before modifiers.
    pub raw: f64,
    /// Band of `value`.
    pub severity: SeverityBand,
    /// Formula that produced the score.
    pub formula: ScoreFormula,
    /// Ordered weighted components.
    pub components: Vec<ScoreComponent>,
    /// Ordered modifiers.
    pub modifiers: Vec<Modifier>,
}

impl RiskScore {
    /// Product of every modifier factor.
    #[must_use]
    pub fn combined_factor(&self) -> f64 {
        self.modifiers.iter().map(|m| m.factor).product()
    }

    /// Looks up a component by kind.
    #[must_use]
    pub fn component(&self, kind: ComponentKind) -> Option<&ScoreComponent> {
        self.components.iter().find(|c| c.kind == kind)
    }
}
