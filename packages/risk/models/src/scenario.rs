//! What-if simulation inputs and outputs.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::permit::{ObstructionKind, WorkType};

/// Inputs of a what-if simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParams {
    /// Current ambient score of the zone.
    pub ambient_score: f64,
    /// Active worksites in the zone.
    pub active_sites: u32,
    /// Daily pedestrian flow.
    pub pedestrian_flow: f64,
    /// Daily cyclist flow.
    pub cyclist_flow: f64,
    /// Kind of the hypothetical work.
    pub work_type: WorkType,
    /// Obstruction of the hypothetical work.
    pub obstruction: ObstructionKind,
    /// Duration in days.
    pub duration_days: u32,
    /// Whether pedestrians are redirected.
    #[serde(default = "affected")]
    pub affects_pedestrians: bool,
    /// Whether cyclists are redirected.
    #[serde(default = "affected")]
    pub affects_cyclists: bool,
}

const fn affected() -> bool {
    true
}

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
pub enum ScenarioKind {
    NoConstruction,
    WithConstruction,
    Deferred,
}

/// One counterfactual outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub kind: ScenarioKind,
    /// Score in the scenario, 0-100.
    pub score: f64,
    /// Active worksites assumed.
    pub active_sites: u32,
    /// Coactivity multiplier at that count.
    pub coactivity_multiplier: f64,
    /// Pedestrians pushed onto detours per day.
    pub redirected_pedestrians: u64,
    /// Cyclists pushed onto detours per day.
    pub redirected_cyclists: u64,
    /// Expected incidents over the work duration.
    pub predicted_incidents: f64,
}

impl Scenario {
    /// Users redirected per day, saturating at `u64::MAX`.
    #[must_use]
    pub const fn redirected_users(&self) -> u64 {
        self.redirected_pedestrians.saturating_add(self.redirected_cyclists)
    }
}

/// Coarse verdict on how much a permit changes the zone's risk.
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
pub enum ImpactLevel {
    Low,
    Moderate,
    Significant,
}

/// The three scenarios and their comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSet {
    pub baseline: Scenario,
    pub with_construction: Scenario,
    pub deferred: Scenario,
    /// `with_construction.score - baseline.score`.
    pub delta_risk: f64,
    /// `with_construction.score - deferred.score`.
    pub risk_saved_by_deferral: f64,
    /// Additional users redirected compared to the baseline.
    pub delta_users: u64,
    pub impact: ImpactLevel,
    /// Scenario with the lower combined score and incident cost.
    pub preferred: ScenarioKind,
    /// Days the deferred scenario pushes the work back.
    pub deferral_days: u32,
}
