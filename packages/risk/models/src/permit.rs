//! Permit requests and the decisions produced for them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{
    SeverityBand,
    score::RiskScore,
    territory::{Coordinates, CorridorCategory, CorridorStatus, Season},
};

/// Category of construction work.
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
pub enum WorkType {
    /// Water main work
    Aqueduct,
    /// Sewer work
    Sewer,
    /// Roadway reconstruction or paving
    Road,
    /// Building construction or renovation
    Building,
    /// Telecommunication cabling
    Telecom,
    /// Gas network work
    Gas,
    /// Electrical network work
    Electrical,
    /// Landscaping and urban furniture
    Landscaping,
    /// Demolition
    Demolition,
    /// Excavation and earthworks
    Excavation,
    /// Anything not covered above
    Other,
}

impl WorkType {
    /// Maps a free-text work description to a category.
    ///
    /// Accepts the canonical snake-case names as well as common English and
    /// French descriptions found in municipal permit feeds.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        const KEYWORDS: &[(&str, WorkType)] = &[
            ("demol", WorkType::Demolition),
            ("démol", WorkType::Demolition),
            ("excavat", WorkType::Excavation),
            ("aqueduc", WorkType::Aqueduct),
            ("water main", WorkType::Aqueduct),
            ("sewer", WorkType::Sewer),
            ("égout", WorkType::Sewer),
            ("egout", WorkType::Sewer),
            ("gaz", WorkType::Gas),
            ("gas", WorkType::Gas),
            ("électri", WorkType::Electrical),
            ("electri", WorkType::Electrical),
            ("télécom", WorkType::Telecom),
            ("telecom", WorkType::Telecom),
            ("fibre", WorkType::Telecom),
            ("paysag", WorkType::Landscaping),
            ("landscap", WorkType::Landscaping),
            ("bâtiment", WorkType::Building),
            ("batiment", WorkType::Building),
            ("building", WorkType::Building),
            ("chaussée", WorkType::Road),
            ("chaussee", WorkType::Road),
            ("road", WorkType::Road),
            ("rout", WorkType::Road),
            ("paving", WorkType::Road),
        ];

        let label = label.trim().to_lowercase();
        if let Ok(exact) = label.parse::<Self>() {
            return exact;
        }
        KEYWORDS
            .iter()
            .find(|(needle, _)| label.contains(needle))
            .map_or(Self::Other, |(_, kind)| *kind)
    }

    /// Weight of the work type in the cascade/network-effect component.
    #[must_use]
    pub const fn cascade_weight(self) -> f64 {
        match self {
            Self::Aqueduct | Self::Sewer => 7.0,
            Self::Road => 6.0,
            Self::Building | Self::Landscaping => 4.0,
            Self::Telecom => 3.0,
            Self::Gas | Self::Excavation => 8.0,
            Self::Electrical | Self::Other => 5.0,
            Self::Demolition => 9.0,
        }
    }

    /// Points added per unit of coactivity above 1.0 in what-if simulation.
    #[must_use]
    pub const fn impact_points(self) -> f64 {
        match self {
            Self::Demolition => 15.0,
            Self::Excavation => 12.0,
            Self::Aqueduct => 10.0,
            Self::Road => 8.0,
            Self::Building => 5.0,
            _ => 6.0,
        }
    }
}

/// How a worksite obstructs the public right of way.
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
pub enum ObstructionKind {
    /// Street closed to all traffic
    FullClosure,
    /// Some lanes occupied
    PartialOccupation,
    /// Sidewalk occupied
    Sidewalk,
    /// Cycle lane occupied
    CycleLane,
    /// Parking spaces only
    Parking,
}

impl ObstructionKind {
    /// Weight of the obstruction in the cascade/network-effect component.
    #[must_use]
    pub const fn risk_weight(self) -> f64 {
        match self {
            Self::FullClosure => 10.0,
            Self::PartialOccupation => 5.0,
            Self::Sidewalk => 7.0,
            Self::CycleLane => 6.0,
            Self::Parking => 2.0,
        }
    }

    /// Share of pedestrian and cyclist flow pushed onto detours.
    #[must_use]
    pub const fn redirect_ratio(self) -> f64 {
        match self {
            Self::FullClosure => 0.9,
            Self::Sidewalk | Self::CycleLane => 0.6,
            Self::PartialOccupation => 0.3,
            Self::Parking => 0.1,
        }
    }
}

/// Decision recommended for a permit request.
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
pub enum Recommendation {
    Approve,
    ApproveWithMonitoring,
    ApproveWithConditions,
    Defer,
}

/// A candidate construction permit. Input only, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitRequest {
    /// Permit identifier.
    pub permit_id: String,
    /// Street or location text.
    pub street: String,
    /// Administrative-area code of the zone.
    pub zone: String,
    /// Kind of work.
    pub work_type: WorkType,
    /// How the work obstructs the right of way.
    pub obstruction: ObstructionKind,
    /// Planned duration in days.
    pub duration_days: u32,
    /// Whether pedestrians are affected.
    #[serde(default)]
    pub affects_pedestrians: bool,
    /// Whether cyclists are affected.
    #[serde(default)]
    pub affects_cyclists: bool,
    /// Whether transit is affected.
    #[serde(default)]
    pub affects_transit: bool,
    /// Requested first day of work.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Location of the work.
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    /// Emergency work, approved at once under fixed conditions.
    #[serde(default)]
    pub urgent: bool,
}

/// Kind of mitigation attached to a permit decision.
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
pub enum ConditionKind {
    PedestrianCorridor,
    ReducedMobilityAccess,
    CyclingDetour,
    TransitNotice,
    AdvanceSignage,
    CoordinationMeeting,
    ProgressReport,
    CorridorCoordination,
    SignagePlan,
    RestrictedHours,
    EmergencyAuthorization,
    RapidSignage,
    UserNotification,
    PostInterventionReport,
    Flagger,
    NightLighting,
    PerimeterProtection,
}

/// A condition clause attached to a permit decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MitigationCondition {
    /// What the condition addresses.
    pub kind: ConditionKind,
    /// Clause text.
    pub text: String,
}

/// A protected corridor matched by the request's location text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridorHit {
    /// Corridor identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Traffic carried.
    pub category: CorridorCategory,
    /// Priority rank.
    pub priority: u8,
    /// Occupancy status at evaluation time.
    pub status: CorridorStatus,
}

/// Suggested start window minimizing overlap with nearby worksites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkWindow {
    /// Suggested first day.
    pub start: NaiveDate,
    /// Suggested last day.
    pub end: NaiveDate,
    /// Days after the requested start.
    pub offset_days: u32,
    /// Worksites still overlapping the suggested window.
    pub conflicts: u32,
}

/// Outcome of evaluating a permit request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// Evaluated permit identifier.
    pub permit_id: String,
    /// Zone code.
    pub zone: String,
    /// Marginal permit score.
    pub score: RiskScore,
    /// Recommended decision.
    pub recommendation: Recommendation,
    /// Ordered mitigation conditions.
    pub conditions: Vec<MitigationCondition>,
    /// Whether a person must validate the decision.
    pub requires_human_review: bool,
    /// Protected corridor the request falls on, if any.
    pub corridor_hit: Option<CorridorHit>,
    /// Worksites overlapping the request in space and time.
    pub conflicts: u32,
    /// Active sites over zone capacity.
    pub saturation_ratio: f64,
    /// Season at the requested start.
    pub season: Season,
    /// Seasonal constraints in force.
    pub seasonal_constraints: Vec<String>,
    /// Better start window, for deferred or conditional approvals.
    pub optimal_window: Option<WorkWindow>,
    /// Whether the request went through the emergency path.
    pub urgent: bool,
}

impl EvaluationResult {
    /// Severity band of the permit score.
    #[must_use]
    pub const fn severity(&self) -> SeverityBand {
        self.score.severity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_type_from_french_and_english_labels() {
        assert_eq!(WorkType::from_label("Réfection d'aqueduc"), WorkType::Aqueduct);
        assert_eq!(WorkType::from_label("Travaux d'égout"), WorkType::Sewer);
        assert_eq!(WorkType::from_label("DEMOLITION"), WorkType::Demolition);
        assert_eq!(WorkType::from_label("road"), WorkType::Road);
        assert_eq!(WorkType::from_label("painting"), WorkType::Other);
    }

    #[test]
    fn full_closure_is_most_disruptive() {
        for kind in [
            ObstructionKind::PartialOccupation,
            ObstructionKind::Sidewalk,
            ObstructionKind::CycleLane,
            ObstructionKind::Parking,
        ] {
            assert!(ObstructionKind::FullClosure.risk_weight() > kind.risk_weight());
            assert!(ObstructionKind::FullClosure.redirect_ratio() > kind.redirect_ratio());
        }
    }

    #[test]
    fn permit_request_deserializes_with_defaults() {
        let request: PermitRequest = serde_json::from_value(serde_json::json!({
            "permitId": "P-1",
            "street": "rue Saint-Denis",
            "zone": "PMR",
            "workType": "sewer",
            "obstruction": "partial_occupation",
            "durationDays": 10
        }))
        .unwrap();
        assert!(!request.affects_pedestrians);
        assert!(request.start_date.is_none());
        assert_eq!(request.work_type, WorkType::Sewer);
    }
}
