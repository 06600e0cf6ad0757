//! Permit request evaluation.
//!
//! A request is scored with the permit formula against a tracker snapshot,
//! mapped to a recommendation with its own thresholds, and given an ordered
//! list of mitigation conditions. Conditions come from a fixed rule table so
//! the same inputs always yield the same list in the same order.
//!
//! Urgent requests skip the thresholds: they are approved at once under the
//! emergency rule table and always go to human review.

use chrono::{Days, NaiveDate};
use urban_risk_config::{PermitPolicy, RiskConfig};
use urban_risk_models::{
    ComponentKind, ConditionKind, CorridorHit, EvaluationResult, MitigationCondition,
    ObstructionKind, PermitRequest, Recommendation, WorkWindow, ZoneFeatures,
};

use crate::{
    EngineError,
    scorer::{PermitContext, score_permit},
    seasonal::SeasonalProvider,
    severity::classify,
    tracker::TrackerSnapshot,
};

/// Maps a permit score to a recommendation.
#[must_use]
pub fn recommend(score: f64, policy: &PermitPolicy) -> Recommendation {
    if score >= policy.defer {
        Recommendation::Defer
    } else if score >= policy.conditions {
        Recommendation::ApproveWithConditions
    } else if score >= policy.monitoring {
        Recommendation::ApproveWithMonitoring
    } else {
        Recommendation::Approve
    }
}

/// Last day of work starting on `start`.
fn last_day(start: NaiveDate, duration_days: u32) -> NaiveDate {
    start
        .checked_add_days(Days::new(u64::from(duration_days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MAX)
}

/// What the condition rules look at.
struct ConditionInputs<'a> {
    request: &'a PermitRequest,
    policy: &'a PermitPolicy,
    saturation_ratio: f64,
    conflicts: u32,
    coactivity: f64,
    corridor: Option<&'a CorridorHit>,
}

struct ConditionRule {
    kind: ConditionKind,
    applies: fn(&ConditionInputs<'_>) -> bool,
    text: fn(&ConditionInputs<'_>) -> String,
}

const RULES: &[ConditionRule] = &[
    ConditionRule {
        kind: ConditionKind::PedestrianCorridor,
        applies: |i| i.request.affects_pedestrians,
        text: |_| "Maintain a secured pedestrian corridor at least 1.5 m wide".to_string(),
    },
    ConditionRule {
        kind: ConditionKind::ReducedMobilityAccess,
        applies: |i| i.request.affects_pedestrians,
        text: |_| "Provide a step-free route for persons with reduced mobility".to_string(),
    },
    ConditionRule {
        kind: ConditionKind::CyclingDetour,
        applies: |i| i.request.affects_cyclists,
        text: |_| "Mark and sign a cycling detour around the obstruction".to_string(),
    },
    ConditionRule {
        kind: ConditionKind::TransitNotice,
        applies: |i| i.request.affects_transit,
        text: |_| "Notify the transit operator at least 72 hours before work begins".to_string(),
    },
    ConditionRule {
        kind: ConditionKind::AdvanceSignage,
        applies: |i| i.request.obstruction == ObstructionKind::FullClosure,
        text: |_| "Install advance closure signage 200 m upstream".to_string(),
    },
    ConditionRule {
        kind: ConditionKind::CoordinationMeeting,
        applies: |i| i.saturation_ratio >= i.policy.saturation_condition,
        text: |i| {
            format!(
                "Attend a mandatory coordination meeting: zone at {:.0}% of worksite capacity",
                (i.saturation_ratio * 100.0).min(100.0)
            )
        },
    },
    ConditionRule {
        kind: ConditionKind::ProgressReport,
        applies: |i| i.request.duration_days > i.policy.long_duration_days,
        text: |i| {
            format!(
                "Submit a progress report every two weeks over the {} day duration",
                i.request.duration_days
            )
        },
    },
    ConditionRule {
        kind: ConditionKind::CorridorCoordination,
        applies: |i| i.corridor.is_some(),
        text: |i| {
            i.corridor.map_or_else(String::new, |c| {
                format!(
                    "Coordinate with the manager of protected corridor {} ({}), currently {}",
                    c.name, c.id, c.status
                )
            })
        },
    },
    ConditionRule {
        kind: ConditionKind::SignagePlan,
        applies: |i| i.conflicts >= i.policy.conflict_signage_min,
        text: |i| {
            format!(
                "Submit a signage plan coordinated with the {} overlapping worksites",
                i.conflicts
            )
        },
    },
    ConditionRule {
        kind: ConditionKind::RestrictedHours,
        applies: |i| i.coactivity >= i.policy.restricted_hours_min,
        text: |_| "Restrict noisy work to 07:00-19:00 on weekdays".to_string(),
    },
];

const URGENT_RULES: &[ConditionRule] = &[
    ConditionRule {
        kind: ConditionKind::EmergencyAuthorization,
        applies: |_| true,
        text: |_| "Emergency work: authorized immediately".to_string(),
    },
    ConditionRule {
        kind: ConditionKind::RapidSignage,
        applies: |_| true,
        text: |_| "Install temporary signage within 30 minutes".to_string(),
    },
    ConditionRule {
        kind: ConditionKind::UserNotification,
        applies: |_| true,
        text: |_| "Notify pedestrians and cyclists of the obstruction".to_string(),
    },
    ConditionRule {
        kind: ConditionKind::PostInterventionReport,
        applies: |_| true,
        text: |_| "Submit a post-intervention report within 24 hours".to_string(),
    },
    ConditionRule {
        kind: ConditionKind::Flagger,
        applies: |_| true,
        text: |_| "Keep a flagger on site while the right of way is obstructed".to_string(),
    },
    ConditionRule {
        kind: ConditionKind::NightLighting,
        applies: |_| true,
        text: |_| "Light the worksite if work continues after dark".to_string(),
    },
    ConditionRule {
        kind: ConditionKind::PerimeterProtection,
        applies: |_| true,
        text: |_| "Protect pedestrians within a 50 m perimeter".to_string(),
    },
];

fn conditions(rules: &[ConditionRule], inputs: &ConditionInputs<'_>) -> Vec<MitigationCondition> {
    rules
        .iter()
        .filter(|rule| {
            let applies = (rule.applies)(inputs);
            log::debug!("Condition {}: {applies}", rule.kind);
            applies
        })
        .map(|rule| MitigationCondition {
            kind: rule.kind,
            text: (rule.text)(inputs),
        })
        .collect()
}

/// Searches the configured window after `start` for the offset with the
/// lowest `10 * overlapping sites + 0.5 * offset`. Ties keep the earliest.
fn optimal_window(
    request: &PermitRequest,
    start: NaiveDate,
    tracker: &TrackerSnapshot,
    policy: &PermitPolicy,
) -> Option<WorkWindow> {
    let mut best: Option<(f64, WorkWindow)> = None;
    for offset in 0..=policy.optimal_window_days {
        let Some(from) = start.checked_add_days(Days::new(u64::from(offset))) else {
            break;
        };
        let to = last_day(from, request.duration_days);
        let overlaps = tracker.overlapping(&request.zone, request.coordinates, from, to);
        let cost = f64::from(offset).mul_add(0.5, f64::from(overlaps) * 10.0);
        if best.as_ref().is_none_or(|(lowest, _)| cost < *lowest) {
            best = Some((
                cost,
                WorkWindow {
                    start: from,
                    end: to,
                    offset_days: offset,
                    conflicts: overlaps,
                },
            ));
        }
    }
    best.map(|(_, window)| window)
}

/// Evaluates a permit request against a tracker snapshot.
///
/// # Errors
///
/// * [`EngineError::UnknownZone`] if the request's zone is not configured
/// * [`EngineError::UnknownCorridor`] if a matched corridor is missing from
///   the snapshot
pub fn evaluate(
    request: &PermitRequest,
    features: &ZoneFeatures,
    tracker: &TrackerSnapshot,
    seasons: &SeasonalProvider,
    config: &RiskConfig,
) -> Result<EvaluationResult, EngineError> {
    let zone = config
        .zone(&request.zone)
        .ok_or_else(|| EngineError::UnknownZone(request.zone.clone()))?;
    let policy = &config.permit;

    let corridor_hit = match config.match_corridor(&request.street) {
        Some(corridor) => {
            let state = tracker
                .corridor_status(&corridor.id)
                .ok_or_else(|| EngineError::UnknownCorridor(corridor.id.clone()))?;
            Some(CorridorHit {
                id: state.id,
                name: state.name,
                category: state.category,
                priority: state.priority,
                status: state.status,
            })
        }
        None => None,
    };

    let start = request.start_date.unwrap_or_else(|| tracker.as_of());
    let end = last_day(start, request.duration_days);
    let conflicts = tracker.conflicts_for(&zone.code, request.coordinates, start, end);
    let conflict_count = u32::try_from(conflicts.len()).unwrap_or(u32::MAX);
    let saturation = tracker.zone_saturation(&zone.code);
    let seasonal = seasons.for_date(start);

    let score = score_permit(
        &PermitContext {
            work_type: request.work_type,
            obstruction: request.obstruction,
            duration_days: request.duration_days,
            affects_pedestrians: request.affects_pedestrians,
            affects_cyclists: request.affects_cyclists,
            affects_transit: request.affects_transit,
            features,
            conflicts: &conflicts,
            radius_m: tracker.radius_m(),
            exposure: &policy.exposure,
            density_factor: zone.density_factor,
            saturation_ratio: saturation.ratio,
            seasonal: &seasonal,
        },
        &config.severity,
    );

    let recommendation = if request.urgent {
        Recommendation::Approve
    } else {
        recommend(score.value, policy)
    };
    let coactivity = score
        .component(ComponentKind::Coactivity)
        .map_or(0.0, |c| c.value);
    let conditions = conditions(
        if request.urgent { URGENT_RULES } else { RULES },
        &ConditionInputs {
            request,
            policy,
            saturation_ratio: saturation.ratio,
            conflicts: conflict_count,
            coactivity,
            corridor: corridor_hit.as_ref(),
        },
    );
    let requires_human_review =
        request.urgent || classify(score.value, &config.severity).requires_human_review;

    let optimal_window = match (recommendation, request.start_date) {
        (Recommendation::Defer | Recommendation::ApproveWithConditions, Some(start)) => {
            optimal_window(request, start, tracker, policy)
        }
        _ => None,
    };

    log::info!(
        "Permit {} in {}: score {:.1} ({}), {}, {} conditions",
        request.permit_id,
        zone.code,
        score.value,
        score.severity,
        recommendation,
        conditions.len()
    );
    if request.urgent {
        log::warn!(
            "Urgent permit {} approved pending human review",
            request.permit_id
        );
    } else if requires_human_review {
        log::warn!(
            "Permit {} requires human review ({} band)",
            request.permit_id,
            score.severity
        );
    }

    Ok(EvaluationResult {
        permit_id: request.permit_id.clone(),
        zone: zone.code.clone(),
        recommendation,
        conditions,
        requires_human_review,
        corridor_hit,
        conflicts: conflict_count,
        saturation_ratio: saturation.ratio,
        season: seasonal.season,
        seasonal_constraints: seasonal.constraints,
        optimal_window,
        urgent: request.urgent,
        score,
    })
}

#[cfg(test)]
mod tests {
    use urban_risk_models::{
        Coordinates, CorridorStatus, Season, SeverityBand, WorkType, Worksite,
    };

    use super::*;
    use crate::tracker::{CapacityTracker, SiteEvent};

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn config() -> RiskConfig {
        RiskConfig::embedded().unwrap()
    }

    fn site(id: &str, zone: &str, street: &str, start: &str, end: &str) -> Worksite {
        Worksite {
            id: id.to_string(),
            zone: zone.to_string(),
            street: street.to_string(),
            coordinates: None,
            work_type: WorkType::Road,
            start: Some(day(start)),
            end: Some(day(end)),
        }
    }

    fn busy_tracker(config: &RiskConfig, zone: &str, active: usize) -> CapacityTracker {
        let mut tracker = CapacityTracker::new(config);
        for i in 0..active {
            tracker.apply(SiteEvent::Upsert(site(
                &format!("{zone}-{i}"),
                zone,
                "rue Ontario",
                "2025-06-01",
                "2025-06-30",
            )));
        }
        tracker
    }

    fn request(zone: &str) -> PermitRequest {
        PermitRequest {
            permit_id: "P-1".to_string(),
            street: "rue Ontario".to_string(),
            zone: zone.to_string(),
            work_type: WorkType::Telecom,
            obstruction: ObstructionKind::Parking,
            duration_days: 5,
            affects_pedestrians: false,
            affects_cyclists: false,
            affects_transit: false,
            start_date: None,
            coordinates: None,
            urgent: false,
        }
    }

    fn run(request: &PermitRequest, tracker: &CapacityTracker) -> EvaluationResult {
        let config = config();
        let seasons = SeasonalProvider::new(&config.seasons).unwrap();
        let snapshot = tracker.snapshot(day("2025-06-15"));
        evaluate(
            request,
            &ZoneFeatures::empty(&request.zone),
            &snapshot,
            &seasons,
            &config,
        )
        .unwrap()
    }

    fn kinds(result: &EvaluationResult) -> Vec<ConditionKind> {
        result.conditions.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn recommendation_thresholds_are_separate_from_bands() {
        let policy = config().permit;
        assert_eq!(recommend(29.9, &policy), Recommendation::Approve);
        assert_eq!(recommend(30.0, &policy), Recommendation::ApproveWithMonitoring);
        assert_eq!(recommend(55.0, &policy), Recommendation::ApproveWithConditions);
        assert_eq!(recommend(74.9, &policy), Recommendation::ApproveWithConditions);
        assert_eq!(recommend(75.0, &policy), Recommendation::Defer);
    }

    #[test]
    fn quiet_request_is_approved_without_conditions() {
        let config = config();
        let result = run(&request("ANJ"), &CapacityTracker::new(&config));
        assert_eq!(result.recommendation, Recommendation::Approve);
        assert!(result.conditions.is_empty());
        assert!(!result.requires_human_review);
        assert!(result.corridor_hit.is_none());
        assert_eq!(result.season, Season::Summer);
        assert!(result.optimal_window.is_none());
    }

    #[test]
    fn saturated_zone_requires_coordination_meeting() {
        let config = config();
        let tracker = busy_tracker(&config, "VM", 12);
        let result = run(&request("VM"), &tracker);
        assert!((result.saturation_ratio - 0.8).abs() < 1e-9);
        assert!(kinds(&result).contains(&ConditionKind::CoordinationMeeting));
        let meeting = result
            .conditions
            .iter()
            .find(|c| c.kind == ConditionKind::CoordinationMeeting)
            .unwrap();
        assert!(meeting.text.contains("80%"), "{}", meeting.text);
    }

    #[test]
    fn long_full_closure_in_busy_zone_is_deferred_with_conditions() {
        let config = config();
        let tracker = busy_tracker(&config, "VM", 12);
        let result = run(
            &PermitRequest {
                work_type: WorkType::Aqueduct,
                obstruction: ObstructionKind::FullClosure,
                duration_days: 45,
                affects_pedestrians: true,
                ..request("VM")
            },
            &tracker,
        );

        assert!(result.score.value >= 55.0, "score {}", result.score.value);
        assert!(matches!(
            result.recommendation,
            Recommendation::Defer | Recommendation::ApproveWithConditions
        ));
        let kinds = kinds(&result);
        for expected in [
            ConditionKind::PedestrianCorridor,
            ConditionKind::AdvanceSignage,
            ConditionKind::ProgressReport,
        ] {
            assert!(kinds.contains(&expected), "missing {expected}");
        }
        assert_eq!(result.conflicts, 12);
        assert!(result.severity() >= SeverityBand::Orange);
        assert!(result.requires_human_review);
    }

    #[test]
    fn conditions_follow_rule_table_order() {
        let config = config();
        let tracker = busy_tracker(&config, "VM", 12);
        let result = run(
            &PermitRequest {
                street: "rue Sainte-Catherine Ouest".to_string(),
                obstruction: ObstructionKind::FullClosure,
                duration_days: 40,
                affects_pedestrians: true,
                affects_cyclists: true,
                affects_transit: true,
                ..request("VM")
            },
            &tracker,
        );
        assert_eq!(
            kinds(&result),
            vec![
                ConditionKind::PedestrianCorridor,
                ConditionKind::ReducedMobilityAccess,
                ConditionKind::CyclingDetour,
                ConditionKind::TransitNotice,
                ConditionKind::AdvanceSignage,
                ConditionKind::CoordinationMeeting,
                ConditionKind::ProgressReport,
                ConditionKind::CorridorCoordination,
                ConditionKind::SignagePlan,
                ConditionKind::RestrictedHours,
            ]
        );
    }

    #[test]
    fn corridor_keyword_adds_corridor_condition_at_any_severity() {
        let config = config();
        let result = run(
            &PermitRequest {
                street: "Avenue du Mont-Royal Est".to_string(),
                ..request("PMR")
            },
            &CapacityTracker::new(&config),
        );
        let hit = result.corridor_hit.as_ref().unwrap();
        assert_eq!(hit.id, "COR-MR");
        assert_eq!(hit.status, CorridorStatus::Free);
        assert_eq!(result.severity(), SeverityBand::Green);
        let corridor = result
            .conditions
            .iter()
            .find(|c| c.kind == ConditionKind::CorridorCoordination)
            .unwrap();
        assert!(corridor.text.contains("COR-MR"));
    }

    #[test]
    fn urgent_request_is_approved_under_emergency_conditions() {
        let config = config();
        let tracker = busy_tracker(&config, "VM", 12);
        let urgent = PermitRequest {
            street: "rue Sainte-Catherine Ouest".to_string(),
            work_type: WorkType::Aqueduct,
            obstruction: ObstructionKind::FullClosure,
            duration_days: 45,
            affects_pedestrians: true,
            start_date: Some(day("2025-06-15")),
            urgent: true,
            ..request("VM")
        };
        let result = run(&urgent, &tracker);

        assert!(result.urgent);
        assert_eq!(result.recommendation, Recommendation::Approve);
        assert!(result.requires_human_review);
        assert!(result.optimal_window.is_none());
        assert_eq!(
            kinds(&result),
            vec![
                ConditionKind::EmergencyAuthorization,
                ConditionKind::RapidSignage,
                ConditionKind::UserNotification,
                ConditionKind::PostInterventionReport,
                ConditionKind::Flagger,
                ConditionKind::NightLighting,
                ConditionKind::PerimeterProtection,
            ]
        );

        let routine = run(
            &PermitRequest {
                urgent: false,
                ..urgent
            },
            &tracker,
        );
        assert!(!routine.urgent);
        assert_eq!(routine.score, result.score);
        assert_ne!(routine.recommendation, Recommendation::Approve);
    }

    #[test]
    fn urgent_quiet_request_still_needs_review() {
        let config = config();
        let result = run(
            &PermitRequest {
                urgent: true,
                ..request("ANJ")
            },
            &CapacityTracker::new(&config),
        );
        assert_eq!(result.severity(), SeverityBand::Green);
        assert!(result.requires_human_review);
        assert_eq!(result.conditions.len(), 7);
    }

    #[test]
    fn unknown_zone_is_rejected() {
        let config = config();
        let seasons = SeasonalProvider::new(&config.seasons).unwrap();
        let snapshot = CapacityTracker::new(&config).snapshot(day("2025-06-15"));
        let result = evaluate(
            &request("XYZ"),
            &ZoneFeatures::empty("XYZ"),
            &snapshot,
            &seasons,
            &config,
        );
        assert!(matches!(result, Err(EngineError::UnknownZone(zone)) if zone == "XYZ"));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let config = config();
        let tracker = busy_tracker(&config, "RPP", 6);
        let request = PermitRequest {
            affects_pedestrians: true,
            duration_days: 31,
            ..request("RPP")
        };
        assert_eq!(run(&request, &tracker), run(&request, &tracker));
    }

    #[test]
    fn season_follows_requested_start() {
        let config = config();
        let result = run(
            &PermitRequest {
                start_date: Some(day("2026-01-12")),
                ..request("ANJ")
            },
            &CapacityTracker::new(&config),
        );
        assert_eq!(result.season, Season::Winter);
        assert_eq!(result.seasonal_constraints.len(), 4);
        assert!((result.score.modifiers[0].factor - 1.3).abs() < 1e-9);
    }

    #[test]
    fn deferred_request_gets_a_quieter_window() {
        let config = config();
        let mut tracker = busy_tracker(&config, "VM", 12);
        tracker.apply(SiteEvent::Upsert(Worksite {
            coordinates: Some(Coordinates::new(45.5, -73.57)),
            ..site("LATE", "VM", "rue Peel", "2025-07-01", "2025-07-10")
        }));
        let result = run(
            &PermitRequest {
                work_type: WorkType::Demolition,
                obstruction: ObstructionKind::FullClosure,
                duration_days: 10,
                affects_pedestrians: true,
                start_date: Some(day("2025-06-15")),
                ..request("VM")
            },
            &tracker,
        );
        assert_eq!(result.recommendation, Recommendation::Defer);
        let window = result.optimal_window.unwrap();
        // the twelve June sites end on the 30th, the July site on the 10th
        assert_eq!(window.start, day("2025-07-11"));
        assert_eq!(window.offset_days, 26);
        assert_eq!(window.conflicts, 0);
        assert_eq!(window.end, day("2025-07-20"));
    }
}
