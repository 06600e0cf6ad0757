//! What-if simulation of a hypothetical permit.
//!
//! Three counterfactuals are compared: the zone as it is, the zone with the
//! work starting now, and the zone with the work deferred by the configured
//! window, when part of today's activity will have finished and flows are
//! expected to be lower. The activity ratio compounds once per
//! [`ACTIVITY_PERIOD_DAYS`] of deferral.

use urban_risk_config::{CoactivityConfig, SimulationConfig};
use urban_risk_models::{ImpactLevel, Scenario, ScenarioKind, ScenarioSet, SimulationParams};

use crate::EngineError;

/// Deferral length the activity ratio is expressed for.
pub const ACTIVITY_PERIOD_DAYS: f64 = 30.0;

fn check(name: &'static str, value: f64) -> Result<f64, EngineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EngineError::InvalidParameter { name, value })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_count(value: f64) -> u64 {
    value.floor().max(0.0) as u64
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_sites(value: f64) -> u32 {
    value.floor().clamp(0.0, f64::from(u32::MAX)) as u32
}

#[allow(clippy::cast_precision_loss)]
fn incidents(pedestrians: u64, cyclists: u64, duration_days: u32, sim: &SimulationConfig) -> f64 {
    let daily = (pedestrians as f64).mul_add(
        sim.pedestrian_incident_rate,
        cyclists as f64 * sim.cyclist_incident_rate,
    ) / 1000.0;
    daily * f64::from(duration_days)
}

#[allow(clippy::cast_precision_loss)]
fn redirect_score(pedestrians: u64, cyclists: u64, divisor: f64) -> f64 {
    (pedestrians as f64 + cyclists as f64) / divisor
}

/// Share of today's sites still active after `days` of deferral.
fn remaining_activity(sim: &SimulationConfig, days: u32) -> f64 {
    sim.deferred_activity_ratio.powf(f64::from(days) / ACTIVITY_PERIOD_DAYS)
}

struct Redirected {
    pedestrians: u64,
    cyclists: u64,
}

impl Redirected {
    fn of(params: &SimulationParams, ratio: f64) -> Self {
        let flow = |on: bool, value: f64| if on { floor_count(value * ratio) } else { 0 };
        Self {
            pedestrians: flow(params.affects_pedestrians, params.pedestrian_flow),
            cyclists: flow(params.affects_cyclists, params.cyclist_flow),
        }
    }
}

/// Runs the three scenarios for a hypothetical permit.
///
/// # Errors
///
/// Returns [`EngineError::InvalidParameter`] if the ambient score or a flow
/// is negative or not finite, or the ambient score exceeds 100.
pub fn simulate(
    params: &SimulationParams,
    coactivity: &CoactivityConfig,
    sim: &SimulationConfig,
) -> Result<ScenarioSet, EngineError> {
    let ambient = check("ambient_score", params.ambient_score)?;
    if ambient > 100.0 {
        return Err(EngineError::InvalidParameter {
            name: "ambient_score",
            value: ambient,
        });
    }
    check("pedestrian_flow", params.pedestrian_flow)?;
    check("cyclist_flow", params.cyclist_flow)?;

    let impact = params.work_type.impact_points();
    let ratio = params.obstruction.redirect_ratio();

    let baseline = Scenario {
        kind: ScenarioKind::NoConstruction,
        score: ambient,
        active_sites: params.active_sites,
        coactivity_multiplier: coactivity.multiplier(params.active_sites),
        redirected_pedestrians: 0,
        redirected_cyclists: 0,
        predicted_incidents: 0.0,
    };

    let with_sites = params.active_sites.saturating_add(1);
    let with_m = coactivity.multiplier(with_sites);
    let now = Redirected::of(params, ratio);
    let with_construction = Scenario {
        kind: ScenarioKind::WithConstruction,
        score: (ambient
            + impact * (with_m - 1.0)
            + redirect_score(now.pedestrians, now.cyclists, sim.redirect_divisor))
        .min(100.0),
        active_sites: with_sites,
        coactivity_multiplier: with_m,
        redirected_pedestrians: now.pedestrians,
        redirected_cyclists: now.cyclists,
        predicted_incidents: incidents(now.pedestrians, now.cyclists, params.duration_days, sim),
    };

    let future_sites = floor_sites(
        f64::from(params.active_sites) * remaining_activity(sim, sim.deferral_days),
    )
    .saturating_add(1);
    let deferred_m = coactivity.multiplier(future_sites);
    let later = Redirected::of(params, ratio * sim.deferred_flow_ratio);
    let deferred = Scenario {
        kind: ScenarioKind::Deferred,
        score: ambient
            .mul_add(
                sim.deferred_ambient_ratio,
                impact * (deferred_m - 1.0)
                    + redirect_score(
                        later.pedestrians,
                        later.cyclists,
                        sim.deferred_redirect_divisor,
                    ),
            )
            .min(100.0),
        active_sites: future_sites,
        coactivity_multiplier: deferred_m,
        redirected_pedestrians: later.pedestrians,
        redirected_cyclists: later.cyclists,
        predicted_incidents: incidents(
            later.pedestrians,
            later.cyclists,
            params.duration_days,
            sim,
        ),
    };

    let delta_risk = with_construction.score - baseline.score;
    let impact_level = if delta_risk <= sim.low_impact_max {
        ImpactLevel::Low
    } else if delta_risk <= sim.moderate_impact_max {
        ImpactLevel::Moderate
    } else {
        ImpactLevel::Significant
    };

    let cost = |s: &Scenario| sim.incident_weight.mul_add(s.predicted_incidents, s.score);
    let preferred = if cost(&deferred) < cost(&with_construction) {
        ScenarioKind::Deferred
    } else {
        ScenarioKind::WithConstruction
    };

    log::debug!(
        "Simulated {} {}: baseline {:.1}, with {:.1}, deferred {}d {:.1}",
        params.work_type,
        params.obstruction,
        baseline.score,
        with_construction.score,
        sim.deferral_days,
        deferred.score
    );

    Ok(ScenarioSet {
        delta_risk,
        risk_saved_by_deferral: with_construction.score - deferred.score,
        delta_users: with_construction
            .redirected_users()
            .saturating_sub(baseline.redirected_users()),
        impact: impact_level,
        preferred,
        deferral_days: sim.deferral_days,
        baseline,
        with_construction,
        deferred,
    })
}

#[cfg(test)]
mod tests {
    use urban_risk_config::RiskConfig;
    use urban_risk_models::{ObstructionKind, WorkType};

    use super::*;

    fn run(params: &SimulationParams) -> Result<ScenarioSet, EngineError> {
        let config = RiskConfig::embedded().unwrap();
        simulate(params, &config.coactivity, &config.simulation)
    }

    fn params() -> SimulationParams {
        SimulationParams {
            ambient_score: 40.0,
            active_sites: 2,
            pedestrian_flow: 5000.0,
            cyclist_flow: 1000.0,
            work_type: WorkType::Aqueduct,
            obstruction: ObstructionKind::FullClosure,
            duration_days: 30,
            affects_pedestrians: true,
            affects_cyclists: true,
        }
    }

    #[test]
    fn empty_zone_adds_no_risk() {
        let set = run(&SimulationParams {
            ambient_score: 25.0,
            active_sites: 0,
            pedestrian_flow: 0.0,
            cyclist_flow: 0.0,
            ..params()
        })
        .unwrap();
        assert!((set.with_construction.score - set.baseline.score).abs() < 1e-9);
        assert!(set.with_construction.predicted_incidents.abs() < 1e-9);
        assert_eq!(set.delta_users, 0);
        assert_eq!(set.impact, ImpactLevel::Low);
    }

    #[test]
    fn with_construction_follows_formula() {
        let set = run(&params()).unwrap();
        let with = &set.with_construction;
        assert_eq!(with.active_sites, 3);
        assert!((with.coactivity_multiplier - 1.5).abs() < 1e-9);
        assert_eq!(with.redirected_pedestrians, 4500);
        assert_eq!(with.redirected_cyclists, 900);
        // 40 + 10 * 0.5 + 5400 / 100
        assert!((with.score - 99.0).abs() < 1e-9, "{}", with.score);
        // (4500 * 0.036 + 900 * 0.048) / 1000 * 30
        assert!((with.predicted_incidents - 6.156).abs() < 1e-9);
        assert!((set.delta_risk - 59.0).abs() < 1e-9);
        assert_eq!(set.impact, ImpactLevel::Significant);
        assert_eq!(set.delta_users, 5400);
    }

    #[test]
    fn deferral_lowers_activity_and_flows() {
        let set = run(&params()).unwrap();
        let deferred = &set.deferred;
        // floor(2 * 0.7) + 1
        assert_eq!(deferred.active_sites, 2);
        assert!((deferred.coactivity_multiplier - 1.3).abs() < 1e-9);
        assert_eq!(deferred.redirected_pedestrians, 3600);
        assert_eq!(deferred.redirected_cyclists, 720);
        // 40 * 0.85 + 10 * 0.3 + 4320 / 120
        assert!((deferred.score - 73.0).abs() < 1e-9, "{}", deferred.score);
        assert!((set.risk_saved_by_deferral - 26.0).abs() < 1e-9);
        assert_eq!(set.preferred, ScenarioKind::Deferred);
    }

    #[test]
    fn unaffected_groups_are_not_redirected() {
        let set = run(&SimulationParams {
            affects_cyclists: false,
            ..params()
        })
        .unwrap();
        assert_eq!(set.with_construction.redirected_cyclists, 0);
        assert_eq!(set.with_construction.redirected_pedestrians, 4500);
    }

    #[test]
    fn ties_prefer_building_now() {
        let set = run(&SimulationParams {
            ambient_score: 0.0,
            active_sites: 0,
            pedestrian_flow: 0.0,
            cyclist_flow: 0.0,
            ..params()
        })
        .unwrap();
        assert_eq!(set.preferred, ScenarioKind::WithConstruction);
    }

    #[test]
    fn rejects_invalid_inputs() {
        for bad in [f64::NAN, -1.0, f64::INFINITY] {
            let result = run(&SimulationParams {
                pedestrian_flow: bad,
                ..params()
            });
            assert!(matches!(
                result,
                Err(EngineError::InvalidParameter {
                    name: "pedestrian_flow",
                    ..
                })
            ));
        }
        assert!(run(&SimulationParams {
            ambient_score: 120.0,
            ..params()
        })
        .is_err());
    }

    #[test]
    fn longer_deferral_leaves_fewer_sites() {
        let config = RiskConfig::embedded().unwrap();
        let busy = SimulationParams {
            active_sites: 10,
            ..params()
        };

        let month = simulate(&busy, &config.coactivity, &config.simulation).unwrap();
        assert_eq!(month.deferral_days, 30);
        // floor(10 * 0.7) + 1
        assert_eq!(month.deferred.active_sites, 8);

        let year_config = SimulationConfig {
            deferral_days: 365,
            ..config.simulation
        };
        let year = simulate(&busy, &config.coactivity, &year_config).unwrap();
        assert_eq!(year.deferral_days, 365);
        // floor(10 * 0.7^(365 / 30)) + 1
        assert_eq!(year.deferred.active_sites, 1);
        assert!(year.deferred.score < month.deferred.score);
        assert_eq!(year.with_construction, month.with_construction);
    }

    #[test]
    fn huge_flows_saturate_instead_of_overflowing() {
        let set = run(&SimulationParams {
            pedestrian_flow: 2.0e19,
            cyclist_flow: 2.0e19,
            ..params()
        })
        .unwrap();
        let with = &set.with_construction;
        assert_eq!(with.redirected_users(), u64::MAX);
        assert!((with.score - 100.0).abs() < f64::EPSILON);
        assert!(with.predicted_incidents.is_finite());
        assert_eq!(set.delta_users, u64::MAX);
    }

    #[test]
    fn simulation_is_deterministic() {
        assert_eq!(run(&params()).unwrap(), run(&params()).unwrap());
    }
}
