//! The two composite risk formulas.
//!
//! [`score_ambient`] scores a zone from its three data layers and the
//! situational modifiers in force. [`score_permit`] scores the marginal
//! risk a permit request adds to a zone. They share nothing but the
//! output type and the severity bands: each has its own weight table.

use urban_risk_config::{ExposureBase, SeverityThresholds};
use urban_risk_models::{
    ComponentKind, CorridorState, LayerFeatureSet, Modifier, ModifierKind, ObstructionKind,
    RiskScore, ScoreComponent, ScoreFormula, WeatherCondition, WorkType, ZoneFeatures,
    features::{accident, activity, injury},
};

use crate::{seasonal::SeasonalContext, severity::band_for, tracker::Conflict};

/// Component weights of the ambient zone score.
pub const AMBIENT_WEIGHTS: [(ComponentKind, f64); 3] = [
    (ComponentKind::OnSiteInjury, 0.35),
    (ComponentKind::InTransitAccident, 0.25),
    (ComponentKind::RealTimeExposure, 0.40),
];

/// Component weights of the permit marginal score.
pub const PERMIT_WEIGHTS: [(ComponentKind, f64); 5] = [
    (ComponentKind::Coactivity, 0.30),
    (ComponentKind::VulnerableExposure, 0.25),
    (ComponentKind::HistoricalBaseRate, 0.20),
    (ComponentKind::CascadeEffect, 0.15),
    (ComponentKind::ZoneSaturation, 0.10),
];

const NEUTRAL: f64 = 1.0;

/// On-site injury component, 0-100.
#[must_use]
pub fn on_site_injury(layer: &LayerFeatureSet) -> f64 {
    let uri = layer.get(injury::URBAN_RISK_INDEX) * 10.0;
    let msd = (layer.get(injury::MSD_RATE_PCT) * 0.5).min(15.0);
    let trend = (layer.get(injury::TREND_PCT) * 0.2).clamp(0.0, 10.0);
    (uri + msd + trend).min(100.0)
}

/// In-transit accident component, 0-100.
#[must_use]
pub fn in_transit_accident(layer: &LayerFeatureSet) -> f64 {
    let gravity = layer.get(accident::GRAVITY_INDEX) * 30.0;
    let vulnerable = (layer.get(accident::VULNERABLE_USER_COUNT) * 0.15).min(30.0);
    let fatal = (layer.get(accident::FATAL_SERIOUS_ACCIDENTS) * 2.0).min(20.0);
    (gravity + vulnerable + fatal).min(100.0)
}

/// Real-time exposure component, 0-100.
#[must_use]
pub fn real_time_exposure(pedestrian_flow: f64, cyclist_flow: f64, active_sites: u32) -> f64 {
    let flows = ((pedestrian_flow + cyclist_flow) / 100.0).min(40.0);
    let sites = (f64::from(active_sites) * 10.0).min(30.0);
    (20.0 + flows + sites).min(100.0)
}

/// Everything the ambient formula reads for one zone.
#[derive(Debug, Clone)]
pub struct AmbientContext<'a> {
    pub features: &'a ZoneFeatures,
    /// Active worksites according to the tracker.
    pub active_sites: u32,
    /// Size of the largest coactivity cluster.
    pub cluster_size: u32,
    pub coactivity_multiplier: f64,
    pub weather: WeatherCondition,
    /// Saturated corridors crossing the zone.
    pub saturated_corridors: &'a [CorridorState],
    pub corridor_saturation_factor: f64,
    pub seasonal: &'a SeasonalContext,
}

fn weighted(weights: &[(ComponentKind, f64)], values: &[f64]) -> Vec<ScoreComponent> {
    weights
        .iter()
        .zip(values)
        .map(|(&(kind, weight), &value)| ScoreComponent::new(kind, weight, value))
        .collect()
}

fn finish(
    formula: ScoreFormula,
    components: Vec<ScoreComponent>,
    modifiers: Vec<Modifier>,
    thresholds: &SeverityThresholds,
) -> RiskScore {
    let raw: f64 = components.iter().map(|c| c.contribution).sum();
    let factor: f64 = modifiers.iter().map(|m| m.factor).product();
    let value = (raw * factor).clamp(0.0, 100.0);
    RiskScore {
        value,
        raw,
        severity: band_for(value, thresholds),
        formula,
        components,
        modifiers,
    }
}

fn seasonal_modifier(seasonal: &SeasonalContext) -> Modifier {
    Modifier {
        kind: ModifierKind::Seasonal,
        factor: seasonal.modifier,
        detail: seasonal.season.to_string(),
    }
}

/// Ambient composite score of a zone.
///
/// Modifiers are always listed in the same order, with a factor of 1.0
/// when they do not apply.
#[must_use]
pub fn score_ambient(ctx: &AmbientContext<'_>, thresholds: &SeverityThresholds) -> RiskScore {
    let flows = &ctx.features.activity;
    let components = weighted(
        &AMBIENT_WEIGHTS,
        &[
            on_site_injury(&ctx.features.injury),
            in_transit_accident(&ctx.features.accident),
            real_time_exposure(
                flows.get(activity::PEDESTRIAN_FLOW),
                flows.get(activity::CYCLIST_FLOW),
                ctx.active_sites,
            ),
        ],
    );

    let corridor = if ctx.saturated_corridors.is_empty() {
        Modifier {
            kind: ModifierKind::CorridorSaturation,
            factor: NEUTRAL,
            detail: "no saturated corridor".to_string(),
        }
    } else {
        let ids: Vec<&str> = ctx
            .saturated_corridors
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        Modifier {
            kind: ModifierKind::CorridorSaturation,
            factor: ctx.corridor_saturation_factor,
            detail: format!("saturated: {}", ids.join(", ")),
        }
    };

    let modifiers = vec![
        Modifier {
            kind: ModifierKind::Coactivity,
            factor: ctx.coactivity_multiplier,
            detail: format!("{} sites within radius", ctx.cluster_size),
        },
        Modifier {
            kind: ModifierKind::Weather,
            factor: ctx.weather.factor(),
            detail: ctx.weather.to_string(),
        },
        corridor,
        seasonal_modifier(ctx.seasonal),
    ];

    finish(ScoreFormula::Ambient, components, modifiers, thresholds)
}

/// Coactivity component of a permit, 0-100.
#[must_use]
pub fn coactivity(conflicts: &[Conflict], radius_m: f64) -> f64 {
    let count = f64::from(u32::try_from(conflicts.len()).unwrap_or(u32::MAX));
    let proximity: f64 = conflicts
        .iter()
        .filter_map(|c| c.distance_m)
        .map(|d| (radius_m - d).max(0.0) / 30.0)
        .sum();
    (count * 25.0 + proximity).min(100.0)
}

/// Vulnerable-user exposure component of a permit, 0-100.
#[must_use]
pub fn vulnerable_exposure(
    exposure: &ExposureBase,
    pedestrians: bool,
    cyclists: bool,
    transit: bool,
    conflicts: u32,
    density_factor: f64,
) -> f64 {
    let flag = |on: bool, base: f64| if on { base } else { 0.0 };
    let base = flag(pedestrians, exposure.pedestrians)
        + flag(cyclists, exposure.cyclists)
        + flag(transit, exposure.transit);
    let exposed = base * 0.3f64.mul_add(f64::from(conflicts), 1.0) * density_factor;
    (exposed / 20.0).min(100.0)
}

/// Historical base-rate component of a permit, 0-100.
#[must_use]
pub fn historical_base_rate(features: &ZoneFeatures) -> f64 {
    let uri = features.injury.get(injury::URBAN_RISK_INDEX);
    let accidents = features.accident.get(accident::ACCIDENT_COUNT);
    uri.mul_add(8.0, accidents * 2.0).min(100.0)
}

/// Cascade (network effect) component of a permit, 0-100.
#[must_use]
pub fn cascade_effect(
    work_type: WorkType,
    obstruction: ObstructionKind,
    duration_days: u32,
) -> f64 {
    let weights = work_type.cascade_weight() + obstruction.risk_weight();
    weights.mul_add(5.0, f64::from(duration_days)).min(100.0)
}

/// Zone saturation component of a permit, 0-100.
#[must_use]
pub fn zone_saturation(ratio: f64) -> f64 {
    (ratio * 100.0).clamp(0.0, 100.0)
}

/// Everything the permit formula reads for one request.
#[derive(Debug, Clone)]
pub struct PermitContext<'a> {
    pub work_type: WorkType,
    pub obstruction: ObstructionKind,
    pub duration_days: u32,
    pub affects_pedestrians: bool,
    pub affects_cyclists: bool,
    pub affects_transit: bool,
    pub features: &'a ZoneFeatures,
    pub conflicts: &'a [Conflict],
    pub radius_m: f64,
    pub exposure: &'a ExposureBase,
    pub density_factor: f64,
    /// Active sites over zone capacity.
    pub saturation_ratio: f64,
    pub seasonal: &'a SeasonalContext,
}

/// Marginal risk score of a permit request.
#[must_use]
pub fn score_permit(ctx: &PermitContext<'_>, thresholds: &SeverityThresholds) -> RiskScore {
    let conflicts = u32::try_from(ctx.conflicts.len()).unwrap_or(u32::MAX);
    let components = weighted(
        &PERMIT_WEIGHTS,
        &[
            coactivity(ctx.conflicts, ctx.radius_m),
            vulnerable_exposure(
                ctx.exposure,
                ctx.affects_pedestrians,
                ctx.affects_cyclists,
                ctx.affects_transit,
                conflicts,
                ctx.density_factor,
            ),
            historical_base_rate(ctx.features),
            cascade_effect(ctx.work_type, ctx.obstruction, ctx.duration_days),
            zone_saturation(ctx.saturation_ratio),
        ],
    );
    finish(
        ScoreFormula::Permit,
        components,
        vec![seasonal_modifier(ctx.seasonal)],
        thresholds,
    )
}
