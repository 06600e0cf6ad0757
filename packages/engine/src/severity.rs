//! Severity classification and band-crossing alerts.

use chrono::{DateTime, Utc};
use urban_risk_config::SeverityThresholds;
use urban_risk_models::{Alert, SeverityBand, SeverityResult};

/// Band of a 0-100 score. Lower bounds are inclusive.
#[must_use]
pub fn band_for(score: f64, thresholds: &SeverityThresholds) -> SeverityBand {
    if score >= thresholds.red {
        SeverityBand::Red
    } else if score >= thresholds.orange {
        SeverityBand::Orange
    } else if score >= thresholds.yellow {
        SeverityBand::Yellow
    } else {
        SeverityBand::Green
    }
}

/// Classifies a score into its band, notified profiles and review flag.
#[must_use]
pub fn classify(score: f64, thresholds: &SeverityThresholds) -> SeverityResult {
    let band = band_for(score, thresholds);
    SeverityResult {
        band,
        profiles: band.target_profiles().to_vec(),
        requires_human_review: band.requires_human_review(),
    }
}

/// Compares a new observation against the last persisted band of a zone.
///
/// A zone with no persisted band is compared against green, so a first
/// score in green raises nothing and a first score above green raises an
/// escalation.
#[must_use]
pub fn detect_crossing(
    zone: &str,
    score: f64,
    current: SeverityBand,
    previous: Option<SeverityBand>,
    at: DateTime<Utc>,
) -> Option<Alert> {
    let previous = previous.unwrap_or(SeverityBand::Green);
    if current == previous {
        log::debug!("Zone {zone} remains {current} at {score:.1}");
        return None;
    }

    if current > previous {
        log::warn!("Zone {zone} escalated {previous} -> {current} at {score:.1}");
    } else {
        log::info!("Zone {zone} de-escalated {previous} -> {current} at {score:.1}");
    }

    Some(Alert {
        id: uuid::Uuid::new_v4(),
        zone: zone.to_string(),
        at,
        score,
        severity: current,
        previous,
        profiles: current.target_profiles().to_vec(),
        requires_human_review: current.requires_human_review(),
    })
}
