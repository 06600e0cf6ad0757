#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Composite risk scoring and permit decisions for construction zones.
//!
//! [`RiskEngine`] ties the pieces together: it reads a
//! [`TerritorySnapshot`] from a [`SnapshotStore`], scores zones with the
//! ambient formula and raises band-crossing alerts, evaluates permit
//! requests with the permit formula and its condition rules, and runs
//! what-if simulations. Every computation works on the snapshot it read,
//! so the engine can be shared across threads while the store is
//! refreshed.

pub mod permit;
pub mod scorer;
pub mod seasonal;
pub mod severity;
pub mod simulator;
pub mod store;
pub mod tracker;

use std::{collections::BTreeMap, sync::Arc};

use serde::Serialize;
use urban_risk_config::{ConfigError, RiskConfig};
use urban_risk_models::{
    Alert, EvaluationResult, FeatureLayer, PermitRequest, RiskScore, ScenarioSet,
    SeverityResult, SimulationParams, Zone, ZoneFeatures,
    features::activity::{CYCLIST_FLOW, PEDESTRIAN_FLOW},
};
use urban_risk_source::DataQualityReport;

pub use seasonal::{SeasonalContext, SeasonalProvider};
pub use store::{InMemoryStore, SnapshotStore, StoreError, TerritorySnapshot, ZoneInputs};
pub use tracker::{
    CapacityTracker, CoactivityCluster, Conflict, SiteEvent, TerritoryReport, TrackerSnapshot,
    ZoneUtilization,
};

/// Errors that can occur while scoring or evaluating.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The zone is not in the configuration table.
    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    /// The corridor is not in the configuration table.
    #[error("Unknown corridor: {0}")]
    UnknownCorridor(String),

    /// A numeric input is out of range or not finite.
    #[error("Invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// The snapshot store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The configuration table is unusable.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

/// Result of scoring one zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneAssessment {
    /// Updated scoring state, as written to the store.
    pub zone: Zone,
    pub score: RiskScore,
    /// Band-crossing alert, when the band changed.
    pub alert: Option<Alert>,
    /// Coactive worksite groups in the zone, largest first.
    pub clusters: Vec<CoactivityCluster>,
    /// Records skipped while normalizing the zone's inputs.
    pub quality: DataQualityReport,
    /// Share of the three data layers that had records, 0-1.
    pub confidence: f64,
    /// Provenance of each layer that had records.
    pub sources: BTreeMap<FeatureLayer, String>,
}

/// Shared entry point for scoring, permit evaluation and simulation.
#[derive(Debug)]
pub struct RiskEngine<S: SnapshotStore = InMemoryStore> {
    config: Arc<RiskConfig>,
    seasons: SeasonalProvider,
    store: S,
}

impl<S: SnapshotStore> RiskEngine<S> {
    /// Creates an engine over a store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if the season table does not
    /// cover every month exactly once.
    pub fn new(config: impl Into<Arc<RiskConfig>>, store: S) -> Result<Self, EngineError> {
        let config = config.into();
        let seasons = SeasonalProvider::new(&config.seasons)?;
        log::debug!("Risk engine ready with configuration {}", config.version);
        Ok(Self {
            config,
            seasons,
            store,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn ambient(
        &self,
        zone: &str,
        snapshot: &TerritorySnapshot,
    ) -> (RiskScore, u32, ZoneFeatures) {
        let features = snapshot
            .zones
            .get(zone)
            .map_or_else(|| ZoneFeatures::empty(zone), |inputs| inputs.features.clone());
        let weather = snapshot
            .zones
            .get(zone)
            .map(|inputs| inputs.weather)
            .unwrap_or_default();
        let tracker = &snapshot.tracker;
        let active_sites = tracker.zone_saturation(zone).active;
        let saturated = tracker.saturated_corridors_in(zone);
        let seasonal = self.seasons.for_date(snapshot.as_of);

        let score = scorer::score_ambient(
            &scorer::AmbientContext {
                features: &features,
                active_sites,
                cluster_size: tracker.largest_cluster(zone),
                coactivity_multiplier: tracker.coactivity_multiplier(zone),
                weather,
                saturated_corridors: &saturated,
                corridor_saturation_factor: self.config.scoring.corridor_saturation_factor,
                seasonal: &seasonal,
            },
            &self.config.severity,
        );
        (score, active_sites, features)
    }

    /// Scores a zone, persists the result and raises an alert if its band
    /// differs from the one the write replaced.
    ///
    /// # Errors
    ///
    /// * [`EngineError::UnknownZone`] if the zone is not configured
    /// * [`EngineError::Store`] if the snapshot cannot be read or the
    ///   result cannot be written
    pub fn score_zone(&self, zone: &str) -> Result<ZoneAssessment, EngineError> {
        let profile = self
            .config
            .zone(zone)
            .ok_or_else(|| EngineError::UnknownZone(zone.to_string()))?;
        let snapshot = self.store.read_snapshot()?;
        let (score, active_sites, features) = self.ambient(&profile.code, &snapshot);

        let quality = snapshot
            .zones
            .get(&profile.code)
            .map(|inputs| inputs.quality.clone())
            .unwrap_or_default();
        let present = features.layers_present();
        let sources = present
            .iter()
            .map(|layer| (*layer, urban_risk_source::layer(&features, *layer).source.clone()))
            .collect();
        #[allow(clippy::cast_precision_loss)]
        let confidence = present.len() as f64 / FeatureLayer::all().len() as f64;

        let updated = Zone {
            code: profile.code.clone(),
            name: profile.name.clone(),
            centroid: profile.centroid,
            radius_m: profile.radius_m,
            active_sites,
            pedestrian_flow: features.activity.get(PEDESTRIAN_FLOW),
            cyclist_flow: features.activity.get(CYCLIST_FLOW),
            last_score: Some(score.value),
            severity: Some(score.severity),
            updated_at: Some(snapshot.taken_at),
        };
        let previous = self.store.write_score(&updated)?;
        let alert = severity::detect_crossing(
            &profile.code,
            score.value,
            score.severity,
            previous,
            snapshot.taken_at,
        );
        if let Some(alert) = &alert {
            self.store.write_alert(alert)?;
        }

        if !quality.is_clean() {
            log::warn!(
                "Zone {} scored with {} skipped records",
                profile.code,
                quality.count()
            );
        }
        log::info!(
            "Zone {} scored {:.1} ({}), confidence {:.2}",
            profile.code,
            score.value,
            score.severity,
            confidence
        );

        Ok(ZoneAssessment {
            clusters: snapshot.tracker.coactivity_clusters(&profile.code),
            zone: updated,
            score,
            alert,
            quality,
            confidence,
            sources,
        })
    }

    /// Evaluates a permit request against the current snapshot.
    ///
    /// # Errors
    ///
    /// * [`EngineError::UnknownZone`] if the request's zone is not
    ///   configured
    /// * [`EngineError::Store`] if the snapshot cannot be read
    pub fn evaluate_permit(
        &self,
        request: &PermitRequest,
    ) -> Result<EvaluationResult, EngineError> {
        let snapshot = self.store.read_snapshot()?;
        let empty = ZoneFeatures::empty(&request.zone);
        let features = snapshot
            .zones
            .get(&request.zone)
            .map_or(&empty, |inputs| &inputs.features);
        permit::evaluate(
            request,
            features,
            &snapshot.tracker,
            &self.seasons,
            &self.config,
        )
    }

    /// Runs the what-if scenarios for explicit parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameter`] for negative or non-finite
    /// inputs.
    pub fn simulate(&self, params: &SimulationParams) -> Result<ScenarioSet, EngineError> {
        simulator::simulate(params, &self.config.coactivity, &self.config.simulation)
    }

    /// Runs the what-if scenarios for a permit request, reading the zone's
    /// ambient score, activity and flows from the current snapshot.
    ///
    /// # Errors
    ///
    /// * [`EngineError::UnknownZone`] if the request's zone is not
    ///   configured
    /// * [`EngineError::Store`] if the snapshot cannot be read
    pub fn simulate_permit(&self, request: &PermitRequest) -> Result<ScenarioSet, EngineError> {
        let profile = self
            .config
            .zone(&request.zone)
            .ok_or_else(|| EngineError::UnknownZone(request.zone.clone()))?;
        let snapshot = self.store.read_snapshot()?;
        let (score, active_sites, features) = self.ambient(&profile.code, &snapshot);
        self.simulate(&SimulationParams {
            ambient_score: score.value,
            active_sites,
            pedestrian_flow: features.activity.get(PEDESTRIAN_FLOW),
            cyclist_flow: features.activity.get(CYCLIST_FLOW),
            work_type: request.work_type,
            obstruction: request.obstruction,
            duration_days: request.duration_days,
            affects_pedestrians: request.affects_pedestrians,
            affects_cyclists: request.affects_cyclists,
        })
    }

    /// Classifies a score into its band.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameter`] if the score is not within
    /// 0-100.
    pub fn classify(&self, score: f64) -> Result<SeverityResult, EngineError> {
        if !(0.0..=100.0).contains(&score) {
            return Err(EngineError::InvalidParameter {
                name: "score",
                value: score,
            });
        }
        Ok(severity::classify(score, &self.config.severity))
    }

    /// Capacity overview of every configured zone and corridor, with the
    /// seasonal constraints of the snapshot date.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if the snapshot cannot be read.
    pub fn territory_report(&self) -> Result<TerritoryReport, EngineError> {
        let snapshot = self.store.read_snapshot()?;
        let season = self.seasons.for_date(snapshot.as_of);
        Ok(snapshot.tracker.territory_report(&season))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use serde_json::json;
    use urban_risk_models::{
        ObstructionKind, Recommendation, SeverityBand, UtilizationStatus, WorkType,
        features::activity::ACTIVE_SITES,
    };
    use urban_risk_source::RawTerritory;

    use super::*;

    fn config() -> RiskConfig {
        RiskConfig::embedded().unwrap()
    }

    fn territory() -> RawTerritory {
        let worksites: Vec<_> = (0..12)
            .map(|i| {
                json!({"type": "worksite", "id": format!("VM-{i}"), "street": "rue Ontario",
                       "work_type": "Réfection de chaussée",
                       "start": "2025-06-01", "end": "2025-06-30",
                       "lat": 45.5000 + 0.0004 * f64::from(i), "lng": -73.5700})
            })
            .collect();
        let mut activity = vec![json!({"type": "counter", "pedestrians": 4000, "cyclists": 800})];
        activity.extend(worksites);
        serde_json::from_value(json!({
            "asOf": "2025-06-15",
            "takenAt": "2025-06-15T08:00:00Z",
            "zones": {
                "VM": {
                    "injuries": [
                        {"kind": "ACCIDENT DE LA ROUTE", "msd": "NON", "year": 2022},
                        {"kind": "FRAPPE PAR UN OBJET", "msd": "OUI", "year": 2024}
                    ],
                    "accidents": [
                        {"gravity": "Grave", "pedestrian": true},
                        {"gravity": "Léger", "cyclist": true},
                        "not a record"
                    ],
                    "activity": activity,
                    "weather": "rain"
                },
                "ANJ": {}
            },
            "previousBands": {"VM": "YELLOW"}
        }))
        .unwrap()
    }

    fn engine() -> RiskEngine {
        let config = config();
        let store = InMemoryStore::from_territory(&config, &territory()).unwrap();
        RiskEngine::new(config, store).unwrap()
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        const fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RiskEngine>();
    }

    #[test]
    fn scoring_a_busy_zone_escalates_and_persists() {
        let engine = engine();
        let assessment = engine.score_zone("VM").unwrap();

        assert!(assessment.score.value >= 0.0 && assessment.score.value <= 100.0);
        assert!(assessment.score.severity > SeverityBand::Yellow);
        assert_eq!(assessment.zone.active_sites, 12);
        assert!((assessment.confidence - 1.0).abs() < 1e-9);
        assert_eq!(assessment.quality.count(), 1);
        assert_eq!(assessment.sources[&FeatureLayer::Accident], "saaq");

        let alert = assessment.alert.as_ref().unwrap();
        assert_eq!(alert.previous, SeverityBand::Yellow);
        assert!(alert.is_escalation());
        assert!(alert.requires_human_review);

        // twelve sites 44 m apart all fall within 300 m of VM-5
        let cluster = &assessment.clusters[0];
        assert_eq!(cluster.members.len(), 12);
        assert_eq!(cluster.anchor, "VM-5");
        assert_eq!(cluster.streets, vec!["rue Ontario".to_string()]);
        assert!((cluster.multiplier - 2.0).abs() < f64::EPSILON);

        let stored = engine.store().alerts().unwrap();
        assert_eq!(stored.len(), 1);
        let zones = engine.store().zones().unwrap();
        let vm = zones.iter().find(|z| z.code == "VM").unwrap();
        assert_eq!(vm.severity, Some(assessment.score.severity));
    }

    #[test]
    fn rescoring_an_unchanged_zone_is_idempotent() {
        let engine = engine();
        let first = engine.score_zone("VM").unwrap();
        let second = engine.score_zone("VM").unwrap();
        assert!((first.score.value - second.score.value).abs() < f64::EPSILON);
        assert_eq!(first.score, second.score);
        assert!(second.alert.is_none());
        assert_eq!(engine.store().alerts().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_scoring_raises_one_alert_per_crossing() {
        let engine = engine();
        let assessments: Vec<ZoneAssessment> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| scope.spawn(|| engine.score_zone("VM").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(assessments[0].score, assessments[1].score);
        assert_eq!(assessments.iter().filter(|a| a.alert.is_some()).count(), 1);
        let alerts = engine.store().alerts().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].previous, SeverityBand::Yellow);
    }

    #[test]
    fn territory_report_reads_the_store_snapshot() {
        let engine = engine();
        let report = engine.territory_report().unwrap();
        assert_eq!(report.as_of, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
        assert_eq!(report.zones.len(), config().zones.len());
        let vm = report.zones.iter().find(|z| z.zone == "VM").unwrap();
        assert_eq!(vm.saturation.active, 12);
        assert_eq!(vm.status, UtilizationStatus::Busy);
        assert_eq!(report.saturated_zones, 0);
        assert_eq!(report.seasonal_constraints.len(), 4);
    }

    #[test]
    fn zone_without_records_scores_with_zero_confidence() {
        let engine = engine();
        let assessment = engine.score_zone("ANJ").unwrap();
        assert!(assessment.confidence.abs() < f64::EPSILON);
        assert!(assessment.sources.is_empty());
        assert_eq!(assessment.score.severity, SeverityBand::Green);
        assert!(assessment.alert.is_none());
    }

    #[test]
    fn tracker_is_authoritative_for_active_sites() {
        let engine = engine();
        let snapshot = engine.store().read_snapshot().unwrap();
        let features = &snapshot.zones["VM"].features;
        assert!((features.activity.get(ACTIVE_SITES) - 12.0).abs() < 1e-9);

        engine
            .store()
            .apply(SiteEvent::Remove {
                id: "VM-0".to_string(),
            })
            .unwrap();
        assert_eq!(engine.score_zone("VM").unwrap().zone.active_sites, 11);
    }

    #[test]
    fn unknown_zone_is_an_error() {
        let engine = engine();
        assert!(matches!(
            engine.score_zone("ATLANTIS"),
            Err(EngineError::UnknownZone(zone)) if zone == "ATLANTIS"
        ));
    }

    #[test]
    fn evaluates_permit_against_store_snapshot() {
        let engine = engine();
        let request = PermitRequest {
            permit_id: "P-2025-0042".to_string(),
            street: "rue Sainte-Catherine Est".to_string(),
            zone: "VM".to_string(),
            work_type: WorkType::Aqueduct,
            obstruction: ObstructionKind::FullClosure,
            duration_days: 45,
            affects_pedestrians: true,
            affects_cyclists: false,
            affects_transit: false,
            start_date: Some(NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()),
            coordinates: None,
            urgent: false,
        };
        let first = engine.evaluate_permit(&request).unwrap();
        assert_eq!(first.recommendation, Recommendation::Defer);
        assert!(first.requires_human_review);
        assert_eq!(first.corridor_hit.as_ref().unwrap().id, "COR-STC");
        assert!(first.optimal_window.is_some());
        assert_eq!(first, engine.evaluate_permit(&request).unwrap());

        let scenarios = engine.simulate_permit(&request).unwrap();
        assert!(scenarios.with_construction.score >= scenarios.baseline.score);
        assert_eq!(scenarios.baseline.active_sites, 12);
    }

    #[test]
    fn classify_rejects_out_of_range_scores() {
        let engine = engine();
        assert_eq!(engine.classify(66.0).unwrap().band, SeverityBand::Orange);
        for bad in [-0.1, 100.1, f64::NAN] {
            assert!(matches!(
                engine.classify(bad),
                Err(EngineError::InvalidParameter { name: "score", .. })
            ));
        }
    }

    #[test]
    fn first_score_is_compared_against_green() {
        let config = config();
        let store = InMemoryStore::new(
            &config,
            NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            Utc::now(),
        );
        let engine = RiskEngine::new(config, store).unwrap();
        assert!(engine.score_zone("IBS").unwrap().alert.is_none());
    }
}
