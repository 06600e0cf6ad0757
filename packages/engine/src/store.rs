//! Persisted zone, worksite and alert state behind a snapshot interface.
//!
//! Evaluations read one [`TerritorySnapshot`] at their start and never
//! touch the store again until they write their results, so a refresh
//! landing mid-evaluation is only visible to the next one. Writing a score
//! swaps the persisted band atomically, so concurrent scorings of a zone
//! observe each crossing exactly once.

use std::{collections::BTreeMap, sync::RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use urban_risk_config::RiskConfig;
use urban_risk_models::{Alert, SeverityBand, WeatherCondition, Zone, ZoneFeatures};
use urban_risk_source::{DataQualityReport, RawTerritory, RawZoneRecords, normalize_zone};

use crate::tracker::{CapacityTracker, SiteEvent, TrackerSnapshot};

/// Errors raised by a [`SnapshotStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A writer panicked while holding the state lock.
    #[error("Snapshot store lock poisoned")]
    Poisoned,

    /// Backend-specific failure.
    #[error("Snapshot store error: {0}")]
    Backend(String),
}

/// Normalized inputs of one zone.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneInputs {
    pub features: ZoneFeatures,
    pub quality: DataQualityReport,
    pub weather: WeatherCondition,
}

/// Immutable view of the territory taken at the start of an evaluation.
#[derive(Debug, Clone)]
pub struct TerritorySnapshot {
    /// When the underlying data was refreshed.
    pub taken_at: DateTime<Utc>,
    /// Date the activity layer describes.
    pub as_of: NaiveDate,
    /// Normalized inputs by zone code. Zones never ingested are absent.
    pub zones: BTreeMap<String, ZoneInputs>,
    /// Last persisted scoring state by zone code.
    pub scored: BTreeMap<String, Zone>,
    pub tracker: TrackerSnapshot,
}

/// Source of territory snapshots and sink for scoring results.
pub trait SnapshotStore: Send + Sync {
    /// Clones the current state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the state cannot be read.
    fn read_snapshot(&self) -> Result<TerritorySnapshot, StoreError>;

    /// Persists the latest scoring state of a zone and returns the band it
    /// replaced, read and written under one lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the state cannot be written.
    fn write_score(&self, zone: &Zone) -> Result<Option<SeverityBand>, StoreError>;

    /// Persists a band-crossing alert.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the alert cannot be written.
    fn write_alert(&self, alert: &Alert) -> Result<(), StoreError>;
}

#[derive(Debug)]
struct State {
    taken_at: DateTime<Utc>,
    as_of: NaiveDate,
    inputs: BTreeMap<String, ZoneInputs>,
    scored: BTreeMap<String, Zone>,
    tracker: CapacityTracker,
    alerts: Vec<Alert>,
}

/// [`SnapshotStore`] held in process memory.
#[derive(Debug)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    /// Creates a store with every configured zone unscored and no
    /// worksites.
    #[must_use]
    pub fn new(config: &RiskConfig, as_of: NaiveDate, taken_at: DateTime<Utc>) -> Self {
        let scored = config
            .zones
            .iter()
            .map(|profile| {
                (
                    profile.code.clone(),
                    Zone {
                        code: profile.code.clone(),
                        name: profile.name.clone(),
                        centroid: profile.centroid,
                        radius_m: profile.radius_m,
                        active_sites: 0,
                        pedestrian_flow: 0.0,
                        cyclist_flow: 0.0,
                        last_score: None,
                        severity: None,
                        updated_at: None,
                    },
                )
            })
            .collect();
        Self {
            state: RwLock::new(State {
                taken_at,
                as_of,
                inputs: BTreeMap::new(),
                scored,
                tracker: CapacityTracker::new(config),
                alerts: Vec::new(),
            }),
        }
    }

    /// Builds a store from a raw territory snapshot, seeding each zone's
    /// persisted band from the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the state lock is poisoned.
    pub fn from_territory(
        config: &RiskConfig,
        territory: &RawTerritory,
    ) -> Result<Self, StoreError> {
        let store = Self::new(config, territory.as_of, territory.timestamp());
        for (zone, raw) in &territory.zones {
            store.ingest_zone(zone, raw)?;
        }
        {
            let mut state = store.state.write().map_err(|_| StoreError::Poisoned)?;
            for (zone, band) in &territory.previous_bands {
                match state.scored.get_mut(zone) {
                    Some(scored) => scored.severity = Some(*band),
                    None => log::warn!("Ignoring persisted band for unknown zone {zone}"),
                }
            }
        }
        Ok(store)
    }

    /// Normalizes a zone's raw records and replaces its inputs and
    /// worksites.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the state lock is poisoned.
    pub fn ingest_zone(
        &self,
        zone: &str,
        raw: &RawZoneRecords,
    ) -> Result<DataQualityReport, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        let normalized = normalize_zone(zone, raw, state.as_of);

        let fresh: Vec<&str> = normalized.worksites.iter().map(|s| s.id.as_str()).collect();
        for id in state.tracker.site_ids_in(zone) {
            if !fresh.contains(&id.as_str()) {
                state.tracker.apply(SiteEvent::Remove { id });
            }
        }
        for site in &normalized.worksites {
            state.tracker.apply(SiteEvent::Upsert(site.clone()));
        }

        log::debug!(
            "Ingested zone {zone}: {} worksites, {} skipped records",
            normalized.worksites.len(),
            normalized.quality.count()
        );
        state.inputs.insert(
            zone.to_string(),
            ZoneInputs {
                features: normalized.features,
                quality: normalized.quality.clone(),
                weather: raw.weather,
            },
        );
        Ok(normalized.quality)
    }

    /// Applies a worksite refresh event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the state lock is poisoned.
    pub fn apply(&self, event: SiteEvent) -> Result<(), StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .tracker
            .apply(event);
        Ok(())
    }

    /// Moves the store's clock forward.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the state lock is poisoned.
    pub fn advance_to(
        &self,
        as_of: NaiveDate,
        taken_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        state.as_of = as_of;
        state.taken_at = taken_at;
        Ok(())
    }

    /// Every alert written so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the state lock is poisoned.
    pub fn alerts(&self) -> Result<Vec<Alert>, StoreError> {
        Ok(self
            .state
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .alerts
            .clone())
    }

    /// Persisted state of every configured zone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the state lock is poisoned.
    pub fn zones(&self) -> Result<Vec<Zone>, StoreError> {
        Ok(self
            .state
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .scored
            .values()
            .cloned()
            .collect())
    }
}

impl SnapshotStore for InMemoryStore {
    fn read_snapshot(&self) -> Result<TerritorySnapshot, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(TerritorySnapshot {
            taken_at: state.taken_at,
            as_of: state.as_of,
            zones: state.inputs.clone(),
            scored: state.scored.clone(),
            tracker: state.tracker.snapshot(state.as_of),
        })
    }

    fn write_score(&self, zone: &Zone) -> Result<Option<SeverityBand>, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        Ok(state
            .scored
            .insert(zone.code.clone(), zone.clone())
            .and_then(|previous| previous.severity))
    }

    fn write_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        state.alerts.push(alert.clone());
        Ok(())
    }
}
