//! Capacity and coactivity tracking.
//!
//! The [`CapacityTracker`] holds every known worksite and is mutated only
//! through [`SiteEvent`]s by a single writer. Scoring never reads the
//! tracker directly: it works on a [`TrackerSnapshot`] taken at an as-of
//! date, so a refresh arriving mid-evaluation cannot change the result.

use std::{collections::BTreeMap, sync::Arc};

use chrono::NaiveDate;
use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};
use urban_risk_config::{CoactivityConfig, RiskConfig};
use urban_risk_models::{
    Coordinates, Corridor, CorridorState, CorridorStatus, UtilizationStatus, Worksite,
};

use crate::seasonal::SeasonalContext;

/// Great-circle distance in meters.
#[must_use]
pub fn distance_m(a: Coordinates, b: Coordinates) -> f64 {
    Haversine.distance(Point::new(a.lng, a.lat), Point::new(b.lng, b.lat))
}

/// A change to the set of known worksites.
#[derive(Debug, Clone, PartialEq)]
pub enum SiteEvent {
    /// Adds a worksite or replaces the one with the same id.
    Upsert(Worksite),
    /// Removes a worksite by id.
    Remove { id: String },
}

#[derive(Debug)]
struct TrackerLimits {
    capacities: BTreeMap<String, u32>,
    default_capacity: u32,
    corridors: Vec<Corridor>,
    coactivity: CoactivityConfig,
}

/// Single-writer registry of worksites.
#[derive(Debug, Clone)]
pub struct CapacityTracker {
    limits: Arc<TrackerLimits>,
    sites: BTreeMap<String, Worksite>,
}

impl CapacityTracker {
    /// Creates an empty tracker with the capacities and corridors of
    /// `config`.
    #[must_use]
    pub fn new(config: &RiskConfig) -> Self {
        let capacities = config
            .zones
            .iter()
            .map(|z| (z.code.clone(), z.capacity))
            .collect();
        Self {
            limits: Arc::new(TrackerLimits {
                capacities,
                default_capacity: config.permit.default_capacity,
                corridors: config.corridors.clone(),
                coactivity: config.coactivity.clone(),
            }),
            sites: BTreeMap::new(),
        }
    }

    /// Applies one event.
    pub fn apply(&mut self, event: SiteEvent) {
        match event {
            SiteEvent::Upsert(site) => {
                log::trace!("Upsert worksite {} in {}", site.id, site.zone);
                self.sites.insert(site.id.clone(), site);
            }
            SiteEvent::Remove { id } => {
                if self.sites.remove(&id).is_none() {
                    log::debug!("Remove of unknown worksite {id} ignored");
                }
            }
        }
    }

    /// Ids of the worksites currently attributed to a zone.
    #[must_use]
    pub fn site_ids_in(&self, zone: &str) -> Vec<String> {
        self.sites
            .values()
            .filter(|s| s.zone == zone)
            .map(|s| s.id.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Immutable view of the tracker as of a date.
    #[must_use]
    pub fn snapshot(&self, as_of: NaiveDate) -> TrackerSnapshot {
        TrackerSnapshot {
            as_of,
            limits: Arc::clone(&self.limits),
            sites: self.sites.values().cloned().collect(),
        }
    }
}

/// Active worksites of a zone against its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Saturation {
    pub active: u32,
    pub planned: u32,
    pub capacity: u32,
    /// `active / capacity`, unclamped.
    pub ratio: f64,
}

impl Saturation {
    /// Ratio as a percentage clamped to 0-100 for display.
    #[must_use]
    pub fn display_pct(&self) -> f64 {
        (self.ratio * 100.0).clamp(0.0, 100.0)
    }
}

/// Active worksites lying within the coactivity radius of an anchor site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoactivityCluster {
    /// Site the cluster is centred on.
    pub anchor: String,
    /// Member site ids, anchor included, sorted.
    pub members: Vec<String>,
    /// Streets of the members, deduplicated.
    pub streets: Vec<String>,
    pub multiplier: f64,
}

/// Point-in-time view of worksite occupancy.
#[derive(Debug, Clone)]
pub struct TrackerSnapshot {
    as_of: NaiveDate,
    limits: Arc<TrackerLimits>,
    sites: Vec<Worksite>,
}

impl TrackerSnapshot {
    #[must_use]
    pub const fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Coactivity radius in meters.
    #[must_use]
    pub fn radius_m(&self) -> f64 {
        self.limits.coactivity.radius_m
    }

    /// Coactivity multiplier for a cluster of `sites`.
    #[must_use]
    pub fn multiplier_for(&self, sites: u32) -> f64 {
        self.limits.coactivity.multiplier(sites)
    }

    /// Every worksite attributed to a zone, dated or not.
    pub fn zone_sites<'a>(&'a self, zone: &'a str) -> impl Iterator<Item = &'a Worksite> + 'a {
        self.sites.iter().filter(move |s| s.zone == zone)
    }

    /// Worksites of a zone underway on the as-of date.
    #[must_use]
    pub fn active_sites<'a>(&'a self, zone: &'a str) -> Vec<&'a Worksite> {
        self.zone_sites(zone)
            .filter(|s| s.is_active_on(self.as_of))
            .collect()
    }

    #[must_use]
    pub fn zone_saturation(&self, zone: &str) -> Saturation {
        let active = count(self.zone_sites(zone).filter(|s| s.is_active_on(self.as_of)));
        let planned = count(self.zone_sites(zone).filter(|s| s.is_planned_on(self.as_of)));
        let capacity = self
            .limits
            .capacities
            .get(zone)
            .copied()
            .unwrap_or(self.limits.default_capacity);
        Saturation {
            active,
            planned,
            capacity,
            ratio: f64::from(active) / f64::from(capacity.max(1)),
        }
    }

    fn corridor_state(&self, corridor: &Corridor) -> CorridorState {
        let on_corridor = self.sites.iter().filter(|s| corridor.matches(&s.street));
        let (mut occupancy, mut planned) = (0, 0);
        for site in on_corridor {
            if site.is_active_on(self.as_of) {
                occupancy += 1;
            } else if site.is_planned_on(self.as_of) {
                planned += 1;
            }
        }
        CorridorState {
            id: corridor.id.clone(),
            name: corridor.name.clone(),
            category: corridor.category,
            priority: corridor.priority,
            capacity: corridor.capacity,
            occupancy,
            planned,
            status: CorridorStatus::from_occupancy(occupancy, corridor.capacity),
        }
    }

    /// Occupancy of a corridor, or `None` if it is not configured.
    #[must_use]
    pub fn corridor_status(&self, id: &str) -> Option<CorridorState> {
        self.limits
            .corridors
            .iter()
            .find(|c| c.id == id)
            .map(|c| self.corridor_state(c))
    }

    /// Occupancy of every configured corridor, in table order.
    #[must_use]
    pub fn corridor_states(&self) -> Vec<CorridorState> {
        self.limits
            .corridors
            .iter()
            .map(|c| self.corridor_state(c))
            .collect()
    }

    /// Saturated corridors crossing a zone.
    #[must_use]
    pub fn saturated_corridors_in(&self, zone: &str) -> Vec<CorridorState> {
        self.limits
            .corridors
            .iter()
            .filter(|c| c.crosses(zone))
            .map(|c| self.corridor_state(c))
            .filter(|state| state.status == CorridorStatus::Saturated)
            .collect()
    }

    /// Clusters of two or more active, geolocated worksites of a zone,
    /// largest first.
    #[must_use]
    pub fn coactivity_clusters(&self, zone: &str) -> Vec<CoactivityCluster> {
        let located: Vec<(&Worksite, Coordinates)> = self
            .active_sites(zone)
            .into_iter()
            .filter_map(|s| s.coordinates.map(|c| (s, c)))
            .collect();
        let radius = self.radius_m();

        let mut clusters: Vec<CoactivityCluster> = Vec::new();
        for (anchor, centre) in &located {
            let mut members: Vec<&Worksite> = located
                .iter()
                .filter(|(_, other)| distance_m(*centre, *other) <= radius)
                .map(|(site, _)| *site)
                .collect();
            if members.len() < 2 {
                continue;
            }
            members.sort_by(|a, b| a.id.cmp(&b.id));
            let ids: Vec<String> = members.iter().map(|s| s.id.clone()).collect();
            if clusters.iter().any(|c| c.members == ids) {
                continue;
            }
            let mut streets: Vec<String> = members.iter().map(|s| s.street.clone()).collect();
            streets.sort();
            streets.dedup();
            clusters.push(CoactivityCluster {
                anchor: anchor.id.clone(),
                multiplier: self.multiplier_for(count(ids.iter())),
                members: ids,
                streets,
            });
        }
        clusters.sort_by(|a, b| {
            b.members
                .len()
                .cmp(&a.members.len())
                .then_with(|| a.anchor.cmp(&b.anchor))
        });
        clusters
    }

    /// Size of the largest group of active, geolocated worksites within
    /// the coactivity radius of a common member.
    #[must_use]
    pub fn largest_cluster(&self, zone: &str) -> u32 {
        self.coactivity_clusters(zone)
            .first()
            .map_or_else(
                || {
                    let located = self
                        .active_sites(zone)
                        .into_iter()
                        .filter(|s| s.coordinates.is_some());
                    count(located).min(1)
                },
                |c| count(c.members.iter()),
            )
    }

    /// Coactivity multiplier of a zone.
    #[must_use]
    pub fn coactivity_multiplier(&self, zone: &str) -> f64 {
        self.multiplier_for(self.largest_cluster(zone))
    }

    /// Worksites of a zone that would run alongside new work at `at`
    /// during `from..=to`.
    ///
    /// Sites active on the as-of date conflict, as do planned sites whose
    /// dates overlap the window. With a location, only geolocated sites
    /// within the coactivity radius are considered; without one, every
    /// such site in the zone is a potential conflict.
    #[must_use]
    pub fn conflicts_for(
        &self,
        zone: &str,
        at: Option<Coordinates>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<Conflict> {
        let radius = self.radius_m();
        self.zone_sites(zone)
            .filter_map(|site| {
                let active = site.is_active_on(self.as_of);
                if !active && !(site.is_planned_on(self.as_of) && site.overlaps(from, to)) {
                    return None;
                }
                let distance_m = match at {
                    Some(origin) => {
                        let d = distance_m(origin, site.coordinates?);
                        if d > radius {
                            return None;
                        }
                        Some(d)
                    }
                    None => None,
                };
                Some(Conflict {
                    site_id: site.id.clone(),
                    street: site.street.clone(),
                    distance_m,
                    active,
                })
            })
            .collect()
    }

    /// Worksites of a zone, active or not, whose dates intersect
    /// `from..=to` near `at`.
    #[must_use]
    pub fn overlapping(
        &self,
        zone: &str,
        at: Option<Coordinates>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> u32 {
        let radius = self.radius_m();
        count(self.zone_sites(zone).filter(|site| {
            site.overlaps(from, to)
                && at.is_none_or(|origin| {
                    site.coordinates
                        .is_some_and(|c| distance_m(origin, c) <= radius)
                })
        }))
    }
}

/// Capacity use of one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneUtilization {
    pub zone: String,
    pub saturation: Saturation,
    /// Active share of capacity in percent, clamped to 0-100.
    pub utilization_pct: f64,
    pub status: UtilizationStatus,
}

/// Territory-wide capacity overview as of a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryReport {
    pub as_of: NaiveDate,
    /// Every configured zone, by code.
    pub zones: Vec<ZoneUtilization>,
    pub saturated_zones: u32,
    /// Corridors with at least one active worksite, in table order.
    pub impacted_corridors: Vec<CorridorState>,
    pub seasonal_constraints: Vec<String>,
    pub recommendations: Vec<String>,
}

impl TrackerSnapshot {
    /// Utilization of every configured zone, saturated corridors and the
    /// seasonal constraints in force, with planning recommendations.
    #[must_use]
    pub fn territory_report(&self, season: &SeasonalContext) -> TerritoryReport {
        let zones: Vec<ZoneUtilization> = self
            .limits
            .capacities
            .keys()
            .map(|zone| {
                let saturation = self.zone_saturation(zone);
                ZoneUtilization {
                    zone: zone.clone(),
                    utilization_pct: saturation.display_pct(),
                    status: UtilizationStatus::from_ratio(saturation.ratio),
                    saturation,
                }
            })
            .collect();
        let impacted_corridors: Vec<CorridorState> = self
            .corridor_states()
            .into_iter()
            .filter(|state| state.occupancy > 0)
            .collect();

        let saturated: Vec<&str> = zones
            .iter()
            .filter(|z| z.status == UtilizationStatus::Saturated)
            .map(|z| z.zone.as_str())
            .collect();
        let mut recommendations = Vec::new();
        if !saturated.is_empty() {
            recommendations.push(format!(
                "Defer new permits in {}: capacity reached.",
                saturated.join(", ")
            ));
        }
        for corridor in impacted_corridors
            .iter()
            .filter(|c| c.status == CorridorStatus::Saturated)
        {
            recommendations.push(format!(
                "Corridor {} ({}) is saturated: no new worksite allowed.",
                corridor.name, corridor.category
            ));
        }
        if !season.constraints.is_empty() {
            recommendations.push(format!(
                "{} seasonal constraints in force ({}): see special conditions.",
                season.constraints.len(),
                season.season
            ));
        }
        if recommendations.is_empty() {
            recommendations
                .push("Territory within normal capacity: no particular restriction.".to_string());
        }

        log::info!(
            "Territory report {}: {} saturated zones, {} impacted corridors",
            self.as_of,
            saturated.len(),
            impacted_corridors.len()
        );

        TerritoryReport {
            as_of: self.as_of,
            saturated_zones: count(saturated.iter()),
            zones,
            impacted_corridors,
            seasonal_constraints: season.constraints.clone(),
            recommendations,
        }
    }
}

/// An existing worksite overlapping a permit request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub site_id: String,
    pub street: String,
    /// Distance from the request, when both are located.
    pub distance_m: Option<f64>,
    /// Whether the site is underway rather than planned.
    pub active: bool,
}

fn count<T>(iter: impl Iterator<Item = T>) -> u32 {
    u32::try_from(iter.count()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use urban_risk_models::{Season, WorkType};

    use super::*;

    fn config() -> RiskConfig {
        RiskConfig::embedded().unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn site(id: &str, zone: &str, street: &str, at: Option<(f64, f64)>) -> Worksite {
        Worksite {
            id: id.to_string(),
            zone: zone.to_string(),
            street: street.to_string(),
            coordinates: at.map(|(lat, lng)| Coordinates::new(lat, lng)),
            work_type: WorkType::Road,
            start: Some(day("2025-06-01")),
            end: Some(day("2025-06-30")),
        }
    }

    #[test]
    fn counts_active_and_planned_against_capacity() {
        let mut tracker = CapacityTracker::new(&config());
        for i in 0..12 {
            tracker.apply(SiteEvent::Upsert(site(&format!("S{i}"), "VM", "rue X", None)));
        }
        let mut later = site("LATER", "VM", "rue Y", None);
        later.start = Some(day("2025-08-01"));
        later.end = Some(day("2025-08-15"));
        tracker.apply(SiteEvent::Upsert(later));

        let saturation = tracker.snapshot(day("2025-06-15")).zone_saturation("VM");
        assert_eq!(saturation.active, 12);
        assert_eq!(saturation.planned, 1);
        assert_eq!(saturation.capacity, 15);
        assert!((saturation.ratio - 0.8).abs() < 1e-9);
        assert!((saturation.display_pct() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn saturation_ratio_is_unclamped_but_display_is() {
        let mut tracker = CapacityTracker::new(&config());
        for i in 0..5 {
            tracker.apply(SiteEvent::Upsert(site(&format!("S{i}"), "IBS", "rue X", None)));
        }
        let saturation = tracker.snapshot(day("2025-06-15")).zone_saturation("IBS");
        assert!(saturation.ratio > 1.0);
        assert!((saturation.display_pct() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn undated_and_finished_sites_are_not_occupancy() {
        let mut tracker = CapacityTracker::new(&config());
        let mut undated = site("U", "VM", "rue X", None);
        undated.end = None;
        tracker.apply(SiteEvent::Upsert(undated));
        tracker.apply(SiteEvent::Upsert(site("F", "VM", "rue X", None)));

        let snapshot = tracker.snapshot(day("2025-07-15"));
        assert_eq!(snapshot.zone_saturation("VM").active, 0);
        assert_eq!(snapshot.zone_saturation("VM").planned, 0);
        assert_eq!(snapshot.zone_sites("VM").count(), 2);
    }

    #[test]
    fn corridor_saturates_at_capacity() {
        let mut tracker = CapacityTracker::new(&config());
        tracker.apply(SiteEvent::Upsert(site("A", "VM", "rue Sainte-Catherine O", None)));
        let snapshot = tracker.snapshot(day("2025-06-15"));
        let state = snapshot.corridor_status("COR-STC").unwrap();
        assert_eq!(state.occupancy, 1);
        assert_eq!(state.status, CorridorStatus::Saturated);
        assert_eq!(snapshot.saturated_corridors_in("VM").len(), 1);
        assert!(snapshot.saturated_corridors_in("RPP").is_empty());

        let masson = snapshot.corridor_status("COR-MASSON").unwrap();
        assert_eq!(masson.status, CorridorStatus::Free);
        assert!(snapshot.corridor_status("COR-NOPE").is_none());
    }

    #[test]
    fn removal_frees_occupancy() {
        let mut tracker = CapacityTracker::new(&config());
        tracker.apply(SiteEvent::Upsert(site("A", "VM", "rue Sainte-Catherine O", None)));
        tracker.apply(SiteEvent::Remove { id: "A".to_string() });
        let snapshot = tracker.snapshot(day("2025-06-15"));
        assert_eq!(
            snapshot.corridor_status("COR-STC").unwrap().status,
            CorridorStatus::Free
        );
        assert!(tracker.is_empty());
    }

    #[test]
    fn coactivity_steps_with_cluster_size() {
        let mut tracker = CapacityTracker::new(&config());
        let snapshot = tracker.snapshot(day("2025-06-15"));
        assert!((snapshot.coactivity_multiplier("VM") - 1.0).abs() < f64::EPSILON);

        // roughly 50 m apart along a street
        let expected = [1.0, 1.0, 1.3, 1.5, 2.0, 2.0];
        for (i, want) in expected.iter().enumerate().skip(1) {
            let lat = 45.5000 + 0.0004 * (i as f64 - 1.0);
            tracker.apply(SiteEvent::Upsert(site(
                &format!("S{i}"),
                "VM",
                "rue X",
                Some((lat, -73.5700)),
            )));
            let got = tracker
                .snapshot(day("2025-06-15"))
                .coactivity_multiplier("VM");
            assert!((got - want).abs() < 1e-9, "{i} sites: {got} != {want}");
        }
    }

    #[test]
    fn distant_and_unlocated_sites_do_not_cluster() {
        let mut tracker = CapacityTracker::new(&config());
        tracker.apply(SiteEvent::Upsert(site("A", "VM", "rue X", Some((45.50, -73.57)))));
        tracker.apply(SiteEvent::Upsert(site("B", "VM", "rue Y", Some((45.52, -73.57)))));
        tracker.apply(SiteEvent::Upsert(site("C", "VM", "rue Z", None)));
        let snapshot = tracker.snapshot(day("2025-06-15"));
        assert!(snapshot.coactivity_clusters("VM").is_empty());
        assert_eq!(snapshot.largest_cluster("VM"), 1);
        assert_eq!(snapshot.zone_saturation("VM").active, 3);
    }

    #[test]
    fn conflicts_respect_radius_and_window() {
        let mut tracker = CapacityTracker::new(&config());
        tracker.apply(SiteEvent::Upsert(site("NEAR", "VM", "rue X", Some((45.5010, -73.57)))));
        tracker.apply(SiteEvent::Upsert(site("FAR", "VM", "rue Y", Some((45.5200, -73.57)))));
        let mut planned = site("PLANNED", "VM", "rue Z", Some((45.5005, -73.57)));
        planned.start = Some(day("2025-07-10"));
        planned.end = Some(day("2025-07-20"));
        tracker.apply(SiteEvent::Upsert(planned));
        let snapshot = tracker.snapshot(day("2025-06-15"));
        let origin = Some(Coordinates::new(45.5000, -73.57));

        let short = snapshot.conflicts_for("VM", origin, day("2025-06-15"), day("2025-06-30"));
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].site_id, "NEAR");
        assert!(short[0].active);
        assert!(short[0].distance_m.unwrap() < 150.0);

        let long = snapshot.conflicts_for("VM", origin, day("2025-06-15"), day("2025-07-31"));
        assert_eq!(long.len(), 2);

        let anywhere = snapshot.conflicts_for("VM", None, day("2025-06-15"), day("2025-06-30"));
        assert_eq!(anywhere.len(), 2);
        assert!(anywhere.iter().all(|c| c.distance_m.is_none()));
    }

    fn quiet_season() -> SeasonalContext {
        SeasonalContext {
            season: Season::Summer,
            modifier: 1.15,
            constraints: Vec::new(),
        }
    }

    #[test]
    fn territory_report_flags_saturated_zones_and_corridors() {
        let mut tracker = CapacityTracker::new(&config());
        // IBS holds 3; 14 of 15 in VM is 93%
        for i in 0..3 {
            tracker.apply(SiteEvent::Upsert(site(&format!("I{i}"), "IBS", "rue X", None)));
        }
        for i in 0..13 {
            tracker.apply(SiteEvent::Upsert(site(&format!("V{i}"), "VM", "rue X", None)));
        }
        tracker.apply(SiteEvent::Upsert(site("STC", "VM", "rue Sainte-Catherine O", None)));
        for i in 0..4 {
            tracker.apply(SiteEvent::Upsert(site(&format!("R{i}"), "RPP", "rue Y", None)));
        }

        let report = tracker
            .snapshot(day("2025-06-15"))
            .territory_report(&quiet_season());
        assert_eq!(report.zones.len(), config().zones.len());
        assert_eq!(report.saturated_zones, 2);

        let status = |code: &str| {
            report
                .zones
                .iter()
                .find(|z| z.zone == code)
                .map(|z| z.status)
                .unwrap()
        };
        assert_eq!(status("IBS"), UtilizationStatus::Saturated);
        assert_eq!(status("VM"), UtilizationStatus::Saturated);
        assert_eq!(status("OUT"), UtilizationStatus::Available);

        assert_eq!(report.impacted_corridors.len(), 1);
        assert_eq!(report.impacted_corridors[0].id, "COR-STC");
        assert_eq!(
            report.recommendations,
            vec![
                "Defer new permits in IBS, VM: capacity reached.".to_string(),
                "Corridor Sainte-Catherine (pedestrian) is saturated: no new worksite allowed."
                    .to_string(),
            ]
        );
    }

    #[test]
    fn quiet_territory_has_a_single_recommendation() {
        let tracker = CapacityTracker::new(&config());
        let report = tracker
            .snapshot(day("2025-06-15"))
            .territory_report(&quiet_season());
        assert_eq!(report.saturated_zones, 0);
        assert!(report.impacted_corridors.is_empty());
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].starts_with("Territory within normal capacity"));

        let winter = SeasonalContext {
            season: Season::Winter,
            modifier: 1.3,
            constraints: vec!["Frozen ground limits excavation".to_string()],
        };
        let report = tracker
            .snapshot(day("2025-01-15"))
            .territory_report(&winter);
        assert_eq!(report.seasonal_constraints.len(), 1);
        assert_eq!(
            report.recommendations,
            vec!["1 seasonal constraints in force (winter): see special conditions.".to_string()]
        );
    }

    #[test]
    fn haversine_distance_is_in_meters() {
        let a = Coordinates::new(45.5000, -73.5700);
        let b = Coordinates::new(45.5027, -73.5700);
        let d = distance_m(a, b);
        assert!((290.0..310.0).contains(&d), "distance {d}");
    }
}
