//! Structural validation of configuration tables.

use std::collections::BTreeSet;

use urban_risk_models::Season;

use crate::{ConfigError, RiskConfig};

fn strictly_increasing(bounds: [f64; 3]) -> bool {
    bounds[0] > 0.0
        && bounds[0] < bounds[1]
        && bounds[1] < bounds[2]
        && bounds[2] <= 100.0
        && bounds.iter().all(|b| b.is_finite())
}

impl RiskConfig {
    /// Checks every structural invariant of the table.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_thresholds()?;
        self.validate_seasons()?;
        self.validate_zones()?;
        self.validate_corridors()?;
        self.validate_coactivity()?;
        self.validate_scoring()?;
        self.validate_simulation()
    }

    fn validate_thresholds(&self) -> Result<(), ConfigError> {
        let s = &self.severity;
        if !strictly_increasing([s.yellow, s.orange, s.red]) {
            return Err(ConfigError::OverlappingBands {
                yellow: s.yellow,
                orange: s.orange,
                red: s.red,
            });
        }

        let p = &self.permit;
        if !strictly_increasing([p.monitoring, p.conditions, p.defer]) {
            return Err(ConfigError::PermitThresholds {
                monitoring: p.monitoring,
                conditions: p.conditions,
                defer: p.defer,
            });
        }
        if !(p.saturation_condition > 0.0 && p.saturation_condition.is_finite()) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "saturation_condition must be positive, got {}",
                    p.saturation_condition
                ),
            });
        }
        if p.default_capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                id: "permit.default_capacity".to_string(),
            });
        }
        let e = &p.exposure;
        if let Some((group, base)) = [
            ("pedestrians", e.pedestrians),
            ("cyclists", e.cyclists),
            ("transit", e.transit),
        ]
        .into_iter()
        .find(|(_, base)| !(*base >= 0.0 && base.is_finite()))
        {
            return Err(ConfigError::Invalid {
                message: format!("exposure base for {group} must be non-negative, got {base}"),
            });
        }
        Ok(())
    }

    fn validate_seasons(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for def in &self.seasons {
            if !seen.insert(def.season) {
                return Err(ConfigError::DuplicateSeason(def.season));
            }
            if !(def.modifier >= 1.0 && def.modifier.is_finite()) {
                return Err(ConfigError::InvalidModifier {
                    season: def.season,
                    modifier: def.modifier,
                });
            }
            if let Some(&month) = def.months.iter().find(|m| !(1..=12).contains(*m)) {
                return Err(ConfigError::InvalidMonth {
                    season: def.season,
                    month,
                });
            }
        }

        for month in 1..=12 {
            let matches = self
                .seasons
                .iter()
                .map(|def| def.months.iter().filter(|m| **m == month).count())
                .sum::<usize>();
            if matches != 1 {
                return Err(ConfigError::SeasonCoverage { month, matches });
            }
        }

        if let Some(winter) = self.seasons.iter().find(|d| d.season == Season::Winter) {
            if let Some(higher) = self
                .seasons
                .iter()
                .find(|d| d.season != Season::Winter && d.modifier > winter.modifier)
            {
                return Err(ConfigError::WinterNotHighest {
                    season: higher.season,
                });
            }
        } else {
            return Err(ConfigError::Invalid {
                message: "no winter season defined".to_string(),
            });
        }
        Ok(())
    }

    fn validate_zones(&self) -> Result<(), ConfigError> {
        let mut codes = BTreeSet::new();
        for zone in &self.zones {
            if !codes.insert(zone.code.as_str()) {
                return Err(ConfigError::DuplicateZone(zone.code.clone()));
            }
            if zone.capacity == 0 {
                return Err(ConfigError::InvalidCapacity {
                    id: zone.code.clone(),
                });
            }
            if !(zone.density_factor > 0.0 && zone.radius_m > 0.0) {
                return Err(ConfigError::Invalid {
                    message: format!("zone {} needs a positive density and radius", zone.code),
                });
            }
        }
        Ok(())
    }

    fn validate_corridors(&self) -> Result<(), ConfigError> {
        let mut ids = BTreeSet::new();
        for corridor in &self.corridors {
            if !ids.insert(corridor.id.as_str()) {
                return Err(ConfigError::DuplicateCorridor(corridor.id.clone()));
            }
            if corridor.capacity == 0 {
                return Err(ConfigError::InvalidCapacity {
                    id: corridor.id.clone(),
                });
            }
            if corridor.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::EmptyKeywords(corridor.id.clone()));
            }
            if let Some(zone) = corridor.zones.iter().find(|z| self.zone(z).is_none()) {
                return Err(ConfigError::UnknownCorridorZone {
                    corridor: corridor.id.clone(),
                    zone: zone.clone(),
                });
            }
        }
        Ok(())
    }

    fn validate_coactivity(&self) -> Result<(), ConfigError> {
        let c = &self.coactivity;
        if !(c.radius_m > 0.0 && c.radius_m.is_finite()) {
            return Err(ConfigError::Invalid {
                message: format!("coactivity radius must be positive, got {}", c.radius_m),
            });
        }
        if let Some(step) = c
            .steps
            .iter()
            .find(|s| s.min_sites == 0 || !(s.multiplier >= 1.0 && s.multiplier.is_finite()))
        {
            return Err(ConfigError::Invalid {
                message: format!(
                    "coactivity step {} sites x{} is out of range",
                    step.min_sites, step.multiplier
                ),
            });
        }
        if let Some(pair) = c.steps.windows(2).find(|pair| {
            pair[1].min_sites <= pair[0].min_sites || pair[1].multiplier < pair[0].multiplier
        }) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "coactivity steps must increase: {} sites x{} follows {} sites x{}",
                    pair[1].min_sites, pair[1].multiplier, pair[0].min_sites, pair[0].multiplier
                ),
            });
        }
        Ok(())
    }

    fn validate_scoring(&self) -> Result<(), ConfigError> {
        let factor = self.scoring.corridor_saturation_factor;
        if !(factor >= 1.0 && factor.is_finite()) {
            return Err(ConfigError::Invalid {
                message: format!("corridor_saturation_factor must be >= 1.0, got {factor}"),
            });
        }
        Ok(())
    }

    fn validate_simulation(&self) -> Result<(), ConfigError> {
        let s = &self.simulation;
        let positive = [
            s.redirect_divisor,
            s.deferred_redirect_divisor,
            s.pedestrian_incident_rate,
            s.cyclist_incident_rate,
        ];
        let ratios = [
            s.deferred_activity_ratio,
            s.deferred_flow_ratio,
            s.deferred_ambient_ratio,
        ];
        if positive.iter().any(|v| !(*v > 0.0 && v.is_finite()))
            || ratios.iter().any(|r| !(0.0..=1.0).contains(r))
            || s.low_impact_max > s.moderate_impact_max
            || s.deferral_days == 0
        {
            return Err(ConfigError::Invalid {
                message: "simulation constants out of range".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{ConfigError, RiskConfig};

    fn table() -> String {
        include_str!("../tables/montreal.toml").to_string()
    }

    #[test]
    fn rejects_overlapping_bands() {
        let toml = table().replace("orange = 65.0", "orange = 35.0");
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::OverlappingBands { .. })
        ));
    }

    #[test]
    fn rejects_permit_thresholds_out_of_order() {
        let toml = table().replace("defer = 75.0", "defer = 50.0");
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::PermitThresholds { .. })
        ));
    }

    #[test]
    fn rejects_uncovered_month() {
        let toml = table().replace("months = [9, 10, 11]", "months = [9, 10]");
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::SeasonCoverage {
                month: 11,
                matches: 0
            })
        ));
    }

    #[test]
    fn rejects_month_in_two_seasons() {
        let toml = table().replace("months = [4, 5]", "months = [3, 4, 5]");
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::SeasonCoverage {
                month: 3,
                matches: 2
            })
        ));
    }

    #[test]
    fn rejects_modifier_below_one() {
        let toml = table().replace("modifier = 1.05", "modifier = 0.95");
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::InvalidModifier { .. })
        ));
    }

    #[test]
    fn rejects_summer_above_winter() {
        let toml = table().replace("modifier = 1.15", "modifier = 1.45");
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::WinterNotHighest { .. })
        ));
    }

    #[test]
    fn rejects_zero_capacity_zone() {
        let toml = table().replace("capacity = 15", "capacity = 0");
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_zone() {
        let toml = table().replace("code = \"OUT\"", "code = \"VM\"");
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::DuplicateZone(code)) if code == "VM"
        ));
    }

    #[test]
    fn rejects_corridor_without_keywords() {
        let toml = table().replace("keywords = [\"masson\"]", "keywords = []");
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::EmptyKeywords(id)) if id == "COR-MASSON"
        ));
    }

    #[test]
    fn rejects_corridor_in_unknown_zone() {
        let toml = table().replace("zones = [\"RPP\"]", "zones = [\"XYZ\"]");
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::UnknownCorridorZone { .. })
        ));
    }

    #[test]
    fn rejects_decreasing_coactivity_steps() {
        let toml = table().replace(
            "{ min_sites = 4, multiplier = 2.0 }",
            "{ min_sites = 4, multiplier = 1.2 }",
        );
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_saturation_factor_below_one() {
        let toml = table().replace(
            "corridor_saturation_factor = 1.1",
            "corridor_saturation_factor = 0.2",
        );
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_nan_saturation_factor() {
        let toml = table().replace(
            "corridor_saturation_factor = 1.1",
            "corridor_saturation_factor = nan",
        );
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_negative_exposure_base() {
        let toml = table().replace("pedestrians = 500.0", "pedestrians = -500.0");
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::Invalid { message }) if message.contains("pedestrians")
        ));
    }

    #[test]
    fn rejects_infinite_exposure_base() {
        let toml = table().replace("transit = 300.0", "transit = inf");
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::Invalid { message }) if message.contains("transit")
        ));
    }

    #[test]
    fn rejects_zero_deferral() {
        let toml = table().replace("deferral_days = 30", "deferral_days = 0");
        assert!(matches!(
            RiskConfig::from_toml_str(&toml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn reports_malformed_toml() {
        assert!(matches!(
            RiskConfig::from_toml_str("version = "),
            Err(ConfigError::Toml(_))
        ));
    }
}
