//! Calendar date to seasonal risk modifier.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use urban_risk_config::{ConfigError, SeasonDefinition};
use urban_risk_models::Season;

/// Season in force on a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalContext {
    pub season: Season,
    /// Multiplicative risk modifier, at least 1.0.
    pub modifier: f64,
    /// Operating constraints, in display order.
    pub constraints: Vec<String>,
}

/// Resolves dates to seasons with a month index built once at
/// construction, so lookups cannot fail.
#[derive(Debug, Clone)]
pub struct SeasonalProvider {
    definitions: Vec<SeasonDefinition>,
    /// `by_month[m]` is the index into `definitions` for zero-based month `m`.
    by_month: [usize; 12],
}

impl SeasonalProvider {
    /// Builds the month index.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SeasonCoverage`] if a month is claimed by zero
    /// or several seasons.
    pub fn new(definitions: &[SeasonDefinition]) -> Result<Self, ConfigError> {
        let mut by_month = [usize::MAX; 12];
        let mut claims = [0_usize; 12];
        for (index, def) in definitions.iter().enumerate() {
            for &month in &def.months {
                let slot = usize::try_from(month)
                    .ok()
                    .and_then(|m| m.checked_sub(1))
                    .filter(|m| *m < 12)
                    .ok_or(ConfigError::InvalidMonth {
                        season: def.season,
                        month,
                    })?;
                by_month[slot] = index;
                claims[slot] += 1;
            }
        }
        if let Some((slot, &matches)) = claims.iter().enumerate().find(|(_, c)| **c != 1) {
            return Err(ConfigError::SeasonCoverage {
                month: u32::try_from(slot + 1).unwrap_or(u32::MAX),
                matches,
            });
        }
        Ok(Self {
            definitions: definitions.to_vec(),
            by_month,
        })
    }

    fn definition(&self, date: NaiveDate) -> &SeasonDefinition {
        // month0() is always < 12 and every slot was filled in new()
        &self.definitions[self.by_month[date.month0() as usize]]
    }

    /// Season, modifier and constraints in force on `date`.
    #[must_use]
    pub fn for_date(&self, date: NaiveDate) -> SeasonalContext {
        let def = self.definition(date);
        SeasonalContext {
            season: def.season,
            modifier: def.modifier,
            constraints: def.constraints.clone(),
        }
    }

    /// Seasonal modifier on `date`.
    #[must_use]
    pub fn modifier(&self, date: NaiveDate) -> f64 {
        self.definition(date).modifier
    }
}
