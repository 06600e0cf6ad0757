//! Occupational-injury layer.
//!
//! Each record is one accepted injury claim from a construction worksite:
//!
//! ```json
//! {"kind": "FRAPPE PAR UN OBJET", "msd": "NON", "year": 2022}
//! ```

use std::collections::BTreeMap;

use serde_json::Value;
use urban_risk_models::{
    FeatureLayer, LayerFeatureSet,
    features::injury::{INJURY_COUNT, MSD_RATE_PCT, TREND_PCT, URBAN_RISK_INDEX},
};

use crate::{
    parsing::{FieldError, fold_label, get_flag, get_str, get_year},
    quality::DataQualityReport,
};

/// Urban-risk weight (0-10) of an accident kind not found in the table.
pub const DEFAULT_KIND_WEIGHT: f64 = 3.0;

/// Accident-kind fragments and how much risk each exports to the public
/// around the worksite. Checked in order; first match wins.
const KIND_WEIGHTS: &[(&str, f64)] = &[
    ("ROUTE", 10.0),
    ("ROAD", 10.0),
    ("TRAFFIC", 10.0),
    ("FRAPPE PAR", 9.0),
    ("STRUCK BY", 9.0),
    ("NIVEAU INFERIEUR", 7.0),
    ("FALL TO LOWER", 7.0),
    ("FALL FROM", 7.0),
    ("COINCE", 6.0),
    ("ECRASE", 6.0),
    ("CAUGHT", 6.0),
    ("CRUSHED", 6.0),
    ("HEURTER", 5.0),
    ("STRUCK AGAINST", 5.0),
    ("MEME NIVEAU", 4.0),
    ("SAME LEVEL", 4.0),
    ("ELECTRI", 4.0),
    ("SUBSTANCES NOCIVES", 3.0),
    ("EXPOS", 3.0),
    ("HARMFUL", 3.0),
    ("CHAUD OU FROID", 3.0),
    ("HOT OR COLD", 3.0),
    ("REACTION", 2.0),
    ("EFFORT EXCESSIF", 2.0),
    ("OVEREXERTION", 2.0),
];

/// Returns the urban-risk weight (0-10) of an accident-kind label.
#[must_use]
pub fn kind_weight(label: &str) -> f64 {
    let folded = fold_label(label);
    KIND_WEIGHTS
        .iter()
        .find(|(needle, _)| folded.contains(needle))
        .map_or(DEFAULT_KIND_WEIGHT, |(_, weight)| *weight)
}

struct InjuryRecord {
    weight: f64,
    msd: bool,
    year: Option<i32>,
}

fn parse(record: &Value) -> Result<InjuryRecord, FieldError> {
    if !record.is_object() {
        return Err(FieldError::NotAnObject);
    }
    let weight = get_str(record, "kind")?.map_or(DEFAULT_KIND_WEIGHT, kind_weight);
    let msd = get_flag(record, "msd")?.unwrap_or(false);
    let year = get_year(record, "year")?;
    Ok(InjuryRecord { weight, msd, year })
}

/// Computes the injury-layer feature set of a zone.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn normalize(
    zone: &str,
    source: &str,
    records: &[Value],
    report: &mut DataQualityReport,
) -> LayerFeatureSet {
    let mut set = LayerFeatureSet::new(zone, FeatureLayer::Injury, source);
    let mut weight_sum = 0.0;
    let mut msd = 0_usize;
    let mut by_year: BTreeMap<i32, usize> = BTreeMap::new();

    for (index, raw) in records.iter().enumerate() {
        match parse(raw) {
            Ok(record) => {
                set.records += 1;
                weight_sum += record.weight;
                if record.msd {
                    msd += 1;
                }
                if let Some(year) = record.year {
                    *by_year.entry(year).or_default() += 1;
                }
            }
            Err(e) => report.push(FeatureLayer::Injury, index, e.to_string()),
        }
    }

    let count = set.records as f64;
    set.set(INJURY_COUNT, count);
    if set.records > 0 {
        set.set(URBAN_RISK_INDEX, weight_sum / count);
        set.set(MSD_RATE_PCT, msd as f64 / count * 100.0);
    } else {
        set.set(URBAN_RISK_INDEX, 0.0);
        set.set(MSD_RATE_PCT, 0.0);
    }
    set.set(TREND_PCT, trend_pct(&by_year));
    set
}

/// Percentage change between the earliest and latest year present.
#[allow(clippy::cast_precision_loss)]
fn trend_pct(by_year: &BTreeMap<i32, usize>) -> f64 {
    match (by_year.first_key_value(), by_year.last_key_value()) {
        (Some((first_year, &first)), Some((last_year, &last)))
            if first_year != last_year && first > 0 =>
        {
            (last as f64 - first as f64) / first as f64 * 100.0
        }
        _ => 0.0,
    }
}
