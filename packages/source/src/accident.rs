//! Roadway work-zone accident layer.
//!
//! Each record is one police-reported accident in a work zone:
//!
//! ```json
//! {"gravity": "Mortel ou grave", "pedestrian": "O", "cyclist": "N", "heavy_vehicle": false}
//! ```

use serde_json::Value;
use urban_risk_models::{
    FeatureLayer, LayerFeatureSet,
    features::accident::{
        ACCIDENT_COUNT, CYCLIST_ACCIDENTS, FATAL_SERIOUS_ACCIDENTS, GRAVITY_INDEX,
        HEAVY_VEHICLE_ACCIDENTS, PEDESTRIAN_ACCIDENTS, VULNERABLE_USER_COUNT,
    },
};

use crate::{
    parsing::{FieldError, fold_label, get_flag, get_str},
    quality::DataQualityReport,
};

/// Reported gravity of an accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    FatalOrSerious,
    Minor,
    PropertyDamage,
    BelowThreshold,
    Unknown,
}

impl Gravity {
    /// Classifies a gravity label (French or English).
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let folded = fold_label(label);
        let has = |needles: &[&str]| needles.iter().any(|n| folded.contains(n));
        if has(&["MORTEL", "GRAVE", "FATAL", "SERIOUS"]) {
            Self::FatalOrSerious
        } else if has(&["LEGER", "MINOR", "LIGHT"]) {
            Self::Minor
        } else if has(&["SEUIL", "BELOW", "THRESHOLD"]) {
            Self::BelowThreshold
        } else if has(&["DOMMAGES", "PROPERTY"]) {
            Self::PropertyDamage
        } else {
            Self::Unknown
        }
    }

    /// Scoring weight of the gravity.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::FatalOrSerious => 10.0,
            Self::Minor => 5.0,
            Self::PropertyDamage | Self::Unknown => 1.0,
            Self::BelowThreshold => 0.5,
        }
    }
}

struct AccidentRecord {
    gravity: Gravity,
    pedestrian: bool,
    cyclist: bool,
    heavy_vehicle: bool,
}

fn parse(record: &Value) -> Result<AccidentRecord, FieldError> {
    if !record.is_object() {
        return Err(FieldError::NotAnObject);
    }
    Ok(AccidentRecord {
        gravity: get_str(record, "gravity")?.map_or(Gravity::Unknown, Gravity::from_label),
        pedestrian: get_flag(record, "pedestrian")?.unwrap_or(false),
        cyclist: get_flag(record, "cyclist")?.unwrap_or(false),
        heavy_vehicle: get_flag(record, "heavy_vehicle")?.unwrap_or(false),
    })
}

/// Computes the accident-layer feature set of a zone.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn normalize(
    zone: &str,
    source: &str,
    records: &[Value],
    report: &mut DataQualityReport,
) -> LayerFeatureSet {
    let mut set = LayerFeatureSet::new(zone, FeatureLayer::Accident, source);
    let mut gravity_sum = 0.0;
    let (mut pedestrian, mut cyclist, mut fatal, mut heavy) = (0_u32, 0_u32, 0_u32, 0_u32);

    for (index, raw) in records.iter().enumerate() {
        match parse(raw) {
            Ok(record) => {
                set.records += 1;
                gravity_sum += record.gravity.weight();
                pedestrian += u32::from(record.pedestrian);
                cyclist += u32::from(record.cyclist);
                heavy += u32::from(record.heavy_vehicle);
                fatal += u32::from(record.gravity == Gravity::FatalOrSerious);
            }
            Err(e) => report.push(FeatureLayer::Accident, index, e.to_string()),
        }
    }

    let count = set.records as f64;
    set.set(ACCIDENT_COUNT, count);
    set.set(
        GRAVITY_INDEX,
        if set.records > 0 { gravity_sum / count } else { 0.0 },
    );
    set.set(PEDESTRIAN_ACCIDENTS, f64::from(pedestrian));
    set.set(CYCLIST_ACCIDENTS, f64::from(cyclist));
    set.set(VULNERABLE_USER_COUNT, f64::from(pedestrian + cyclist));
    set.set(FATAL_SERIOUS_ACCIDENTS, f64::from(fatal));
    set.set(HEAVY_VEHICLE_ACCIDENTS, f64::from(heavy));
    set
}
