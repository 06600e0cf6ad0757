//! Live urban-activity layer: flow counters and worksite permits.
//!
//! ```json
//! {"type": "counter", "pedestrians": 5400, "cyclists": 1200}
//! {"type": "worksite", "id": "W-1", "street": "rue Sainte-Catherine O",
//!  "work_type": "Aqueduc", "start": "2025-05-01", "end": "2025-07-31",
//!  "lat": 45.5, "lng": -73.57}
//! ```
//!
//! Worksites without a usable start or end date are kept (so the tracker
//! can report them) but count as neither active nor planned.

use chrono::NaiveDate;
use serde_json::Value;
use urban_risk_models::{
    FeatureLayer, LayerFeatureSet, WorkType, Worksite,
    features::activity::{ACTIVE_SITES, CYCLIST_FLOW, PEDESTRIAN_FLOW, PLANNED_SITES, UNDATED_SITES},
};

use crate::{
    parsing::{FieldError, get_coordinates, get_date, get_non_negative, get_str},
    quality::DataQualityReport,
};

enum ActivityRecord {
    Counter { pedestrians: f64, cyclists: f64 },
    Worksite(Worksite),
}

fn parse_id(record: &Value) -> Result<String, FieldError> {
    match record.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        None | Some(Value::Null) => Err(FieldError::Missing("id")),
        Some(_) => Err(FieldError::WrongType {
            field: "id",
            expected: "identifier",
        }),
    }
}

fn parse(zone: &str, record: &Value) -> Result<ActivityRecord, FieldError> {
    if !record.is_object() {
        return Err(FieldError::NotAnObject);
    }
    match get_str(record, "type")? {
        Some("counter") => Ok(ActivityRecord::Counter {
            pedestrians: get_non_negative(record, "pedestrians")?.unwrap_or(0.0),
            cyclists: get_non_negative(record, "cyclists")?.unwrap_or(0.0),
        }),
        Some("worksite") => Ok(ActivityRecord::Worksite(Worksite {
            id: parse_id(record)?,
            zone: zone.to_string(),
            street: get_str(record, "street")?.unwrap_or_default().to_string(),
            coordinates: get_coordinates(record)?,
            work_type: get_str(record, "work_type")?.map_or(WorkType::Other, WorkType::from_label),
            start: get_date(record, "start"),
            end: get_date(record, "end"),
        })),
        Some(_) => Err(FieldError::WrongType {
            field: "type",
            expected: "activity type",
        }),
        None => Err(FieldError::Missing("type")),
    }
}

/// Activity features and the worksites they were computed from.
pub struct ActivityLayer {
    pub features: LayerFeatureSet,
    pub worksites: Vec<Worksite>,
}

/// Computes the activity-layer feature set of a zone as of `as_of`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn normalize(
    zone: &str,
    source: &str,
    records: &[Value],
    as_of: NaiveDate,
    report: &mut DataQualityReport,
) -> ActivityLayer {
    let mut features = LayerFeatureSet::new(zone, FeatureLayer::Activity, source);
    let mut worksites = Vec::new();
    let (mut pedestrian_flow, mut cyclist_flow) = (0.0, 0.0);

    for (index, raw) in records.iter().enumerate() {
        match parse(zone, raw) {
            Ok(ActivityRecord::Counter {
                pedestrians,
                cyclists,
            }) => {
                features.records += 1;
                pedestrian_flow += pedestrians;
                cyclist_flow += cyclists;
            }
            Ok(ActivityRecord::Worksite(site)) => {
                features.records += 1;
                worksites.push(site);
            }
            Err(e) => report.push(FeatureLayer::Activity, index, e.to_string()),
        }
    }

    let active = worksites.iter().filter(|w| w.is_active_on(as_of)).count();
    let planned = worksites.iter().filter(|w| w.is_planned_on(as_of)).count();
    let undated = worksites.iter().filter(|w| !w.is_dated()).count();

    features.set(PEDESTRIAN_FLOW, pedestrian_flow);
    features.set(CYCLIST_FLOW, cyclist_flow);
    features.set(ACTIVE_SITES, active as f64);
    features.set(PLANNED_SITES, planned as f64);
    features.set(UNDATED_SITES, undated as f64);

    ActivityLayer {
        features,
        worksites,
    }
}
