//! Shared field extraction for raw layer records.
//!
//! Records are flat JSON objects. A missing or `null` field is absent and
//! defaults downstream; a present field of an unusable type is a
//! [`FieldError`] and makes the whole record malformed.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use urban_risk_models::Coordinates;

/// Why a field could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// The record is not a JSON object.
    #[error("record is not an object")]
    NotAnObject,

    /// A required field is absent.
    #[error("missing field `{0}`")]
    Missing(&'static str),

    /// The field holds a value of the wrong type.
    #[error("field `{field}` is not a valid {expected}")]
    WrongType {
        /// Field name.
        field: &'static str,
        /// Expected type.
        expected: &'static str,
    },

    /// A count or flow is negative.
    #[error("field `{0}` is negative")]
    Negative(&'static str),
}

fn present<'a>(record: &'a Value, field: &str) -> Option<&'a Value> {
    record.get(field).filter(|v| !v.is_null())
}

/// Gets a string field.
pub fn get_str<'a>(record: &'a Value, field: &'static str) -> Result<Option<&'a str>, FieldError> {
    match present(record, field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(FieldError::WrongType {
            field,
            expected: "string",
        }),
    }
}

/// Gets a number, accepting numeric strings.
pub fn get_f64(record: &Value, field: &'static str) -> Result<Option<f64>, FieldError> {
    let wrong = FieldError::WrongType {
        field,
        expected: "number",
    };
    match present(record, field) {
        None => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or(wrong),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or(wrong),
        Some(_) => Err(wrong),
    }
}

/// Gets a non-negative number.
pub fn get_non_negative(record: &Value, field: &'static str) -> Result<Option<f64>, FieldError> {
    match get_f64(record, field)? {
        Some(v) if v < 0.0 || !v.is_finite() => Err(FieldError::Negative(field)),
        other => Ok(other),
    }
}

/// Gets a boolean flag.
///
/// Accepts JSON booleans, `0`/`1`, and the yes/no spellings used by
/// Québec open-data exports (`OUI`/`NON`, `O`/`N`, `Y`/`N`).
pub fn get_flag(record: &Value, field: &'static str) -> Result<Option<bool>, FieldError> {
    let wrong = FieldError::WrongType {
        field,
        expected: "flag",
    };
    match present(record, field) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            _ => Err(wrong),
        },
        Some(Value::String(s)) => match s.trim().to_uppercase().as_str() {
            "OUI" | "O" | "Y" | "YES" | "TRUE" | "1" => Ok(Some(true)),
            "NON" | "N" | "NO" | "FALSE" | "0" => Ok(Some(false)),
            _ => Err(wrong),
        },
        Some(_) => Err(wrong),
    }
}

/// Gets a calendar year, accepting integer numbers and numeric strings.
pub fn get_year(record: &Value, field: &'static str) -> Result<Option<i32>, FieldError> {
    let year = match present(record, field) {
        None => return Ok(None),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    year.and_then(|y| i32::try_from(y).ok())
        .filter(|y| (1900..=2200).contains(y))
        .map(Some)
        .ok_or(FieldError::WrongType {
            field,
            expected: "year",
        })
}

/// Uppercases and strips French diacritics so labels from differently
/// encoded exports compare equal.
#[must_use]
pub fn fold_label(label: &str) -> String {
    label
        .to_uppercase()
        .chars()
        .map(|c| match c {
            'À' | 'Â' | 'Ä' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Î' | 'Ï' => 'I',
            'Ô' | 'Ö' => 'O',
            'Ù' | 'Û' | 'Ü' => 'U',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Parses a date in `YYYY-MM-DD` or ISO 8601 datetime form.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.date());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.date());
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Gets a date field. Absent, non-string and unparseable values all yield
/// `None`; an undated worksite is still a usable record.
#[must_use]
pub fn get_date(record: &Value, field: &str) -> Option<NaiveDate> {
    present(record, field)?.as_str().and_then(parse_date)
}

/// Parses `lat`/`lng` fields. Returns `None` if either is missing or zero.
pub fn get_coordinates(record: &Value) -> Result<Option<Coordinates>, FieldError> {
    let lat = get_f64(record, "lat")?;
    let lng = get_f64(record, "lng")?;
    Ok(match (lat, lng) {
        (Some(lat), Some(lng)) if lat != 0.0 && lng != 0.0 => Some(Coordinates::new(lat, lng)),
        _ => None,
    })
}
