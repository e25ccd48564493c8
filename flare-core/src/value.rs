//! Typed field values.

use crate::error::ValidationError;
use crate::schema::{FieldDef, FieldType};
use crate::Timestamp;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

/// A literal stored in, or compared against, a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Timestamp(Timestamp),
}

impl FieldValue {
    /// Coerce a JSON literal into the field's declared type.
    ///
    /// `null` is accepted for every type; nullability is enforced by the
    /// adapter at write time.
    pub fn from_json(field: &FieldDef, json: &JsonValue) -> Result<Self, ValidationError> {
        if json.is_null() {
            return Ok(FieldValue::Null);
        }

        let mismatch = || ValidationError::TypeMismatch {
            field: field.name.to_string(),
            expected: field.field_type,
            found: json_type_name(json).to_string(),
        };

        match field.field_type {
            FieldType::String => json
                .as_str()
                .map(|s| FieldValue::Text(s.to_string()))
                .ok_or_else(mismatch),
            FieldType::Boolean => json.as_bool().map(FieldValue::Bool).ok_or_else(mismatch),
            FieldType::Integer => {
                if let Some(n) = json.as_i64() {
                    return Ok(FieldValue::Integer(n));
                }
                match json.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(FieldValue::Integer(f as i64))
                    }
                    Some(_) => Err(ValidationError::InvalidValue {
                        field: field.name.to_string(),
                        reason: format!("{} is not an integer", json),
                    }),
                    None => Err(mismatch()),
                }
            }
            FieldType::Number => json.as_f64().map(FieldValue::Number).ok_or_else(mismatch),
            FieldType::Timestamp => {
                let raw = json.as_str().ok_or_else(mismatch)?;
                parse_timestamp(raw)
                    .map(FieldValue::Timestamp)
                    .ok_or_else(|| ValidationError::InvalidValue {
                        field: field.name.to_string(),
                        reason: format!("'{}' is not an RFC 3339 timestamp", raw),
                    })
            }
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Bool(b) => JsonValue::Bool(*b),
            FieldValue::Integer(n) => JsonValue::from(*n),
            FieldValue::Number(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            FieldValue::Text(s) => JsonValue::String(s.clone()),
            FieldValue::Timestamp(ts) => {
                JsonValue::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Compare two non-null values of compatible types.
    ///
    /// Returns `None` when either side is null or the types are unrelated,
    /// which the filter engine treats as "no match".
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Number(b)) => (*a as f64).partial_cmp(b),
            (FieldValue::Number(a), FieldValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (FieldValue::Number(a), FieldValue::Number(b)) => a.partial_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn equals(&self, other: &FieldValue) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Whether this value may be stored in a field of `field_type`.
    /// Null conforms to every type.
    pub fn conforms_to(&self, field_type: FieldType) -> bool {
        matches!(
            (field_type, self),
            (_, FieldValue::Null)
                | (FieldType::String, FieldValue::Text(_))
                | (FieldType::Boolean, FieldValue::Bool(_))
                | (FieldType::Integer, FieldValue::Integer(_))
                | (FieldType::Number, FieldValue::Integer(_) | FieldValue::Number(_))
                | (FieldType::Timestamp, FieldValue::Timestamp(_))
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Integer(_) => "integer",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "string",
            FieldValue::Timestamp(_) => "timestamp",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Number(f)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(ts: Timestamp) -> Self {
        FieldValue::Timestamp(ts.trunc_subsecs(6))
    }
}

/// Parse an RFC 3339 timestamp, or a zone-less one read as UTC, truncated to
/// microseconds.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).trunc_subsecs(6));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().trunc_subsecs(6))
}

pub(crate) fn json_type_name(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
