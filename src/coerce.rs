//! Coercion of untyped input (query strings, form fields, JSON bodies) into typed field values.

use crate::config::FieldKind;
use crate::error::AppError;
use crate::record::FieldValue;
use crate::registry::{FieldDef, RecordType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

const TRUTHY: [&str; 5] = ["true", "1", "yes", "y", "t"];
const FALSY: [&str; 5] = ["false", "0", "no", "n", "f"];

#[derive(Clone, Copy, Debug, Default)]
pub struct CoercionPolicy {
    /// Legacy behavior: an unrecognised, non-empty boolean token is `true` instead of an error.
    pub lenient_booleans: bool,
}

/// Coerce a query-string value for `field` on `record_type`.
///
/// Identifier, integer, float and boolean fields are parsed and rejected when malformed.
/// Every other kind, and fields the type does not declare, pass through as the raw string
/// and are cast by the database.
pub fn coerce(
    record_type: &RecordType,
    field: &str,
    raw: &str,
    policy: CoercionPolicy,
) -> Result<FieldValue, AppError> {
    let Some(def) = record_type.field(field) else {
        return Ok(FieldValue::String(raw.to_string()));
    };
    match def.kind {
        FieldKind::Uuid | FieldKind::Integer | FieldKind::Float | FieldKind::Boolean => {
            parse_str(def, raw, policy)
        }
        _ => Ok(FieldValue::String(raw.to_string())),
    }
}

/// Strict parse of a string for a declared field of any kind (form fields, JSON strings).
pub fn parse_str(def: &FieldDef, raw: &str, policy: CoercionPolicy) -> Result<FieldValue, AppError> {
    let bad = |what: &str| AppError::BadRequest(format!("invalid {} for field '{}': {:?}", what, def.name, raw));
    match def.kind {
        FieldKind::String => Ok(FieldValue::String(raw.to_string())),
        FieldKind::Uuid => uuid::Uuid::parse_str(raw.trim())
            .map(FieldValue::Uuid)
            .map_err(|_| bad("uuid")),
        FieldKind::Integer => raw.trim().parse::<i64>().map(FieldValue::Int).map_err(|_| bad("integer")),
        FieldKind::Float => match raw.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(FieldValue::Float(f)),
            _ => Err(bad("number")),
        },
        FieldKind::Boolean => parse_bool(raw, policy).map(FieldValue::Bool).ok_or_else(|| bad("boolean")),
        FieldKind::Timestamp => parse_timestamp(raw).map(FieldValue::Timestamp).ok_or_else(|| bad("timestamp")),
        FieldKind::Date => parse_date(raw).map(FieldValue::Date).ok_or_else(|| bad("date")),
        FieldKind::Json => Ok(serde_json::from_str::<Value>(raw)
            .map(FieldValue::Json)
            .unwrap_or_else(|_| FieldValue::Json(Value::String(raw.to_string())))),
    }
}

/// Coerce a JSON body value for a declared field. Native JSON types of the right kind are
/// taken as-is; strings go through [`parse_str`].
pub fn coerce_json(def: &FieldDef, value: &Value, policy: CoercionPolicy) -> Result<FieldValue, AppError> {
    let mismatch = || {
        AppError::BadRequest(format!(
            "field '{}' expects {}, got {}",
            def.name,
            def.kind.as_str(),
            json_type_name(value)
        ))
    };
    match (def.kind, value) {
        (_, Value::Null) => Ok(FieldValue::Null),
        (FieldKind::Json, v) => Ok(FieldValue::Json(v.clone())),
        (FieldKind::String, Value::String(s)) => Ok(FieldValue::String(s.clone())),
        (FieldKind::String, _) => Err(mismatch()),
        (_, Value::String(s)) => parse_str(def, s, policy),
        (FieldKind::Integer, Value::Number(n)) => n.as_i64().map(FieldValue::Int).ok_or_else(mismatch),
        (FieldKind::Float, Value::Number(n)) => n.as_f64().map(FieldValue::Float).ok_or_else(mismatch),
        (FieldKind::Boolean, Value::Bool(b)) => Ok(FieldValue::Bool(*b)),
        (FieldKind::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(FieldValue::Bool(false)),
            Some(1) => Ok(FieldValue::Bool(true)),
            _ => Err(mismatch()),
        },
        _ => Err(mismatch()),
    }
}

fn parse_bool(raw: &str, policy: CoercionPolicy) -> Option<bool> {
    let lower = raw.trim().to_lowercase();
    if TRUTHY.contains(&lower.as_str()) {
        Some(true)
    } else if FALSY.contains(&lower.as_str()) {
        Some(false)
    } else if policy.lenient_booleans {
        Some(!raw.is_empty())
    } else {
        None
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(s).map(|t| t.date_naive()))
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn strict() -> CoercionPolicy {
        CoercionPolicy::default()
    }

    #[test]
    fn uuid_fields_parse_or_fail() {
        let rt = Registry::builtin().unwrap().resolve("schedule").unwrap();
        let u = uuid::Uuid::new_v4();
        assert_eq!(coerce(rt, "client_id", &u.to_string(), strict()).unwrap(), FieldValue::Uuid(u));
        assert!(matches!(
            coerce(rt, "client_id", "not-a-uuid", strict()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn numeric_fields() {
        let rt = Registry::builtin().unwrap().resolve("inventory").unwrap();
        assert_eq!(coerce(rt, "quantity", "42", strict()).unwrap(), FieldValue::Int(42));
        assert!(coerce(rt, "quantity", "4.2", strict()).is_err());
        assert_eq!(coerce(rt, "unit_price", "4.25", strict()).unwrap(), FieldValue::Float(4.25));
        assert!(coerce(rt, "unit_price", "cheap", strict()).is_err());
        assert!(coerce(rt, "unit_price", "NaN", strict()).is_err());
    }

    #[test]
    fn boolean_tokens() {
        let rt = Registry::builtin().unwrap().resolve("client").unwrap();
        for t in ["true", "TRUE", "1", "yes", "Y", "t"] {
            assert_eq!(coerce(rt, "is_vip", t, strict()).unwrap(), FieldValue::Bool(true), "{}", t);
        }
        for f in ["false", "0", "No", "n", "F"] {
            assert_eq!(coerce(rt, "is_vip", f, strict()).unwrap(), FieldValue::Bool(false), "{}", f);
        }
        assert!(coerce(rt, "is_vip", "maybe", strict()).is_err());
    }

    #[test]
    fn lenient_booleans_restore_truthiness_fallback() {
        let rt = Registry::builtin().unwrap().resolve("client").unwrap();
        let lenient = CoercionPolicy { lenient_booleans: true };
        assert_eq!(coerce(rt, "is_vip", "maybe", lenient).unwrap(), FieldValue::Bool(true));
        assert_eq!(coerce(rt, "is_vip", "", lenient).unwrap(), FieldValue::Bool(false));
    }

    #[test]
    fn other_kinds_and_unknown_fields_pass_through() {
        let rt = Registry::builtin().unwrap().resolve("schedule").unwrap();
        assert_eq!(
            coerce(rt, "appointment_date", "not even a date", strict()).unwrap(),
            FieldValue::String("not even a date".into())
        );
        assert_eq!(coerce(rt, "ghost", "x", strict()).unwrap(), FieldValue::String("x".into()));
    }

    #[test]
    fn json_body_values() {
        let rt = Registry::builtin().unwrap().resolve("client").unwrap();
        let name = rt.field("name").unwrap();
        let visits = rt.field("visit_count").unwrap();
        let birthday = rt.field("birthday").unwrap();
        assert_eq!(
            coerce_json(name, &Value::String("Ann".into()), strict()).unwrap(),
            FieldValue::String("Ann".into())
        );
        assert!(coerce_json(name, &serde_json::json!(5), strict()).is_err());
        assert_eq!(coerce_json(visits, &serde_json::json!(5), strict()).unwrap(), FieldValue::Int(5));
        assert_eq!(coerce_json(visits, &serde_json::json!("6"), strict()).unwrap(), FieldValue::Int(6));
        assert!(coerce_json(visits, &serde_json::json!(1.5), strict()).is_err());
        assert_eq!(
            coerce_json(birthday, &serde_json::json!("1990-05-17"), strict()).unwrap(),
            FieldValue::Date(NaiveDate::from_ymd_opt(1990, 5, 17).unwrap())
        );
        assert_eq!(coerce_json(birthday, &Value::Null, strict()).unwrap(), FieldValue::Null);
    }

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("2024-03-01T10:30:00Z").is_some());
        assert!(parse_timestamp("2024-03-01T10:30:00.123").is_some());
        assert!(parse_timestamp("2024-03-01 10:30:00").is_some());
        assert!(parse_timestamp("2024-03-01T10:30").is_some());
        assert!(parse_timestamp("2024-03-01").is_some());
        assert!(parse_timestamp("March first").is_none());
    }
}
