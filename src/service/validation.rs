//! Request validation: client input → typed column assignments, with per-column rules.

use crate::coerce::{coerce_json, parse_str, CoercionPolicy};
use crate::config::ValidationRule;
use crate::error::AppError;
use crate::record::FieldValue;
use crate::registry::{FieldDef, RecordType};
use regex::Regex;
use serde_json::{Map, Value};

/// One untyped input value: from a JSON body or from a form field.
#[derive(Clone, Copy, Debug)]
pub enum RawInput<'a> {
    Json(&'a Value),
    Text(&'a str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Insert,
    Update,
}

pub struct RequestValidator;

impl RequestValidator {
    /// Assignments for a new record. Protected fields are dropped; required columns must be present.
    pub fn insert_fields<'a, I>(
        record_type: &RecordType,
        input: I,
        policy: CoercionPolicy,
    ) -> Result<Vec<(String, FieldValue)>, AppError>
    where
        I: IntoIterator<Item = (&'a str, RawInput<'a>)>,
    {
        assignments(record_type, input, policy, Mode::Insert)
    }

    /// Assignments for an existing record. Only supplied fields are checked.
    pub fn update_fields<'a, I>(
        record_type: &RecordType,
        input: I,
        policy: CoercionPolicy,
    ) -> Result<Vec<(String, FieldValue)>, AppError>
    where
        I: IntoIterator<Item = (&'a str, RawInput<'a>)>,
    {
        assignments(record_type, input, policy, Mode::Update)
    }

    /// View a JSON body as raw inputs; the body must be an object.
    pub fn json_object(body: &Value) -> Result<&Map<String, Value>, AppError> {
        body.as_object()
            .ok_or_else(|| AppError::BadRequest("body must be a JSON object".into()))
    }
}

/// Iterate a JSON object as raw inputs.
pub fn json_inputs(obj: &Map<String, Value>) -> impl Iterator<Item = (&str, RawInput<'_>)> {
    obj.iter().map(|(k, v)| (k.as_str(), RawInput::Json(v)))
}

fn assignments<'a, I>(
    record_type: &RecordType,
    input: I,
    policy: CoercionPolicy,
    mode: Mode,
) -> Result<Vec<(String, FieldValue)>, AppError>
where
    I: IntoIterator<Item = (&'a str, RawInput<'a>)>,
{
    let mut out: Vec<(String, FieldValue)> = Vec::new();
    for (name, raw) in input {
        if record_type.is_protected(name) {
            tracing::debug!(table = %record_type.name, field = name, "ignoring system-managed field");
            continue;
        }
        let def = record_type.field(name).ok_or_else(|| {
            AppError::BadRequest(format!("unknown field '{}' for table '{}'", name, record_type.name))
        })?;
        let value = match raw {
            RawInput::Json(v) => coerce_json(def, v, policy)?,
            RawInput::Text(s) => parse_str(def, s, policy)?,
        };
        check_value(def, &value)?;
        match out.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => out.push((name.to_string(), value)),
        }
    }

    if mode == Mode::Insert {
        for def in record_type.fields.iter().filter(|f| !f.protected) {
            if out.iter().any(|(n, _)| *n == def.name) {
                continue;
            }
            let rule_required = def.rules.as_ref().and_then(|r| r.required) == Some(true);
            if rule_required || (!def.nullable && !def.has_default) {
                return Err(AppError::Validation(format!("{} is required", def.name)));
            }
        }
    }
    Ok(out)
}

fn check_value(def: &FieldDef, value: &FieldValue) -> Result<(), AppError> {
    if value.is_null() {
        let rule_required = def.rules.as_ref().and_then(|r| r.required) == Some(true);
        if !def.nullable || rule_required {
            return Err(AppError::Validation(format!("{} cannot be null", def.name)));
        }
        return Ok(());
    }
    match &def.rules {
        Some(rule) => validate_field(&def.name, &value.to_json(), rule),
        None => Ok(()),
    }
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let (Some(max), Some(s)) = (rule.max_length, v.as_str()) {
        if s.chars().count() > max as usize {
            return Err(AppError::Validation(format!("{} must be at most {} characters", col, max)));
        }
    }
    if let (Some(min), Some(s)) = (rule.min_length, v.as_str()) {
        if s.chars().count() < min as usize {
            return Err(AppError::Validation(format!("{} must be at least {} characters", col, min)));
        }
    }
    if let (Some(pattern), Some(s)) = (rule.pattern.as_deref(), v.as_str()) {
        let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", col)))?;
        if !re.is_match(s) {
            return Err(AppError::Validation(format!("{} does not match required pattern", col)));
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {:?}",
                col,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    if let (Some(min), Some(n)) = (rule.minimum, v.as_f64()) {
        if n < min {
            return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
        }
    }
    if let (Some(max), Some(n)) = (rule.maximum, v.as_f64()) {
        if n > max {
            return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let Some(s) = v.as_str() else { return Ok(()) };
    match format.to_lowercase().as_str() {
        "email" => {
            let valid = s
                .split_once('@')
                .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
                .unwrap_or(false);
            if !valid {
                return Err(AppError::Validation(format!("{} must be a valid email", col)));
            }
        }
        "uuid" => {
            if uuid::Uuid::parse_str(s).is_err() {
                return Err(AppError::Validation(format!("{} must be a valid UUID", col)));
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use serde_json::json;

    fn insert(table: &str, body: Value) -> Result<Vec<(String, FieldValue)>, AppError> {
        let rt = Registry::builtin().unwrap().resolve(table).unwrap();
        let obj = RequestValidator::json_object(&body)?;
        RequestValidator::insert_fields(rt, json_inputs(obj), CoercionPolicy::default())
    }

    #[test]
    fn protected_fields_are_dropped() {
        let out = insert(
            "supplier",
            json!({ "id": "00000000-0000-0000-0000-000000000001", "created_at": "2020-01-01T00:00:00Z", "name": "Acme" }),
        )
        .unwrap();
        assert_eq!(out, vec![("name".to_string(), FieldValue::String("Acme".into()))]);
    }

    #[test]
    fn unknown_field_is_bad_request() {
        let err = insert("supplier", json!({ "name": "Acme", "colour": "red" })).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("colour")));
    }

    #[test]
    fn required_columns_enforced_on_insert_only() {
        let err = insert("supplier", json!({ "phone": "1" })).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("name is required")));

        let rt = Registry::builtin().unwrap().resolve("supplier").unwrap();
        let body = json!({ "phone": "1" });
        let out = RequestValidator::update_fields(
            rt,
            json_inputs(RequestValidator::json_object(&body).unwrap()),
            CoercionPolicy::default(),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn null_for_non_nullable_rejected() {
        let err = insert("supplier", json!({ "name": null })).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("cannot be null")));
    }

    #[test]
    fn rules_are_applied() {
        assert!(insert("client", json!({ "name": "Ann", "email": "nope" })).is_err());
        assert!(insert("client", json!({ "name": "Ann", "email": "ann@example.com" })).is_ok());
        assert!(insert("client", json!({ "name": "Ann", "visit_count": -1 })).is_err());
        assert!(insert("schedule", json!({ "appointment_date": "2024-05-01T10:00:00Z", "status": "lost" })).is_err());
        assert!(insert("client", json!({ "name": "Ann", "phone": "call me" })).is_err());
    }

    #[test]
    fn text_inputs_are_parsed_strictly() {
        let rt = Registry::builtin().unwrap().resolve("document").unwrap();
        let out = RequestValidator::insert_fields(
            rt,
            vec![("title", RawInput::Text("Lease")), ("file_size", RawInput::Text("12"))],
            CoercionPolicy::default(),
        )
        .unwrap();
        assert!(out.contains(&("file_size".to_string(), FieldValue::Int(12))));
        let err = RequestValidator::insert_fields(
            rt,
            vec![("file_size", RawInput::Text("big"))],
            CoercionPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn body_must_be_object() {
        assert!(matches!(
            RequestValidator::json_object(&json!([1, 2])),
            Err(AppError::BadRequest(_))
        ));
    }
}
