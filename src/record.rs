//! Typed field values and records, plus decoding of PostgreSQL rows by declared field kind.

use crate::config::FieldKind;
use crate::registry::RecordType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::Row;

/// A single column value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Uuid(uuid::Uuid),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Json(Value),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Whether this value can be stored in a column of `kind`. Null is checked separately.
    pub fn fits(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (FieldValue::Null, _)
                | (FieldValue::String(_), FieldKind::String)
                | (FieldValue::Int(_), FieldKind::Integer)
                | (FieldValue::Float(_), FieldKind::Float)
                | (FieldValue::Int(_), FieldKind::Float)
                | (FieldValue::Bool(_), FieldKind::Boolean)
                | (FieldValue::Uuid(_), FieldKind::Uuid)
                | (FieldValue::Timestamp(_), FieldKind::Timestamp)
                | (FieldValue::Date(_), FieldKind::Date)
                | (_, FieldKind::Json)
        )
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Int(n) => Value::Number((*n).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Uuid(u) => Value::String(u.to_string()),
            FieldValue::Timestamp(t) => Value::String(t.to_rfc3339()),
            FieldValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            FieldValue::Json(v) => v.clone(),
        }
    }
}

/// One persisted row: ordered (field, value) pairs in column order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    pub fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Record { fields: Vec::new() }
    }

    pub fn with(mut self, name: &str, value: FieldValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn set(&mut self, name: &str, value: FieldValue) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Identifier rendered for log lines.
    pub fn id_display(&self) -> String {
        match self.get(crate::config::ID_FIELD) {
            Some(FieldValue::Uuid(u)) => u.to_string(),
            Some(FieldValue::Int(n)) => n.to_string(),
            Some(FieldValue::String(s)) => s.clone(),
            _ => "?".into(),
        }
    }

    /// Decode a row selected with [`crate::sql`]'s column list for `record_type`.
    pub fn from_row(record_type: &RecordType, row: &PgRow) -> Self {
        let fields = record_type
            .fields
            .iter()
            .map(|f| (f.name.clone(), decode_cell(row, &f.name, f.kind)))
            .collect();
        Record { fields }
    }
}

/// Decode by declared kind, falling back across widths so legacy column types still read.
fn decode_cell(row: &PgRow, name: &str, kind: FieldKind) -> FieldValue {
    match kind {
        FieldKind::String => {
            if let Ok(v) = row.try_get::<Option<String>, _>(name) {
                return v.map(FieldValue::String).unwrap_or(FieldValue::Null);
            }
        }
        FieldKind::Integer => {
            if let Ok(v) = row.try_get::<Option<i64>, _>(name) {
                return v.map(FieldValue::Int).unwrap_or(FieldValue::Null);
            }
            if let Ok(v) = row.try_get::<Option<i32>, _>(name) {
                return v.map(|n| FieldValue::Int(n.into())).unwrap_or(FieldValue::Null);
            }
            if let Ok(v) = row.try_get::<Option<i16>, _>(name) {
                return v.map(|n| FieldValue::Int(n.into())).unwrap_or(FieldValue::Null);
            }
        }
        FieldKind::Float => {
            if let Ok(v) = row.try_get::<Option<f64>, _>(name) {
                return v.map(FieldValue::Float).unwrap_or(FieldValue::Null);
            }
            if let Ok(v) = row.try_get::<Option<f32>, _>(name) {
                return v.map(|n| FieldValue::Float(n.into())).unwrap_or(FieldValue::Null);
            }
        }
        FieldKind::Boolean => {
            if let Ok(v) = row.try_get::<Option<bool>, _>(name) {
                return v.map(FieldValue::Bool).unwrap_or(FieldValue::Null);
            }
        }
        FieldKind::Uuid => {
            if let Ok(v) = row.try_get::<Option<uuid::Uuid>, _>(name) {
                return v.map(FieldValue::Uuid).unwrap_or(FieldValue::Null);
            }
        }
        FieldKind::Timestamp => {
            if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(name) {
                return v.map(FieldValue::Timestamp).unwrap_or(FieldValue::Null);
            }
            if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(name) {
                return v
                    .map(|d| FieldValue::Timestamp(d.and_utc()))
                    .unwrap_or(FieldValue::Null);
            }
        }
        FieldKind::Date => {
            if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(name) {
                return v.map(FieldValue::Date).unwrap_or(FieldValue::Null);
            }
        }
        FieldKind::Json => {
            if let Ok(v) = row.try_get::<Option<Value>, _>(name) {
                return v.map(FieldValue::Json).unwrap_or(FieldValue::Null);
            }
        }
    }
    // Column type drifted from the model: surface it as text rather than failing the row.
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return FieldValue::String(s);
    }
    tracing::debug!(column = name, kind = kind.as_str(), "undecodable column value");
    FieldValue::Null
}
