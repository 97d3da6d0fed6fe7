//! Record serializer: shaped projection for types with an explicit field list, generic
//! cycle-safe dump for everything else. Degradation is decided per record.

use crate::record::{FieldValue, Record};
use crate::registry::RecordType;
use serde_json::{Map, Value};

/// Relationship / back-reference names never emitted by the generic dump.
pub const RELATIONSHIP_FIELDS: [&str; 4] = ["supplier", "inventory_items", "schedules", "permissions"];

#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    Shaped,
    Generic { reason: Option<String> },
}

#[derive(Clone, Debug)]
pub struct SerializedRecord {
    pub projection: Projection,
    pub body: Map<String, Value>,
}

impl SerializedRecord {
    /// Shaped type that fell back to the generic dump.
    pub fn is_degraded(&self) -> bool {
        matches!(self.projection, Projection::Generic { reason: Some(_) })
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }
}

pub fn serialize(record: &Record, record_type: &RecordType) -> SerializedRecord {
    let Some(shape) = &record_type.shape else {
        return SerializedRecord {
            projection: Projection::Generic { reason: None },
            body: generic_dump(record, record_type),
        };
    };
    match shaped(record, record_type, shape) {
        Ok(body) => SerializedRecord {
            projection: Projection::Shaped,
            body,
        },
        Err(reason) => {
            tracing::warn!(
                table = %record_type.name,
                id = %record.id_display(),
                reason = %reason,
                "record does not fit its shape; using generic projection"
            );
            SerializedRecord {
                projection: Projection::Generic { reason: Some(reason) },
                body: generic_dump(record, record_type),
            }
        }
    }
}

/// Each record is shaped or degraded independently; siblings are unaffected.
pub fn serialize_many(records: &[Record], record_type: &RecordType) -> Vec<SerializedRecord> {
    records.iter().map(|r| serialize(r, record_type)).collect()
}

fn shaped(record: &Record, record_type: &RecordType, shape: &[String]) -> Result<Map<String, Value>, String> {
    let mut body = Map::new();
    for name in shape {
        if record_type.sensitive.contains(name) {
            continue;
        }
        let value = record.get(name).ok_or_else(|| format!("missing field '{}'", name))?;
        if let Some(def) = record_type.field(name) {
            if value.is_null() && !def.nullable {
                return Err(format!("field '{}' is null but required", name));
            }
            if !value.fits(def.kind) {
                return Err(format!("field '{}' is not a {}", name, def.kind.as_str()));
            }
        }
        body.insert(name.clone(), value.to_json());
    }
    Ok(body)
}

fn generic_dump(record: &Record, record_type: &RecordType) -> Map<String, Value> {
    record
        .fields
        .iter()
        .filter(|(name, _)| {
            !RELATIONSHIP_FIELDS.contains(&name.as_str())
                && !record_type.relations.contains(name)
                && !record_type.sensitive.contains(name)
        })
        .map(|(name, value): &(String, FieldValue)| (name.clone(), value.to_json()))
        .collect()
}
