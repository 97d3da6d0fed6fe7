//! Raw model-definition types matching the JSON model file (`models/*.json`).

use serde::{Deserialize, Serialize};

/// Semantic type of a column. Drives coercion, row decoding, SQL casts and DDL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    Uuid,
    Timestamp,
    Date,
    Json,
}

impl FieldKind {
    /// PostgreSQL type used for DDL and placeholder casts.
    pub fn pg_type(self) -> &'static str {
        match self {
            FieldKind::String => "text",
            FieldKind::Integer => "bigint",
            FieldKind::Float => "double precision",
            FieldKind::Boolean => "boolean",
            FieldKind::Uuid => "uuid",
            FieldKind::Timestamp => "timestamptz",
            FieldKind::Date => "date",
            FieldKind::Json => "jsonb",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Uuid => "uuid",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Date => "date",
            FieldKind::Json => "json",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// SQL default expression, emitted verbatim in DDL (e.g. `'booked'`, `0`, `false`).
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub rules: Option<ValidationRule>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub columns: Vec<ColumnConfig>,
    /// Explicit field list for the shaped projection. Absent means generic dump only.
    #[serde(default)]
    pub shape: Option<Vec<String>>,
    /// Relationship and back-reference names; never serialized.
    #[serde(default)]
    pub relations: Vec<String>,
    /// Columns that must never be exposed in API responses (e.g. password hashes).
    #[serde(default)]
    pub sensitive: Vec<String>,
    /// Document-like table: insert-with-file stores an upload, delete removes it.
    #[serde(default)]
    pub stores_files: bool,
}

/// All declared persistable types, in declaration order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub tables: Vec<TableConfig>,
}
