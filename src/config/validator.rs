//! Model validation: identifiers, column references and document-table requirements.

use crate::config::{FieldKind, ModelConfig, TableConfig};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;

/// Identifier column every table must declare.
pub const ID_FIELD: &str = "id";

/// Columns a `stores_files` table must carry; filled from the upload on insert-with-file.
pub const FILE_FIELDS: [&str; 4] = ["file_path", "file_name", "file_size", "file_type"];

pub fn validate(config: &ModelConfig) -> Result<(), ConfigError> {
    if config.tables.is_empty() {
        return Err(ConfigError::Validation("at least one table required".into()));
    }
    let mut names = HashSet::new();
    for t in &config.tables {
        let name = t.name.to_lowercase();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::Validation(format!(
                "table name '{}' must be non-empty and contain only [a-z0-9_]",
                t.name
            )));
        }
        if !names.insert(name) {
            return Err(ConfigError::DuplicateTable(t.name.clone()));
        }
        validate_table(t)?;
    }
    Ok(())
}

fn validate_table(t: &TableConfig) -> Result<(), ConfigError> {
    let mut columns = HashSet::new();
    for c in &t.columns {
        if !columns.insert(c.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "table {}: duplicate column '{}'",
                t.name, c.name
            )));
        }
        if let Some(pattern) = c.rules.as_ref().and_then(|r| r.pattern.as_deref()) {
            Regex::new(pattern).map_err(|e| {
                ConfigError::Validation(format!("table {} column {}: bad pattern: {}", t.name, c.name, e))
            })?;
        }
    }

    let id = t
        .columns
        .iter()
        .find(|c| c.name == ID_FIELD)
        .ok_or_else(|| ConfigError::InvalidIdentifier {
            table: t.name.clone(),
            reason: "missing 'id' column".into(),
        })?;
    if !matches!(id.kind, FieldKind::Uuid | FieldKind::Integer) {
        return Err(ConfigError::InvalidIdentifier {
            table: t.name.clone(),
            reason: format!("'id' must be uuid or integer, got {}", id.kind.as_str()),
        });
    }

    let check = |field: &str, kind: &'static str| -> Result<(), ConfigError> {
        if columns.contains(field) {
            Ok(())
        } else {
            Err(ConfigError::UnknownField {
                table: t.name.clone(),
                field: field.to_string(),
                kind,
            })
        }
    };
    for f in t.shape.iter().flatten() {
        // created_at / updated_at are added during resolution when undeclared.
        if f != "created_at" && f != "updated_at" {
            check(f, "shape")?;
        }
    }
    for f in &t.sensitive {
        check(f, "sensitive")?;
    }
    if t.stores_files {
        for f in FILE_FIELDS {
            check(f, "stores_files")?;
        }
    }
    Ok(())
}
