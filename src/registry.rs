//! Record type registry: table name (or plural alias) → resolved record type.
//! Built once from the model definitions and immutable afterwards.

use crate::config::{validate, FieldKind, ModelConfig, ValidationRule, ID_FIELD};
use crate::error::{AppError, ConfigError};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Fields the system manages; never taken from client input.
pub const SYSTEM_FIELDS: [&str; 3] = [ID_FIELD, "created_at", "updated_at"];

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    /// Whether the column has a DB default (so inserts may omit it).
    pub has_default: bool,
    pub default: Option<String>,
    pub protected: bool,
    pub rules: Option<ValidationRule>,
}

#[derive(Clone, Debug)]
pub struct RecordType {
    pub name: String,
    pub aliases: Vec<String>,
    pub comment: Option<String>,
    pub fields: Vec<FieldDef>,
    pub shape: Option<Vec<String>>,
    pub relations: HashSet<String>,
    pub sensitive: HashSet<String>,
    pub stores_files: bool,
    id_index: usize,
}

impl RecordType {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn id_field(&self) -> &FieldDef {
        &self.fields[self.id_index]
    }

    pub fn id_kind(&self) -> FieldKind {
        self.id_field().kind
    }

    pub fn is_protected(&self, name: &str) -> bool {
        SYSTEM_FIELDS.contains(&name)
    }

    pub fn is_shaped(&self) -> bool {
        self.shape.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct Registry {
    types: Vec<RecordType>,
    by_name: HashMap<String, usize>,
}

static BUILTIN: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// Validate and resolve model definitions.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ConfigError> {
        validate(config)?;

        let mut types = Vec::with_capacity(config.tables.len());
        let mut by_name = HashMap::new();
        for table in &config.tables {
            let name = table.name.to_lowercase();
            let mut fields: Vec<FieldDef> = table
                .columns
                .iter()
                .map(|c| FieldDef {
                    name: c.name.clone(),
                    kind: c.kind,
                    nullable: c.nullable && c.name != ID_FIELD,
                    has_default: c.default.is_some(),
                    default: c.default.clone(),
                    protected: SYSTEM_FIELDS.contains(&c.name.as_str()),
                    rules: c.rules.clone(),
                })
                .collect();
            for ts in ["created_at", "updated_at"] {
                if !fields.iter().any(|f| f.name == ts) {
                    fields.push(FieldDef {
                        name: ts.to_string(),
                        kind: FieldKind::Timestamp,
                        nullable: false,
                        has_default: true,
                        default: Some("NOW()".into()),
                        protected: true,
                        rules: None,
                    });
                }
            }
            let id_index = fields
                .iter()
                .position(|f| f.name == ID_FIELD)
                .ok_or_else(|| ConfigError::InvalidIdentifier {
                    table: name.clone(),
                    reason: "missing 'id' column".into(),
                })?;

            by_name.insert(name.clone(), types.len());
            types.push(RecordType {
                name,
                aliases: Vec::new(),
                comment: table.comment.clone(),
                fields,
                shape: table.shape.clone(),
                relations: table.relations.iter().cloned().collect(),
                sensitive: table.sensitive.iter().cloned().collect(),
                stores_files: table.stores_files,
                id_index,
            });
        }

        // Aliases after every canonical name is known, so an alias never shadows a table.
        for (idx, rt) in types.iter_mut().enumerate() {
            if let Some(plural) = pluralize(&rt.name) {
                if !by_name.contains_key(&plural) {
                    by_name.insert(plural.clone(), idx);
                    rt.aliases.push(plural);
                }
            }
        }

        tracing::debug!(tables = types.len(), names = by_name.len(), "registry built");
        Ok(Registry { types, by_name })
    }

    /// Registry over the compiled-in salon catalog, built on first use.
    pub fn builtin() -> Result<&'static Registry, ConfigError> {
        if let Some(r) = BUILTIN.get() {
            return Ok(r);
        }
        let registry = Registry::from_config(&crate::config::salon_model()?)?;
        Ok(BUILTIN.get_or_init(|| registry))
    }

    /// Case-insensitive lookup by canonical name or alias.
    pub fn resolve(&self, table: &str) -> Result<&RecordType, AppError> {
        self.by_name
            .get(&table.to_lowercase())
            .map(|&idx| &self.types[idx])
            .ok_or_else(|| AppError::UnknownTable {
                table: table.to_string(),
                known: self.known_tables(),
            })
    }

    /// Canonical table names, sorted.
    pub fn known_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.iter().map(|t| t.name.clone()).collect();
        names.sort();
        names
    }

    pub fn record_types(&self) -> impl Iterator<Item = &RecordType> {
        self.types.iter()
    }
}

/// Simple English plural used for table aliases. Names already ending in `s` get none.
pub fn pluralize(name: &str) -> Option<String> {
    if name.is_empty() || name.ends_with('s') {
        return None;
    }
    if let Some(stem) = name.strip_suffix('y') {
        let before = stem.chars().last();
        if matches!(before, Some(c) if !"aeiou".contains(c)) {
            return Some(format!("{}ies", stem));
        }
    }
    if name.ends_with('x') || name.ends_with('z') || name.ends_with("ch") || name.ends_with("sh") {
        return Some(format!("{}es", name));
    }
    Some(format!("{}s", name))
}
