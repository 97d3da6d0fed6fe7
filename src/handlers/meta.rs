//! Registry introspection: the record types this server exposes.

use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct FieldInfo {
    pub name: String,
    pub kind: crate::config::FieldKind,
    pub nullable: bool,
    pub protected: bool,
}

#[derive(Serialize)]
pub struct TableInfo {
    pub name: String,
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub fields: Vec<FieldInfo>,
    pub shaped: bool,
    pub stores_files: bool,
}

pub async fn tables(State(state): State<AppState>) -> Json<Vec<TableInfo>> {
    let mut out: Vec<TableInfo> = state
        .registry
        .record_types()
        .map(|rt| TableInfo {
            name: rt.name.clone(),
            aliases: rt.aliases.clone(),
            comment: rt.comment.clone(),
            fields: rt
                .fields
                .iter()
                // Sensitive columns are never advertised.
                .filter(|f| !rt.sensitive.contains(&f.name))
                .map(|f| FieldInfo {
                    name: f.name.clone(),
                    kind: f.kind,
                    nullable: f.nullable,
                    protected: f.protected,
                })
                .collect(),
            shaped: rt.is_shaped(),
            stores_files: rt.stores_files,
        })
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Json(out)
}
