//! Create the tables backing every registered record type. Idempotent: existing tables are
//! left as they are.

use crate::config::{FieldKind, ID_FIELD};
use crate::error::AppError;
use crate::registry::{FieldDef, Registry, RecordType};
use sqlx::PgPool;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS` for each record type, in one transaction.
pub async fn apply_migrations(pool: &PgPool, registry: &Registry) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    for record_type in registry.record_types() {
        let ddl = create_table_sql(record_type);
        tracing::debug!(table = %record_type.name, sql = %ddl, "ensure table");
        sqlx::query(&ddl).execute(&mut *tx).await?;
        if let Some(comment) = &record_type.comment {
            let sql = format!(
                "COMMENT ON TABLE {} IS '{}'",
                quote(&record_type.name),
                comment.replace('\'', "''")
            );
            sqlx::query(&sql).execute(&mut *tx).await?;
        }
    }
    tx.commit().await?;
    tracing::info!(tables = registry.record_types().count(), "schema ensured");
    Ok(())
}

pub fn create_table_sql(record_type: &RecordType) -> String {
    let cols: Vec<String> = record_type.fields.iter().map(column_sql).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(&record_type.name),
        cols.join(", ")
    )
}

fn column_sql(field: &FieldDef) -> String {
    let name = quote(&field.name);
    if field.name == ID_FIELD {
        // UUID ids are generated by the service on insert.
        return match field.kind {
            FieldKind::Integer => format!("{} BIGSERIAL PRIMARY KEY", name),
            kind => format!("{} {} PRIMARY KEY", name, kind.pg_type().to_uppercase()),
        };
    }
    let mut def = format!("{} {}", name, field.kind.pg_type().to_uppercase());
    if !field.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(d) = &field.default {
        def.push_str(" DEFAULT ");
        def.push_str(d);
    }
    def
}
