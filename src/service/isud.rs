//! Generic ISUD execution against PostgreSQL. Every operation runs in one transaction:
//! committed on success, rolled back when dropped on any error path.

use crate::coerce::{parse_str, CoercionPolicy};
use crate::config::ID_FIELD;
use crate::error::AppError;
use crate::extractors::UploadedFile;
use crate::filter::{targets_single_record, FilterClause};
use crate::record::{FieldValue, Record};
use crate::registry::RecordType;
use crate::sql::{self, QueryBuf};
use crate::uploads::{StoredUpload, UploadStore};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgConnection, PgPool, Postgres};

/// Result of a select: one record when filtering by id, otherwise every match.
#[derive(Debug)]
pub enum Selection {
    One(Record),
    Many(Vec<Record>),
}

/// Result of an update by filter.
#[derive(Debug)]
pub enum UpdateOutcome {
    One(Record),
    Count(u64),
}

pub struct IsudService;

impl IsudService {
    /// Insert one record. UUID identifiers are generated here; integer ones by the database.
    pub async fn insert(
        pool: &PgPool,
        record_type: &RecordType,
        assignments: Vec<(String, FieldValue)>,
    ) -> Result<Record, AppError> {
        let assignments = with_generated_id(record_type, assignments);
        let mut tx = pool.begin().await?;
        let record = insert_tx(&mut *tx, record_type, &assignments).await?;
        tx.commit().await?;
        tracing::info!(table = %record_type.name, id = %record.id_display(), "record inserted");
        Ok(record)
    }

    /// Insert with an optional uploaded file. The file is stored first and its metadata
    /// overrides the matching columns; if the insert then fails the file is removed again.
    pub async fn insert_with_file(
        pool: &PgPool,
        uploads: &dyn UploadStore,
        record_type: &RecordType,
        mut assignments: Vec<(String, FieldValue)>,
        file: Option<UploadedFile>,
    ) -> Result<Record, AppError> {
        let Some(file) = file else {
            return Self::insert(pool, record_type, assignments).await;
        };
        let stored = uploads
            .save(&file.file_name, file.content_type.as_deref(), &file.bytes)
            .await?;
        apply_upload(&mut assignments, &stored);

        match Self::insert(pool, record_type, assignments).await {
            Ok(record) => Ok(record),
            Err(e) => {
                if let Err(rm) = uploads.remove(&stored.path).await {
                    tracing::warn!(path = %stored.path, error = %rm, "could not remove orphaned upload");
                }
                Err(e)
            }
        }
    }

    /// Select with filters. Any identifier filter makes this a single-record lookup.
    pub async fn select(
        pool: &PgPool,
        record_type: &RecordType,
        clauses: &[FilterClause],
    ) -> Result<Selection, AppError> {
        let q = sql::select_where(record_type, clauses);
        let mut tx = pool.begin().await?;
        let rows = fetch_all(&mut *tx, &q).await?;
        tx.commit().await?;

        if targets_single_record(clauses) {
            let row = rows.first().ok_or_else(|| not_found(record_type, clauses))?;
            return Ok(Selection::One(Record::from_row(record_type, row)));
        }
        Ok(Selection::Many(
            rows.iter().map(|r| Record::from_row(record_type, r)).collect(),
        ))
    }

    pub async fn select_by_id(
        pool: &PgPool,
        record_type: &RecordType,
        id: &FieldValue,
    ) -> Result<Record, AppError> {
        let q = sql::select_by_id(record_type, id);
        let mut tx = pool.begin().await?;
        let row = fetch_optional(&mut *tx, &q).await?;
        tx.commit().await?;
        row.map(|r| Record::from_row(record_type, &r))
            .ok_or_else(|| not_found_id(record_type, id))
    }

    pub async fn update_by_id(
        pool: &PgPool,
        record_type: &RecordType,
        id: &FieldValue,
        assignments: &[(String, FieldValue)],
    ) -> Result<Record, AppError> {
        let q = sql::update_where(record_type, assignments, &[sql::id_clause(id.clone())], true);
        let mut tx = pool.begin().await?;
        let row = fetch_optional(&mut *tx, &q)
            .await?
            .ok_or_else(|| not_found_id(record_type, id))?;
        tx.commit().await?;
        tracing::info!(table = %record_type.name, id = %id_text(id), "record updated");
        Ok(Record::from_row(record_type, &row))
    }

    /// Update by query filters. With an identifier filter the updated record is returned;
    /// otherwise every match is updated and only the count comes back.
    pub async fn update_by_filter(
        pool: &PgPool,
        record_type: &RecordType,
        clauses: &[FilterClause],
        assignments: &[(String, FieldValue)],
    ) -> Result<UpdateOutcome, AppError> {
        require_filters(clauses)?;
        let single = targets_single_record(clauses);
        let q = sql::update_where(record_type, assignments, clauses, single);
        let mut tx = pool.begin().await?;
        if single {
            let row = fetch_optional(&mut *tx, &q)
                .await?
                .ok_or_else(|| not_found(record_type, clauses))?;
            tx.commit().await?;
            return Ok(UpdateOutcome::One(Record::from_row(record_type, &row)));
        }

        let affected = bound(&q).execute(&mut *tx).await?.rows_affected();
        if affected == 0 {
            return Err(AppError::NotFound(format!(
                "no matching records in '{}'",
                record_type.name
            )));
        }
        tx.commit().await?;
        tracing::info!(table = %record_type.name, count = affected, "bulk update");
        Ok(UpdateOutcome::Count(affected))
    }

    /// Delete one record. For file-bearing types the stored file is removed afterwards;
    /// failing to remove it is logged and does not fail the delete.
    pub async fn delete_by_id(
        pool: &PgPool,
        uploads: &dyn UploadStore,
        record_type: &RecordType,
        id: &FieldValue,
    ) -> Result<u64, AppError> {
        let q = sql::delete_by_id(record_type, id);
        let mut tx = pool.begin().await?;
        let row = fetch_optional(&mut *tx, &q)
            .await?
            .ok_or_else(|| not_found_id(record_type, id))?;
        tx.commit().await?;
        let record = Record::from_row(record_type, &row);
        tracing::info!(table = %record_type.name, id = %record.id_display(), "record deleted");

        if record_type.stores_files {
            if let Some(FieldValue::String(path)) = record.get("file_path") {
                if let Err(e) = uploads.remove(path).await {
                    tracing::warn!(path = %path, error = %e, "stored file not removed");
                }
            }
        }
        Ok(1)
    }
}

/// A bare update of every row is never allowed.
pub fn require_filters(clauses: &[FilterClause]) -> Result<(), AppError> {
    if clauses.is_empty() {
        return Err(AppError::BadRequest(
            "at least one filter is required to update records".into(),
        ));
    }
    Ok(())
}

/// Parse an identifier from the request path according to the type's id kind.
pub fn parse_id(record_type: &RecordType, raw: &str, policy: CoercionPolicy) -> Result<FieldValue, AppError> {
    parse_str(record_type.id_field(), raw, policy)
}

fn with_generated_id(record_type: &RecordType, mut assignments: Vec<(String, FieldValue)>) -> Vec<(String, FieldValue)> {
    if record_type.id_kind() == crate::config::FieldKind::Uuid {
        assignments.retain(|(n, _)| n != ID_FIELD);
        assignments.insert(0, (ID_FIELD.to_string(), FieldValue::Uuid(uuid::Uuid::new_v4())));
    }
    assignments
}

fn apply_upload(assignments: &mut Vec<(String, FieldValue)>, stored: &StoredUpload) {
    let meta = [
        ("file_path", FieldValue::String(stored.path.clone())),
        ("file_name", FieldValue::String(stored.file_name.clone())),
        ("file_size", FieldValue::Int(stored.size)),
        (
            "file_type",
            stored
                .content_type
                .clone()
                .map(FieldValue::String)
                .unwrap_or(FieldValue::Null),
        ),
    ];
    for (name, value) in meta {
        assignments.retain(|(n, _)| n != name);
        assignments.push((name.to_string(), value));
    }
}

async fn insert_tx(
    tx: &mut PgConnection,
    record_type: &RecordType,
    assignments: &[(String, FieldValue)],
) -> Result<Record, AppError> {
    let q = sql::insert(record_type, assignments);
    let row = fetch_optional(tx, &q)
        .await?
        .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
    Ok(Record::from_row(record_type, &row))
}

fn bound(q: &QueryBuf) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    q.params
        .iter()
        .fold(sqlx::query(&q.sql), |query, p| query.bind(p.clone()))
}

async fn fetch_optional(conn: &mut PgConnection, q: &QueryBuf) -> Result<Option<PgRow>, AppError> {
    Ok(bound(q).fetch_optional(conn).await?)
}

async fn fetch_all(conn: &mut PgConnection, q: &QueryBuf) -> Result<Vec<PgRow>, AppError> {
    Ok(bound(q).fetch_all(conn).await?)
}

fn id_text(id: &FieldValue) -> String {
    match id.to_json() {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

fn not_found_id(record_type: &RecordType, id: &FieldValue) -> AppError {
    AppError::NotFound(format!("{} '{}' not found", record_type.name, id_text(id)))
}

fn not_found(record_type: &RecordType, clauses: &[FilterClause]) -> AppError {
    match clauses.iter().find(|c| c.targets_id()) {
        Some(c) => not_found_id(record_type, &c.value),
        None => AppError::NotFound(format!("no matching records in '{}'", record_type.name)),
    }
}
