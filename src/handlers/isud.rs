//! ISUD handlers. Each resolves the table from the path, validates input, then runs one
//! service operation. Input is fully validated before the database is touched.

use crate::config::FILE_FIELDS;
use crate::error::AppError;
use crate::extractors::InsertPayload;
use crate::filter::build_filter_clauses;
use crate::response;
use crate::serialize::{serialize, serialize_many};
use crate::service::{
    json_inputs, parse_id, require_filters, IsudService, RawInput, RequestValidator, Selection,
    UpdateOutcome,
};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Response,
    Json,
};
use serde_json::Value;

type Filters = Query<Vec<(String, String)>>;

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(v)| v)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

pub async fn insert(
    State(state): State<AppState>,
    Path(table): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let record_type = state.registry.resolve(&table)?;
    let body = json_body(body)?;
    let obj = RequestValidator::json_object(&body)?;
    let assignments = RequestValidator::insert_fields(record_type, json_inputs(obj), state.coercion)?;
    let record = IsudService::insert(&state.pool, record_type, assignments).await?;
    Ok(response::record(serialize(&record, record_type)))
}

pub async fn insert_with_file(
    State(state): State<AppState>,
    Path(table): Path<String>,
    payload: InsertPayload,
) -> Result<Response, AppError> {
    let record_type = state.registry.resolve(&table)?;
    let (fields, file) = match payload {
        InsertPayload::Json(body) => {
            let obj = RequestValidator::json_object(&body)?;
            let assignments =
                RequestValidator::insert_fields(record_type, json_inputs(obj), state.coercion)?;
            let record = IsudService::insert(&state.pool, record_type, assignments).await?;
            return Ok(response::record(serialize(&record, record_type)));
        }
        InsertPayload::Form { fields, file } => (fields, file),
    };

    let file = match file {
        Some(f) if record_type.stores_files => Some(f),
        Some(f) => {
            tracing::warn!(table = %record_type.name, file = %f.file_name, "ignoring file part for a table without file storage");
            None
        }
        None => None,
    };
    // Upload metadata is authoritative for the file columns.
    let inputs = fields
        .iter()
        .filter(|(name, _)| file.is_none() || !FILE_FIELDS.contains(&name.as_str()))
        .map(|(name, value)| (name.as_str(), RawInput::Text(value.as_str())));
    let assignments = RequestValidator::insert_fields(record_type, inputs, state.coercion)?;
    let record = IsudService::insert_with_file(
        &state.pool,
        state.uploads.as_ref(),
        record_type,
        assignments,
        file,
    )
    .await?;
    Ok(response::record(serialize(&record, record_type)))
}

pub async fn select(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Filters,
) -> Result<Response, AppError> {
    let record_type = state.registry.resolve(&table)?;
    let clauses = build_filter_clauses(record_type, &params, state.coercion)?;
    Ok(match IsudService::select(&state.pool, record_type, &clauses).await? {
        Selection::One(record) => response::record(serialize(&record, record_type)),
        Selection::Many(records) => response::records(serialize_many(&records, record_type)),
    })
}

pub async fn select_by_id(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let record_type = state.registry.resolve(&table)?;
    let id = parse_id(record_type, &id, state.coercion)?;
    let record = IsudService::select_by_id(&state.pool, record_type, &id).await?;
    Ok(response::record(serialize(&record, record_type)))
}

pub async fn update_by_id(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let record_type = state.registry.resolve(&table)?;
    let id = parse_id(record_type, &id, state.coercion)?;
    let body = json_body(body)?;
    let obj = RequestValidator::json_object(&body)?;
    let assignments = RequestValidator::update_fields(record_type, json_inputs(obj), state.coercion)?;
    let record = IsudService::update_by_id(&state.pool, record_type, &id, &assignments).await?;
    Ok(response::record(serialize(&record, record_type)))
}

pub async fn update_by_filter(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Filters,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let record_type = state.registry.resolve(&table)?;
    let clauses = build_filter_clauses(record_type, &params, state.coercion)?;
    require_filters(&clauses)?;
    let body = json_body(body)?;
    let obj = RequestValidator::json_object(&body)?;
    let assignments = RequestValidator::update_fields(record_type, json_inputs(obj), state.coercion)?;
    Ok(
        match IsudService::update_by_filter(&state.pool, record_type, &clauses, &assignments).await? {
            UpdateOutcome::One(record) => response::record(serialize(&record, record_type)),
            UpdateOutcome::Count(n) => response::count(n),
        },
    )
}

pub async fn delete_by_id(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let record_type = state.registry.resolve(&table)?;
    let id = parse_id(record_type, &id, state.coercion)?;
    let n = IsudService::delete_by_id(&state.pool, state.uploads.as_ref(), record_type, &id).await?;
    Ok(response::count(n))
}

// The static `insert` segment shadows `/{table}/{id}` for an id spelled `insert`. The other
// methods on that path are answered by the id handlers.
const INSERT_SEGMENT: &str = "insert";

fn insert_segment_as_id(table: String) -> Path<(String, String)> {
    Path((table, INSERT_SEGMENT.to_string()))
}

pub async fn select_insert_segment(
    state: State<AppState>,
    Path(table): Path<String>,
) -> Result<Response, AppError> {
    select_by_id(state, insert_segment_as_id(table)).await
}

pub async fn update_insert_segment(
    state: State<AppState>,
    Path(table): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    update_by_id(state, insert_segment_as_id(table), body).await
}

pub async fn delete_insert_segment(
    state: State<AppState>,
    Path(table): Path<String>,
) -> Result<Response, AppError> {
    delete_by_id(state, insert_segment_as_id(table)).await
}
