//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    #[error("invalid identifier: table {table} ({reason})")]
    InvalidIdentifier { table: String, reason: String },
    #[error("unknown field: table {table} has no column '{field}' (referenced by {kind})")]
    UnknownField {
        table: String,
        field: String,
        kind: &'static str,
    },
    #[error("model load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("environment: {0}")]
    Env(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("table '{table}' not found; known tables: {}", known.join(", "))]
    UnknownTable { table: String, known: Vec<String> },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::UnknownTable { .. } | AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            AppError::Db(e) => match e {
                sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "not_found"),
                sqlx::Error::Database(db) if is_client_data_error(db.code().as_deref()) => {
                    (StatusCode::BAD_REQUEST, "bad_request")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            },
        }
    }
}

/// SQLSTATE class 22 (data exception) and 23 (integrity constraint violation) come from the
/// values a client supplied, not from the server.
fn is_client_data_error(code: Option<&str>) -> bool {
    matches!(code, Some(c) if c.starts_with("22") || c.starts_with("23"))
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let details = match &self {
            AppError::UnknownTable { known, .. } => Some(serde_json::json!({ "known_tables": known })),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_table_is_404_and_names_known_tables() {
        let err = AppError::UnknownTable {
            table: "nope".into(),
            known: vec!["client".into(), "user".into()],
        };
        assert_eq!(err.status_and_code(), (StatusCode::NOT_FOUND, "not_found"));
        let msg = err.to_string();
        assert!(msg.contains("nope"));
        assert!(msg.contains("client, user"));
    }

    #[test]
    fn validation_and_bad_request_are_400() {
        assert_eq!(AppError::Validation("x".into()).status_and_code().0, StatusCode::BAD_REQUEST);
        assert_eq!(AppError::BadRequest("x".into()).status_and_code().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn row_not_found_maps_to_404_and_other_db_errors_to_500() {
        assert_eq!(AppError::Db(sqlx::Error::RowNotFound).status_and_code().0, StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Db(sqlx::Error::PoolTimedOut).status_and_code().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn sqlstate_classes() {
        assert!(is_client_data_error(Some("22P02")));
        assert!(is_client_data_error(Some("23505")));
        assert!(!is_client_data_error(Some("42P01")));
        assert!(!is_client_data_error(None));
    }
}
