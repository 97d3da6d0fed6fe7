//! isud-api: generic insert/select/update/delete over a registry of record types, backed by PostgreSQL.

pub mod coerce;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod filter;
pub mod handlers;
pub mod migration;
pub mod record;
pub mod registry;
pub mod response;
pub mod routes;
pub mod serialize;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod uploads;

pub use coerce::CoercionPolicy;
pub use config::{load_from_path, salon_model, ModelConfig};
pub use db::{connect, ensure_database_exists};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use record::{FieldValue, Record};
pub use registry::{RecordType, Registry};
pub use routes::{app, common_routes, isud_routes};
pub use service::IsudService;
pub use settings::Settings;
pub use state::AppState;
pub use uploads::{LocalUploads, UploadStore};
