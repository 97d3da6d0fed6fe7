//! Runtime settings from environment variables (a `.env` file is loaded by the binary).

use crate::coerce::CoercionPolicy;
use crate::error::ConfigError;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub max_connections: u32,
    pub max_upload_bytes: usize,
    /// Model file replacing the built-in catalog.
    pub model_path: Option<PathBuf>,
    pub lenient_booleans: bool,
    pub api_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "postgres://localhost/isud".into(),
            bind_addr: "0.0.0.0:8000".into(),
            upload_dir: PathBuf::from("uploads"),
            max_connections: 5,
            max_upload_bytes: 25 * 1024 * 1024,
            model_path: None,
            lenient_booleans: false,
            api_prefix: "/api".into(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: get("ISUD_BIND_ADDR").unwrap_or(defaults.bind_addr),
            upload_dir: get("ISUD_UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            max_connections: parse_num(get("ISUD_MAX_CONNECTIONS"), "ISUD_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            max_upload_bytes: parse_num(get("ISUD_MAX_UPLOAD_BYTES"), "ISUD_MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
            model_path: get("ISUD_MODEL_PATH").map(PathBuf::from),
            lenient_booleans: parse_flag(get("ISUD_LENIENT_BOOLEANS"), "ISUD_LENIENT_BOOLEANS")?
                .unwrap_or(defaults.lenient_booleans),
            api_prefix: get("ISUD_API_PREFIX")
                .map(|p| normalize_prefix(&p))
                .unwrap_or(defaults.api_prefix),
        })
    }

    pub fn coercion_policy(&self) -> CoercionPolicy {
        CoercionPolicy {
            lenient_booleans: self.lenient_booleans,
        }
    }
}

fn parse_num<T: std::str::FromStr>(value: Option<String>, key: &str) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| ConfigError::Env(format!("{} must be a number, got {:?}", key, v)))
        })
        .transpose()
}

fn parse_flag(value: Option<String>, key: &str) -> Result<Option<bool>, ConfigError> {
    value
        .map(|v| match v.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Env(format!("{} must be a boolean, got {:?}", key, v))),
        })
        .transpose()
}

/// `api/` → `/api`; `/` stays empty so routes mount at the root.
fn normalize_prefix(p: &str) -> String {
    let trimmed = p.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
