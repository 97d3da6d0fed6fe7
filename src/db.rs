//! Database bootstrap: create the target database when missing, then open the pool.

use crate::error::{AppError, ConfigError};
use crate::settings::Settings;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = split_database_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&admin_url)
        .map_err(|e| ConfigError::Env(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn = opts.connect().await?;
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

pub async fn connect(settings: &Settings) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await?;
    tracing::debug!(max_connections = settings.max_connections, "database pool ready");
    Ok(pool)
}

/// `postgres://u@h:5432/salon?sslmode=disable` → (`postgres://u@h:5432/postgres?sslmode=disable`, `salon`).
/// A URL without a database path yields an empty name.
fn split_database_url(url: &str) -> Result<(String, String), AppError> {
    let authority_start = url
        .find("://")
        .ok_or_else(|| ConfigError::Env("DATABASE_URL: missing scheme".into()))?
        + 3;
    let authority_end = url
        .get(authority_start..)
        .and_then(|after| after.char_indices().find(|(_, c)| *c == '/' || *c == '?'));
    let path_start = match authority_end {
        Some((i, '/')) => authority_start + i + 1,
        _ => return Ok((url.to_string(), String::new())),
    };
    let rest = url.get(path_start..).unwrap_or("");
    let (db_name, query) = match rest.split_once('?') {
        Some((name, q)) => (name.trim(), Some(q)),
        None => (rest.trim(), None),
    };
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = match query {
        Some(q) => format!("{}postgres?{}", base, q),
        None => format!("{}postgres", base),
    };
    Ok((admin_url, db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
