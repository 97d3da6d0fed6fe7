//! Example server: reads settings from the environment (and `.env`), ensures the database and
//! tables exist, then serves the table routes under the configured prefix.

use isud_api::{
    app, apply_migrations, connect, ensure_database_exists, load_from_path, AppState, LocalUploads,
    Registry, Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("isud_api=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let settings = Settings::from_env()?;
    ensure_database_exists(&settings.database_url).await?;
    let pool = connect(&settings).await?;

    let registry = match &settings.model_path {
        Some(path) => Registry::from_config(&load_from_path(path).await?)?,
        None => Registry::builtin()?.clone(),
    };
    apply_migrations(&pool, &registry).await?;

    let uploads = LocalUploads::new(&settings.upload_dir);
    uploads.ensure_root().await?;

    let state = AppState::new(pool, Arc::new(registry), Arc::new(uploads))
        .with_coercion(settings.coercion_policy());
    let router = app(state, &settings.api_prefix, settings.max_upload_bytes).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, prefix = %settings.api_prefix, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
