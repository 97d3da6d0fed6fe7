//! Shared application state for all routes. The registry is immutable once built.

use crate::coerce::CoercionPolicy;
use crate::registry::Registry;
use crate::uploads::UploadStore;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub registry: Arc<Registry>,
    pub uploads: Arc<dyn UploadStore>,
    pub coercion: CoercionPolicy,
}

impl AppState {
    pub fn new(pool: PgPool, registry: Arc<Registry>, uploads: Arc<dyn UploadStore>) -> Self {
        AppState {
            pool,
            registry,
            uploads,
            coercion: CoercionPolicy::default(),
        }
    }

    pub fn with_coercion(mut self, coercion: CoercionPolicy) -> Self {
        self.coercion = coercion;
        self
    }
}
