mod common;
mod isud;

pub use common::common_routes;
pub use isud::isud_routes;

use crate::state::AppState;
use axum::Router;

/// Common routes at the root and table routes under `prefix` (empty mounts them at the root).
pub fn app(state: AppState, prefix: &str, max_upload_bytes: usize) -> Router {
    let tables = isud_routes(state.clone(), max_upload_bytes);
    let router = Router::new().merge(common_routes(state));
    if prefix.is_empty() {
        router.merge(tables)
    } else {
        router.nest(prefix, tables)
    }
}
