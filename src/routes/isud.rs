//! Table routes. `{table}` is resolved case-insensitively by the handlers; static segments
//! (`insert`, `_meta`) take priority over the parameters they overlap. Non-POST methods on
//! `/{table}/insert` are routed to the id handlers so errors keep the JSON envelope.

use crate::handlers::isud::{
    delete_by_id, delete_insert_segment, insert, insert_with_file, select, select_by_id,
    select_insert_segment, update_by_filter, update_by_id, update_insert_segment,
};
use crate::handlers::meta;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

pub fn isud_routes(state: AppState, max_upload_bytes: usize) -> Router {
    let uploads = Router::new()
        .route(
            "/:table/insert",
            post(insert_with_file)
                .get(select_insert_segment)
                .put(update_insert_segment)
                .delete(delete_insert_segment),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes));

    Router::new()
        .route("/_meta/tables", get(meta::tables))
        .route("/:table", get(select).post(insert).put(update_by_filter))
        .route(
            "/:table/:id",
            get(select_by_id).put(update_by_id).delete(delete_by_id),
        )
        .merge(uploads)
        .with_state(state)
}
