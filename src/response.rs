//! Response helpers: bare record bodies, record lists, and `{"count": n}`.

use crate::serialize::SerializedRecord;
use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// Set when one or more records in the body fell back to the generic projection.
pub const DEGRADED_HEADER: HeaderName = HeaderName::from_static("x-isud-degraded");

#[derive(Serialize)]
pub struct CountBody {
    pub count: u64,
}

pub fn record(serialized: SerializedRecord) -> Response {
    let degraded = usize::from(serialized.is_degraded());
    with_degraded(Json(serialized.into_value()).into_response(), degraded)
}

pub fn records(serialized: Vec<SerializedRecord>) -> Response {
    let degraded = serialized.iter().filter(|r| r.is_degraded()).count();
    let body: Vec<Value> = serialized.into_iter().map(SerializedRecord::into_value).collect();
    with_degraded(Json(body).into_response(), degraded)
}

pub fn count(count: u64) -> Response {
    (StatusCode::OK, Json(CountBody { count })).into_response()
}

fn with_degraded(mut response: Response, degraded: usize) -> Response {
    if degraded > 0 {
        response
            .headers_mut()
            .insert(DEGRADED_HEADER, HeaderValue::from(degraded));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::Projection;
    use serde_json::Map;

    fn serialized(projection: Projection) -> SerializedRecord {
        SerializedRecord {
            projection,
            body: Map::new(),
        }
    }

    #[test]
    fn degraded_header_counts_fallbacks() {
        let resp = records(vec![
            serialized(Projection::Shaped),
            serialized(Projection::Generic { reason: Some("missing name".into()) }),
            serialized(Projection::Generic { reason: None }),
        ]);
        assert_eq!(resp.headers().get(DEGRADED_HEADER).unwrap(), "1");
    }

    #[test]
    fn no_header_when_every_record_is_clean() {
        let resp = record(serialized(Projection::Shaped));
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(DEGRADED_HEADER).is_none());
    }
}
