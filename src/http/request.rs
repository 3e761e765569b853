//! Request correlation and accounting.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) when the client sent none
//! - Echo the request ID on the response
//! - Count requests by path and status
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Unmatched paths are counted under one label to bound cardinality

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::observability::metrics;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer assigning a UUID request ID to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer copying the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Record one request in the metrics registry.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = next.run(request).await;
    let status = response.status();

    let label = if status == axum::http::StatusCode::NOT_FOUND {
        "unmatched"
    } else {
        path.as_str()
    };
    metrics::record_request(label, status.as_u16());

    tracing::debug!(
        request_id = %request_id,
        path = %path,
        status = status.as_u16(),
        "Request served"
    );

    response
}
