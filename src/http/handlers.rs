//! Route handlers.
//!
//! Each route echoes a small JSON document; the only input is the optional
//! `name` query parameter of `/hello`.

use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;

/// Routes served by the fixture, as listed by `/info`.
pub const ENDPOINTS: [&str; 3] = ["/health", "/hello", "/info"];

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct HelloParams {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Greeting {
    pub message: String,
    pub service: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: String,
    pub id: String,
    pub version: String,
    pub tls: bool,
    pub endpoints: Vec<String>,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}

pub async fn hello(
    State(state): State<AppState>,
    Query(params): Query<HelloParams>,
) -> Json<Greeting> {
    let name = params.name.unwrap_or_else(|| "World".to_string());
    let service = state.identity.service_name.clone();

    Json(Greeting {
        message: format!("Hello {} from {}", name, service),
        service,
        name,
    })
}

pub async fn info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: state.identity.service_name.clone(),
        id: state.identity.service_id.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tls: state.tls,
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    })
}

pub async fn not_found(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "not found",
            "path": uri.path(),
        })),
    )
}
