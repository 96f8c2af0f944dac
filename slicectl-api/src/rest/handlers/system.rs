use axum::Json;

use crate::rest::dto::{HealthResponse, VersionResponse};

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Liveness probe", body = HealthResponse)),
    tag = "system"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".into() })
}

#[utoipa::path(
    get,
    path = "/version",
    responses((status = 200, description = "Build version", body = VersionResponse)),
    tag = "system"
)]
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
