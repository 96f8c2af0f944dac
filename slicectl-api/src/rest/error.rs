//! The wire shape every domain error is converted into at the HTTP
//! boundary, mirroring how the store-error boundary is kept separate from
//! the transport boundary elsewhere in this codebase.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use slicectl_core::error::OrchestratorError;

#[derive(Serialize, ToSchema)]
pub struct ApiError {
    pub error: String,
    pub code: u32,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.code as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        let code = match e {
            OrchestratorError::Auth(_) => 401,
            OrchestratorError::Authz(_) => 403,
            OrchestratorError::NotFound(_) => 404,
            OrchestratorError::Validation(_) => 400,
            OrchestratorError::Dependency(_) => 503,
            OrchestratorError::Remote(_) => 500,
            OrchestratorError::State(_) => 409,
            OrchestratorError::Invariant(_) => 500,
        };
        ApiError {
            error: e.to_string(),
            code,
        }
    }
}
