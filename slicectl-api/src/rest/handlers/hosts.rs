use axum::extract::State;
use axum::Json;

use crate::auth::AuthenticatedUser;
use crate::rest::dto::HostsResponse;
use crate::rest::error::ApiError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/hosts",
    responses((status = 200, description = "Live host snapshots", body = HostsResponse)),
    tag = "hosts"
)]
pub async fn list_hosts(State(state): State<AppState>, _caller: AuthenticatedUser) -> Result<Json<HostsResponse>, ApiError> {
    let hosts = match &state.monitor {
        Some(monitor) => monitor.get_hosts().await,
        None => Vec::new(),
    };
    Ok(Json(HostsResponse {
        hosts: hosts.into_iter().map(Into::into).collect(),
    }))
}
