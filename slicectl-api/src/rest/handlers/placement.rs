use axum::extract::{Path, State};
use axum::Json;

use slicectl_core::types::VmDemand;

use crate::auth::AuthenticatedUser;
use crate::placement_service;
use crate::rest::dto::{CustomPlacementRequest, PlacementResponse, SlicePlacementRequest};
use crate::rest::error::ApiError;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/placement/slice/{id}",
    request_body = SlicePlacementRequest,
    responses(
        (status = 200, description = "Placement result", body = PlacementResponse),
        (status = 503, description = "Monitoring or placement unavailable", body = ApiError),
    ),
    tag = "placement"
)]
pub async fn placement_for_slice(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
    Path(_id): Path<i64>,
    Json(body): Json<SlicePlacementRequest>,
) -> Result<Json<PlacementResponse>, ApiError> {
    let demand: Vec<VmDemand> = body
        .vms
        .into_iter()
        .map(|v| VmDemand {
            id: v.id,
            name: v.name,
            cpu: v.cpu,
            ram: v.ram,
            storage: v.disk,
        })
        .collect();

    let result = placement_service::request_placement(&state.placement, state.monitor.as_deref(), &demand).await?;
    Ok(Json(result.into()))
}

#[utoipa::path(
    post,
    path = "/placement/custom",
    request_body = CustomPlacementRequest,
    responses(
        (status = 200, description = "Placement result", body = PlacementResponse),
        (status = 503, description = "Monitoring or placement unavailable", body = ApiError),
    ),
    tag = "placement"
)]
pub async fn placement_custom(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
    Json(body): Json<CustomPlacementRequest>,
) -> Result<Json<PlacementResponse>, ApiError> {
    let demand: Vec<VmDemand> = body
        .vms
        .into_iter()
        .map(|v| VmDemand {
            id: v.id,
            name: format!("vm{}", v.id),
            cpu: v.cpu,
            ram: v.ram,
            storage: v.storage,
        })
        .collect();

    let result = placement_service::request_placement(&state.placement, state.monitor.as_deref(), &demand).await?;
    Ok(Json(result.into()))
}
