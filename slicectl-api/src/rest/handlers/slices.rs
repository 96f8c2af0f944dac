use axum::extract::{Path, State};
use axum::Json;

use crate::audit;
use crate::auth::AuthenticatedUser;
use crate::rest::dto::{
    slice_summary, CreateSliceResponse, DeleteSliceResponse, DeployResponse, SliceSummary,
    SliceTopologyRequest, SlicesResponse, UpdateSliceResponse,
};
use crate::rest::error::ApiError;
use crate::state::AppState;
use crate::{deploy, slice_controller};

#[utoipa::path(
    get,
    path = "/slices",
    responses((status = 200, description = "Slices owned by the caller", body = SlicesResponse)),
    tag = "slices"
)]
pub async fn list_slices(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> Result<Json<SlicesResponse>, ApiError> {
    let slices = slice_controller::list(state.store.as_ref(), caller.user_id).await?;
    Ok(Json(SlicesResponse {
        user: caller.username,
        slices: slices.iter().map(|(s, vms)| slice_summary(s, vms)).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/slices/{id}",
    responses(
        (status = 200, description = "A single slice", body = SliceSummary),
        (status = 403, description = "Not the owner", body = ApiError),
        (status = 404, description = "No such slice", body = ApiError),
    ),
    tag = "slices"
)]
pub async fn get_slice(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<SliceSummary>, ApiError> {
    let (slice, vms) = slice_controller::get(state.store.as_ref(), id, caller.user_id).await?;
    Ok(Json(slice_summary(&slice, &vms)))
}

#[utoipa::path(
    post,
    path = "/slices/create",
    request_body = SliceTopologyRequest,
    responses(
        (status = 200, description = "Slice created", body = CreateSliceResponse),
        (status = 400, description = "Malformed topology", body = ApiError),
    ),
    tag = "slices"
)]
pub async fn create_slice(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(body): Json<SliceTopologyRequest>,
) -> Result<Json<CreateSliceResponse>, ApiError> {
    let (name, template, nodes, links) = body.into_parts();
    let links_created = links.len();
    let slice = slice_controller::create(state.store.as_ref(), caller.user_id, name, template, nodes, links).await?;
    audit::slice_created(slice.id, caller.user_id, &slice.name);

    Ok(Json(CreateSliceResponse {
        slice_id: slice.id,
        message: "slice created".into(),
        owner: caller.username,
        links_created,
    }))
}

#[utoipa::path(
    post,
    path = "/slices/update/{id}",
    request_body = SliceTopologyRequest,
    responses(
        (status = 200, description = "Slice updated", body = UpdateSliceResponse),
        (status = 409, description = "Slice not in an updatable state", body = ApiError),
    ),
    tag = "slices"
)]
pub async fn update_slice(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<SliceTopologyRequest>,
) -> Result<Json<UpdateSliceResponse>, ApiError> {
    let (name, template, nodes, links) = body.into_parts();
    slice_controller::update(state.store.as_ref(), id, caller.user_id, name, template, nodes, links).await?;
    audit::slice_updated(id, caller.user_id);

    Ok(Json(UpdateSliceResponse {
        status: "updated".into(),
        slice_id: id,
        message: "topology replaced".into(),
    }))
}

#[utoipa::path(
    post,
    path = "/slices/deploy/{id}",
    responses(
        (status = 200, description = "Deploy report", body = DeployResponse),
        (status = 403, description = "Not the owner", body = ApiError),
    ),
    tag = "slices"
)]
pub async fn deploy_slice(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<DeployResponse>, ApiError> {
    let report = deploy::deploy(&state, id, caller.user_id).await?;
    audit::slice_deployed(id, caller.user_id, &report.algorithm, report.vms.len());
    Ok(Json(report.into()))
}

#[utoipa::path(
    delete,
    path = "/slices/delete/{id}",
    responses(
        (status = 200, description = "Slice deleted", body = DeleteSliceResponse),
        (status = 404, description = "No such slice", body = ApiError),
    ),
    tag = "slices"
)]
pub async fn delete_slice(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<DeleteSliceResponse>, ApiError> {
    slice_controller::delete(state.store.as_ref(), &state.executor, &state.settings, id, caller.user_id).await?;
    audit::slice_deleted(id, caller.user_id);

    Ok(Json(DeleteSliceResponse {
        status: "deleted".into(),
        slice_id: id,
    }))
}
