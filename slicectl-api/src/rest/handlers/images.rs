use axum::extract::{Multipart, State};
use axum::Json;
use sha2::{Digest, Sha256};

use slicectl_core::error::OrchestratorError;

use crate::auth::AuthenticatedUser;
use crate::rest::dto::{FlavorResponse, ImageResponse};
use crate::rest::error::ApiError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/flavors",
    responses((status = 200, description = "Available flavors", body = [FlavorResponse])),
    tag = "registry"
)]
pub async fn list_flavors(State(state): State<AppState>, _caller: AuthenticatedUser) -> Result<Json<Vec<FlavorResponse>>, ApiError> {
    let flavors = state.store.list_flavors().await?;
    Ok(Json(flavors.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/images",
    responses((status = 200, description = "Available images", body = [ImageResponse])),
    tag = "registry"
)]
pub async fn list_images(State(state): State<AppState>, _caller: AuthenticatedUser) -> Result<Json<Vec<ImageResponse>>, ApiError> {
    let images = state.store.list_images().await?;
    Ok(Json(images.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/images/upload",
    responses(
        (status = 200, description = "Image stored", body = ImageResponse),
        (status = 400, description = "Missing file part", body = ApiError),
    ),
    tag = "registry"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<ImageResponse>, ApiError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| OrchestratorError::Validation(format!("malformed multipart body: {e}")))?
        .ok_or_else(|| OrchestratorError::Validation("missing file part".into()))?;

    let name = field.file_name().unwrap_or("image").to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| OrchestratorError::Validation(format!("failed to read upload: {e}")))?;

    let sha256 = hex::encode(Sha256::digest(&bytes));
    let path = format!("{}/{}", state.settings.image_root.trim_end_matches('/'), name);

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| OrchestratorError::Dependency(format!("failed to write image to {path}: {e}")))?;

    let image = state.store.create_image(&name, &path, &sha256, bytes.len() as u64).await?;
    Ok(Json(image.into()))
}
