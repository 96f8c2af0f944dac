use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::rest::{dto, error::ApiError, handlers};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "slicectl API",
        version = "0.1.0",
        description = "Private-cloud slice orchestrator: topology submission, I-GA placement, and remote VM provisioning."
    ),
    tags(
        (name = "auth", description = "Login and token issuance"),
        (name = "slices", description = "Slice CRUD and deployment"),
        (name = "placement", description = "Direct Placement Engine access"),
        (name = "hosts", description = "Live host metrics"),
        (name = "registry", description = "Image and flavor registry"),
        (name = "system", description = "Liveness and build info"),
    ),
    paths(
        handlers::auth::login,
        handlers::slices::list_slices,
        handlers::slices::get_slice,
        handlers::slices::create_slice,
        handlers::slices::update_slice,
        handlers::slices::deploy_slice,
        handlers::slices::delete_slice,
        handlers::placement::placement_for_slice,
        handlers::placement::placement_custom,
        handlers::hosts::list_hosts,
        handlers::images::list_flavors,
        handlers::images::list_images,
        handlers::images::upload_image,
        handlers::system::health,
        handlers::system::version,
    ),
    components(schemas(
        ApiError,
        dto::LoginRequest,
        dto::LoginResponse,
        dto::TopologyNodeRequest,
        dto::TopologyLinkRequest,
        dto::SliceTopologyRequest,
        dto::CreateSliceResponse,
        dto::UpdateSliceResponse,
        dto::DeleteSliceResponse,
        dto::VmSummary,
        dto::SliceSummary,
        dto::SlicesResponse,
        dto::FlavorResponse,
        dto::ImageResponse,
        dto::SlicePlacementVm,
        dto::SlicePlacementRequest,
        dto::CustomPlacementVm,
        dto::CustomPlacementRequest,
        dto::HostAssignmentResponse,
        dto::PlacementResponse,
        dto::VmDeployOutcomeResponse,
        dto::DeployResponse,
        dto::HostSnapshotResponse,
        dto::HostsResponse,
        dto::VersionResponse,
        dto::HealthResponse,
    ))
)]
pub struct ApiDoc;

pub fn create_router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/slices", get(handlers::slices::list_slices))
        .route("/slices/{id}", get(handlers::slices::get_slice))
        .route("/slices/create", post(handlers::slices::create_slice))
        .route("/slices/update/{id}", post(handlers::slices::update_slice))
        .route("/slices/deploy/{id}", post(handlers::slices::deploy_slice))
        .route("/slices/delete/{id}", delete(handlers::slices::delete_slice))
        .route("/placement/slice/{id}", post(handlers::placement::placement_for_slice))
        .route("/placement/custom", post(handlers::placement::placement_custom))
        .route("/hosts", get(handlers::hosts::list_hosts))
        .route("/flavors", get(handlers::images::list_flavors))
        .route("/images", get(handlers::images::list_images))
        .route("/images/upload", post(handlers::images::upload_image));

    let public = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/health", get(handlers::system::health))
        .route("/version", get(handlers::system::version));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public)
        .merge(authenticated)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
