use axum::extract::State;
use axum::Json;

use crate::auth::{issue_token, verify_password};
use crate::audit;
use crate::rest::dto::LoginResponse;
use crate::rest::error::ApiError;
use crate::state::AppState;
use slicectl_core::error::OrchestratorError;

#[utoipa::path(
    post,
    path = "/login",
    request_body = crate::rest::dto::LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Bad credentials", body = ApiError),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    axum::extract::Form(body): axum::extract::Form<crate::rest::dto::LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .store
        .get_user_by_username(&body.username)
        .await?
        .ok_or_else(|| OrchestratorError::Auth("invalid username or password".into()))?;

    if !verify_password(&body.password, &user.password_hash) {
        audit::login_failed(&body.username);
        return Err(OrchestratorError::Auth("invalid username or password".into()).into());
    }

    let token = issue_token(&user, &state.settings.jwt_secret, state.settings.token_ttl_minutes)?;
    audit::login_succeeded(&body.username);

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer".into(),
        role: user.role,
    }))
}
