//! Bearer-token extraction: every route except `/login`, `/health`, and
//! `/version` requires `Authorization: Bearer <token>`.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use slicectl_core::config::Settings;
use slicectl_core::error::OrchestratorError;

use crate::auth::{verify_token, AuthenticatedUser};
use crate::rest::error::ApiError;
use crate::state::AppState;

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let settings: &Settings = &app_state.settings;

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| OrchestratorError::Auth("missing Authorization header".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| OrchestratorError::Auth("expected a Bearer token".into()))?;

        let claims = verify_token(token, &settings.jwt_secret)?;

        let user = app_state
            .store
            .get_user_by_username(&claims.sub)
            .await?
            .ok_or_else(|| OrchestratorError::Auth("token subject no longer exists".into()))?;

        Ok(AuthenticatedUser {
            user_id: user.id,
            username: user.username,
            role: user.role,
        })
    }
}
