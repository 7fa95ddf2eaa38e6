//! Sign-in and current user.

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;

use super::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson};
use crate::models::user::{SignInRequest, SignInResponse, UserView};
use crate::services::user_service::{self, InvalidCredentials};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signin", post(sign_in))
        .route("/me", get(me))
}

async fn sign_in(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignInRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(vec![
            "Email and password are required".to_string(),
        ]));
    }
    let mut conn = state.conn().await?;
    match user_service::sign_in(&mut conn, &state.config, req).await {
        Ok(response) => Ok(Json(response)),
        Err(e) if e.is::<InvalidCredentials>() => Err(ApiError::Unauthorized),
        Err(e) => Err(e.into()),
    }
}

async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Json<UserView>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(user_service::find(&mut conn, user.id).await?))
}
