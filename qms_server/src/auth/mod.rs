//! Session authentication and role checks for API handlers.

pub mod password;
pub mod rbac;
pub mod token;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;

use crate::error::ApiError;
use crate::routes::AppState;
use rbac::{Resource, Role};

/// The signed-in user, taken from a `Bearer` session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

impl AuthUser {
    pub fn require_create(&self, kind: &str) -> Result<(), ApiError> {
        if rbac::can_create(self.role, kind) {
            Ok(())
        } else {
            tracing::debug!(user_id = self.id, role = %self.role, kind, "Create denied");
            Err(ApiError::Forbidden)
        }
    }

    pub fn require_edit(&self, resource: Resource<'_>) -> Result<(), ApiError> {
        if rbac::can_edit(self.role, self.id, resource) {
            Ok(())
        } else {
            tracing::debug!(user_id = self.id, role = %self.role, kind = resource.kind, "Edit denied");
            Err(ApiError::Forbidden)
        }
    }

    pub fn require_delete(&self, resource: Resource<'_>) -> Result<(), ApiError> {
        if rbac::can_delete(self.role, self.id, resource) {
            Ok(())
        } else {
            tracing::debug!(user_id = self.id, role = %self.role, kind = resource.kind, "Delete denied");
            Err(ApiError::Forbidden)
        }
    }
}

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer(parts).ok_or(ApiError::Unauthorized)?;
        match token::verify(&state.config.auth_secret, token, Utc::now()) {
            Ok(claims) => Ok(AuthUser {
                id: claims.user_id,
                role: claims.role,
            }),
            Err(e) => {
                tracing::debug!(error = %e, "Session rejected");
                Err(ApiError::Unauthorized)
            }
        }
    }
}
