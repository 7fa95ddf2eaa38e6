//! HTTP error mapping and request extractors that report failures as JSON.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Json, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::de::DeserializeOwned;
use serde_json::json;

/// Error returned by every API handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Validation failed")]
    Validation(Vec<String>),
    #[error("{0}")]
    Conflict(String),
    #[error("Internal server error")]
    Internal(anyhow::Error),
}

/// Business-rule failure raised inside a service.
///
/// Services return `anyhow::Result`; handlers downcast this back into the
/// matching [`ApiError`] so the client sees a 4xx instead of a 500.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
}

impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        ApiError::NotFound(format!("{entity} not found"))
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<Rejection>() {
            Ok(Rejection::Invalid(msg)) => return ApiError::BadRequest(msg),
            Ok(Rejection::NotFound(msg)) => return ApiError::NotFound(msg),
            Ok(Rejection::Conflict(msg)) => return ApiError::Conflict(msg),
            Err(err) => err,
        };
        match err.downcast::<DieselError>() {
            Ok(diesel_err) => diesel_err.into(),
            Err(err) => ApiError::Internal(err),
        }
    }
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => ApiError::NotFound("Record not found".to_string()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                tracing::info!(
                    constraint = info.constraint_name().unwrap_or_default(),
                    detail = info.message(),
                    "Unique constraint violated"
                );
                ApiError::Conflict("A record with the same identifier already exists".to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                tracing::info!(
                    constraint = info.constraint_name().unwrap_or_default(),
                    detail = info.message(),
                    "Foreign key violated"
                );
                ApiError::BadRequest("Referenced record does not exist or is still in use".to_string())
            }
            other => ApiError::Internal(other.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(details) => json!({
                "error": self.to_string(),
                "details": details,
            }),
            ApiError::Internal(err) => {
                tracing::error!(error = %format!("{err:#}"), "Request failed");
                crate::metrics::request_failed("internal");
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };
        if status.is_client_error() {
            crate::metrics::request_failed(status.as_str());
        }
        (status, Json(body)).into_response()
    }
}

/// `Json` extractor whose rejection is a 400 [`ApiError::Validation`].
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::Validation(vec![rejection.body_text()])),
        }
    }
}

/// `Query` extractor whose rejection is a 400 [`ApiError::Validation`].
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn query_rejection(rejection: QueryRejection) -> ApiError {
    ApiError::Validation(vec![rejection.body_text()])
}

/// Turn a list of field errors into a result.
pub fn ensure_valid(errors: Vec<String>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_map_to_client_errors() {
        let err: ApiError = anyhow::Error::new(Rejection::Invalid("bad".into())).into();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "bad"));

        let err: ApiError = anyhow::Error::new(DieselError::NotFound).into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn constraint_violations_hide_database_detail() {
        let raw = "duplicate key value violates unique constraint \"qms_audits_audit_number_key\"";
        let err: ApiError = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(raw.to_string()),
        )
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(!err.to_string().contains("qms_audits"));

        let err: ApiError = anyhow::Error::new(DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new("violates foreign key constraint \"qms_audits_audit_type_id_fkey\"".to_string()),
        ))
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(!err.to_string().contains("fkey"));
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "Internal server error");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn ensure_valid_collects_messages() {
        assert!(ensure_valid(vec![]).is_ok());
        let err = ensure_valid(vec!["title is required".into()]).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref d) if d.len() == 1));
    }
}
