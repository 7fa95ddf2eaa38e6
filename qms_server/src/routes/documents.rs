//! Controlled documents.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;

use super::AppState;
use crate::auth::AuthUser;
use crate::error::{ensure_valid, ApiError, ApiJson};
use crate::models::document::{CreateDocumentRequest, DocumentView};
use crate::models::vocab::DocumentType;
use crate::services::document_service;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_documents).post(create_document))
}

async fn list_documents(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<DocumentView>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(document_service::list(&mut conn).await?))
}

async fn create_document(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentView>), ApiError> {
    let kind = match req.doc_type {
        DocumentType::Policy => "policy",
        DocumentType::Procedure => "procedure",
        _ => "document",
    };
    user.require_create(kind)?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let document = document_service::create(&mut conn, req.into_new(user.id)).await?;
    Ok((StatusCode::CREATED, Json(document)))
}
