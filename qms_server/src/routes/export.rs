//! CSV register exports and the auditor pack download.

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;

use super::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::export::{csv, ExportEntity};
use crate::services::export_service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auditor-pack", get(auditor_pack))
        .route("/{entity}", get(export_csv))
}

fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{filename}\"")
}

async fn export_csv(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(entity): Path<String>,
) -> Result<Response, ApiError> {
    let entity: ExportEntity = entity.parse().map_err(ApiError::BadRequest)?;
    let mut conn = state.conn().await?;
    let rows = export_service::rows(&mut conn, entity).await?;
    let body = csv::to_csv(&rows);
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, attachment(&entity.filename(Utc::now()))),
        ],
        body,
    )
        .into_response())
}

async fn auditor_pack(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Response, ApiError> {
    let mut conn = state.conn().await?;
    let pack = export_service::auditor_pack(&mut conn, &state.config.organization).await?;
    let body = serde_json::to_string_pretty(&pack).map_err(|e| ApiError::Internal(e.into()))?;
    Ok((
        [
            (CONTENT_TYPE, "application/json".to_string()),
            (CONTENT_DISPOSITION, attachment(&pack.filename())),
        ],
        body,
    )
        .into_response())
}
