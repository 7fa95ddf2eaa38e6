//! Management map, minimal path wizard and breadcrumbs.

use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;

use super::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson};
use crate::management_map::path::{PathRequest, WizardResult};
use crate::management_map::{ManagementMap, MapNode};
use crate::services::map_service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(management_map))
        .route("/path", post(minimal_path))
        .route("/breadcrumbs/{node_id}", get(breadcrumbs))
}

async fn management_map(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ManagementMap>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(map_service::map(&mut conn).await?))
}

async fn minimal_path(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(req): ApiJson<PathRequest>,
) -> Result<Json<WizardResult>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(map_service::minimal_path(&mut conn, &req).await?))
}

async fn breadcrumbs(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(node_id): Path<String>,
) -> Result<Json<Vec<MapNode>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(map_service::breadcrumbs(&mut conn, &node_id).await?))
}
