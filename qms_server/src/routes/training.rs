//! Training records and the competence matrix.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, put};
use axum::Router;
use serde_json::Value;

use super::{deleted, AppState};
use crate::auth::rbac::Resource;
use crate::auth::AuthUser;
use crate::error::{ensure_valid, ApiError, ApiJson};
use crate::models::training::{
    CourseCompliance, CreateTrainingRequest, TrainingOverview, TrainingRecord,
    UpdateTrainingRequest,
};
use crate::services::training_service;

const KIND: &str = "training";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(overview).post(create_record))
        .route("/matrix", get(matrix))
        .route("/{id}", put(update_record).delete(delete_record))
}

async fn overview(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<TrainingOverview>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(training_service::overview(&mut conn, state.config.thresholds()).await?))
}

async fn create_record(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateTrainingRequest>,
) -> Result<(StatusCode, Json<TrainingRecord>), ApiError> {
    user.require_create(KIND)?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let record = training_service::create(&mut conn, req.into_new(user.id)).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_record(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateTrainingRequest>,
) -> Result<Json<TrainingRecord>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let current = training_service::find(&mut conn, id).await?;
    user.require_edit(Resource::new(KIND, current.create_uid))?;
    Ok(Json(training_service::update(&mut conn, id, req.into_changes(user.id)).await?))
}

async fn delete_record(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;
    let current = training_service::find(&mut conn, id).await?;
    user.require_delete(Resource::new(KIND, current.create_uid))?;
    training_service::delete(&mut conn, id).await?;
    Ok(deleted("Training record deleted successfully"))
}

async fn matrix(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<CourseCompliance>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(training_service::matrix(&mut conn, state.config.thresholds()).await?))
}
