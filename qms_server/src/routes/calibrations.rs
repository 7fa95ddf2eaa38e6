//! Equipment register and calibration schedule.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde_json::Value;

use super::{deleted, AppState};
use crate::auth::rbac::Resource;
use crate::auth::AuthUser;
use crate::error::{ensure_valid, ApiError, ApiJson, ApiQuery};
use crate::models::calibration::{
    CalibrationQuery, CalibrationStats, CalibrationView, CreateCalibrationRequest,
    CreateEquipmentRequest, Equipment, EquipmentStats, EquipmentView, UpdateCalibrationRequest,
    UpdateEquipmentRequest,
};
use crate::services::calibration_service;

const EQUIPMENT: &str = "equipment";
const CALIBRATION: &str = "calibration";

/// Routes nested at `/api/equipment`.
pub fn equipment_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_equipment).post(create_equipment))
        .route("/stats", get(equipment_stats))
        .route("/{id}", get(get_equipment).put(update_equipment).delete(delete_equipment))
}

/// Routes nested at `/api/calibrations`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_calibrations).post(create_calibration))
        .route("/stats", get(calibration_stats))
        .route(
            "/{id}",
            get(get_calibration).put(update_calibration).delete(delete_calibration),
        )
}

async fn list_equipment(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<EquipmentView>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(calibration_service::list_equipment(&mut conn, Utc::now()).await?))
}

async fn create_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateEquipmentRequest>,
) -> Result<(StatusCode, Json<Equipment>), ApiError> {
    user.require_create(EQUIPMENT)?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let equipment = calibration_service::create_equipment(&mut conn, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

async fn get_equipment(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Equipment>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(calibration_service::find_equipment(&mut conn, id).await?))
}

async fn update_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateEquipmentRequest>,
) -> Result<Json<Equipment>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let current = calibration_service::find_equipment(&mut conn, id).await?;
    user.require_edit(Resource::new(EQUIPMENT, current.create_uid))?;
    Ok(Json(calibration_service::update_equipment(&mut conn, id, req, user.id).await?))
}

async fn delete_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;
    let current = calibration_service::find_equipment(&mut conn, id).await?;
    user.require_delete(Resource::new(EQUIPMENT, current.create_uid))?;
    calibration_service::delete_equipment(&mut conn, id).await?;
    Ok(deleted("Equipment deleted successfully"))
}

async fn equipment_stats(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<EquipmentStats>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(calibration_service::equipment_stats(&mut conn, Utc::now()).await?))
}

async fn list_calibrations(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<CalibrationQuery>,
) -> Result<Json<Vec<CalibrationView>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(calibration_service::list_calibrations(&mut conn, &query, Utc::now()).await?))
}

async fn create_calibration(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateCalibrationRequest>,
) -> Result<(StatusCode, Json<CalibrationView>), ApiError> {
    user.require_create(CALIBRATION)?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let calibration =
        calibration_service::create_calibration(&mut conn, req, user.id, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(calibration)))
}

async fn get_calibration(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<CalibrationView>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(calibration_service::get_calibration(&mut conn, id, Utc::now()).await?))
}

async fn update_calibration(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateCalibrationRequest>,
) -> Result<Json<CalibrationView>, ApiError> {
    let mut conn = state.conn().await?;
    let current = calibration_service::get_calibration(&mut conn, id, Utc::now()).await?;
    user.require_edit(Resource::new(CALIBRATION, current.calibration.create_uid))?;
    Ok(Json(
        calibration_service::update_calibration(&mut conn, id, req, user.id, Utc::now()).await?,
    ))
}

async fn delete_calibration(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;
    let current = calibration_service::get_calibration(&mut conn, id, Utc::now()).await?;
    user.require_delete(Resource::new(CALIBRATION, current.calibration.create_uid))?;
    calibration_service::delete_calibration(&mut conn, id).await?;
    Ok(deleted("Calibration deleted successfully"))
}

async fn calibration_stats(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<CalibrationStats>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(calibration_service::calibration_stats(&mut conn, Utc::now()).await?))
}
