//! Waste types, records, facilities, transporters and statistics.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::Value;

use super::{deleted, AppState};
use crate::auth::rbac::Resource;
use crate::auth::AuthUser;
use crate::error::{ensure_valid, ApiError, ApiJson, ApiQuery};
use crate::models::waste::{
    CreateFacilityRequest, CreateTransporterRequest, CreateWasteRecordRequest,
    CreateWasteTypeRequest, FacilityQuery, TransporterQuery, UpdateWasteRecordRequest,
    UpdateWasteTypeRequest, WasteFacility, WasteRecordQuery, WasteRecordView, WasteStats,
    WasteTransporter, WasteType, WasteTypeQuery,
};
use crate::services::waste_service;

const TYPE_KIND: &str = "waste-type";
const RECORD_KIND: &str = "waste-record";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/types", get(list_types).post(create_type))
        .route("/types/{id}", get(get_type).put(update_type).delete(delete_type))
        .route("/records", get(list_records).post(create_record))
        .route("/records/{id}", get(get_record).put(update_record).delete(delete_record))
        .route("/facilities", get(list_facilities).post(create_facility))
        .route("/transporters", get(list_transporters).post(create_transporter))
        .route("/stats", get(stats))
}

// ── Types ──

async fn list_types(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<WasteTypeQuery>,
) -> Result<Json<Vec<WasteType>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(waste_service::list_types(&mut conn, &query).await?))
}

async fn create_type(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateWasteTypeRequest>,
) -> Result<(StatusCode, Json<WasteType>), ApiError> {
    user.require_create(TYPE_KIND)?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let created = waste_service::create_type(&mut conn, req.into_new(user.id)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_type(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<WasteType>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(waste_service::find_type(&mut conn, id).await?))
}

async fn update_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateWasteTypeRequest>,
) -> Result<Json<WasteType>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let current = waste_service::find_type(&mut conn, id).await?;
    user.require_edit(Resource::new(TYPE_KIND, current.create_uid))?;
    Ok(Json(waste_service::update_type(&mut conn, id, req.into_changes(user.id)).await?))
}

async fn delete_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;
    let current = waste_service::find_type(&mut conn, id).await?;
    user.require_delete(Resource::new(TYPE_KIND, current.create_uid))?;
    waste_service::delete_type(&mut conn, id).await?;
    Ok(deleted("Waste type deleted successfully"))
}

// ── Records ──

async fn list_records(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<WasteRecordQuery>,
) -> Result<Json<Vec<WasteRecordView>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(waste_service::list_records(&mut conn, &query).await?))
}

async fn create_record(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateWasteRecordRequest>,
) -> Result<(StatusCode, Json<WasteRecordView>), ApiError> {
    user.require_create(RECORD_KIND)?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let record = waste_service::create_record(&mut conn, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_record(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<WasteRecordView>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(waste_service::get_record(&mut conn, id).await?))
}

async fn update_record(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateWasteRecordRequest>,
) -> Result<Json<WasteRecordView>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let current = waste_service::find_record(&mut conn, id).await?;
    user.require_edit(Resource::new(RECORD_KIND, current.create_uid))?;
    Ok(Json(waste_service::update_record(&mut conn, id, req, user.id).await?))
}

async fn delete_record(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;
    let current = waste_service::find_record(&mut conn, id).await?;
    user.require_delete(Resource::new(RECORD_KIND, current.create_uid))?;
    waste_service::delete_record(&mut conn, id).await?;
    Ok(deleted("Waste record deleted successfully"))
}

// ── Facilities and transporters ──

async fn list_facilities(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<FacilityQuery>,
) -> Result<Json<Vec<WasteFacility>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(waste_service::list_facilities(&mut conn, &query).await?))
}

async fn create_facility(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateFacilityRequest>,
) -> Result<(StatusCode, Json<WasteFacility>), ApiError> {
    user.require_create("waste-facility")?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let facility = waste_service::create_facility(&mut conn, req.into_new(user.id)).await?;
    Ok((StatusCode::CREATED, Json(facility)))
}

async fn list_transporters(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<TransporterQuery>,
) -> Result<Json<Vec<WasteTransporter>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(waste_service::list_transporters(&mut conn, &query).await?))
}

async fn create_transporter(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateTransporterRequest>,
) -> Result<(StatusCode, Json<WasteTransporter>), ApiError> {
    user.require_create("waste-transporter")?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let transporter = waste_service::create_transporter(&mut conn, req.into_new(user.id)).await?;
    Ok((StatusCode::CREATED, Json(transporter)))
}

async fn stats(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<WasteStats>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(waste_service::stats(&mut conn).await?))
}
