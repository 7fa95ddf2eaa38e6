//! Audit programme endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;

use super::{deleted, AppState};
use crate::auth::rbac::Resource;
use crate::auth::AuthUser;
use crate::error::{ensure_valid, ApiError, ApiJson, ApiQuery};
use crate::models::audit::{
    AuditFinding, AuditListQuery, AuditPage, AuditType, AuditTypeQuery, AuditView,
    CreateAuditRequest, CreateAuditTypeRequest, CreateFindingRequest, UpdateAuditRequest,
};
use crate::services::audit_service;

const KIND: &str = "audit";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_audits).post(create_audit))
        .route("/types", get(list_types).post(create_type))
        .route("/{id}", get(get_audit).put(update_audit).delete(delete_audit))
        .route("/{id}/findings", post(add_finding))
}

async fn list_types(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<AuditTypeQuery>,
) -> Result<Json<Vec<AuditType>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(audit_service::list_types(&mut conn, &query).await?))
}

async fn create_type(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateAuditTypeRequest>,
) -> Result<(StatusCode, Json<AuditType>), ApiError> {
    user.require_create("audit-type")?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let created = audit_service::create_type(&mut conn, req.into_new(user.id)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_audits(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<AuditListQuery>,
) -> Result<Json<AuditPage>, ApiError> {
    ensure_valid(query.validate())?;
    let limit = state.config.page_size(query.limit);
    let mut conn = state.conn().await?;
    Ok(Json(audit_service::list(&mut conn, &query, limit).await?))
}

async fn create_audit(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateAuditRequest>,
) -> Result<(StatusCode, Json<AuditView>), ApiError> {
    user.require_create(KIND)?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let audit = audit_service::create(&mut conn, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(audit)))
}

async fn get_audit(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<AuditView>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(audit_service::get(&mut conn, id).await?))
}

async fn update_audit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateAuditRequest>,
) -> Result<Json<AuditView>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let current = audit_service::find(&mut conn, id).await?;
    user.require_edit(Resource::new(KIND, current.create_uid))?;
    Ok(Json(audit_service::update(&mut conn, id, req, user.id).await?))
}

async fn delete_audit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;
    let current = audit_service::find(&mut conn, id).await?;
    user.require_delete(Resource::new(KIND, current.create_uid))?;
    audit_service::delete(&mut conn, id).await?;
    Ok(deleted("Audit deleted successfully"))
}

async fn add_finding(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<CreateFindingRequest>,
) -> Result<(StatusCode, Json<AuditFinding>), ApiError> {
    user.require_create("audit-finding")?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let finding = audit_service::add_finding(&mut conn, id, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(finding)))
}
