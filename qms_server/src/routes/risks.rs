//! Risk register endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::Value;

use super::{deleted, AppState};
use crate::auth::rbac::Resource;
use crate::auth::AuthUser;
use crate::error::{ensure_valid, ApiError, ApiJson};
use crate::models::risk::{CreateRiskRequest, RiskView, UpdateRiskRequest};
use crate::services::risk_service::{self, RiskMatrix};

const KIND: &str = "risk";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_risks).post(create_risk))
        .route("/matrix", get(matrix))
        .route("/{id}", get(get_risk).put(update_risk).delete(delete_risk))
}

async fn list_risks(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<RiskView>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(risk_service::list(&mut conn).await?))
}

async fn create_risk(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateRiskRequest>,
) -> Result<(StatusCode, Json<RiskView>), ApiError> {
    user.require_create(KIND)?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let risk = risk_service::create(&mut conn, req.into_new(user.id)).await?;
    Ok((StatusCode::CREATED, Json(risk)))
}

async fn get_risk(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<RiskView>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(risk_service::find(&mut conn, id).await?.into()))
}

async fn update_risk(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateRiskRequest>,
) -> Result<Json<RiskView>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let current = risk_service::find(&mut conn, id).await?;
    user.require_edit(Resource::new(KIND, current.create_uid))?;
    Ok(Json(risk_service::update(&mut conn, id, req.into_changes(user.id)).await?))
}

async fn delete_risk(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;
    let current = risk_service::find(&mut conn, id).await?;
    user.require_delete(Resource::new(KIND, current.create_uid))?;
    risk_service::delete(&mut conn, id).await?;
    Ok(deleted("Risk deleted successfully"))
}

async fn matrix(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<RiskMatrix>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(risk_service::matrix(&mut conn).await?))
}
