//! Nonconformance, complaint, supplier and improvement cases.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use serde_json::Value;

use super::{deleted, AppState};
use crate::auth::rbac::Resource;
use crate::auth::AuthUser;
use crate::db::DbConn;
use crate::error::{ensure_valid, ApiError, ApiJson, ApiQuery};
use crate::models::nonconformance::{
    CloseNonconformanceRequest, CreateNcActionRequest, CreateNonconformanceRequest, NcAction,
    NonconformanceView, ParetoQuery, UpdateNcActionRequest, UpdateNonconformanceRequest,
};
use crate::models::vocab::CaseType;
use crate::services::nonconformance_service::{self, ParetoReport};

const KIND: &str = "nonconformity";

fn create_kind(case_type: CaseType) -> &'static str {
    match case_type {
        CaseType::Improvement => "improvement-opportunity",
        _ => KIND,
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cases).post(create_case))
        .route("/pareto", get(pareto))
        .route("/{id}", get(get_case).put(update_case).delete(delete_case))
        .route("/{id}/actions", post(add_action))
        .route("/{id}/actions/{action_id}", put(update_action).delete(delete_action))
        .route("/{id}/close", post(close_case))
}

/// Changes to a case or its actions need edit rights on the case.
async fn require_case_edit(conn: &mut DbConn, user: AuthUser, id: i64) -> Result<(), ApiError> {
    let case = nonconformance_service::find(conn, id).await?;
    user.require_edit(Resource::new(KIND, case.create_uid))
}

async fn list_cases(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<NonconformanceView>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(nonconformance_service::list(&mut conn).await?))
}

async fn create_case(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateNonconformanceRequest>,
) -> Result<(StatusCode, Json<NonconformanceView>), ApiError> {
    user.require_create(create_kind(req.case_type))?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let case = nonconformance_service::create(&mut conn, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

async fn get_case(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<NonconformanceView>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(nonconformance_service::get(&mut conn, id).await?))
}

async fn update_case(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateNonconformanceRequest>,
) -> Result<Json<NonconformanceView>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    require_case_edit(&mut conn, user, id).await?;
    Ok(Json(nonconformance_service::update(&mut conn, id, req, user.id).await?))
}

async fn delete_case(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;
    let case = nonconformance_service::find(&mut conn, id).await?;
    user.require_delete(Resource::new(KIND, case.create_uid))?;
    nonconformance_service::delete(&mut conn, id).await?;
    Ok(deleted("Nonconformance deleted successfully"))
}

async fn add_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<CreateNcActionRequest>,
) -> Result<(StatusCode, Json<NcAction>), ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    require_case_edit(&mut conn, user, id).await?;
    let action = nonconformance_service::add_action(&mut conn, id, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(action)))
}

async fn update_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, action_id)): Path<(i64, i64)>,
    ApiJson(req): ApiJson<UpdateNcActionRequest>,
) -> Result<Json<NcAction>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    require_case_edit(&mut conn, user, id).await?;
    let action = nonconformance_service::update_action(&mut conn, id, action_id, req, user.id).await?;
    Ok(Json(action))
}

async fn delete_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, action_id)): Path<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;
    require_case_edit(&mut conn, user, id).await?;
    nonconformance_service::delete_action(&mut conn, id, action_id).await?;
    Ok(deleted("Action deleted successfully"))
}

async fn close_case(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<CloseNonconformanceRequest>,
) -> Result<Json<NonconformanceView>, ApiError> {
    let mut conn = state.conn().await?;
    require_case_edit(&mut conn, user, id).await?;
    Ok(Json(nonconformance_service::close(&mut conn, id, req, user.id).await?))
}

async fn pareto(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<ParetoQuery>,
) -> Result<Json<ParetoReport>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(nonconformance_service::pareto(&mut conn, &query).await?))
}
