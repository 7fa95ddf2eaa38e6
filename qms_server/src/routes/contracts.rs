//! Contract review endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};

use super::AppState;
use crate::auth::rbac::Resource;
use crate::auth::AuthUser;
use crate::error::{ensure_valid, ApiError, ApiJson, ApiQuery};
use crate::models::contract::{
    ContractReviewQuery, ContractReviewView, ContractStats, CreateContractReviewRequest,
    UpdateContractReviewRequest,
};
use crate::services::{contract_service, user_service};

const KIND: &str = "contract-review";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contracts).post(create_contract))
        .route("/stats", get(stats))
        .route("/{id}", get(get_contract).put(update_contract).delete(delete_contract))
}

async fn list_contracts(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<ContractReviewQuery>,
) -> Result<Json<Vec<ContractReviewView>>, ApiError> {
    let limit = state.config.page_size(query.limit);
    let mut conn = state.conn().await?;
    Ok(Json(contract_service::list(&mut conn, &query, limit).await?))
}

async fn create_contract(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateContractReviewRequest>,
) -> Result<(StatusCode, Json<ContractReviewView>), ApiError> {
    user.require_create(KIND)?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let name = user_service::display_name(&mut conn, user.id).await?;
    let contract = contract_service::create(&mut conn, req, user.id, name).await?;
    Ok((StatusCode::CREATED, Json(contract)))
}

async fn get_contract(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ContractReviewView>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(contract_service::get(&mut conn, id).await?))
}

async fn update_contract(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateContractReviewRequest>,
) -> Result<Json<ContractReviewView>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let current = contract_service::find(&mut conn, id).await?;
    user.require_edit(Resource::new(KIND, current.create_uid))?;
    let name = user_service::display_name(&mut conn, user.id).await?;
    Ok(Json(contract_service::update(&mut conn, id, req, user.id, name).await?))
}

async fn delete_contract(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;
    let current = contract_service::find(&mut conn, id).await?;
    user.require_delete(Resource::new(KIND, current.create_uid))?;
    contract_service::delete(&mut conn, id).await?;
    Ok(Json(json!({ "message": "Contract review deleted successfully" })))
}

async fn stats(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ContractStats>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(contract_service::stats(&mut conn).await?))
}
