//! Management review meetings and their attendees, inputs, outputs,
//! actions and evidence links.

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
use crate::models::management_review::{
    CreateAttendeeRequest, CreateEvidenceRequest, CreateInputRequest,
    CreateManagementReviewRequest, CreateOutputRequest, CreateReviewActionRequest,
    LoadTemplateRequest, ManagementReviewView, ReviewAction, ReviewActionQuery,
    ReviewActionSummary, ReviewAttendee, ReviewEvidence, ReviewInput, ReviewListQuery,
    ReviewOutput, ReviewPage, TemplateLoad, UpdateAttendeeRequest, UpdateEvidenceRequest,
    UpdateInputRequest, UpdateManagementReviewRequest, UpdateOutputRequest,
    UpdateReviewActionRequest,
};
use crate::services::management_review_service as service;

const KIND: &str = "management-review";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reviews).post(create_review))
        .route("/actions", get(list_actions))
        .route("/{id}", get(get_review).put(update_review).delete(delete_review))
        .route("/{id}/load-template", post(load_template))
        .route("/{id}/attendees", post(add_attendee))
        .route("/{id}/attendees/{sub_id}", put(update_attendee).delete(remove_attendee))
        .route("/{id}/inputs", post(add_input))
        .route("/{id}/inputs/{sub_id}", put(update_input).delete(delete_input))
        .route("/{id}/outputs", post(add_output))
        .route("/{id}/outputs/{sub_id}", put(update_output).delete(delete_output))
        .route("/{id}/actions", post(add_action))
        .route("/{id}/actions/{sub_id}", put(update_action).delete(delete_action))
        .route("/{id}/evidence", post(add_evidence))
        .route("/{id}/evidence/{sub_id}", put(update_evidence).delete(delete_evidence))
}

/// Sub-records follow the edit rights of the review they belong to.
async fn editable_review(
    state: &AppState,
    user: &AuthUser,
    review_id: i64,
) -> Result<DbConn, ApiError> {
    let mut conn = state.conn().await?;
    let review = service::find(&mut conn, review_id).await?;
    user.require_edit(Resource::new(KIND, review.create_uid))?;
    Ok(conn)
}

async fn list_reviews(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<ReviewListQuery>,
) -> Result<Json<ReviewPage>, ApiError> {
    ensure_valid(query.validate())?;
    let limit = state.config.page_size(query.limit);
    let mut conn = state.conn().await?;
    Ok(Json(service::list(&mut conn, &query, limit).await?))
}

async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateManagementReviewRequest>,
) -> Result<(StatusCode, Json<ManagementReviewView>), ApiError> {
    user.require_create(KIND)?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let review = service::create(&mut conn, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn get_review(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ManagementReviewView>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(service::get(&mut conn, id).await?))
}

async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateManagementReviewRequest>,
) -> Result<Json<ManagementReviewView>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = editable_review(&state, &user, id).await?;
    Ok(Json(service::update(&mut conn, id, req, user.id).await?))
}

async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;
    let review = service::find(&mut conn, id).await?;
    user.require_delete(Resource::new(KIND, review.create_uid))?;
    service::delete(&mut conn, id).await?;
    Ok(deleted("Review deleted successfully"))
}

async fn load_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<LoadTemplateRequest>,
) -> Result<Json<TemplateLoad>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = editable_review(&state, &user, id).await?;
    Ok(Json(service::load_template(&mut conn, id, req, user.id).await?))
}

async fn list_actions(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<ReviewActionQuery>,
) -> Result<Json<Vec<ReviewActionSummary>>, ApiError> {
    let limit = state.config.page_size(query.limit);
    let mut conn = state.conn().await?;
    Ok(Json(service::list_actions(&mut conn, &query, limit).await?))
}

// ── Attendees ──

async fn add_attendee(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<CreateAttendeeRequest>,
) -> Result<(StatusCode, Json<ReviewAttendee>), ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = editable_review(&state, &user, id).await?;
    let attendee = service::add_attendee(&mut conn, id, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(attendee)))
}

async fn update_attendee(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, sub_id)): Path<(i64, i64)>,
    ApiJson(req): ApiJson<UpdateAttendeeRequest>,
) -> Result<Json<ReviewAttendee>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = editable_review(&state, &user, id).await?;
    Ok(Json(service::update_attendee(&mut conn, id, sub_id, req, user.id).await?))
}

async fn remove_attendee(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, sub_id)): Path<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = editable_review(&state, &user, id).await?;
    service::remove_attendee(&mut conn, id, sub_id, user.id).await?;
    Ok(deleted("Attendee removed successfully"))
}

// ── Inputs ──

async fn add_input(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<CreateInputRequest>,
) -> Result<(StatusCode, Json<ReviewInput>), ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = editable_review(&state, &user, id).await?;
    let input = service::add_input(&mut conn, id, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(input)))
}

async fn update_input(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, sub_id)): Path<(i64, i64)>,
    ApiJson(req): ApiJson<UpdateInputRequest>,
) -> Result<Json<ReviewInput>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = editable_review(&state, &user, id).await?;
    Ok(Json(service::update_input(&mut conn, id, sub_id, req).await?))
}

async fn delete_input(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, sub_id)): Path<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = editable_review(&state, &user, id).await?;
    service::delete_input(&mut conn, id, sub_id).await?;
    Ok(deleted("Input deleted successfully"))
}

// ── Outputs ──

async fn add_output(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<CreateOutputRequest>,
) -> Result<(StatusCode, Json<ReviewOutput>), ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = editable_review(&state, &user, id).await?;
    let output = service::add_output(&mut conn, id, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(output)))
}

async fn update_output(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, sub_id)): Path<(i64, i64)>,
    ApiJson(req): ApiJson<UpdateOutputRequest>,
) -> Result<Json<ReviewOutput>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = editable_review(&state, &user, id).await?;
    Ok(Json(service::update_output(&mut conn, id, sub_id, req).await?))
}

async fn delete_output(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, sub_id)): Path<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = editable_review(&state, &user, id).await?;
    service::delete_output(&mut conn, id, sub_id).await?;
    Ok(deleted("Output deleted successfully"))
}

// ── Actions ──

async fn add_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<CreateReviewActionRequest>,
) -> Result<(StatusCode, Json<ReviewAction>), ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = editable_review(&state, &user, id).await?;
    let action = service::add_action(&mut conn, id, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(action)))
}

async fn update_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, sub_id)): Path<(i64, i64)>,
    ApiJson(req): ApiJson<UpdateReviewActionRequest>,
) -> Result<Json<ReviewAction>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = editable_review(&state, &user, id).await?;
    Ok(Json(service::update_action(&mut conn, id, sub_id, req).await?))
}

async fn delete_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, sub_id)): Path<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = editable_review(&state, &user, id).await?;
    service::delete_action(&mut conn, id, sub_id).await?;
    Ok(deleted("Action deleted successfully"))
}

// ── Evidence ──

async fn add_evidence(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<CreateEvidenceRequest>,
) -> Result<(StatusCode, Json<ReviewEvidence>), ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = editable_review(&state, &user, id).await?;
    let evidence = service::add_evidence(&mut conn, id, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(evidence)))
}

async fn update_evidence(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, sub_id)): Path<(i64, i64)>,
    ApiJson(req): ApiJson<UpdateEvidenceRequest>,
) -> Result<Json<ReviewEvidence>, ApiError> {
    ensure_valid(req.validate())?;
    let mut conn = editable_review(&state, &user, id).await?;
    Ok(Json(service::update_evidence(&mut conn, id, sub_id, req).await?))
}

async fn delete_evidence(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, sub_id)): Path<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = editable_review(&state, &user, id).await?;
    service::delete_evidence(&mut conn, id, sub_id).await?;
    Ok(deleted("Evidence deleted successfully"))
}
