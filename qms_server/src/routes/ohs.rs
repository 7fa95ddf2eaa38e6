//! OH&S hazards, incidents and safety metrics.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use super::AppState;
use crate::auth::AuthUser;
use crate::error::{ensure_valid, ApiError, ApiJson, ApiQuery};
use crate::models::ohs::{CreateHazardRequest, CreateIncidentRequest, HazardView, Incident};
use crate::models::vocab::IncidentType;
use crate::services::ohs_service::{self, OhsMetrics};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/hazards", get(list_hazards).post(create_hazard))
        .route("/incidents", get(list_incidents).post(create_incident))
        .route("/metrics", get(metrics))
}

async fn list_hazards(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<HazardView>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(ohs_service::list_hazards(&mut conn).await?))
}

async fn create_hazard(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateHazardRequest>,
) -> Result<(StatusCode, Json<HazardView>), ApiError> {
    user.require_create("hazard")?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let hazard = ohs_service::create_hazard(&mut conn, req.into_new(user.id)).await?;
    Ok((StatusCode::CREATED, Json(hazard)))
}

async fn list_incidents(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<Incident>>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(ohs_service::list_incidents(&mut conn).await?))
}

async fn create_incident(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateIncidentRequest>,
) -> Result<(StatusCode, Json<Incident>), ApiError> {
    let kind = match req.incident_type {
        IncidentType::NearMiss => "near-miss",
        _ => "incident",
    };
    user.require_create(kind)?;
    ensure_valid(req.validate())?;
    let mut conn = state.conn().await?;
    let incident = ohs_service::create_incident(&mut conn, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(incident)))
}

#[derive(Debug, Deserialize)]
struct MetricsQuery {
    hours: Option<f64>,
}

async fn metrics(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<MetricsQuery>,
) -> Result<Json<OhsMetrics>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(ohs_service::metrics(&mut conn, query.hours).await?))
}
