//! QMS HTTP routes, one module per feature area, nested under `/api`.

pub mod audits;
pub mod auth;
pub mod calibrations;
pub mod contracts;
pub mod dashboard;
pub mod documents;
pub mod export;
pub mod management_review;
pub mod map;
pub mod nonconformance;
pub mod ohs;
pub mod risks;
pub mod training;
pub mod waste;

use std::sync::Arc;

use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};

use crate::config::QmsConfig;
use crate::db::{DbConn, DbPool};
use crate::error::ApiError;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<QmsConfig>,
}

impl AppState {
    pub fn new(pool: DbPool, config: QmsConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    /// Check a connection out of the pool.
    pub async fn conn(&self) -> Result<DbConn, ApiError> {
        self.pool
            .get()
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("database pool: {e}")))
    }
}

/// Build the QMS router: `/health` plus every feature area under `/api`.
pub fn qms_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/audits", audits::router())
        .nest("/risks", risks::router())
        .nest("/training", training::router())
        .nest("/ohs", ohs::router())
        .nest("/nonconformance", nonconformance::router())
        .nest("/waste-management", waste::router())
        .nest("/contract-review", contracts::router())
        .nest("/documents", documents::router())
        .nest("/equipment", calibrations::equipment_router())
        .nest("/calibrations", calibrations::router())
        .nest("/management-review", management_review::router())
        .nest("/management-map", map::router())
        .nest("/dashboard", dashboard::router())
        .nest("/export", export::router());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Body returned by DELETE handlers.
pub fn deleted(message: &str) -> Json<Value> {
    Json(json!({ "success": true, "message": message }))
}
