//! ComplianceOS QMS server.
//!
//! JSON API over the quality, environmental and OH&S registers of an
//! ISO 9001 / 14001 / 45001 management system: audits, risks, training,
//! hazards and incidents, nonconformance cases, waste, contract reviews,
//! controlled documents and the management process map.

pub mod auth;
pub mod compliance;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod events;
pub mod export;
pub mod management_map;
pub mod metrics;
pub mod migration;
pub mod models;
pub mod routes;
pub mod schema;
pub mod seeder;
pub mod services;

use std::time::Duration;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// The full application: routes plus tracing, CORS, compression and a
/// per-request timeout.
pub fn build_app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    routes::qms_router(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
