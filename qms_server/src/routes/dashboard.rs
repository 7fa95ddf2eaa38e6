//! Cross-register dashboard.

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;

use super::AppState;
use crate::auth::AuthUser;
use crate::dashboard::kpi::{self, DashboardOverview};
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new().route("/overview", get(overview))
}

async fn overview(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<DashboardOverview>, ApiError> {
    let mut conn = state.conn().await?;
    Ok(Json(kpi::overview(&mut conn, &state.config.organization).await?))
}
