//! Management map assembled from the process catalogue and live records.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::Rejection;
use crate::management_map::path::{self, PathRequest, WizardResult};
use crate::management_map::{self, ManagementMap, MapNode};
use crate::models::risk::Risk;
use crate::schema::qms_risks;
use crate::services::document_service;

async fn load(conn: &mut AsyncPgConnection) -> anyhow::Result<ManagementMap> {
    let documents = document_service::list_all(conn).await?;
    let risks: Vec<Risk> = qms_risks::table
        .order(qms_risks::id.asc())
        .select(Risk::as_select())
        .load(conn)
        .await?;
    Ok(management_map::build(&documents, &risks, Utc::now()))
}

pub async fn map(conn: &mut AsyncPgConnection) -> anyhow::Result<ManagementMap> {
    let map = load(conn).await?;
    tracing::debug!(nodes = map.nodes.len(), edges = map.edges.len(), "Management map built");
    Ok(map)
}

pub async fn minimal_path(
    conn: &mut AsyncPgConnection,
    req: &PathRequest,
) -> anyhow::Result<WizardResult> {
    let map = load(conn).await?;
    let result = path::minimal_path(&map.nodes, &map.edges, req);
    tracing::info!(
        roles = req.roles.len(),
        activities = req.activities.len(),
        locations = req.locations.len(),
        steps = result.path.len(),
        "Minimal path computed"
    );
    Ok(result)
}

pub async fn breadcrumbs(conn: &mut AsyncPgConnection, node_id: &str) -> anyhow::Result<Vec<MapNode>> {
    let map = load(conn).await?;
    path::breadcrumbs(&map.nodes, &map.edges, node_id)
        .ok_or_else(|| Rejection::NotFound("Node not found".to_string()).into())
}
