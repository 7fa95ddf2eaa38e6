//! Risk register CRUD and the 5×5 heat map.

use std::collections::BTreeMap;

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::compliance::rag::Rag;
use crate::compliance::risk::{self, RiskBand};
use crate::error::Rejection;
use crate::models::risk::{NewRisk, Risk, RiskChanges, RiskView};
use crate::schema::qms_risks;

fn not_found() -> anyhow::Error {
    Rejection::NotFound("Risk not found".to_string()).into()
}

/// All risks, newest first.
pub async fn list(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<RiskView>> {
    let risks: Vec<Risk> = qms_risks::table
        .order((qms_risks::create_date.desc(), qms_risks::id.desc()))
        .select(Risk::as_select())
        .load(conn)
        .await?;
    Ok(risks.into_iter().map(RiskView::from).collect())
}

pub async fn find(conn: &mut AsyncPgConnection, risk_id: i64) -> anyhow::Result<Risk> {
    qms_risks::table
        .find(risk_id)
        .select(Risk::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(not_found)
}

pub async fn create(conn: &mut AsyncPgConnection, new_risk: NewRisk) -> anyhow::Result<RiskView> {
    let risk: Risk = diesel::insert_into(qms_risks::table)
        .values(&new_risk)
        .returning(Risk::as_returning())
        .get_result(conn)
        .await?;
    crate::metrics::record_created("risk");
    tracing::info!(risk_id = risk.id, score = risk.likelihood * risk.severity, "Risk created");
    Ok(risk.into())
}

/// Apply a partial update.
pub async fn update(
    conn: &mut AsyncPgConnection,
    risk_id: i64,
    changes: RiskChanges,
) -> anyhow::Result<RiskView> {
    let status = changes.status.clone();
    let risk: Risk = diesel::update(qms_risks::table.find(risk_id))
        .set(&changes)
        .returning(Risk::as_returning())
        .get_result(conn)
        .await
        .optional()?
        .ok_or_else(not_found)?;
    if let Some(status) = status {
        crate::metrics::status_changed("risk", &status);
    }
    tracing::info!(risk_id, "Risk updated");
    Ok(risk.into())
}

pub async fn delete(conn: &mut AsyncPgConnection, risk_id: i64) -> anyhow::Result<()> {
    let deleted = diesel::delete(qms_risks::table.find(risk_id))
        .execute(conn)
        .await?;
    if deleted == 0 {
        return Err(not_found());
    }
    tracing::info!(risk_id, "Risk deleted");
    Ok(())
}

/// Heat map counts: cells keyed `"{likelihood}-{severity}"`, plus totals
/// per band and per RAG colour.
#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskMatrix {
    pub cells: BTreeMap<String, i64>,
    pub by_band: BTreeMap<&'static str, i64>,
    pub by_rag: BTreeMap<&'static str, i64>,
    pub total: i64,
}

impl RiskMatrix {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (i32, i32)>) -> Self {
        let mut matrix = RiskMatrix::default();
        for l in 1..=5 {
            for s in 1..=5 {
                matrix.cells.insert(format!("{l}-{s}"), 0);
            }
        }
        for band in RiskBand::ALL {
            matrix.by_band.insert(band.as_str(), 0);
        }
        for rag in [Rag::Green, Rag::Amber, Rag::Red] {
            matrix.by_rag.insert(rag.as_str(), 0);
        }

        for (likelihood, severity) in pairs {
            let Some(score) = risk::score(likelihood, severity) else {
                tracing::warn!(likelihood, severity, "Skipping out-of-scale risk in matrix");
                continue;
            };
            *matrix
                .cells
                .entry(format!("{likelihood}-{severity}"))
                .or_default() += 1;
            *matrix.by_band.entry(score.band.as_str()).or_default() += 1;
            *matrix.by_rag.entry(score.rag.as_str()).or_default() += 1;
            matrix.total += 1;
        }
        matrix
    }
}

pub async fn matrix(conn: &mut AsyncPgConnection) -> anyhow::Result<RiskMatrix> {
    let pairs: Vec<(i32, i32)> = qms_risks::table
        .filter(qms_risks::active.eq(true))
        .select((qms_risks::likelihood, qms_risks::severity))
        .load(conn)
        .await?;
    Ok(RiskMatrix::from_pairs(pairs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_counts_cells_bands_and_rag() {
        let m = RiskMatrix::from_pairs([(1, 1), (2, 3), (2, 3), (4, 4), (5, 5)]);
        assert_eq!(m.total, 5);
        assert_eq!(m.cells["2-3"], 2);
        assert_eq!(m.cells["3-3"], 0);
        assert_eq!(m.cells.len(), 25);
        assert_eq!(m.by_band["Low"], 1);
        assert_eq!(m.by_band["Medium"], 2);
        assert_eq!(m.by_band["Critical"], 2);
        assert_eq!(m.by_rag["green"], 1);
        assert_eq!(m.by_rag["amber"], 2);
        assert_eq!(m.by_rag["red"], 2);
    }

    #[test]
    fn out_of_scale_rows_are_skipped() {
        let m = RiskMatrix::from_pairs([(0, 3), (3, 6)]);
        assert_eq!(m.total, 0);
        assert!(m.cells.values().all(|&c| c == 0));
    }
}
