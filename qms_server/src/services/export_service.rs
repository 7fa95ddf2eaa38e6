//! Data collection for register exports.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde_json::Value;

use crate::export::{self, AuditorPack, ExportEntity, STANDARDS};
use crate::models::audit::Audit;
use crate::models::contract::ContractReview;
use crate::models::nonconformance::{GlobalAction, Nonconformance};
use crate::models::training::TrainingRecord;
use crate::models::waste::WasteRecord;
use crate::schema::{
    qms_actions, qms_audits, qms_contract_reviews, qms_nonconformances, qms_training_records,
    qms_waste_records,
};
use crate::services::{document_service, ohs_service, risk_service};

async fn audits(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<Value>> {
    let rows: Vec<Audit> = qms_audits::table
        .order(qms_audits::planned_start_date.desc())
        .select(Audit::as_select())
        .load(conn)
        .await?;
    Ok(export::to_rows(&rows)?)
}

async fn training(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<Value>> {
    let rows: Vec<TrainingRecord> = qms_training_records::table
        .order(qms_training_records::id.asc())
        .select(TrainingRecord::as_select())
        .load(conn)
        .await?;
    Ok(export::to_rows(&rows)?)
}

async fn actions(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<Value>> {
    let rows: Vec<GlobalAction> = qms_actions::table
        .order(qms_actions::id.asc())
        .select(GlobalAction::as_select())
        .load(conn)
        .await?;
    Ok(export::to_rows(&rows)?)
}

/// Rows of one register, newest first where the register has a date.
pub async fn rows(conn: &mut AsyncPgConnection, entity: ExportEntity) -> anyhow::Result<Vec<Value>> {
    let rows = match entity {
        ExportEntity::Risks => export::to_rows(&risk_service::list(conn).await?)?,
        ExportEntity::Incidents => export::to_rows(&ohs_service::list_incidents(conn).await?)?,
        ExportEntity::Audits => audits(conn).await?,
        ExportEntity::Training => training(conn).await?,
        ExportEntity::Nonconformance => {
            let rows: Vec<Nonconformance> = qms_nonconformances::table
                .order(qms_nonconformances::date_raised.desc())
                .select(Nonconformance::as_select())
                .load(conn)
                .await?;
            export::to_rows(&rows)?
        }
        ExportEntity::Waste => {
            let rows: Vec<WasteRecord> = qms_waste_records::table
                .order(qms_waste_records::generated_date.desc())
                .select(WasteRecord::as_select())
                .load(conn)
                .await?;
            export::to_rows(&rows)?
        }
        ExportEntity::Contracts => {
            let rows: Vec<ContractReview> = qms_contract_reviews::table
                .order(qms_contract_reviews::create_date.desc())
                .select(ContractReview::as_select())
                .load(conn)
                .await?;
            export::to_rows(&rows)?
        }
    };
    crate::metrics::export_rows(entity.as_str(), rows.len());
    Ok(rows)
}

pub async fn auditor_pack(
    conn: &mut AsyncPgConnection,
    organization: &str,
) -> anyhow::Result<AuditorPack> {
    let pack = AuditorPack {
        export_date: Utc::now(),
        organization: organization.to_string(),
        standards: STANDARDS.to_vec(),
        documents: export::to_rows(&document_service::list(conn).await?)?,
        risks: export::to_rows(&risk_service::list(conn).await?)?,
        training: training(conn).await?,
        incidents: export::to_rows(&ohs_service::list_incidents(conn).await?)?,
        actions: actions(conn).await?,
        audits: audits(conn).await?,
    };
    tracing::info!(
        documents = pack.documents.len(),
        risks = pack.risks.len(),
        audits = pack.audits.len(),
        "Auditor pack assembled"
    );
    Ok(pack)
}
