//! Contract reviews with attachments and a review trail.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Text};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::error::Rejection;
use crate::models::contract::{
    ContractAttachment, ContractReview, ContractReviewLog, ContractReviewQuery, ContractReviewView,
    ContractStats, CreateContractReviewRequest, NewContractReviewLog, UpdateContractReviewRequest,
};
use crate::schema::{qms_contract_attachments, qms_contract_review_logs, qms_contract_reviews};

const RECENT_REVIEWS: usize = 5;

fn not_found() -> anyhow::Error {
    Rejection::NotFound("Contract review not found".to_string()).into()
}

/// Attach attachments and the review trail (newest first) to each contract.
async fn hydrate(
    conn: &mut AsyncPgConnection,
    contracts: Vec<ContractReview>,
    recent: Option<usize>,
) -> anyhow::Result<Vec<ContractReviewView>> {
    let ids: Vec<i64> = contracts.iter().map(|c| c.id).collect();

    let mut attachments: HashMap<i64, Vec<ContractAttachment>> = HashMap::new();
    let rows: Vec<ContractAttachment> = qms_contract_attachments::table
        .filter(qms_contract_attachments::contract_id.eq_any(&ids))
        .order(qms_contract_attachments::uploaded_at.desc())
        .select(ContractAttachment::as_select())
        .load(conn)
        .await?;
    for a in rows {
        attachments.entry(a.contract_id).or_default().push(a);
    }

    let mut reviews: HashMap<i64, Vec<ContractReviewLog>> = HashMap::new();
    let rows: Vec<ContractReviewLog> = qms_contract_review_logs::table
        .filter(qms_contract_review_logs::contract_id.eq_any(&ids))
        .order((qms_contract_review_logs::logged_at.desc(), qms_contract_review_logs::id.desc()))
        .select(ContractReviewLog::as_select())
        .load(conn)
        .await?;
    for r in rows {
        reviews.entry(r.contract_id).or_default().push(r);
    }

    Ok(contracts
        .into_iter()
        .map(|contract| {
            let mut trail = reviews.remove(&contract.id).unwrap_or_default();
            if let Some(n) = recent {
                trail.truncate(n);
            }
            ContractReviewView {
                attachments: attachments.remove(&contract.id).unwrap_or_default(),
                reviews: trail,
                contract,
            }
        })
        .collect())
}

/// Up to `limit` contracts, newest first. `search` matches number, title
/// or supplier case-insensitively.
pub async fn list(
    conn: &mut AsyncPgConnection,
    query: &ContractReviewQuery,
    limit: i64,
) -> anyhow::Result<Vec<ContractReviewView>> {
    let mut q = qms_contract_reviews::table.into_boxed();
    if let Some(status) = query.status {
        q = q.filter(qms_contract_reviews::status.eq(status.as_str()));
    }
    if let Some(kind) = query.contract_type {
        q = q.filter(qms_contract_reviews::contract_type.eq(kind.as_str()));
    }
    if let Some(priority) = query.priority {
        q = q.filter(qms_contract_reviews::priority.eq(priority.as_str()));
    }
    if let Some(risk) = query.risk_level {
        q = q.filter(qms_contract_reviews::risk_level.eq(risk.as_str()));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        q = q.filter(
            qms_contract_reviews::contract_number
                .ilike(pattern.clone())
                .or(qms_contract_reviews::contract_title.ilike(pattern.clone()))
                .or(qms_contract_reviews::supplier_name.ilike(pattern)),
        );
    }
    let contracts: Vec<ContractReview> = q
        .order((qms_contract_reviews::create_date.desc(), qms_contract_reviews::id.desc()))
        .limit(limit)
        .select(ContractReview::as_select())
        .load(conn)
        .await?;
    hydrate(conn, contracts, Some(RECENT_REVIEWS)).await
}

pub async fn find(conn: &mut AsyncPgConnection, contract_id: i64) -> anyhow::Result<ContractReview> {
    qms_contract_reviews::table
        .find(contract_id)
        .select(ContractReview::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(not_found)
}

pub async fn get(conn: &mut AsyncPgConnection, contract_id: i64) -> anyhow::Result<ContractReviewView> {
    let contract = find(conn, contract_id).await?;
    hydrate(conn, vec![contract], None)
        .await?
        .pop()
        .ok_or_else(not_found)
}

/// Create a DRAFT review, with the caller as reviewer, and a CREATED log.
pub async fn create(
    conn: &mut AsyncPgConnection,
    req: CreateContractReviewRequest,
    user_id: i64,
    user_name: String,
) -> anyhow::Result<ContractReviewView> {
    let contract_id = conn
        .transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                let contract_id: i64 = diesel::insert_into(qms_contract_reviews::table)
                    .values(&req.into_new(user_id, &user_name))
                    .returning(qms_contract_reviews::id)
                    .get_result(conn)
                    .await?;
                diesel::insert_into(qms_contract_review_logs::table)
                    .values(&NewContractReviewLog {
                        contract_id,
                        action: "CREATED".to_string(),
                        performed_by: Some(user_name),
                        comments: Some("Contract review created".to_string()),
                    })
                    .execute(conn)
                    .await?;
                Ok(contract_id)
            }
            .scope_boxed()
        })
        .await?;

    crate::metrics::record_created("contract_review");
    tracing::info!(contract_id, user_id, "Contract review created");
    get(conn, contract_id).await
}

/// Apply a partial update and record an UPDATED entry in the trail.
pub async fn update(
    conn: &mut AsyncPgConnection,
    contract_id: i64,
    req: UpdateContractReviewRequest,
    user_id: i64,
    user_name: String,
) -> anyhow::Result<ContractReviewView> {
    let current = find(conn, contract_id).await?;
    let new_status = req.status.filter(|s| s.as_str() != current.status);
    let changes = req.into_changes(user_id);

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            diesel::update(qms_contract_reviews::table.find(contract_id))
                .set(&changes)
                .execute(conn)
                .await?;
            diesel::insert_into(qms_contract_review_logs::table)
                .values(&NewContractReviewLog {
                    contract_id,
                    action: "UPDATED".to_string(),
                    performed_by: Some(user_name),
                    comments: Some("Contract review updated".to_string()),
                })
                .execute(conn)
                .await?;
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    if let Some(status) = new_status {
        crate::metrics::status_changed("contract_review", status.as_str());
        tracing::info!(contract_id, status = %status, "Contract review status changed");
    }
    get(conn, contract_id).await
}

pub async fn delete(conn: &mut AsyncPgConnection, contract_id: i64) -> anyhow::Result<()> {
    let deleted = diesel::delete(qms_contract_reviews::table.find(contract_id))
        .execute(conn)
        .await?;
    if deleted == 0 {
        return Err(not_found());
    }
    tracing::info!(contract_id, "Contract review deleted");
    Ok(())
}

#[derive(Debug, QueryableByName)]
struct StatusCount {
    #[diesel(sql_type = Text)]
    status: String,
    #[diesel(sql_type = BigInt)]
    count: i64,
}

#[derive(Debug, QueryableByName)]
struct Exposure {
    #[diesel(sql_type = BigInt)]
    high_priority: i64,
    #[diesel(sql_type = BigInt)]
    high_risk: i64,
    #[diesel(sql_type = Double)]
    total_value: f64,
}

pub async fn stats(conn: &mut AsyncPgConnection) -> anyhow::Result<ContractStats> {
    let by_status: Vec<StatusCount> = diesel::sql_query(
        "SELECT status, COUNT(*) AS count FROM qms_contract_reviews GROUP BY status",
    )
    .load(conn)
    .await?;
    let exposure: Exposure = diesel::sql_query(
        "SELECT \
            COUNT(*) FILTER (WHERE priority IN ('HIGH', 'CRITICAL')) AS high_priority, \
            COUNT(*) FILTER (WHERE risk_level IN ('HIGH', 'CRITICAL')) AS high_risk, \
            COALESCE(SUM(value), 0)::float8 AS total_value \
         FROM qms_contract_reviews",
    )
    .get_result(conn)
    .await?;

    let mut stats = ContractStats {
        high_priority: exposure.high_priority,
        high_risk: exposure.high_risk,
        total_value: exposure.total_value,
        ..ContractStats::default()
    };
    for row in by_status {
        stats.count_status(&row.status, row.count);
    }
    Ok(stats)
}
