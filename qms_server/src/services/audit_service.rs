//! Audit programme: audit types, audits, findings and the audit trail.

use std::collections::HashMap;

use chrono::{Datelike, TimeZone, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::compliance::reference::{next_reference, reference_pattern};
use crate::error::Rejection;
use crate::models::audit::{
    Audit, AuditFinding, AuditListQuery, AuditLog, AuditPage, AuditSortBy, AuditType,
    AuditTypeQuery, AuditView, CreateAuditRequest, CreateFindingRequest, NewAuditLog,
    NewAuditType, Pagination, SortOrder, UpdateAuditRequest,
};
use crate::schema::{qms_audit_findings, qms_audit_logs, qms_audit_types, qms_audits};

const RECENT_ITEMS: usize = 5;

fn not_found() -> anyhow::Error {
    Rejection::NotFound("Audit not found".to_string()).into()
}

// ── Audit types ──

pub async fn list_types(
    conn: &mut AsyncPgConnection,
    query: &AuditTypeQuery,
) -> anyhow::Result<Vec<AuditType>> {
    let mut q = qms_audit_types::table.into_boxed();
    if let Some(category) = query.category {
        q = q.filter(qms_audit_types::category.eq(category.as_str()));
    }
    if let Some(frequency) = query.frequency {
        q = q.filter(qms_audit_types::frequency.eq(frequency.as_str()));
    }
    if let Some(active) = query.is_active {
        q = q.filter(qms_audit_types::active.eq(active));
    }
    let results = q
        .order(qms_audit_types::name.asc())
        .select(AuditType::as_select())
        .load(conn)
        .await?;
    Ok(results)
}

pub async fn create_type(
    conn: &mut AsyncPgConnection,
    new_type: NewAuditType,
) -> anyhow::Result<AuditType> {
    let result: AuditType = diesel::insert_into(qms_audit_types::table)
        .values(&new_type)
        .returning(AuditType::as_returning())
        .get_result(conn)
        .await?;
    crate::metrics::record_created("audit_type");
    tracing::info!(audit_type_id = result.id, name = %result.name, "Audit type created");
    Ok(result)
}

// ── Audits ──

fn filtered(query: &AuditListQuery) -> qms_audits::BoxedQuery<'static, Pg> {
    let mut q = qms_audits::table.into_boxed();
    if let Some(type_id) = query.audit_type_id {
        q = q.filter(qms_audits::audit_type_id.eq(type_id));
    }
    if let Some(status) = query.status {
        q = q.filter(qms_audits::status.eq(status.as_str()));
    }
    if let Some(rag) = query.rag_status {
        q = q.filter(qms_audits::rag_status.eq(rag.as_str()));
    }
    if let Some(standard) = query.audit_standard.clone().filter(|s| !s.is_empty()) {
        q = q.filter(qms_audits::audit_standard.eq(standard));
    }
    if let Some(year) = query.year {
        if let (Some(start), Some(end)) = (
            Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single(),
            year.checked_add(1)
                .and_then(|next| Utc.with_ymd_and_hms(next, 1, 1, 0, 0, 0).single()),
        ) {
            q = q
                .filter(qms_audits::planned_start_date.ge(start))
                .filter(qms_audits::planned_start_date.lt(end));
        }
    }
    q
}

fn sorted(
    q: qms_audits::BoxedQuery<'static, Pg>,
    sort_by: AuditSortBy,
    order: SortOrder,
) -> qms_audits::BoxedQuery<'static, Pg> {
    match (sort_by, order) {
        (AuditSortBy::PlannedStartDate, SortOrder::Asc) => q.order(qms_audits::planned_start_date.asc()),
        (AuditSortBy::PlannedStartDate, SortOrder::Desc) => q.order(qms_audits::planned_start_date.desc()),
        (AuditSortBy::Title, SortOrder::Asc) => q.order(qms_audits::title.asc()),
        (AuditSortBy::Title, SortOrder::Desc) => q.order(qms_audits::title.desc()),
        (AuditSortBy::Status, SortOrder::Asc) => q.order(qms_audits::status.asc()),
        (AuditSortBy::Status, SortOrder::Desc) => q.order(qms_audits::status.desc()),
        (AuditSortBy::AuditNumber, SortOrder::Asc) => q.order(qms_audits::audit_number.asc()),
        (AuditSortBy::AuditNumber, SortOrder::Desc) => q.order(qms_audits::audit_number.desc()),
        (AuditSortBy::CreatedAt, SortOrder::Asc) => q.order(qms_audits::create_date.asc()),
        (AuditSortBy::CreatedAt, SortOrder::Desc) => q.order(qms_audits::create_date.desc()),
    }
    .then_order_by(qms_audits::id.desc())
}

/// Attach type, findings and trail to each audit. `recent` caps the
/// findings and log entries kept per audit.
async fn hydrate(
    conn: &mut AsyncPgConnection,
    audits: Vec<Audit>,
    recent: Option<usize>,
) -> anyhow::Result<Vec<AuditView>> {
    let ids: Vec<i64> = audits.iter().map(|a| a.id).collect();
    let type_ids: Vec<i64> = audits.iter().map(|a| a.audit_type_id).collect();

    let types: HashMap<i64, AuditType> = qms_audit_types::table
        .filter(qms_audit_types::id.eq_any(&type_ids))
        .select(AuditType::as_select())
        .load(conn)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    let mut findings: HashMap<i64, Vec<AuditFinding>> = HashMap::new();
    let rows: Vec<AuditFinding> = qms_audit_findings::table
        .filter(qms_audit_findings::audit_id.eq_any(&ids))
        .order((qms_audit_findings::create_date.desc(), qms_audit_findings::id.desc()))
        .select(AuditFinding::as_select())
        .load(conn)
        .await?;
    for f in rows {
        findings.entry(f.audit_id).or_default().push(f);
    }

    let mut logs: HashMap<i64, Vec<AuditLog>> = HashMap::new();
    let rows: Vec<AuditLog> = qms_audit_logs::table
        .filter(qms_audit_logs::audit_id.eq_any(&ids))
        .order((qms_audit_logs::logged_at.desc(), qms_audit_logs::id.desc()))
        .select(AuditLog::as_select())
        .load(conn)
        .await?;
    for l in rows {
        logs.entry(l.audit_id).or_default().push(l);
    }

    Ok(audits
        .into_iter()
        .map(|audit| {
            let mut f = findings.remove(&audit.id).unwrap_or_default();
            let mut l = logs.remove(&audit.id).unwrap_or_default();
            if let Some(n) = recent {
                f.truncate(n);
                l.truncate(n);
            }
            AuditView {
                audit_type: types.get(&audit.audit_type_id).cloned(),
                findings: f,
                logs: l,
                audit,
            }
        })
        .collect())
}

/// List audits with filters, sorting and pagination.
pub async fn list(
    conn: &mut AsyncPgConnection,
    query: &AuditListQuery,
    limit: i64,
) -> anyhow::Result<AuditPage> {
    let page = query.page();
    let total: i64 = filtered(query).count().get_result(conn).await?;
    let audits: Vec<Audit> = sorted(filtered(query), query.sort_by, query.sort_order)
        .limit(limit)
        .offset(query.offset(limit))
        .select(Audit::as_select())
        .load(conn)
        .await?;

    Ok(AuditPage {
        audits: hydrate(conn, audits, Some(RECENT_ITEMS)).await?,
        pagination: Pagination::new(page, limit, total),
    })
}

/// Look up the bare audit row.
pub async fn find(conn: &mut AsyncPgConnection, audit_id: i64) -> anyhow::Result<Audit> {
    qms_audits::table
        .find(audit_id)
        .select(Audit::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(not_found)
}

/// Get an audit with every finding and log entry, newest first.
pub async fn get(conn: &mut AsyncPgConnection, audit_id: i64) -> anyhow::Result<AuditView> {
    let audit = find(conn, audit_id).await?;
    hydrate(conn, vec![audit], None)
        .await?
        .pop()
        .ok_or_else(not_found)
}

/// Create an audit with the next `AUD-YYYY-NNNN` number and a CREATED log.
pub async fn create(
    conn: &mut AsyncPgConnection,
    req: CreateAuditRequest,
    user_id: i64,
) -> anyhow::Result<AuditView> {
    let year = Utc::now().year();
    let audit_type_id = req.audit_type_id.unwrap_or_default();

    let type_exists: i64 = qms_audit_types::table
        .find(audit_type_id)
        .count()
        .get_result(conn)
        .await?;
    if type_exists == 0 {
        return Err(Rejection::Invalid("Audit type not found".to_string()).into());
    }

    let audit_id = conn
        .transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                let existing: Vec<String> = qms_audits::table
                    .filter(qms_audits::audit_number.like(reference_pattern("AUD", year)))
                    .select(qms_audits::audit_number)
                    .load(conn)
                    .await?;
                let audit_number = next_reference("AUD", year, existing.iter().map(String::as_str));
                let new_audit = req
                    .into_new(audit_number, user_id)
                    .ok_or_else(|| Rejection::Invalid("Audit is missing required fields".to_string()))?;

                let audit_id: i64 = diesel::insert_into(qms_audits::table)
                    .values(&new_audit)
                    .returning(qms_audits::id)
                    .get_result(conn)
                    .await?;

                diesel::insert_into(qms_audit_logs::table)
                    .values(&NewAuditLog {
                        audit_id,
                        action: "CREATED".to_string(),
                        performed_by: Some(user_id),
                        comments: Some("Audit created".to_string()),
                    })
                    .execute(conn)
                    .await?;
                Ok(audit_id)
            }
            .scope_boxed()
        })
        .await?;

    crate::metrics::record_created("audit");
    tracing::info!(audit_id, user_id, "Audit created");
    get(conn, audit_id).await
}

/// Apply a partial update; a status change is written to the trail.
pub async fn update(
    conn: &mut AsyncPgConnection,
    audit_id: i64,
    req: UpdateAuditRequest,
    user_id: i64,
) -> anyhow::Result<AuditView> {
    let current = find(conn, audit_id).await?;
    let new_status = req.status.filter(|s| s.as_str() != current.status);
    let comments = req.comments.clone().filter(|c| !c.trim().is_empty());
    let changes = req.into_changes(user_id);

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            diesel::update(qms_audits::table.find(audit_id))
                .set(&changes)
                .execute(conn)
                .await?;

            if let Some(status) = new_status {
                let mut message = format!("Status changed from {} to {}", current.status, status);
                if let Some(c) = comments {
                    message = format!("{message}: {c}");
                }
                diesel::insert_into(qms_audit_logs::table)
                    .values(&NewAuditLog {
                        audit_id,
                        action: "STATUS_CHANGED".to_string(),
                        performed_by: Some(user_id),
                        comments: Some(message),
                    })
                    .execute(conn)
                    .await?;
            }
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    if let Some(status) = new_status {
        crate::metrics::status_changed("audit", status.as_str());
        tracing::info!(audit_id, status = %status, "Audit status changed");
    }
    get(conn, audit_id).await
}

pub async fn delete(conn: &mut AsyncPgConnection, audit_id: i64) -> anyhow::Result<()> {
    let deleted = diesel::delete(qms_audits::table.find(audit_id))
        .execute(conn)
        .await?;
    if deleted == 0 {
        return Err(not_found());
    }
    tracing::info!(audit_id, "Audit deleted");
    Ok(())
}

pub async fn add_finding(
    conn: &mut AsyncPgConnection,
    audit_id: i64,
    req: CreateFindingRequest,
    user_id: i64,
) -> anyhow::Result<AuditFinding> {
    find(conn, audit_id).await?;
    let finding: AuditFinding = diesel::insert_into(qms_audit_findings::table)
        .values(&req.into_new(audit_id, user_id))
        .returning(AuditFinding::as_returning())
        .get_result(conn)
        .await?;
    crate::metrics::record_created("audit_finding");
    tracing::info!(audit_id, finding_id = finding.id, kind = %finding.finding_type, "Finding recorded");
    Ok(finding)
}
