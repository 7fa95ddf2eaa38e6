//! Improvement cases: non-conformances, complaints, supplier issues and
//! improvement ideas, their corrective actions and the case trail.
//!
//! Every case action is mirrored by an entry in the global action register
//! (`qms_actions`) so it shows up alongside actions from other modules.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Nullable, Text, Timestamptz};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::compliance::reference::{next_reference, reference_pattern};
use crate::dashboard::pareto::{self, ParetoAnalysis};
use crate::error::Rejection;
use crate::events::nonconformance::{publish, NcEvent};
use crate::models::nonconformance::{
    CloseNonconformanceRequest, CreateNcActionRequest, CreateNonconformanceRequest, NcAction,
    NcLog, NewGlobalAction, NewNcAction, NewNcLog, Nonconformance, NonconformanceClosure,
    NonconformanceView, ParetoDimension, ParetoQuery, ParetoRange, UpdateNcActionRequest,
    UpdateNonconformanceRequest, CONTAINMENT_DESCRIPTION, CONTAINMENT_TITLE,
};
use crate::models::vocab::{ActionStatus, Level, NcActionStatus, NcActionType, NcStatus};
use crate::schema::{qms_actions, qms_nc_actions, qms_nc_logs, qms_nonconformances};

const SYSTEM_USER: &str = "System";
const CONTAINMENT_WINDOW_HOURS: i64 = 24;

fn not_found() -> anyhow::Error {
    Rejection::NotFound("Nonconformance not found".to_string()).into()
}

fn action_not_found() -> anyhow::Error {
    Rejection::NotFound("Action not found".to_string()).into()
}

fn log_entry(
    nc_id: i64,
    event_type: &str,
    description: String,
    user_name: &str,
    metadata: Option<serde_json::Value>,
) -> NewNcLog {
    NewNcLog {
        nc_id,
        event_type: event_type.to_string(),
        description,
        user_name: user_name.to_string(),
        metadata,
    }
}

async fn insert_log(conn: &mut AsyncPgConnection, entry: NewNcLog) -> anyhow::Result<()> {
    diesel::insert_into(qms_nc_logs::table)
        .values(&entry)
        .execute(conn)
        .await?;
    Ok(())
}

/// Register the global mirror of a case action and return its id.
async fn insert_global_action(
    conn: &mut AsyncPgConnection,
    record: &Nonconformance,
    action_type: NcActionType,
    title: &str,
    owner: &str,
    due_date: Option<DateTime<Utc>>,
    user_id: i64,
) -> anyhow::Result<i64> {
    let id = diesel::insert_into(qms_actions::table)
        .values(&NewGlobalAction {
            action_type: action_type.as_str().to_string(),
            title: format!("{}: {}", record.ref_number, title),
            details: Some(format!("Linked to {} - {}", record.ref_number, record.title)),
            owner: owner.to_string(),
            due_date,
            status: ActionStatus::Open.as_str().to_string(),
            create_uid: Some(user_id),
        })
        .returning(qms_actions::id)
        .get_result(conn)
        .await?;
    Ok(id)
}

// ── Cases ──

async fn load_actions(
    conn: &mut AsyncPgConnection,
    nc_ids: &[i64],
) -> anyhow::Result<HashMap<i64, Vec<NcAction>>> {
    let mut grouped: HashMap<i64, Vec<NcAction>> = HashMap::new();
    let rows: Vec<NcAction> = qms_nc_actions::table
        .filter(qms_nc_actions::nc_id.eq_any(nc_ids))
        .order((qms_nc_actions::create_date.asc(), qms_nc_actions::id.asc()))
        .select(NcAction::as_select())
        .load(conn)
        .await?;
    for a in rows {
        grouped.entry(a.nc_id).or_default().push(a);
    }
    Ok(grouped)
}

/// All cases, most recently raised first, each with its actions.
pub async fn list(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<NonconformanceView>> {
    let records: Vec<Nonconformance> = qms_nonconformances::table
        .order((qms_nonconformances::date_raised.desc(), qms_nonconformances::id.desc()))
        .select(Nonconformance::as_select())
        .load(conn)
        .await?;
    let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    let mut actions = load_actions(conn, &ids).await?;

    Ok(records
        .into_iter()
        .map(|record| NonconformanceView {
            actions: actions.remove(&record.id).unwrap_or_default(),
            logs: None,
            record,
        })
        .collect())
}

pub async fn find(conn: &mut AsyncPgConnection, nc_id: i64) -> anyhow::Result<Nonconformance> {
    qms_nonconformances::table
        .find(nc_id)
        .select(Nonconformance::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(not_found)
}

/// A case with its actions (oldest first) and trail (newest first).
pub async fn get(conn: &mut AsyncPgConnection, nc_id: i64) -> anyhow::Result<NonconformanceView> {
    let record = find(conn, nc_id).await?;
    let actions = load_actions(conn, &[nc_id]).await?.remove(&nc_id).unwrap_or_default();
    let logs: Vec<NcLog> = qms_nc_logs::table
        .filter(qms_nc_logs::nc_id.eq(nc_id))
        .order((qms_nc_logs::logged_at.desc(), qms_nc_logs::id.desc()))
        .select(NcLog::as_select())
        .load(conn)
        .await?;
    Ok(NonconformanceView {
        record,
        actions,
        logs: Some(logs),
    })
}

/// Raise a case with the next `{CASE_TYPE}-YYYY-NNNN` reference. NC cases
/// that need containment get a 24h containment action at the same time.
pub async fn create(
    conn: &mut AsyncPgConnection,
    req: CreateNonconformanceRequest,
    user_id: i64,
) -> anyhow::Result<NonconformanceView> {
    let now = Utc::now();
    let prefix = req.case_type.as_str();
    let containment = req.needs_containment();

    let record: Nonconformance = conn
        .transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                let existing: Vec<String> = qms_nonconformances::table
                    .filter(qms_nonconformances::ref_number.like(reference_pattern(prefix, now.year())))
                    .select(qms_nonconformances::ref_number)
                    .load(conn)
                    .await?;
                let ref_number = next_reference(prefix, now.year(), existing.iter().map(String::as_str));
                let new_record = req.into_new(ref_number, now, user_id);
                let record: Nonconformance = diesel::insert_into(qms_nonconformances::table)
                    .values(&new_record)
                    .returning(Nonconformance::as_returning())
                    .get_result(conn)
                    .await?;

                if containment {
                    let due = Some(now + Duration::hours(CONTAINMENT_WINDOW_HOURS));
                    let global_id = insert_global_action(
                        conn,
                        &record,
                        NcActionType::Corrective,
                        CONTAINMENT_TITLE,
                        &record.owner,
                        due,
                        user_id,
                    )
                    .await?;
                    diesel::insert_into(qms_nc_actions::table)
                        .values(&NewNcAction {
                            nc_id: record.id,
                            action_type: NcActionType::Containment.as_str().to_string(),
                            title: CONTAINMENT_TITLE.to_string(),
                            description: Some(CONTAINMENT_DESCRIPTION.to_string()),
                            owner: record.owner.clone(),
                            due_date: due,
                            priority: Level::High.as_str().to_string(),
                            status: NcActionStatus::Open.as_str().to_string(),
                            global_action_id: Some(global_id),
                            create_uid: Some(user_id),
                        })
                        .execute(conn)
                        .await?;
                }

                insert_log(
                    conn,
                    log_entry(
                        record.id,
                        "CREATED",
                        format!("Case {} created", record.ref_number),
                        &record.raised_by,
                        None,
                    ),
                )
                .await?;
                Ok(record)
            }
            .scope_boxed()
        })
        .await?;

    crate::metrics::record_created("nonconformance");
    tracing::info!(nc_id = record.id, reference = %record.ref_number, user_id, "Nonconformance raised");
    publish(record.id, &NcEvent::raised(&record, containment));
    get(conn, record.id).await
}

/// Apply a partial update and record an EDITED entry in the trail.
pub async fn update(
    conn: &mut AsyncPgConnection,
    nc_id: i64,
    req: UpdateNonconformanceRequest,
    user_id: i64,
) -> anyhow::Result<NonconformanceView> {
    let current = find(conn, nc_id).await?;
    let user_name = req
        .updated_by
        .clone()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| SYSTEM_USER.to_string());
    let new_status = req.status.filter(|s| s.as_str() != current.status);
    let changes = req.into_changes(user_id);

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            diesel::update(qms_nonconformances::table.find(nc_id))
                .set(&changes)
                .execute(conn)
                .await?;
            insert_log(
                conn,
                log_entry(
                    nc_id,
                    "EDITED",
                    format!("Case {} updated", current.ref_number),
                    &user_name,
                    None,
                ),
            )
            .await
        }
        .scope_boxed()
    })
    .await?;

    if let Some(status) = new_status {
        crate::metrics::status_changed("nonconformance", status.as_str());
    }
    tracing::info!(nc_id, user_id, "Nonconformance updated");
    get(conn, nc_id).await
}

/// Delete a case; its actions and trail cascade, mirrored global actions
/// are removed explicitly.
pub async fn delete(conn: &mut AsyncPgConnection, nc_id: i64) -> anyhow::Result<()> {
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            let global_ids: Vec<Option<i64>> = qms_nc_actions::table
                .filter(qms_nc_actions::nc_id.eq(nc_id))
                .select(qms_nc_actions::global_action_id)
                .load(conn)
                .await?;
            let global_ids: Vec<i64> = global_ids.into_iter().flatten().collect();

            let deleted = diesel::delete(qms_nonconformances::table.find(nc_id))
                .execute(conn)
                .await?;
            if deleted == 0 {
                return Err(not_found());
            }
            if !global_ids.is_empty() {
                diesel::delete(qms_actions::table.filter(qms_actions::id.eq_any(&global_ids)))
                    .execute(conn)
                    .await?;
            }
            Ok(())
        }
        .scope_boxed()
    })
    .await?;
    tracing::info!(nc_id, "Nonconformance deleted");
    Ok(())
}

// ── Actions ──

async fn find_action(
    conn: &mut AsyncPgConnection,
    nc_id: i64,
    action_id: i64,
) -> anyhow::Result<NcAction> {
    qms_nc_actions::table
        .filter(qms_nc_actions::id.eq(action_id))
        .filter(qms_nc_actions::nc_id.eq(nc_id))
        .select(NcAction::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(action_not_found)
}

/// Add an action to a case, mirrored in the global register. The owner
/// defaults to the case owner.
pub async fn add_action(
    conn: &mut AsyncPgConnection,
    nc_id: i64,
    req: CreateNcActionRequest,
    user_id: i64,
) -> anyhow::Result<NcAction> {
    let record = find(conn, nc_id).await?;
    let action: NcAction = conn
        .transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                let owner = req
                    .owner
                    .filter(|o| !o.trim().is_empty())
                    .unwrap_or_else(|| record.owner.clone());
                let global_id = insert_global_action(
                    conn,
                    &record,
                    req.action_type,
                    &req.title,
                    &owner,
                    req.due_date,
                    user_id,
                )
                .await?;
                let action = diesel::insert_into(qms_nc_actions::table)
                    .values(&NewNcAction {
                        nc_id,
                        action_type: req.action_type.as_str().to_string(),
                        title: req.title.trim().to_string(),
                        description: req.description,
                        owner,
                        due_date: req.due_date,
                        priority: req.priority.as_str().to_string(),
                        status: NcActionStatus::Open.as_str().to_string(),
                        global_action_id: Some(global_id),
                        create_uid: Some(user_id),
                    })
                    .returning(NcAction::as_returning())
                    .get_result(conn)
                    .await?;
                Ok(action)
            }
            .scope_boxed()
        })
        .await?;

    crate::metrics::record_created("nc_action");
    tracing::info!(nc_id, action_id = action.id, kind = %action.action_type, "Action added");
    Ok(action)
}

/// Whether a case whose actions have these statuses is ready for
/// verification. A case without actions never is.
pub fn all_done<'a>(statuses: impl IntoIterator<Item = &'a str>) -> bool {
    let mut any = false;
    for status in statuses {
        if status != NcActionStatus::Done.as_str() {
            return false;
        }
        any = true;
    }
    any
}

/// Status a case in `case_status` moves to once its actions have these
/// statuses. Every unclosed case whose actions are all DONE goes to
/// PENDING_VERIFICATION.
pub fn escalation<'a>(
    case_status: &str,
    action_statuses: impl IntoIterator<Item = &'a str>,
) -> Option<NcStatus> {
    if !all_done(action_statuses) {
        return None;
    }
    match case_status.parse::<NcStatus>() {
        Ok(status) => NcEvent::ActionsCompleted.next_status(status),
        Err(_) => Some(NcStatus::PendingVerification),
    }
}

/// A case can be closed when none of its actions is still outstanding. A
/// case without actions can be closed directly.
pub fn ready_to_close<'a>(action_statuses: impl IntoIterator<Item = &'a str>) -> bool {
    action_statuses
        .into_iter()
        .all(|s| s == NcActionStatus::Done.as_str())
}

/// Update an action and mirror its status onto the global register. When
/// the last open action completes, the case moves to PENDING_VERIFICATION.
pub async fn update_action(
    conn: &mut AsyncPgConnection,
    nc_id: i64,
    action_id: i64,
    req: UpdateNcActionRequest,
    user_id: i64,
) -> anyhow::Result<NcAction> {
    let record = find(conn, nc_id).await?;
    let existing = find_action(conn, nc_id, action_id).await?;
    let mirrored = req.status.map(ActionStatus::from);
    let changes = req.into_changes(Utc::now(), user_id);

    let (action, escalated) = conn
        .transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                let action: NcAction = diesel::update(qms_nc_actions::table.find(action_id))
                    .set(&changes)
                    .returning(NcAction::as_returning())
                    .get_result(conn)
                    .await?;

                if let (Some(status), Some(global_id)) = (mirrored, existing.global_action_id) {
                    diesel::update(qms_actions::table.find(global_id))
                        .set((
                            qms_actions::status.eq(status.as_str()),
                            qms_actions::write_uid.eq(Some(user_id)),
                            qms_actions::write_date.eq(Some(Utc::now())),
                        ))
                        .execute(conn)
                        .await?;
                }

                let statuses: Vec<String> = qms_nc_actions::table
                    .filter(qms_nc_actions::nc_id.eq(nc_id))
                    .select(qms_nc_actions::status)
                    .load(conn)
                    .await?;
                let escalate = escalation(&record.status, statuses.iter().map(String::as_str))
                    .is_some();
                if escalate {
                    diesel::update(qms_nonconformances::table.find(nc_id))
                        .set((
                            qms_nonconformances::status.eq(NcStatus::PendingVerification.as_str()),
                            qms_nonconformances::write_uid.eq(Some(user_id)),
                            qms_nonconformances::write_date.eq(Some(Utc::now())),
                        ))
                        .execute(conn)
                        .await?;
                    insert_log(
                        conn,
                        log_entry(
                            nc_id,
                            "STATUS_CHANGE",
                            "All actions completed - status changed to Pending Verification".to_string(),
                            SYSTEM_USER,
                            None,
                        ),
                    )
                    .await?;
                }
                Ok((action, escalate))
            }
            .scope_boxed()
        })
        .await?;

    if let Some(status) = mirrored {
        crate::metrics::status_changed("nc_action", status.as_str());
    }
    if escalated {
        crate::metrics::status_changed("nonconformance", NcStatus::PendingVerification.as_str());
        publish(nc_id, &NcEvent::ActionsCompleted);
    }
    tracing::info!(nc_id, action_id, status = %action.status, "Action updated");
    Ok(action)
}

pub async fn delete_action(
    conn: &mut AsyncPgConnection,
    nc_id: i64,
    action_id: i64,
) -> anyhow::Result<()> {
    let action = find_action(conn, nc_id, action_id).await?;
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            diesel::delete(qms_nc_actions::table.find(action_id))
                .execute(conn)
                .await?;
            if let Some(global_id) = action.global_action_id {
                diesel::delete(qms_actions::table.find(global_id))
                    .execute(conn)
                    .await?;
            }
            Ok(())
        }
        .scope_boxed()
    })
    .await?;
    tracing::info!(nc_id, action_id, "Action deleted");
    Ok(())
}

// ── Closure ──

/// Close a case once every action is DONE; linked global actions complete.
pub async fn close(
    conn: &mut AsyncPgConnection,
    nc_id: i64,
    req: CloseNonconformanceRequest,
    user_id: i64,
) -> anyhow::Result<NonconformanceView> {
    let record = find(conn, nc_id).await?;
    let actions = load_actions(conn, &[nc_id]).await?.remove(&nc_id).unwrap_or_default();
    if !ready_to_close(actions.iter().map(|a| a.status.as_str())) {
        return Err(Rejection::Invalid("Cannot close: Not all actions are completed".to_string()).into());
    }

    let now = Utc::now();
    let approved_by = req
        .approved_by
        .clone()
        .filter(|a| !a.trim().is_empty());
    let user_name = approved_by.clone().unwrap_or_else(|| SYSTEM_USER.to_string());
    let metadata = serde_json::json!({
        "closureComments": req.comments,
        "totalActions": actions.len(),
    });
    let closure = NonconformanceClosure {
        status: NcStatus::Closed.as_str().to_string(),
        closed_date: Some(now),
        closure_signature: req.signature,
        closure_approved_by: approved_by,
        closure_approved_at: Some(now),
        closure_comments: req.comments,
        write_uid: Some(user_id),
        write_date: Some(now),
    };
    let global_ids: Vec<i64> = actions.iter().filter_map(|a| a.global_action_id).collect();

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            diesel::update(qms_nonconformances::table.find(nc_id))
                .set(&closure)
                .execute(conn)
                .await?;
            if !global_ids.is_empty() {
                diesel::update(qms_actions::table.filter(qms_actions::id.eq_any(&global_ids)))
                    .set((
                        qms_actions::status.eq(ActionStatus::Completed.as_str()),
                        qms_actions::write_uid.eq(Some(user_id)),
                        qms_actions::write_date.eq(Some(now)),
                    ))
                    .execute(conn)
                    .await?;
            }
            insert_log(
                conn,
                log_entry(
                    nc_id,
                    "CLOSED",
                    format!("Case {} closed", record.ref_number),
                    &user_name,
                    Some(metadata),
                ),
            )
            .await
        }
        .scope_boxed()
    })
    .await?;

    crate::metrics::status_changed("nonconformance", NcStatus::Closed.as_str());
    publish(nc_id, &NcEvent::CaseClosed { closed_by: user_id });
    get(conn, nc_id).await
}

// ── Pareto ──

#[derive(Debug, QueryableByName)]
struct LabelCount {
    #[diesel(sql_type = Nullable<Text>)]
    label: Option<String>,
    #[diesel(sql_type = BigInt)]
    count: i64,
}

#[derive(Debug, Serialize)]
pub struct ParetoReport {
    pub by: ParetoDimension,
    pub range: ParetoRange,
    #[serde(flatten)]
    pub analysis: ParetoAnalysis,
}

/// Fold raw group counts into labelled counts; blank and missing values
/// share one bucket.
fn label_counts(rows: Vec<LabelCount>, missing: &str) -> Vec<(String, i64)> {
    let mut merged: HashMap<String, i64> = HashMap::new();
    for row in rows {
        let label = row
            .label
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| missing.to_string());
        *merged.entry(label).or_default() += row.count;
    }
    merged.into_iter().collect()
}

/// Count cases per value of `query.by` within `query.range`.
pub async fn pareto(conn: &mut AsyncPgConnection, query: &ParetoQuery) -> anyhow::Result<ParetoReport> {
    let since = query.range.days().map(|d| Utc::now() - Duration::days(d));
    let rows: Vec<LabelCount> = diesel::sql_query(format!(
        "SELECT {column}::text AS label, COUNT(*) AS count \
         FROM qms_nonconformances \
         WHERE ($1::timestamptz IS NULL OR date_raised >= $1) \
         GROUP BY {column}",
        column = query.by.column()
    ))
    .bind::<Nullable<Timestamptz>, _>(since)
    .load(conn)
    .await?;

    Ok(ParetoReport {
        by: query.by,
        range: query.range,
        analysis: pareto::analyse(label_counts(rows, query.by.missing_label())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_done_needs_at_least_one_action() {
        assert!(!all_done(Vec::<&str>::new()));
        assert!(all_done(["DONE", "DONE"]));
        assert!(!all_done(["DONE", "IN_PROGRESS"]));
    }

    #[test]
    fn finished_actions_escalate_any_unclosed_case() {
        assert_eq!(escalation("OPEN", ["DONE", "DONE"]), Some(NcStatus::PendingVerification));
        assert_eq!(escalation("IN_PROGRESS", ["DONE"]), Some(NcStatus::PendingVerification));
        assert_eq!(
            escalation("PENDING_VERIFICATION", ["DONE"]),
            Some(NcStatus::PendingVerification)
        );
    }

    #[test]
    fn closed_or_unfinished_cases_do_not_escalate() {
        assert_eq!(escalation("CLOSED", ["DONE"]), None);
        assert_eq!(escalation("OPEN", ["DONE", "IN_PROGRESS"]), None);
        assert_eq!(escalation("OPEN", Vec::<&str>::new()), None);
    }

    #[test]
    fn open_actions_block_closing() {
        assert!(ready_to_close(["DONE", "DONE"]));
        assert!(ready_to_close(Vec::<&str>::new()));
        assert!(!ready_to_close(["DONE", "OPEN"]));
        assert!(!ready_to_close(["IN_PROGRESS"]));
    }

    #[test]
    fn missing_labels_share_a_bucket() {
        let rows = vec![
            LabelCount { label: None, count: 2 },
            LabelCount { label: Some(" ".into()), count: 1 },
            LabelCount { label: Some("Packaging".into()), count: 4 },
        ];
        let mut counts = label_counts(rows, "Uncategorized");
        counts.sort();
        assert_eq!(
            counts,
            vec![("Packaging".to_string(), 4), ("Uncategorized".to_string(), 3)]
        );
    }
}
