//! Management reviews: the meeting record, its sub-records and the
//! completion gate.

use std::collections::{HashMap, HashSet};

use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::compliance::review::{self as rules, AttendeeState};
use crate::error::Rejection;
use crate::events::management_review::{publish, transition_allowed, ReviewEvent};
use crate::models::audit::Pagination;
use crate::models::management_review::{
    standards_json, CreateAttendeeRequest, CreateEvidenceRequest, CreateInputRequest,
    CreateManagementReviewRequest, CreateOutputRequest, CreateReviewActionRequest,
    LoadTemplateRequest, ManagementReview, ManagementReviewView, NewReviewInput, NewReviewLog,
    NewReviewOutput, ReviewAction, ReviewActionQuery, ReviewActionSummary, ReviewAttendee,
    ReviewEvidence, ReviewInput, ReviewListQuery, ReviewLog, ReviewOutput, ReviewPage,
    TemplateLoad, TemplateSummary, UpdateAttendeeRequest, UpdateEvidenceRequest,
    UpdateInputRequest, UpdateManagementReviewRequest, UpdateOutputRequest,
    UpdateReviewActionRequest,
};
use crate::models::vocab::{ReviewInputStatus, ReviewStatus};
use crate::schema::{
    qms_management_reviews, qms_review_actions, qms_review_attendees, qms_review_evidence,
    qms_review_inputs, qms_review_logs, qms_review_outputs,
};

fn not_found(entity: &str) -> anyhow::Error {
    Rejection::NotFound(format!("{entity} not found")).into()
}

fn invalid(message: impl Into<String>) -> anyhow::Error {
    Rejection::Invalid(message.into()).into()
}

/// Write an entry to the review's audit log and publish it.
async fn record(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    actor_id: i64,
    event: ReviewEvent,
) -> anyhow::Result<()> {
    diesel::insert_into(qms_review_logs::table)
        .values(&NewReviewLog {
            review_id,
            actor_id: Some(actor_id),
            event: event.kind().to_string(),
            details: Some(event.details()),
        })
        .execute(conn)
        .await?;
    publish(review_id, &event);
    Ok(())
}

fn group<T>(rows: Vec<T>, key: impl Fn(&T) -> i64) -> HashMap<i64, Vec<T>> {
    let mut grouped: HashMap<i64, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(key(&row)).or_default().push(row);
    }
    grouped
}

/// Attach attendees, inputs, outputs, actions and evidence to each review,
/// plus the audit log when `with_log` is set.
async fn hydrate(
    conn: &mut AsyncPgConnection,
    reviews: Vec<ManagementReview>,
    with_log: bool,
) -> anyhow::Result<Vec<ManagementReviewView>> {
    let ids: Vec<i64> = reviews.iter().map(|r| r.id).collect();

    let attendees: Vec<ReviewAttendee> = qms_review_attendees::table
        .filter(qms_review_attendees::review_id.eq_any(&ids))
        .order((qms_review_attendees::created_at.asc(), qms_review_attendees::id.asc()))
        .select(ReviewAttendee::as_select())
        .load(conn)
        .await?;
    let inputs: Vec<ReviewInput> = qms_review_inputs::table
        .filter(qms_review_inputs::review_id.eq_any(&ids))
        .order((
            qms_review_inputs::standard.asc(),
            qms_review_inputs::clause_ref.asc(),
            qms_review_inputs::id.asc(),
        ))
        .select(ReviewInput::as_select())
        .load(conn)
        .await?;
    let outputs: Vec<ReviewOutput> = qms_review_outputs::table
        .filter(qms_review_outputs::review_id.eq_any(&ids))
        .order((
            qms_review_outputs::standard.asc(),
            qms_review_outputs::clause_ref.asc(),
            qms_review_outputs::id.asc(),
        ))
        .select(ReviewOutput::as_select())
        .load(conn)
        .await?;
    let actions: Vec<ReviewAction> = qms_review_actions::table
        .filter(qms_review_actions::review_id.eq_any(&ids))
        .order((qms_review_actions::created_at.desc(), qms_review_actions::id.desc()))
        .select(ReviewAction::as_select())
        .load(conn)
        .await?;
    let evidence: Vec<ReviewEvidence> = qms_review_evidence::table
        .filter(qms_review_evidence::review_id.eq_any(&ids))
        .order((qms_review_evidence::uploaded_at.desc(), qms_review_evidence::id.desc()))
        .select(ReviewEvidence::as_select())
        .load(conn)
        .await?;
    let mut logs = if with_log {
        let rows: Vec<ReviewLog> = qms_review_logs::table
            .filter(qms_review_logs::review_id.eq_any(&ids))
            .order((qms_review_logs::logged_at.desc(), qms_review_logs::id.desc()))
            .select(ReviewLog::as_select())
            .load(conn)
            .await?;
        Some(group(rows, |l| l.review_id))
    } else {
        None
    };

    let mut attendees = group(attendees, |a| a.review_id);
    let mut inputs = group(inputs, |i| i.review_id);
    let mut outputs = group(outputs, |o| o.review_id);
    let mut actions = group(actions, |a| a.review_id);
    let mut evidence = group(evidence, |e| e.review_id);

    Ok(reviews
        .into_iter()
        .map(|review| {
            let id = review.id;
            ManagementReviewView {
                attendees: attendees.remove(&id).unwrap_or_default(),
                inputs: inputs.remove(&id).unwrap_or_default(),
                outputs: outputs.remove(&id).unwrap_or_default(),
                actions: actions.remove(&id).unwrap_or_default(),
                evidence_links: evidence.remove(&id).unwrap_or_default(),
                audit_log: logs.as_mut().map(|l| l.remove(&id).unwrap_or_default()),
                review,
            }
        })
        .collect())
}

fn filtered(
    query: &ReviewListQuery,
) -> anyhow::Result<qms_management_reviews::BoxedQuery<'static, Pg>> {
    let mut q = qms_management_reviews::table.into_boxed();
    if let Some(status) = query.status {
        q = q.filter(qms_management_reviews::status.eq(status.as_str()));
    }
    let standards = query.standard_filter().map_err(invalid)?;
    if !standards.is_empty() {
        q = q.filter(qms_management_reviews::standards.contains(standards_json(&standards)));
    }
    if let Some(from) = query.date_from {
        q = q.filter(qms_management_reviews::scheduled_at.ge(from));
    }
    if let Some(to) = query.date_to {
        q = q.filter(qms_management_reviews::scheduled_at.le(to));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        q = q.filter(qms_management_reviews::title.ilike(format!("%{search}%")));
    }
    Ok(q)
}

/// One page of reviews, latest meeting first.
pub async fn list(
    conn: &mut AsyncPgConnection,
    query: &ReviewListQuery,
    limit: i64,
) -> anyhow::Result<ReviewPage> {
    let total: i64 = filtered(query)?.count().get_result(conn).await?;
    let reviews: Vec<ManagementReview> = filtered(query)?
        .order((qms_management_reviews::scheduled_at.desc(), qms_management_reviews::id.desc()))
        .limit(limit)
        .offset(query.offset(limit))
        .select(ManagementReview::as_select())
        .load(conn)
        .await?;
    Ok(ReviewPage {
        reviews: hydrate(conn, reviews, false).await?,
        pagination: Pagination::new(query.page(), limit, total),
    })
}

pub async fn find(conn: &mut AsyncPgConnection, review_id: i64) -> anyhow::Result<ManagementReview> {
    qms_management_reviews::table
        .find(review_id)
        .select(ManagementReview::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| not_found("Review"))
}

pub async fn get(conn: &mut AsyncPgConnection, review_id: i64) -> anyhow::Result<ManagementReviewView> {
    let review = find(conn, review_id).await?;
    hydrate(conn, vec![review], true)
        .await?
        .pop()
        .ok_or_else(|| not_found("Review"))
}

/// Create a DRAFT review and log CREATED.
pub async fn create(
    conn: &mut AsyncPgConnection,
    req: CreateManagementReviewRequest,
    user_id: i64,
) -> anyhow::Result<ManagementReviewView> {
    let new = req
        .into_new(user_id)
        .ok_or_else(|| invalid("scheduledAt is required"))?;
    let review_id = conn
        .transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                let review_id: i64 = diesel::insert_into(qms_management_reviews::table)
                    .values(&new)
                    .returning(qms_management_reviews::id)
                    .get_result(conn)
                    .await?;
                record(conn, review_id, user_id, ReviewEvent::Created).await?;
                Ok(review_id)
            }
            .scope_boxed()
        })
        .await?;

    crate::metrics::record_created("management_review");
    tracing::info!(review_id, user_id, "Management review created");
    get(conn, review_id).await
}

/// Reasons `view` cannot be completed with the pending changes in `req`.
fn completion_blockers(view: &ManagementReviewView, req: &UpdateManagementReviewRequest) -> Vec<String> {
    let standards: Vec<String> = match &req.standards {
        Some(list) => list.iter().map(|s| s.as_str().to_string()).collect(),
        None => view.review.standard_codes(),
    };
    let notes = match &req.discussion_notes {
        Some(notes) => notes.as_deref(),
        None => view.review.discussion_notes.as_deref(),
    };
    let output_standards: Vec<&str> = view.outputs.iter().map(|o| o.standard.as_str()).collect();
    let attendees: Vec<AttendeeState<'_>> = view
        .attendees
        .iter()
        .map(|a| AttendeeState {
            name: &a.name,
            required: a.required,
            present: a.present,
            signed_off: a.signed_off_at.is_some(),
        })
        .collect();
    rules::completion_blockers(
        &standards,
        view.inputs.iter().map(|i| i.status.as_str()),
        &output_standards,
        notes,
        &attendees,
    )
}

/// Apply a partial update. A status change must follow the review
/// lifecycle, and moving to COMPLETED must clear every completion check.
pub async fn update(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    req: UpdateManagementReviewRequest,
    user_id: i64,
) -> anyhow::Result<ManagementReviewView> {
    let current = get(conn, review_id).await?;
    let from = current
        .review
        .status
        .parse::<ReviewStatus>()
        .unwrap_or(ReviewStatus::Draft);
    let change = req.status.filter(|to| *to != from);

    if let Some(to) = change {
        if !transition_allowed(from, to) {
            return Err(invalid(format!("Invalid status transition from {from} to {to}")));
        }
        if to == ReviewStatus::Completed {
            let blockers = completion_blockers(&current, &req);
            if !blockers.is_empty() {
                return Err(invalid(format!(
                    "Review cannot be completed: {}",
                    blockers.join(", ")
                )));
            }
        }
    }

    let changes = req.into_changes(user_id);
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            diesel::update(qms_management_reviews::table.find(review_id))
                .set(&changes)
                .execute(conn)
                .await?;
            if let Some(to) = change {
                record(conn, review_id, user_id, ReviewEvent::StatusChanged { from, to }).await?;
            }
            record(conn, review_id, user_id, ReviewEvent::updated("Review updated")).await?;
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    if let Some(to) = change {
        crate::metrics::status_changed("management_review", to.as_str());
        tracing::info!(review_id, from = %from, to = %to, "Management review status changed");
    }
    get(conn, review_id).await
}

/// Only DRAFT reviews can be deleted; sub-records go with them.
pub async fn delete(conn: &mut AsyncPgConnection, review_id: i64) -> anyhow::Result<()> {
    let review = find(conn, review_id).await?;
    if review.status != ReviewStatus::Draft.as_str() {
        return Err(invalid("Only draft reviews can be deleted"));
    }
    diesel::delete(qms_management_reviews::table.find(review_id))
        .execute(conn)
        .await?;
    tracing::info!(review_id, "Management review deleted");
    Ok(())
}

// ── Attendees ──

pub async fn add_attendee(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    req: CreateAttendeeRequest,
    user_id: i64,
) -> anyhow::Result<ReviewAttendee> {
    find(conn, review_id).await?;
    let new = req.into_new(review_id);
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            let attendee: ReviewAttendee = diesel::insert_into(qms_review_attendees::table)
                .values(&new)
                .returning(ReviewAttendee::as_returning())
                .get_result(conn)
                .await?;
            let details = format!("Attendee {} added", attendee.name);
            record(conn, review_id, user_id, ReviewEvent::updated(details)).await?;
            Ok(attendee)
        }
        .scope_boxed()
    })
    .await
}

/// Update an attendee; setting `signedOffAt` for the first time logs a
/// SIGN_OFF entry.
pub async fn update_attendee(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    attendee_id: i64,
    req: UpdateAttendeeRequest,
    user_id: i64,
) -> anyhow::Result<ReviewAttendee> {
    let existing: ReviewAttendee = qms_review_attendees::table
        .filter(qms_review_attendees::id.eq(attendee_id))
        .filter(qms_review_attendees::review_id.eq(review_id))
        .select(ReviewAttendee::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| not_found("Attendee"))?;
    let first_sign_off = req.signs_off() && existing.signed_off_at.is_none();
    let changes = req.into_changes();

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            let attendee: ReviewAttendee = diesel::update(qms_review_attendees::table.find(attendee_id))
                .set(&changes)
                .returning(ReviewAttendee::as_returning())
                .get_result(conn)
                .await?;
            if first_sign_off {
                let event = ReviewEvent::SignedOff {
                    attendee: attendee.name.clone(),
                };
                record(conn, review_id, user_id, event).await?;
            }
            Ok(attendee)
        }
        .scope_boxed()
    })
    .await
}

pub async fn remove_attendee(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    attendee_id: i64,
    user_id: i64,
) -> anyhow::Result<()> {
    let name: Option<String> = diesel::delete(
        qms_review_attendees::table
            .filter(qms_review_attendees::id.eq(attendee_id))
            .filter(qms_review_attendees::review_id.eq(review_id)),
    )
    .returning(qms_review_attendees::name)
    .get_result(conn)
    .await
    .optional()?;
    let name = name.ok_or_else(|| not_found("Attendee"))?;
    record(conn, review_id, user_id, ReviewEvent::updated(format!("Attendee {name} removed"))).await
}

// ── Inputs ──

pub async fn add_input(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    req: CreateInputRequest,
    user_id: i64,
) -> anyhow::Result<ReviewInput> {
    find(conn, review_id).await?;
    let new = req.into_new(review_id);
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            let input: ReviewInput = diesel::insert_into(qms_review_inputs::table)
                .values(&new)
                .returning(ReviewInput::as_returning())
                .get_result(conn)
                .await?;
            let details = format!("Input {} added", input.title);
            record(conn, review_id, user_id, ReviewEvent::updated(details)).await?;
            Ok(input)
        }
        .scope_boxed()
    })
    .await
}

pub async fn update_input(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    input_id: i64,
    req: UpdateInputRequest,
) -> anyhow::Result<ReviewInput> {
    diesel::update(
        qms_review_inputs::table
            .filter(qms_review_inputs::id.eq(input_id))
            .filter(qms_review_inputs::review_id.eq(review_id)),
    )
    .set(&req.into_changes())
    .returning(ReviewInput::as_returning())
    .get_result(conn)
    .await
    .optional()?
    .ok_or_else(|| not_found("Input"))
}

pub async fn delete_input(conn: &mut AsyncPgConnection, review_id: i64, input_id: i64) -> anyhow::Result<()> {
    let deleted = diesel::delete(
        qms_review_inputs::table
            .filter(qms_review_inputs::id.eq(input_id))
            .filter(qms_review_inputs::review_id.eq(review_id)),
    )
    .execute(conn)
    .await?;
    if deleted == 0 {
        return Err(not_found("Input"));
    }
    Ok(())
}

// ── Outputs ──

pub async fn add_output(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    req: CreateOutputRequest,
    user_id: i64,
) -> anyhow::Result<ReviewOutput> {
    find(conn, review_id).await?;
    let new = req.into_new(review_id);
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            let output: ReviewOutput = diesel::insert_into(qms_review_outputs::table)
                .values(&new)
                .returning(ReviewOutput::as_returning())
                .get_result(conn)
                .await?;
            let details = format!("Output {} {} added", output.standard, output.clause_ref);
            record(conn, review_id, user_id, ReviewEvent::updated(details)).await?;
            Ok(output)
        }
        .scope_boxed()
    })
    .await
}

pub async fn update_output(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    output_id: i64,
    req: UpdateOutputRequest,
) -> anyhow::Result<ReviewOutput> {
    diesel::update(
        qms_review_outputs::table
            .filter(qms_review_outputs::id.eq(output_id))
            .filter(qms_review_outputs::review_id.eq(review_id)),
    )
    .set(&req.into_changes())
    .returning(ReviewOutput::as_returning())
    .get_result(conn)
    .await
    .optional()?
    .ok_or_else(|| not_found("Output"))
}

pub async fn delete_output(conn: &mut AsyncPgConnection, review_id: i64, output_id: i64) -> anyhow::Result<()> {
    let deleted = diesel::delete(
        qms_review_outputs::table
            .filter(qms_review_outputs::id.eq(output_id))
            .filter(qms_review_outputs::review_id.eq(review_id)),
    )
    .execute(conn)
    .await?;
    if deleted == 0 {
        return Err(not_found("Output"));
    }
    Ok(())
}

// ── Actions ──

pub async fn add_action(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    req: CreateReviewActionRequest,
    user_id: i64,
) -> anyhow::Result<ReviewAction> {
    find(conn, review_id).await?;
    let new = req.into_new(review_id);
    let action = conn
        .transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                let action: ReviewAction = diesel::insert_into(qms_review_actions::table)
                    .values(&new)
                    .returning(ReviewAction::as_returning())
                    .get_result(conn)
                    .await?;
                let details = format!("Action {} added", action.title);
                record(conn, review_id, user_id, ReviewEvent::updated(details)).await?;
                Ok(action)
            }
            .scope_boxed()
        })
        .await?;
    crate::metrics::record_created("management_review_action");
    Ok(action)
}

pub async fn update_action(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    action_id: i64,
    req: UpdateReviewActionRequest,
) -> anyhow::Result<ReviewAction> {
    let action: ReviewAction = diesel::update(
        qms_review_actions::table
            .filter(qms_review_actions::id.eq(action_id))
            .filter(qms_review_actions::review_id.eq(review_id)),
    )
    .set(&req.into_changes())
    .returning(ReviewAction::as_returning())
    .get_result(conn)
    .await
    .optional()?
    .ok_or_else(|| not_found("Action"))?;
    tracing::info!(review_id, action_id, status = %action.status, "Management review action updated");
    Ok(action)
}

pub async fn delete_action(conn: &mut AsyncPgConnection, review_id: i64, action_id: i64) -> anyhow::Result<()> {
    let deleted = diesel::delete(
        qms_review_actions::table
            .filter(qms_review_actions::id.eq(action_id))
            .filter(qms_review_actions::review_id.eq(review_id)),
    )
    .execute(conn)
    .await?;
    if deleted == 0 {
        return Err(not_found("Action"));
    }
    Ok(())
}

/// Actions across every review, newest first, for the action register.
pub async fn list_actions(
    conn: &mut AsyncPgConnection,
    query: &ReviewActionQuery,
    limit: i64,
) -> anyhow::Result<Vec<ReviewActionSummary>> {
    let mut q = qms_review_actions::table
        .inner_join(qms_management_reviews::table)
        .into_boxed();
    if let Some(review_id) = query.review_id {
        q = q.filter(qms_review_actions::review_id.eq(review_id));
    }
    if let Some(status) = query.status {
        q = q.filter(qms_review_actions::status.eq(status.as_str()));
    }
    let rows: Vec<(ReviewAction, ManagementReview)> = q
        .order((qms_review_actions::created_at.desc(), qms_review_actions::id.desc()))
        .limit(limit)
        .select((ReviewAction::as_select(), ManagementReview::as_select()))
        .load(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(action, review)| ReviewActionSummary::new(action, &review))
        .collect())
}

// ── Evidence ──

pub async fn add_evidence(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    req: CreateEvidenceRequest,
    user_id: i64,
) -> anyhow::Result<ReviewEvidence> {
    find(conn, review_id).await?;
    let new = req.into_new(review_id, user_id);
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            let evidence: ReviewEvidence = diesel::insert_into(qms_review_evidence::table)
                .values(&new)
                .returning(ReviewEvidence::as_returning())
                .get_result(conn)
                .await?;
            let details = format!("Evidence {} added", evidence.label);
            record(conn, review_id, user_id, ReviewEvent::updated(details)).await?;
            Ok(evidence)
        }
        .scope_boxed()
    })
    .await
}

pub async fn update_evidence(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    evidence_id: i64,
    req: UpdateEvidenceRequest,
) -> anyhow::Result<ReviewEvidence> {
    diesel::update(
        qms_review_evidence::table
            .filter(qms_review_evidence::id.eq(evidence_id))
            .filter(qms_review_evidence::review_id.eq(review_id)),
    )
    .set(&req.into_changes())
    .returning(ReviewEvidence::as_returning())
    .get_result(conn)
    .await
    .optional()?
    .ok_or_else(|| not_found("Evidence"))
}

pub async fn delete_evidence(conn: &mut AsyncPgConnection, review_id: i64, evidence_id: i64) -> anyhow::Result<()> {
    let deleted = diesel::delete(
        qms_review_evidence::table
            .filter(qms_review_evidence::id.eq(evidence_id))
            .filter(qms_review_evidence::review_id.eq(review_id)),
    )
    .execute(conn)
    .await?;
    if deleted == 0 {
        return Err(not_found("Evidence"));
    }
    Ok(())
}

// ── Templates ──

/// Add the clause 9.3 inputs and outputs of each requested standard. Clauses
/// the review already has are skipped unless `includeExisting` is set.
pub async fn load_template(
    conn: &mut AsyncPgConnection,
    review_id: i64,
    req: LoadTemplateRequest,
    user_id: i64,
) -> anyhow::Result<TemplateLoad> {
    find(conn, review_id).await?;

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            let have_inputs: HashSet<(String, String)> = qms_review_inputs::table
                .filter(qms_review_inputs::review_id.eq(review_id))
                .select((qms_review_inputs::standard, qms_review_inputs::clause_ref))
                .load::<(String, String)>(conn)
                .await?
                .into_iter()
                .collect();
            let have_outputs: HashSet<(String, String)> = qms_review_outputs::table
                .filter(qms_review_outputs::review_id.eq(review_id))
                .select((qms_review_outputs::standard, qms_review_outputs::clause_ref))
                .load::<(String, String)>(conn)
                .await?
                .into_iter()
                .collect();

            let mut new_inputs = Vec::new();
            let mut new_outputs = Vec::new();
            for standard in &req.standards {
                let Some(template) = rules::template(*standard) else {
                    continue;
                };
                let code = standard.as_str().to_string();
                for t in &template.inputs {
                    if req.include_existing || !have_inputs.contains(&(code.clone(), t.clause_ref.clone())) {
                        new_inputs.push(NewReviewInput {
                            review_id,
                            standard: code.clone(),
                            clause_ref: t.clause_ref.clone(),
                            title: t.title.clone(),
                            description: t.description.clone(),
                            data_source: None,
                            status: ReviewInputStatus::Pending.as_str().to_string(),
                            remarks: None,
                        });
                    }
                }
                for t in &template.outputs {
                    if req.include_existing || !have_outputs.contains(&(code.clone(), t.clause_ref.clone())) {
                        new_outputs.push(NewReviewOutput {
                            review_id,
                            standard: code.clone(),
                            clause_ref: t.clause_ref.clone(),
                            decision: t.decision.clone(),
                            output_type: t.output_type.as_str().to_string(),
                        });
                    }
                }
            }

            let inputs: Vec<ReviewInput> = if new_inputs.is_empty() {
                Vec::new()
            } else {
                diesel::insert_into(qms_review_inputs::table)
                    .values(&new_inputs)
                    .returning(ReviewInput::as_returning())
                    .get_results(conn)
                    .await?
            };
            let outputs: Vec<ReviewOutput> = if new_outputs.is_empty() {
                Vec::new()
            } else {
                diesel::insert_into(qms_review_outputs::table)
                    .values(&new_outputs)
                    .returning(ReviewOutput::as_returning())
                    .get_results(conn)
                    .await?
            };

            let codes: Vec<&str> = req.standards.iter().map(|s| s.as_str()).collect();
            let details = format!("Template loaded for standards: {}", codes.join(", "));
            record(conn, review_id, user_id, ReviewEvent::updated(details)).await?;

            tracing::info!(
                review_id,
                inputs = inputs.len(),
                outputs = outputs.len(),
                "Management review template loaded"
            );
            Ok(TemplateLoad {
                message: "Template loaded successfully",
                summary: TemplateSummary {
                    standards: req.standards,
                    inputs_created: inputs.len(),
                    outputs_created: outputs.len(),
                },
                inputs,
                outputs,
            })
        }
        .scope_boxed()
    })
    .await
}
