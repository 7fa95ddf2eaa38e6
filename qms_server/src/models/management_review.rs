//! qms.management.review: periodic top-management reviews with their
//! attendees, clause inputs, decisions, follow-up actions, evidence links
//! and an audit log.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::audit::{Pagination, MAX_PAGE};
use super::vocab::{
    MeetingType, ReviewActionStatus, ReviewInputStatus, ReviewOutputType, ReviewStandard,
    ReviewStatus,
};
use super::{double_option, require, url_is_valid};
use crate::schema::{
    qms_management_reviews, qms_review_actions, qms_review_attendees, qms_review_evidence,
    qms_review_inputs, qms_review_logs, qms_review_outputs,
};

pub const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_management_reviews)]
#[serde(rename_all = "camelCase")]
pub struct ManagementReview {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub meeting_type: String,
    pub standards: serde_json::Value,
    pub agenda: Option<String>,
    pub location: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub discussion_notes: Option<String>,
    #[serde(rename = "createdById")]
    pub create_uid: Option<i64>,
    #[serde(rename = "createdAt")]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(rename = "updatedById")]
    pub write_uid: Option<i64>,
    #[serde(rename = "updatedAt")]
    pub write_date: Option<DateTime<Utc>>,
}

impl ManagementReview {
    /// Standards stored on the review, in their stored spelling.
    pub fn standard_codes(&self) -> Vec<String> {
        self.standards
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_management_reviews)]
pub struct NewManagementReview {
    pub title: String,
    pub status: String,
    pub meeting_type: String,
    pub standards: serde_json::Value,
    pub agenda: Option<String>,
    pub location: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_management_reviews)]
pub struct ManagementReviewChanges {
    pub title: Option<String>,
    pub status: Option<String>,
    pub meeting_type: Option<String>,
    pub standards: Option<serde_json::Value>,
    pub agenda: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<Option<DateTime<Utc>>>,
    pub ended_at: Option<Option<DateTime<Utc>>>,
    pub discussion_notes: Option<Option<String>>,
    pub write_uid: Option<i64>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_review_attendees)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAttendee {
    pub id: i64,
    pub review_id: i64,
    pub name: String,
    pub role: Option<String>,
    pub required: bool,
    pub present: bool,
    pub user_id: Option<i64>,
    pub signed_off_at: Option<DateTime<Utc>>,
    pub signature: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_review_attendees)]
pub struct NewReviewAttendee {
    pub review_id: i64,
    pub name: String,
    pub role: Option<String>,
    pub required: bool,
    pub present: bool,
    pub user_id: Option<i64>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_review_attendees)]
pub struct ReviewAttendeeChanges {
    pub name: Option<String>,
    pub role: Option<Option<String>>,
    pub required: Option<bool>,
    pub present: Option<bool>,
    pub user_id: Option<Option<i64>>,
    pub signed_off_at: Option<Option<DateTime<Utc>>>,
    pub signature: Option<Option<String>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_review_inputs)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub id: i64,
    pub review_id: i64,
    pub standard: String,
    pub clause_ref: String,
    pub title: String,
    pub description: String,
    pub data_source: Option<String>,
    pub status: String,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_review_inputs)]
pub struct NewReviewInput {
    pub review_id: i64,
    pub standard: String,
    pub clause_ref: String,
    pub title: String,
    pub description: String,
    pub data_source: Option<String>,
    pub status: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_review_inputs)]
pub struct ReviewInputChanges {
    pub standard: Option<String>,
    pub clause_ref: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub data_source: Option<Option<String>>,
    pub status: Option<String>,
    pub remarks: Option<Option<String>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_review_outputs)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutput {
    pub id: i64,
    pub review_id: i64,
    pub standard: String,
    pub clause_ref: String,
    pub decision: String,
    #[serde(rename = "type")]
    pub output_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_review_outputs)]
pub struct NewReviewOutput {
    pub review_id: i64,
    pub standard: String,
    pub clause_ref: String,
    pub decision: String,
    pub output_type: String,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_review_outputs)]
pub struct ReviewOutputChanges {
    pub standard: Option<String>,
    pub clause_ref: Option<String>,
    pub decision: Option<String>,
    pub output_type: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_review_actions)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAction {
    pub id: i64,
    pub review_id: i64,
    pub title: String,
    pub owner_id: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: String,
    pub linkage: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_review_actions)]
pub struct NewReviewAction {
    pub review_id: i64,
    pub title: String,
    pub owner_id: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: String,
    pub linkage: Option<String>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_review_actions)]
pub struct ReviewActionChanges {
    pub title: Option<String>,
    pub owner_id: Option<Option<i64>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<String>,
    pub linkage: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_review_evidence)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvidence {
    pub id: i64,
    pub review_id: i64,
    pub label: String,
    pub url: String,
    pub uploaded_by: Option<i64>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_review_evidence)]
pub struct NewReviewEvidence {
    pub review_id: i64,
    pub label: String,
    pub url: String,
    pub uploaded_by: Option<i64>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_review_evidence)]
pub struct ReviewEvidenceChanges {
    pub label: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_review_logs)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLog {
    pub id: i64,
    pub review_id: i64,
    pub actor_id: Option<i64>,
    pub event: String,
    pub details: Option<String>,
    #[serde(rename = "at")]
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_review_logs)]
pub struct NewReviewLog {
    pub review_id: i64,
    pub actor_id: Option<i64>,
    pub event: String,
    pub details: Option<String>,
}

/// A review with everything attached to it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementReviewView {
    #[serde(flatten)]
    pub review: ManagementReview,
    pub attendees: Vec<ReviewAttendee>,
    pub inputs: Vec<ReviewInput>,
    pub outputs: Vec<ReviewOutput>,
    pub actions: Vec<ReviewAction>,
    pub evidence_links: Vec<ReviewEvidence>,
    /// Only filled for a single review.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<Vec<ReviewLog>>,
}

#[derive(Debug, Serialize)]
pub struct ReviewPage {
    pub reviews: Vec<ManagementReviewView>,
    pub pagination: Pagination,
}

/// A review action as listed in the organisation-wide action view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewActionSummary {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub details: String,
    pub owner_id: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: String,
    pub source: &'static str,
    pub review_id: i64,
    pub review_title: String,
    pub review_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewActionSummary {
    pub fn new(action: ReviewAction, review: &ManagementReview) -> Self {
        Self {
            id: action.id,
            kind: "MANAGEMENT_REVIEW",
            title: action.title,
            details: action.linkage.unwrap_or_default(),
            owner_id: action.owner_id,
            due_date: action.due_date,
            status: action.status,
            source: "Management Review",
            review_id: review.id,
            review_title: review.title.clone(),
            review_date: review.scheduled_at,
            created_at: action.created_at,
            updated_at: action.updated_at,
        }
    }
}

/// Stored form of a standards list: a JSON array of codes.
pub fn standards_json(standards: &[ReviewStandard]) -> serde_json::Value {
    serde_json::Value::from(standards.iter().map(|s| s.as_str()).collect::<Vec<_>>())
}

fn validate_title(title: &str, errors: &mut Vec<String>) {
    require(title, "title", errors);
    if title.chars().count() > MAX_TITLE_LEN {
        errors.push(format!("title must be at most {MAX_TITLE_LEN} characters"));
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ── Requests ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateManagementReviewRequest {
    #[serde(default)]
    pub title: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub meeting_type: MeetingType,
    #[serde(default)]
    pub standards: Vec<ReviewStandard>,
    pub agenda: Option<String>,
}

impl CreateManagementReviewRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        validate_title(&self.title, &mut errors);
        if self.scheduled_at.is_none() {
            errors.push("scheduledAt is required".to_string());
        }
        if self.standards.is_empty() {
            errors.push("At least one standard must be selected".to_string());
        }
        errors
    }

    /// `None` without a schedule; `validate` reports it.
    pub fn into_new(self, user_id: i64) -> Option<NewManagementReview> {
        Some(NewManagementReview {
            title: self.title.trim().to_string(),
            status: ReviewStatus::Draft.as_str().to_string(),
            meeting_type: self.meeting_type.as_str().to_string(),
            standards: standards_json(&self.standards),
            agenda: blank_to_none(self.agenda),
            location: blank_to_none(self.location),
            scheduled_at: self.scheduled_at?,
            create_uid: Some(user_id),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateManagementReviewRequest {
    pub title: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    pub meeting_type: Option<MeetingType>,
    pub standards: Option<Vec<ReviewStandard>>,
    #[serde(default, deserialize_with = "double_option")]
    pub agenda: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub started_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub ended_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub discussion_notes: Option<Option<String>>,
    pub status: Option<ReviewStatus>,
}

impl UpdateManagementReviewRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            validate_title(title, &mut errors);
        }
        if self.standards.as_ref().is_some_and(Vec::is_empty) {
            errors.push("At least one standard must be selected".to_string());
        }
        errors
    }

    pub fn into_changes(self, write_uid: i64) -> ManagementReviewChanges {
        ManagementReviewChanges {
            title: self.title.map(|t| t.trim().to_string()),
            status: self.status.map(|s| s.as_str().to_string()),
            meeting_type: self.meeting_type.map(|m| m.as_str().to_string()),
            standards: self.standards.as_deref().map(standards_json),
            agenda: self.agenda,
            location: self.location,
            scheduled_at: self.scheduled_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
            discussion_notes: self.discussion_notes,
            write_uid: Some(write_uid),
            write_date: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttendeeRequest {
    #[serde(default)]
    pub name: String,
    pub role: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub present: bool,
    pub user_id: Option<i64>,
}

impl CreateAttendeeRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.name, "name", &mut errors);
        errors
    }

    pub fn into_new(self, review_id: i64) -> NewReviewAttendee {
        NewReviewAttendee {
            review_id,
            name: self.name.trim().to_string(),
            role: blank_to_none(self.role),
            required: self.required,
            present: self.present,
            user_id: self.user_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAttendeeRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub role: Option<Option<String>>,
    pub required: Option<bool>,
    pub present: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub user_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub signed_off_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub signature: Option<Option<String>>,
}

impl UpdateAttendeeRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            require(name, "name", &mut errors);
        }
        let empty = self.name.is_none()
            && self.role.is_none()
            && self.required.is_none()
            && self.present.is_none()
            && self.user_id.is_none()
            && self.signed_off_at.is_none()
            && self.signature.is_none();
        if empty {
            errors.push(NOTHING_TO_UPDATE.to_string());
        }
        errors
    }

    /// True when this update records a signature time.
    pub fn signs_off(&self) -> bool {
        matches!(self.signed_off_at, Some(Some(_)))
    }

    pub fn into_changes(self) -> ReviewAttendeeChanges {
        ReviewAttendeeChanges {
            name: self.name.map(|n| n.trim().to_string()),
            role: self.role,
            required: self.required,
            present: self.present,
            user_id: self.user_id,
            signed_off_at: self.signed_off_at,
            signature: self.signature,
        }
    }
}

pub const NOTHING_TO_UPDATE: &str = "At least one field must be provided";

fn default_input_status() -> ReviewInputStatus {
    ReviewInputStatus::Pending
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInputRequest {
    pub standard: ReviewStandard,
    #[serde(default)]
    pub clause_ref: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub data_source: Option<String>,
    #[serde(default = "default_input_status")]
    pub status: ReviewInputStatus,
    pub remarks: Option<String>,
}

impl CreateInputRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.clause_ref, "clauseRef", &mut errors);
        require(&self.title, "title", &mut errors);
        require(&self.description, "description", &mut errors);
        errors
    }

    pub fn into_new(self, review_id: i64) -> NewReviewInput {
        NewReviewInput {
            review_id,
            standard: self.standard.as_str().to_string(),
            clause_ref: self.clause_ref.trim().to_string(),
            title: self.title.trim().to_string(),
            description: self.description,
            data_source: blank_to_none(self.data_source),
            status: self.status.as_str().to_string(),
            remarks: self.remarks,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInputRequest {
    pub standard: Option<ReviewStandard>,
    pub clause_ref: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub data_source: Option<Option<String>>,
    pub status: Option<ReviewInputStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub remarks: Option<Option<String>>,
}

impl UpdateInputRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (value, field) in [
            (&self.clause_ref, "clauseRef"),
            (&self.title, "title"),
            (&self.description, "description"),
        ] {
            if let Some(v) = value {
                require(v, field, &mut errors);
            }
        }
        let empty = self.standard.is_none()
            && self.clause_ref.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.data_source.is_none()
            && self.status.is_none()
            && self.remarks.is_none();
        if empty {
            errors.push(NOTHING_TO_UPDATE.to_string());
        }
        errors
    }

    pub fn into_changes(self) -> ReviewInputChanges {
        ReviewInputChanges {
            standard: self.standard.map(|s| s.as_str().to_string()),
            clause_ref: self.clause_ref,
            title: self.title,
            description: self.description,
            data_source: self.data_source,
            status: self.status.map(|s| s.as_str().to_string()),
            remarks: self.remarks,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutputRequest {
    pub standard: ReviewStandard,
    #[serde(default)]
    pub clause_ref: String,
    #[serde(default)]
    pub decision: String,
    #[serde(rename = "type")]
    pub output_type: ReviewOutputType,
}

impl CreateOutputRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.clause_ref, "clauseRef", &mut errors);
        require(&self.decision, "decision", &mut errors);
        errors
    }

    pub fn into_new(self, review_id: i64) -> NewReviewOutput {
        NewReviewOutput {
            review_id,
            standard: self.standard.as_str().to_string(),
            clause_ref: self.clause_ref.trim().to_string(),
            decision: self.decision,
            output_type: self.output_type.as_str().to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutputRequest {
    pub standard: Option<ReviewStandard>,
    pub clause_ref: Option<String>,
    pub decision: Option<String>,
    #[serde(rename = "type")]
    pub output_type: Option<ReviewOutputType>,
}

impl UpdateOutputRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (value, field) in [(&self.clause_ref, "clauseRef"), (&self.decision, "decision")] {
            if let Some(v) = value {
                require(v, field, &mut errors);
            }
        }
        let empty = self.standard.is_none()
            && self.clause_ref.is_none()
            && self.decision.is_none()
            && self.output_type.is_none();
        if empty {
            errors.push(NOTHING_TO_UPDATE.to_string());
        }
        errors
    }

    pub fn into_changes(self) -> ReviewOutputChanges {
        ReviewOutputChanges {
            standard: self.standard.map(|s| s.as_str().to_string()),
            clause_ref: self.clause_ref,
            decision: self.decision,
            output_type: self.output_type.map(|t| t.as_str().to_string()),
        }
    }
}

fn default_action_status() -> ReviewActionStatus {
    ReviewActionStatus::Open
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewActionRequest {
    #[serde(default)]
    pub title: String,
    pub owner_id: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default = "default_action_status")]
    pub status: ReviewActionStatus,
    pub linkage: Option<String>,
}

impl CreateReviewActionRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.title, "title", &mut errors);
        errors
    }

    pub fn into_new(self, review_id: i64) -> NewReviewAction {
        NewReviewAction {
            review_id,
            title: self.title.trim().to_string(),
            owner_id: self.owner_id,
            due_date: self.due_date,
            status: self.status.as_str().to_string(),
            linkage: blank_to_none(self.linkage),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewActionRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub owner_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<ReviewActionStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub linkage: Option<Option<String>>,
}

impl UpdateReviewActionRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            require(title, "title", &mut errors);
        }
        errors
    }

    pub fn into_changes(self) -> ReviewActionChanges {
        ReviewActionChanges {
            title: self.title.map(|t| t.trim().to_string()),
            owner_id: self.owner_id,
            due_date: self.due_date,
            status: self.status.map(|s| s.as_str().to_string()),
            linkage: self.linkage,
            updated_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvidenceRequest {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
}

impl CreateEvidenceRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.label, "label", &mut errors);
        if !url_is_valid(self.url.trim()) {
            errors.push("url must be a valid URL".to_string());
        }
        errors
    }

    pub fn into_new(self, review_id: i64, uploaded_by: i64) -> NewReviewEvidence {
        NewReviewEvidence {
            review_id,
            label: self.label.trim().to_string(),
            url: self.url.trim().to_string(),
            uploaded_by: Some(uploaded_by),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvidenceRequest {
    pub label: Option<String>,
    pub url: Option<String>,
}

impl UpdateEvidenceRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(label) = &self.label {
            require(label, "label", &mut errors);
        }
        if self.url.as_deref().is_some_and(|u| !url_is_valid(u.trim())) {
            errors.push("url must be a valid URL".to_string());
        }
        if self.label.is_none() && self.url.is_none() {
            errors.push(NOTHING_TO_UPDATE.to_string());
        }
        errors
    }

    pub fn into_changes(self) -> ReviewEvidenceChanges {
        ReviewEvidenceChanges {
            label: self.label.map(|l| l.trim().to_string()),
            url: self.url.map(|u| u.trim().to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTemplateRequest {
    #[serde(default)]
    pub standards: Vec<ReviewStandard>,
    /// Add clauses again even when the review already has them.
    #[serde(default)]
    pub include_existing: bool,
}

impl LoadTemplateRequest {
    pub fn validate(&self) -> Vec<String> {
        if self.standards.is_empty() {
            vec!["At least one standard must be selected".to_string()]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub standards: Vec<ReviewStandard>,
    pub inputs_created: usize,
    pub outputs_created: usize,
}

#[derive(Debug, Serialize)]
pub struct TemplateLoad {
    pub message: &'static str,
    pub inputs: Vec<ReviewInput>,
    pub outputs: Vec<ReviewOutput>,
    pub summary: TemplateSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListQuery {
    pub status: Option<ReviewStatus>,
    /// Comma-separated standard codes; a review must cover all of them.
    pub standards: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ReviewListQuery {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Err(e) = self.standard_filter() {
            errors.push(e);
        }
        if self.page.is_some_and(|p| p > MAX_PAGE) {
            errors.push(format!("page must be at most {MAX_PAGE}"));
        }
        errors
    }

    pub fn standard_filter(&self) -> Result<Vec<ReviewStandard>, String> {
        self.standards
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<ReviewStandard>)
            .collect()
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn offset(&self, limit: i64) -> i64 {
        (self.page() - 1).saturating_mul(limit)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewActionQuery {
    pub review_id: Option<i64>,
    pub status: Option<ReviewActionStatus>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn create_review_starts_as_draft() {
        let req: CreateManagementReviewRequest = serde_json::from_str(
            r#"{"title":" Q3 review ","scheduledAt":"2025-09-30T09:00:00Z","meetingType":"QUARTERLY",
                "standards":["ISO9001","ISO14001"],"location":""}"#,
        )
        .unwrap();
        assert!(req.validate().is_empty());
        let new = req.into_new(4).unwrap();
        assert_eq!(new.status, "DRAFT");
        assert_eq!(new.title, "Q3 review");
        assert_eq!(new.standards, serde_json::json!(["ISO9001", "ISO14001"]));
        assert_eq!(new.location, None);
    }

    #[test]
    fn create_review_reports_every_problem() {
        let long = "t".repeat(201);
        let body = serde_json::json!({ "title": long, "meetingType": "ANNUAL" });
        let req: CreateManagementReviewRequest = serde_json::from_value(body).unwrap();
        assert_eq!(
            req.validate(),
            vec![
                "title must be at most 200 characters",
                "scheduledAt is required",
                "At least one standard must be selected",
            ]
        );
        assert!(req.into_new(1).is_none());
    }

    #[test]
    fn unknown_standard_is_rejected() {
        let parsed = serde_json::from_str::<CreateManagementReviewRequest>(
            r#"{"title":"T","meetingType":"ANNUAL","standards":["ISO27001"]}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn standard_codes_read_stored_json() {
        let review = ManagementReview {
            id: 1,
            title: "Annual".to_string(),
            status: "DRAFT".to_string(),
            meeting_type: "ANNUAL".to_string(),
            standards: serde_json::json!(["ISO9001", "ISO45001"]),
            agenda: None,
            location: None,
            scheduled_at: Utc::now(),
            started_at: None,
            ended_at: None,
            discussion_notes: None,
            create_uid: None,
            create_date: None,
            write_uid: None,
            write_date: None,
        };
        assert_eq!(review.standard_codes(), vec!["ISO9001", "ISO45001"]);
    }

    #[test]
    fn empty_sub_resource_updates_are_refused() {
        let input: UpdateInputRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(input.validate(), vec![NOTHING_TO_UPDATE]);
        let output: UpdateOutputRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(output.validate(), vec![NOTHING_TO_UPDATE]);
        let evidence: UpdateEvidenceRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(evidence.validate(), vec![NOTHING_TO_UPDATE]);
        let attendee: UpdateAttendeeRequest = serde_json::from_str(r#"{"present":true}"#).unwrap();
        assert!(attendee.validate().is_empty());
        assert!(!attendee.signs_off());
    }

    #[test]
    fn attendee_sign_off_is_detected() {
        let signed: UpdateAttendeeRequest =
            serde_json::from_str(r#"{"signedOffAt":"2025-09-30T11:00:00Z","signature":"D.S."}"#).unwrap();
        assert!(signed.signs_off());
        let cleared: UpdateAttendeeRequest = serde_json::from_str(r#"{"signedOffAt":null}"#).unwrap();
        assert!(!cleared.signs_off());
    }

    #[test]
    fn evidence_needs_an_absolute_url() {
        let ok: CreateEvidenceRequest =
            serde_json::from_str(r#"{"label":"Minutes","url":"https://dms.example.com/mr/7"}"#).unwrap();
        assert!(ok.validate().is_empty());
        let bad: CreateEvidenceRequest =
            serde_json::from_str(r#"{"label":"Minutes","url":"/files/7"}"#).unwrap();
        assert_eq!(bad.validate(), vec!["url must be a valid URL"]);
    }

    #[test]
    fn list_query_parses_standard_filter() {
        let q: ReviewListQuery =
            serde_json::from_str(r#"{"standards":"ISO9001, ISO45001"}"#).unwrap();
        assert_eq!(
            q.standard_filter().unwrap(),
            vec![ReviewStandard::Iso9001, ReviewStandard::Iso45001]
        );
        let bad: ReviewListQuery = serde_json::from_str(r#"{"standards":"ISO9001,SOX"}"#).unwrap();
        assert_eq!(bad.validate().len(), 1);
        let none: ReviewListQuery = serde_json::from_str("{}").unwrap();
        assert!(none.standard_filter().unwrap().is_empty());
        assert_eq!(none.page(), 1);
        assert_eq!(none.offset(20), 0);
    }
}
