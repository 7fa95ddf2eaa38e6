//! qms.audit.type + qms.audit + findings and audit trail.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::vocab::{
    AuditCategory, AuditFrequency, AuditMethod, AuditRag, AuditStatus, FindingStatus, FindingType,
};
use super::{double_option, require};
use crate::schema::{qms_audit_findings, qms_audit_logs, qms_audit_types, qms_audits};

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_audit_types)]
#[serde(rename_all = "camelCase")]
pub struct AuditType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub frequency: String,
    pub standard: Option<String>,
    #[serde(rename = "isActive")]
    pub active: bool,
    #[serde(skip)]
    pub create_uid: Option<i64>,
    #[serde(rename = "createdAt")]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub write_uid: Option<i64>,
    #[serde(rename = "updatedAt")]
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_audit_types)]
pub struct NewAuditType {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub frequency: String,
    pub standard: Option<String>,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuditTypeRequest {
    pub name: String,
    pub description: Option<String>,
    pub category: AuditCategory,
    pub frequency: AuditFrequency,
    pub standard: Option<String>,
}

impl CreateAuditTypeRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.name, "name", &mut errors);
        errors
    }

    pub fn into_new(self, create_uid: i64) -> NewAuditType {
        NewAuditType {
            name: self.name.trim().to_string(),
            description: self.description,
            category: self.category.as_str().to_string(),
            frequency: self.frequency.as_str().to_string(),
            standard: self.standard,
            create_uid: Some(create_uid),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_audits)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub id: i64,
    pub audit_number: String,
    pub audit_type_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub scope: String,
    pub objectives: Option<String>,
    pub audit_standard: String,
    pub audit_criteria: Option<String>,
    pub planned_start_date: DateTime<Utc>,
    pub planned_end_date: DateTime<Utc>,
    pub actual_start_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
    pub status: String,
    pub rag_status: String,
    pub lead_auditor: Option<String>,
    pub auditee: Option<String>,
    pub location: Option<String>,
    pub audit_method: Option<String>,
    pub effectiveness: Option<i32>,
    pub notes: Option<String>,
    pub active: bool,
    #[serde(rename = "createdBy")]
    pub create_uid: Option<i64>,
    #[serde(rename = "createdAt")]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub write_uid: Option<i64>,
    #[serde(rename = "updatedAt")]
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_audits)]
pub struct NewAudit {
    pub audit_number: String,
    pub audit_type_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub scope: String,
    pub objectives: Option<String>,
    pub audit_standard: String,
    pub audit_criteria: Option<String>,
    pub planned_start_date: DateTime<Utc>,
    pub planned_end_date: DateTime<Utc>,
    pub actual_start_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
    pub status: String,
    pub rag_status: String,
    pub lead_auditor: Option<String>,
    pub auditee: Option<String>,
    pub location: Option<String>,
    pub audit_method: Option<String>,
    pub effectiveness: Option<i32>,
    pub notes: Option<String>,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_audits)]
pub struct AuditChanges {
    pub audit_type_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub scope: Option<String>,
    pub objectives: Option<Option<String>>,
    pub audit_standard: Option<String>,
    pub audit_criteria: Option<Option<String>>,
    pub planned_start_date: Option<DateTime<Utc>>,
    pub planned_end_date: Option<DateTime<Utc>>,
    pub actual_start_date: Option<Option<DateTime<Utc>>>,
    pub actual_end_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<String>,
    pub rag_status: Option<String>,
    pub lead_auditor: Option<Option<String>>,
    pub auditee: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub audit_method: Option<Option<String>>,
    pub effectiveness: Option<Option<i32>>,
    pub notes: Option<Option<String>>,
    pub write_uid: Option<i64>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_audit_findings)]
#[serde(rename_all = "camelCase")]
pub struct AuditFinding {
    pub id: i64,
    pub audit_id: i64,
    pub finding_type: String,
    pub clause: Option<String>,
    pub description: String,
    pub status: String,
    pub active: bool,
    #[serde(skip)]
    pub create_uid: Option<i64>,
    #[serde(rename = "createdAt")]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub write_uid: Option<i64>,
    #[serde(rename = "updatedAt")]
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_audit_findings)]
pub struct NewAuditFinding {
    pub audit_id: i64,
    pub finding_type: String,
    pub clause: Option<String>,
    pub description: String,
    pub status: String,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_audit_logs)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: i64,
    pub audit_id: i64,
    pub action: String,
    pub performed_by: Option<i64>,
    pub comments: Option<String>,
    #[serde(rename = "timestamp")]
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_audit_logs)]
pub struct NewAuditLog {
    pub audit_id: i64,
    pub action: String,
    pub performed_by: Option<i64>,
    pub comments: Option<String>,
}

/// An audit with its type, findings and trail.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditView {
    #[serde(flatten)]
    pub audit: Audit,
    pub audit_type: Option<AuditType>,
    #[serde(rename = "auditFindings")]
    pub findings: Vec<AuditFinding>,
    pub logs: Vec<AuditLog>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditPage {
    pub audits: Vec<AuditView>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuditRequest {
    pub audit_type_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub scope: String,
    pub objectives: Option<String>,
    #[serde(default)]
    pub audit_standard: String,
    pub audit_criteria: Option<String>,
    pub planned_start_date: Option<DateTime<Utc>>,
    pub planned_end_date: Option<DateTime<Utc>>,
    pub actual_start_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
    #[serde(default = "default_audit_status")]
    pub status: AuditStatus,
    #[serde(default = "default_audit_rag")]
    pub rag_status: AuditRag,
    pub lead_auditor: Option<String>,
    pub auditee: Option<String>,
    pub location: Option<String>,
    pub audit_method: Option<AuditMethod>,
    pub effectiveness: Option<i32>,
    pub notes: Option<String>,
}

fn default_audit_status() -> AuditStatus {
    AuditStatus::Planned
}

fn default_audit_rag() -> AuditRag {
    AuditRag::Green
}

fn validate_effectiveness(value: Option<i32>, errors: &mut Vec<String>) {
    if value.is_some_and(|v| !(1..=5).contains(&v)) {
        errors.push("effectiveness must be between 1 and 5".to_string());
    }
}

impl CreateAuditRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.audit_type_id.is_none() {
            errors.push("Audit type is required".to_string());
        }
        if self.title.trim().is_empty() {
            errors.push("Title is required".to_string());
        }
        if self.scope.trim().is_empty() {
            errors.push("Scope is required".to_string());
        }
        if self.audit_standard.trim().is_empty() {
            errors.push("Audit standard is required".to_string());
        }
        match (self.planned_start_date, self.planned_end_date) {
            (Some(start), Some(end)) if end < start => {
                errors.push("Planned end date cannot be before planned start date".to_string());
            }
            (None, _) => errors.push("Planned start date is required".to_string()),
            (_, None) => errors.push("Planned end date is required".to_string()),
            _ => {}
        }
        validate_effectiveness(self.effectiveness, &mut errors);
        errors
    }

    /// Build the row. Call only after [`Self::validate`] returned no errors.
    pub fn into_new(self, audit_number: String, create_uid: i64) -> Option<NewAudit> {
        Some(NewAudit {
            audit_number,
            audit_type_id: self.audit_type_id?,
            title: self.title.trim().to_string(),
            description: self.description,
            scope: self.scope,
            objectives: self.objectives,
            audit_standard: self.audit_standard,
            audit_criteria: self.audit_criteria,
            planned_start_date: self.planned_start_date?,
            planned_end_date: self.planned_end_date?,
            actual_start_date: self.actual_start_date,
            actual_end_date: self.actual_end_date,
            status: self.status.as_str().to_string(),
            rag_status: self.rag_status.as_str().to_string(),
            lead_auditor: self.lead_auditor,
            auditee: self.auditee,
            location: self.location,
            audit_method: self.audit_method.map(|m| m.as_str().to_string()),
            effectiveness: self.effectiveness,
            notes: self.notes,
            create_uid: Some(create_uid),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAuditRequest {
    pub audit_type_id: Option<i64>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub scope: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub objectives: Option<Option<String>>,
    pub audit_standard: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub audit_criteria: Option<Option<String>>,
    pub planned_start_date: Option<DateTime<Utc>>,
    pub planned_end_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub actual_start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub actual_end_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<AuditStatus>,
    pub rag_status: Option<AuditRag>,
    #[serde(default, deserialize_with = "double_option")]
    pub lead_auditor: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub auditee: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub audit_method: Option<Option<AuditMethod>>,
    #[serde(default, deserialize_with = "double_option")]
    pub effectiveness: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    /// Free-text comment recorded with a status change.
    pub comments: Option<String>,
}

impl UpdateAuditRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (value, message) in [
            (&self.title, "Title is required"),
            (&self.scope, "Scope is required"),
            (&self.audit_standard, "Audit standard is required"),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                errors.push(message.to_string());
            }
        }
        if let (Some(start), Some(end)) = (self.planned_start_date, self.planned_end_date) {
            if end < start {
                errors.push("Planned end date cannot be before planned start date".to_string());
            }
        }
        validate_effectiveness(self.effectiveness.flatten(), &mut errors);
        errors
    }

    pub fn into_changes(self, write_uid: i64) -> AuditChanges {
        AuditChanges {
            audit_type_id: self.audit_type_id,
            title: self.title,
            description: self.description,
            scope: self.scope,
            objectives: self.objectives,
            audit_standard: self.audit_standard,
            audit_criteria: self.audit_criteria,
            planned_start_date: self.planned_start_date,
            planned_end_date: self.planned_end_date,
            actual_start_date: self.actual_start_date,
            actual_end_date: self.actual_end_date,
            status: self.status.map(|s| s.as_str().to_string()),
            rag_status: self.rag_status.map(|r| r.as_str().to_string()),
            lead_auditor: self.lead_auditor,
            auditee: self.auditee,
            location: self.location,
            audit_method: self
                .audit_method
                .map(|m| m.map(|m| m.as_str().to_string())),
            effectiveness: self.effectiveness,
            notes: self.notes,
            write_uid: Some(write_uid),
            write_date: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFindingRequest {
    pub finding_type: FindingType,
    pub clause: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_finding_status")]
    pub status: FindingStatus,
}

fn default_finding_status() -> FindingStatus {
    FindingStatus::Open
}

impl CreateFindingRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.description, "description", &mut errors);
        errors
    }

    pub fn into_new(self, audit_id: i64, create_uid: i64) -> NewAuditFinding {
        NewAuditFinding {
            audit_id,
            finding_type: self.finding_type.as_str().to_string(),
            clause: self.clause,
            description: self.description,
            status: self.status.as_str().to_string(),
            create_uid: Some(create_uid),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTypeQuery {
    pub category: Option<AuditCategory>,
    pub frequency: Option<AuditFrequency>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AuditSortBy {
    #[default]
    PlannedStartDate,
    Title,
    Status,
    AuditNumber,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditListQuery {
    pub audit_type_id: Option<i64>,
    pub status: Option<AuditStatus>,
    pub rag_status: Option<AuditRag>,
    pub audit_standard: Option<String>,
    pub year: Option<i32>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub sort_by: AuditSortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// Highest page number a listing will serve.
pub const MAX_PAGE: i64 = 1_000_000;

/// Calendar years accepted by the `year` filter.
pub const FILTER_YEARS: std::ops::RangeInclusive<i32> = 1900..=9999;

impl AuditListQuery {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(year) = self.year.filter(|y| !FILTER_YEARS.contains(y)) {
            errors.push(format!(
                "year {year} is outside {}..={}",
                FILTER_YEARS.start(),
                FILTER_YEARS.end()
            ));
        }
        if self.page.is_some_and(|p| p > MAX_PAGE) {
            errors.push(format!("page must be at most {MAX_PAGE}"));
        }
        errors
    }

    /// Requested page, at least 1 and at most [`MAX_PAGE`].
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    /// Rows skipped before `page` at `limit` rows per page.
    pub fn offset(&self, limit: i64) -> i64 {
        (self.page() - 1).saturating_mul(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_fields_are_all_reported() {
        let req: CreateAuditRequest = serde_json::from_str("{}").unwrap();
        let errors = req.validate();
        assert!(errors.contains(&"Audit type is required".to_string()));
        assert!(errors.contains(&"Title is required".to_string()));
        assert!(errors.contains(&"Scope is required".to_string()));
        assert!(errors.contains(&"Audit standard is required".to_string()));
        assert!(errors.contains(&"Planned start date is required".to_string()));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let req: CreateAuditRequest = serde_json::from_str(
            r#"{"auditTypeId":1,"title":"Q1","scope":"Plant","auditStandard":"ISO 9001",
                "plannedStartDate":"2025-03-10T00:00:00Z","plannedEndDate":"2025-03-01T00:00:00Z",
                "effectiveness":7}"#,
        )
        .unwrap();
        assert_eq!(
            req.validate(),
            vec![
                "Planned end date cannot be before planned start date".to_string(),
                "effectiveness must be between 1 and 5".to_string(),
            ]
        );
    }

    #[test]
    fn defaults_apply() {
        let req: CreateAuditRequest = serde_json::from_str(
            r#"{"auditTypeId":1,"title":"Q1","scope":"Plant","auditStandard":"ISO 9001",
                "plannedStartDate":"2025-03-01T00:00:00Z","plannedEndDate":"2025-03-02T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(req.validate().is_empty());
        let new = req.into_new("AUD-2025-0001".into(), 1).unwrap();
        assert_eq!(new.status, "PLANNED");
        assert_eq!(new.rag_status, "GREEN");
    }

    #[test]
    fn list_query_defaults_and_whitelist() {
        let q: AuditListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.sort_by, AuditSortBy::PlannedStartDate);
        assert_eq!(q.sort_order, SortOrder::Desc);
        assert!(serde_json::from_str::<AuditListQuery>(r#"{"sortBy":"password"}"#).is_err());
    }

    #[test]
    fn update_can_clear_method() {
        let req: UpdateAuditRequest =
            serde_json::from_str(r#"{"auditMethod":null,"status":"COMPLETED"}"#).unwrap();
        let changes = req.into_changes(1);
        assert_eq!(changes.audit_method, Some(None));
        assert_eq!(changes.status.as_deref(), Some("COMPLETED"));
    }

    #[test]
    fn pagination_rounds_up() {
        let p = Pagination::new(1, 50, 101);
        assert_eq!(p.pages, 3);
        assert_eq!(Pagination::new(1, 50, 0).pages, 0);
    }

    #[test]
    fn list_query_bounds() {
        let query: AuditListQuery =
            serde_json::from_value(serde_json::json!({ "year": 2147483647, "page": i64::MAX })).unwrap();
        let errors = query.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(query.page(), MAX_PAGE);
        assert_eq!(query.offset(200), (MAX_PAGE - 1) * 200);

        let query = AuditListQuery {
            year: Some(2025),
            page: Some(3),
            ..AuditListQuery::default()
        };
        assert!(query.validate().is_empty());
        assert_eq!(query.offset(50), 100);

        let query = AuditListQuery {
            page: Some(-4),
            ..AuditListQuery::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.offset(50), 0);
    }
}
