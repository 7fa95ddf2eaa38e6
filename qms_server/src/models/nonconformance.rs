//! qms.nonconformance: improvement cases (NC, complaint, supplier issue,
//! improvement idea) with their actions, trail, and the global action register.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::vocab::{CaseType, Level, NcActionStatus, NcActionType, NcSeverity, NcStatus};
use super::{double_option, require};
use crate::schema::{qms_actions, qms_nc_actions, qms_nc_logs, qms_nonconformances};

pub const DEFAULT_APPROVER: &str = "Quality Manager";
pub const CONTAINMENT_TITLE: &str = "Implement immediate containment measures";
pub const CONTAINMENT_DESCRIPTION: &str =
    "Isolate affected products/processes and prevent further non-conforming output";

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_nonconformances)]
#[serde(rename_all = "camelCase")]
pub struct Nonconformance {
    pub id: i64,
    pub ref_number: String,
    pub case_type: String,
    pub title: String,
    pub raised_by: String,
    pub process: Option<String>,
    pub area: Option<String>,
    pub department: Option<String>,
    pub category: Option<String>,
    pub severity: String,
    pub risk_impact: serde_json::Value,
    pub evidence: Option<String>,
    pub problem_statement: String,
    pub owner: String,
    pub approver: String,
    pub due_date: Option<DateTime<Utc>>,
    pub status: String,
    pub date_raised: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub complaint_channel: Option<String>,
    pub supplier_name: Option<String>,
    pub po_reference: Option<String>,
    #[serde(rename = "request8D")]
    pub request_8d: bool,
    pub detection_point: Option<String>,
    pub containment_needed: bool,
    pub expected_benefit: Option<String>,
    pub closed_date: Option<DateTime<Utc>>,
    pub closure_signature: Option<String>,
    pub closure_approved_by: Option<String>,
    pub closure_approved_at: Option<DateTime<Utc>>,
    pub closure_comments: Option<String>,
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
#[diesel(table_name = qms_nonconformances)]
pub struct NewNonconformance {
    pub ref_number: String,
    pub case_type: String,
    pub title: String,
    pub raised_by: String,
    pub process: Option<String>,
    pub area: Option<String>,
    pub department: Option<String>,
    pub category: Option<String>,
    pub severity: String,
    pub risk_impact: serde_json::Value,
    pub evidence: Option<String>,
    pub problem_statement: String,
    pub owner: String,
    pub approver: String,
    pub due_date: Option<DateTime<Utc>>,
    pub status: String,
    pub date_raised: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub complaint_channel: Option<String>,
    pub supplier_name: Option<String>,
    pub po_reference: Option<String>,
    pub request_8d: bool,
    pub detection_point: Option<String>,
    pub containment_needed: bool,
    pub expected_benefit: Option<String>,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_nonconformances)]
pub struct NonconformanceChanges {
    pub title: Option<String>,
    pub process: Option<Option<String>>,
    pub area: Option<Option<String>>,
    pub department: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub severity: Option<String>,
    pub risk_impact: Option<serde_json::Value>,
    pub evidence: Option<Option<String>>,
    pub problem_statement: Option<String>,
    pub owner: Option<String>,
    pub approver: Option<String>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<String>,
    pub customer_name: Option<Option<String>>,
    pub complaint_channel: Option<Option<String>>,
    pub supplier_name: Option<Option<String>>,
    pub po_reference: Option<Option<String>>,
    pub request_8d: Option<bool>,
    pub detection_point: Option<Option<String>>,
    pub containment_needed: Option<bool>,
    pub expected_benefit: Option<Option<String>>,
    pub write_uid: Option<i64>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = qms_nonconformances)]
pub struct NonconformanceClosure {
    pub status: String,
    pub closed_date: Option<DateTime<Utc>>,
    pub closure_signature: Option<String>,
    pub closure_approved_by: Option<String>,
    pub closure_approved_at: Option<DateTime<Utc>>,
    pub closure_comments: Option<String>,
    pub write_uid: Option<i64>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_nc_actions)]
#[serde(rename_all = "camelCase")]
pub struct NcAction {
    pub id: i64,
    pub nc_id: i64,
    pub action_type: String,
    pub title: String,
    pub description: Option<String>,
    pub owner: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: String,
    pub status: String,
    pub completed_date: Option<DateTime<Utc>>,
    pub global_action_id: Option<i64>,
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

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = qms_nc_actions)]
pub struct NewNcAction {
    pub nc_id: i64,
    pub action_type: String,
    pub title: String,
    pub description: Option<String>,
    pub owner: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: String,
    pub status: String,
    pub global_action_id: Option<i64>,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_nc_actions)]
pub struct NcActionChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub owner: Option<String>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub completed_date: Option<Option<DateTime<Utc>>>,
    pub write_uid: Option<i64>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_nc_logs)]
#[serde(rename_all = "camelCase")]
pub struct NcLog {
    pub id: i64,
    pub nc_id: i64,
    pub event_type: String,
    pub description: String,
    pub user_name: String,
    pub metadata: Option<serde_json::Value>,
    #[serde(rename = "createdAt")]
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_nc_logs)]
pub struct NewNcLog {
    pub nc_id: i64,
    pub event_type: String,
    pub description: String,
    pub user_name: String,
    pub metadata: Option<serde_json::Value>,
}

/// Organisation-wide action register entry.
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_actions)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAction {
    pub id: i64,
    #[serde(rename = "type")]
    pub action_type: String,
    pub title: String,
    pub details: Option<String>,
    pub owner: String,
    pub due_date: Option<DateTime<Utc>>,
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
#[diesel(table_name = qms_actions)]
pub struct NewGlobalAction {
    pub action_type: String,
    pub title: String,
    pub details: Option<String>,
    pub owner: String,
    pub due_date: Option<DateTime<Utc>>,
    pub status: String,
    pub create_uid: Option<i64>,
}

/// A case with its actions and, on detail reads, its trail.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonconformanceView {
    #[serde(flatten)]
    pub record: Nonconformance,
    pub actions: Vec<NcAction>,
    #[serde(rename = "auditLogs", skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<NcLog>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNonconformanceRequest {
    pub case_type: CaseType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub raised_by: String,
    pub process: Option<String>,
    pub area: Option<String>,
    pub department: Option<String>,
    pub category: Option<String>,
    #[serde(default = "default_severity")]
    pub severity: NcSeverity,
    #[serde(default)]
    pub risk_impact: Vec<String>,
    pub evidence: Option<String>,
    #[serde(default)]
    pub problem_statement: String,
    pub owner: Option<String>,
    pub approver: Option<String>,
    pub customer_name: Option<String>,
    pub complaint_channel: Option<String>,
    pub supplier_name: Option<String>,
    pub po_reference: Option<String>,
    #[serde(default, rename = "request8D")]
    pub request_8d: bool,
    pub detection_point: Option<String>,
    #[serde(default)]
    pub containment_needed: bool,
    pub expected_benefit: Option<String>,
}

fn default_severity() -> NcSeverity {
    NcSeverity::Medium
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl CreateNonconformanceRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.title, "title", &mut errors);
        require(&self.raised_by, "raisedBy", &mut errors);
        require(&self.problem_statement, "problemStatement", &mut errors);
        if self.case_type == CaseType::Complaint && non_blank(self.customer_name.clone()).is_none() {
            errors.push("customerName is required for complaints".to_string());
        }
        if self.case_type == CaseType::Supplier && non_blank(self.supplier_name.clone()).is_none() {
            errors.push("supplierName is required for supplier cases".to_string());
        }
        errors
    }

    /// Whether creation also opens a containment action.
    pub fn needs_containment(&self) -> bool {
        self.containment_needed && self.case_type == CaseType::Nc
    }

    pub fn into_new(self, ref_number: String, now: DateTime<Utc>, create_uid: i64) -> NewNonconformance {
        let owner = non_blank(self.owner).unwrap_or_else(|| self.raised_by.clone());
        NewNonconformance {
            ref_number,
            case_type: self.case_type.as_str().to_string(),
            title: self.title.trim().to_string(),
            raised_by: self.raised_by,
            process: non_blank(self.process),
            area: non_blank(self.area),
            department: non_blank(self.department),
            category: non_blank(self.category),
            severity: self.severity.as_str().to_string(),
            risk_impact: serde_json::json!(self.risk_impact),
            evidence: non_blank(self.evidence),
            problem_statement: self.problem_statement,
            owner,
            approver: non_blank(self.approver).unwrap_or_else(|| DEFAULT_APPROVER.to_string()),
            due_date: Some(now + self.severity.response_window()),
            status: NcStatus::Open.as_str().to_string(),
            date_raised: now,
            customer_name: non_blank(self.customer_name),
            complaint_channel: non_blank(self.complaint_channel),
            supplier_name: non_blank(self.supplier_name),
            po_reference: non_blank(self.po_reference),
            request_8d: self.request_8d,
            detection_point: non_blank(self.detection_point),
            containment_needed: self.containment_needed,
            expected_benefit: non_blank(self.expected_benefit),
            create_uid: Some(create_uid),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNonconformanceRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub process: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub area: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub department: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    pub severity: Option<NcSeverity>,
    pub risk_impact: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub evidence: Option<Option<String>>,
    pub problem_statement: Option<String>,
    pub owner: Option<String>,
    pub approver: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<NcStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub customer_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub complaint_channel: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub supplier_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub po_reference: Option<Option<String>>,
    #[serde(rename = "request8D")]
    pub request_8d: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub detection_point: Option<Option<String>>,
    pub containment_needed: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub expected_benefit: Option<Option<String>>,
    /// Name recorded in the trail; defaults to "System".
    pub updated_by: Option<String>,
}

impl UpdateNonconformanceRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (value, field) in [
            (&self.title, "title"),
            (&self.problem_statement, "problemStatement"),
            (&self.owner, "owner"),
            (&self.approver, "approver"),
        ] {
            if let Some(v) = value {
                require(v, field, &mut errors);
            }
        }
        if self.status == Some(NcStatus::Closed) {
            errors.push("use the close endpoint to close a case".to_string());
        }
        errors
    }

    pub fn into_changes(self, write_uid: i64) -> NonconformanceChanges {
        NonconformanceChanges {
            title: self.title,
            process: self.process,
            area: self.area,
            department: self.department,
            category: self.category,
            severity: self.severity.map(|s| s.as_str().to_string()),
            risk_impact: self.risk_impact.map(|r| serde_json::json!(r)),
            evidence: self.evidence,
            problem_statement: self.problem_statement,
            owner: self.owner,
            approver: self.approver,
            due_date: self.due_date,
            status: self.status.map(|s| s.as_str().to_string()),
            customer_name: self.customer_name,
            complaint_channel: self.complaint_channel,
            supplier_name: self.supplier_name,
            po_reference: self.po_reference,
            request_8d: self.request_8d,
            detection_point: self.detection_point,
            containment_needed: self.containment_needed,
            expected_benefit: self.expected_benefit,
            write_uid: Some(write_uid),
            write_date: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNcActionRequest {
    pub action_type: NcActionType,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default = "default_priority")]
    pub priority: Level,
}

fn default_priority() -> Level {
    Level::Medium
}

impl CreateNcActionRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.title, "title", &mut errors);
        errors
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNcActionRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub owner: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub priority: Option<Level>,
    pub status: Option<NcActionStatus>,
}

impl UpdateNcActionRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            require(title, "title", &mut errors);
        }
        if let Some(owner) = &self.owner {
            require(owner, "owner", &mut errors);
        }
        errors
    }

    /// DONE stamps the completion date; any other status clears it.
    pub fn into_changes(self, now: DateTime<Utc>, write_uid: i64) -> NcActionChanges {
        let completed_date = self.status.map(|status| match status {
            NcActionStatus::Done => Some(now),
            _ => None,
        });
        NcActionChanges {
            title: self.title,
            description: self.description,
            owner: self.owner,
            due_date: self.due_date,
            priority: self.priority.map(|p| p.as_str().to_string()),
            status: self.status.map(|s| s.as_str().to_string()),
            completed_date,
            write_uid: Some(write_uid),
            write_date: Some(now),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseNonconformanceRequest {
    pub signature: Option<String>,
    pub approved_by: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ParetoDimension {
    #[default]
    Category,
    CaseType,
    Severity,
    Owner,
    Department,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParetoRange {
    #[default]
    All,
    Last30,
    Last90,
    Last365,
}

impl ParetoDimension {
    /// Column grouped on; never taken from user input.
    pub fn column(self) -> &'static str {
        match self {
            ParetoDimension::Category => "category",
            ParetoDimension::CaseType => "case_type",
            ParetoDimension::Severity => "severity",
            ParetoDimension::Owner => "owner",
            ParetoDimension::Department => "department",
        }
    }

    /// Label used for cases with no value in the grouped column.
    pub fn missing_label(self) -> &'static str {
        match self {
            ParetoDimension::Category => "Uncategorized",
            _ => "Unknown",
        }
    }
}

impl ParetoRange {
    pub fn days(self) -> Option<i64> {
        match self {
            ParetoRange::All => None,
            ParetoRange::Last30 => Some(30),
            ParetoRange::Last90 => Some(90),
            ParetoRange::Last365 => Some(365),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ParetoQuery {
    #[serde(default)]
    pub by: ParetoDimension,
    #[serde(default)]
    pub range: ParetoRange,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create(json: &str) -> CreateNonconformanceRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn defaults_owner_approver_and_due_date() {
        let now: DateTime<Utc> = "2025-05-01T09:00:00Z".parse().unwrap();
        let req = create(
            r#"{"caseType":"NC","title":"Burr on part","raisedBy":"Ana","problemStatement":"Sharp edge","severity":"HIGH"}"#,
        );
        assert!(req.validate().is_empty());
        let new = req.into_new("NC-2025-0001".into(), now, 1);
        assert_eq!(new.owner, "Ana");
        assert_eq!(new.approver, DEFAULT_APPROVER);
        assert_eq!(new.due_date, Some(now + Duration::days(10)));
        assert_eq!(new.status, "OPEN");
    }

    #[test]
    fn severity_defaults_to_medium() {
        let req = create(r#"{"caseType":"IMPROVEMENT","title":"t","raisedBy":"r","problemStatement":"p"}"#);
        assert_eq!(req.severity, NcSeverity::Medium);
    }

    #[test]
    fn containment_only_for_nc_cases() {
        let nc = create(r#"{"caseType":"NC","title":"t","raisedBy":"r","problemStatement":"p","containmentNeeded":true}"#);
        assert!(nc.needs_containment());
        let complaint = create(
            r#"{"caseType":"COMPLAINT","title":"t","raisedBy":"r","problemStatement":"p","containmentNeeded":true,"customerName":"Acme"}"#,
        );
        assert!(!complaint.needs_containment());
    }

    #[test]
    fn complaint_requires_customer() {
        let req = create(r#"{"caseType":"COMPLAINT","title":"t","raisedBy":"r","problemStatement":"p"}"#);
        assert_eq!(req.validate(), vec!["customerName is required for complaints"]);
    }

    #[test]
    fn action_done_sets_completion_and_reopen_clears_it() {
        let now = Utc::now();
        let done: UpdateNcActionRequest = serde_json::from_str(r#"{"status":"DONE"}"#).unwrap();
        assert_eq!(done.into_changes(now, 1).completed_date, Some(Some(now)));
        let reopened: UpdateNcActionRequest = serde_json::from_str(r#"{"status":"OPEN"}"#).unwrap();
        assert_eq!(reopened.into_changes(now, 1).completed_date, Some(None));
        let untouched: UpdateNcActionRequest = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(untouched.into_changes(now, 1).completed_date, None);
    }

    #[test]
    fn pareto_query_parses() {
        let q: ParetoQuery = serde_json::from_str(r#"{"by":"caseType","range":"last90"}"#).unwrap();
        assert_eq!(q.by, ParetoDimension::CaseType);
        assert_eq!(q.range.days(), Some(90));
        assert_eq!(q.by.column(), "case_type");

        let q: ParetoQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.by, ParetoDimension::Category);
        assert_eq!(q.range.days(), None);
        assert_eq!(q.by.missing_label(), "Uncategorized");
    }
}
