//! qms.contract.review: supplier contract reviews with attachments and
//! a review trail.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::vocab::{ContractStatus, ContractType, Currency, Level};
use super::{double_option, email_is_valid, require};
use crate::schema::{qms_contract_attachments, qms_contract_review_logs, qms_contract_reviews};

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_contract_reviews)]
#[serde(rename_all = "camelCase")]
pub struct ContractReview {
    pub id: i64,
    pub contract_number: String,
    pub contract_title: String,
    pub contract_type: String,
    pub supplier_name: String,
    pub supplier_contact: Option<String>,
    pub supplier_email: Option<String>,
    pub value: Option<f64>,
    pub currency: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub renewal_date: Option<DateTime<Utc>>,
    pub status: String,
    pub priority: String,
    pub risk_level: String,
    pub reviewer_id: Option<i64>,
    pub reviewer_name: Option<String>,
    pub review_date: Option<DateTime<Utc>>,
    pub approval_date: Option<DateTime<Utc>>,
    pub approver_name: Option<String>,
    pub comments: Option<String>,
    pub terms: Option<String>,
    pub compliance_notes: Option<String>,
    pub next_review_date: Option<DateTime<Utc>>,
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
#[diesel(table_name = qms_contract_reviews)]
pub struct NewContractReview {
    pub contract_number: String,
    pub contract_title: String,
    pub contract_type: String,
    pub supplier_name: String,
    pub supplier_contact: Option<String>,
    pub supplier_email: Option<String>,
    pub value: Option<f64>,
    pub currency: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub renewal_date: Option<DateTime<Utc>>,
    pub status: String,
    pub priority: String,
    pub risk_level: String,
    pub reviewer_id: Option<i64>,
    pub reviewer_name: Option<String>,
    pub comments: Option<String>,
    pub terms: Option<String>,
    pub compliance_notes: Option<String>,
    pub next_review_date: Option<DateTime<Utc>>,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_contract_reviews)]
pub struct ContractReviewChanges {
    pub contract_number: Option<String>,
    pub contract_title: Option<String>,
    pub contract_type: Option<String>,
    pub supplier_name: Option<String>,
    pub supplier_contact: Option<Option<String>>,
    pub supplier_email: Option<Option<String>>,
    pub value: Option<Option<f64>>,
    pub currency: Option<String>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub renewal_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub risk_level: Option<String>,
    pub reviewer_name: Option<Option<String>>,
    pub review_date: Option<Option<DateTime<Utc>>>,
    pub approval_date: Option<Option<DateTime<Utc>>>,
    pub approver_name: Option<Option<String>>,
    pub comments: Option<Option<String>>,
    pub terms: Option<Option<String>>,
    pub compliance_notes: Option<Option<String>>,
    pub next_review_date: Option<Option<DateTime<Utc>>>,
    pub write_uid: Option<i64>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_contract_review_logs)]
#[serde(rename_all = "camelCase")]
pub struct ContractReviewLog {
    pub id: i64,
    pub contract_id: i64,
    pub action: String,
    pub performed_by: Option<String>,
    pub comments: Option<String>,
    #[serde(rename = "timestamp")]
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_contract_review_logs)]
pub struct NewContractReviewLog {
    pub contract_id: i64,
    pub action: String,
    pub performed_by: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_contract_attachments)]
#[serde(rename_all = "camelCase")]
pub struct ContractAttachment {
    pub id: i64,
    pub contract_id: i64,
    pub file_name: String,
    pub file_type: String,
    pub file_size: Option<i64>,
    pub file_url: Option<String>,
    pub uploaded_by: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractReviewView {
    #[serde(flatten)]
    pub contract: ContractReview,
    pub attachments: Vec<ContractAttachment>,
    pub reviews: Vec<ContractReviewLog>,
}

/// Blank strings count as absent, as a cleared form field.
fn validate_common(email: Option<&str>, value: Option<f64>, errors: &mut Vec<String>) {
    if let Some(email) = email.filter(|e| !e.is_empty()) {
        if !email_is_valid(email) {
            errors.push("supplierEmail must be a valid email address".to_string());
        }
    }
    if let Some(v) = value {
        if v.is_nan() || v <= 0.0 {
            errors.push("value must be greater than 0".to_string());
        }
    }
}

fn default_currency() -> Currency {
    Currency::Usd
}

fn default_level() -> Level {
    Level::Medium
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractReviewRequest {
    #[serde(default)]
    pub contract_number: String,
    #[serde(default)]
    pub contract_title: String,
    pub contract_type: ContractType,
    #[serde(default)]
    pub supplier_name: String,
    pub supplier_contact: Option<String>,
    pub supplier_email: Option<String>,
    pub value: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub renewal_date: Option<DateTime<Utc>>,
    #[serde(default = "default_level")]
    pub priority: Level,
    #[serde(default = "default_level")]
    pub risk_level: Level,
    pub reviewer_name: Option<String>,
    pub comments: Option<String>,
    pub terms: Option<String>,
    pub compliance_notes: Option<String>,
    pub next_review_date: Option<DateTime<Utc>>,
}

impl CreateContractReviewRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.contract_number, "contractNumber", &mut errors);
        require(&self.contract_title, "contractTitle", &mut errors);
        require(&self.supplier_name, "supplierName", &mut errors);
        validate_common(self.supplier_email.as_deref(), self.value, &mut errors);
        errors
    }

    /// The signed-in reviewer is recorded unless the body names one.
    pub fn into_new(self, reviewer_id: i64, reviewer_name: &str) -> NewContractReview {
        NewContractReview {
            contract_number: self.contract_number.trim().to_string(),
            contract_title: self.contract_title.trim().to_string(),
            contract_type: self.contract_type.as_str().to_string(),
            supplier_name: self.supplier_name.trim().to_string(),
            supplier_contact: self.supplier_contact,
            supplier_email: self.supplier_email.filter(|e| !e.is_empty()),
            value: self.value,
            currency: self.currency.as_str().to_string(),
            start_date: self.start_date,
            end_date: self.end_date,
            renewal_date: self.renewal_date,
            status: ContractStatus::Draft.as_str().to_string(),
            priority: self.priority.as_str().to_string(),
            risk_level: self.risk_level.as_str().to_string(),
            reviewer_id: Some(reviewer_id),
            reviewer_name: self
                .reviewer_name
                .filter(|n| !n.trim().is_empty())
                .or_else(|| Some(reviewer_name.to_string())),
            comments: self.comments,
            terms: self.terms,
            compliance_notes: self.compliance_notes,
            next_review_date: self.next_review_date,
            create_uid: Some(reviewer_id),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContractReviewRequest {
    pub contract_number: Option<String>,
    pub contract_title: Option<String>,
    pub contract_type: Option<ContractType>,
    pub supplier_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub supplier_contact: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub supplier_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub value: Option<Option<f64>>,
    pub currency: Option<Currency>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub renewal_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<ContractStatus>,
    pub priority: Option<Level>,
    pub risk_level: Option<Level>,
    #[serde(default, deserialize_with = "double_option")]
    pub reviewer_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub review_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub approval_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub approver_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub comments: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub terms: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub compliance_notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub next_review_date: Option<Option<DateTime<Utc>>>,
}

impl UpdateContractReviewRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (value, field) in [
            (&self.contract_number, "contractNumber"),
            (&self.contract_title, "contractTitle"),
            (&self.supplier_name, "supplierName"),
        ] {
            if let Some(v) = value {
                require(v, field, &mut errors);
            }
        }
        validate_common(
            self.supplier_email.as_ref().and_then(|e| e.as_deref()),
            self.value.flatten(),
            &mut errors,
        );
        errors
    }

    pub fn into_changes(self, write_uid: i64) -> ContractReviewChanges {
        ContractReviewChanges {
            contract_number: self.contract_number,
            contract_title: self.contract_title,
            contract_type: self.contract_type.map(|t| t.as_str().to_string()),
            supplier_name: self.supplier_name,
            supplier_contact: self.supplier_contact,
            supplier_email: self
                .supplier_email
                .map(|e| e.filter(|e| !e.is_empty())),
            value: self.value,
            currency: self.currency.map(|c| c.as_str().to_string()),
            start_date: self.start_date,
            end_date: self.end_date,
            renewal_date: self.renewal_date,
            status: self.status.map(|s| s.as_str().to_string()),
            priority: self.priority.map(|p| p.as_str().to_string()),
            risk_level: self.risk_level.map(|r| r.as_str().to_string()),
            reviewer_name: self.reviewer_name,
            review_date: self.review_date,
            approval_date: self.approval_date,
            approver_name: self.approver_name,
            comments: self.comments,
            terms: self.terms,
            compliance_notes: self.compliance_notes,
            next_review_date: self.next_review_date,
            write_uid: Some(write_uid),
            write_date: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractReviewQuery {
    pub status: Option<ContractStatus>,
    pub contract_type: Option<ContractType>,
    pub priority: Option<Level>,
    pub risk_level: Option<Level>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractStats {
    pub total: i64,
    pub draft: i64,
    pub under_review: i64,
    pub approved: i64,
    pub rejected: i64,
    pub expired: i64,
    pub terminated: i64,
    pub high_priority: i64,
    pub high_risk: i64,
    pub total_value: f64,
}

impl ContractStats {
    pub fn count_status(&mut self, status: &str, count: i64) {
        self.total += count;
        match status.parse::<ContractStatus>() {
            Ok(ContractStatus::Draft) => self.draft += count,
            Ok(ContractStatus::UnderReview) => self.under_review += count,
            Ok(ContractStatus::Approved) => self.approved += count,
            Ok(ContractStatus::Rejected) => self.rejected += count,
            Ok(ContractStatus::Expired) => self.expired += count,
            Ok(ContractStatus::Terminated) => self.terminated += count,
            Err(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_defaults_and_reviewer() {
        let req: CreateContractReviewRequest = serde_json::from_str(
            r#"{"contractNumber":"C-1","contractTitle":"Steel","contractType":"SUPPLY","supplierName":"Acme","supplierEmail":""}"#,
        )
        .unwrap();
        assert!(req.validate().is_empty());
        let new = req.into_new(7, "Dana");
        assert_eq!(new.currency, "USD");
        assert_eq!(new.priority, "MEDIUM");
        assert_eq!(new.status, "DRAFT");
        assert_eq!(new.reviewer_name.as_deref(), Some("Dana"));
        assert_eq!(new.supplier_email, None);
    }

    #[test]
    fn create_reports_every_problem() {
        let req: CreateContractReviewRequest = serde_json::from_str(
            r#"{"contractType":"OTHER","supplierEmail":"bad","value":-5}"#,
        )
        .unwrap();
        assert_eq!(
            req.validate(),
            vec![
                "contractNumber is required",
                "contractTitle is required",
                "supplierName is required",
                "supplierEmail must be a valid email address",
                "value must be greater than 0",
            ]
        );
    }

    #[test]
    fn unknown_currency_is_rejected() {
        let parsed = serde_json::from_str::<CreateContractReviewRequest>(
            r#"{"contractNumber":"C","contractTitle":"T","contractType":"SUPPLY","supplierName":"S","currency":"JPY"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn stats_bucket_statuses() {
        let mut stats = ContractStats::default();
        stats.count_status("DRAFT", 2);
        stats.count_status("UNDER_REVIEW", 1);
        stats.count_status("APPROVED", 4);
        assert_eq!(stats.total, 7);
        assert_eq!(stats.approved, 4);
        assert_eq!(stats.under_review, 1);
    }
}
