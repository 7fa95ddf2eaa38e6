//! qms.document: controlled documents; also nodes on the management map.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::require;
use super::vocab::{DocumentStatus, DocumentType};
use crate::compliance::iso;
use crate::compliance::rag::{document_rag, Rag};
use crate::schema::qms_documents;

pub const DEFAULT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_documents)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub code: Option<String>,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub status: String,
    pub version: String,
    pub owner: Option<String>,
    pub next_review: Option<DateTime<Utc>>,
    pub iso_clauses: serde_json::Value,
    pub url: Option<String>,
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
#[diesel(table_name = qms_documents)]
pub struct NewDocument {
    pub code: Option<String>,
    pub title: String,
    pub doc_type: String,
    pub status: String,
    pub version: String,
    pub owner: Option<String>,
    pub next_review: Option<DateTime<Utc>>,
    pub iso_clauses: serde_json::Value,
    pub url: Option<String>,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub rag: Rag,
    pub rag_label: &'static str,
}

impl DocumentView {
    pub fn new(document: Document, now: DateTime<Utc>) -> Self {
        let rag = document_rag(document.next_review, now);
        Self {
            document,
            rag,
            rag_label: rag.label(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub code: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default = "default_status")]
    pub status: DocumentStatus,
    pub version: Option<String>,
    pub owner: Option<String>,
    pub next_review: Option<DateTime<Utc>>,
    #[serde(default)]
    pub iso_clauses: Vec<String>,
    pub url: Option<String>,
}

fn default_status() -> DocumentStatus {
    DocumentStatus::Draft
}

impl CreateDocumentRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.title, "title", &mut errors);
        for reference in &self.iso_clauses {
            if !iso::is_valid_reference(reference) {
                errors.push(format!("invalid ISO clause reference '{reference}'"));
            }
        }
        errors
    }

    pub fn into_new(self, create_uid: i64) -> NewDocument {
        NewDocument {
            code: self.code.filter(|c| !c.trim().is_empty()),
            title: self.title.trim().to_string(),
            doc_type: self.doc_type.as_str().to_string(),
            status: self.status.as_str().to_string(),
            version: self
                .version
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            owner: self.owner,
            next_review: self.next_review,
            iso_clauses: serde_json::json!(self.iso_clauses),
            url: self.url,
            create_uid: Some(create_uid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_version_and_status() {
        let req: CreateDocumentRequest =
            serde_json::from_str(r#"{"title":"Quality Policy","type":"POLICY"}"#).unwrap();
        assert!(req.validate().is_empty());
        let new = req.into_new(1);
        assert_eq!(new.version, DEFAULT_VERSION);
        assert_eq!(new.status, "DRAFT");
        assert_eq!(new.iso_clauses, serde_json::json!([]));
    }

    #[test]
    fn rejects_bad_clause_refs() {
        let req: CreateDocumentRequest = serde_json::from_str(
            r#"{"title":"SOP","type":"PROCEDURE","isoClauses":["9001:7.5","27001:1"]}"#,
        )
        .unwrap();
        assert_eq!(req.validate(), vec!["invalid ISO clause reference '27001:1'"]);
    }

    #[test]
    fn view_carries_review_rag() {
        let now: DateTime<Utc> = "2025-06-01T00:00:00Z".parse().unwrap();
        let doc = Document {
            id: 1,
            code: Some("POL-001".into()),
            title: "Quality Policy".into(),
            doc_type: "POLICY".into(),
            status: "APPROVED".into(),
            version: "2.0".into(),
            owner: None,
            next_review: Some(now - chrono::Duration::days(2)),
            iso_clauses: serde_json::json!([]),
            url: None,
            active: true,
            create_uid: None,
            create_date: None,
            write_uid: None,
            write_date: None,
        };
        let json = serde_json::to_value(DocumentView::new(doc, now)).unwrap();
        assert_eq!(json["rag"], "red");
        assert_eq!(json["ragLabel"], "Overdue");
        assert_eq!(json["type"], "POLICY");
    }
}
