//! qms.risk: business risk register entry.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::vocab::RiskStatus;
use super::{double_option, require};
use crate::compliance::{iso, risk};
use crate::schema::qms_risks;

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_risks)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    pub id: i64,
    pub title: String,
    pub context: Option<String>,
    pub category: String,
    pub likelihood: i32,
    pub severity: i32,
    pub controls: serde_json::Value,
    pub owner: Option<String>,
    pub review_date: Option<DateTime<Utc>>,
    pub status: String,
    pub iso_refs: serde_json::Value,
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
#[diesel(table_name = qms_risks)]
pub struct NewRisk {
    pub title: String,
    pub context: Option<String>,
    pub category: String,
    pub likelihood: i32,
    pub severity: i32,
    pub controls: serde_json::Value,
    pub owner: Option<String>,
    pub review_date: Option<DateTime<Utc>>,
    pub status: String,
    pub iso_refs: serde_json::Value,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_risks)]
pub struct RiskChanges {
    pub title: Option<String>,
    pub context: Option<Option<String>>,
    pub category: Option<String>,
    pub likelihood: Option<i32>,
    pub severity: Option<i32>,
    pub controls: Option<serde_json::Value>,
    pub owner: Option<Option<String>>,
    pub review_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<String>,
    pub iso_refs: Option<serde_json::Value>,
    pub write_uid: Option<i64>,
    pub write_date: Option<DateTime<Utc>>,
}

/// A risk with its computed score, band and RAG.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskView {
    #[serde(flatten)]
    pub risk: Risk,
    pub score: i32,
    pub band: &'static str,
    pub rag: &'static str,
    pub iso_clauses: Vec<iso::IsoClause>,
}

impl From<Risk> for RiskView {
    fn from(risk: Risk) -> Self {
        let score = risk.likelihood * risk.severity;
        let iso_clauses = iso::iso_clauses(&risk.iso_refs);
        Self {
            score,
            band: risk::band(score).as_str(),
            rag: risk::rag(score).as_str(),
            iso_clauses,
            risk,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRiskRequest {
    pub title: String,
    pub context: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    pub likelihood: i32,
    pub severity: i32,
    #[serde(default)]
    pub controls: Vec<String>,
    pub owner: Option<String>,
    pub review_date: Option<DateTime<Utc>>,
    #[serde(default = "default_status")]
    pub status: RiskStatus,
    #[serde(default)]
    pub iso_refs: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRiskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub context: Option<Option<String>>,
    pub category: Option<String>,
    pub likelihood: Option<i32>,
    pub severity: Option<i32>,
    pub controls: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub owner: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub review_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<RiskStatus>,
    pub iso_refs: Option<Vec<String>>,
}

fn default_category() -> String {
    "OPERATIONAL".to_string()
}

fn default_status() -> RiskStatus {
    RiskStatus::Open
}

pub(crate) fn validate_iso_refs(refs: &[String], errors: &mut Vec<String>) {
    for r in refs {
        if !iso::is_valid_reference(r) {
            errors.push(format!("invalid ISO reference '{r}'"));
        }
    }
}

impl CreateRiskRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.title, "title", &mut errors);
        risk::validate_pair(self.likelihood, self.severity, &mut errors);
        validate_iso_refs(&self.iso_refs, &mut errors);
        errors
    }

    pub fn into_new(self, create_uid: i64) -> NewRisk {
        NewRisk {
            title: self.title.trim().to_string(),
            context: self.context,
            category: self.category,
            likelihood: self.likelihood,
            severity: self.severity,
            controls: serde_json::json!(self.controls),
            owner: self.owner,
            review_date: self.review_date,
            status: self.status.as_str().to_string(),
            iso_refs: serde_json::json!(self.iso_refs),
            create_uid: Some(create_uid),
        }
    }
}

impl UpdateRiskRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            require(title, "title", &mut errors);
        }
        if self.likelihood.is_some_and(|l| !risk::in_scale(l)) {
            errors.push("likelihood must be between 1 and 5".to_string());
        }
        if self.severity.is_some_and(|s| !risk::in_scale(s)) {
            errors.push("severity must be between 1 and 5".to_string());
        }
        if let Some(refs) = &self.iso_refs {
            validate_iso_refs(refs, &mut errors);
        }
        errors
    }

    pub fn into_changes(self, write_uid: i64) -> RiskChanges {
        RiskChanges {
            title: self.title,
            context: self.context,
            category: self.category,
            likelihood: self.likelihood,
            severity: self.severity,
            controls: self.controls.map(|c| serde_json::json!(c)),
            owner: self.owner,
            review_date: self.review_date,
            status: self.status.map(|s| s.as_str().to_string()),
            iso_refs: self.iso_refs.map(|r| serde_json::json!(r)),
            write_uid: Some(write_uid),
            write_date: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_validates_scale_and_refs() {
        let req: CreateRiskRequest = serde_json::from_str(
            r#"{"title":"Supplier failure","likelihood":6,"severity":3,"isoRefs":["9001:8.4","ISO"]}"#,
        )
        .unwrap();
        let errors = req.validate();
        assert_eq!(
            errors,
            vec![
                "likelihood must be between 1 and 5".to_string(),
                "invalid ISO reference 'ISO'".to_string(),
            ]
        );
    }

    #[test]
    fn view_computes_score() {
        let req: CreateRiskRequest = serde_json::from_str(
            r#"{"title":"Fire","likelihood":4,"severity":4,"isoRefs":["45001:8.2"]}"#,
        )
        .unwrap();
        let new = req.into_new(1);
        let risk = Risk {
            id: 7,
            title: new.title,
            context: None,
            category: new.category,
            likelihood: new.likelihood,
            severity: new.severity,
            controls: new.controls,
            owner: None,
            review_date: None,
            status: new.status,
            iso_refs: new.iso_refs,
            active: true,
            create_uid: Some(1),
            create_date: None,
            write_uid: None,
            write_date: None,
        };
        let view = RiskView::from(risk);
        assert_eq!(view.score, 16);
        assert_eq!(view.band, "Critical");
        assert_eq!(view.rag, "red");
        assert_eq!(view.iso_clauses.len(), 1);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["isoRefs"][0], "45001:8.2");
        assert_eq!(json["status"], "OPEN");
        assert!(json.get("createUid").is_none());
    }
}
