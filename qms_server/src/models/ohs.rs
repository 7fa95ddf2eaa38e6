//! qms.hazard + qms.incident: OH&S hazard register and incident log.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::require;
use super::risk::validate_iso_refs;
use super::vocab::{IncidentSeverity, IncidentStatus, IncidentType, RiskStatus};
use crate::compliance::risk::{self, RiskScore};
use crate::schema::{qms_hazards, qms_incidents};

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_hazards)]
#[serde(rename_all = "camelCase")]
pub struct Hazard {
    pub id: i64,
    pub title: String,
    pub area: Option<String>,
    pub description: Option<String>,
    pub likelihood: i32,
    pub severity: i32,
    #[serde(rename = "residualL")]
    pub residual_l: Option<i32>,
    #[serde(rename = "residualS")]
    pub residual_s: Option<i32>,
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
#[diesel(table_name = qms_hazards)]
pub struct NewHazard {
    pub title: String,
    pub area: Option<String>,
    pub description: Option<String>,
    pub likelihood: i32,
    pub severity: i32,
    pub residual_l: Option<i32>,
    pub residual_s: Option<i32>,
    pub controls: serde_json::Value,
    pub owner: Option<String>,
    pub review_date: Option<DateTime<Utc>>,
    pub status: String,
    pub iso_refs: serde_json::Value,
    pub create_uid: Option<i64>,
}

/// A hazard with inherent and, when assessed, residual risk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardView {
    #[serde(flatten)]
    pub hazard: Hazard,
    pub inherent: Option<RiskScore>,
    pub residual: Option<RiskScore>,
}

impl From<Hazard> for HazardView {
    fn from(hazard: Hazard) -> Self {
        let inherent = risk::score(hazard.likelihood, hazard.severity);
        let residual = match (hazard.residual_l, hazard.residual_s) {
            (Some(l), Some(s)) => risk::score(l, s),
            _ => None,
        };
        Self {
            hazard,
            inherent,
            residual,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHazardRequest {
    pub title: String,
    pub area: Option<String>,
    pub description: Option<String>,
    pub likelihood: i32,
    pub severity: i32,
    #[serde(rename = "residualL")]
    pub residual_l: Option<i32>,
    #[serde(rename = "residualS")]
    pub residual_s: Option<i32>,
    #[serde(default)]
    pub controls: Vec<String>,
    pub owner: Option<String>,
    pub review_date: Option<DateTime<Utc>>,
    #[serde(default = "default_hazard_status")]
    pub status: RiskStatus,
    #[serde(default)]
    pub iso_refs: Vec<String>,
}

fn default_hazard_status() -> RiskStatus {
    RiskStatus::Open
}

impl CreateHazardRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.title, "title", &mut errors);
        risk::validate_pair(self.likelihood, self.severity, &mut errors);
        if self.residual_l.is_some_and(|v| !risk::in_scale(v)) {
            errors.push("residualL must be between 1 and 5".to_string());
        }
        if self.residual_s.is_some_and(|v| !risk::in_scale(v)) {
            errors.push("residualS must be between 1 and 5".to_string());
        }
        validate_iso_refs(&self.iso_refs, &mut errors);
        errors
    }

    pub fn into_new(self, create_uid: i64) -> NewHazard {
        NewHazard {
            title: self.title.trim().to_string(),
            area: self.area,
            description: self.description,
            likelihood: self.likelihood,
            severity: self.severity,
            residual_l: self.residual_l,
            residual_s: self.residual_s,
            controls: serde_json::json!(self.controls),
            owner: self.owner,
            review_date: self.review_date,
            status: self.status.as_str().to_string(),
            iso_refs: serde_json::json!(self.iso_refs),
            create_uid: Some(create_uid),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_incidents)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: i64,
    #[serde(rename = "ref")]
    pub ref_number: Option<String>,
    #[serde(rename = "type")]
    pub incident_type: String,
    #[serde(rename = "date")]
    pub occurred_at: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub people: serde_json::Value,
    pub severity_type: String,
    pub lost_time_days: Option<i32>,
    pub hours_worked: Option<f64>,
    pub immediate_actions: Option<String>,
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
#[diesel(table_name = qms_incidents)]
pub struct NewIncident {
    pub ref_number: Option<String>,
    pub incident_type: String,
    pub occurred_at: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub people: serde_json::Value,
    pub severity_type: String,
    pub lost_time_days: Option<i32>,
    pub hours_worked: Option<f64>,
    pub immediate_actions: Option<String>,
    pub status: String,
    pub iso_refs: serde_json::Value,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncidentRequest {
    #[serde(rename = "ref")]
    pub ref_number: Option<String>,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    #[serde(rename = "date")]
    pub occurred_at: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub people: Vec<serde_json::Value>,
    pub severity_type: IncidentSeverity,
    pub lost_time_days: Option<i32>,
    pub hours_worked: Option<f64>,
    pub immediate_actions: Option<String>,
    #[serde(default = "default_incident_status")]
    pub status: IncidentStatus,
    #[serde(default)]
    pub iso_refs: Vec<String>,
}

fn default_incident_status() -> IncidentStatus {
    IncidentStatus::Open
}

impl CreateIncidentRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.lost_time_days.is_some_and(|d| d < 0) {
            errors.push("lostTimeDays cannot be negative".to_string());
        }
        if self.hours_worked.is_some_and(|h| h.is_nan() || h < 0.0) {
            errors.push("hoursWorked cannot be negative".to_string());
        }
        validate_iso_refs(&self.iso_refs, &mut errors);
        errors
    }

    /// Build the row; `ref_number` is used when the request carries none.
    pub fn into_new(self, ref_number: String, create_uid: i64) -> NewIncident {
        NewIncident {
            ref_number: Some(self.ref_number.filter(|r| !r.trim().is_empty()).unwrap_or(ref_number)),
            incident_type: self.incident_type.as_str().to_string(),
            occurred_at: self.occurred_at,
            location: self.location,
            description: self.description,
            people: serde_json::Value::Array(self.people),
            severity_type: self.severity_type.as_str().to_string(),
            lost_time_days: self.lost_time_days,
            hours_worked: self.hours_worked,
            immediate_actions: self.immediate_actions,
            status: self.status.as_str().to_string(),
            iso_refs: serde_json::json!(self.iso_refs),
            create_uid: Some(create_uid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incident_request_uses_wire_names() {
        let req: CreateIncidentRequest = serde_json::from_str(
            r#"{"type":"NEAR_MISS","date":"2025-02-01T08:00:00Z","severityType":"NONE","people":["J. Doe"]}"#,
        )
        .unwrap();
        assert_eq!(req.incident_type, IncidentType::NearMiss);
        assert_eq!(req.status, IncidentStatus::Open);
        assert!(req.validate().is_empty());
        let new = req.into_new("INC-2025-0001".into(), 1);
        assert_eq!(new.ref_number.as_deref(), Some("INC-2025-0001"));
        assert_eq!(new.people, serde_json::json!(["J. Doe"]));
    }

    #[test]
    fn unknown_incident_type_fails_to_parse() {
        let res = serde_json::from_str::<CreateIncidentRequest>(
            r#"{"type":"ALIEN","date":"2025-02-01T08:00:00Z","severityType":"NONE"}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn hazard_residual_requires_both_values() {
        let req: CreateHazardRequest = serde_json::from_str(
            r#"{"title":"Forklift traffic","likelihood":4,"severity":5,"residualL":2}"#,
        )
        .unwrap();
        assert!(req.validate().is_empty());
        let new = req.into_new(1);
        let hazard = Hazard {
            id: 1,
            title: new.title,
            area: None,
            description: None,
            likelihood: new.likelihood,
            severity: new.severity,
            residual_l: new.residual_l,
            residual_s: new.residual_s,
            controls: new.controls,
            owner: None,
            review_date: None,
            status: new.status,
            iso_refs: new.iso_refs,
            active: true,
            create_uid: None,
            create_date: None,
            write_uid: None,
            write_date: None,
        };
        let view = HazardView::from(hazard);
        assert_eq!(view.inherent.map(|s| s.score), Some(20));
        assert!(view.residual.is_none());
    }
}
