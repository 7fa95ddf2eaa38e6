//! qms.equipment and qms.calibration: measuring equipment and its
//! calibration schedule.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::vocab::{CalibrationResult, EquipmentStatus};
use super::{double_option, require};
use crate::compliance::rag::{calibration_rag, Rag};
use crate::schema::{qms_calibrations, qms_equipment};

/// Maintenance or calibration falling due within this window counts as due.
pub const DUE_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_equipment)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: i64,
    pub name: String,
    pub asset_tag: String,
    pub location: Option<String>,
    pub maint_due: Option<DateTime<Utc>>,
    pub status: String,
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
#[diesel(table_name = qms_equipment)]
pub struct NewEquipment {
    pub name: String,
    pub asset_tag: String,
    pub location: Option<String>,
    pub maint_due: Option<DateTime<Utc>>,
    pub status: String,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_equipment)]
pub struct EquipmentChanges {
    pub name: Option<String>,
    pub asset_tag: Option<String>,
    pub location: Option<Option<String>>,
    pub maint_due: Option<Option<DateTime<Utc>>>,
    pub status: Option<String>,
    pub write_uid: Option<i64>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_calibrations)]
#[serde(rename_all = "camelCase")]
pub struct Calibration {
    pub id: i64,
    pub equipment_id: i64,
    pub due_date: DateTime<Utc>,
    pub performed_on: Option<DateTime<Utc>>,
    pub result: String,
    pub certificate_url: Option<String>,
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
#[diesel(table_name = qms_calibrations)]
pub struct NewCalibration {
    pub equipment_id: i64,
    pub due_date: DateTime<Utc>,
    pub performed_on: Option<DateTime<Utc>>,
    pub result: String,
    pub certificate_url: Option<String>,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_calibrations)]
pub struct CalibrationChanges {
    pub due_date: Option<DateTime<Utc>>,
    pub performed_on: Option<Option<DateTime<Utc>>>,
    pub result: Option<String>,
    pub certificate_url: Option<Option<String>>,
    pub write_uid: Option<i64>,
    pub write_date: Option<DateTime<Utc>>,
}

/// A calibration with its RAG badge and, where loaded, its equipment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationView {
    #[serde(flatten)]
    pub calibration: Calibration,
    pub rag: Rag,
    pub rag_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Equipment>,
}

impl CalibrationView {
    pub fn new(calibration: Calibration, equipment: Option<Equipment>, now: DateTime<Utc>) -> Self {
        let rag = calibration_rag(calibration.due_date, calibration.performed_on, now);
        Self {
            calibration,
            rag,
            rag_label: rag.label(),
            equipment,
        }
    }
}

/// Equipment with its most recent calibration by due date.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentView {
    #[serde(flatten)]
    pub equipment: Equipment,
    pub calibrations: Vec<CalibrationView>,
}

fn due_within_window(due: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    due - now <= Duration::days(DUE_WINDOW_DAYS)
}

fn default_equipment_status() -> EquipmentStatus {
    EquipmentStatus::Active
}

fn default_result() -> CalibrationResult {
    CalibrationResult::NotTested
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEquipmentRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub asset_tag: String,
    pub location: Option<String>,
    pub maint_due: Option<DateTime<Utc>>,
    #[serde(default = "default_equipment_status")]
    pub status: EquipmentStatus,
}

impl CreateEquipmentRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.name, "name", &mut errors);
        require(&self.asset_tag, "assetTag", &mut errors);
        errors
    }

    pub fn into_new(self, user_id: i64) -> NewEquipment {
        NewEquipment {
            name: self.name.trim().to_string(),
            asset_tag: self.asset_tag.trim().to_string(),
            location: self.location.filter(|l| !l.trim().is_empty()),
            maint_due: self.maint_due,
            status: self.status.as_str().to_string(),
            create_uid: Some(user_id),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEquipmentRequest {
    pub name: Option<String>,
    pub asset_tag: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub maint_due: Option<Option<DateTime<Utc>>>,
    pub status: Option<EquipmentStatus>,
}

impl UpdateEquipmentRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (value, field) in [(&self.name, "name"), (&self.asset_tag, "assetTag")] {
            if let Some(v) = value {
                require(v, field, &mut errors);
            }
        }
        errors
    }

    pub fn into_changes(self, write_uid: i64) -> EquipmentChanges {
        EquipmentChanges {
            name: self.name.map(|n| n.trim().to_string()),
            asset_tag: self.asset_tag.map(|t| t.trim().to_string()),
            location: self.location,
            maint_due: self.maint_due,
            status: self.status.map(|s| s.as_str().to_string()),
            write_uid: Some(write_uid),
            write_date: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCalibrationRequest {
    pub equipment_id: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub performed_on: Option<DateTime<Utc>>,
    #[serde(default = "default_result")]
    pub result: CalibrationResult,
    pub certificate_url: Option<String>,
}

impl CreateCalibrationRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.equipment_id.is_none() {
            errors.push("equipmentId is required".to_string());
        }
        if self.due_date.is_none() {
            errors.push("dueDate is required".to_string());
        }
        errors
    }

    /// `None` when a required field is missing; `validate` reports which.
    pub fn into_new(self, user_id: i64) -> Option<NewCalibration> {
        Some(NewCalibration {
            equipment_id: self.equipment_id?,
            due_date: self.due_date?,
            performed_on: self.performed_on,
            result: self.result.as_str().to_string(),
            certificate_url: self.certificate_url.filter(|u| !u.trim().is_empty()),
            create_uid: Some(user_id),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCalibrationRequest {
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub performed_on: Option<Option<DateTime<Utc>>>,
    pub result: Option<CalibrationResult>,
    #[serde(default, deserialize_with = "double_option")]
    pub certificate_url: Option<Option<String>>,
}

impl UpdateCalibrationRequest {
    pub fn into_changes(self, write_uid: i64) -> CalibrationChanges {
        CalibrationChanges {
            due_date: self.due_date,
            performed_on: self.performed_on,
            result: self.result.map(|r| r.as_str().to_string()),
            certificate_url: self
                .certificate_url
                .map(|u| u.filter(|u| !u.trim().is_empty())),
            write_uid: Some(write_uid),
            write_date: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationQuery {
    pub equipment_id: Option<i64>,
    pub result: Option<CalibrationResult>,
    pub rag: Option<Rag>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentStats {
    pub total: i64,
    pub active: i64,
    pub out_of_service: i64,
    pub maintenance_due: i64,
    pub calibration_due: i64,
    pub locations: i64,
}

impl EquipmentStats {
    pub fn tally(equipment: &[EquipmentView], now: DateTime<Utc>) -> Self {
        let mut stats = EquipmentStats::default();
        let mut locations = HashSet::new();
        for view in equipment {
            let e = &view.equipment;
            stats.total += 1;
            match e.status.parse::<EquipmentStatus>() {
                Ok(EquipmentStatus::Active) => stats.active += 1,
                Ok(EquipmentStatus::OutOfService) => stats.out_of_service += 1,
                Err(_) => {}
            }
            if e.maint_due.is_some_and(|due| due_within_window(due, now)) {
                stats.maintenance_due += 1;
            }
            if view
                .calibrations
                .first()
                .is_some_and(|c| due_within_window(c.calibration.due_date, now))
            {
                stats.calibration_due += 1;
            }
            if let Some(location) = e.location.as_deref().filter(|l| !l.is_empty()) {
                locations.insert(location);
            }
        }
        stats.locations = locations.len() as i64;
        stats
    }
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub overdue: i64,
    pub due_soon: i64,
    pub passed: i64,
    pub failed: i64,
}

impl CalibrationStats {
    pub fn tally(calibrations: &[CalibrationView]) -> Self {
        let mut stats = CalibrationStats::default();
        for view in calibrations {
            stats.total += 1;
            if view.calibration.performed_on.is_some() {
                stats.completed += 1;
            } else {
                stats.pending += 1;
                match view.rag {
                    Rag::Red => stats.overdue += 1,
                    Rag::Amber => stats.due_soon += 1,
                    Rag::Green => {}
                }
            }
            match view.calibration.result.parse::<CalibrationResult>() {
                Ok(CalibrationResult::Pass) => stats.passed += 1,
                Ok(CalibrationResult::Fail) => stats.failed += 1,
                _ => {}
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        "2025-06-01T09:00:00Z".parse().unwrap()
    }

    fn equipment(id: i64, status: &str, location: Option<&str>, maint_due: Option<DateTime<Utc>>) -> Equipment {
        Equipment {
            id,
            name: format!("Gauge {id}"),
            asset_tag: format!("PG-{id:03}"),
            location: location.map(str::to_string),
            maint_due,
            status: status.to_string(),
            create_uid: None,
            create_date: None,
            write_uid: None,
            write_date: None,
        }
    }

    fn calibration(due_date: DateTime<Utc>, performed_on: Option<DateTime<Utc>>, result: &str) -> Calibration {
        Calibration {
            id: 1,
            equipment_id: 1,
            due_date,
            performed_on,
            result: result.to_string(),
            certificate_url: None,
            create_uid: None,
            create_date: None,
            write_uid: None,
            write_date: None,
        }
    }

    #[test]
    fn performed_calibration_is_green_even_when_late() {
        let now = now();
        let done = CalibrationView::new(
            calibration(now - Duration::days(40), Some(now - Duration::days(41)), "PASS"),
            None,
            now,
        );
        assert_eq!(done.rag, Rag::Green);
        let late = CalibrationView::new(calibration(now - Duration::days(2), None, "NOT_TESTED"), None, now);
        assert_eq!(late.rag, Rag::Red);
        assert_eq!(late.rag_label, "Overdue");
    }

    #[test]
    fn calibration_stats_split_pending_by_rag() {
        let now = now();
        let views: Vec<CalibrationView> = [
            calibration(now - Duration::days(5), None, "NOT_TESTED"),
            calibration(now + Duration::days(10), None, "NOT_TESTED"),
            calibration(now + Duration::days(90), None, "NOT_TESTED"),
            calibration(now - Duration::days(30), Some(now - Duration::days(31)), "PASS"),
            calibration(now - Duration::days(60), Some(now - Duration::days(60)), "FAIL"),
        ]
        .into_iter()
        .map(|c| CalibrationView::new(c, None, now))
        .collect();

        assert_eq!(
            CalibrationStats::tally(&views),
            CalibrationStats {
                total: 5,
                completed: 2,
                pending: 3,
                overdue: 1,
                due_soon: 1,
                passed: 1,
                failed: 1,
            }
        );
    }

    #[test]
    fn equipment_stats_use_latest_calibration() {
        let now = now();
        let views = vec![
            EquipmentView {
                equipment: equipment(1, "ACTIVE", Some("QC Lab"), Some(now + Duration::days(5))),
                calibrations: vec![CalibrationView::new(
                    calibration(now + Duration::days(20), None, "NOT_TESTED"),
                    None,
                    now,
                )],
            },
            EquipmentView {
                equipment: equipment(2, "ACTIVE", Some("QC Lab"), Some(now + Duration::days(120))),
                calibrations: vec![CalibrationView::new(
                    calibration(now + Duration::days(200), None, "NOT_TESTED"),
                    None,
                    now,
                )],
            },
            EquipmentView {
                equipment: equipment(3, "OUT_OF_SERVICE", Some("Warehouse"), Some(now - Duration::days(1))),
                calibrations: Vec::new(),
            },
        ];

        assert_eq!(
            EquipmentStats::tally(&views, now),
            EquipmentStats {
                total: 3,
                active: 2,
                out_of_service: 1,
                maintenance_due: 2,
                calibration_due: 1,
                locations: 2,
            }
        );
    }

    #[test]
    fn calibration_needs_equipment_and_due_date() {
        let req: CreateCalibrationRequest = serde_json::from_str(r#"{"result":"AS_FOUND"}"#).unwrap();
        assert_eq!(req.validate(), vec!["equipmentId is required", "dueDate is required"]);
        assert!(req.into_new(1).is_none());

        let req: CreateCalibrationRequest = serde_json::from_str(
            r#"{"equipmentId":3,"dueDate":"2025-07-01T00:00:00Z","certificateUrl":"  "}"#,
        )
        .unwrap();
        assert!(req.validate().is_empty());
        let new = req.into_new(9).unwrap();
        assert_eq!(new.result, "NOT_TESTED");
        assert_eq!(new.certificate_url, None);
    }

    #[test]
    fn equipment_requires_name_and_tag() {
        let req: CreateEquipmentRequest = serde_json::from_str(r#"{"name":" "}"#).unwrap();
        assert_eq!(req.validate(), vec!["name is required", "assetTag is required"]);
        let req: CreateEquipmentRequest =
            serde_json::from_str(r#"{"name":"pH Meter","assetTag":"PH-006","location":""}"#).unwrap();
        let new = req.into_new(1);
        assert_eq!(new.status, "ACTIVE");
        assert_eq!(new.location, None);
    }
}
