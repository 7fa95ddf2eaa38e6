//! qms.waste: waste types, generated waste records with their custody
//! trail, disposal facilities and licensed transporters.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::vocab::{DisposalMethod, WasteCategory, WasteStatus, WasteUnit};
use super::{double_option, email_is_valid, require};
use crate::schema::{
    qms_waste_facilities, qms_waste_record_logs, qms_waste_records, qms_waste_transporters,
    qms_waste_types,
};

// ── Waste types ──

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_waste_types)]
#[serde(rename_all = "camelCase")]
pub struct WasteType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub hazard_class: Option<String>,
    pub disposal_method: Option<String>,
    pub regulatory_code: Option<String>,
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
#[diesel(table_name = qms_waste_types)]
pub struct NewWasteType {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub hazard_class: Option<String>,
    pub disposal_method: Option<String>,
    pub regulatory_code: Option<String>,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_waste_types)]
pub struct WasteTypeChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<String>,
    pub hazard_class: Option<Option<String>>,
    pub disposal_method: Option<Option<String>>,
    pub regulatory_code: Option<Option<String>>,
    pub active: Option<bool>,
    pub write_uid: Option<i64>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWasteTypeRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub category: WasteCategory,
    pub hazard_class: Option<String>,
    pub disposal_method: Option<DisposalMethod>,
    pub regulatory_code: Option<String>,
}

impl CreateWasteTypeRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.name, "name", &mut errors);
        errors
    }

    pub fn into_new(self, create_uid: i64) -> NewWasteType {
        NewWasteType {
            name: self.name.trim().to_string(),
            description: self.description,
            category: self.category.as_str().to_string(),
            hazard_class: self.hazard_class,
            disposal_method: self.disposal_method.map(|m| m.as_str().to_string()),
            regulatory_code: self.regulatory_code,
            create_uid: Some(create_uid),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWasteTypeRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub category: Option<WasteCategory>,
    #[serde(default, deserialize_with = "double_option")]
    pub hazard_class: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub disposal_method: Option<Option<DisposalMethod>>,
    #[serde(default, deserialize_with = "double_option")]
    pub regulatory_code: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl UpdateWasteTypeRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            require(name, "name", &mut errors);
        }
        errors
    }

    pub fn into_changes(self, write_uid: i64) -> WasteTypeChanges {
        WasteTypeChanges {
            name: self.name,
            description: self.description,
            category: self.category.map(|c| c.as_str().to_string()),
            hazard_class: self.hazard_class,
            disposal_method: self
                .disposal_method
                .map(|m| m.map(|m| m.as_str().to_string())),
            regulatory_code: self.regulatory_code,
            active: self.is_active,
            write_uid: Some(write_uid),
            write_date: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteTypeQuery {
    pub category: Option<WasteCategory>,
    pub is_active: Option<bool>,
}

// ── Waste records ──

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_waste_records)]
#[serde(rename_all = "camelCase")]
pub struct WasteRecord {
    pub id: i64,
    pub record_number: String,
    pub waste_type_id: i64,
    pub quantity: f64,
    pub unit: String,
    pub location: String,
    pub generated_by: String,
    pub generated_date: DateTime<Utc>,
    pub stored_date: Option<DateTime<Utc>>,
    pub disposal_date: Option<DateTime<Utc>>,
    pub disposal_method: Option<String>,
    pub disposal_facility: Option<String>,
    pub transporter: Option<String>,
    pub manifest_number: Option<String>,
    pub cost: Option<f64>,
    pub status: String,
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
#[diesel(table_name = qms_waste_records)]
pub struct NewWasteRecord {
    pub record_number: String,
    pub waste_type_id: i64,
    pub quantity: f64,
    pub unit: String,
    pub location: String,
    pub generated_by: String,
    pub generated_date: DateTime<Utc>,
    pub stored_date: Option<DateTime<Utc>>,
    pub disposal_date: Option<DateTime<Utc>>,
    pub disposal_method: Option<String>,
    pub disposal_facility: Option<String>,
    pub transporter: Option<String>,
    pub manifest_number: Option<String>,
    pub cost: Option<f64>,
    pub status: String,
    pub notes: Option<String>,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = qms_waste_records)]
pub struct WasteRecordChanges {
    pub waste_type_id: Option<i64>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub generated_by: Option<String>,
    pub generated_date: Option<DateTime<Utc>>,
    pub stored_date: Option<Option<DateTime<Utc>>>,
    pub disposal_date: Option<Option<DateTime<Utc>>>,
    pub disposal_method: Option<Option<String>>,
    pub disposal_facility: Option<Option<String>>,
    pub transporter: Option<Option<String>>,
    pub manifest_number: Option<Option<String>>,
    pub cost: Option<Option<f64>>,
    pub status: Option<String>,
    pub notes: Option<Option<String>>,
    pub write_uid: Option<i64>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_waste_record_logs)]
#[serde(rename_all = "camelCase")]
pub struct WasteRecordLog {
    pub id: i64,
    pub waste_record_id: i64,
    pub action: String,
    pub performed_by: Option<i64>,
    pub comments: Option<String>,
    #[serde(rename = "timestamp")]
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_waste_record_logs)]
pub struct NewWasteRecordLog {
    pub waste_record_id: i64,
    pub action: String,
    pub performed_by: Option<i64>,
    pub comments: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteRecordView {
    #[serde(flatten)]
    pub record: WasteRecord,
    pub waste_type: Option<WasteType>,
    pub logs: Vec<WasteRecordLog>,
}

fn validate_amounts(quantity: Option<f64>, cost: Option<f64>, errors: &mut Vec<String>) {
    if let Some(q) = quantity {
        if q.is_nan() || q <= 0.0 {
            errors.push("quantity must be greater than 0".to_string());
        }
    }
    if let Some(c) = cost {
        if c.is_nan() || c <= 0.0 {
            errors.push("cost must be greater than 0".to_string());
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWasteRecordRequest {
    pub waste_type_id: i64,
    pub quantity: f64,
    pub unit: WasteUnit,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub generated_by: String,
    pub generated_date: DateTime<Utc>,
    pub stored_date: Option<DateTime<Utc>>,
    pub disposal_date: Option<DateTime<Utc>>,
    pub disposal_method: Option<DisposalMethod>,
    pub disposal_facility: Option<String>,
    pub transporter: Option<String>,
    pub manifest_number: Option<String>,
    pub cost: Option<f64>,
    #[serde(default = "default_waste_status")]
    pub status: WasteStatus,
    pub notes: Option<String>,
}

fn default_waste_status() -> WasteStatus {
    WasteStatus::Generated
}

impl CreateWasteRecordRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.location, "location", &mut errors);
        require(&self.generated_by, "generatedBy", &mut errors);
        validate_amounts(Some(self.quantity), self.cost, &mut errors);
        errors
    }

    pub fn into_new(self, record_number: String, create_uid: i64) -> NewWasteRecord {
        NewWasteRecord {
            record_number,
            waste_type_id: self.waste_type_id,
            quantity: self.quantity,
            unit: self.unit.as_str().to_string(),
            location: self.location.trim().to_string(),
            generated_by: self.generated_by.trim().to_string(),
            generated_date: self.generated_date,
            stored_date: self.stored_date,
            disposal_date: self.disposal_date,
            disposal_method: self.disposal_method.map(|m| m.as_str().to_string()),
            disposal_facility: self.disposal_facility,
            transporter: self.transporter,
            manifest_number: self.manifest_number,
            cost: self.cost,
            status: self.status.as_str().to_string(),
            notes: self.notes,
            create_uid: Some(create_uid),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWasteRecordRequest {
    pub waste_type_id: Option<i64>,
    pub quantity: Option<f64>,
    pub unit: Option<WasteUnit>,
    pub location: Option<String>,
    pub generated_by: Option<String>,
    pub generated_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub stored_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub disposal_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub disposal_method: Option<Option<DisposalMethod>>,
    #[serde(default, deserialize_with = "double_option")]
    pub disposal_facility: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub transporter: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub manifest_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub cost: Option<Option<f64>>,
    pub status: Option<WasteStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl UpdateWasteRecordRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(location) = &self.location {
            require(location, "location", &mut errors);
        }
        if let Some(generated_by) = &self.generated_by {
            require(generated_by, "generatedBy", &mut errors);
        }
        validate_amounts(self.quantity, self.cost.flatten(), &mut errors);
        errors
    }

    pub fn into_changes(self, write_uid: i64) -> WasteRecordChanges {
        WasteRecordChanges {
            waste_type_id: self.waste_type_id,
            quantity: self.quantity,
            unit: self.unit.map(|u| u.as_str().to_string()),
            location: self.location,
            generated_by: self.generated_by,
            generated_date: self.generated_date,
            stored_date: self.stored_date,
            disposal_date: self.disposal_date,
            disposal_method: self
                .disposal_method
                .map(|m| m.map(|m| m.as_str().to_string())),
            disposal_facility: self.disposal_facility,
            transporter: self.transporter,
            manifest_number: self.manifest_number,
            cost: self.cost,
            status: self.status.map(|s| s.as_str().to_string()),
            notes: self.notes,
            write_uid: Some(write_uid),
            write_date: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WasteRecordQuery {
    pub status: Option<WasteStatus>,
    pub category: Option<WasteCategory>,
    pub search: Option<String>,
}

// ── Facilities and transporters ──

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_waste_facilities)]
#[serde(rename_all = "camelCase")]
pub struct WasteFacility {
    pub id: i64,
    pub name: String,
    pub facility_type: String,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub license_number: Option<String>,
    pub license_expiry: Option<DateTime<Utc>>,
    pub accepted_waste_types: serde_json::Value,
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
#[diesel(table_name = qms_waste_facilities)]
pub struct NewWasteFacility {
    pub name: String,
    pub facility_type: String,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub license_number: Option<String>,
    pub license_expiry: Option<DateTime<Utc>>,
    pub accepted_waste_types: serde_json::Value,
    pub create_uid: Option<i64>,
}

fn validate_contact_email(email: Option<&str>, errors: &mut Vec<String>) {
    if let Some(email) = email.filter(|e| !e.is_empty()) {
        if !email_is_valid(email) {
            errors.push("contactEmail must be a valid email address".to_string());
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFacilityRequest {
    #[serde(default)]
    pub name: String,
    pub facility_type: DisposalMethod,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub license_number: Option<String>,
    pub license_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accepted_waste_types: Vec<String>,
}

impl CreateFacilityRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.name, "name", &mut errors);
        validate_contact_email(self.contact_email.as_deref(), &mut errors);
        errors
    }

    pub fn into_new(self, create_uid: i64) -> NewWasteFacility {
        NewWasteFacility {
            name: self.name.trim().to_string(),
            facility_type: self.facility_type.as_str().to_string(),
            address: self.address,
            contact_person: self.contact_person,
            contact_phone: self.contact_phone,
            contact_email: self.contact_email,
            license_number: self.license_number,
            license_expiry: self.license_expiry,
            accepted_waste_types: serde_json::json!(self.accepted_waste_types),
            create_uid: Some(create_uid),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityQuery {
    pub facility_type: Option<DisposalMethod>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_waste_transporters)]
#[serde(rename_all = "camelCase")]
pub struct WasteTransporter {
    pub id: i64,
    pub name: String,
    pub license_number: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub address: Option<String>,
    pub license_expiry: Option<DateTime<Utc>>,
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
#[diesel(table_name = qms_waste_transporters)]
pub struct NewWasteTransporter {
    pub name: String,
    pub license_number: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub address: Option<String>,
    pub license_expiry: Option<DateTime<Utc>>,
    pub create_uid: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransporterRequest {
    #[serde(default)]
    pub name: String,
    pub license_number: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub address: Option<String>,
    pub license_expiry: Option<DateTime<Utc>>,
}

impl CreateTransporterRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&self.name, "name", &mut errors);
        validate_contact_email(self.contact_email.as_deref(), &mut errors);
        errors
    }

    pub fn into_new(self, create_uid: i64) -> NewWasteTransporter {
        NewWasteTransporter {
            name: self.name.trim().to_string(),
            license_number: self.license_number,
            contact_person: self.contact_person,
            contact_phone: self.contact_phone,
            contact_email: self.contact_email,
            address: self.address,
            license_expiry: self.license_expiry,
            create_uid: Some(create_uid),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransporterQuery {
    pub is_active: Option<bool>,
}

// ── Stats ──

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteStats {
    pub total_records: i64,
    pub total_quantity: f64,
    pub total_cost: f64,
    pub pending_disposal: i64,
    pub disposed_this_month: i64,
    pub by_category: Vec<CategoryCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_requires_positive_quantity() {
        let req: CreateWasteRecordRequest = serde_json::from_str(
            r#"{"wasteTypeId":1,"quantity":0,"unit":"KG","location":"Yard","generatedBy":"Ops","generatedDate":"2025-01-10T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(req.validate(), vec!["quantity must be greater than 0"]);
        assert_eq!(req.status, WasteStatus::Generated);
    }

    #[test]
    fn unknown_unit_is_rejected() {
        let parsed = serde_json::from_str::<CreateWasteRecordRequest>(
            r#"{"wasteTypeId":1,"quantity":3,"unit":"TONS","location":"Yard","generatedBy":"Ops","generatedDate":"2025-01-10T00:00:00Z"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn update_can_clear_disposal_method() {
        let req: UpdateWasteRecordRequest =
            serde_json::from_str(r#"{"disposalMethod":null,"status":"STORED"}"#).unwrap();
        let changes = req.into_changes(4);
        assert_eq!(changes.disposal_method, Some(None));
        assert_eq!(changes.status.as_deref(), Some("STORED"));
    }

    #[test]
    fn facility_email_is_checked() {
        let req: CreateFacilityRequest = serde_json::from_str(
            r#"{"name":"North Landfill","facilityType":"LANDFILL","contactEmail":"nope"}"#,
        )
        .unwrap();
        assert_eq!(req.validate(), vec!["contactEmail must be a valid email address"]);
        let ok: CreateTransporterRequest =
            serde_json::from_str(r#"{"name":"Haulers","contactEmail":"ops@haulers.example"}"#).unwrap();
        assert!(ok.validate().is_empty());
    }
}
