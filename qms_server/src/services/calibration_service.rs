//! Measuring equipment and its calibration schedule.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::Rejection;
use crate::models::calibration::{
    Calibration, CalibrationQuery, CalibrationStats, CalibrationView, CreateCalibrationRequest,
    CreateEquipmentRequest, Equipment, EquipmentStats, EquipmentView, UpdateCalibrationRequest,
    UpdateEquipmentRequest,
};
use crate::schema::{qms_calibrations, qms_equipment};

fn equipment_not_found() -> anyhow::Error {
    Rejection::NotFound("Equipment not found".to_string()).into()
}

fn calibration_not_found() -> anyhow::Error {
    Rejection::NotFound("Calibration not found".to_string()).into()
}

// ── Equipment ──

/// All equipment by name, each with its latest calibration by due date.
pub async fn list_equipment(
    conn: &mut AsyncPgConnection,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<EquipmentView>> {
    let equipment: Vec<Equipment> = qms_equipment::table
        .order((qms_equipment::name.asc(), qms_equipment::id.asc()))
        .select(Equipment::as_select())
        .load(conn)
        .await?;
    let ids: Vec<i64> = equipment.iter().map(|e| e.id).collect();

    let calibrations: Vec<Calibration> = qms_calibrations::table
        .filter(qms_calibrations::equipment_id.eq_any(&ids))
        .order((qms_calibrations::due_date.desc(), qms_calibrations::id.desc()))
        .select(Calibration::as_select())
        .load(conn)
        .await?;
    let mut latest: HashMap<i64, Calibration> = HashMap::new();
    for c in calibrations {
        latest.entry(c.equipment_id).or_insert(c);
    }

    Ok(equipment
        .into_iter()
        .map(|equipment| EquipmentView {
            calibrations: latest
                .remove(&equipment.id)
                .map(|c| CalibrationView::new(c, None, now))
                .into_iter()
                .collect(),
            equipment,
        })
        .collect())
}

pub async fn find_equipment(conn: &mut AsyncPgConnection, equipment_id: i64) -> anyhow::Result<Equipment> {
    qms_equipment::table
        .find(equipment_id)
        .select(Equipment::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(equipment_not_found)
}

pub async fn create_equipment(
    conn: &mut AsyncPgConnection,
    req: CreateEquipmentRequest,
    user_id: i64,
) -> anyhow::Result<Equipment> {
    let equipment: Equipment = diesel::insert_into(qms_equipment::table)
        .values(&req.into_new(user_id))
        .returning(Equipment::as_returning())
        .get_result(conn)
        .await?;
    crate::metrics::record_created("equipment");
    tracing::info!(equipment_id = equipment.id, asset_tag = %equipment.asset_tag, "Equipment registered");
    Ok(equipment)
}

pub async fn update_equipment(
    conn: &mut AsyncPgConnection,
    equipment_id: i64,
    req: UpdateEquipmentRequest,
    user_id: i64,
) -> anyhow::Result<Equipment> {
    let current = find_equipment(conn, equipment_id).await?;
    let new_status = req.status.filter(|s| s.as_str() != current.status);
    let equipment: Equipment = diesel::update(qms_equipment::table.find(equipment_id))
        .set(&req.into_changes(user_id))
        .returning(Equipment::as_returning())
        .get_result(conn)
        .await?;
    if let Some(status) = new_status {
        crate::metrics::status_changed("equipment", status.as_str());
        tracing::info!(equipment_id, status = %status, "Equipment status changed");
    }
    Ok(equipment)
}

/// Delete equipment together with its calibration history.
pub async fn delete_equipment(conn: &mut AsyncPgConnection, equipment_id: i64) -> anyhow::Result<()> {
    let deleted = diesel::delete(qms_equipment::table.find(equipment_id))
        .execute(conn)
        .await?;
    if deleted == 0 {
        return Err(equipment_not_found());
    }
    tracing::info!(equipment_id, "Equipment deleted");
    Ok(())
}

pub async fn equipment_stats(
    conn: &mut AsyncPgConnection,
    now: DateTime<Utc>,
) -> anyhow::Result<EquipmentStats> {
    let equipment = list_equipment(conn, now).await?;
    Ok(EquipmentStats::tally(&equipment, now))
}

// ── Calibrations ──

/// Calibrations by due date, soonest first, each with its equipment.
/// The `rag` filter applies after the badge is derived.
pub async fn list_calibrations(
    conn: &mut AsyncPgConnection,
    query: &CalibrationQuery,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<CalibrationView>> {
    let mut q = qms_calibrations::table
        .inner_join(qms_equipment::table)
        .into_boxed();
    if let Some(equipment_id) = query.equipment_id {
        q = q.filter(qms_calibrations::equipment_id.eq(equipment_id));
    }
    if let Some(result) = query.result {
        q = q.filter(qms_calibrations::result.eq(result.as_str()));
    }
    let rows: Vec<(Calibration, Equipment)> = q
        .order((qms_calibrations::due_date.asc(), qms_calibrations::id.asc()))
        .select((Calibration::as_select(), Equipment::as_select()))
        .load(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(calibration, equipment)| CalibrationView::new(calibration, Some(equipment), now))
        .filter(|view| query.rag.is_none() || query.rag == Some(view.rag))
        .collect())
}

pub async fn get_calibration(
    conn: &mut AsyncPgConnection,
    calibration_id: i64,
    now: DateTime<Utc>,
) -> anyhow::Result<CalibrationView> {
    let (calibration, equipment): (Calibration, Equipment) = qms_calibrations::table
        .inner_join(qms_equipment::table)
        .filter(qms_calibrations::id.eq(calibration_id))
        .select((Calibration::as_select(), Equipment::as_select()))
        .first(conn)
        .await
        .optional()?
        .ok_or_else(calibration_not_found)?;
    Ok(CalibrationView::new(calibration, Some(equipment), now))
}

/// Schedule a calibration. The equipment must exist.
pub async fn create_calibration(
    conn: &mut AsyncPgConnection,
    req: CreateCalibrationRequest,
    user_id: i64,
    now: DateTime<Utc>,
) -> anyhow::Result<CalibrationView> {
    let new = req
        .into_new(user_id)
        .ok_or_else(|| Rejection::Invalid("equipmentId and dueDate are required".to_string()))?;
    find_equipment(conn, new.equipment_id).await?;
    let calibration_id: i64 = diesel::insert_into(qms_calibrations::table)
        .values(&new)
        .returning(qms_calibrations::id)
        .get_result(conn)
        .await?;
    crate::metrics::record_created("calibration");
    tracing::info!(calibration_id, equipment_id = new.equipment_id, "Calibration scheduled");
    get_calibration(conn, calibration_id, now).await
}

pub async fn update_calibration(
    conn: &mut AsyncPgConnection,
    calibration_id: i64,
    req: UpdateCalibrationRequest,
    user_id: i64,
    now: DateTime<Utc>,
) -> anyhow::Result<CalibrationView> {
    let recorded = req.result;
    let updated = diesel::update(qms_calibrations::table.find(calibration_id))
        .set(&req.into_changes(user_id))
        .execute(conn)
        .await?;
    if updated == 0 {
        return Err(calibration_not_found());
    }
    if let Some(result) = recorded {
        crate::metrics::status_changed("calibration", result.as_str());
        tracing::info!(calibration_id, result = %result, "Calibration result recorded");
    }
    get_calibration(conn, calibration_id, now).await
}

pub async fn delete_calibration(conn: &mut AsyncPgConnection, calibration_id: i64) -> anyhow::Result<()> {
    let deleted = diesel::delete(qms_calibrations::table.find(calibration_id))
        .execute(conn)
        .await?;
    if deleted == 0 {
        return Err(calibration_not_found());
    }
    tracing::info!(calibration_id, "Calibration deleted");
    Ok(())
}

pub async fn calibration_stats(
    conn: &mut AsyncPgConnection,
    now: DateTime<Utc>,
) -> anyhow::Result<CalibrationStats> {
    let all = CalibrationQuery {
        equipment_id: None,
        result: None,
        rag: None,
    };
    let calibrations = list_calibrations(conn, &all, now).await?;
    Ok(CalibrationStats::tally(&calibrations))
}
