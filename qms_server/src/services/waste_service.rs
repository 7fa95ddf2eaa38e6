//! Waste management: waste types, records with their custody trail,
//! disposal facilities, transporters and summary statistics.

use std::collections::HashMap;

use chrono::{Datelike, TimeZone, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Text};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::compliance::reference::{next_reference, reference_pattern};
use crate::error::Rejection;
use crate::models::vocab::WasteStatus;
use crate::models::waste::{
    CategoryCount, CreateWasteRecordRequest, FacilityQuery, NewWasteFacility, NewWasteRecordLog,
    NewWasteTransporter, NewWasteType, TransporterQuery, UpdateWasteRecordRequest, WasteFacility,
    WasteRecord, WasteRecordLog, WasteRecordQuery, WasteRecordView, WasteStats, WasteTransporter,
    WasteType, WasteTypeChanges, WasteTypeQuery,
};
use crate::schema::{
    qms_waste_facilities, qms_waste_record_logs, qms_waste_records, qms_waste_transporters,
    qms_waste_types,
};

pub const RECORD_PREFIX: &str = "WR";

fn type_not_found() -> anyhow::Error {
    Rejection::NotFound("Waste type not found".to_string()).into()
}

fn record_not_found() -> anyhow::Error {
    Rejection::NotFound("Waste record not found".to_string()).into()
}

// ── Waste types ──

pub async fn list_types(
    conn: &mut AsyncPgConnection,
    query: &WasteTypeQuery,
) -> anyhow::Result<Vec<WasteType>> {
    let mut q = qms_waste_types::table.into_boxed();
    if let Some(category) = query.category {
        q = q.filter(qms_waste_types::category.eq(category.as_str()));
    }
    if let Some(active) = query.is_active {
        q = q.filter(qms_waste_types::active.eq(active));
    }
    let results = q
        .order(qms_waste_types::name.asc())
        .select(WasteType::as_select())
        .load(conn)
        .await?;
    Ok(results)
}

pub async fn find_type(conn: &mut AsyncPgConnection, type_id: i64) -> anyhow::Result<WasteType> {
    qms_waste_types::table
        .find(type_id)
        .select(WasteType::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(type_not_found)
}

pub async fn create_type(
    conn: &mut AsyncPgConnection,
    new_type: NewWasteType,
) -> anyhow::Result<WasteType> {
    let result: WasteType = diesel::insert_into(qms_waste_types::table)
        .values(&new_type)
        .returning(WasteType::as_returning())
        .get_result(conn)
        .await?;
    crate::metrics::record_created("waste_type");
    tracing::info!(waste_type_id = result.id, name = %result.name, "Waste type created");
    Ok(result)
}

pub async fn update_type(
    conn: &mut AsyncPgConnection,
    type_id: i64,
    changes: WasteTypeChanges,
) -> anyhow::Result<WasteType> {
    diesel::update(qms_waste_types::table.find(type_id))
        .set(&changes)
        .returning(WasteType::as_returning())
        .get_result(conn)
        .await
        .optional()?
        .ok_or_else(type_not_found)
}

/// Delete a waste type that no record refers to.
pub async fn delete_type(conn: &mut AsyncPgConnection, type_id: i64) -> anyhow::Result<()> {
    find_type(conn, type_id).await?;
    let in_use: i64 = qms_waste_records::table
        .filter(qms_waste_records::waste_type_id.eq(type_id))
        .count()
        .get_result(conn)
        .await?;
    if in_use > 0 {
        return Err(Rejection::Invalid("Cannot delete waste type with associated records".to_string()).into());
    }
    diesel::delete(qms_waste_types::table.find(type_id))
        .execute(conn)
        .await?;
    tracing::info!(waste_type_id = type_id, "Waste type deleted");
    Ok(())
}

// ── Waste records ──

async fn types_by_id(
    conn: &mut AsyncPgConnection,
    records: &[WasteRecord],
) -> anyhow::Result<HashMap<i64, WasteType>> {
    let ids: Vec<i64> = records.iter().map(|r| r.waste_type_id).collect();
    let types = qms_waste_types::table
        .filter(qms_waste_types::id.eq_any(&ids))
        .select(WasteType::as_select())
        .load(conn)
        .await?
        .into_iter()
        .map(|t: WasteType| (t.id, t))
        .collect();
    Ok(types)
}

/// Records newest first, each with its waste type. `search` matches the
/// record number, location or producer, case-insensitively.
pub async fn list_records(
    conn: &mut AsyncPgConnection,
    query: &WasteRecordQuery,
) -> anyhow::Result<Vec<WasteRecordView>> {
    let mut q = qms_waste_records::table.into_boxed();
    if let Some(status) = query.status {
        q = q.filter(qms_waste_records::status.eq(status.as_str()));
    }
    if let Some(category) = query.category {
        let type_ids = qms_waste_types::table
            .filter(qms_waste_types::category.eq(category.as_str()))
            .select(qms_waste_types::id);
        q = q.filter(qms_waste_records::waste_type_id.eq_any(type_ids));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        q = q.filter(
            qms_waste_records::record_number
                .ilike(pattern.clone())
                .or(qms_waste_records::location.ilike(pattern.clone()))
                .or(qms_waste_records::generated_by.ilike(pattern)),
        );
    }
    let records: Vec<WasteRecord> = q
        .order((qms_waste_records::generated_date.desc(), qms_waste_records::id.desc()))
        .select(WasteRecord::as_select())
        .load(conn)
        .await?;
    let types = types_by_id(conn, &records).await?;

    Ok(records
        .into_iter()
        .map(|record| WasteRecordView {
            waste_type: types.get(&record.waste_type_id).cloned(),
            logs: Vec::new(),
            record,
        })
        .collect())
}

pub async fn find_record(conn: &mut AsyncPgConnection, record_id: i64) -> anyhow::Result<WasteRecord> {
    qms_waste_records::table
        .find(record_id)
        .select(WasteRecord::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(record_not_found)
}

/// A record with its waste type and trail, newest entry first.
pub async fn get_record(conn: &mut AsyncPgConnection, record_id: i64) -> anyhow::Result<WasteRecordView> {
    let record = find_record(conn, record_id).await?;
    let waste_type = qms_waste_types::table
        .find(record.waste_type_id)
        .select(WasteType::as_select())
        .first(conn)
        .await
        .optional()?;
    let logs: Vec<WasteRecordLog> = qms_waste_record_logs::table
        .filter(qms_waste_record_logs::waste_record_id.eq(record_id))
        .order((qms_waste_record_logs::logged_at.desc(), qms_waste_record_logs::id.desc()))
        .select(WasteRecordLog::as_select())
        .load(conn)
        .await?;
    Ok(WasteRecordView {
        record,
        waste_type,
        logs,
    })
}

/// Create a record with the next `WR-YYYY-NNNN` number and a CREATED log.
pub async fn create_record(
    conn: &mut AsyncPgConnection,
    req: CreateWasteRecordRequest,
    user_id: i64,
) -> anyhow::Result<WasteRecordView> {
    let type_exists: i64 = qms_waste_types::table
        .find(req.waste_type_id)
        .count()
        .get_result(conn)
        .await?;
    if type_exists == 0 {
        return Err(Rejection::Invalid("Waste type not found".to_string()).into());
    }

    let year = Utc::now().year();
    let record_id = conn
        .transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                let existing: Vec<String> = qms_waste_records::table
                    .filter(qms_waste_records::record_number.like(reference_pattern(RECORD_PREFIX, year)))
                    .select(qms_waste_records::record_number)
                    .load(conn)
                    .await?;
                let record_number = next_reference(RECORD_PREFIX, year, existing.iter().map(String::as_str));
                let new_record = req.into_new(record_number, user_id);
                let record_id: i64 = diesel::insert_into(qms_waste_records::table)
                    .values(&new_record)
                    .returning(qms_waste_records::id)
                    .get_result(conn)
                    .await?;
                diesel::insert_into(qms_waste_record_logs::table)
                    .values(&NewWasteRecordLog {
                        waste_record_id: record_id,
                        action: "CREATED".to_string(),
                        performed_by: Some(user_id),
                        comments: Some("Waste record created".to_string()),
                    })
                    .execute(conn)
                    .await?;
                Ok(record_id)
            }
            .scope_boxed()
        })
        .await?;

    crate::metrics::record_created("waste_record");
    tracing::info!(waste_record_id = record_id, user_id, "Waste record created");
    get_record(conn, record_id).await
}

/// Apply a partial update; a status change is written to the trail.
pub async fn update_record(
    conn: &mut AsyncPgConnection,
    record_id: i64,
    req: UpdateWasteRecordRequest,
    user_id: i64,
) -> anyhow::Result<WasteRecordView> {
    let current = find_record(conn, record_id).await?;
    let new_status = req.status.filter(|s| s.as_str() != current.status);
    let changes = req.into_changes(user_id);

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        async move {
            diesel::update(qms_waste_records::table.find(record_id))
                .set(&changes)
                .execute(conn)
                .await?;
            if let Some(status) = new_status {
                diesel::insert_into(qms_waste_record_logs::table)
                    .values(&NewWasteRecordLog {
                        waste_record_id: record_id,
                        action: status.as_str().to_string(),
                        performed_by: Some(user_id),
                        comments: Some(format!("Status changed from {} to {}", current.status, status)),
                    })
                    .execute(conn)
                    .await?;
            }
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    if let Some(status) = new_status {
        crate::metrics::status_changed("waste_record", status.as_str());
        tracing::info!(waste_record_id = record_id, status = %status, "Waste record status changed");
    }
    get_record(conn, record_id).await
}

pub async fn delete_record(conn: &mut AsyncPgConnection, record_id: i64) -> anyhow::Result<()> {
    let deleted = diesel::delete(qms_waste_records::table.find(record_id))
        .execute(conn)
        .await?;
    if deleted == 0 {
        return Err(record_not_found());
    }
    tracing::info!(waste_record_id = record_id, "Waste record deleted");
    Ok(())
}

// ── Facilities and transporters ──

pub async fn list_facilities(
    conn: &mut AsyncPgConnection,
    query: &FacilityQuery,
) -> anyhow::Result<Vec<WasteFacility>> {
    let mut q = qms_waste_facilities::table.into_boxed();
    if let Some(kind) = query.facility_type {
        q = q.filter(qms_waste_facilities::facility_type.eq(kind.as_str()));
    }
    if let Some(active) = query.is_active {
        q = q.filter(qms_waste_facilities::active.eq(active));
    }
    let results = q
        .order(qms_waste_facilities::name.asc())
        .select(WasteFacility::as_select())
        .load(conn)
        .await?;
    Ok(results)
}

pub async fn create_facility(
    conn: &mut AsyncPgConnection,
    new_facility: NewWasteFacility,
) -> anyhow::Result<WasteFacility> {
    let result: WasteFacility = diesel::insert_into(qms_waste_facilities::table)
        .values(&new_facility)
        .returning(WasteFacility::as_returning())
        .get_result(conn)
        .await?;
    crate::metrics::record_created("waste_facility");
    tracing::info!(facility_id = result.id, name = %result.name, "Waste facility created");
    Ok(result)
}

pub async fn list_transporters(
    conn: &mut AsyncPgConnection,
    query: &TransporterQuery,
) -> anyhow::Result<Vec<WasteTransporter>> {
    let mut q = qms_waste_transporters::table.into_boxed();
    if let Some(active) = query.is_active {
        q = q.filter(qms_waste_transporters::active.eq(active));
    }
    let results = q
        .order(qms_waste_transporters::name.asc())
        .select(WasteTransporter::as_select())
        .load(conn)
        .await?;
    Ok(results)
}

pub async fn create_transporter(
    conn: &mut AsyncPgConnection,
    new_transporter: NewWasteTransporter,
) -> anyhow::Result<WasteTransporter> {
    let result: WasteTransporter = diesel::insert_into(qms_waste_transporters::table)
        .values(&new_transporter)
        .returning(WasteTransporter::as_returning())
        .get_result(conn)
        .await?;
    crate::metrics::record_created("waste_transporter");
    tracing::info!(transporter_id = result.id, name = %result.name, "Waste transporter created");
    Ok(result)
}

// ── Stats ──

#[derive(Debug, QueryableByName)]
struct Totals {
    #[diesel(sql_type = BigInt)]
    total_records: i64,
    #[diesel(sql_type = Double)]
    total_quantity: f64,
    #[diesel(sql_type = Double)]
    total_cost: f64,
    #[diesel(sql_type = BigInt)]
    pending_disposal: i64,
    #[diesel(sql_type = BigInt)]
    disposed_this_month: i64,
}

#[derive(Debug, QueryableByName)]
struct CategoryRow {
    #[diesel(sql_type = Text)]
    category: String,
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// Totals over all records; "this month" is the current calendar month in UTC.
pub async fn stats(conn: &mut AsyncPgConnection) -> anyhow::Result<WasteStats> {
    let now = Utc::now();
    let month_start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);

    let totals: Totals = diesel::sql_query(
        "SELECT \
            COUNT(*) AS total_records, \
            COALESCE(SUM(quantity), 0)::float8 AS total_quantity, \
            COALESCE(SUM(cost), 0)::float8 AS total_cost, \
            COUNT(*) FILTER (WHERE status <> $1) AS pending_disposal, \
            COUNT(*) FILTER (WHERE status = $1 AND disposal_date >= $2) AS disposed_this_month \
         FROM qms_waste_records",
    )
    .bind::<Text, _>(WasteStatus::Disposed.as_str())
    .bind::<diesel::sql_types::Timestamptz, _>(month_start)
    .get_result(conn)
    .await?;

    let by_category: Vec<CategoryRow> = diesel::sql_query(
        "SELECT t.category AS category, COUNT(*) AS count \
         FROM qms_waste_records r \
         JOIN qms_waste_types t ON t.id = r.waste_type_id \
         GROUP BY t.category \
         ORDER BY count DESC, t.category",
    )
    .load(conn)
    .await?;

    Ok(WasteStats {
        total_records: totals.total_records,
        total_quantity: totals.total_quantity,
        total_cost: totals.total_cost,
        pending_disposal: totals.pending_disposal,
        disposed_this_month: totals.disposed_this_month,
        by_category: by_category
            .into_iter()
            .map(|row| CategoryCount {
                category: row.category,
                count: row.count,
            })
            .collect(),
    })
}
