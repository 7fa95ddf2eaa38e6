//! OH&S hazard register, incident log and frequency-rate metrics.

use chrono::{Datelike, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::compliance::ohs;
use crate::compliance::reference::{next_reference, reference_pattern};
use crate::models::ohs::{CreateIncidentRequest, Hazard, HazardView, Incident, NewHazard};
use crate::schema::{qms_hazards, qms_incidents};

pub const INCIDENT_PREFIX: &str = "INC";

// ── Hazards ──

/// All hazards, most recently updated first.
pub async fn list_hazards(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<HazardView>> {
    let hazards: Vec<Hazard> = qms_hazards::table
        .order((qms_hazards::write_date.desc(), qms_hazards::id.desc()))
        .select(Hazard::as_select())
        .load(conn)
        .await?;
    Ok(hazards.into_iter().map(HazardView::from).collect())
}

pub async fn create_hazard(
    conn: &mut AsyncPgConnection,
    new_hazard: NewHazard,
) -> anyhow::Result<HazardView> {
    let hazard: Hazard = diesel::insert_into(qms_hazards::table)
        .values(&new_hazard)
        .returning(Hazard::as_returning())
        .get_result(conn)
        .await?;
    crate::metrics::record_created("hazard");
    tracing::info!(hazard_id = hazard.id, title = %hazard.title, "Hazard registered");
    Ok(hazard.into())
}

// ── Incidents ──

/// All incidents, most recent occurrence first.
pub async fn list_incidents(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<Incident>> {
    let incidents = qms_incidents::table
        .order((qms_incidents::occurred_at.desc(), qms_incidents::id.desc()))
        .select(Incident::as_select())
        .load(conn)
        .await?;
    Ok(incidents)
}

/// Record an incident; without a reference it gets the next `INC-YYYY-NNNN`.
pub async fn create_incident(
    conn: &mut AsyncPgConnection,
    req: CreateIncidentRequest,
    user_id: i64,
) -> anyhow::Result<Incident> {
    let year = Utc::now().year();
    let incident: Incident = conn
        .transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                let existing: Vec<Option<String>> = qms_incidents::table
                    .filter(qms_incidents::ref_number.like(reference_pattern(INCIDENT_PREFIX, year)))
                    .select(qms_incidents::ref_number)
                    .load(conn)
                    .await?;
                let ref_number =
                    next_reference(INCIDENT_PREFIX, year, existing.iter().flatten().map(String::as_str));
                let new_incident = req.into_new(ref_number, user_id);
                let incident = diesel::insert_into(qms_incidents::table)
                    .values(&new_incident)
                    .returning(Incident::as_returning())
                    .get_result(conn)
                    .await?;
                Ok(incident)
            }
            .scope_boxed()
        })
        .await?;

    crate::metrics::record_created("incident");
    tracing::info!(
        incident_id = incident.id,
        kind = %incident.incident_type,
        severity = %incident.severity_type,
        "Incident recorded"
    );
    Ok(incident)
}

// ── Metrics ──

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    /// Exposure hours; defaults to the hours recorded on incidents.
    pub hours: Option<f64>,
}

/// The incident columns the frequency rates need.
#[derive(Debug, Clone, Queryable)]
pub struct IncidentFacts {
    pub incident_type: String,
    pub severity_type: String,
    pub lost_time_days: Option<i32>,
    pub hours_worked: Option<f64>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OhsMetrics {
    pub trir: f64,
    pub ltifr: f64,
    pub dart: f64,
    pub near_miss_ratio: f64,
    pub hours_worked: f64,
    pub total_incidents: u64,
    pub recordable: u64,
    pub lost_time_injuries: u64,
    pub dart_cases: u64,
    pub near_misses: u64,
}

impl OhsMetrics {
    pub fn compute(facts: &[IncidentFacts], hours: Option<f64>) -> Self {
        let hours = hours.unwrap_or_else(|| facts.iter().filter_map(|f| f.hours_worked).sum());
        let recordable = facts
            .iter()
            .filter(|f| ohs::is_recordable(&f.severity_type))
            .count() as u64;
        let lost_time_injuries = facts
            .iter()
            .filter(|f| ohs::is_lost_time(&f.severity_type))
            .count() as u64;
        let dart_cases = facts
            .iter()
            .filter(|f| f.lost_time_days.is_some_and(|d| d > 0))
            .count() as u64;
        let near_misses = facts
            .iter()
            .filter(|f| f.incident_type == "NEAR_MISS")
            .count() as u64;
        let incidents = facts.len() as u64 - near_misses;

        Self {
            trir: ohs::trir(recordable, hours),
            ltifr: ohs::ltifr(lost_time_injuries, hours),
            dart: ohs::dart(dart_cases, hours),
            near_miss_ratio: ohs::near_miss_ratio(near_misses, incidents),
            hours_worked: hours,
            total_incidents: facts.len() as u64,
            recordable,
            lost_time_injuries,
            dart_cases,
            near_misses,
        }
    }
}

pub async fn metrics(conn: &mut AsyncPgConnection, hours: Option<f64>) -> anyhow::Result<OhsMetrics> {
    let facts: Vec<IncidentFacts> = qms_incidents::table
        .filter(qms_incidents::active.eq(true))
        .select((
            qms_incidents::incident_type,
            qms_incidents::severity_type,
            qms_incidents::lost_time_days,
            qms_incidents::hours_worked,
        ))
        .load(conn)
        .await?;
    Ok(OhsMetrics::compute(&facts, hours))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(kind: &str, severity: &str, days: Option<i32>, hours: Option<f64>) -> IncidentFacts {
        IncidentFacts {
            incident_type: kind.to_string(),
            severity_type: severity.to_string(),
            lost_time_days: days,
            hours_worked: hours,
        }
    }

    #[test]
    fn rates_from_recorded_hours() {
        let facts = vec![
            fact("INJURY", "MEDICAL_TREATMENT", None, Some(100_000.0)),
            fact("INJURY", "LOST_TIME", Some(3), Some(100_000.0)),
            fact("NEAR_MISS", "NONE", None, None),
            fact("NEAR_MISS", "NONE", None, None),
            fact("PROPERTY_DAMAGE", "FIRST_AID", None, None),
        ];
        let m = OhsMetrics::compute(&facts, None);
        assert_eq!(m.hours_worked, 200_000.0);
        assert_eq!(m.recordable, 2);
        assert_eq!(m.trir, 2.0);
        assert_eq!(m.lost_time_injuries, 1);
        assert_eq!(m.ltifr, 5.0);
        assert_eq!(m.dart_cases, 1);
        assert_eq!(m.dart, 1.0);
        assert_eq!(m.near_misses, 2);
        assert_eq!(m.near_miss_ratio, 0.67);
    }

    #[test]
    fn explicit_hours_override_and_zero_hours() {
        let facts = vec![fact("INJURY", "FATALITY", Some(0), Some(10.0))];
        let m = OhsMetrics::compute(&facts, Some(1_000_000.0));
        assert_eq!(m.ltifr, 1.0);
        assert_eq!(m.dart_cases, 0);

        let m = OhsMetrics::compute(&facts, Some(0.0));
        assert_eq!(m.trir, 0.0);
        assert_eq!(m.near_miss_ratio, 0.0);
    }
}
