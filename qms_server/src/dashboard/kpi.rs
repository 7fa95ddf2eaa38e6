//! Dashboard overview: headline counts, KPI rates and alerts.

use chrono::{DateTime, Utc};
use diesel::sql_types::BigInt;
use diesel::QueryableByName;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

/// Headline counts across the feature areas.
#[derive(Debug, Clone, Default, Serialize, QueryableByName)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    #[diesel(sql_type = BigInt)]
    pub total_risks: i64,
    /// Risks scoring 16 or more.
    #[diesel(sql_type = BigInt)]
    pub high_risks: i64,
    #[diesel(sql_type = BigInt)]
    pub total_nonconformances: i64,
    #[diesel(sql_type = BigInt)]
    pub open_nonconformances: i64,
    #[diesel(sql_type = BigInt)]
    pub total_trainings: i64,
    #[diesel(sql_type = BigInt)]
    pub complete_trainings: i64,
    #[diesel(sql_type = BigInt)]
    pub overdue_trainings: i64,
    #[diesel(sql_type = BigInt)]
    pub total_incidents: i64,
    #[diesel(sql_type = BigInt)]
    pub open_incidents: i64,
    #[diesel(sql_type = BigInt)]
    pub total_audits: i64,
    #[diesel(sql_type = BigInt)]
    pub pending_waste: i64,
    #[diesel(sql_type = BigInt)]
    pub total_contracts: i64,
    #[diesel(sql_type = BigInt)]
    pub approved_contracts: i64,
}

/// Integer percentages; 0 when there is nothing to measure.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub risk_mitigation_rate: i64,
    pub nc_resolution_rate: i64,
    pub training_compliance_rate: i64,
    pub contract_approval_rate: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Alert {
    pub title: String,
    pub priority: &'static str,
    pub status: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub stats: OverviewStats,
    pub kpis: Kpis,
    pub alerts: Vec<Alert>,
    pub last_updated: DateTime<Utc>,
    pub generated_by: String,
}

fn percent(part: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (part as f64 * 100.0 / total as f64).round() as i64
}

impl Kpis {
    pub fn from_stats(s: &OverviewStats) -> Self {
        Self {
            risk_mitigation_rate: percent(s.total_risks - s.high_risks, s.total_risks),
            nc_resolution_rate: percent(
                s.total_nonconformances - s.open_nonconformances,
                s.total_nonconformances,
            ),
            training_compliance_rate: percent(s.complete_trainings, s.total_trainings),
            contract_approval_rate: percent(s.approved_contracts, s.total_contracts),
        }
    }
}

/// One alert per non-zero condition, most urgent first.
pub fn alerts(s: &OverviewStats) -> Vec<Alert> {
    let candidates = [
        (
            s.overdue_trainings,
            "Overdue Trainings",
            "high",
            "urgent",
            "Training records are past due and competence cannot be demonstrated",
        ),
        (
            s.high_risks,
            "High Risk Items",
            "high",
            "active",
            "High-risk assessments need immediate review and mitigation",
        ),
        (
            s.open_incidents,
            "Open Incidents",
            "high",
            "active",
            "Incidents are awaiting investigation or closure",
        ),
        (
            s.open_nonconformances,
            "Open Non-Conformances",
            "medium",
            "active",
            "Non-conformances require resolution",
        ),
        (
            s.pending_waste,
            "Waste Records Pending Disposal",
            "low",
            "active",
            "Stored or in-transit waste has not been disposed of yet",
        ),
    ];
    candidates
        .into_iter()
        .filter(|(count, ..)| *count > 0)
        .map(|(count, title, priority, status, description)| Alert {
            title: format!("{count} {title}"),
            priority,
            status,
            description,
        })
        .collect()
}

pub async fn query_stats(conn: &mut AsyncPgConnection) -> anyhow::Result<OverviewStats> {
    let result = diesel::sql_query(
        "SELECT \
            (SELECT COUNT(*) FROM qms_risks) AS total_risks, \
            (SELECT COUNT(*) FROM qms_risks WHERE likelihood * severity >= 16) AS high_risks, \
            (SELECT COUNT(*) FROM qms_nonconformances) AS total_nonconformances, \
            (SELECT COUNT(*) FROM qms_nonconformances WHERE status <> 'CLOSED') AS open_nonconformances, \
            (SELECT COUNT(*) FROM qms_training_records) AS total_trainings, \
            (SELECT COUNT(*) FROM qms_training_records WHERE status = 'COMPLETE') AS complete_trainings, \
            (SELECT COUNT(*) FROM qms_training_records \
               WHERE status = 'EXPIRED' OR (status <> 'COMPLETE' AND due_date < NOW())) AS overdue_trainings, \
            (SELECT COUNT(*) FROM qms_incidents) AS total_incidents, \
            (SELECT COUNT(*) FROM qms_incidents WHERE status <> 'CLOSED') AS open_incidents, \
            (SELECT COUNT(*) FROM qms_audits) AS total_audits, \
            (SELECT COUNT(*) FROM qms_waste_records WHERE status <> 'DISPOSED') AS pending_waste, \
            (SELECT COUNT(*) FROM qms_contract_reviews) AS total_contracts, \
            (SELECT COUNT(*) FROM qms_contract_reviews WHERE status = 'APPROVED') AS approved_contracts",
    )
    .get_result(conn)
    .await?;
    Ok(result)
}

pub async fn overview(
    conn: &mut AsyncPgConnection,
    organization: &str,
) -> anyhow::Result<DashboardOverview> {
    let stats = query_stats(conn).await?;
    Ok(DashboardOverview {
        kpis: Kpis::from_stats(&stats),
        alerts: alerts(&stats),
        stats,
        last_updated: Utc::now(),
        generated_by: format!("{organization} Dashboard API"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rates_are_rounded_percentages() {
        let stats = OverviewStats {
            total_risks: 3,
            high_risks: 1,
            total_nonconformances: 8,
            open_nonconformances: 2,
            total_trainings: 6,
            complete_trainings: 5,
            total_contracts: 0,
            ..OverviewStats::default()
        };
        assert_eq!(
            Kpis::from_stats(&stats),
            Kpis {
                risk_mitigation_rate: 67,
                nc_resolution_rate: 75,
                training_compliance_rate: 83,
                contract_approval_rate: 0,
            }
        );
    }

    #[test]
    fn only_non_zero_conditions_alert() {
        let stats = OverviewStats {
            high_risks: 2,
            open_nonconformances: 1,
            ..OverviewStats::default()
        };
        let alerts = alerts(&stats);
        let titles: Vec<&str> = alerts.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["2 High Risk Items", "1 Open Non-Conformances"]);
        assert_eq!(alerts[1].priority, "medium");
    }

    #[test]
    fn empty_dataset_has_no_alerts() {
        let stats = OverviewStats::default();
        assert!(alerts(&stats).is_empty());
        assert_eq!(Kpis::from_stats(&stats).risk_mitigation_rate, 0);
    }
}
