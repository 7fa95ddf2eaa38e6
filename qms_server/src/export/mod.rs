//! Register exports: per-entity CSV and the auditor evidence pack.

pub mod csv;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

pub const STANDARDS: &[&str] = &["ISO 9001:2015", "ISO 14001:2015", "ISO 45001:2018"];

/// Registers that can be exported as CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportEntity {
    Risks,
    Incidents,
    Audits,
    Nonconformance,
    Training,
    Waste,
    Contracts,
}

impl ExportEntity {
    pub const ALL: &'static [ExportEntity] = &[
        Self::Risks,
        Self::Incidents,
        Self::Audits,
        Self::Nonconformance,
        Self::Training,
        Self::Waste,
        Self::Contracts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Risks => "risks",
            Self::Incidents => "incidents",
            Self::Audits => "audits",
            Self::Nonconformance => "nonconformance",
            Self::Training => "training",
            Self::Waste => "waste",
            Self::Contracts => "contracts",
        }
    }

    /// `risks-2025-06-01.csv`
    pub fn filename(self, now: DateTime<Utc>) -> String {
        format!("{}-{}.csv", self.as_str(), now.format("%Y-%m-%d"))
    }
}

impl FromStr for ExportEntity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("Unsupported export entity '{s}'"))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditorPack {
    pub export_date: DateTime<Utc>,
    pub organization: String,
    pub standards: Vec<&'static str>,
    pub documents: Vec<Value>,
    pub risks: Vec<Value>,
    pub training: Vec<Value>,
    pub incidents: Vec<Value>,
    pub actions: Vec<Value>,
    pub audits: Vec<Value>,
}

impl AuditorPack {
    /// `auditor-pack-2025-06-01.json`
    pub fn filename(&self) -> String {
        format!("auditor-pack-{}.json", self.export_date.format("%Y-%m-%d"))
    }
}

/// Serialize each item, failing on the first error.
pub fn to_rows<T: Serialize>(items: &[T]) -> serde_json::Result<Vec<Value>> {
    items.iter().map(serde_json::to_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_names_round_trip() {
        for entity in ExportEntity::ALL {
            assert_eq!(entity.as_str().parse::<ExportEntity>(), Ok(*entity));
        }
        assert!("users".parse::<ExportEntity>().is_err());
        assert!("Risks".parse::<ExportEntity>().is_err());
    }

    #[test]
    fn filenames_carry_the_date() {
        let now: DateTime<Utc> = "2025-06-01T12:00:00Z".parse().unwrap();
        assert_eq!(ExportEntity::Waste.filename(now), "waste-2025-06-01.csv");
        let pack = AuditorPack {
            export_date: now,
            organization: "Acme".into(),
            standards: STANDARDS.to_vec(),
            documents: vec![],
            risks: vec![],
            training: vec![],
            incidents: vec![],
            actions: vec![],
            audits: vec![],
        };
        assert_eq!(pack.filename(), "auditor-pack-2025-06-01.json");
        let json = serde_json::to_value(&pack).unwrap();
        assert_eq!(json["standards"][2], "ISO 45001:2018");
        assert!(json.get("exportDate").is_some());
    }
}
