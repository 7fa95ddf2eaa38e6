//! Red/Amber/Green status derivation for due-dated records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rag {
    Green,
    Amber,
    Red,
}

impl Rag {
    pub fn as_str(self) -> &'static str {
        match self {
            Rag::Green => "green",
            Rag::Amber => "amber",
            Rag::Red => "red",
        }
    }

    /// Human label shown next to the badge.
    pub fn label(self) -> &'static str {
        match self {
            Rag::Green => "OK",
            Rag::Amber => "Due Soon",
            Rag::Red => "Overdue",
        }
    }
}

/// Day thresholds below which a due date turns amber or red.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RagThresholds {
    pub amber_days: i64,
    pub red_days: i64,
}

impl Default for RagThresholds {
    fn default() -> Self {
        Self {
            amber_days: 30,
            red_days: 0,
        }
    }
}

impl RagThresholds {
    pub fn classify(&self, days_until: i64) -> Rag {
        if days_until < self.red_days {
            Rag::Red
        } else if days_until < self.amber_days {
            Rag::Amber
        } else {
            Rag::Green
        }
    }
}

/// Whole days until `due`, rounded up; negative once overdue.
pub fn days_until(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let secs = (due - now).num_seconds();
    secs.div_euclid(86_400) + i64::from(secs.rem_euclid(86_400) != 0)
}

pub fn training_rag(
    status: &str,
    due_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    thresholds: RagThresholds,
) -> Rag {
    match (status, due_date) {
        ("EXPIRED", _) => Rag::Red,
        ("NOT_STARTED" | "IN_PROGRESS" | "COMPLETE", Some(due)) => {
            thresholds.classify(days_until(due, now))
        }
        _ => Rag::Green,
    }
}

pub fn document_rag(next_review: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Rag {
    match next_review {
        None => Rag::Green,
        Some(due) => RagThresholds::default().classify(days_until(due, now)),
    }
}

pub fn calibration_rag(
    due_date: DateTime<Utc>,
    performed_on: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Rag {
    if performed_on.is_some() {
        return Rag::Green;
    }
    RagThresholds::default().classify(days_until(due_date, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2025-03-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn days_until_rounds_up() {
        let now = now();
        assert_eq!(days_until(now, now), 0);
        assert_eq!(days_until(now + Duration::hours(1), now), 1);
        assert_eq!(days_until(now + Duration::days(2), now), 2);
        assert_eq!(days_until(now - Duration::hours(1), now), 0);
        assert_eq!(days_until(now - Duration::hours(25), now), -1);
    }

    #[test]
    fn training_expired_is_red_regardless_of_due() {
        let t = RagThresholds::default();
        assert_eq!(training_rag("EXPIRED", None, now(), t), Rag::Red);
        assert_eq!(
            training_rag("EXPIRED", Some(now() + Duration::days(300)), now(), t),
            Rag::Red
        );
    }

    #[test]
    fn training_due_dates_are_banded() {
        let t = RagThresholds::default();
        let now = now();
        assert_eq!(
            training_rag("NOT_STARTED", Some(now - Duration::days(3)), now, t),
            Rag::Red
        );
        assert_eq!(
            training_rag("IN_PROGRESS", Some(now + Duration::days(10)), now, t),
            Rag::Amber
        );
        assert_eq!(
            training_rag("IN_PROGRESS", Some(now + Duration::days(45)), now, t),
            Rag::Green
        );
        assert_eq!(training_rag("NOT_STARTED", None, now, t), Rag::Green);
        assert_eq!(training_rag("COMPLETE", None, now, t), Rag::Green);
        assert_eq!(
            training_rag("COMPLETE", Some(now + Duration::days(5)), now, t),
            Rag::Amber
        );
        assert_eq!(training_rag("SOMETHING_ELSE", Some(now - Duration::days(5)), now, t), Rag::Green);
    }

    #[test]
    fn custom_thresholds_apply() {
        let t = RagThresholds {
            amber_days: 7,
            red_days: 2,
        };
        let now = now();
        assert_eq!(training_rag("IN_PROGRESS", Some(now + Duration::days(1)), now, t), Rag::Red);
        assert_eq!(training_rag("IN_PROGRESS", Some(now + Duration::days(5)), now, t), Rag::Amber);
        assert_eq!(training_rag("IN_PROGRESS", Some(now + Duration::days(8)), now, t), Rag::Green);
    }

    #[test]
    fn document_and_calibration_rag() {
        let now = now();
        assert_eq!(document_rag(None, now), Rag::Green);
        assert_eq!(document_rag(Some(now - Duration::days(1)), now), Rag::Red);
        assert_eq!(document_rag(Some(now + Duration::days(29)), now), Rag::Amber);
        assert_eq!(document_rag(Some(now + Duration::days(31)), now), Rag::Green);

        assert_eq!(calibration_rag(now - Duration::days(10), Some(now), now), Rag::Green);
        assert_eq!(calibration_rag(now - Duration::days(10), None, now), Rag::Red);
    }

    #[test]
    fn labels() {
        assert_eq!(Rag::Green.label(), "OK");
        assert_eq!(Rag::Amber.label(), "Due Soon");
        assert_eq!(Rag::Red.label(), "Overdue");
    }
}
