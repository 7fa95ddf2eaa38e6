//! Lifecycle events of an improvement case.

use serde::{Deserialize, Serialize};

use crate::models::nonconformance::Nonconformance;
use crate::models::vocab::NcStatus;

/// Events that can happen to a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NcEvent {
    /// Case was raised, possibly with a containment action.
    CaseRaised {
        ref_number: String,
        case_type: String,
        severity: String,
        containment: bool,
    },
    /// The last open action was completed.
    ActionsCompleted,
    /// Case was closed after verification.
    CaseClosed { closed_by: i64 },
}

impl NcEvent {
    pub fn raised(record: &Nonconformance, containment: bool) -> Self {
        NcEvent::CaseRaised {
            ref_number: record.ref_number.clone(),
            case_type: record.case_type.clone(),
            severity: record.severity.clone(),
            containment,
        }
    }

    /// Status a case in `current` moves to, or `None` if the event
    /// leaves it where it is.
    pub fn next_status(&self, current: NcStatus) -> Option<NcStatus> {
        match (self, current) {
            (NcEvent::CaseRaised { .. }, _) => Some(NcStatus::Open),
            (NcEvent::ActionsCompleted, NcStatus::Closed) => None,
            (NcEvent::ActionsCompleted, _) => Some(NcStatus::PendingVerification),
            (NcEvent::CaseClosed { .. }, NcStatus::Closed) => None,
            (NcEvent::CaseClosed { .. }, _) => Some(NcStatus::Closed),
        }
    }
}

/// Emit an event on the log stream.
pub fn publish(nc_id: i64, event: &NcEvent) {
    match serde_json::to_string(event) {
        Ok(payload) => tracing::info!(nc_id, event = %payload, "Nonconformance event"),
        Err(e) => tracing::warn!(nc_id, error = %e, "Failed to encode nonconformance event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_moves_any_unclosed_case_to_verification() {
        for status in [NcStatus::Open, NcStatus::InProgress, NcStatus::PendingVerification] {
            assert_eq!(
                NcEvent::ActionsCompleted.next_status(status),
                Some(NcStatus::PendingVerification),
                "{status}"
            );
        }
        assert_eq!(NcEvent::ActionsCompleted.next_status(NcStatus::Closed), None);
    }

    #[test]
    fn closing_twice_is_a_no_op() {
        let event = NcEvent::CaseClosed { closed_by: 1 };
        assert_eq!(event.next_status(NcStatus::PendingVerification), Some(NcStatus::Closed));
        assert_eq!(event.next_status(NcStatus::Closed), None);
    }

    #[test]
    fn events_are_tagged() {
        let json = serde_json::to_value(NcEvent::CaseClosed { closed_by: 7 }).unwrap();
        assert_eq!(json["type"], "CaseClosed");
        assert_eq!(json["closed_by"], 7);
    }
}
