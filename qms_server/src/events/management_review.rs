//! Lifecycle of a management review and the entries it writes to the
//! review's audit log.

use serde::Serialize;

use crate::models::vocab::ReviewStatus;

/// Whether a review in `from` may be saved with status `to`.
///
/// Saving with the current status is always allowed except that nothing
/// leaves CLOSED.
pub fn transition_allowed(from: ReviewStatus, to: ReviewStatus) -> bool {
    use ReviewStatus::*;
    matches!(
        (from, to),
        (Draft, Draft | Scheduled)
            | (Scheduled, Scheduled | InProgress | Draft)
            | (InProgress, InProgress | Completed)
            | (Completed, Closed | InProgress)
            | (Closed, Closed)
    )
}

/// Events recorded in a review's audit log.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ReviewEvent {
    Created,
    StatusChanged { from: ReviewStatus, to: ReviewStatus },
    Updated { details: String },
    SignedOff { attendee: String },
}

impl ReviewEvent {
    pub fn updated(details: impl Into<String>) -> Self {
        ReviewEvent::Updated {
            details: details.into(),
        }
    }

    /// Value stored in the log's `event` column.
    pub fn kind(&self) -> &'static str {
        match self {
            ReviewEvent::Created => "CREATED",
            ReviewEvent::StatusChanged { .. } => "STATUS_CHANGE",
            ReviewEvent::Updated { .. } => "UPDATED",
            ReviewEvent::SignedOff { .. } => "SIGN_OFF",
        }
    }

    pub fn details(&self) -> String {
        match self {
            ReviewEvent::Created => "Management review created".to_string(),
            ReviewEvent::StatusChanged { from, to } => format!("Status changed from {from} to {to}"),
            ReviewEvent::Updated { details } => details.clone(),
            ReviewEvent::SignedOff { attendee } => format!("Attendee {attendee} signed off"),
        }
    }
}

/// Emit an event on the log stream.
pub fn publish(review_id: i64, event: &ReviewEvent) {
    match serde_json::to_string(event) {
        Ok(payload) => tracing::info!(review_id, event = %payload, "Management review event"),
        Err(e) => tracing::warn!(review_id, error = %e, "Failed to encode management review event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReviewStatus::*;

    #[test]
    fn forward_path_is_allowed() {
        assert!(transition_allowed(Draft, Scheduled));
        assert!(transition_allowed(Scheduled, InProgress));
        assert!(transition_allowed(InProgress, Completed));
        assert!(transition_allowed(Completed, Closed));
    }

    #[test]
    fn shortcuts_and_reopening_closed_are_refused() {
        assert!(!transition_allowed(Draft, InProgress));
        assert!(!transition_allowed(Draft, Completed));
        assert!(!transition_allowed(Scheduled, Completed));
        assert!(!transition_allowed(InProgress, Draft));
        for to in ReviewStatus::ALL.iter().filter(|s| **s != Closed) {
            assert!(!transition_allowed(Closed, *to), "{to}");
        }
    }

    #[test]
    fn step_backs_are_allowed() {
        assert!(transition_allowed(Scheduled, Draft));
        assert!(transition_allowed(Completed, InProgress));
        for status in ReviewStatus::ALL {
            assert!(transition_allowed(*status, *status), "{status}");
        }
    }

    #[test]
    fn log_entries() {
        let change = ReviewEvent::StatusChanged {
            from: Scheduled,
            to: InProgress,
        };
        assert_eq!(change.kind(), "STATUS_CHANGE");
        assert_eq!(change.details(), "Status changed from SCHEDULED to IN_PROGRESS");
        let sign_off = ReviewEvent::SignedOff {
            attendee: "Dana".to_string(),
        };
        assert_eq!(sign_off.kind(), "SIGN_OFF");
        assert_eq!(sign_off.details(), "Attendee Dana signed off");
        assert_eq!(ReviewEvent::Created.details(), "Management review created");
    }
}
