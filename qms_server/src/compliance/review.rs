//! Management review rules: clause templates per standard and the
//! conditions a review must meet before it can be completed.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Deserialize;

use crate::models::vocab::{ReviewInputStatus, ReviewOutputType, ReviewStandard};

const TEMPLATES_JSON: &str = include_str!("../../data/review_templates.json");

/// Discussion notes shorter than this block completion.
pub const MIN_DISCUSSION_NOTES: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputTemplate {
    pub clause_ref: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputTemplate {
    pub clause_ref: String,
    pub title: String,
    pub decision: String,
    pub output_type: ReviewOutputType,
}

/// Clause 9.3.2 inputs and 9.3.3 outputs for one standard.
#[derive(Debug, Deserialize)]
pub struct StandardTemplate {
    pub inputs: Vec<InputTemplate>,
    pub outputs: Vec<OutputTemplate>,
}

static TEMPLATES: LazyLock<HashMap<ReviewStandard, StandardTemplate>> = LazyLock::new(|| {
    serde_json::from_str(TEMPLATES_JSON).expect("embedded review templates are valid")
});

pub fn template(standard: ReviewStandard) -> Option<&'static StandardTemplate> {
    TEMPLATES.get(&standard)
}

/// What completion checks need to know about one attendee.
#[derive(Debug, Clone, Copy)]
pub struct AttendeeState<'a> {
    pub name: &'a str,
    pub required: bool,
    pub present: bool,
    pub signed_off: bool,
}

/// Reasons a review cannot move to COMPLETED yet; empty when it can.
///
/// Every input must be settled, every covered standard needs at least one
/// output, the minutes need [`MIN_DISCUSSION_NOTES`] characters and every
/// required attendee must be present and signed off.
pub fn completion_blockers<'a>(
    standards: &[String],
    input_statuses: impl IntoIterator<Item = &'a str>,
    output_standards: &[&str],
    discussion_notes: Option<&str>,
    attendees: &[AttendeeState<'_>],
) -> Vec<String> {
    let mut blockers = Vec::new();

    let pending = input_statuses
        .into_iter()
        .filter(|s| *s == ReviewInputStatus::Pending.as_str())
        .count();
    if pending > 0 {
        blockers.push(format!("{pending} input items still have PENDING status"));
    }

    for standard in standards {
        if !output_standards.contains(&standard.as_str()) {
            blockers.push(format!("No outputs/decisions found for {standard}"));
        }
    }

    if discussion_notes.map_or(true, |n| n.chars().count() < MIN_DISCUSSION_NOTES) {
        blockers.push(format!(
            "Discussion notes must be at least {MIN_DISCUSSION_NOTES} characters long"
        ));
    }

    for attendee in attendees.iter().filter(|a| a.required) {
        if !attendee.present {
            blockers.push(format!("Required attendee {} is not marked as present", attendee.name));
        }
        if !attendee.signed_off {
            blockers.push(format!("Required attendee {} has not signed off", attendee.name));
        }
    }

    blockers
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn notes(len: usize) -> String {
        "x".repeat(len)
    }

    #[test]
    fn templates_cover_every_standard() {
        for standard in ReviewStandard::ALL {
            let t = template(*standard).unwrap();
            assert!(!t.inputs.is_empty(), "{standard}");
            assert!(!t.outputs.is_empty(), "{standard}");
            assert!(t.inputs.iter().all(|i| i.clause_ref.starts_with("9.3.2")), "{standard}");
            assert!(t.outputs.iter().all(|o| o.clause_ref.starts_with("9.3.3")), "{standard}");
        }
        assert_eq!(template(ReviewStandard::Iso9001).unwrap().inputs.len(), 11);
        assert_eq!(template(ReviewStandard::Iso14001).unwrap().outputs.len(), 6);
    }

    #[test]
    fn ready_review_has_no_blockers() {
        let standards = vec!["ISO9001".to_string()];
        let minutes = notes(200);
        let attendees = [AttendeeState {
            name: "Plant Manager",
            required: true,
            present: true,
            signed_off: true,
        }];
        let blockers = completion_blockers(
            &standards,
            ["PROVIDED", "NOT_APPLICABLE"],
            &["ISO9001"],
            Some(minutes.as_str()),
            &attendees,
        );
        assert!(blockers.is_empty(), "{blockers:?}");
    }

    #[test]
    fn every_blocker_is_reported() {
        let standards = vec!["ISO9001".to_string(), "ISO45001".to_string()];
        let minutes = notes(199);
        let attendees = [
            AttendeeState {
                name: "Dana",
                required: true,
                present: false,
                signed_off: false,
            },
            AttendeeState {
                name: "Guest",
                required: false,
                present: false,
                signed_off: false,
            },
        ];
        let blockers = completion_blockers(
            &standards,
            ["PENDING", "PROVIDED", "PENDING"],
            &["ISO9001"],
            Some(minutes.as_str()),
            &attendees,
        );
        assert_eq!(
            blockers,
            vec![
                "2 input items still have PENDING status",
                "No outputs/decisions found for ISO45001",
                "Discussion notes must be at least 200 characters long",
                "Required attendee Dana is not marked as present",
                "Required attendee Dana has not signed off",
            ]
        );
    }

    #[test]
    fn missing_notes_block_completion() {
        let blockers = completion_blockers(&[], [], &[], None, &[]);
        assert_eq!(blockers, vec!["Discussion notes must be at least 200 characters long"]);
    }

    #[test]
    fn notes_length_counts_characters() {
        let accented = "é".repeat(200);
        assert!(completion_blockers(&[], [], &[], Some(accented.as_str()), &[]).is_empty());
    }
}
