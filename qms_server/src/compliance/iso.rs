//! ISO 9001 / 14001 / 45001 clause catalogues and reference parsing.
//!
//! References are written `{standard}:{clause}`, e.g. `45001:6.1.2`.

use serde::Serialize;

pub const ISO_9001_CLAUSES: &[(&str, &str)] = &[
    ("4", "Context of the Organization"),
    ("5", "Leadership"),
    ("5.2", "Policy"),
    ("5.3", "Organizational Roles"),
    ("6", "Planning"),
    ("6.1", "Actions to Address Risks and Opportunities"),
    ("7", "Support"),
    ("7.1", "Resources"),
    ("7.1.3", "Infrastructure"),
    ("7.1.4", "Environment for Operation"),
    ("7.1.5", "Monitoring and Measuring Resources"),
    ("7.2", "Competence"),
    ("7.5", "Documented Information"),
    ("8", "Operation"),
    ("8.1", "Operational Planning and Control"),
    ("8.2.1", "Customer Communication"),
    ("8.4", "Control of Externally Provided Processes"),
    ("8.5", "Production and Service Provision"),
    ("9", "Performance Evaluation"),
    ("9.1", "Monitoring, Measurement, Analysis and Evaluation"),
    ("9.2", "Internal Audit"),
    ("9.3", "Management Review"),
    ("10", "Improvement"),
    ("10.2", "Nonconformity and Corrective Action"),
];

pub const ISO_14001_CLAUSES: &[(&str, &str)] = &[
    ("4", "Context of the Organization"),
    ("5", "Leadership"),
    ("5.2", "Environmental Policy"),
    ("5.3", "Organizational Roles"),
    ("6", "Planning"),
    ("6.1", "Actions to Address Risks and Opportunities"),
    ("6.1.1", "General"),
    ("6.1.2", "Environmental Aspects"),
    ("6.1.3", "Compliance Obligations"),
    ("6.1.4", "Planning Action"),
    ("7", "Support"),
    ("7.5", "Documented Information"),
    ("8", "Operation"),
    ("8.1", "Operational Planning and Control"),
    ("9", "Performance Evaluation"),
    ("9.1", "Monitoring, Measurement, Analysis and Evaluation"),
    ("9.2", "Internal Audit"),
    ("10", "Improvement"),
    ("10.2", "Nonconformity and Corrective Action"),
];

pub const ISO_45001_CLAUSES: &[(&str, &str)] = &[
    ("4", "Context of the Organization"),
    ("5", "Leadership and Worker Participation"),
    ("5.1", "Leadership and Commitment"),
    ("5.2", "OH&S Policy"),
    ("5.3", "Organizational Roles"),
    ("5.4", "Consultation and Participation"),
    ("6", "Planning"),
    ("6.1", "Actions to Address Risks and Opportunities"),
    ("6.1.1", "General"),
    ("6.1.2", "Hazard Identification"),
    ("6.1.2.1", "Hazard Identification Process"),
    ("6.1.3", "Legal and Other Requirements"),
    ("6.2", "OH&S Objectives and Planning"),
    ("7", "Support"),
    ("7.2", "Competence"),
    ("7.3", "Awareness"),
    ("7.4", "Communication"),
    ("7.5", "Documented Information"),
    ("8", "Operation"),
    ("8.1", "Operational Planning and Control"),
    ("8.1.2", "Eliminating Hazards and Reducing OH&S Risks"),
    ("8.1.3", "Management of Change"),
    ("8.1.4", "Procurement"),
    ("8.2", "Emergency Preparedness and Response"),
    ("9", "Performance Evaluation"),
    ("9.1", "Monitoring, Measurement, Analysis and Evaluation"),
    ("9.1.2", "Evaluation of Compliance"),
    ("9.2", "Internal Audit"),
    ("9.3", "Management Review"),
    ("10", "Improvement"),
    ("10.1", "General"),
    ("10.2", "Incident, Nonconformity and Corrective Action"),
    ("10.3", "Continual Improvement"),
];

pub const STANDARDS: &[&str] = &["9001", "14001", "45001"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IsoClause {
    pub standard: String,
    pub clause: String,
    pub title: String,
}

fn catalogue(standard: &str) -> Option<&'static [(&'static str, &'static str)]> {
    match standard {
        "9001" => Some(ISO_9001_CLAUSES),
        "14001" => Some(ISO_14001_CLAUSES),
        "45001" => Some(ISO_45001_CLAUSES),
        _ => None,
    }
}

/// Parse `"9001:7.5"`. Unknown clauses keep the title `"Unknown"`.
pub fn parse_iso_clause(reference: &str) -> Option<IsoClause> {
    let (standard, clause) = reference.split_once(':')?;
    let clauses = catalogue(standard)?;
    if clause.is_empty() {
        return None;
    }
    let title = clauses
        .iter()
        .find(|(c, _)| *c == clause)
        .map(|(_, t)| *t)
        .unwrap_or("Unknown");
    Some(IsoClause {
        standard: standard.to_string(),
        clause: clause.to_string(),
        title: title.to_string(),
    })
}

/// Resolve a JSON array of references, dropping malformed ones.
pub fn iso_clauses(refs: &serde_json::Value) -> Vec<IsoClause> {
    let refs = match refs {
        serde_json::Value::String(s) => match serde_json::from_str(s) {
            Ok(v) => v,
            Err(_) => return Vec::new(),
        },
        other => other.clone(),
    };
    refs.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .filter_map(parse_iso_clause)
                .collect()
        })
        .unwrap_or_default()
}

/// True when `reference` names a known standard, whatever the clause.
pub fn is_valid_reference(reference: &str) -> bool {
    parse_iso_clause(reference).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_clause() {
        let clause = parse_iso_clause("9001:7.5").unwrap();
        assert_eq!(clause.standard, "9001");
        assert_eq!(clause.clause, "7.5");
        assert_eq!(clause.title, "Documented Information");
    }

    #[test]
    fn unknown_clause_keeps_reference() {
        let clause = parse_iso_clause("45001:99.9").unwrap();
        assert_eq!(clause.title, "Unknown");
    }

    #[test]
    fn malformed_references_are_rejected() {
        assert!(parse_iso_clause("9001").is_none());
        assert!(parse_iso_clause("27001:5.1").is_none());
        assert!(parse_iso_clause("9001:").is_none());
        assert!(parse_iso_clause("").is_none());
    }

    #[test]
    fn iso_clauses_filters_malformed_entries() {
        let refs = json!(["14001:6.1.2", "bogus", "45001:8.2", 42]);
        let clauses = iso_clauses(&refs);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].title, "Environmental Aspects");
        assert_eq!(clauses[1].title, "Emergency Preparedness and Response");
    }

    #[test]
    fn iso_clauses_accepts_encoded_string() {
        let refs = json!("[\"9001:9.2\"]");
        assert_eq!(iso_clauses(&refs)[0].title, "Internal Audit");
        assert!(iso_clauses(&json!("not json")).is_empty());
    }
}
