//! Likelihood × severity risk scoring.

use serde::Serialize;

use super::rag::Rag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskBand {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskBand {
    pub const ALL: [RiskBand; 4] = [
        RiskBand::Low,
        RiskBand::Medium,
        RiskBand::High,
        RiskBand::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Medium => "Medium",
            RiskBand::High => "High",
            RiskBand::Critical => "Critical",
        }
    }
}

/// A validated 1..=5 likelihood / severity pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskScore {
    pub score: i32,
    pub band: RiskBand,
    pub rag: Rag,
}

pub fn in_scale(value: i32) -> bool {
    (1..=5).contains(&value)
}

pub fn band(score: i32) -> RiskBand {
    match score {
        s if s >= 16 => RiskBand::Critical,
        s if s >= 11 => RiskBand::High,
        s if s >= 6 => RiskBand::Medium,
        _ => RiskBand::Low,
    }
}

pub fn rag(score: i32) -> Rag {
    match score {
        s if s >= 16 => Rag::Red,
        s if s >= 6 => Rag::Amber,
        _ => Rag::Green,
    }
}

/// Score a pair. Out-of-scale inputs return `None`.
pub fn score(likelihood: i32, severity: i32) -> Option<RiskScore> {
    if !in_scale(likelihood) || !in_scale(severity) {
        return None;
    }
    let score = likelihood * severity;
    Some(RiskScore {
        score,
        band: band(score),
        rag: rag(score),
    })
}

/// Push an error for each out-of-scale field.
pub fn validate_pair(likelihood: i32, severity: i32, errors: &mut Vec<String>) {
    if !in_scale(likelihood) {
        errors.push("likelihood must be between 1 and 5".to_string());
    }
    if !in_scale(severity) {
        errors.push("severity must be between 1 and 5".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges() {
        assert_eq!(band(1), RiskBand::Low);
        assert_eq!(band(5), RiskBand::Low);
        assert_eq!(band(6), RiskBand::Medium);
        assert_eq!(band(10), RiskBand::Medium);
        assert_eq!(band(11), RiskBand::High);
        assert_eq!(band(15), RiskBand::High);
        assert_eq!(band(16), RiskBand::Critical);
        assert_eq!(band(25), RiskBand::Critical);
    }

    #[test]
    fn rag_edges() {
        assert_eq!(rag(5), Rag::Green);
        assert_eq!(rag(6), Rag::Amber);
        assert_eq!(rag(12), Rag::Amber);
        assert_eq!(rag(16), Rag::Red);
    }

    #[test]
    fn score_validates_scale() {
        let s = score(4, 4).unwrap();
        assert_eq!(s.score, 16);
        assert_eq!(s.band, RiskBand::Critical);
        assert_eq!(s.rag, Rag::Red);
        assert!(score(0, 3).is_none());
        assert!(score(3, 6).is_none());
    }

    #[test]
    fn validate_pair_reports_each_field() {
        let mut errors = Vec::new();
        validate_pair(0, 9, &mut errors);
        assert_eq!(errors.len(), 2);
    }
}
