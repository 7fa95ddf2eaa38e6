//! Pareto (80/20) analysis over grouped case counts.

use serde::Serialize;

/// Share of the total at or below which a row is one of the vital few.
pub const VITAL_FEW_CUTOFF: f64 = 80.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParetoRow {
    pub label: String,
    pub count: i64,
    pub percentage: f64,
    pub cumulative_percentage: f64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParetoAnalysis {
    pub total: i64,
    pub rows: Vec<ParetoRow>,
    /// Labels whose cumulative share is at most 80%.
    pub vital_few: Vec<String>,
    /// Cumulative share of the first row to reach 80%.
    pub cutoff: Option<f64>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Sort counts descending (ties by label) and accumulate percentages.
pub fn analyse(counts: impl IntoIterator<Item = (String, i64)>) -> ParetoAnalysis {
    let mut counts: Vec<(String, i64)> = counts.into_iter().filter(|(_, c)| *c > 0).collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let total: i64 = counts.iter().map(|(_, c)| c).sum();

    let mut cumulative = 0.0;
    let rows: Vec<ParetoRow> = counts
        .into_iter()
        .map(|(label, count)| {
            let percentage = if total > 0 {
                count as f64 * 100.0 / total as f64
            } else {
                0.0
            };
            cumulative += percentage;
            ParetoRow {
                label,
                count,
                percentage: round1(percentage),
                cumulative_percentage: round1(cumulative),
            }
        })
        .collect();

    let vital_few = rows
        .iter()
        .filter(|r| r.cumulative_percentage <= VITAL_FEW_CUTOFF)
        .map(|r| r.label.clone())
        .collect();
    let cutoff = rows
        .iter()
        .find(|r| r.cumulative_percentage >= VITAL_FEW_CUTOFF)
        .map(|r| r.cumulative_percentage);

    ParetoAnalysis {
        total,
        rows,
        vital_few,
        cutoff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn counts(pairs: &[(&str, i64)]) -> Vec<(String, i64)> {
        pairs.iter().map(|(l, c)| (l.to_string(), *c)).collect()
    }

    #[test]
    fn rows_are_sorted_with_running_share() {
        let a = analyse(counts(&[("Labelling", 10), ("Dimensional", 50), ("Packaging", 25), ("Other", 15)]));
        assert_eq!(a.total, 100);
        let labels: Vec<&str> = a.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Dimensional", "Packaging", "Other", "Labelling"]);
        assert_eq!(a.rows[0].percentage, 50.0);
        assert_eq!(a.rows[1].cumulative_percentage, 75.0);
        assert_eq!(a.rows[3].cumulative_percentage, 100.0);
        assert_eq!(a.vital_few, vec!["Dimensional".to_string(), "Packaging".to_string()]);
        assert_eq!(a.cutoff, Some(90.0));
    }

    #[test]
    fn percentages_round_to_one_decimal() {
        let a = analyse(counts(&[("A", 1), ("B", 1), ("C", 1)]));
        assert_eq!(a.rows[0].percentage, 33.3);
        assert_eq!(a.rows[1].cumulative_percentage, 66.7);
        assert_eq!(a.rows[2].cumulative_percentage, 100.0);
        assert_eq!(a.vital_few, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn empty_input() {
        let a = analyse(Vec::new());
        assert_eq!(a.total, 0);
        assert!(a.rows.is_empty());
        assert!(a.vital_few.is_empty());
        assert_eq!(a.cutoff, None);
    }
}
