//! `{PREFIX}-{YYYY}-{NNNN}` reference numbers.
//!
//! The sequence continues from the highest number issued for the prefix
//! and year, so deleting a record never makes a later reference collide.

/// Sequence part of `reference` if it belongs to `prefix` and `year`.
pub fn sequence_of(reference: &str, prefix: &str, year: i32) -> Option<i64> {
    let rest = reference.strip_prefix(prefix)?.strip_prefix('-')?;
    let (ref_year, seq) = rest.split_once('-')?;
    if ref_year.parse::<i32>().ok()? != year {
        return None;
    }
    seq.parse().ok().filter(|n| *n > 0)
}

/// The reference after the highest one in `existing` for this prefix and year.
pub fn next_reference<'a>(
    prefix: &str,
    year: i32,
    existing: impl IntoIterator<Item = &'a str>,
) -> String {
    let last = existing
        .into_iter()
        .filter_map(|r| sequence_of(r, prefix, year))
        .max()
        .unwrap_or(0);
    format!("{prefix}-{year}-{:04}", last + 1)
}

/// `LIKE` pattern matching every reference for a prefix and year.
pub fn reference_pattern(prefix: &str, year: i32) -> String {
    format!("{prefix}-{year}-%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reference_of_the_year() {
        assert_eq!(next_reference("AUD", 2025, []), "AUD-2025-0001");
    }

    #[test]
    fn sequence_is_zero_padded() {
        assert_eq!(next_reference("NC", 2024, ["NC-2024-0041"]), "NC-2024-0042");
        assert_eq!(next_reference("WR", 2025, ["WR-2025-12344"]), "WR-2025-12345");
    }

    #[test]
    fn continues_after_deleted_records() {
        // 0001 was deleted; counting would hand out 0002 again.
        let existing = ["AUD-2026-0002"];
        assert_eq!(next_reference("AUD", 2026, existing), "AUD-2026-0003");

        let gaps = ["AUD-2026-0003", "AUD-2026-0007", "AUD-2026-0005"];
        assert_eq!(next_reference("AUD", 2026, gaps), "AUD-2026-0008");
    }

    #[test]
    fn foreign_references_are_ignored() {
        let existing = [
            "AUD-2025-0099",
            "AUDX-2026-0050",
            "AUD-2026-draft",
            "AUD-2026-0004",
            "INC-2026-0300",
        ];
        assert_eq!(next_reference("AUD", 2026, existing), "AUD-2026-0005");
    }

    #[test]
    fn sequence_parsing() {
        assert_eq!(sequence_of("COMPLAINT-2025-0012", "COMPLAINT", 2025), Some(12));
        assert_eq!(sequence_of("COMPLAINT-2025-0012", "COMPLAINT", 2024), None);
        assert_eq!(sequence_of("COMPLAINT-2025", "COMPLAINT", 2025), None);
        assert_eq!(sequence_of("NC-2025-0000", "NC", 2025), None);
    }

    #[test]
    fn pattern_is_scoped_to_year() {
        assert_eq!(reference_pattern("COMPLAINT", 2025), "COMPLAINT-2025-%");
    }
}
