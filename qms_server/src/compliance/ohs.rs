//! OH&S frequency rates.
//!
//! All rates are rounded to two decimals and collapse to zero when the
//! denominator is not positive.

pub const RECORDABLE_SEVERITIES: &[&str] = &["MEDICAL_TREATMENT", "LOST_TIME", "FATALITY"];
pub const LOST_TIME_SEVERITIES: &[&str] = &["LOST_TIME", "FATALITY"];

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn per_hours(count: u64, factor: f64, hours: f64) -> f64 {
    if hours.is_nan() || hours <= 0.0 {
        return 0.0;
    }
    round2(count as f64 * factor / hours)
}

/// Total recordable incident rate per 200 000 hours.
pub fn trir(recordable: u64, hours: f64) -> f64 {
    per_hours(recordable, 200_000.0, hours)
}

/// Lost time injury frequency rate per 1 000 000 hours.
pub fn ltifr(lost_time_injuries: u64, hours: f64) -> f64 {
    per_hours(lost_time_injuries, 1_000_000.0, hours)
}

/// Days away, restricted or transferred rate per 200 000 hours.
pub fn dart(cases: u64, hours: f64) -> f64 {
    per_hours(cases, 200_000.0, hours)
}

pub fn near_miss_ratio(near_misses: u64, incidents: u64) -> f64 {
    if incidents == 0 {
        return 0.0;
    }
    round2(near_misses as f64 / incidents as f64)
}

pub fn is_recordable(severity_type: &str) -> bool {
    RECORDABLE_SEVERITIES.contains(&severity_type)
}

pub fn is_lost_time(severity_type: &str) -> bool {
    LOST_TIME_SEVERITIES.contains(&severity_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_scale_by_hours() {
        assert_eq!(trir(2, 400_000.0), 1.0);
        assert_eq!(ltifr(1, 500_000.0), 2.0);
        assert_eq!(dart(3, 200_000.0), 3.0);
        assert_eq!(trir(1, 300_000.0), 0.67);
    }

    #[test]
    fn zero_or_negative_hours_give_zero() {
        assert_eq!(trir(5, 0.0), 0.0);
        assert_eq!(ltifr(5, -10.0), 0.0);
        assert_eq!(dart(5, f64::NAN), 0.0);
    }

    #[test]
    fn near_miss_ratio_rounds() {
        assert_eq!(near_miss_ratio(10, 3), 3.33);
        assert_eq!(near_miss_ratio(4, 0), 0.0);
    }

    #[test]
    fn severity_classes() {
        assert!(is_recordable("MEDICAL_TREATMENT"));
        assert!(is_recordable("FATALITY"));
        assert!(!is_recordable("FIRST_AID"));
        assert!(is_lost_time("LOST_TIME"));
        assert!(!is_lost_time("MEDICAL_TREATMENT"));
    }
}
