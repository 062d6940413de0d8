use chrono::{DateTime, Datelike, Utc, Weekday};
use chrono_tz::US::Eastern;

/// True on Saturdays and Sundays in New York, when the exchanges are closed.
pub fn is_weekend_in_new_york(now: DateTime<Utc>) -> bool {
    matches!(
        now.with_timezone(&Eastern).weekday(),
        Weekday::Sat | Weekday::Sun
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_weekend_uses_eastern_time() {
        // Saturday noon UTC
        assert!(is_weekend_in_new_york(Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()));
        // Monday 02:00 UTC is still Sunday evening in New York
        assert!(is_weekend_in_new_york(Utc.with_ymd_and_hms(2026, 10, 19, 2, 0, 0).unwrap()));
        // Monday afternoon
        assert!(!is_weekend_in_new_york(Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap()));
        // Saturday 02:00 UTC is Friday evening in New York
        assert!(!is_weekend_in_new_york(Utc.with_ymd_and_hms(2026, 10, 17, 2, 0, 0).unwrap()));
    }
}
