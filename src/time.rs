//! "Now, in Ecuador" — a fixed UTC−05 offset with no DST, plus a
//! configurable skew tolerance (`SRI_CLOCK_SKEW_SECS`) for clamping
//! caller-supplied emission dates that land in the future.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Ecuador has a single, permanent UTC−05 offset (no daylight saving).
pub fn ecuador_offset() -> FixedOffset {
    FixedOffset::west_opt(5 * 3600).expect("UTC-5 is a valid fixed offset")
}

/// Current wall-clock time expressed in America/Guayaquil (UTC−05).
pub fn now_in_ecuador() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&ecuador_offset())
}

/// Current wall-clock time plus `skew` seconds of tolerance, used when
/// deciding whether a caller-supplied `fechaEmision` should be clamped.
pub fn now_in_ecuador_with_skew(skew_secs: i64) -> DateTime<FixedOffset> {
    now_in_ecuador() + chrono::Duration::seconds(skew_secs)
}

/// Clamp `date` to "today in Ecuador" (plus `skew_secs` of tolerance) if it
/// is strictly in the future. Returns `(clamped_date, was_clamped)`.
pub fn clamp_to_now(date: NaiveDate, skew_secs: i64) -> (NaiveDate, bool) {
    let today = now_in_ecuador_with_skew(skew_secs).date_naive();
    if date > today {
        (today, true)
    } else {
        (date, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_minus_five_hours() {
        assert_eq!(ecuador_offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn clamp_leaves_past_dates_untouched() {
        let far_past = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let (clamped, was_clamped) = clamp_to_now(far_past, 0);
        assert_eq!(clamped, far_past);
        assert!(!was_clamped);
    }

    #[test]
    fn clamp_pulls_future_dates_to_today() {
        let far_future = NaiveDate::from_ymd_opt(2999, 1, 1).unwrap();
        let (clamped, was_clamped) = clamp_to_now(far_future, 0);
        assert!(was_clamped);
        assert!(clamped < far_future);
    }
}
