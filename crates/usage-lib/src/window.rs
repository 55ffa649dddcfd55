//! Hourly query window arithmetic
//!
//! Every run is anchored to one base window derived from local midnight.
//! Each hour index then shifts that base window backward in time: index 0
//! is the window closest to now, the last index is furthest back.
//!
//! The base start sits 24 hours plus a fixed offset (2 hours by default)
//! before local midnight. The offset compensates for the clock difference
//! between the reporting host and the metrics API and is applied as-is.

use crate::models::{TimeWindow, WINDOW_SECS};
use chrono::{DateTime, FixedOffset, NaiveTime, Utc};

/// Default hours subtracted on top of the 24 hour day shift
pub const DEFAULT_OFFSET_HOURS: i64 = 2;

/// Number of hourly windows in a full day
pub const HOURS_PER_DAY: u32 = 24;

/// Base window for the current moment in the given local offset
pub fn base_window(local: FixedOffset, offset_hours: i64) -> TimeWindow {
    base_window_at(Utc::now().with_timezone(&local), offset_hours)
}

/// Base window relative to an explicit `now`.
///
/// The start is local midnight of `now`'s calendar date minus
/// `24 + offset_hours` hours, truncated to whole epoch seconds.
pub fn base_window_at(now: DateTime<FixedOffset>, offset_hours: i64) -> TimeWindow {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    let midnight_epoch =
        midnight.and_utc().timestamp() - i64::from(now.offset().local_minus_utc());

    let start = midnight_epoch - (24 + offset_hours) * WINDOW_SECS;
    TimeWindow::new(start, start + WINDOW_SECS)
}

/// Query window for one hour index, shifted from the base window
pub fn interval_for(hour_index: u32, base: TimeWindow) -> TimeWindow {
    let shift = WINDOW_SECS - WINDOW_SECS * i64::from(hour_index);
    TimeWindow::new(base.start + shift, base.end + shift)
}

/// All windows for hour indexes `0..num_hours`, in index order
pub fn hourly_windows(base: TimeWindow, num_hours: u32) -> impl Iterator<Item = (u32, TimeWindow)> {
    (0..num_hours).map(move |hour| (hour, interval_for(hour, base)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_at(start: i64) -> TimeWindow {
        TimeWindow::new(start, start + WINDOW_SECS)
    }

    #[test]
    fn test_interval_for_first_and_last() {
        let base = base_at(1_000_000);

        assert_eq!(interval_for(0, base), TimeWindow::new(1_003_600, 1_007_200));
        assert_eq!(interval_for(1, base), TimeWindow::new(1_000_000, 1_003_600));
        assert_eq!(
            interval_for(23, base),
            TimeWindow::new(1_000_000 - 22 * 3600, 1_000_000 - 21 * 3600)
        );
    }

    #[test]
    fn test_windows_are_disjoint_hourly_and_contiguous() {
        let base = base_at(1_760_000_000);
        let windows: Vec<TimeWindow> = hourly_windows(base, HOURS_PER_DAY).map(|(_, w)| w).collect();

        assert_eq!(windows.len(), 24);
        for w in &windows {
            assert_eq!(w.duration_secs(), 3600);
        }
        for (i, a) in windows.iter().enumerate() {
            for b in windows.iter().skip(i + 1) {
                assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }
        // Each window ends where the next (later index) one begins
        for pair in windows.windows(2) {
            assert_eq!(pair[1].end, pair[0].start);
        }

        let earliest = windows.iter().map(|w| w.start).min().unwrap();
        let latest = windows.iter().map(|w| w.end).max().unwrap();
        assert_eq!(latest - earliest, 24 * 3600);
        assert_eq!(earliest, base.start - 22 * 3600);
        assert_eq!(latest, base.end + 3600);
    }

    #[test]
    fn test_interval_for_is_deterministic() {
        let base = base_at(42 * 3600);
        for hour in 0..HOURS_PER_DAY {
            assert_eq!(interval_for(hour, base), interval_for(hour, base));
        }
    }

    #[test]
    fn test_base_window_is_26_hours_before_local_midnight() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 3, 15, 17, 42, 9).unwrap();
        let midnight = tz.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap().timestamp();

        let base = base_window_at(now, DEFAULT_OFFSET_HOURS);

        assert_eq!(base.start, midnight - 26 * 3600);
        assert_eq!(base.end, base.start + 3600);
    }

    #[test]
    fn test_base_window_ignores_time_of_day() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let early = tz.with_ymd_and_hms(2024, 11, 2, 0, 0, 1).unwrap();
        let late = tz.with_ymd_and_hms(2024, 11, 2, 23, 59, 59).unwrap();

        assert_eq!(
            base_window_at(early, DEFAULT_OFFSET_HOURS),
            base_window_at(late, DEFAULT_OFFSET_HOURS)
        );
    }

    #[test]
    fn test_base_window_custom_offset() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let now = tz.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        let midnight = tz.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap().timestamp();

        assert_eq!(base_window_at(now, 0).start, midnight - 24 * 3600);
    }
}
