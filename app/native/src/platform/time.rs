//! Wall-clock access and the reference time zone for daily refreshes.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeDelta, Utc};
use parking_lot::Mutex;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Returns the current UTC instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// Clock frozen at a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a clock frozen at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self { Self { now: Mutex::new(now) } }

    /// Moves the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) { *self.now.lock() = now; }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> { *self.now.lock() }
}

/// Returns the `n`th Sunday (1-based) of `month` in `year`.
fn nth_sunday(year: i32, month: u32, n: u64) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let to_sunday = u64::from((7 - first.weekday().num_days_from_sunday()) % 7);

    first.checked_add_days(Days::new(to_sunday + 7 * (n - 1)))
}

/// UTC offset in hours of US Eastern time at `now`.
///
/// Daylight time runs from the second Sunday of March, 02:00 EST (07:00 UTC),
/// to the first Sunday of November, 02:00 EDT (06:00 UTC).
#[must_use]
pub fn eastern_offset_hours(now: DateTime<Utc>) -> i64 {
    let year = now.year();
    let dst_start = nth_sunday(year, 3, 2).and_then(|day| day.and_hms_opt(7, 0, 0));
    let dst_end = nth_sunday(year, 11, 1).and_then(|day| day.and_hms_opt(6, 0, 0));

    match (dst_start, dst_end) {
        (Some(start), Some(end)) if now >= start.and_utc() && now < end.and_utc() => -4,
        _ => -5,
    }
}

/// Calendar date in US Eastern time at `now`.
#[must_use]
pub fn eastern_today(now: DateTime<Utc>) -> NaiveDate {
    (now + TimeDelta::hours(eastern_offset_hours(now))).date_naive()
}

/// Formats a date stamp the way selectors embed it (`YYYY-MM-DD`).
#[must_use]
pub fn date_stamp(date: NaiveDate) -> String { date.format("%Y-%m-%d").to_string() }
