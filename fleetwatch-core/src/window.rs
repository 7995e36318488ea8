//! Reporting periods expressed in an explicit time zone.

use std::fmt;

use chrono::{
    DateTime, Datelike, Days, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday,
};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid window: start {start} is after end {end}")]
/// Raised when a window would end before it starts.
pub struct InvalidWindowError {
    /// Requested start.
    pub start: DateTime<FixedOffset>,
    /// Requested end.
    pub end: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
/// Inclusive start/end instants of a reporting period.
///
/// Both bounds keep the UTC offset of the zone they were derived in, so the
/// local calendar days of the period can be recovered without the zone.
pub struct TimeWindow {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

/// Unchecked wire form of a [`TimeWindow`].
#[derive(Deserialize)]
struct WindowBounds {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl TryFrom<WindowBounds> for TimeWindow {
    type Error = InvalidWindowError;

    fn try_from(bounds: WindowBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end)
    }
}

impl TimeWindow {
    /// Build a window from explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWindowError`] when `start` is after `end`.
    pub fn new(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Self, InvalidWindowError> {
        if start > end {
            return Err(InvalidWindowError { start, end });
        }
        Ok(Self { start, end })
    }

    /// Week containing `now` in `tz`, from the first day at 00:00:00 to the
    /// last day at 23:59:59 local time.
    ///
    /// The result depends only on the arguments. A local midnight skipped by a
    /// DST transition resolves to the first valid instant after the gap.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWindowError`] if the derived bounds are out of order.
    pub fn current_week<Tz: TimeZone>(
        now: DateTime<Utc>,
        tz: &Tz,
        week_starts_on: Weekday,
    ) -> Result<Self, InvalidWindowError> {
        let today = now.with_timezone(tz).date_naive();
        let first_day = today - Days::new(u64::from(today.weekday().days_since(week_starts_on)));
        let next_first_day = first_day + Days::new(7);

        let start = local_midnight(tz, first_day);
        let end_instant = local_midnight(tz, next_first_day) - Duration::seconds(1);
        let end = end_instant.with_timezone(tz).fixed_offset();

        Self::new(start, end)
    }

    /// Monday-to-Sunday week containing `now` in `tz`.
    ///
    /// # Errors
    ///
    /// See [`TimeWindow::current_week`].
    pub fn weekly<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> Result<Self, InvalidWindowError> {
        Self::current_week(now, tz, Weekday::Mon)
    }

    /// Start instant (inclusive).
    #[must_use]
    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    /// End instant (inclusive).
    #[must_use]
    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    /// Local calendar day of the start.
    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Local calendar day of the end.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.end.date_naive()
    }

    /// Whether `instant` lies inside the window.
    #[must_use]
    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        self.start.with_timezone(&Utc) <= instant && instant <= self.end.with_timezone(&Utc)
    }

    /// Whether the local calendar day `date` lies inside the window.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.first_day() <= date && date <= self.last_day()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{} - {}",
            self.first_day().format("%d/%m/%Y"),
            self.last_day().format("%d/%m/%Y")
        )
    }
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> DateTime<FixedOffset> {
    let midnight = day.and_time(NaiveTime::MIN);
    if let Some(resolved) = tz.from_local_datetime(&midnight).earliest() {
        return resolved.fixed_offset();
    }

    // Skipped midnight; no zone has a gap longer than a day.
    (1..=96)
        .find_map(|step| {
            tz.from_local_datetime(&(midnight + Duration::minutes(15 * step)))
                .earliest()
        })
        .map_or_else(
            || Utc.from_utc_datetime(&midnight).fixed_offset(),
            |resolved| resolved.fixed_offset(),
        )
}
