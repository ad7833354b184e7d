//! Half-open, time-zone-tagged time ranges.
//!
//! All comparisons happen on absolute UTC instants. The time zone only
//! controls how an interval is displayed and where its local day starts.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building an [`Interval`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntervalError {
    /// `start` was not strictly before `end`.
    #[error("interval start {start} must be before end {end}")]
    EmptyOrInverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The time zone name is not in the IANA database.
    #[error("unknown time zone: {0}")]
    UnknownTimeZone(String),
}

/// Half-open interval `[start, end)` with a display time zone.
///
/// Invariant: `start < end`. Intervals that violate it cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    timezone: Tz,
}

#[derive(Deserialize)]
struct RawInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    timezone: Tz,
}

impl TryFrom<RawInterval> for Interval {
    type Error = IntervalError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end, raw.timezone)
    }
}

impl Interval {
    /// Creates an interval, rejecting empty or inverted ranges.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timezone: Tz,
    ) -> Result<Self, IntervalError> {
        if start >= end {
            return Err(IntervalError::EmptyOrInverted { start, end });
        }
        Ok(Self {
            start,
            end,
            timezone,
        })
    }

    /// Creates an interval of `minutes` length starting at `start`.
    pub fn starting_at(
        start: DateTime<Utc>,
        minutes: i64,
        timezone: Tz,
    ) -> Result<Self, IntervalError> {
        Self::new(start, start + Duration::minutes(minutes), timezone)
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Start instant in the interval's display time zone.
    pub fn local_start(&self) -> DateTime<Tz> {
        self.start.with_timezone(&self.timezone)
    }

    /// End instant in the interval's display time zone.
    pub fn local_end(&self) -> DateTime<Tz> {
        self.end.with_timezone(&self.timezone)
    }

    /// True iff the open ranges intersect. Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True iff one interval ends exactly where the other starts.
    pub fn touches(&self, other: &Self) -> bool {
        self.end == other.start || other.end == self.start
    }

    /// True iff `instant` lies in `[start, end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Same instants, displayed in another time zone.
    #[must_use]
    pub fn with_timezone(self, timezone: Tz) -> Self {
        Self { timezone, ..self }
    }

    /// Union of two adjacent or overlapping intervals.
    ///
    /// Returns `None` when the intervals are disjoint and do not touch. The
    /// result keeps `self`'s time zone.
    pub fn merge(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) && !self.touches(other) {
            return None;
        }
        Some(Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            timezone: self.timezone,
        })
    }

    /// The part of `self` inside `window`, or `None` if they do not overlap.
    pub fn clip_to(&self, window: &Self) -> Option<Self> {
        if !self.overlaps(window) {
            return None;
        }
        Some(Self {
            start: self.start.max(window.start),
            end: self.end.min(window.end),
            timezone: self.timezone,
        })
    }

    /// The local calendar day (in the interval's time zone) containing `start`.
    pub fn local_day(&self) -> Self {
        day_window(self.start, self.timezone)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} {}",
            self.local_start().format("%Y-%m-%d %H:%M"),
            self.local_end().format("%H:%M"),
            self.timezone.name()
        )
    }
}

/// Parses an IANA time zone name.
pub fn parse_timezone(name: &str) -> Result<Tz, IntervalError> {
    name.parse()
        .map_err(|_| IntervalError::UnknownTimeZone(name.to_string()))
}

/// Converts a local date at midnight to UTC.
///
/// Ambiguous midnights (DST fall-back) resolve to the earlier instant. A
/// midnight skipped by a spring-forward gap resolves to 1am local.
pub fn local_midnight(date: NaiveDate, timezone: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    timezone
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            timezone
                .from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc))
}

/// The `[midnight, next midnight)` window of the local day containing `instant`.
pub fn day_window(instant: DateTime<Utc>, timezone: Tz) -> Interval {
    let date = instant.with_timezone(&timezone).date_naive();
    Interval {
        start: local_midnight(date, timezone),
        end: local_midnight(date + Duration::days(1), timezone),
        timezone,
    }
}
