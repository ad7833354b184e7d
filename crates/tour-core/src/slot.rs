//! Slot granularity and snapping of raw input to the slot grid.
//!
//! Offsets are always floored: a click partway through a slot selects the
//! slot containing the click. Granularity is expressed in minutes and is not
//! assumed to divide a day evenly.

use std::fmt;
use std::num::NonZeroU32;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interval::{Interval, IntervalError, local_midnight};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Fixed business granularity of agent calendars.
pub const AGENT_SLOT_MINUTES: u32 = 15;

/// Default per-property granularity of team calendars.
pub const DEFAULT_TEAM_SLOT_MINUTES: u32 = 60;

/// Errors from slot arithmetic.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SlotError {
    /// Slot granularity of zero minutes.
    #[error("slot granularity must be at least one minute")]
    ZeroGranularity,

    /// Click position outside the rendered block.
    #[error("click fraction must be between 0.0 and 1.0, got {0}")]
    ClickOutOfRange(f64),

    /// A slot grid spanning more minutes than fit in a `u32`.
    #[error("a slot grid of {0} days is too long")]
    TooManyDays(u32),

    /// The computed slot was not a valid interval.
    #[error(transparent)]
    Interval(#[from] IntervalError),
}

/// Length of one bookable slot, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SlotGranularity(NonZeroU32);

impl SlotGranularity {
    /// Agent calendars use a fixed 15-minute grid.
    pub const AGENT: Self = Self(NonZeroU32::MIN.saturating_add(AGENT_SLOT_MINUTES - 1));

    /// Team calendars default to one-hour slots unless the property overrides it.
    pub const TEAM_DEFAULT: Self =
        Self(NonZeroU32::MIN.saturating_add(DEFAULT_TEAM_SLOT_MINUTES - 1));

    pub fn new(minutes: u32) -> Result<Self, SlotError> {
        NonZeroU32::new(minutes)
            .map(Self)
            .ok_or(SlotError::ZeroGranularity)
    }

    pub const fn minutes(self) -> u32 {
        self.0.get()
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(i64::from(self.minutes()))
    }
}

impl Default for SlotGranularity {
    fn default() -> Self {
        Self::AGENT
    }
}

impl TryFrom<u32> for SlotGranularity {
    type Error = SlotError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SlotGranularity> for u32 {
    fn from(g: SlotGranularity) -> Self {
        g.minutes()
    }
}

impl fmt::Display for SlotGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.minutes())
    }
}

/// Floors `raw_offset_minutes` to the nearest lower multiple of the slot length.
pub fn round_offset(raw_offset_minutes: i64, slot: SlotGranularity) -> i64 {
    raw_offset_minutes - raw_offset_minutes.rem_euclid(i64::from(slot.minutes()))
}

/// Maps a click inside a rendered block to the slot under the pointer.
///
/// `click_fraction` is the vertical click position relative to the block
/// height. The returned slot is `slot` long and starts at the floored offset
/// from the block start; it may extend past the block end.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "block durations are a few hours of minutes"
)]
pub fn compute_slot_from_click(
    block: &Interval,
    click_fraction: f64,
    slot: SlotGranularity,
) -> Result<Interval, SlotError> {
    if !(0.0..=1.0).contains(&click_fraction) {
        return Err(SlotError::ClickOutOfRange(click_fraction));
    }
    let block_minutes = block.duration_minutes();
    let offset = ((block_minutes as f64 * click_fraction).floor() as i64)
        .min(block_minutes.saturating_sub(1))
        .max(0);
    let start = block.start() + Duration::minutes(round_offset(offset, slot));
    Ok(Interval::new(
        start,
        start + slot.duration(),
        block.timezone(),
    )?)
}

/// Snaps `instant` down to the slot grid anchored at its local midnight.
pub fn round_down(instant: DateTime<Utc>, slot: SlotGranularity, timezone: Tz) -> DateTime<Utc> {
    let day_start = local_midnight(instant.with_timezone(&timezone).date_naive(), timezone);
    let elapsed = (instant - day_start).num_minutes();
    day_start + Duration::minutes(round_offset(elapsed, slot))
}

/// Snaps `instant` up to the slot grid; aligned instants are returned as-is.
pub fn round_up(instant: DateTime<Utc>, slot: SlotGranularity, timezone: Tz) -> DateTime<Utc> {
    let floor = round_down(instant, slot, timezone);
    if floor == instant {
        floor
    } else {
        floor + slot.duration()
    }
}

/// Start of every grid slot touched by `interval`.
///
/// The interval start is snapped down and its end snapped up, so an event
/// covering part of a slot marks the whole slot.
pub fn busy_slot_starts(interval: &Interval, slot: SlotGranularity) -> Vec<DateTime<Utc>> {
    let tz = interval.timezone();
    let end = round_up(interval.end(), slot, tz);
    let mut cursor = round_down(interval.start(), slot, tz);
    let mut starts = Vec::new();
    while cursor < end {
        starts.push(cursor);
        cursor += slot.duration();
    }
    starts
}

/// Number of slots covering `days` days; a partial trailing slot counts.
pub fn slot_count(days: u32, slot: SlotGranularity) -> Result<u32, SlotError> {
    days.checked_mul(MINUTES_PER_DAY)
        .map(|minutes| minutes.div_ceil(slot.minutes()))
        .ok_or(SlotError::TooManyDays(days))
}

/// Consecutive slots from local midnight of `first_day`'s date.
pub fn slot_grid(
    first_day: DateTime<Utc>,
    days: u32,
    slot: SlotGranularity,
    timezone: Tz,
) -> Result<Vec<Interval>, SlotError> {
    let day_start = local_midnight(first_day.with_timezone(&timezone).date_naive(), timezone);
    Ok((0..slot_count(days, slot)?)
        .filter_map(|i| {
            let start = day_start + Duration::minutes(i64::from(i) * i64::from(slot.minutes()));
            Interval::new(start, start + slot.duration(), timezone).ok()
        })
        .collect())
}
