//! Collapsing of contiguous team-blocking events.
//!
//! The team calendar feed stores unavailability one slot at a time, so a
//! two-hour block arrives as several touching slots. Merging them gives the
//! calendar (and the overlap detector) one span per continuous block.
//!
//! Merging never crosses the "now" boundary: a past segment and a future
//! segment stay separate even when they touch. The boundary is taken from the
//! `now` passed in, so a cached merge result goes stale once wall-clock time
//! passes a segment start; callers re-merge on every feed refresh.

use chrono::{DateTime, Utc};

use crate::event::CalendarEvent;

/// Which side of the live boundary an instant falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NowSide {
    /// Strictly before now.
    Past,
    /// At or after now.
    Future,
}

impl NowSide {
    pub fn of(instant: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if instant < now { Self::Past } else { Self::Future }
    }
}

/// True iff both events start on the same side of `now`.
pub fn same_side_of_now(a: &CalendarEvent, b: &CalendarEvent, now: DateTime<Utc>) -> bool {
    NowSide::of(a.interval.start(), now) == NowSide::of(b.interval.start(), now)
}

/// Merges events that touch end-to-start and lie on the same side of `now`.
///
/// Input order does not matter; output is sorted by start. Only exact touches
/// merge: overlapping or separated events are kept as they are. A merged
/// event keeps the id, owner, kind and title of the earliest segment.
pub fn merge_contiguous<I>(events: I, now: DateTime<Utc>) -> Vec<CalendarEvent>
where
    I: IntoIterator<Item = CalendarEvent>,
{
    let mut sorted: Vec<CalendarEvent> = events.into_iter().collect();
    sorted.sort_by_key(|e| e.interval.start());
    let input_len = sorted.len();

    let merged = sorted
        .into_iter()
        .fold(Vec::<CalendarEvent>::new(), |mut acc, current| {
            if let Some(last) = acc.last_mut() {
                if last.interval.end() == current.interval.start()
                    && same_side_of_now(last, &current, now)
                {
                    if let Some(joined) = last.interval.merge(&current.interval) {
                        last.interval = joined;
                        return acc;
                    }
                }
            }
            acc.push(current);
            acc
        });

    tracing::debug!(
        input = input_len,
        output = merged.len(),
        "merged contiguous team events"
    );
    merged
}
