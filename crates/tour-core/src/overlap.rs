//! Overlap detection between a candidate slot and calendar events.
//!
//! A single linear pass: per-resource event sets are bounded by a business
//! day, so no interval index is kept.

use crate::event::CalendarEvent;
use crate::interval::Interval;

/// Returns every event whose interval overlaps `candidate`, in input order.
///
/// Uses half-open semantics: an event ending exactly at `candidate.start()`
/// does not collide with it.
pub fn find_overlapping<'a, I>(candidate: &Interval, events: I) -> Vec<CalendarEvent>
where
    I: IntoIterator<Item = &'a CalendarEvent>,
{
    events
        .into_iter()
        .filter(|event| candidate.overlaps(&event.interval))
        .inspect(|event| {
            tracing::trace!(event_id = %event.id, kind = %event.kind, "event overlaps candidate");
        })
        .cloned()
        .collect()
}

/// True iff any event overlaps `candidate`.
pub fn any_overlapping<'a, I>(candidate: &Interval, events: I) -> bool
where
    I: IntoIterator<Item = &'a CalendarEvent>,
{
    events
        .into_iter()
        .any(|event| candidate.overlaps(&event.interval))
}
