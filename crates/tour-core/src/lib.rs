//! Appointment scheduling and availability engine.
//!
//! This crate contains the pure scheduling logic behind a tour booking dialog:
//! - Intervals and calendar events: half-open time ranges with a display zone
//! - Availability: overlap detection, contiguous merging, slot rounding
//! - Team bookings: the team slot grid and next-agent resolution
//! - Drafts: the state machine that gates appointment submission
//!
//! Nothing here performs I/O or reads the clock. Callers pass the calendar
//! snapshot and the current instant in.

pub mod draft;
pub mod engine;
pub mod event;
pub mod event_kind;
pub mod feed;
pub mod interval;
mod merge;
mod overlap;
pub mod ports;
pub mod resolver;
pub mod slot;
pub mod team_slots;
pub mod types;

pub use draft::{
    AppointmentDraft, AppointmentPayload, ContactWarning, DraftController, DraftError, DraftState,
    ExistingAppointment, MissingField, PartyMember, SubmitCommand, TourTypeOptions,
};
pub use engine::{AvailabilityEngine, EngineSettings, Resource, SlotDecision, SlotRequest};
pub use event::{CalendarEvent, Owner};
pub use event_kind::EventKind;
pub use feed::{CalendarFeed, FeedError, FeedSnapshot};
pub use interval::{Interval, IntervalError, day_window, parse_timezone};
pub use merge::{NowSide, merge_contiguous, same_side_of_now};
pub use overlap::{any_overlapping, find_overlapping};
pub use ports::{Discard, SlotDecisionSink, SubmitSink};
pub use resolver::{AgentSuggestion, LeastBookedResolver, NextAgentResolver, resolve_checked};
pub use slot::{
    AGENT_SLOT_MINUTES, DEFAULT_TEAM_SLOT_MINUTES, SlotError, SlotGranularity,
    compute_slot_from_click, round_down, round_offset, round_up, slot_count,
};
pub use team_slots::{TeamCalendar, TeamSlot};
pub use types::{
    AgentId, AppointmentId, EventId, PartyMemberId, TeamId, TourType, UnitId, ValidationError,
};
