//! Calendar events as seen by the availability engine.
//!
//! Events are rebuilt from the feed on every refresh and never mutated in
//! place; the merger produces new events instead of editing old ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event_kind::EventKind;
use crate::interval::Interval;
use crate::types::{AgentId, EventId, TeamId};

const NO_PARTICIPANTS_TITLE: &str = "Appointment without participants";
const PERSONAL_TITLE: &str = "Personal event";
const SICK_LEAVE_TITLE: &str = "Sick leave";
const TEAM_TITLE: &str = "Unavailable";
const ALL_AGENTS_BUSY_TITLE: &str = "All agents busy";

/// The agent or team whose calendar an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Owner {
    Agent(AgentId),
    Team(TeamId),
}

/// A tagged interval on an agent's or team's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub interval: Interval,
    pub owner: Owner,
    pub title: String,
    /// Whether the event started before the `now` it was built with.
    pub is_past: bool,
}

impl CalendarEvent {
    pub fn new(
        id: EventId,
        kind: EventKind,
        interval: Interval,
        owner: Owner,
        title: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            interval,
            owner,
            title: title.into(),
            is_past: interval.start() < now,
        }
    }

    /// A booked appointment, titled with its guests and local time range.
    pub fn appointment(
        id: EventId,
        agent: AgentId,
        interval: Interval,
        guests: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        let title = appointment_title(&interval, guests);
        Self::new(
            id,
            EventKind::Appointment,
            interval,
            Owner::Agent(agent),
            title,
            now,
        )
    }

    pub fn personal(id: EventId, agent: AgentId, interval: Interval, now: DateTime<Utc>) -> Self {
        Self::new(
            id,
            EventKind::Personal,
            interval,
            Owner::Agent(agent),
            PERSONAL_TITLE,
            now,
        )
    }

    /// Sick leave blocks the agent exactly like a personal event.
    pub fn sick_leave(id: EventId, agent: AgentId, interval: Interval, now: DateTime<Utc>) -> Self {
        Self::new(
            id,
            EventKind::Personal,
            interval,
            Owner::Agent(agent),
            SICK_LEAVE_TITLE,
            now,
        )
    }

    pub fn team(id: EventId, team: TeamId, interval: Interval, now: DateTime<Utc>) -> Self {
        Self::new(
            id,
            EventKind::Team,
            interval,
            Owner::Team(team),
            TEAM_TITLE,
            now,
        )
    }

    /// A synthetic team-wide block; its id is derived from the team and span.
    pub fn all_agents_busy(team: TeamId, interval: Interval, now: DateTime<Utc>) -> Self {
        let key = format!(
            "{team}/{}/{}",
            interval.start().to_rfc3339(),
            interval.end().to_rfc3339()
        );
        Self::new(
            EventId::derived(&key),
            EventKind::AllAgentsBusy,
            interval,
            Owner::Team(team),
            ALL_AGENTS_BUSY_TITLE,
            now,
        )
    }

    pub const fn owner_agent(&self) -> Option<&AgentId> {
        match &self.owner {
            Owner::Agent(agent) => Some(agent),
            Owner::Team(_) => None,
        }
    }

    pub const fn owner_team(&self) -> Option<&TeamId> {
        match &self.owner {
            Owner::Team(team) => Some(team),
            Owner::Agent(_) => None,
        }
    }
}

fn appointment_title(interval: &Interval, guests: &[String]) -> String {
    let who = if guests.is_empty() {
        NO_PARTICIPANTS_TITLE.to_string()
    } else {
        guests
            .iter()
            .map(|g| format_phone_if_digits_only(g))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "{who}, {} - {}",
        interval.local_start().format("%-I:%M"),
        interval.local_end().format("%-I:%M %P")
    )
}

/// Guests without a name are listed by phone number; render ten-digit
/// numbers the way they are shown elsewhere.
fn format_phone_if_digits_only(guest: &str) -> String {
    let digits = guest.strip_prefix('1').filter(|d| d.len() == 10).unwrap_or(guest);
    if digits.len() == 10 && digits.bytes().all(|b| b.is_ascii_digit()) {
        format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        guest.to_string()
    }
}
