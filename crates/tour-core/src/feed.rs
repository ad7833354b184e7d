//! The calendar feed snapshot and its conversion into engine events.
//!
//! The feed is whatever the data-loading collaborator hands back for one
//! resource and date range. It is treated as immutable until the next load;
//! the engine has no way to tell a stale snapshot from a fresh one.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::Resource;
use crate::event::{CalendarEvent, Owner};
use crate::interval::{Interval, IntervalError};
use crate::slot::SlotGranularity;
use crate::team_slots::{TeamCalendar, TeamSlot};
use crate::types::{AgentId, AppointmentId, EventId, TeamId, ValidationError};

/// Errors raised while loading or converting a feed snapshot.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read feed {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed feed snapshot")]
    Parse(#[from] serde_json::Error),

    #[error("feed entry {id} has an invalid interval")]
    Interval {
        id: String,
        #[source]
        source: IntervalError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// An appointment on an agent's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRecord {
    pub id: EventId,
    pub user_id: AgentId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Display names of the attending guests.
    #[serde(default)]
    pub guests: Vec<String>,
}

/// A personal or sick-leave entry on an agent's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEventRecord {
    pub id: EventId,
    pub user_id: AgentId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// An unavailability entry on a team's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamEventRecord {
    pub id: EventId,
    pub team_id: TeamId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// A precomputed team calendar slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSlotRecord {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub available_agents: Vec<AgentId>,
    #[serde(default)]
    pub is_team: bool,
    #[serde(default)]
    pub is_all_day: bool,
}

/// Everything the input port returns for one load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedSnapshot {
    pub appointments: Vec<AppointmentRecord>,
    pub user_events: Vec<UserEventRecord>,
    pub sick_leave_events: Vec<UserEventRecord>,
    pub team_events: Vec<TeamEventRecord>,
    pub team_slots: Vec<TeamSlotRecord>,
    /// Team memberships, used to pick the team events that block an agent.
    pub agent_teams: BTreeMap<AgentId, Vec<TeamId>>,
}

/// Input port: loads the calendar of `resource` for `range`.
pub trait CalendarFeed {
    fn load(&self, resource: &Resource, range: &Interval, timezone: Tz)
    -> Result<FeedSnapshot, FeedError>;
}

/// An in-memory snapshot serves every request with itself.
impl CalendarFeed for FeedSnapshot {
    fn load(
        &self,
        _resource: &Resource,
        _range: &Interval,
        _timezone: Tz,
    ) -> Result<FeedSnapshot, FeedError> {
        Ok(self.clone())
    }
}

fn interval(
    id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    timezone: Tz,
) -> Result<Interval, FeedError> {
    Interval::new(start, end, timezone).map_err(|source| FeedError::Interval {
        id: id.to_string(),
        source,
    })
}

/// Clips `event` to `day`, dropping it when it falls outside.
///
/// `is_past` follows the clipped start, which is what the day view shows.
fn clip_to_day(mut event: CalendarEvent, day: &Interval, now: DateTime<Utc>) -> Option<CalendarEvent> {
    if let Some(clipped) = event.interval.clip_to(day) {
        event.interval = clipped;
        event.is_past = clipped.start() < now;
        Some(event)
    } else {
        tracing::warn!(
            event_id = %event.id,
            interval = %event.interval,
            %day,
            "dropping feed event outside the requested day"
        );
        None
    }
}

impl FeedSnapshot {
    pub fn from_json(json: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Agent-mode events for `agent` on `day`.
    ///
    /// Team unavailability is attributed to the agent, so it still blocks in
    /// agent mode. When `agent_teams` lists the agent, only events of those
    /// teams apply; otherwise the snapshot is taken to be scoped to the agent
    /// and every team event applies. Every event is clipped to `day`. The appointment being
    /// edited is left out so it never conflicts with itself.
    pub fn agent_events(
        &self,
        agent: &AgentId,
        day: &Interval,
        editing: Option<&AppointmentId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, FeedError> {
        let tz = day.timezone();
        let mut events = Vec::new();

        for record in self.appointments.iter().filter(|r| &r.user_id == agent) {
            if editing.is_some_and(|id| id.as_str() == record.id.as_str()) {
                tracing::trace!(appointment_id = %record.id, "skipping edited appointment");
                continue;
            }
            let span = interval(record.id.as_str(), record.start_date, record.end_date, tz)?;
            events.push(CalendarEvent::appointment(
                record.id.clone(),
                agent.clone(),
                span,
                &record.guests,
                now,
            ));
        }
        for record in self.user_events.iter().filter(|r| &r.user_id == agent) {
            let span = interval(record.id.as_str(), record.start_date, record.end_date, tz)?;
            events.push(CalendarEvent::personal(record.id.clone(), agent.clone(), span, now));
        }
        for record in self.sick_leave_events.iter().filter(|r| &r.user_id == agent) {
            let span = interval(record.id.as_str(), record.start_date, record.end_date, tz)?;
            events.push(CalendarEvent::sick_leave(record.id.clone(), agent.clone(), span, now));
        }
        let teams = self.agent_teams.get(agent);
        let own_team_events = self
            .team_events
            .iter()
            .filter(|r| teams.is_none_or(|teams| teams.contains(&r.team_id)));
        for record in own_team_events {
            let span = interval(record.id.as_str(), record.start_date, record.end_date, tz)?;
            let mut event = CalendarEvent::team(record.id.clone(), record.team_id.clone(), span, now);
            event.owner = Owner::Agent(agent.clone());
            events.push(event);
        }

        let converted = events.len();
        let clipped: Vec<_> = events
            .into_iter()
            .filter_map(|event| clip_to_day(event, day, now))
            .collect();
        tracing::debug!(%agent, %day, converted, kept = clipped.len(), "built agent events");
        Ok(clipped)
    }

    /// Team events of `team`, owned by the team.
    pub fn team_events(
        &self,
        team: &TeamId,
        timezone: Tz,
        now: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, FeedError> {
        self.team_events
            .iter()
            .filter(|r| &r.team_id == team)
            .map(|r| {
                let span = interval(r.id.as_str(), r.start_date, r.end_date, timezone)?;
                Ok(CalendarEvent::team(r.id.clone(), team.clone(), span, now))
            })
            .collect()
    }

    /// Every agent's appointments, personal events and sick leave.
    pub fn member_events(&self, timezone: Tz, now: DateTime<Utc>) -> Result<Vec<CalendarEvent>, FeedError> {
        let mut events = Vec::new();
        for r in &self.appointments {
            let span = interval(r.id.as_str(), r.start_date, r.end_date, timezone)?;
            events.push(CalendarEvent::appointment(
                r.id.clone(),
                r.user_id.clone(),
                span,
                &r.guests,
                now,
            ));
        }
        for r in &self.user_events {
            let span = interval(r.id.as_str(), r.start_date, r.end_date, timezone)?;
            events.push(CalendarEvent::personal(r.id.clone(), r.user_id.clone(), span, now));
        }
        for r in &self.sick_leave_events {
            let span = interval(r.id.as_str(), r.start_date, r.end_date, timezone)?;
            events.push(CalendarEvent::sick_leave(r.id.clone(), r.user_id.clone(), span, now));
        }
        Ok(events)
    }

    /// The team calendar carried in `team_slots`.
    pub fn team_calendar(
        &self,
        granularity: SlotGranularity,
        timezone: Tz,
    ) -> Result<TeamCalendar, FeedError> {
        let slots = self
            .team_slots
            .iter()
            .map(|r| {
                let label = r.start_date.to_rfc3339();
                Ok(TeamSlot {
                    interval: interval(&label, r.start_date, r.end_date, timezone)?,
                    available_agents: r.available_agents.clone(),
                    is_team: r.is_team,
                    is_all_day: r.is_all_day,
                })
            })
            .collect::<Result<Vec<_>, FeedError>>()?;
        Ok(TeamCalendar::from_slots(granularity, slots))
    }
}
