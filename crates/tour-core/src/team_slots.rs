//! The team-mode calendar grid.
//!
//! A team calendar is a run of fixed-length slots, each listing the agents
//! still bookable in it. Team events block a slot outright; agent events only
//! remove that agent.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::event::CalendarEvent;
use crate::interval::Interval;
use crate::merge::merge_contiguous;
use crate::slot::{SlotError, SlotGranularity, busy_slot_starts, slot_grid};
use crate::types::{AgentId, TeamId};

/// One cell of the team calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSlot {
    pub interval: Interval,
    pub available_agents: Vec<AgentId>,
    /// Blocked by a team event.
    pub is_team: bool,
    /// Replaces a whole day blocked by an all-day team event.
    pub is_all_day: bool,
}

impl TeamSlot {
    /// True when nobody can be booked in this slot.
    pub fn is_blocked(&self) -> bool {
        self.is_team || self.available_agents.is_empty()
    }
}

/// Team slots keyed by start instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamCalendar {
    granularity: SlotGranularity,
    slots: BTreeMap<DateTime<Utc>, TeamSlot>,
}

/// An event starting and ending on local midnights.
fn is_all_day(interval: &Interval) -> bool {
    interval.local_start().time() == NaiveTime::MIN && interval.local_end().time() == NaiveTime::MIN
}

impl TeamCalendar {
    /// Builds the grid for `days` days from local midnight of `start_day`.
    ///
    /// Only team-blocking events in `team_events` and agent-blocking events in
    /// `member_events` are applied; anything else is ignored.
    pub fn build(
        start_day: DateTime<Tz>,
        days: u32,
        granularity: SlotGranularity,
        members: &[AgentId],
        team_events: &[CalendarEvent],
        member_events: &[CalendarEvent],
    ) -> Result<Self, SlotError> {
        let tz = start_day.timezone();
        let slots = slot_grid(start_day.with_timezone(&Utc), days, granularity, tz)?
            .into_iter()
            .map(|interval| {
                let slot = TeamSlot {
                    interval,
                    available_agents: members.to_vec(),
                    is_team: false,
                    is_all_day: false,
                };
                (interval.start(), slot)
            })
            .collect();
        let mut calendar = Self { granularity, slots };

        for event in team_events.iter().filter(|e| e.kind.is_team_blocking()) {
            calendar.block_for_team(&event.interval.with_timezone(tz));
        }
        for event in member_events.iter().filter(|e| e.kind.blocks_agent()) {
            if let Some(agent) = event.owner_agent() {
                calendar.block_for_agent(agent, &event.interval.with_timezone(tz));
            }
        }

        tracing::debug!(
            slots = calendar.slots.len(),
            members = members.len(),
            %granularity,
            "built team calendar"
        );
        Ok(calendar)
    }

    /// Wraps slots that were computed elsewhere, e.g. by the feed back-end.
    pub fn from_slots(granularity: SlotGranularity, slots: impl IntoIterator<Item = TeamSlot>) -> Self {
        Self {
            granularity,
            slots: slots
                .into_iter()
                .map(|slot| (slot.interval.start(), slot))
                .collect(),
        }
    }

    fn block_for_team(&mut self, interval: &Interval) {
        if is_all_day(interval) {
            self.slots
                .retain(|start, _| !interval.contains(*start));
            self.slots.insert(
                interval.start(),
                TeamSlot {
                    interval: *interval,
                    available_agents: Vec::new(),
                    is_team: true,
                    is_all_day: true,
                },
            );
            return;
        }
        for start in busy_slot_starts(interval, self.granularity) {
            if let Some(slot) = self.slots.get_mut(&start) {
                slot.available_agents.clear();
                slot.is_team = true;
            }
        }
    }

    fn block_for_agent(&mut self, agent: &AgentId, interval: &Interval) {
        for start in busy_slot_starts(interval, self.granularity) {
            if let Some(slot) = self.slots.get_mut(&start) {
                if !slot.is_team {
                    slot.available_agents.retain(|a| a != agent);
                }
            }
        }
    }

    pub const fn granularity(&self) -> SlotGranularity {
        self.granularity
    }

    /// Slots in start order.
    pub fn slots(&self) -> impl Iterator<Item = &TeamSlot> {
        self.slots.values()
    }

    /// The free pool of the slot starting exactly at `start`.
    pub fn available_agents_at(&self, start: DateTime<Utc>) -> Vec<AgentId> {
        self.slots
            .get(&start)
            .filter(|slot| !slot.is_team)
            .map(|slot| slot.available_agents.clone())
            .unwrap_or_default()
    }

    /// Blocked slots as merged [`EventKind::AllAgentsBusy`](crate::EventKind) events.
    ///
    /// Ids are derived from the merged spans, so rebuilding from the same
    /// slots yields the same ids.
    pub fn busy_events(&self, team: &TeamId, now: DateTime<Utc>) -> Vec<CalendarEvent> {
        let busy = self
            .slots()
            .filter(|slot| slot.is_blocked())
            .map(|slot| CalendarEvent::all_agents_busy(team.clone(), slot.interval, now));
        merge_contiguous(busy, now)
            .into_iter()
            .map(|block| CalendarEvent::all_agents_busy(team.clone(), block.interval, now))
            .collect()
    }
}
