//! Availability evaluation for a requested slot.
//!
//! [`AvailabilityEngine::evaluate`] is a pure function of the request and
//! the event snapshot handed in. It never reads the clock and never fetches
//! data; keeping the snapshot fresh is the caller's job.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::event::{CalendarEvent, Owner};
use crate::interval::Interval;
use crate::overlap::{any_overlapping, find_overlapping};
use crate::resolver::{AgentSuggestion, LeastBookedResolver, NextAgentResolver, resolve_checked};
use crate::slot::SlotGranularity;
use crate::types::{AgentId, TeamId};

/// The calendar a slot is booked against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Resource {
    Agent(AgentId),
    Team(TeamId),
}

impl Resource {
    pub const fn is_team(&self) -> bool {
        matches!(self, Self::Team(_))
    }

    /// Slot length used when booking against this resource.
    pub const fn granularity(&self, settings: &EngineSettings) -> SlotGranularity {
        match self {
            Self::Agent(_) => SlotGranularity::AGENT,
            Self::Team(_) => settings.team_slot,
        }
    }

    /// Whether `event` belongs on this resource's calendar.
    fn owns(&self, event: &CalendarEvent) -> bool {
        match (self, &event.owner) {
            (Self::Agent(agent), Owner::Agent(owner)) => agent == owner,
            (Self::Team(team), Owner::Team(owner)) => {
                team == owner && event.kind.is_team_blocking()
            }
            _ => false,
        }
    }
}

/// Per-property settings the engine consumes but does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Team-mode slot granularity.
    pub team_slot: SlotGranularity,
    /// "Complete" mode: a tour type is required before submitting.
    pub require_tour_type: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            team_slot: SlotGranularity::TEAM_DEFAULT,
            require_tour_type: true,
        }
    }
}

/// One user interaction asking whether a slot can be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRequest {
    pub interval: Interval,
    pub resource: Resource,
}

impl SlotRequest {
    pub const fn new(interval: Interval, resource: Resource) -> Self {
        Self { interval, resource }
    }
}

/// The engine's verdict on a requested slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDecision {
    pub interval: Interval,
    pub has_overlap: bool,
    pub overlapping_events: Vec<CalendarEvent>,
    /// Agents free in the window. Empty in agent mode.
    pub candidate_agents: Vec<AgentId>,
    /// Resolver outcome. Only present in team mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_suggestion: Option<AgentSuggestion>,
}

impl SlotDecision {
    pub fn suggested_agent_id(&self) -> Option<&AgentId> {
        self.agent_suggestion.as_ref().and_then(AgentSuggestion::agent)
    }

    /// True in team mode when no agent could be picked automatically.
    pub fn requires_manual_agent(&self) -> bool {
        matches!(
            self.agent_suggestion,
            Some(AgentSuggestion::ManualSelectionRequired)
        )
    }
}

/// Turns a calendar snapshot plus a requested slot into a [`SlotDecision`].
#[derive(Debug, Clone, Default)]
pub struct AvailabilityEngine<R = LeastBookedResolver> {
    resolver: R,
    rosters: HashMap<TeamId, Vec<AgentId>>,
}

impl<R: NextAgentResolver> AvailabilityEngine<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            rosters: HashMap::new(),
        }
    }

    /// Registers the agents that can take appointments for `team`.
    #[must_use]
    pub fn with_roster(mut self, team: TeamId, members: Vec<AgentId>) -> Self {
        self.rosters.insert(team, members);
        self
    }

    pub fn roster(&self, team: &TeamId) -> &[AgentId] {
        self.rosters.get(team).map_or(&[], Vec::as_slice)
    }

    /// Members of `team` with no appointment or personal event in `window`.
    pub fn free_agents(
        &self,
        team: &TeamId,
        window: &Interval,
        events: &[CalendarEvent],
    ) -> Vec<AgentId> {
        self.roster(team)
            .iter()
            .filter(|agent| {
                let own = events
                    .iter()
                    .filter(|e| e.kind.blocks_agent() && e.owner_agent() == Some(*agent));
                !any_overlapping(window, own)
            })
            .cloned()
            .collect()
    }

    /// Evaluates `request` against `events`.
    ///
    /// An empty snapshot never reports a conflict. In team mode the
    /// candidate pool is derived from the registered roster.
    pub fn evaluate(&self, request: &SlotRequest, events: &[CalendarEvent]) -> SlotDecision {
        let candidates = match &request.resource {
            Resource::Team(team) => self.free_agents(team, &request.interval, events),
            Resource::Agent(_) => Vec::new(),
        };
        self.evaluate_with_candidates(request, events, candidates)
    }

    /// Like [`evaluate`](Self::evaluate), with the team-mode pool supplied
    /// by the caller (e.g. from a team slot feed). Ignored in agent mode.
    pub fn evaluate_with_candidates(
        &self,
        request: &SlotRequest,
        events: &[CalendarEvent],
        candidates: Vec<AgentId>,
    ) -> SlotDecision {
        let resource = &request.resource;
        let window = &request.interval;

        let overlapping_events =
            find_overlapping(window, events.iter().filter(|e| resource.owns(e)));
        let has_overlap = !overlapping_events.is_empty();

        let (candidate_agents, agent_suggestion) = match resource {
            Resource::Team(team) => {
                let suggestion = resolve_checked(&self.resolver, team, window, &candidates);
                (candidates, Some(suggestion))
            }
            Resource::Agent(_) => (Vec::new(), None),
        };

        tracing::debug!(
            %window,
            team_mode = resource.is_team(),
            snapshot = events.len(),
            overlaps = overlapping_events.len(),
            pool = candidate_agents.len(),
            "evaluated slot"
        );

        SlotDecision {
            interval: *window,
            has_overlap,
            overlapping_events,
            candidate_agents,
            agent_suggestion,
        }
    }
}
