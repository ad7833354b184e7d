//! Selection of the agent who takes a team-booked appointment.
//!
//! The engine only depends on [`NextAgentResolver`]. The ranking rule behind
//! it belongs to the routing policy of the deployment; [`LeastBookedResolver`]
//! is the stock policy used when nothing else is plugged in.

use std::collections::HashMap;

use serde::Serialize;

use crate::event::CalendarEvent;
use crate::event_kind::EventKind;
use crate::interval::Interval;
use crate::types::{AgentId, TeamId};

/// Port for choosing one agent out of the agents free in a window.
///
/// Implementations must return `None` for an empty pool and, when they
/// return an agent, it must be one of `candidates`.
pub trait NextAgentResolver {
    fn resolve(&self, team: &TeamId, window: &Interval, candidates: &[AgentId])
    -> Option<AgentId>;
}

impl<F> NextAgentResolver for F
where
    F: Fn(&TeamId, &Interval, &[AgentId]) -> Option<AgentId>,
{
    fn resolve(
        &self,
        team: &TeamId,
        window: &Interval,
        candidates: &[AgentId],
    ) -> Option<AgentId> {
        self(team, window, candidates)
    }
}

/// Outcome of asking the resolver for an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "agentId", rename_all = "camelCase")]
pub enum AgentSuggestion {
    /// The resolver picked this agent from the pool.
    Suggested(AgentId),
    /// Nobody could be picked; the user has to choose an agent by hand.
    ManualSelectionRequired,
}

impl AgentSuggestion {
    pub const fn agent(&self) -> Option<&AgentId> {
        match self {
            Self::Suggested(agent) => Some(agent),
            Self::ManualSelectionRequired => None,
        }
    }
}

/// Invokes `resolver` and enforces the port contract.
///
/// An empty pool short-circuits to manual selection. A result outside the
/// pool is discarded rather than trusted.
pub fn resolve_checked<R>(
    resolver: &R,
    team: &TeamId,
    window: &Interval,
    candidates: &[AgentId],
) -> AgentSuggestion
where
    R: NextAgentResolver + ?Sized,
{
    if candidates.is_empty() {
        tracing::debug!(%team, %window, "no free agents in window");
        return AgentSuggestion::ManualSelectionRequired;
    }

    match resolver.resolve(team, window, candidates) {
        Some(agent) if candidates.contains(&agent) => {
            tracing::debug!(%team, %agent, pool = candidates.len(), "resolved next agent");
            AgentSuggestion::Suggested(agent)
        }
        Some(agent) => {
            tracing::warn!(%team, %agent, "resolver returned an agent outside the free pool");
            AgentSuggestion::ManualSelectionRequired
        }
        None => {
            tracing::debug!(%team, pool = candidates.len(), "resolver declined to pick an agent");
            AgentSuggestion::ManualSelectionRequired
        }
    }
}

/// Picks the candidate with the fewest appointments on the window's local day.
///
/// Ties go to the candidate listed first.
#[derive(Debug, Clone, Default)]
pub struct LeastBookedResolver {
    bookings: HashMap<AgentId, Vec<Interval>>,
}

impl LeastBookedResolver {
    /// Builds the booking index from the appointment events in a snapshot.
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a CalendarEvent>,
    {
        let mut bookings: HashMap<AgentId, Vec<Interval>> = HashMap::new();
        for event in events {
            if event.kind != EventKind::Appointment {
                continue;
            }
            if let Some(agent) = event.owner_agent() {
                bookings
                    .entry(agent.clone())
                    .or_default()
                    .push(event.interval);
            }
        }
        Self { bookings }
    }

    /// Number of appointments `agent` has starting inside `day`.
    pub fn booked_on(&self, agent: &AgentId, day: &Interval) -> usize {
        self.bookings.get(agent).map_or(0, |intervals| {
            intervals
                .iter()
                .filter(|i| day.contains(i.start()))
                .count()
        })
    }
}

impl NextAgentResolver for LeastBookedResolver {
    fn resolve(
        &self,
        _team: &TeamId,
        window: &Interval,
        candidates: &[AgentId],
    ) -> Option<AgentId> {
        let day = window.local_day();
        candidates
            .iter()
            .min_by_key(|agent| self.booked_on(agent, &day))
            .cloned()
    }
}
