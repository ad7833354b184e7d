//! Calendar event kinds as the single source of truth for kind strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::ValidationError;

/// What a calendar event represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A booked appointment of the agent.
    Appointment,
    /// A personal event or sick leave of the agent.
    Personal,
    /// A team-wide unavailability window.
    Team,
    /// Synthetic: no team member can be booked in this window.
    AllAgentsBusy,
}

impl EventKind {
    /// Kinds that block a whole team rather than a single agent.
    pub const fn is_team_blocking(self) -> bool {
        matches!(self, Self::Team | Self::AllAgentsBusy)
    }

    /// Kinds that make the owning agent unavailable.
    pub const fn blocks_agent(self) -> bool {
        matches!(self, Self::Appointment | Self::Personal)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Appointment => "Appointment",
            Self::Personal => "Personal",
            Self::Team => "Team",
            Self::AllAgentsBusy => "All agents busy",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Appointment" => Ok(Self::Appointment),
            "Personal" => Ok(Self::Personal),
            "Team" => Ok(Self::Team),
            "All agents busy" => Ok(Self::AllAgentsBusy),
            _ => Err(ValidationError::UnknownEventKind {
                value: s.to_string(),
            }),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
