//! Identifier newtypes and small validated enums shared across the engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Unknown calendar event kind.
    #[error("unknown event kind: {value}")]
    UnknownEventKind { value: String },

    /// Unknown tour type.
    #[error("unknown tour type: {value}")]
    UnknownTourType { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated calendar event identifier.
    EventId, "event ID"
);

impl EventId {
    /// A stable id for a synthetic event, derived from `key`.
    ///
    /// Equal keys always give equal ids.
    pub fn derived(key: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string())
    }
}

define_string_id!(
    /// A validated leasing agent identifier.
    AgentId, "agent ID"
);

define_string_id!(
    /// A validated team identifier.
    TeamId, "team ID"
);

define_string_id!(
    /// A validated party member identifier.
    ///
    /// Party members are the guests attending a tour.
    PartyMemberId, "party member ID"
);

define_string_id!(
    /// A validated inventory unit identifier.
    UnitId, "unit ID"
);

define_string_id!(
    /// A validated appointment identifier, present only for stored appointments.
    AppointmentId, "appointment ID"
);

/// The kind of tour an appointment represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TourType {
    VirtualTour,
    InPersonTour,
    AgentlessTour,
    InPersonSelfGuidedTour,
    LeasingAppointment,
    /// Only carried by appointments that came in through an import.
    ImportedTour,
}

impl TourType {
    /// Tour types that may be offered in a dropdown, in display order.
    pub const SELECTABLE: [Self; 5] = [
        Self::VirtualTour,
        Self::InPersonTour,
        Self::AgentlessTour,
        Self::InPersonSelfGuidedTour,
        Self::LeasingAppointment,
    ];

    /// Canonical string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VirtualTour => "virtualTour",
            Self::InPersonTour => "inPersonTour",
            Self::AgentlessTour => "agentlessTour",
            Self::InPersonSelfGuidedTour => "inPersonSelfGuidedTour",
            Self::LeasingAppointment => "leasingAppointment",
            Self::ImportedTour => "importedTour",
        }
    }

    /// Whether the tour type can be picked by a user.
    #[must_use]
    pub const fn is_selectable(&self) -> bool {
        !matches!(self, Self::ImportedTour)
    }
}

impl fmt::Display for TourType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TourType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "virtualTour" => Ok(Self::VirtualTour),
            "inPersonTour" => Ok(Self::InPersonTour),
            "agentlessTour" => Ok(Self::AgentlessTour),
            "inPersonSelfGuidedTour" => Ok(Self::InPersonSelfGuidedTour),
            "leasingAppointment" => Ok(Self::LeasingAppointment),
            "importedTour" => Ok(Self::ImportedTour),
            _ => Err(ValidationError::UnknownTourType {
                value: s.to_string(),
            }),
        }
    }
}

impl Serialize for TourType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TourType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
