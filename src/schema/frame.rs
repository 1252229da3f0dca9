use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::entity::{Entity, Location, TimeSpan, Value};

/// A birth or death: when and where, both optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifeEvent {
    #[serde(default)]
    pub time: Option<TimeSpan>,
    #[serde(default)]
    pub place: Option<Location>,
}

impl LifeEvent {
    pub fn is_empty(&self) -> bool {
        self.place.is_none() && self.time.as_ref().and_then(TimeSpan::precision).is_none()
    }
}

/// Biographical summary of one person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioFrame {
    pub main_entity: Entity,
    #[serde(default)]
    pub profession_lemmas: Vec<String>,
    #[serde(default)]
    pub nationality_lemmas: Vec<String>,
    #[serde(default)]
    pub birth_event: Option<LifeEvent>,
    #[serde(default)]
    pub death_event: Option<LifeEvent>,
}

/// Something that happened, with participants keyed by semantic role
/// (`subject`, `object`, `possessor`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    pub event_type: String,
    #[serde(default)]
    pub participants: BTreeMap<String, Entity>,
    #[serde(default)]
    pub time: Option<TimeSpan>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

/// The semantic input of one render call. Immutable for the duration of
/// the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    Bio(BioFrame),
    Event(EventFrame),
}

/// Frame discriminant used by construction selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Bio,
    Event,
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Bio(_) => FrameKind::Bio,
            Self::Event(_) => FrameKind::Event,
        }
    }

    pub fn event_type(&self) -> Option<&str> {
        match self {
            Self::Bio(_) => None,
            Self::Event(e) => Some(&e.event_type),
        }
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bio => write!(f, "bio"),
            Self::Event => write!(f, "event"),
        }
    }
}
