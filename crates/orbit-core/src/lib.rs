//! Core domain model for the Orbit mirror: entity kinds, identity keys and the
//! typed attribute records written into the local record store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod records;

pub use records::*;

pub const CRATE_NAME: &str = "orbit-core";

/// Field holding the source-assigned natural key on every `api_id`-keyed collection.
pub const API_ID_FIELD: &str = "api_id";

/// Opaque identifier assigned by the record store at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every entity kind mirrored from the source API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Launch,
    Agency,
    Rocket,
    Pad,
    Mission,
    Station,
    Astronaut,
    Program,
    Payload,
    Expedition,
    Spacewalk,
    DockingEvent,
    DockingLocation,
    Landing,
}

impl EntityKind {
    pub const ALL: [EntityKind; 14] = [
        EntityKind::Launch,
        EntityKind::Agency,
        EntityKind::Rocket,
        EntityKind::Pad,
        EntityKind::Mission,
        EntityKind::Station,
        EntityKind::Astronaut,
        EntityKind::Program,
        EntityKind::Payload,
        EntityKind::Expedition,
        EntityKind::Spacewalk,
        EntityKind::DockingEvent,
        EntityKind::DockingLocation,
        EntityKind::Landing,
    ];

    /// Store collection holding records of this kind.
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Launch => "events",
            EntityKind::Agency => "agencies",
            EntityKind::Rocket => "rockets",
            EntityKind::Pad => "pads",
            EntityKind::Mission => "missions",
            EntityKind::Station => "stations",
            EntityKind::Astronaut => "astronauts",
            EntityKind::Program => "programs",
            EntityKind::Payload => "payloads",
            EntityKind::Expedition => "expeditions",
            EntityKind::Spacewalk => "spacewalks",
            EntityKind::DockingEvent => "docking_events",
            EntityKind::DockingLocation => "docking_locations",
            EntityKind::Landing => "landings",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Launch => "launch",
            EntityKind::Agency => "agency",
            EntityKind::Rocket => "rocket",
            EntityKind::Pad => "pad",
            EntityKind::Mission => "mission",
            EntityKind::Station => "station",
            EntityKind::Astronaut => "astronaut",
            EntityKind::Program => "program",
            EntityKind::Payload => "payload",
            EntityKind::Expedition => "expedition",
            EntityKind::Spacewalk => "spacewalk",
            EntityKind::DockingEvent => "docking_event",
            EntityKind::DockingLocation => "docking_location",
            EntityKind::Landing => "landing",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity kind `{0}`")]
pub struct UnknownEntityKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_key(s).replace('-', "_");
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted || kind.collection() == wanted)
            .ok_or_else(|| UnknownEntityKind(s.to_string()))
    }
}

/// How the upserter decides whether a candidate already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityKey {
    /// Exact match on the source-assigned `api_id`.
    ApiId(i64),
    /// Trim + lowercase equality on a text field. Weaker than `ApiId`: two distinct
    /// entities sharing a normalized value collapse into one record.
    Normalized { field: &'static str, value: String },
}

impl IdentityKey {
    pub fn normalized(field: &'static str, raw: &str) -> Self {
        IdentityKey::Normalized {
            field,
            value: normalize_key(raw),
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::ApiId(id) => write!(f, "{API_ID_FIELD}={id}"),
            IdentityKey::Normalized { field, value } => write!(f, "{field}~{value:?}"),
        }
    }
}

/// Trim-and-lowercase transform used wherever a text field stands in for identity.
pub fn normalize_key(input: &str) -> String {
    input.trim().to_lowercase()
}
