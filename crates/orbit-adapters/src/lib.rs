//! Entity mappers: one per syncable kind, turning a raw source item into a typed
//! candidate plus the embedded references that still need resolving.

use orbit_core::{Candidate, EntityKind, RelationField};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

mod crew;
mod docking;
mod launch;
mod leaf;
pub mod source;

pub use crew::{map_astronaut_status, AstronautMapper, ExpeditionMapper, SpacewalkMapper};
pub use docking::{DockingEventMapper, DockingLocationMapper};
pub use launch::LaunchMapper;
pub use leaf::{
    AgencyMapper, LandingMapper, PadMapper, PayloadMapper, ProgramMapper, RocketMapper,
    StationMapper,
};

pub const CRATE_NAME: &str = "orbit-adapters";

#[derive(Debug, Error)]
pub enum MapError {
    #[error("malformed {kind} item: {message}")]
    Malformed { kind: EntityKind, message: String },
}

/// How the resolver finds a referenced record.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    ApiId(i64),
    /// Exact match on the `name` field.
    Name(String),
}

/// A reference to a secondary entity embedded in a primary item.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub kind: EntityKind,
    pub lookup: Lookup,
    /// Minimal record built from the embedding item; created when the lookup misses.
    /// `None` means a miss leaves the relation empty.
    pub seed: Option<Candidate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationSlot {
    pub field: RelationField,
    pub reference: Reference,
    /// An unresolved required relation drops the whole item.
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappedItem {
    pub candidate: Candidate,
    pub relations: Vec<RelationSlot>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mapped {
    Item(MappedItem),
    /// Filtered out before any store call; carries the reason for the log line.
    Skip(String),
}

impl Mapped {
    pub fn item(candidate: Candidate) -> Self {
        Mapped::Item(MappedItem {
            candidate,
            relations: Vec::new(),
        })
    }
}

pub trait EntityMapper: Send + Sync {
    fn kind(&self) -> EntityKind;

    fn map(&self, raw: &JsonValue) -> Result<Mapped, MapError>;
}

pub(crate) fn decode<T: DeserializeOwned>(kind: EntityKind, raw: &JsonValue) -> Result<T, MapError> {
    T::deserialize(raw).map_err(|err| MapError::Malformed {
        kind,
        message: err.to_string(),
    })
}

/// Mapper for a kind that has its own source listing. Missions only arrive
/// embedded in launches.
pub fn mapper_for(kind: EntityKind) -> Option<Box<dyn EntityMapper>> {
    match kind {
        EntityKind::Launch => Some(Box::new(LaunchMapper)),
        EntityKind::Agency => Some(Box::new(AgencyMapper)),
        EntityKind::Rocket => Some(Box::new(RocketMapper)),
        EntityKind::Pad => Some(Box::new(PadMapper)),
        EntityKind::Station => Some(Box::new(StationMapper)),
        EntityKind::Astronaut => Some(Box::new(AstronautMapper)),
        EntityKind::Program => Some(Box::new(ProgramMapper)),
        EntityKind::Payload => Some(Box::new(PayloadMapper)),
        EntityKind::Expedition => Some(Box::new(ExpeditionMapper)),
        EntityKind::Spacewalk => Some(Box::new(SpacewalkMapper)),
        EntityKind::DockingEvent => Some(Box::new(DockingEventMapper)),
        EntityKind::DockingLocation => Some(Box::new(DockingLocationMapper)),
        EntityKind::Landing => Some(Box::new(LandingMapper)),
        EntityKind::Mission => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_listed_kind_has_a_matching_mapper() {
        for kind in EntityKind::ALL {
            match mapper_for(kind) {
                Some(mapper) => assert_eq!(mapper.kind(), kind),
                None => assert_eq!(kind, EntityKind::Mission),
            }
        }
    }

    #[test]
    fn wrongly_typed_item_is_malformed() {
        let mapper = mapper_for(EntityKind::Agency).expect("agency mapper");
        let err = mapper.map(&json!({"id": "not-a-number"})).expect_err("malformed");
        assert!(matches!(err, MapError::Malformed { kind: EntityKind::Agency, .. }));
    }
}
