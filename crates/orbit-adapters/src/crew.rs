//! People and the station expeditions they fly on.

use orbit_core::{
    normalize_key, AstronautRecord, Candidate, EntityKind, ExpeditionRecord, RelationField,
    SpacewalkRecord,
};
use serde_json::Value as JsonValue;

use crate::leaf::{
    api_id, first_of, flexible, image_url, missing_id, station_record, text, timestamp,
};
use crate::source::{SourceAstronaut, SourceExpedition, SourceNationality, SourceSpacewalk};
use crate::{decode, EntityMapper, Lookup, MapError, Mapped, MappedItem, Reference, RelationSlot};

const EARTHLING: &str = "earthling";
const UNKNOWN_NATIONALITY: &str = "Unknown";

/// Collapses the source's status vocabulary to `Active` / `Retired`.
pub fn map_astronaut_status(raw: &str) -> &'static str {
    match normalize_key(raw).as_str() {
        "retired" | "deceased" => "Retired",
        _ => "Active",
    }
}

fn is_earthling(nationality: &Option<SourceNationality>) -> bool {
    match nationality {
        Some(SourceNationality::Text(text)) => normalize_key(text) == EARTHLING,
        Some(SourceNationality::Countries(countries)) => countries.iter().any(|c| {
            [&c.nationality_name, &c.name]
                .into_iter()
                .any(|n| n.as_deref().is_some_and(|n| normalize_key(n) == EARTHLING))
        }),
        None => false,
    }
}

pub(crate) fn nationality(value: &Option<SourceNationality>) -> String {
    let found = match value {
        Some(SourceNationality::Text(text)) => text.clone(),
        Some(SourceNationality::Countries(countries)) => countries
            .first()
            .map(|c| first_of(&[text(&c.nationality_name), text(&c.name)]))
            .unwrap_or_default(),
        None => String::new(),
    };
    if found.trim().is_empty() {
        UNKNOWN_NATIONALITY.to_string()
    } else {
        found
    }
}

pub(crate) fn profile_image(astronaut: &SourceAstronaut) -> String {
    first_of(&[text(&astronaut.profile_image), image_url(&astronaut.image)])
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AstronautMapper;

impl EntityMapper for AstronautMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::Astronaut
    }

    fn map(&self, raw: &JsonValue) -> Result<Mapped, MapError> {
        let a: SourceAstronaut = decode(EntityKind::Astronaut, raw)?;
        if is_earthling(&a.nationality) {
            return Ok(Mapped::Skip(format!("earthling record {}", text(&a.name))));
        }
        if api_id(a.id).is_none() {
            return Ok(missing_id(EntityKind::Astronaut));
        }

        let agency = a.agency.clone().unwrap_or_default();
        Ok(Mapped::item(Candidate::Astronaut(AstronautRecord {
            api_id: a.id.unwrap_or_default(),
            name: text(&a.name),
            role: flexible(&a.role),
            status: map_astronaut_status(&flexible(&a.status)).to_string(),
            in_space: a.in_space.unwrap_or_default(),
            eva_time_total: text(&a.eva_time),
            space_time_total: text(&a.time_in_space),
            dob: text(&a.date_of_birth),
            date_of_death: text(&a.date_of_death),
            nationality: nationality(&a.nationality),
            first_flight: timestamp(&a.first_flight),
            last_flight: timestamp(&a.last_flight),
            flights_count: a.flights_count.unwrap_or_default(),
            landings_count: a.landings_count.unwrap_or_default(),
            spacewalks_count: a.spacewalks_count.unwrap_or_default(),
            is_human: a.is_human.unwrap_or_default(),
            bio: text(&a.bio),
            wikipedia_url: text(&a.wiki),
            profile_image: profile_image(&a),
            agency_name: text(&agency.name),
            agency_type: flexible(&agency.agency_type),
        })))
    }
}

/// Station is resolved by name and created from the embedded object when
/// missing; crew members are linked only when already mirrored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpeditionMapper;

impl EntityMapper for ExpeditionMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::Expedition
    }

    fn map(&self, raw: &JsonValue) -> Result<Mapped, MapError> {
        let e: SourceExpedition = decode(EntityKind::Expedition, raw)?;
        if api_id(e.id).is_none() {
            return Ok(missing_id(EntityKind::Expedition));
        }

        let mut relations = Vec::new();
        if let Some(station) = &e.spacestation {
            let name = text(&station.name);
            if !name.trim().is_empty() {
                relations.push(RelationSlot {
                    field: RelationField::Station,
                    reference: Reference {
                        kind: EntityKind::Station,
                        lookup: Lookup::Name(name),
                        seed: api_id(station.id)
                            .map(|_| Candidate::Station(station_record(station))),
                    },
                    required: false,
                });
            }
        }
        for member in &e.crew {
            let name = member
                .astronaut
                .as_ref()
                .map(|a| text(&a.name))
                .unwrap_or_default();
            if name.trim().is_empty() {
                continue;
            }
            relations.push(RelationSlot {
                field: RelationField::Crew,
                reference: Reference {
                    kind: EntityKind::Astronaut,
                    lookup: Lookup::Name(name),
                    seed: None,
                },
                required: false,
            });
        }

        let record = ExpeditionRecord {
            api_id: e.id.unwrap_or_default(),
            name: text(&e.name),
            start_date: timestamp(&e.start),
            end_date: timestamp(&e.end),
            url: text(&e.url),
            patches: e
                .mission_patches
                .first()
                .map(|p| text(&p.image_url))
                .unwrap_or_default(),
            station: None,
            crew: Vec::new(),
        };
        Ok(Mapped::Item(MappedItem {
            candidate: Candidate::Expedition(record),
            relations,
        }))
    }
}

/// A spacewalk is only kept when its expedition is already mirrored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpacewalkMapper;

impl EntityMapper for SpacewalkMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::Spacewalk
    }

    fn map(&self, raw: &JsonValue) -> Result<Mapped, MapError> {
        let s: SourceSpacewalk = decode(EntityKind::Spacewalk, raw)?;
        if api_id(s.id).is_none() {
            return Ok(missing_id(EntityKind::Spacewalk));
        }
        let expedition = s.expedition.clone().unwrap_or_default();
        let Some(expedition_id) = api_id(expedition.id) else {
            return Ok(Mapped::Skip(format!(
                "spacewalk {} has no expedition",
                text(&s.name)
            )));
        };

        let record = SpacewalkRecord {
            api_id: s.id.unwrap_or_default(),
            name: text(&s.name),
            slug: text(&s.slug),
            url: text(&s.url),
            location: text(&s.location),
            start_time: timestamp(&s.start),
            end_time: timestamp(&s.end),
            duration: text(&s.duration),
            event_id: s.event.as_ref().and_then(|e| e.id).unwrap_or_default(),
            expedition_name: text(&expedition.name),
            expedition: None,
        };
        Ok(Mapped::Item(MappedItem {
            candidate: Candidate::Spacewalk(record),
            relations: vec![RelationSlot {
                field: RelationField::Expedition,
                reference: Reference {
                    kind: EntityKind::Expedition,
                    lookup: Lookup::ApiId(expedition_id),
                    seed: None,
                },
                required: true,
            }],
        }))
    }
}
