//! Typed attribute records, one per entity kind, and the `Candidate` wrapper that
//! forms the serialization boundary towards the record store.
//!
//! Text and numeric attributes always carry a value (placeholders for absent source
//! fields). Relation fields are `None` until resolved and are omitted from the
//! serialized body while empty.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{EntityKind, IdentityKey, RecordId};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgencyRecord {
    pub api_id: i64,
    pub name: String,
    pub abbrev: String,
    pub type_name: String,
    pub description: String,
    pub administrator: String,
    pub founding_year: String,
    pub launchers: String,
    pub spacecraft: String,
    pub featured: bool,
    pub url: String,
    pub country_name: String,
    pub country_code: String,
    pub nationality_name: String,
    pub logo_url: String,
    pub social_logo_url: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RocketRecord {
    pub api_id: i64,
    pub name: String,
    pub full_name: String,
    pub variant: String,
    pub family: String,
    pub reusable: bool,
    pub description: String,
    pub manufacturer: String,
    pub image_url: String,
    pub info_url: String,
    pub wiki_url: String,
    pub total_launch_count: i64,
    pub successful_launches: i64,
    pub failed_launches: i64,
    pub pending_launches: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PadRecord {
    pub api_id: i64,
    pub name: String,
    pub description: String,
    pub latitude: String,
    pub longitude: String,
    pub country_code: String,
    pub location_name: String,
    pub map_url: String,
    pub wiki_url: String,
    pub map_image: String,
    pub total_launch_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MissionRecord {
    pub api_id: i64,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub mission_type: String,
    pub orbit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StationRecord {
    pub api_id: i64,
    pub name: String,
    pub status: String,
    #[serde(rename = "type")]
    pub station_type: String,
    pub orbit: String,
    pub url: String,
    pub description: String,
    pub founded: String,
}

/// Agency is kept as text on astronauts, never as a relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AstronautRecord {
    pub api_id: i64,
    pub name: String,
    pub role: String,
    pub status: String,
    pub in_space: bool,
    pub eva_time_total: String,
    pub space_time_total: String,
    pub dob: String,
    pub date_of_death: String,
    pub nationality: String,
    pub first_flight: String,
    pub last_flight: String,
    pub flights_count: i64,
    pub landings_count: i64,
    pub spacewalks_count: i64,
    pub is_human: bool,
    pub bio: String,
    pub wikipedia_url: String,
    pub profile_image: String,
    pub agency_name: String,
    pub agency_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgramRecord {
    pub api_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub program_type: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub info_url: String,
    pub wiki_url: String,
    pub image_url: String,
    pub image_thumb_url: String,
    pub api_url: String,
}

/// Operator agency details are flattened to text columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PayloadRecord {
    pub api_id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub serial_number: String,
    pub nationality: String,
    pub orbit: String,
    pub mass: f64,
    pub mass_unit: String,
    pub reusable: bool,
    pub spacecraft: String,
    pub spacecraft_config: String,
    pub spacecraft_flight: String,
    pub operator_name: String,
    pub operator_country: String,
    pub operator_logo_url: String,
    pub image_url: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkSummary {
    pub title: String,
    pub url: String,
    pub priority: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimelineSummary {
    pub time: String,
    pub event: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrewSummary {
    pub astronaut_id: i64,
    pub name: String,
    pub role: String,
    pub role_priority: i64,
    pub nationality: String,
    pub agency: String,
    pub profile_image: String,
}

/// A launch mirrored into the `events` collection. Identity is the normalized title.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LaunchRecord {
    pub title: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub launch_id: String,
    pub datetime: String,
    pub window_start: String,
    pub window_end: String,
    pub location: String,
    pub source_url: String,
    pub description: String,
    pub image: String,
    pub infographic: String,
    pub webcast_live: bool,
    pub status_abbrev: String,
    pub status_description: String,
    pub rocket_name: String,
    pub rocket_full_name: String,
    pub rocket_total_launches: i64,
    pub rocket_successful_launches: i64,
    pub rocket_failed_launches: i64,
    pub rocket_pending_launches: i64,
    pub launcher_serial_number: String,
    pub launcher_flight_number: i64,
    pub launcher_reused: bool,
    pub launcher_flights: i64,
    pub launcher_status: String,
    pub landing_attempt: bool,
    pub landing_success: bool,
    pub landing_location: String,
    pub landing_type: String,
    pub program_names: String,
    pub program_descriptions: String,
    pub program_image_urls: String,
    pub crew_members: Vec<CrewSummary>,
    pub vid_urls: Vec<LinkSummary>,
    pub info_urls: Vec<LinkSummary>,
    pub timeline: Vec<TimelineSummary>,
    pub orbital_launch_attempt_count: i64,
    pub location_launch_attempt_count: i64,
    pub pad_launch_attempt_count: i64,
    pub agency_launch_attempt_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rocket_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pad_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission_id: Option<RecordId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpeditionRecord {
    pub api_id: i64,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    pub url: String,
    pub patches: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station: Option<RecordId>,
    pub crew: Vec<RecordId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpacewalkRecord {
    pub api_id: i64,
    pub name: String,
    pub slug: String,
    pub url: String,
    pub location: String,
    pub start_time: String,
    pub end_time: String,
    pub duration: String,
    pub event_id: i64,
    pub expedition_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expedition: Option<RecordId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DockingEventRecord {
    pub api_id: i64,
    pub docking_time: String,
    pub departure_time: String,
    pub location_name: String,
    pub location_payload_name: String,
    pub location_operator: String,
    pub location_image_url: String,
    pub chaser_payload_name: String,
    pub chaser_operator: String,
    pub chaser_image_url: String,
    pub chaser_launch_id: String,
    pub chaser_launch_name: String,
    pub target_payload_name: String,
    pub target_operator: String,
    pub target_image_url: String,
    pub target_launch_id: String,
    pub target_launch_name: String,
    pub details: String,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docking_location: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chaser_payload: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_payload: Option<RecordId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DockingLocationRecord {
    pub api_id: i64,
    pub name: String,
    pub station_url: String,
    pub image_url: String,
    pub image_credit: String,
    pub license_name: String,
    pub license_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<RecordId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LandingRecord {
    pub api_id: i64,
    pub attempt: bool,
    pub success: bool,
    pub description: String,
    pub downrange_distance: f64,
    pub location_name: String,
    pub location_abbrev: String,
    pub landing_type: String,
    pub landing_type_abbrev: String,
}

/// Relation slots a resolved identifier can be written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationField {
    Provider,
    Rocket,
    Pad,
    Mission,
    Station,
    Crew,
    Expedition,
    DockingLocation,
    Payload,
    ChaserPayload,
    TargetPayload,
}

/// One candidate record of any kind, ready to be upserted.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Launch(LaunchRecord),
    Agency(AgencyRecord),
    Rocket(RocketRecord),
    Pad(PadRecord),
    Mission(MissionRecord),
    Station(StationRecord),
    Astronaut(AstronautRecord),
    Program(ProgramRecord),
    Payload(PayloadRecord),
    Expedition(ExpeditionRecord),
    Spacewalk(SpacewalkRecord),
    DockingEvent(DockingEventRecord),
    DockingLocation(DockingLocationRecord),
    Landing(LandingRecord),
}

impl Candidate {
    pub fn kind(&self) -> EntityKind {
        match self {
            Candidate::Launch(_) => EntityKind::Launch,
            Candidate::Agency(_) => EntityKind::Agency,
            Candidate::Rocket(_) => EntityKind::Rocket,
            Candidate::Pad(_) => EntityKind::Pad,
            Candidate::Mission(_) => EntityKind::Mission,
            Candidate::Station(_) => EntityKind::Station,
            Candidate::Astronaut(_) => EntityKind::Astronaut,
            Candidate::Program(_) => EntityKind::Program,
            Candidate::Payload(_) => EntityKind::Payload,
            Candidate::Expedition(_) => EntityKind::Expedition,
            Candidate::Spacewalk(_) => EntityKind::Spacewalk,
            Candidate::DockingEvent(_) => EntityKind::DockingEvent,
            Candidate::DockingLocation(_) => EntityKind::DockingLocation,
            Candidate::Landing(_) => EntityKind::Landing,
        }
    }

    pub fn identity(&self) -> IdentityKey {
        match self {
            Candidate::Launch(r) => IdentityKey::normalized("title", &r.title),
            Candidate::Agency(r) => IdentityKey::ApiId(r.api_id),
            Candidate::Rocket(r) => IdentityKey::ApiId(r.api_id),
            Candidate::Pad(r) => IdentityKey::ApiId(r.api_id),
            Candidate::Mission(r) => IdentityKey::ApiId(r.api_id),
            Candidate::Station(r) => IdentityKey::ApiId(r.api_id),
            Candidate::Astronaut(r) => IdentityKey::ApiId(r.api_id),
            Candidate::Program(r) => IdentityKey::ApiId(r.api_id),
            Candidate::Payload(r) => IdentityKey::ApiId(r.api_id),
            Candidate::Expedition(r) => IdentityKey::ApiId(r.api_id),
            Candidate::Spacewalk(r) => IdentityKey::ApiId(r.api_id),
            Candidate::DockingEvent(r) => IdentityKey::ApiId(r.api_id),
            Candidate::DockingLocation(r) => IdentityKey::ApiId(r.api_id),
            Candidate::Landing(r) => IdentityKey::ApiId(r.api_id),
        }
    }

    /// Human-readable name for log lines.
    pub fn label(&self) -> String {
        match self {
            Candidate::Launch(r) => r.title.clone(),
            Candidate::Agency(r) => r.name.clone(),
            Candidate::Rocket(r) => r.full_name.clone(),
            Candidate::Pad(r) => r.name.clone(),
            Candidate::Mission(r) => r.name.clone(),
            Candidate::Station(r) => r.name.clone(),
            Candidate::Astronaut(r) => r.name.clone(),
            Candidate::Program(r) => r.name.clone(),
            Candidate::Payload(r) => r.name.clone(),
            Candidate::Expedition(r) => r.name.clone(),
            Candidate::Spacewalk(r) => r.name.clone(),
            Candidate::DockingEvent(r) => format!("docking #{}", r.api_id),
            Candidate::DockingLocation(r) => r.name.clone(),
            Candidate::Landing(r) => format!("landing #{}", r.api_id),
        }
    }

    /// Write a resolved identifier into a relation slot. Returns `false` when this
    /// kind has no such slot.
    pub fn set_relation(&mut self, field: RelationField, id: RecordId) -> bool {
        let slot = match (self, field) {
            (Candidate::Launch(r), RelationField::Provider) => &mut r.provider,
            (Candidate::Launch(r), RelationField::Rocket) => &mut r.rocket_id,
            (Candidate::Launch(r), RelationField::Pad) => &mut r.pad_id,
            (Candidate::Launch(r), RelationField::Mission) => &mut r.mission_id,
            (Candidate::Expedition(r), RelationField::Station) => &mut r.station,
            (Candidate::Expedition(r), RelationField::Crew) => {
                if !r.crew.contains(&id) {
                    r.crew.push(id);
                }
                return true;
            }
            (Candidate::Spacewalk(r), RelationField::Expedition) => &mut r.expedition,
            (Candidate::DockingEvent(r), RelationField::DockingLocation) => &mut r.docking_location,
            (Candidate::DockingEvent(r), RelationField::ChaserPayload) => &mut r.chaser_payload,
            (Candidate::DockingEvent(r), RelationField::TargetPayload) => &mut r.target_payload,
            (Candidate::DockingLocation(r), RelationField::Station) => &mut r.station,
            (Candidate::DockingLocation(r), RelationField::Payload) => &mut r.payload,
            _ => return false,
        };
        *slot = Some(id);
        true
    }

    /// Serialize to the JSON body posted to the store.
    pub fn to_body(&self) -> Result<JsonValue, serde_json::Error> {
        match self {
            Candidate::Launch(r) => serde_json::to_value(r),
            Candidate::Agency(r) => serde_json::to_value(r),
            Candidate::Rocket(r) => serde_json::to_value(r),
            Candidate::Pad(r) => serde_json::to_value(r),
            Candidate::Mission(r) => serde_json::to_value(r),
            Candidate::Station(r) => serde_json::to_value(r),
            Candidate::Astronaut(r) => serde_json::to_value(r),
            Candidate::Program(r) => serde_json::to_value(r),
            Candidate::Payload(r) => serde_json::to_value(r),
            Candidate::Expedition(r) => serde_json::to_value(r),
            Candidate::Spacewalk(r) => serde_json::to_value(r),
            Candidate::DockingEvent(r) => serde_json::to_value(r),
            Candidate::DockingLocation(r) => serde_json::to_value(r),
            Candidate::Landing(r) => serde_json::to_value(r),
        }
    }
}
