//! Leaf reference kinds: no relations of their own, keyed by `api_id`.

use chrono::{DateTime, SecondsFormat, Utc};
use orbit_core::{
    AgencyRecord, Candidate, EntityKind, LandingRecord, MissionRecord, PadRecord, PayloadRecord,
    ProgramRecord, RocketRecord, StationRecord,
};
use serde_json::Value as JsonValue;

use crate::source::{
    FlexibleName, ImageField, SourceAgency, SourceLanding, SourceMission, SourcePad,
    SourcePayload, SourceProgram, SourceRocketConfig, SourceStation,
};
use crate::{decode, EntityMapper, MapError, Mapped};

pub(crate) fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

pub(crate) fn flexible(value: &Option<FlexibleName>) -> String {
    value
        .as_ref()
        .map(|v| v.name().to_string())
        .unwrap_or_default()
}

pub(crate) fn image_url(value: &Option<ImageField>) -> String {
    value
        .as_ref()
        .map(|v| v.url().to_string())
        .unwrap_or_default()
}

/// First non-empty candidate, or the empty placeholder.
pub(crate) fn first_of(candidates: &[String]) -> String {
    candidates
        .iter()
        .find(|c| !c.is_empty())
        .cloned()
        .unwrap_or_default()
}

/// Strings or numbers the source is inconsistent about (coordinates, years).
pub(crate) fn scalar(value: &Option<JsonValue>) -> String {
    match value {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// RFC 3339 timestamps re-rendered in UTC with second precision; anything
/// unparseable is kept verbatim.
pub(crate) fn timestamp(value: &Option<String>) -> String {
    let raw = value.as_deref().unwrap_or_default().trim();
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        Err(_) => raw.to_string(),
    }
}

/// A usable natural key: present and positive.
pub(crate) fn api_id(id: Option<i64>) -> Option<i64> {
    id.filter(|id| *id > 0)
}

pub(crate) fn missing_id(kind: EntityKind) -> Mapped {
    Mapped::Skip(format!("{kind} item has no api_id"))
}

pub(crate) fn agency_record(a: &SourceAgency) -> AgencyRecord {
    let country = a.country.as_ref().and_then(|c| c.first());
    AgencyRecord {
        api_id: a.id.unwrap_or_default(),
        name: text(&a.name),
        abbrev: text(&a.abbrev),
        type_name: flexible(&a.agency_type),
        description: text(&a.description),
        administrator: text(&a.administrator),
        founding_year: scalar(&a.founding_year),
        launchers: text(&a.launchers),
        spacecraft: text(&a.spacecraft),
        featured: a.featured.unwrap_or_default(),
        url: text(&a.url),
        country_name: country.map(|c| text(&c.name)).unwrap_or_default(),
        country_code: first_of(&[
            country.map(|c| text(&c.alpha_2_code)).unwrap_or_default(),
            text(&a.country_code),
        ]),
        nationality_name: country.map(|c| text(&c.nationality_name)).unwrap_or_default(),
        logo_url: first_of(&[image_url(&a.logo), text(&a.logo_url)]),
        social_logo_url: image_url(&a.social_logo),
        image_url: first_of(&[image_url(&a.image), text(&a.image_url)]),
    }
}

pub(crate) fn rocket_record(c: &SourceRocketConfig) -> RocketRecord {
    RocketRecord {
        api_id: c.id.unwrap_or_default(),
        name: text(&c.name),
        full_name: first_of(&[text(&c.full_name), text(&c.name)]),
        variant: text(&c.variant),
        family: first_of(&[
            text(&c.family),
            c.families.first().map(|f| text(&f.name)).unwrap_or_default(),
        ]),
        reusable: c.reusable.unwrap_or_default(),
        description: text(&c.description),
        manufacturer: c.manufacturer.as_ref().map(|m| text(&m.name)).unwrap_or_default(),
        image_url: first_of(&[image_url(&c.image), text(&c.image_url)]),
        info_url: text(&c.info_url),
        wiki_url: text(&c.wiki_url),
        total_launch_count: c.total_launch_count.unwrap_or_default(),
        successful_launches: c.successful_launches.unwrap_or_default(),
        failed_launches: c.failed_launches.unwrap_or_default(),
        pending_launches: c.pending_launches.unwrap_or_default(),
    }
}

pub(crate) fn pad_record(p: &SourcePad) -> PadRecord {
    PadRecord {
        api_id: p.id.unwrap_or_default(),
        name: text(&p.name),
        description: text(&p.description),
        latitude: scalar(&p.latitude),
        longitude: scalar(&p.longitude),
        country_code: first_of(&[
            text(&p.country_code),
            p.country
                .as_ref()
                .and_then(|c| c.first())
                .map(|c| text(&c.alpha_2_code))
                .unwrap_or_default(),
        ]),
        location_name: p.location.as_ref().map(|l| text(&l.name)).unwrap_or_default(),
        map_url: text(&p.map_url),
        wiki_url: text(&p.wiki_url),
        map_image: text(&p.map_image),
        total_launch_count: p.total_launch_count.unwrap_or_default(),
    }
}

pub(crate) fn mission_record(m: &SourceMission) -> MissionRecord {
    MissionRecord {
        api_id: m.id.unwrap_or_default(),
        name: text(&m.name),
        description: text(&m.description),
        mission_type: text(&m.mission_type),
        orbit: flexible(&m.orbit),
    }
}

pub(crate) fn station_record(s: &SourceStation) -> StationRecord {
    StationRecord {
        api_id: s.id.unwrap_or_default(),
        name: text(&s.name),
        status: flexible(&s.status),
        station_type: flexible(&s.station_type),
        orbit: flexible(&s.orbit),
        url: text(&s.url),
        description: text(&s.description),
        founded: text(&s.founded),
    }
}

pub(crate) fn program_record(p: &SourceProgram) -> ProgramRecord {
    let thumb = p
        .image
        .as_ref()
        .and_then(ImageField::as_object)
        .map(|i| text(&i.thumbnail_url))
        .unwrap_or_default();
    ProgramRecord {
        api_id: p.id.unwrap_or_default(),
        name: text(&p.name),
        program_type: flexible(&p.program_type),
        description: text(&p.description),
        start_date: timestamp(&p.start_date),
        end_date: timestamp(&p.end_date),
        info_url: text(&p.info_url),
        wiki_url: text(&p.wiki_url),
        image_url: first_of(&[image_url(&p.image), text(&p.image_url)]),
        image_thumb_url: thumb,
        api_url: text(&p.url),
    }
}

/// Operator details are flattened to text; payloads never relate to agencies.
pub(crate) fn payload_record(p: &SourcePayload) -> PayloadRecord {
    let operator = p.operator.as_ref().map(agency_record).unwrap_or_default();
    PayloadRecord {
        api_id: p.id.unwrap_or_default(),
        name: text(&p.name),
        slug: text(&p.slug),
        description: text(&p.description),
        serial_number: text(&p.serial_number),
        nationality: first_of(&[
            p.nationalities.first().map(|n| text(&n.name)).unwrap_or_default(),
            operator.nationality_name.clone(),
        ]),
        orbit: flexible(&p.orbit),
        mass: p.mass.unwrap_or_default(),
        mass_unit: text(&p.mass_unit),
        reusable: p.reusable.unwrap_or_default(),
        spacecraft: p.spacecraft.as_ref().map(|s| text(&s.name)).unwrap_or_default(),
        spacecraft_config: p
            .spacecraft_config
            .as_ref()
            .map(|s| text(&s.name))
            .unwrap_or_default(),
        spacecraft_flight: text(&p.spacecraft_flight),
        operator_name: operator.name,
        operator_country: operator.country_name,
        operator_logo_url: operator.logo_url,
        image_url: image_url(&p.image),
        updated_at: timestamp(&p.updated),
    }
}

pub(crate) fn landing_record(l: &SourceLanding) -> LandingRecord {
    let location = l.location.clone().unwrap_or_default();
    let landing_type = l.landing_type.clone().unwrap_or_default();
    LandingRecord {
        api_id: l.id.unwrap_or_default(),
        attempt: l.attempt.unwrap_or_default(),
        success: l.success.unwrap_or_default(),
        description: text(&l.description),
        downrange_distance: l.downrange_distance.unwrap_or_default(),
        location_name: text(&location.name),
        location_abbrev: text(&location.abbrev),
        landing_type: text(&landing_type.name),
        landing_type_abbrev: text(&landing_type.abbrev),
    }
}

macro_rules! leaf_mapper {
    ($mapper:ident, $kind:expr, $source:ty, $build:ident, $variant:ident) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $mapper;

        impl EntityMapper for $mapper {
            fn kind(&self) -> EntityKind {
                $kind
            }

            fn map(&self, raw: &JsonValue) -> Result<Mapped, MapError> {
                let source: $source = decode($kind, raw)?;
                if api_id(source.id).is_none() {
                    return Ok(missing_id($kind));
                }
                Ok(Mapped::item(Candidate::$variant($build(&source))))
            }
        }
    };
}

leaf_mapper!(AgencyMapper, EntityKind::Agency, SourceAgency, agency_record, Agency);
leaf_mapper!(RocketMapper, EntityKind::Rocket, SourceRocketConfig, rocket_record, Rocket);
leaf_mapper!(PadMapper, EntityKind::Pad, SourcePad, pad_record, Pad);
leaf_mapper!(StationMapper, EntityKind::Station, SourceStation, station_record, Station);
leaf_mapper!(ProgramMapper, EntityKind::Program, SourceProgram, program_record, Program);
leaf_mapper!(PayloadMapper, EntityKind::Payload, SourcePayload, payload_record, Payload);
leaf_mapper!(LandingMapper, EntityKind::Landing, SourceLanding, landing_record, Landing);
