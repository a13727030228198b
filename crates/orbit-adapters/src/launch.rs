use orbit_core::{
    Candidate, CrewSummary, EntityKind, LaunchRecord, LinkSummary, RelationField,
    TimelineSummary,
};
use serde_json::Value as JsonValue;

use crate::crew::{nationality, profile_image};
use crate::leaf::{
    agency_record, api_id, first_of, flexible, image_url, mission_record, pad_record,
    rocket_record, scalar, text, timestamp,
};
use crate::source::{SourceLaunch, SourceLink, SourceProgram, SourceTimelineEntry};
use crate::{decode, EntityMapper, Lookup, MapError, Mapped, MappedItem, Reference, RelationSlot};

const EVENT_TYPE: &str = "rocket_launch";
const DEFAULT_DESCRIPTION: &str = "Synced from Launch Library";

/// Upcoming launches become `events`, with provider, rocket, pad and mission
/// created on demand from the embedded objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchMapper;

impl EntityMapper for LaunchMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::Launch
    }

    fn map(&self, raw: &JsonValue) -> Result<Mapped, MapError> {
        let launch: SourceLaunch = decode(EntityKind::Launch, raw)?;
        if text(&launch.name).trim().is_empty() {
            return Ok(Mapped::Skip("launch has no title".to_string()));
        }

        let relations = launch_relations(&launch);
        Ok(Mapped::Item(MappedItem {
            candidate: Candidate::Launch(launch_record(&launch)),
            relations,
        }))
    }
}

fn optional_slot(
    field: RelationField,
    kind: EntityKind,
    id: Option<i64>,
    name: &str,
    seed: Candidate,
) -> Option<RelationSlot> {
    let id = api_id(id)?;
    if name.trim().is_empty() {
        return None;
    }
    Some(RelationSlot {
        field,
        reference: Reference {
            kind,
            lookup: Lookup::ApiId(id),
            seed: Some(seed),
        },
        required: false,
    })
}

fn launch_relations(launch: &SourceLaunch) -> Vec<RelationSlot> {
    let mut slots = Vec::new();

    if let Some(provider) = &launch.launch_service_provider {
        let record = agency_record(provider);
        let name = record.name.clone();
        slots.extend(optional_slot(
            RelationField::Provider,
            EntityKind::Agency,
            provider.id,
            &name,
            Candidate::Agency(record),
        ));
    }

    if let Some(config) = launch.rocket.as_ref().and_then(|r| r.configuration.as_ref()) {
        let record = rocket_record(config);
        let name = record.full_name.clone();
        slots.extend(optional_slot(
            RelationField::Rocket,
            EntityKind::Rocket,
            config.id,
            &name,
            Candidate::Rocket(record),
        ));
    }

    if let Some(pad) = &launch.pad {
        let record = pad_record(pad);
        let name = record.name.clone();
        slots.extend(optional_slot(
            RelationField::Pad,
            EntityKind::Pad,
            pad.id,
            &name,
            Candidate::Pad(record),
        ));
    }

    if let Some(mission) = &launch.mission {
        let record = mission_record(mission);
        let name = record.name.clone();
        slots.extend(optional_slot(
            RelationField::Mission,
            EntityKind::Mission,
            mission.id,
            &name,
            Candidate::Mission(record),
        ));
    }

    slots
}

fn links(source: &[SourceLink]) -> Vec<LinkSummary> {
    source
        .iter()
        .map(|link| LinkSummary {
            title: text(&link.title),
            url: text(&link.url),
            priority: link.priority.unwrap_or_default(),
        })
        .collect()
}

fn timeline(source: &[SourceTimelineEntry]) -> Vec<TimelineSummary> {
    source
        .iter()
        .map(|entry| {
            let time = match scalar(&entry.time) {
                t if t.is_empty() => text(&entry.relative_time),
                t => t,
            };
            let event = match text(&entry.event) {
                e if e.is_empty() => entry
                    .entry_type
                    .as_ref()
                    .map(|t| text(&t.description))
                    .unwrap_or_default(),
                e => e,
            };
            TimelineSummary { time, event }
        })
        .collect()
}

fn join_programs(
    programs: &[SourceProgram],
    sep: &str,
    f: impl Fn(&SourceProgram) -> String,
) -> String {
    programs.iter().map(f).collect::<Vec<_>>().join(sep)
}

fn launch_record(launch: &SourceLaunch) -> LaunchRecord {
    let status = launch.status.clone().unwrap_or_default();
    let config = launch
        .rocket
        .as_ref()
        .and_then(|r| r.configuration.clone())
        .unwrap_or_default();
    let stage = launch
        .rocket
        .as_ref()
        .and_then(|r| r.launcher_stage.first().cloned())
        .unwrap_or_default();
    let launcher = stage.launcher.clone().unwrap_or_default();
    let landing = stage.landing.clone().unwrap_or_default();

    let crew_members = launch
        .rocket
        .as_ref()
        .and_then(|r| r.spacecraft_stage.as_ref())
        .map(|stages| {
            stages
                .iter()
                .flat_map(|stage| stage.launch_crew.iter())
                .map(|member| {
                    let astronaut = member.astronaut.clone().unwrap_or_default();
                    let role = member.role.clone().unwrap_or_default();
                    CrewSummary {
                        astronaut_id: astronaut.id.unwrap_or_default(),
                        name: text(&astronaut.name),
                        role: text(&role.role),
                        role_priority: role.priority.unwrap_or_default(),
                        nationality: nationality(&astronaut.nationality),
                        agency: astronaut
                            .agency
                            .as_ref()
                            .map(|a| text(&a.name))
                            .unwrap_or_default(),
                        profile_image: profile_image(&astronaut),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let pad_name = launch
        .pad
        .as_ref()
        .map(|p| text(&p.name))
        .unwrap_or_default();
    let description = launch
        .mission
        .as_ref()
        .map(|m| text(&m.description))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    LaunchRecord {
        title: text(&launch.name),
        event_type: EVENT_TYPE.to_string(),
        launch_id: text(&launch.id),
        datetime: timestamp(&launch.net),
        window_start: timestamp(&launch.window_start),
        window_end: timestamp(&launch.window_end),
        location: pad_name,
        source_url: text(&launch.url),
        description,
        image: image_url(&launch.image),
        infographic: text(&launch.infographic),
        webcast_live: launch.webcast_live.unwrap_or_default(),
        status_abbrev: text(&status.abbrev),
        status_description: text(&status.description),
        rocket_name: text(&config.name),
        rocket_full_name: text(&config.full_name),
        rocket_total_launches: config.total_launch_count.unwrap_or_default(),
        rocket_successful_launches: config.successful_launches.unwrap_or_default(),
        rocket_failed_launches: config.failed_launches.unwrap_or_default(),
        rocket_pending_launches: config.pending_launches.unwrap_or_default(),
        launcher_serial_number: text(&launcher.serial_number),
        launcher_flight_number: stage.launcher_flight_number.unwrap_or_default(),
        launcher_reused: stage.reused.unwrap_or_default(),
        launcher_flights: launcher.flights.unwrap_or_default(),
        launcher_status: flexible(&launcher.status),
        landing_attempt: landing.attempt.unwrap_or_default(),
        landing_success: landing.success.unwrap_or_default(),
        landing_location: landing
            .location
            .as_ref()
            .map(|l| text(&l.name))
            .unwrap_or_default(),
        landing_type: landing
            .landing_type
            .as_ref()
            .map(|t| text(&t.name))
            .unwrap_or_default(),
        program_names: join_programs(&launch.program, ", ", |p| text(&p.name)),
        program_descriptions: join_programs(&launch.program, " | ", |p| text(&p.description)),
        program_image_urls: join_programs(&launch.program, ", ", |p| {
            first_of(&[image_url(&p.image), text(&p.image_url)])
        }),
        crew_members,
        vid_urls: links(&launch.vid_urls),
        info_urls: links(&launch.info_urls),
        timeline: timeline(&launch.timeline),
        orbital_launch_attempt_count: launch.orbital_launch_attempt_count.unwrap_or_default(),
        location_launch_attempt_count: launch.location_launch_attempt_count.unwrap_or_default(),
        pad_launch_attempt_count: launch.pad_launch_attempt_count.unwrap_or_default(),
        agency_launch_attempt_count: launch.agency_launch_attempt_count.unwrap_or_default(),
        provider: None,
        rocket_id: None,
        pad_id: None,
        mission_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_core::IdentityKey;
    use serde_json::json;

    fn detailed_launch() -> JsonValue {
        json!({
            "id": "e3df2ecd-c239-472f-95e4-2b89b4f75800",
            "name": "Falcon 9 Block 5 | Starlink Group 10-9",
            "net": "2024-08-01T05:14:00Z",
            "window_start": "2024-08-01T05:14:00Z",
            "window_end": "2024-08-01T09:14:00Z",
            "url": "https://ll.example/launches/e3df2ecd/",
            "status": {"abbrev": "Go", "description": "Current T-0 confirmed"},
            "launch_service_provider": {"id": 121, "name": "SpaceX", "type": "Commercial"},
            "rocket": {
                "id": 8042,
                "configuration": {
                    "id": 164,
                    "name": "Falcon 9",
                    "full_name": "Falcon 9 Block 5",
                    "total_launch_count": 350,
                    "successful_launches": 348
                },
                "launcher_stage": [{
                    "reused": true,
                    "launcher_flight_number": 12,
                    "launcher": {"serial_number": "B1077", "status": "active", "flights": 12},
                    "landing": {
                        "attempt": true,
                        "success": null,
                        "location": {"name": "A Shortfall of Gravitas"},
                        "type": {"name": "Autonomous Spaceport Drone Ship"}
                    }
                }],
                "spacecraft_stage": null
            },
            "mission": null,
            "pad": {"id": 80, "name": "Space Launch Complex 40", "latitude": 28.56, "longitude": "-80.57"},
            "vidURLs": [{"title": "Webcast", "url": "https://v/1", "priority": 10}],
            "program": [
                {"id": 25, "name": "Starlink", "description": "Constellation"},
                {"id": 26, "name": "Rideshare", "description": "Shared ride"}
            ],
            "timeline": [{"relative_time": "-PT1H", "type": {"abbrev": "PROP", "description": "Propellant load"}}],
            "orbital_launch_attempt_count": 161
        })
    }

    #[test]
    fn launch_flattens_nested_descriptive_data() {
        let Mapped::Item(item) = LaunchMapper.map(&detailed_launch()).expect("map") else {
            panic!("expected item");
        };
        assert_eq!(
            item.candidate.identity(),
            IdentityKey::normalized("title", "falcon 9 block 5 | starlink group 10-9")
        );
        let Candidate::Launch(record) = item.candidate else {
            panic!("expected launch");
        };
        assert_eq!(record.event_type, "rocket_launch");
        assert_eq!(record.location, "Space Launch Complex 40");
        assert_eq!(record.rocket_full_name, "Falcon 9 Block 5");
        assert_eq!(record.rocket_total_launches, 350);
        assert_eq!(record.rocket_failed_launches, 0);
        assert_eq!(record.launcher_serial_number, "B1077");
        assert!(record.launcher_reused);
        assert!(record.landing_attempt);
        assert!(!record.landing_success);
        assert_eq!(record.landing_location, "A Shortfall of Gravitas");
        assert_eq!(record.program_names, "Starlink, Rideshare");
        assert_eq!(record.program_descriptions, "Constellation | Shared ride");
        assert_eq!(record.vid_urls.len(), 1);
        assert_eq!(record.timeline[0].time, "-PT1H");
        assert_eq!(record.timeline[0].event, "Propellant load");
        assert_eq!(record.description, DEFAULT_DESCRIPTION);
        assert!(record.crew_members.is_empty());
        assert!(record.provider.is_none());
    }

    #[test]
    fn launch_references_carry_seeds_and_skip_null_mission() {
        let Mapped::Item(item) = LaunchMapper.map(&detailed_launch()).expect("map") else {
            panic!("expected item");
        };
        let fields: Vec<_> = item.relations.iter().map(|s| s.field).collect();
        assert_eq!(
            fields,
            vec![RelationField::Provider, RelationField::Rocket, RelationField::Pad]
        );
        assert!(item.relations.iter().all(|s| !s.required));

        let rocket = &item.relations[1].reference;
        assert_eq!(rocket.kind, EntityKind::Rocket);
        assert_eq!(rocket.lookup, Lookup::ApiId(164));
        let Some(Candidate::Rocket(seed)) = &rocket.seed else {
            panic!("expected rocket seed");
        };
        assert_eq!(seed.full_name, "Falcon 9 Block 5");

        let Some(Candidate::Pad(pad)) = &item.relations[2].reference.seed else {
            panic!("expected pad seed");
        };
        assert_eq!(pad.latitude, "28.56");
        assert_eq!(pad.longitude, "-80.57");
    }

    #[test]
    fn null_lists_leave_the_launch_mappable() {
        let Mapped::Item(item) = LaunchMapper
            .map(&json!({
                "id": "f1a2b3c4",
                "name": "Falcon 9 Block 5 | Demo",
                "program": null,
                "timeline": null,
                "infoURLs": null,
                "vidURLs": null,
                "rocket": {
                    "launcher_stage": null,
                    "spacecraft_stage": {"launch_crew": null},
                    "configuration": {"id": 164, "name": "Falcon 9", "families": null}
                }
            }))
            .expect("map")
        else {
            panic!("expected item");
        };
        let Candidate::Launch(record) = &item.candidate else {
            panic!("expected launch");
        };
        assert_eq!(record.program_names, "");
        assert!(record.timeline.is_empty());
        assert!(record.info_urls.is_empty());
        assert!(record.vid_urls.is_empty());
        assert!(record.crew_members.is_empty());
        assert_eq!(record.launcher_serial_number, "");
        assert!(item
            .relations
            .iter()
            .any(|s| s.reference.lookup == Lookup::ApiId(164)));
    }

    #[test]
    fn launch_without_title_is_skipped() {
        assert!(matches!(
            LaunchMapper.map(&json!({"name": "   "})).expect("map"),
            Mapped::Skip(_)
        ));
    }
}
