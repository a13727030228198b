use orbit_core::{Candidate, DockingEventRecord, DockingLocationRecord, EntityKind, RelationField};
use serde_json::Value as JsonValue;

use crate::leaf::{api_id, image_url, missing_id, payload_record, station_record, text, timestamp};
use crate::source::{
    ImageField, SourceDockingEvent, SourceDockingLocation, SourcePayload, SourcePayloadFlight,
};
use crate::{decode, EntityMapper, Lookup, MapError, Mapped, MappedItem, Reference, RelationSlot};

#[derive(Debug, Default)]
struct PayloadInfo {
    name: String,
    operator: String,
    image_url: String,
}

fn payload_info(payload: Option<&SourcePayload>) -> PayloadInfo {
    let Some(p) = payload else {
        return PayloadInfo::default();
    };
    PayloadInfo {
        name: text(&p.name),
        operator: p
            .operator
            .as_ref()
            .map(|o| text(&o.name))
            .unwrap_or_default(),
        image_url: image_url(&p.image),
    }
}

fn payload_slot(field: RelationField, payload: Option<&SourcePayload>) -> Option<RelationSlot> {
    let payload = payload?;
    let id = api_id(payload.id)?;
    Some(RelationSlot {
        field,
        reference: Reference {
            kind: EntityKind::Payload,
            lookup: Lookup::ApiId(id),
            seed: Some(Candidate::Payload(payload_record(payload))),
        },
        required: false,
    })
}

fn flight_payload(flight: &Option<SourcePayloadFlight>) -> Option<&SourcePayload> {
    flight.as_ref().and_then(|f| f.payload.as_ref())
}

fn flight_launch(flight: &Option<SourcePayloadFlight>) -> (String, String) {
    flight
        .as_ref()
        .and_then(|f| f.launch.as_ref())
        .map(|l| (text(&l.id), text(&l.name)))
        .unwrap_or_default()
}

pub(crate) fn docking_location_record(loc: &SourceDockingLocation) -> DockingLocationRecord {
    let station = loc.spacestation.clone().unwrap_or_default();
    let image = station
        .image
        .as_ref()
        .and_then(ImageField::as_object)
        .cloned()
        .unwrap_or_default();
    let license = image.license.clone().unwrap_or_default();
    DockingLocationRecord {
        api_id: loc.id.unwrap_or_default(),
        name: text(&loc.name),
        station_url: text(&station.url),
        image_url: image_url(&station.image),
        image_credit: text(&image.credit),
        license_name: text(&license.name),
        license_url: text(&license.link),
        station: None,
        payload: None,
    }
}

/// Dockings flatten each participating payload to text and also link the
/// payload records by `api_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DockingEventMapper;

impl EntityMapper for DockingEventMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::DockingEvent
    }

    fn map(&self, raw: &JsonValue) -> Result<Mapped, MapError> {
        let event: SourceDockingEvent = decode(EntityKind::DockingEvent, raw)?;
        if api_id(event.id).is_none() {
            return Ok(missing_id(EntityKind::DockingEvent));
        }

        let location = event.docking_location.clone().unwrap_or_default();
        let at = payload_info(location.payload.as_ref());
        let chaser = payload_info(flight_payload(&event.payload_flight_chaser));
        let target = payload_info(flight_payload(&event.payload_flight_target));
        let (chaser_launch_id, chaser_launch_name) = flight_launch(&event.payload_flight_chaser);
        let (target_launch_id, target_launch_name) = flight_launch(&event.payload_flight_target);

        let mut relations = Vec::new();
        if let Some(id) = api_id(location.id) {
            relations.push(RelationSlot {
                field: RelationField::DockingLocation,
                reference: Reference {
                    kind: EntityKind::DockingLocation,
                    lookup: Lookup::ApiId(id),
                    seed: Some(Candidate::DockingLocation(docking_location_record(&location))),
                },
                required: false,
            });
        }
        relations.extend(payload_slot(
            RelationField::ChaserPayload,
            flight_payload(&event.payload_flight_chaser),
        ));
        relations.extend(payload_slot(
            RelationField::TargetPayload,
            flight_payload(&event.payload_flight_target),
        ));

        let docked_with = if at.name.is_empty() {
            text(&location.name)
        } else {
            at.name.clone()
        };
        let record = DockingEventRecord {
            api_id: event.id.unwrap_or_default(),
            docking_time: timestamp(&event.docking),
            departure_time: timestamp(&event.departure),
            location_name: text(&location.name),
            location_payload_name: at.name,
            location_operator: at.operator,
            location_image_url: at.image_url,
            chaser_payload_name: chaser.name,
            chaser_operator: chaser.operator,
            chaser_image_url: chaser.image_url,
            chaser_launch_id,
            chaser_launch_name,
            target_payload_name: target.name,
            target_operator: target.operator,
            target_image_url: target.image_url,
            target_launch_id,
            target_launch_name,
            details: format!("Docking with {docked_with}"),
            source_url: text(&event.url),
            docking_location: None,
            chaser_payload: None,
            target_payload: None,
        };
        Ok(Mapped::Item(MappedItem {
            candidate: Candidate::DockingEvent(record),
            relations,
        }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DockingLocationMapper;

impl EntityMapper for DockingLocationMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::DockingLocation
    }

    fn map(&self, raw: &JsonValue) -> Result<Mapped, MapError> {
        let loc: SourceDockingLocation = decode(EntityKind::DockingLocation, raw)?;
        if api_id(loc.id).is_none() {
            return Ok(missing_id(EntityKind::DockingLocation));
        }

        let mut relations = Vec::new();
        if let Some(station) = &loc.spacestation {
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
        relations.extend(payload_slot(RelationField::Payload, loc.payload.as_ref()));

        Ok(Mapped::Item(MappedItem {
            candidate: Candidate::DockingLocation(docking_location_record(&loc)),
            relations,
        }))
    }
}
