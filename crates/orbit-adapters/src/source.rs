//! Wire shapes of the source API. Scalars the source may omit or send as
//! `null` are `Option`s and the mappers decide the placeholder; lists decode
//! `null` as empty.

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

/// Lists the source sends as `null` decode as empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A descriptive field the source sends either as a bare string or as `{ "name": ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FlexibleName {
    Text(String),
    Object(Named),
}

impl FlexibleName {
    pub fn name(&self) -> &str {
        match self {
            FlexibleName::Text(text) => text,
            FlexibleName::Object(named) => named.name.as_deref().unwrap_or_default(),
        }
    }
}

/// An image the source sends either as a URL string or as an image object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImageField {
    Url(String),
    Object(ImageRef),
}

impl ImageField {
    pub fn url(&self) -> &str {
        match self {
            ImageField::Url(url) => url,
            ImageField::Object(image) => image.image_url.as_deref().unwrap_or_default(),
        }
    }

    pub fn as_object(&self) -> Option<&ImageRef> {
        match self {
            ImageField::Object(image) => Some(image),
            ImageField::Url(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::One(item) => Some(item),
            OneOrMany::Many(items) => items.first(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Named {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageRef {
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub credit: Option<String>,
    pub license: Option<License>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct License {
    pub name: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Country {
    pub name: Option<String>,
    pub alpha_2_code: Option<String>,
    pub nationality_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceAgency {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub abbrev: Option<String>,
    #[serde(rename = "type")]
    pub agency_type: Option<FlexibleName>,
    pub description: Option<String>,
    pub administrator: Option<String>,
    pub founding_year: Option<JsonValue>,
    pub launchers: Option<String>,
    pub spacecraft: Option<String>,
    pub featured: Option<bool>,
    pub url: Option<String>,
    pub country: Option<OneOrMany<Country>>,
    pub country_code: Option<String>,
    pub logo: Option<ImageField>,
    pub logo_url: Option<String>,
    pub social_logo: Option<ImageField>,
    pub image: Option<ImageField>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceRocketConfig {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub variant: Option<String>,
    pub family: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub families: Vec<Named>,
    pub reusable: Option<bool>,
    pub description: Option<String>,
    pub manufacturer: Option<Named>,
    pub image: Option<ImageField>,
    pub image_url: Option<String>,
    pub info_url: Option<String>,
    pub wiki_url: Option<String>,
    pub total_launch_count: Option<i64>,
    pub successful_launches: Option<i64>,
    pub failed_launches: Option<i64>,
    pub pending_launches: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcePad {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<JsonValue>,
    pub longitude: Option<JsonValue>,
    pub country_code: Option<String>,
    pub country: Option<OneOrMany<Country>>,
    pub location: Option<Named>,
    pub map_url: Option<String>,
    pub wiki_url: Option<String>,
    pub map_image: Option<String>,
    pub total_launch_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceMission {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub mission_type: Option<String>,
    pub orbit: Option<FlexibleName>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceStatus {
    pub name: Option<String>,
    pub abbrev: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceLink {
    pub title: Option<String>,
    pub url: Option<String>,
    pub priority: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceTimelineEntry {
    pub time: Option<JsonValue>,
    pub relative_time: Option<String>,
    pub event: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: Option<SourceStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceLauncher {
    pub serial_number: Option<String>,
    pub status: Option<FlexibleName>,
    pub flights: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceLandingPlace {
    pub name: Option<String>,
    pub abbrev: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceLanding {
    pub id: Option<i64>,
    pub attempt: Option<bool>,
    pub success: Option<bool>,
    pub description: Option<String>,
    pub downrange_distance: Option<f64>,
    #[serde(alias = "landing_location")]
    pub location: Option<SourceLandingPlace>,
    #[serde(rename = "type", alias = "landing_type")]
    pub landing_type: Option<SourceLandingPlace>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceLauncherStage {
    pub reused: Option<bool>,
    pub launcher_flight_number: Option<i64>,
    pub launcher: Option<SourceLauncher>,
    pub landing: Option<SourceLanding>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceCrewRole {
    pub role: Option<String>,
    pub priority: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceCrewMember {
    pub role: Option<SourceCrewRole>,
    pub astronaut: Option<SourceAstronaut>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceSpacecraftStage {
    #[serde(deserialize_with = "null_as_empty")]
    pub launch_crew: Vec<SourceCrewMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceLaunchRocket {
    pub id: Option<i64>,
    pub configuration: Option<SourceRocketConfig>,
    #[serde(deserialize_with = "null_as_empty")]
    pub launcher_stage: Vec<SourceLauncherStage>,
    pub spacecraft_stage: Option<OneOrMany<SourceSpacecraftStage>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceLaunch {
    pub id: Option<String>,
    pub name: Option<String>,
    pub net: Option<String>,
    pub window_start: Option<String>,
    pub window_end: Option<String>,
    pub url: Option<String>,
    pub status: Option<SourceStatus>,
    pub launch_service_provider: Option<SourceAgency>,
    pub mission: Option<SourceMission>,
    pub rocket: Option<SourceLaunchRocket>,
    pub pad: Option<SourcePad>,
    #[serde(rename = "infoURLs", deserialize_with = "null_as_empty")]
    pub info_urls: Vec<SourceLink>,
    #[serde(rename = "vidURLs", deserialize_with = "null_as_empty")]
    pub vid_urls: Vec<SourceLink>,
    pub webcast_live: Option<bool>,
    pub image: Option<ImageField>,
    pub infographic: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub timeline: Vec<SourceTimelineEntry>,
    #[serde(deserialize_with = "null_as_empty")]
    pub program: Vec<SourceProgram>,
    pub orbital_launch_attempt_count: Option<i64>,
    pub location_launch_attempt_count: Option<i64>,
    pub pad_launch_attempt_count: Option<i64>,
    pub agency_launch_attempt_count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceNationality {
    Text(String),
    Countries(Vec<Country>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceAstronautAgency {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub agency_type: Option<FlexibleName>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceAstronaut {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub status: Option<FlexibleName>,
    #[serde(rename = "type")]
    pub role: Option<FlexibleName>,
    pub agency: Option<SourceAstronautAgency>,
    pub in_space: Option<bool>,
    pub eva_time: Option<String>,
    pub time_in_space: Option<String>,
    pub date_of_birth: Option<String>,
    pub date_of_death: Option<String>,
    pub nationality: Option<SourceNationality>,
    pub first_flight: Option<String>,
    pub last_flight: Option<String>,
    pub flights_count: Option<i64>,
    pub landings_count: Option<i64>,
    pub spacewalks_count: Option<i64>,
    pub is_human: Option<bool>,
    pub bio: Option<String>,
    pub wiki: Option<String>,
    pub profile_image: Option<String>,
    pub image: Option<ImageField>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceStation {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub status: Option<FlexibleName>,
    #[serde(rename = "type")]
    pub station_type: Option<FlexibleName>,
    pub orbit: Option<FlexibleName>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub founded: Option<String>,
    pub image: Option<ImageField>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceProgram {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub program_type: Option<FlexibleName>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub info_url: Option<String>,
    pub wiki_url: Option<String>,
    pub url: Option<String>,
    pub image: Option<ImageField>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcePayload {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub serial_number: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub nationalities: Vec<Named>,
    pub orbit: Option<FlexibleName>,
    pub mass: Option<f64>,
    pub mass_unit: Option<String>,
    pub reusable: Option<bool>,
    pub spacecraft: Option<Named>,
    pub spacecraft_config: Option<Named>,
    pub spacecraft_flight: Option<String>,
    pub operator: Option<SourceAgency>,
    pub image: Option<ImageField>,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcePatch {
    pub name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceExpedition {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub url: Option<String>,
    pub spacestation: Option<SourceStation>,
    #[serde(deserialize_with = "null_as_empty")]
    pub mission_patches: Vec<SourcePatch>,
    #[serde(deserialize_with = "null_as_empty")]
    pub crew: Vec<SourceCrewMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceSpacewalk {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub url: Option<String>,
    pub location: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub duration: Option<String>,
    pub expedition: Option<Named>,
    pub event: Option<Named>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceLaunchRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcePayloadFlight {
    pub id: Option<i64>,
    pub payload: Option<SourcePayload>,
    pub launch: Option<SourceLaunchRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceDockingLocation {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub spacestation: Option<SourceStation>,
    pub payload: Option<SourcePayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceDockingEvent {
    pub id: Option<i64>,
    pub url: Option<String>,
    pub docking: Option<String>,
    pub departure: Option<String>,
    pub docking_location: Option<SourceDockingLocation>,
    pub payload_flight_target: Option<SourcePayloadFlight>,
    pub payload_flight_chaser: Option<SourcePayloadFlight>,
}
