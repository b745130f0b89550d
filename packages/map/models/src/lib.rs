#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the sausage map view.
//!
//! Everything the map controller reads from the host application lives
//! here: the current [`Election`], the nullable [`MapSearchResult`], the
//! [`MapFilterOptions`] toggles, and the [`PollingPlaceFeature`]s served by
//! the map endpoint. These are plain data; the map crate owns all
//! behaviour that touches a map instance.

mod noms;
mod search;

pub use noms::{FilterOption, MapFilterOptions, Noms};
pub use search::{MapAction, MapMode, MapModule};

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display};

/// Identifier of an election.
///
/// The API serves integer ids, fixtures and hosts sometimes use strings;
/// both deserialize into the same string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ElectionId(String);

impl ElectionId {
    /// Creates an election id from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as it appears in the `election_id` query parameter.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for ElectionId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ElectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for ElectionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Str(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(id) => Self::from(id),
            RawId::Str(id) => Self(id),
        })
    }
}

/// A `GeoJSON` point geometry in WGS84 (`[lon, lat]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// `[longitude, latitude]` in degrees.
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    /// Creates a point from longitude and latitude in degrees.
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self {
            coordinates: [lon, lat],
        }
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lon(&self) -> f64 {
        self.coordinates[0]
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.coordinates[1]
    }
}

/// An election as seen by the map: where to centre and how far to zoom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    /// Election identifier, sent to the map endpoint.
    pub id: ElectionId,
    /// Display name (e.g. "2019 Federal Election").
    #[serde(default)]
    pub name: String,
    /// Geographic centre of the election area.
    pub geom: GeoPoint,
    /// Zoom level the map opens at.
    pub default_zoom_level: u8,
}

/// The most recent address or geolocation search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSearchResult {
    /// Longitude of the searched location.
    pub lon: f64,
    /// Latitude of the searched location.
    pub lat: f64,
    /// Address string shown to the user.
    pub formatted_address: String,
    /// Bounding box of nearby polling places as
    /// `[min_lon, min_lat, max_lon, max_lat]`.
    #[serde(default)]
    pub extent: Option<[f64; 4]>,
}

/// A single polling place from the map endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingPlaceFeature {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Amenity flags, `None` when no stall has been reported.
    pub noms: Option<Noms>,
    /// Remaining `GeoJSON` properties (name, premises, address, ...).
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl PollingPlaceFeature {
    /// The polling place id, if the endpoint supplied a numeric one.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.properties.get("id").and_then(serde_json::Value::as_i64)
    }

    /// The polling place name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.str_property("name")
    }

    /// The premises the polling place is held in (school, hall, ...).
    #[must_use]
    pub fn premises(&self) -> Option<&str> {
        self.str_property("premises")
    }

    /// Street address of the polling place.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.str_property("address")
    }

    fn str_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Role of a layer within the map.
///
/// Replaces property tags on layers: the controller keeps at most one
/// layer per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum LayerRole {
    /// Raster basemap tiles.
    Base,
    /// Polling place markers for the current election.
    Data,
    /// Marker for the user's last search.
    SearchOverlay,
}

impl LayerRole {
    /// All roles in draw order (bottom first).
    pub const ALL: &[Self] = &[Self::Base, Self::Data, Self::SearchOverlay];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn election_id_accepts_integers_and_strings() {
        let numeric: ElectionId = serde_json::from_str("27").unwrap();
        let text: ElectionId = serde_json::from_str("\"E1\"").unwrap();
        assert_eq!(numeric.as_str(), "27");
        assert_eq!(text.as_str(), "E1");
    }

    #[test]
    fn parses_election() {
        let election: Election = serde_json::from_value(serde_json::json!({
            "id": "E1",
            "name": "Test Election",
            "geom": { "type": "Point", "coordinates": [145.0, -37.8] },
            "default_zoom_level": 10
        }))
        .unwrap();

        assert_eq!(election.id, ElectionId::new("E1"));
        assert!((election.geom.lon() - 145.0).abs() < f64::EPSILON);
        assert!((election.geom.lat() - -37.8).abs() < f64::EPSILON);
        assert_eq!(election.default_zoom_level, 10);
    }

    #[test]
    fn parses_search_result_without_extent() {
        let result: MapSearchResult = serde_json::from_value(serde_json::json!({
            "lon": 144.9,
            "lat": -37.81,
            "formattedAddress": "123 Test St"
        }))
        .unwrap();

        assert_eq!(result.formatted_address, "123 Test St");
        assert!(result.extent.is_none());
    }

    #[test]
    fn feature_property_accessors() {
        let feature: PollingPlaceFeature = serde_json::from_value(serde_json::json!({
            "lon": 145.0,
            "lat": -37.8,
            "noms": null,
            "properties": {
                "id": 42,
                "name": "Fitzroy North",
                "premises": "Fitzroy North Primary School",
                "address": "Fergie St, Fitzroy North VIC 3068"
            }
        }))
        .unwrap();

        assert_eq!(feature.id(), Some(42));
        assert_eq!(feature.name(), Some("Fitzroy North"));
        assert_eq!(feature.premises(), Some("Fitzroy North Primary School"));
        assert!(feature.noms.is_none());
    }

    #[test]
    fn layer_roles_are_in_draw_order() {
        assert_eq!(
            LayerRole::ALL,
            &[LayerRole::Base, LayerRole::Data, LayerRole::SearchOverlay]
        );
        assert_eq!(LayerRole::SearchOverlay.to_string(), "search_overlay");
    }
}
