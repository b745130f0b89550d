#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Headless polling place map view.
//!
//! [`MapController`] owns a single map (view + layers) for its lifetime and
//! keeps it in sync with the host's election, search result and filter
//! options:
//!
//! 1. **Base layer**: Carto light raster tiles, attribution always shown.
//! 2. **Data layer**: polling places for the election, fetched from the
//!    map endpoint and styled by their amenity flags ([`style`]).
//! 3. **Search overlay**: a star marking the user's last search
//!    ([`overlay`]).
//!
//! Layers are keyed by [`LayerRole`] with at most one layer per role.
//! Clicks are hit-tested against the data layer and forwarded to the host
//! through a callback.

pub mod config;
pub mod controller;
pub mod data_layer;
pub mod hit_test;
pub mod layers;
pub mod overlay;
pub mod proj;
mod retry;
pub mod source;
pub mod style;
pub mod view;

pub use config::MapConfig;
pub use controller::{ClickOutcome, MapController, MapDeps, MapProps, MapTarget, UpdateOutcome};
pub use data_layer::DataStatus;
pub use sausage_map_map_models::LayerRole;
pub use source::{FeatureSource, HttpFeatureSource, StaticFeatureSource};

use thiserror::Error;

use crate::proj::ProjectionError;

/// Errors that can occur while building or driving the map.
#[derive(Debug, Error)]
pub enum MapError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// A coordinate could not be reprojected.
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// A feature in the map endpoint response has an unusable position.
    #[error("Invalid feature at index {index}: {source}")]
    InvalidFeature {
        /// Position of the feature in the `FeatureCollection`.
        index: usize,
        /// Why its position was rejected.
        #[source]
        source: ProjectionError,
    },

    /// The map endpoint could not be fetched or returned something other
    /// than a `FeatureCollection`.
    #[error("Fetch error: {message}")]
    Fetch {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration parsed but holds an unusable value.
    #[error("Invalid config: {message}")]
    InvalidConfig {
        /// Which setting is wrong and why.
        message: String,
    },

    /// A layer was offered for a role it doesn't fill.
    #[error("Layer for role {found} cannot be installed as {expected}")]
    LayerRole {
        /// Role being replaced.
        expected: LayerRole,
        /// Role of the offered layer.
        found: LayerRole,
    },

    /// The controller needs a Tokio runtime to load features on.
    #[error("No Tokio runtime available to load map features")]
    NoRuntime,
}
