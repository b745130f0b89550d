//! Search overlay: a star marking where the user searched.

use geo::Coord;
use sausage_map_map_models::MapSearchResult;

use crate::proj::{self, ProjectionError};

/// A regular star/polygon marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarStyle {
    /// Fill colour.
    pub fill: &'static str,
    /// Stroke colour.
    pub stroke: &'static str,
    /// Stroke width in pixels.
    pub stroke_width: f64,
    /// Number of points.
    pub points: u8,
    /// Outer radius in pixels.
    pub radius: f64,
    /// Inner radius in pixels.
    pub radius2: f64,
    /// Rotation in radians.
    pub angle: f64,
}

/// The five-point purple star used for search results.
pub const SEARCH_STAR: StarStyle = StarStyle {
    fill: "#6740b4",
    stroke: "black",
    stroke_width: 2.0,
    points: 5,
    radius: 10.0,
    radius2: 4.0,
    angle: 0.0,
};

/// Layer holding the single search marker.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOverlayLayer {
    /// Marker position in Web Mercator meters.
    pub position: Coord<f64>,
    /// Address the marker stands for.
    pub label: String,
    /// Marker style.
    pub style: StarStyle,
}

/// Builds the overlay for `search`, or nothing when there is no search.
///
/// # Errors
///
/// Returns a [`ProjectionError`] if the search position is not a valid
/// WGS84 coordinate.
pub fn build_search_overlay(
    search: Option<&MapSearchResult>,
) -> Result<Option<SearchOverlayLayer>, ProjectionError> {
    let Some(search) = search else {
        return Ok(None);
    };

    Ok(Some(SearchOverlayLayer {
        position: proj::to_web_mercator(search.lon, search.lat)?,
        label: search.formatted_address.clone(),
        style: SEARCH_STAR,
    }))
}
