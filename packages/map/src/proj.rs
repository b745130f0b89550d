//! Reprojection between WGS84 (`EPSG:4326`) and Web Mercator (`EPSG:3857`).
//!
//! Positions are validated before projecting so malformed input fails
//! with a [`ProjectionError`] instead of turning into `NaN` coordinates.

use std::f64::consts::PI;

use geo::{Coord, Rect};
use thiserror::Error;

/// WGS84 semi-major axis in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the width of the Web Mercator world in meters.
pub const HALF_SIZE: f64 = PI * EARTH_RADIUS;

/// Why a position could not be reprojected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// Longitude or latitude is `NaN` or infinite.
    #[error("non-finite position ({lon}, {lat})")]
    NonFinite {
        /// Longitude as given.
        lon: f64,
        /// Latitude as given.
        lat: f64,
    },

    /// Longitude outside `[-180, 180]` or latitude outside `[-90, 90]`.
    #[error("position ({lon}, {lat}) is outside WGS84 bounds")]
    OutOfRange {
        /// Longitude as given.
        lon: f64,
        /// Latitude as given.
        lat: f64,
    },

    /// Extent minimums exceed their maximums.
    #[error("extent {extent:?} is not [min_lon, min_lat, max_lon, max_lat]")]
    InvalidExtent {
        /// Extent as given.
        extent: [f64; 4],
    },
}

/// Checks that `(lon, lat)` is a usable WGS84 position.
///
/// # Errors
///
/// Returns [`ProjectionError::NonFinite`] or [`ProjectionError::OutOfRange`].
pub fn validate(lon: f64, lat: f64) -> Result<(), ProjectionError> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(ProjectionError::NonFinite { lon, lat });
    }
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(ProjectionError::OutOfRange { lon, lat });
    }
    Ok(())
}

/// Projects a WGS84 position to Web Mercator meters.
///
/// Latitudes beyond the Mercator limit (about ±85.05°) clamp to the edge
/// of the world square.
///
/// # Errors
///
/// Returns a [`ProjectionError`] if the position fails [`validate`].
pub fn to_web_mercator(lon: f64, lat: f64) -> Result<Coord<f64>, ProjectionError> {
    validate(lon, lat)?;

    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (PI * (lat + 90.0) / 360.0).tan().ln();

    Ok(Coord {
        x,
        y: y.clamp(-HALF_SIZE, HALF_SIZE),
    })
}

/// Projects a Web Mercator coordinate back to `(lon, lat)` degrees.
#[must_use]
pub fn to_wgs84(coord: Coord<f64>) -> (f64, f64) {
    let lon = (coord.x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (coord.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

/// Projects a `[min_lon, min_lat, max_lon, max_lat]` extent.
///
/// # Errors
///
/// Returns [`ProjectionError::InvalidExtent`] if a minimum exceeds its
/// maximum, or the corner's error if a corner is not a valid position.
pub fn extent_to_web_mercator(extent: [f64; 4]) -> Result<Rect<f64>, ProjectionError> {
    let [min_lon, min_lat, max_lon, max_lat] = extent;
    let min = to_web_mercator(min_lon, min_lat)?;
    let max = to_web_mercator(max_lon, max_lat)?;

    if min_lon > max_lon || min_lat > max_lat {
        return Err(ProjectionError::InvalidExtent { extent });
    }

    Ok(Rect::new(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_melbourne() {
        let coord = to_web_mercator(145.0, -37.8).unwrap();
        assert!((coord.x - 16_141_326.0).abs() < 1.0, "x = {}", coord.x);
        assert!((coord.y - -4_551_210.9).abs() < 1.0, "y = {}", coord.y);
    }

    #[test]
    fn origin_projects_to_origin() {
        let coord = to_web_mercator(0.0, 0.0).unwrap();
        assert!(coord.x.abs() < 1e-9);
        assert!(coord.y.abs() < 1e-6);
    }

    #[test]
    fn antimeridian_is_half_size() {
        let coord = to_web_mercator(180.0, 0.0).unwrap();
        assert!((coord.x - HALF_SIZE).abs() < 1e-6);
    }

    #[test]
    fn poles_clamp_to_world_edge() {
        let north = to_web_mercator(0.0, 90.0).unwrap();
        let south = to_web_mercator(0.0, -90.0).unwrap();
        assert!((north.y - HALF_SIZE).abs() < 1e-6);
        assert!((south.y + HALF_SIZE).abs() < 1e-6);
    }

    #[test]
    fn inverse_round_trips() {
        let (lon, lat) = to_wgs84(to_web_mercator(144.9, -37.81).unwrap());
        assert!((lon - 144.9).abs() < 1e-9);
        assert!((lat - -37.81).abs() < 1e-9);
    }

    #[test]
    fn rejects_nan_and_out_of_range() {
        assert!(matches!(
            to_web_mercator(f64::NAN, 0.0),
            Err(ProjectionError::NonFinite { .. })
        ));
        assert!(matches!(
            to_web_mercator(0.0, f64::INFINITY),
            Err(ProjectionError::NonFinite { .. })
        ));
        assert!(matches!(
            to_web_mercator(181.0, 0.0),
            Err(ProjectionError::OutOfRange { .. })
        ));
        assert!(matches!(
            to_web_mercator(0.0, -91.0),
            Err(ProjectionError::OutOfRange { .. })
        ));
    }

    #[test]
    fn projects_extent() {
        let rect = extent_to_web_mercator([144.8, -37.9, 145.0, -37.7]).unwrap();
        assert!(rect.min().x < rect.max().x);
        assert!(rect.min().y < rect.max().y);
        assert!((rect.max().x - to_web_mercator(145.0, -37.7).unwrap().x).abs() < 1e-6);
    }

    #[test]
    fn rejects_inverted_extent() {
        assert!(matches!(
            extent_to_web_mercator([145.0, -37.9, 144.8, -37.7]),
            Err(ProjectionError::InvalidExtent { .. })
        ));
    }
}
