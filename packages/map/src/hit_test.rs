//! Click hit-testing against the data layer's markers.
//!
//! Marker positions are kept in an R-tree in Web Mercator meters. A click
//! first narrows the candidates to an envelope large enough for the
//! biggest sprite, then checks each candidate's own sprite box (plus the
//! tolerance) in screen pixels.

use rstar::{AABB, RTree, RTreeObject};
use sausage_map_map_models::PollingPlaceFeature;

use crate::proj::{self, ProjectionError};
use crate::style::{MAX_SPRITE_HALF_EXTENT, StyleFunction};
use crate::view::{MapSize, Pixel, View};

/// A marker in the index: where it sits and which feature it is.
struct IndexedMarker {
    position: [f64; 2],
    order: usize,
}

impl RTreeObject for IndexedMarker {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Spatial index over a data layer's features.
#[derive(Default)]
pub struct HitIndex {
    tree: RTree<IndexedMarker>,
}

impl HitIndex {
    /// Reprojects and indexes `features`. Marker `i` refers to
    /// `features[i]`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProjectionError`] if any feature's position can't be
    /// reprojected.
    pub fn build(features: &[PollingPlaceFeature]) -> Result<Self, ProjectionError> {
        let markers = features
            .iter()
            .enumerate()
            .map(|(order, feature)| {
                let coord = proj::to_web_mercator(feature.lon, feature.lat)?;
                Ok(IndexedMarker {
                    position: [coord.x, coord.y],
                    order,
                })
            })
            .collect::<Result<Vec<_>, ProjectionError>>()?;

        Ok(Self {
            tree: RTree::bulk_load(markers),
        })
    }

    /// Number of indexed markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Indices of the features drawn under `pixel`, top-most first.
    ///
    /// A marker is hit when `pixel` falls within its sprite box grown by
    /// `tolerance_px` on every side. Hidden markers are never hit. Hits
    /// are ordered the way they're drawn from the top: higher z-index
    /// first, then later features before earlier ones.
    #[must_use]
    pub fn hits(
        &self,
        features: &[PollingPlaceFeature],
        style: &StyleFunction,
        view: &View,
        size: MapSize,
        pixel: Pixel,
        tolerance_px: f64,
    ) -> Vec<usize> {
        let tolerance_px = tolerance_px.max(0.0);
        let at = view.coordinate_at(pixel, size);
        let reach = (MAX_SPRITE_HALF_EXTENT + tolerance_px) * view.resolution();
        let envelope = AABB::from_corners([at.x - reach, at.y - reach], [at.x + reach, at.y + reach]);

        let mut hits: Vec<(i32, usize)> = self
            .tree
            .locate_in_envelope(&envelope)
            .filter_map(|marker| {
                let feature = features.get(marker.order)?;
                let icon = style.style(feature).sprite()?.icon();

                let drawn = view.pixel_at(
                    geo::Coord {
                        x: marker.position[0],
                        y: marker.position[1],
                    },
                    size,
                );
                let half_width = f64::from(icon.size[0]) / 2.0 + tolerance_px;
                let half_height = f64::from(icon.size[1]) / 2.0 + tolerance_px;

                ((pixel.x - drawn.x).abs() <= half_width && (pixel.y - drawn.y).abs() <= half_height)
                    .then_some((icon.z_index, marker.order))
            })
            .collect();

        hits.sort_unstable_by(|a, b| b.cmp(a));
        hits.into_iter().map(|(_, order)| order).collect()
    }
}

#[cfg(test)]
mod tests {
    use sausage_map_map_models::{FilterOption, MapFilterOptions, Noms};

    use super::*;

    const SIZE: MapSize = MapSize::new(800, 600);
    const CENTRE: Pixel = Pixel::new(400.0, 300.0);

    fn feature(lon: f64, lat: f64, noms: Option<Noms>) -> PollingPlaceFeature {
        PollingPlaceFeature {
            lon,
            lat,
            noms,
            properties: serde_json::Map::new(),
        }
    }

    fn bbq() -> Noms {
        Noms {
            bbq: Some(true),
            ..Noms::default()
        }
    }

    fn view() -> View {
        View::new(proj::to_web_mercator(145.0, -37.8).unwrap(), 10.0)
    }

    #[test]
    fn hits_marker_under_click() {
        let features = vec![feature(145.0, -37.8, Some(bbq()))];
        let index = HitIndex::build(&features).unwrap();
        let hits = index.hits(&features, &StyleFunction::default(), &view(), SIZE, CENTRE, 3.0);
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn tolerance_extends_sprite_box() {
        let features = vec![feature(145.0, -37.8, Some(bbq()))];
        let index = HitIndex::build(&features).unwrap();
        let style = StyleFunction::default();
        let v = view();

        // Bbq sprite is 32 px wide: 16 px half width plus 3 px tolerance.
        let edge = Pixel::new(CENTRE.x + 18.5, CENTRE.y);
        let outside = Pixel::new(CENTRE.x + 19.5, CENTRE.y);
        assert_eq!(index.hits(&features, &style, &v, SIZE, edge, 3.0), vec![0]);
        assert!(index.hits(&features, &style, &v, SIZE, outside, 3.0).is_empty());
    }

    #[test]
    fn small_sprites_have_small_boxes() {
        // Unknown sprite is 14 px: 7 px half width plus 3 px tolerance.
        let features = vec![feature(145.0, -37.8, None)];
        let index = HitIndex::build(&features).unwrap();
        let near = Pixel::new(CENTRE.x + 12.0, CENTRE.y);
        assert!(
            index
                .hits(&features, &StyleFunction::default(), &view(), SIZE, near, 3.0)
                .is_empty()
        );
    }

    #[test]
    fn top_most_first() {
        let features = vec![
            feature(145.0, -37.8, Some(bbq())),
            feature(145.0, -37.8, None),
            feature(145.0, -37.8, Some(bbq())),
        ];
        let index = HitIndex::build(&features).unwrap();
        let hits = index.hits(&features, &StyleFunction::default(), &view(), SIZE, CENTRE, 3.0);
        // Unknown sits beneath everything; later features draw above earlier ones.
        assert_eq!(hits, vec![2, 0, 1]);
    }

    #[test]
    fn hidden_markers_are_not_hit() {
        let features = vec![feature(145.0, -37.8, Some(bbq()))];
        let index = HitIndex::build(&features).unwrap();
        let mut filter = MapFilterOptions::default();
        filter.set(FilterOption::Vego, true);

        let hits = index.hits(&features, &StyleFunction::new(filter), &view(), SIZE, CENTRE, 3.0);
        assert!(hits.is_empty());
    }

    #[test]
    fn rejects_unprojectable_feature() {
        let features = vec![feature(f64::NAN, -37.8, None)];
        assert!(HitIndex::build(&features).is_err());
    }
}
