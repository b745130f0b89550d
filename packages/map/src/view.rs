//! The map's view: centre and resolution in Web Mercator meters, plus
//! any fit animation in flight.
//!
//! Resolutions follow the standard 256 px tile pyramid, so zoom `z`
//! shows `MAX_RESOLUTION / 2^z` meters per pixel.

use std::time::Duration;

use geo::{Coord, Rect};

use crate::proj::HALF_SIZE;

/// Tile edge in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Meters per pixel at zoom 0.
pub const MAX_RESOLUTION: f64 = 2.0 * HALF_SIZE / TILE_SIZE;

/// Deepest zoom a fit will go to.
pub const MAX_ZOOM: f64 = 28.0;

/// Pixel dimensions of the mounting surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl MapSize {
    /// A `width` x `height` surface.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A position on the mounting surface, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    /// Pixels from the left edge.
    pub x: f64,
    /// Pixels from the top edge.
    pub y: f64,
}

impl Pixel {
    /// Pixel at `(x, y)`.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Space kept clear around a fitted extent, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Padding {
    /// Top.
    pub top: f64,
    /// Right.
    pub right: f64,
    /// Bottom.
    pub bottom: f64,
    /// Left.
    pub left: f64,
}

impl From<[f64; 4]> for Padding {
    fn from([top, right, bottom, left]: [f64; 4]) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

/// An animated move of the view to fit an extent.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewAnimation {
    /// Extent being fitted.
    pub extent: Rect<f64>,
    /// Centre once the animation completes.
    pub center: Coord<f64>,
    /// Resolution once the animation completes.
    pub resolution: f64,
    /// How long the animation runs.
    pub duration: Duration,
}

/// Centre and resolution of the map.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    center: Coord<f64>,
    resolution: f64,
    revision: u64,
    animation: Option<ViewAnimation>,
}

/// Resolution for a zoom level.
#[must_use]
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    MAX_RESOLUTION / zoom.exp2()
}

impl View {
    /// A view centred on `center` at `zoom`.
    #[must_use]
    pub fn new(center: Coord<f64>, zoom: f64) -> Self {
        Self {
            center,
            resolution: resolution_for_zoom(zoom),
            revision: 0,
            animation: None,
        }
    }

    /// Current centre.
    #[must_use]
    pub const fn center(&self) -> Coord<f64> {
        self.center
    }

    /// Meters per pixel.
    #[must_use]
    pub const fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Current zoom level.
    #[must_use]
    pub fn zoom(&self) -> f64 {
        (MAX_RESOLUTION / self.resolution).log2()
    }

    /// Bumped whenever the view changes; renderers repaint when it moves.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Marks the view as changed so it gets repainted.
    pub const fn changed(&mut self) {
        self.revision += 1;
    }

    /// Recentres the view.
    pub const fn set_center(&mut self, center: Coord<f64>) {
        self.center = center;
        self.changed();
    }

    /// Shifts the centre west by `meters`.
    ///
    /// Forces a repaint of freshly loaded layers and keeps the searched
    /// location clear of the app bar.
    pub const fn nudge(&mut self, meters: f64) {
        self.set_center(Coord {
            x: self.center.x - meters,
            y: self.center.y,
        });
    }

    /// Map coordinate under `pixel`.
    #[must_use]
    pub fn coordinate_at(&self, pixel: Pixel, size: MapSize) -> Coord<f64> {
        Coord {
            x: (pixel.x - f64::from(size.width) / 2.0).mul_add(self.resolution, self.center.x),
            y: (f64::from(size.height) / 2.0 - pixel.y).mul_add(self.resolution, self.center.y),
        }
    }

    /// Pixel that `coord` is drawn at.
    #[must_use]
    pub fn pixel_at(&self, coord: Coord<f64>, size: MapSize) -> Pixel {
        Pixel {
            x: (coord.x - self.center.x) / self.resolution + f64::from(size.width) / 2.0,
            y: (self.center.y - coord.y) / self.resolution + f64::from(size.height) / 2.0,
        }
    }

    /// Starts an animation that fits `extent` inside `size` less
    /// `padding`, snapped to the closest whole zoom level that still
    /// shows all of it.
    ///
    /// Replaces any animation already in flight.
    pub fn fit(
        &mut self,
        extent: Rect<f64>,
        size: MapSize,
        padding: Padding,
        duration: Duration,
    ) -> &ViewAnimation {
        let width = (f64::from(size.width) - padding.left - padding.right).max(1.0);
        let height = (f64::from(size.height) - padding.top - padding.bottom).max(1.0);

        let raw = (extent.width() / width).max(extent.height() / height);
        let zoom = if raw > 0.0 {
            (MAX_RESOLUTION / raw).log2().floor().clamp(0.0, MAX_ZOOM)
        } else {
            MAX_ZOOM
        };
        let resolution = resolution_for_zoom(zoom);

        let mid = extent.center();
        let center = Coord {
            x: ((padding.right - padding.left) / 2.0).mul_add(resolution, mid.x),
            y: ((padding.top - padding.bottom) / 2.0).mul_add(resolution, mid.y),
        };

        log::debug!("Fitting view to {extent:?}: zoom {zoom}, centre {center:?}");

        self.animation.insert(ViewAnimation {
            extent,
            center,
            resolution,
            duration,
        })
    }

    /// Animation in flight, if any.
    #[must_use]
    pub const fn animation(&self) -> Option<&ViewAnimation> {
        self.animation.as_ref()
    }

    /// Ends the animation in flight.
    ///
    /// When `completed` the view lands on the animation's target;
    /// otherwise it stays where it is. Returns the finished animation.
    pub fn finish_animation(&mut self, completed: bool) -> Option<ViewAnimation> {
        let animation = self.animation.take()?;
        if completed {
            self.center = animation.center;
            self.resolution = animation.resolution;
            self.changed();
        }
        Some(animation)
    }
}
