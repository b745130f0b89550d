//! Marker styles for polling places.
//!
//! [`resolve_sprite`] is the decision table from a stall's amenity flags
//! to a sprite on the icon sheet. It is pure and total: every input,
//! including missing noms, maps to exactly one [`Sprite`].
//! [`resolve_style`] layers the user's filter toggles on top.

use sausage_map_map_models::{MapFilterOptions, Noms, PollingPlaceFeature};
use strum_macros::{AsRefStr, Display};

/// Icon sheet every sprite is cut from.
pub const SPRITE_SHEET: &str = "./icons/sprite_v2.png";

/// Half the largest sprite edge in pixels. Bounds the search radius used
/// when hit-testing.
pub const MAX_SPRITE_HALF_EXTENT: f64 = 16.0;

/// A marker icon on [`SPRITE_SHEET`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Sprite {
    /// Cake stall.
    Cake,
    /// BBQ and/or cake, sold out.
    BbqCakeRunOut,
    /// BBQ and cake.
    BbqCake,
    /// Sausage sizzle.
    Bbq,
    /// Nothing on offer.
    Nothing,
    /// No report yet. Dimmed and drawn beneath everything else.
    Unknown,
}

/// Where a sprite sits on the sheet and how it's drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconStyle {
    /// Image the icon is cut from.
    pub src: &'static str,
    /// `[x, y]` pixel offset into the sheet.
    pub offset: [u32; 2],
    /// `[width, height]` in pixels.
    pub size: [u32; 2],
    /// Opacity from 0 to 1.
    pub opacity: f64,
    /// Stacking order; higher draws on top.
    pub z_index: i32,
}

impl Sprite {
    /// Every sprite on the sheet, top to bottom.
    pub const ALL: &[Self] = &[
        Self::Cake,
        Self::BbqCakeRunOut,
        Self::BbqCake,
        Self::Bbq,
        Self::Nothing,
        Self::Unknown,
    ];

    /// Sheet position, size and draw order for this sprite.
    #[must_use]
    pub const fn icon(self) -> IconStyle {
        let (offset, size, opacity, z_index) = match self {
            Self::Cake => ([0, 0], [32, 32], 1.0, 1),
            Self::BbqCakeRunOut => ([0, 32], [32, 29], 1.0, 1),
            Self::BbqCake => ([0, 61], [32, 29], 1.0, 1),
            Self::Bbq => ([0, 90], [32, 32], 1.0, 1),
            Self::Nothing => ([0, 122], [24, 24], 1.0, 1),
            Self::Unknown => ([0, 146], [14, 14], 0.4, 0),
        };

        IconStyle {
            src: SPRITE_SHEET,
            offset,
            size,
            opacity,
            z_index,
        }
    }
}

/// How a single feature is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureStyle {
    /// Drawn with the given sprite.
    Icon(Sprite),
    /// Filtered out: not drawn and not clickable.
    Hidden,
}

impl FeatureStyle {
    /// The sprite, unless the feature is hidden.
    #[must_use]
    pub const fn sprite(self) -> Option<Sprite> {
        match self {
            Self::Icon(sprite) => Some(sprite),
            Self::Hidden => None,
        }
    }
}

/// Picks the sprite for a stall's amenity flags.
///
/// Evaluated in priority order; the first matching row wins:
///
/// | flags | sprite |
/// |---|---|
/// | `bbq && cake` | [`Sprite::BbqCake`] |
/// | `(bbq \|\| cake) && run_out` | [`Sprite::BbqCakeRunOut`] |
/// | `bbq` | [`Sprite::Bbq`] |
/// | `cake` | [`Sprite::Cake`] |
/// | `nothing` | [`Sprite::Nothing`] |
/// | `bbq == false && cake == false && other` | [`Sprite::Bbq`] |
/// | anything else, or no noms | [`Sprite::Unknown`] |
///
/// The `other` row requires `bbq` and `cake` to be explicitly `false` and
/// draws the BBQ sprite even though there may be no sausage. Stalls have
/// always been drawn this way so it's kept as-is.
#[must_use]
pub fn resolve_sprite(noms: Option<&Noms>) -> Sprite {
    let Some(noms) = noms else {
        return Sprite::Unknown;
    };

    let bbq = Noms::is(noms.bbq);
    let cake = Noms::is(noms.cake);

    if bbq && cake {
        Sprite::BbqCake
    } else if (bbq || cake) && Noms::is(noms.run_out) {
        Sprite::BbqCakeRunOut
    } else if bbq {
        Sprite::Bbq
    } else if cake {
        Sprite::Cake
    } else if Noms::is(noms.nothing) {
        Sprite::Nothing
    } else if noms.bbq == Some(false) && noms.cake == Some(false) && Noms::is(noms.other) {
        Sprite::Bbq
    } else {
        Sprite::Unknown
    }
}

/// Picks the style for a stall under the current filter toggles.
#[must_use]
pub fn resolve_style(noms: Option<&Noms>, filter: &MapFilterOptions) -> FeatureStyle {
    if filter.matches(noms) {
        FeatureStyle::Icon(resolve_sprite(noms))
    } else {
        FeatureStyle::Hidden
    }
}

/// The data layer's style function: the filter it was built against.
///
/// Replacing it restyles every feature on the next draw without touching
/// the features themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleFunction {
    filter: MapFilterOptions,
}

impl StyleFunction {
    /// Style function for `filter`.
    #[must_use]
    pub const fn new(filter: MapFilterOptions) -> Self {
        Self { filter }
    }

    /// The filter toggles this function applies.
    #[must_use]
    pub const fn filter(&self) -> &MapFilterOptions {
        &self.filter
    }

    /// Style for `feature`.
    #[must_use]
    pub fn style(&self, feature: &PollingPlaceFeature) -> FeatureStyle {
        resolve_style(feature.noms.as_ref(), &self.filter)
    }
}
