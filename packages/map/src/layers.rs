//! The map's layer stack, keyed by [`LayerRole`].
//!
//! Each role holds at most one layer. Layers are kept in draw order
//! (bottom first) regardless of the order they were installed in.

use sausage_map_map_models::LayerRole;

use crate::MapError;
use crate::config::BasemapConfig;
use crate::data_layer::DataLayer;
use crate::overlay::SearchOverlayLayer;

/// A raster XYZ tile layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    /// Name reported to analytics.
    pub label: String,
    /// XYZ URL template.
    pub url_template: String,
    /// HTML attribution.
    pub attribution: String,
    /// Whether the attribution may be collapsed behind a button.
    pub attribution_collapsible: bool,
}

impl TileLayer {
    /// The basemap described by `config`. Its attribution is always shown.
    #[must_use]
    pub fn basemap(config: &BasemapConfig) -> Self {
        Self {
            label: config.label.clone(),
            url_template: config.url.clone(),
            attribution: config.attribution.clone(),
            attribution_collapsible: false,
        }
    }
}

/// Something drawn on the map.
pub enum Layer {
    /// Basemap tiles.
    Tile(TileLayer),
    /// Polling place markers.
    Data(DataLayer),
    /// Search marker.
    SearchOverlay(SearchOverlayLayer),
}

impl Layer {
    /// The role this layer fills.
    #[must_use]
    pub const fn role(&self) -> LayerRole {
        match self {
            Self::Tile(_) => LayerRole::Base,
            Self::Data(_) => LayerRole::Data,
            Self::SearchOverlay(_) => LayerRole::SearchOverlay,
        }
    }
}

/// The installed layers, at most one per role.
#[derive(Default)]
pub struct LayerRegistry {
    layers: Vec<Layer>,
    revision: u64,
}

impl LayerRegistry {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `layer` in `role`'s slot, removing whatever was there first.
    /// `None` just empties the slot.
    ///
    /// Returns the removed layer. Every removal and addition bumps
    /// [`Self::revision`]; replacing nothing with nothing changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::LayerRole`] if `layer` fills a different role.
    /// The registry is left untouched.
    pub fn replace(
        &mut self,
        role: LayerRole,
        layer: Option<Layer>,
    ) -> Result<Option<Layer>, MapError> {
        if let Some(found) = layer.as_ref().map(Layer::role)
            && found != role
        {
            return Err(MapError::LayerRole {
                expected: role,
                found,
            });
        }

        let removed = self
            .layers
            .iter()
            .position(|l| l.role() == role)
            .map(|i| self.layers.remove(i));

        if removed.is_some() {
            log::debug!("Removed {role} layer");
            self.revision += 1;
        }

        if let Some(layer) = layer {
            let at = self.layers.partition_point(|l| l.role() < role);
            self.layers.insert(at, layer);
            log::debug!("Added {role} layer");
            self.revision += 1;
        }

        Ok(removed)
    }

    /// Removes every layer, top first. A data layer's fetch is aborted
    /// as it goes.
    pub fn clear(&mut self) {
        while let Some(layer) = self.layers.pop() {
            log::debug!("Removed {} layer", layer.role());
            self.revision += 1;
        }
    }

    /// The layer in `role`'s slot.
    #[must_use]
    pub fn get(&self, role: LayerRole) -> Option<&Layer> {
        self.layers.iter().find(|l| l.role() == role)
    }

    /// Number of installed layers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.layers.len()
    }

    /// Roles of the installed layers in draw order.
    #[must_use]
    pub fn roles(&self) -> Vec<LayerRole> {
        self.layers.iter().map(Layer::role).collect()
    }

    /// Bumped on every layer addition or removal.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// The basemap.
    #[must_use]
    pub fn base(&self) -> Option<&TileLayer> {
        match self.get(LayerRole::Base)? {
            Layer::Tile(tiles) => Some(tiles),
            _ => None,
        }
    }

    /// The data layer.
    #[must_use]
    pub fn data(&self) -> Option<&DataLayer> {
        match self.get(LayerRole::Data)? {
            Layer::Data(data) => Some(data),
            _ => None,
        }
    }

    /// The data layer, for restyling or applying a fetch outcome. Doesn't
    /// count as a layer change.
    pub fn data_mut(&mut self) -> Option<&mut DataLayer> {
        self.layers.iter_mut().find_map(|l| match l {
            Layer::Data(data) => Some(data),
            _ => None,
        })
    }

    /// The search marker.
    #[must_use]
    pub fn search_overlay(&self) -> Option<&SearchOverlayLayer> {
        match self.get(LayerRole::SearchOverlay)? {
            Layer::SearchOverlay(overlay) => Some(overlay),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapConfig;
    use crate::overlay::SEARCH_STAR;

    fn tiles() -> Layer {
        Layer::Tile(TileLayer::basemap(&MapConfig::embedded().basemap))
    }

    fn star(label: &str) -> Layer {
        Layer::SearchOverlay(SearchOverlayLayer {
            position: geo::Coord { x: 0.0, y: 0.0 },
            label: label.to_string(),
            style: SEARCH_STAR,
        })
    }

    #[test]
    fn basemap_attribution_is_not_collapsible() {
        let Layer::Tile(tiles) = tiles() else {
            unreachable!()
        };
        assert!(!tiles.attribution_collapsible);
        assert_eq!(tiles.label, "Carto");
    }

    #[test]
    fn keeps_draw_order() {
        let mut layers = LayerRegistry::new();
        layers.replace(LayerRole::SearchOverlay, Some(star("a"))).unwrap();
        layers.replace(LayerRole::Base, Some(tiles())).unwrap();
        assert_eq!(layers.roles(), vec![LayerRole::Base, LayerRole::SearchOverlay]);
    }

    #[test]
    fn replace_removes_before_adding() {
        let mut layers = LayerRegistry::new();
        layers.replace(LayerRole::SearchOverlay, Some(star("a"))).unwrap();
        assert_eq!(layers.revision(), 1);

        let removed = layers.replace(LayerRole::SearchOverlay, Some(star("b"))).unwrap();
        assert!(matches!(removed, Some(Layer::SearchOverlay(ref o)) if o.label == "a"));
        assert_eq!(layers.count(), 1);
        assert_eq!(layers.search_overlay().unwrap().label, "b");
        assert_eq!(layers.revision(), 3);
    }

    #[test]
    fn replace_with_nothing_empties_slot() {
        let mut layers = LayerRegistry::new();
        layers.replace(LayerRole::SearchOverlay, Some(star("a"))).unwrap();
        layers.replace(LayerRole::SearchOverlay, None).unwrap();
        assert_eq!(layers.count(), 0);

        let revision = layers.revision();
        assert!(layers.replace(LayerRole::SearchOverlay, None).unwrap().is_none());
        assert_eq!(layers.revision(), revision);
    }

    #[test]
    fn clear_removes_everything() {
        let mut layers = LayerRegistry::new();
        layers.replace(LayerRole::Base, Some(tiles())).unwrap();
        layers.replace(LayerRole::SearchOverlay, Some(star("a"))).unwrap();

        layers.clear();
        assert_eq!(layers.count(), 0);
        assert!(layers.roles().is_empty());
        assert_eq!(layers.revision(), 4);

        layers.clear();
        assert_eq!(layers.revision(), 4);
    }

    #[test]
    fn rejects_layer_for_wrong_role() {
        let mut layers = LayerRegistry::new();
        let Err(err) = layers.replace(LayerRole::Data, Some(tiles())) else {
            panic!("tile layer accepted as data layer");
        };
        assert!(matches!(
            err,
            MapError::LayerRole {
                expected: LayerRole::Data,
                found: LayerRole::Base
            }
        ));
        assert_eq!(layers.count(), 0);
        assert_eq!(layers.revision(), 0);
    }
}
