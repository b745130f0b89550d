//! The map controller: one owned map per mounted view.
//!
//! The host mounts a controller with its current props, feeds it every
//! later prop change through [`MapController::update`], forwards clicks,
//! layout changes and readiness checks, and finally disposes it. Nothing
//! outside the controller ever mutates the view or the layers.

use std::sync::Arc;

use sausage_map_analytics::{AnalyticsEvent, AnalyticsSink};
use sausage_map_map_models::{
    Election, LayerRole, MapFilterOptions, MapSearchResult, PollingPlaceFeature,
};

use crate::data_layer::{DataLayer, DataStatus};
use crate::layers::{Layer, LayerRegistry, TileLayer};
use crate::overlay::build_search_overlay;
use crate::source::FeatureSource;
use crate::style::StyleFunction;
use crate::view::{MapSize, Pixel, View};
use crate::{MapConfig, MapError, proj};

/// Analytics category for everything the map reports.
const ANALYTICS_CATEGORY: &str = "OpenLayersMap";

/// Called with the features under a click, top-most first.
pub type QueryCallback = Box<dyn FnMut(Vec<PollingPlaceFeature>) + Send>;

/// The surface the map is mounted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapTarget {
    /// Host identifier of the surface.
    pub id: String,
    /// Current pixel size.
    pub size: MapSize,
}

/// Host state the map follows. Compared by value.
#[derive(Debug, Clone, PartialEq)]
pub struct MapProps {
    /// Election whose polling places are shown.
    pub election: Election,
    /// The user's last search, if any.
    pub map_search_results: Option<MapSearchResult>,
    /// Which polling places to show.
    pub map_filter_options: MapFilterOptions,
}

/// Collaborators the controller talks to.
#[derive(Clone)]
pub struct MapDeps {
    /// Where polling places come from.
    pub source: Arc<dyn FeatureSource>,
    /// Where usage events go.
    pub analytics: Arc<dyn AnalyticsSink>,
    /// Map settings.
    pub config: MapConfig,
}

/// What an [`MapController::update`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing differed from what's shown.
    Unchanged,
    /// The search marker was replaced.
    SearchOverlayReplaced {
        /// Whether a new marker went in (`false` when the search cleared).
        installed: bool,
    },
    /// The data layer was restyled for new filter options.
    Restyled,
}

/// What a click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickOutcome {
    /// Features under the click.
    pub hits: usize,
    /// Features handed to the query callback.
    pub forwarded: usize,
}

/// Owns a single map for the lifetime of its mount.
pub struct MapController {
    target: MapTarget,
    view: View,
    layers: LayerRegistry,
    props: MapProps,
    analytics: Arc<dyn AnalyticsSink>,
    config: MapConfig,
    on_query_map: QueryCallback,
    /// Last search that couldn't be shown. Kept so a host that keeps
    /// sending it still gets its filter changes applied.
    rejected_search: Option<Option<MapSearchResult>>,
}

impl MapController {
    /// Builds the map on `target`: basemap, then the election's data
    /// layer (its fetch starts straight away), then the search marker if
    /// there is a search.
    ///
    /// # Errors
    ///
    /// * [`MapError::NoRuntime`] if called outside a Tokio runtime
    /// * [`MapError::Projection`] if the election centre or search
    ///   position isn't a valid WGS84 coordinate
    pub fn mount(
        target: MapTarget,
        props: MapProps,
        deps: MapDeps,
        on_query_map: QueryCallback,
    ) -> Result<Self, MapError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MapError::NoRuntime)?;

        let election = &props.election;
        let center = proj::to_web_mercator(election.geom.lon(), election.geom.lat())?;
        let view = View::new(center, f64::from(election.default_zoom_level));
        let overlay = build_search_overlay(props.map_search_results.as_ref())?;

        log::info!(
            "Mounting map on '{}' ({}x{}) for election {}",
            target.id,
            target.size.width,
            target.size.height,
            election.id
        );

        let MapDeps {
            source,
            analytics,
            config,
        } = deps;

        let mut layers = LayerRegistry::new();

        let basemap = TileLayer::basemap(&config.basemap);
        analytics.track(
            AnalyticsEvent::new(ANALYTICS_CATEGORY, "Basemap Shown").with_label(&basemap.label),
        );
        layers.replace(LayerRole::Base, Some(Layer::Tile(basemap)))?;

        let data = DataLayer::load(
            election.id.clone(),
            source,
            StyleFunction::new(props.map_filter_options),
            runtime,
        );
        layers.replace(LayerRole::Data, Some(Layer::Data(data)))?;

        if let Some(overlay) = overlay {
            layers.replace(LayerRole::SearchOverlay, Some(Layer::SearchOverlay(overlay)))?;
        }

        Ok(Self {
            target,
            view,
            layers,
            props,
            analytics,
            config,
            on_query_map,
            rejected_search: None,
        })
    }

    /// The mounting surface.
    #[must_use]
    pub const fn target(&self) -> &MapTarget {
        &self.target
    }

    /// The view.
    #[must_use]
    pub const fn view(&self) -> &View {
        &self.view
    }

    /// The installed layers.
    #[must_use]
    pub const fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    /// The props last applied.
    #[must_use]
    pub const fn props(&self) -> &MapProps {
        &self.props
    }

    /// Load status of the data layer.
    #[must_use]
    pub fn data_status(&self) -> Option<&DataStatus> {
        self.layers.data().map(DataLayer::status)
    }

    /// Brings the map in line with `props`.
    ///
    /// A changed search replaces the search marker and, when the search
    /// has an extent, fits the view to it. Otherwise, filter options that
    /// differ from the ones the data layer is drawn with restyle it in
    /// place. Only one of the two happens per call; a filter change that
    /// arrives alongside a search change is picked up by the next call.
    ///
    /// The election is fixed for the life of the mount. Remount to show a
    /// different one.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Projection`] if the new search position or
    /// extent isn't valid WGS84. The map is left as it was. The same
    /// search arriving again isn't retried, so the filter options that
    /// come with it are still applied.
    pub fn update(&mut self, props: MapProps) -> Result<UpdateOutcome, MapError> {
        if props.election.id != self.props.election.id {
            log::warn!(
                "Ignoring election change from {} to {}; remount the map to show it",
                self.props.election.id,
                props.election.id
            );
        }

        let MapProps {
            map_search_results,
            map_filter_options,
            ..
        } = props;

        if map_search_results == self.props.map_search_results {
            self.rejected_search = None;
        } else if self.rejected_search.as_ref() != Some(&map_search_results) {
            let built = build_search_overlay(map_search_results.as_ref()).and_then(|overlay| {
                let extent = map_search_results
                    .as_ref()
                    .and_then(|search| search.extent)
                    .map(proj::extent_to_web_mercator)
                    .transpose()?;
                Ok((overlay, extent))
            });
            let (overlay, extent) = match built {
                Ok(built) => built,
                Err(e) => {
                    log::warn!("Not showing search: {e}");
                    self.rejected_search = Some(map_search_results);
                    return Err(e.into());
                }
            };

            let installed = overlay.is_some();
            self.layers.replace(
                LayerRole::SearchOverlay,
                overlay.map(Layer::SearchOverlay),
            )?;

            if let Some(extent) = extent {
                self.view.fit(
                    extent,
                    self.target.size,
                    self.config.search.padding(),
                    self.config.search.fit_duration(),
                );
            }

            self.rejected_search = None;
            self.props.map_search_results = map_search_results;
            self.props.map_filter_options = map_filter_options;
            return Ok(UpdateOutcome::SearchOverlayReplaced { installed });
        }

        self.props.map_filter_options = map_filter_options;

        if let Some(data) = self.layers.data_mut()
            && data.style().filter() != &map_filter_options
        {
            data.set_style(StyleFunction::new(map_filter_options));
            return Ok(UpdateOutcome::Restyled);
        }

        Ok(UpdateOutcome::Unchanged)
    }

    /// Handles a click at `pixel`: reports it, hit-tests the data layer
    /// and hands up to `query.max_features` features to the query
    /// callback, top-most first. The callback isn't called when nothing
    /// was hit.
    pub fn click(&mut self, pixel: Pixel) -> ClickOutcome {
        self.analytics
            .track(AnalyticsEvent::new(ANALYTICS_CATEGORY, "Query Features"));

        let mut features = self
            .layers
            .data()
            .map(|data| {
                data.features_at(
                    &self.view,
                    self.target.size,
                    pixel,
                    self.config.query.hit_tolerance_px,
                )
            })
            .unwrap_or_default();
        let hits = features.len();

        self.analytics.track(
            AnalyticsEvent::new(ANALYTICS_CATEGORY, "Query Features")
                .with_label("Number of Features")
                .with_value(i64::try_from(hits).unwrap_or(i64::MAX)),
        );

        if features.is_empty() {
            return ClickOutcome { hits, forwarded: 0 };
        }

        if hits > self.config.query.max_features {
            log::debug!(
                "Click hit {hits} features, forwarding the top {}",
                self.config.query.max_features
            );
        }
        features.truncate(self.config.query.max_features);
        let forwarded = features.len();
        (self.on_query_map)(features);

        ClickOutcome { hits, forwarded }
    }

    /// The mounting surface changed size. Returns `true` if it actually
    /// did.
    pub fn resize(&mut self, size: MapSize) -> bool {
        if size == self.target.size {
            return false;
        }
        log::debug!(
            "Map '{}' resized to {}x{}",
            self.target.id,
            size.width,
            size.height
        );
        self.target.size = size;
        self.view.changed();
        true
    }

    /// Applies the data layer's fetch outcome if it has arrived.
    ///
    /// Returns the new status when the data layer just settled.
    pub fn poll_source(&mut self) -> Option<DataStatus> {
        let settled = self.layers.data_mut()?.poll();
        settled.then(|| self.on_source_settled())
    }

    /// Waits until the data layer has loaded or failed, applying the
    /// outcome. Returns the status straight away if it already settled.
    pub async fn settled(&mut self) -> Option<DataStatus> {
        let data = self.layers.data_mut()?;
        if data.wait().await {
            Some(self.on_source_settled())
        } else {
            Some(data.status().clone())
        }
    }

    /// Refetches the data layer, typically after it failed.
    pub fn retry_data_layer(&mut self) {
        if let Some(data) = self.layers.data_mut() {
            data.retry();
        }
    }

    /// Ends the view's fit animation. When it ran to completion the
    /// centre is nudged west so the searched location clears the app bar.
    ///
    /// Returns `true` if an animation was in flight.
    pub fn finish_view_animation(&mut self, completed: bool) -> bool {
        if self.view.finish_animation(completed).is_none() {
            return false;
        }
        if completed {
            self.view.nudge(self.config.search.nudge_m);
        }
        true
    }

    /// Tears the map down. Layers are removed top first; a fetch still in
    /// flight is aborted.
    pub fn dispose(mut self) {
        log::info!("Disposing map on '{}'", self.target.id);
        self.layers.clear();
    }

    fn on_source_settled(&mut self) -> DataStatus {
        let status = self
            .layers
            .data()
            .map_or(DataStatus::Loading, |data| data.status().clone());

        if matches!(status, DataStatus::Ready { .. }) {
            self.view.changed();

            let extent = self
                .props
                .map_search_results
                .as_ref()
                .and_then(|search| search.extent)
                .map(proj::extent_to_web_mercator);

            match extent {
                Some(Ok(extent)) => {
                    self.view.fit(
                        extent,
                        self.target.size,
                        self.config.search.padding(),
                        self.config.search.fit_duration(),
                    );
                }
                Some(Err(e)) => log::warn!("Not refitting to search extent: {e}"),
                None => self.view.nudge(self.config.search.nudge_m),
            }
        }

        status
    }
}
