//! The polling place layer for one election.
//!
//! Loading starts as soon as the layer is created: the fetch runs on a
//! Tokio task and publishes its outcome on a watch channel. The owner
//! picks the outcome up with [`DataLayer::poll`] (non-blocking) or
//! [`DataLayer::wait`], so the layer is only ever mutated by whoever owns
//! it. Dropping the layer aborts a fetch that is still running.

use std::sync::Arc;

use sausage_map_map_models::{ElectionId, PollingPlaceFeature};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::hit_test::HitIndex;
use crate::source::FeatureSource;
use crate::style::StyleFunction;
use crate::view::{MapSize, Pixel, View};

/// Where the layer's features are at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataStatus {
    /// Fetch in flight.
    Loading,
    /// Features are drawn and clickable.
    Ready {
        /// Number of features loaded.
        features: usize,
    },
    /// The fetch failed; the layer stays empty until retried.
    Failed {
        /// What went wrong, for display next to a retry affordance.
        message: String,
    },
}

/// What the fetch task publishes.
#[derive(Clone)]
enum SourceState {
    Loading,
    Ready(Arc<Vec<PollingPlaceFeature>>),
    Failed(String),
}

/// Polling place markers for one election.
pub struct DataLayer {
    election_id: ElectionId,
    source: Arc<dyn FeatureSource>,
    runtime: Handle,
    style: StyleFunction,
    style_revision: u64,
    status: DataStatus,
    features: Arc<Vec<PollingPlaceFeature>>,
    index: HitIndex,
    state_rx: watch::Receiver<SourceState>,
    task: JoinHandle<()>,
}

impl DataLayer {
    /// Creates the layer and starts fetching `election_id`'s features on
    /// `runtime`.
    #[must_use]
    pub fn load(
        election_id: ElectionId,
        source: Arc<dyn FeatureSource>,
        style: StyleFunction,
        runtime: Handle,
    ) -> Self {
        let (state_rx, task) = spawn_fetch(&runtime, Arc::clone(&source), election_id.clone());

        Self {
            election_id,
            source,
            runtime,
            style,
            style_revision: 0,
            status: DataStatus::Loading,
            features: Arc::default(),
            index: HitIndex::default(),
            state_rx,
            task,
        }
    }

    /// Election the layer shows.
    #[must_use]
    pub const fn election_id(&self) -> &ElectionId {
        &self.election_id
    }

    /// Current load status.
    #[must_use]
    pub const fn status(&self) -> &DataStatus {
        &self.status
    }

    /// Loaded features; empty until [`DataStatus::Ready`].
    #[must_use]
    pub fn features(&self) -> &[PollingPlaceFeature] {
        &self.features
    }

    /// Style function features are drawn with.
    #[must_use]
    pub const fn style(&self) -> &StyleFunction {
        &self.style
    }

    /// Bumped every time the style function is replaced.
    #[must_use]
    pub const fn style_revision(&self) -> u64 {
        self.style_revision
    }

    /// Replaces the style function. Features are restyled in place on the
    /// next draw; nothing is refetched.
    pub fn set_style(&mut self, style: StyleFunction) {
        log::debug!(
            "Restyling election {} data layer with {:?}",
            self.election_id,
            style.filter()
        );
        self.style = style;
        self.style_revision += 1;
    }

    /// Applies the fetch outcome if one has arrived.
    ///
    /// Returns `true` when this call moved the layer out of
    /// [`DataStatus::Loading`].
    pub fn poll(&mut self) -> bool {
        if self.status != DataStatus::Loading {
            return false;
        }

        let closed = self.state_rx.has_changed().is_err();
        let state = self.state_rx.borrow_and_update().clone();

        match state {
            SourceState::Loading if closed => {
                self.fail("fetch task ended without a result".to_string());
                true
            }
            SourceState::Loading => false,
            SourceState::Ready(features) => {
                self.ready(features);
                true
            }
            SourceState::Failed(message) => {
                self.fail(message);
                true
            }
        }
    }

    /// Waits for the fetch to finish and applies its outcome.
    ///
    /// Returns `true` when this call moved the layer out of
    /// [`DataStatus::Loading`]; `false` if it had already settled.
    pub async fn wait(&mut self) -> bool {
        loop {
            if self.poll() {
                return true;
            }
            if self.status != DataStatus::Loading {
                return false;
            }
            if self.state_rx.changed().await.is_err() {
                return self.poll();
            }
        }
    }

    /// Drops whatever was loaded and fetches again.
    pub fn retry(&mut self) {
        log::info!("Refetching election {} data layer", self.election_id);
        self.task.abort();

        let (state_rx, task) = spawn_fetch(
            &self.runtime,
            Arc::clone(&self.source),
            self.election_id.clone(),
        );
        self.state_rx = state_rx;
        self.task = task;
        self.status = DataStatus::Loading;
        self.features = Arc::default();
        self.index = HitIndex::default();
    }

    /// Features drawn under `pixel`, top-most first.
    #[must_use]
    pub fn features_at(
        &self,
        view: &View,
        size: MapSize,
        pixel: Pixel,
        tolerance_px: f64,
    ) -> Vec<PollingPlaceFeature> {
        self.index
            .hits(&self.features, &self.style, view, size, pixel, tolerance_px)
            .into_iter()
            .filter_map(|i| self.features.get(i).cloned())
            .collect()
    }

    fn ready(&mut self, features: Arc<Vec<PollingPlaceFeature>>) {
        match HitIndex::build(&features) {
            Ok(index) => {
                log::info!(
                    "Election {} data layer ready with {} features",
                    self.election_id,
                    features.len()
                );
                self.status = DataStatus::Ready {
                    features: features.len(),
                };
                self.index = index;
                self.features = features;
            }
            Err(e) => self.fail(format!("Projection error: {e}")),
        }
    }

    fn fail(&mut self, message: String) {
        log::error!(
            "Election {} data layer failed to load: {message}",
            self.election_id
        );
        self.status = DataStatus::Failed { message };
    }
}

impl Drop for DataLayer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn spawn_fetch(
    runtime: &Handle,
    source: Arc<dyn FeatureSource>,
    election_id: ElectionId,
) -> (watch::Receiver<SourceState>, JoinHandle<()>) {
    let (state_tx, state_rx) = watch::channel(SourceState::Loading);

    let task = runtime.spawn(async move {
        let state = match source.fetch(&election_id).await {
            Ok(features) => SourceState::Ready(Arc::new(features)),
            Err(e) => SourceState::Failed(e.to_string()),
        };
        // The layer may already be gone; nobody is left to tell.
        let _ = state_tx.send(state);
    });

    (state_rx, task)
}
