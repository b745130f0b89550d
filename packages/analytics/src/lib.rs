#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytics events for the sausage map.
//!
//! The map reports what users do with it (basemap shown, features queried)
//! through the [`AnalyticsSink`] trait. Tracking is fire-and-forget:
//! [`AnalyticsSink::track`] never blocks and never fails from the caller's
//! point of view. Delivery problems are logged and dropped.

pub mod google;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;

pub use google::GoogleAnalyticsSink;

/// A single analytics event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsEvent {
    /// Event category, usually the component name (e.g. `"OpenLayersMap"`).
    pub category: String,
    /// What happened (e.g. `"Query Features"`).
    pub action: String,
    /// Optional qualifier for the action.
    pub label: Option<String>,
    /// Optional numeric payload.
    pub value: Option<i64>,
}

impl AnalyticsEvent {
    /// Creates an event with no label or value.
    #[must_use]
    pub fn new(category: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            label: None,
            value: None,
        }
    }

    /// Sets the event label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the event value.
    #[must_use]
    pub const fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }
}

/// Destination for analytics events.
///
/// Implementations must be `Send + Sync` so a single sink can be shared
/// across the controller and any spawned tasks.
pub trait AnalyticsSink: Send + Sync {
    /// Records `event` without blocking. Failures are swallowed.
    fn track(&self, event: AnalyticsEvent);
}

/// Errors constructing an analytics sink.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The sink needs a Tokio runtime to deliver events from.
    #[error("No Tokio runtime available to deliver analytics events")]
    NoRuntime,

    /// Sink configuration is unusable.
    #[error("Config error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

/// Writes every event to the `log` facade at debug level.
pub struct LogSink;

impl AnalyticsSink for LogSink {
    fn track(&self, event: AnalyticsEvent) {
        log::debug!(
            "analytics: {} / {} label={:?} value={:?}",
            event.category,
            event.action,
            event.label,
            event.value
        );
    }
}

/// Discards every event.
pub struct NullSink;

impl AnalyticsSink for NullSink {
    fn track(&self, _event: AnalyticsEvent) {}
}

/// Keeps every event in memory, in the order they were tracked.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything tracked so far.
    #[must_use]
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AnalyticsSink for MemorySink {
    fn track(&self, event: AnalyticsEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Returns a shared [`NullSink`] for callers that don't track anything.
#[must_use]
pub fn null_sink() -> Arc<dyn AnalyticsSink> {
    Arc::new(NullSink)
}
