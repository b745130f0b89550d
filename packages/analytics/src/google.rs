//! Google Analytics measurement protocol sink.
//!
//! Posts one `t=event` hit per tracked event to the `collect` endpoint.
//! Each post runs on its own spawned task so [`AnalyticsSink::track`]
//! returns immediately.
//!
//! See <https://developers.google.com/analytics/devguides/collection/protocol/v1>

use crate::{AnalyticsError, AnalyticsEvent, AnalyticsSink};

/// Default measurement protocol endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://www.google-analytics.com/collect";

/// Sends events to a Universal Analytics property.
pub struct GoogleAnalyticsSink {
    client: reqwest::Client,
    runtime: tokio::runtime::Handle,
    endpoint: String,
    tracking_id: String,
    client_id: String,
}

impl GoogleAnalyticsSink {
    /// Creates a sink for the `UA-...` property `tracking_id`.
    ///
    /// Events are delivered on the Tokio runtime current at construction
    /// time. A random client id is generated per sink.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Config`] if `tracking_id` is empty and
    /// [`AnalyticsError::NoRuntime`] if called outside a Tokio runtime.
    pub fn new(tracking_id: impl Into<String>) -> Result<Self, AnalyticsError> {
        let tracking_id = tracking_id.into();
        if tracking_id.trim().is_empty() {
            return Err(AnalyticsError::Config {
                message: "Google Analytics tracking id is empty".to_string(),
            });
        }

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| AnalyticsError::NoRuntime)?;

        Ok(Self {
            client: reqwest::Client::new(),
            runtime,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            tracking_id,
            client_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Overrides the collect endpoint (self-hosted proxies, tests).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Form fields for a single event hit.
    fn hit(&self, event: &AnalyticsEvent) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("v", "1".to_string()),
            ("tid", self.tracking_id.clone()),
            ("cid", self.client_id.clone()),
            ("t", "event".to_string()),
            ("ec", event.category.clone()),
            ("ea", event.action.clone()),
        ];
        if let Some(label) = &event.label {
            form.push(("el", label.clone()));
        }
        if let Some(value) = event.value {
            form.push(("ev", value.to_string()));
        }
        form
    }
}

impl AnalyticsSink for GoogleAnalyticsSink {
    fn track(&self, event: AnalyticsEvent) {
        let form = self.hit(&event);
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();

        self.runtime.spawn(async move {
            match client.post(&endpoint).form(&form).send().await {
                Ok(resp) if !resp.status().is_success() => {
                    log::debug!(
                        "analytics hit '{}' rejected with status {}",
                        event.action,
                        resp.status()
                    );
                }
                Ok(_) => {}
                Err(e) => log::debug!("analytics hit '{}' failed: {e}", event.action),
            }
        });
    }
}
