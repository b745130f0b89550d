//! Map configuration.
//!
//! Defaults live in `config/map.toml`, embedded at compile time. The API
//! base URL and analytics property can be overridden from the
//! environment, the same way a deployment points the front end at its
//! API.

use std::time::Duration;

use serde::Deserialize;

use crate::MapError;
use crate::view::Padding;

/// Environment variable overriding [`MapConfig::api_base_url`].
pub const API_BASE_URL_ENV: &str = "SAUSAGE_MAP_API_BASE_URL";

/// Environment variable setting [`MapConfig::google_analytics_ua`].
pub const GOOGLE_ANALYTICS_UA_ENV: &str = "SAUSAGE_MAP_GOOGLE_ANALYTICS_UA";

const EMBEDDED_CONFIG: &str = include_str!("../config/map.toml");

/// Everything the controller and feature source need to know.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapConfig {
    /// Base URL of the API (without trailing `/0.1/...`).
    pub api_base_url: String,
    /// Google Analytics property, when analytics are reported.
    #[serde(default)]
    pub google_analytics_ua: Option<String>,
    /// Base tile layer.
    pub basemap: BasemapConfig,
    /// Click handling.
    pub query: QueryConfig,
    /// Search result framing.
    pub search: SearchConfig,
    /// Map endpoint fetching.
    pub fetch: FetchConfig,
}

/// Raster basemap settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BasemapConfig {
    /// Name reported to analytics.
    pub label: String,
    /// XYZ URL template with `{a-c}`, `{z}`, `{x}`, `{y}` placeholders.
    pub url: String,
    /// HTML attribution; always shown.
    pub attribution: String,
}

/// Click handling settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryConfig {
    /// Extra pixels around each marker that still count as a hit.
    pub hit_tolerance_px: f64,
    /// Most features forwarded per click.
    pub max_features: usize,
}

/// How the view frames a search result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchConfig {
    /// `[top, right, bottom, left]` pixels kept clear when fitting.
    pub fit_padding: [f64; 4],
    /// Fit animation length in milliseconds.
    pub fit_duration_ms: u64,
    /// Meters the centre is nudged west after a fit or data load.
    pub nudge_m: f64,
}

impl SearchConfig {
    /// Fit padding.
    #[must_use]
    pub fn padding(&self) -> Padding {
        Padding::from(self.fit_padding)
    }

    /// Fit animation length.
    #[must_use]
    pub const fn fit_duration(&self) -> Duration {
        Duration::from_millis(self.fit_duration_ms)
    }
}

/// Map endpoint fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchConfig {
    /// Retries for transient failures (connect, timeout, 429, 5xx).
    pub max_retries: u32,
    /// First backoff delay in milliseconds; doubles per retry.
    pub retry_base_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl MapConfig {
    /// The embedded default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed (it is checked by the
    /// tests, so this cannot happen in a tested build).
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml_str(EMBEDDED_CONFIG)
            .unwrap_or_else(|e| panic!("Failed to parse embedded map.toml: {e}"))
    }

    /// Parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Config`] if `toml_str` is not a valid map
    /// configuration, and [`MapError::InvalidConfig`] if a click would be
    /// allowed to forward no features.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, MapError> {
        let config: Self = toml::de::from_str(toml_str)?;

        if config.query.max_features == 0 {
            return Err(MapError::InvalidConfig {
                message: "query.max_features must be at least 1".to_string(),
            });
        }

        Ok(config)
    }

    /// Applies overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up through `lookup` (keys are the `*_ENV`
    /// constants). Empty values are ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(API_BASE_URL_ENV) {
            log::debug!("Using API base URL from {API_BASE_URL_ENV}: {url}");
            self.api_base_url = url;
        }
        if let Some(ua) = lookup(GOOGLE_ANALYTICS_UA_ENV) {
            self.google_analytics_ua = Some(ua);
        }
        self
    }
}
