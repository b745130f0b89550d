//! Where the data layer's polling places come from.
//!
//! [`HttpFeatureSource`] fetches the election's `GeoJSON`
//! `FeatureCollection` from the map endpoint:
//!
//! ```text
//! GET {api_base_url}/0.1/map/?election_id={id}&s={timestamp_ms}
//! ```
//!
//! Both query values are percent-encoded.
//!
//! The `s` parameter busts caches between mounts. [`StaticFeatureSource`]
//! serves a fixed collection instead (tests, offline use).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use geojson::GeoJson;
use sausage_map_map_models::{ElectionId, Noms, PollingPlaceFeature};

use crate::retry::{self, RetryPolicy};
use crate::{MapConfig, MapError, proj};

/// Supplies the polling places for an election.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Fetches every polling place for `election`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError`] if the features can't be fetched or parsed.
    async fn fetch(&self, election: &ElectionId) -> Result<Vec<PollingPlaceFeature>, MapError>;
}

/// Fetches features from the API's map endpoint.
pub struct HttpFeatureSource {
    client: reqwest::Client,
    api_base_url: String,
    policy: RetryPolicy,
}

impl HttpFeatureSource {
    /// Builds a source from `config`'s API base URL and fetch settings.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Http`] if the HTTP client can't be built.
    pub fn new(config: &MapConfig) -> Result<Self, MapError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy {
                max_retries: config.fetch.max_retries,
                base_delay: Duration::from_millis(config.fetch.retry_base_ms),
            },
        })
    }

    /// Map endpoint URL, without the query string.
    #[must_use]
    pub fn map_url(&self) -> String {
        format!("{}/0.1/map/", self.api_base_url)
    }

    /// Request for `election`'s features with cache-busting
    /// `timestamp_ms`. Query values are percent-encoded.
    #[must_use]
    pub fn map_request(
        &self,
        election: &ElectionId,
        timestamp_ms: i64,
    ) -> reqwest::RequestBuilder {
        self.client.get(self.map_url()).query(&[
            ("election_id", election.as_str()),
            ("s", &timestamp_ms.to_string()),
        ])
    }
}

#[async_trait]
impl FeatureSource for HttpFeatureSource {
    async fn fetch(&self, election: &ElectionId) -> Result<Vec<PollingPlaceFeature>, MapError> {
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        log::info!(
            "Fetching polling places for election {election} from {}",
            self.map_url()
        );

        let body =
            retry::send_text(|| self.map_request(election, timestamp_ms), &self.policy).await?;
        let features = parse_feature_collection(&body)?;

        log::info!(
            "Loaded {} polling places for election {election}",
            features.len()
        );
        Ok(features)
    }
}

/// Serves a fixed set of features and counts how often it's asked.
#[derive(Default)]
pub struct StaticFeatureSource {
    features: Vec<PollingPlaceFeature>,
    fetches: AtomicUsize,
}

impl StaticFeatureSource {
    /// Serves `features` for every election.
    #[must_use]
    pub const fn new(features: Vec<PollingPlaceFeature>) -> Self {
        Self {
            features,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Serves the features of a `GeoJSON` `FeatureCollection`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError`] if `geojson` can't be parsed.
    pub fn from_geojson(geojson: &str) -> Result<Self, MapError> {
        Ok(Self::new(parse_feature_collection(geojson)?))
    }

    /// Number of times [`FeatureSource::fetch`] has been called.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeatureSource for StaticFeatureSource {
    async fn fetch(&self, _election: &ElectionId) -> Result<Vec<PollingPlaceFeature>, MapError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.features.clone())
    }
}

/// Parses the map endpoint's `FeatureCollection`.
///
/// Point features become [`PollingPlaceFeature`]s with their `noms`
/// pulled out of the properties. Features without a point geometry are
/// skipped with a warning. A point with a non-finite or out-of-range
/// position fails the whole collection.
///
/// # Errors
///
/// Returns [`MapError::GeoJson`] for invalid `GeoJSON`,
/// [`MapError::Fetch`] if the document isn't a `FeatureCollection`, and
/// [`MapError::InvalidFeature`] for an unusable position.
pub fn parse_feature_collection(body: &str) -> Result<Vec<PollingPlaceFeature>, MapError> {
    let GeoJson::FeatureCollection(collection) = body.parse::<GeoJson>()? else {
        return Err(MapError::Fetch {
            message: "map endpoint did not return a FeatureCollection".to_string(),
        });
    };

    let mut features = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.into_iter().enumerate() {
        let Some(geojson::Value::Point(position)) = feature.geometry.as_ref().map(|g| &g.value)
        else {
            log::warn!("Skipping feature {index}: not a point");
            continue;
        };

        let (Some(&lon), Some(&lat)) = (position.first(), position.get(1)) else {
            log::warn!("Skipping feature {index}: point has fewer than two ordinates");
            continue;
        };

        proj::validate(lon, lat).map_err(|source| MapError::InvalidFeature { index, source })?;

        let mut properties = feature.properties.unwrap_or_default();

        let noms = match properties.remove("noms") {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => match serde_json::from_value::<Noms>(value) {
                Ok(noms) => Some(noms),
                Err(e) => {
                    log::warn!("Feature {index} has unreadable noms, drawing as unknown: {e}");
                    None
                }
            },
        };

        if !properties.contains_key("id")
            && let Some(geojson::feature::Id::Number(id)) = &feature.id
        {
            properties.insert("id".to_string(), serde_json::Value::Number(id.clone()));
        }

        features.push(PollingPlaceFeature {
            lon,
            lat,
            noms,
            properties,
        });
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 7,
                "geometry": { "type": "Point", "coordinates": [145.0, -37.8] },
                "properties": {
                    "name": "Fitzroy North",
                    "noms": { "bbq": true, "cake": false }
                }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [144.9, -37.81] },
                "properties": { "id": 8, "name": "Carlton", "noms": null }
            },
            {
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[144.0, -37.0], [145.0, -38.0]]
                },
                "properties": { "name": "not a polling place" }
            }
        ]
    }"#;

    #[test]
    fn parses_points_and_noms() {
        let features = parse_feature_collection(COLLECTION).unwrap();
        assert_eq!(features.len(), 2);

        assert_eq!(features[0].id(), Some(7));
        assert_eq!(features[0].name(), Some("Fitzroy North"));
        let noms = features[0].noms.as_ref().unwrap();
        assert_eq!(noms.bbq, Some(true));
        assert_eq!(noms.cake, Some(false));
        assert!(!features[0].properties.contains_key("noms"));

        assert_eq!(features[1].id(), Some(8));
        assert!(features[1].noms.is_none());
    }

    #[test]
    fn unreadable_noms_become_unknown() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [145.0, -37.8] },
                "properties": { "noms": "lots" }
            }]
        }"#;
        let features = parse_feature_collection(body).unwrap();
        assert!(features[0].noms.is_none());
    }

    #[test]
    fn out_of_range_point_fails_with_index() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [145.0, -37.8] },
                    "properties": {}
                },
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [545.0, -37.8] },
                    "properties": {}
                }
            ]
        }"#;
        let err = parse_feature_collection(body).unwrap_err();
        assert!(matches!(err, MapError::InvalidFeature { index: 1, .. }), "{err}");
    }

    #[test]
    fn rejects_non_collection() {
        let body = r#"{ "type": "Point", "coordinates": [145.0, -37.8] }"#;
        assert!(matches!(
            parse_feature_collection(body),
            Err(MapError::Fetch { .. })
        ));
        assert!(matches!(
            parse_feature_collection("not json"),
            Err(MapError::GeoJson(_))
        ));
    }

    fn http_source() -> HttpFeatureSource {
        let mut config = MapConfig::embedded();
        config.api_base_url = "https://api.example.org/".to_string();
        HttpFeatureSource::new(&config).unwrap()
    }

    #[test]
    fn builds_cache_busted_url() {
        let request = http_source()
            .map_request(&ElectionId::new("E1"), 1_700_000_000_000)
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://api.example.org/0.1/map/?election_id=E1&s=1700000000000"
        );
    }

    #[test]
    fn encodes_reserved_characters_in_election_id() {
        let request = http_source()
            .map_request(&ElectionId::new("E 1&s=0#x"), 5)
            .build()
            .unwrap();
        let url = request.url();

        assert!(url.fragment().is_none());
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("election_id".to_string(), "E 1&s=0#x".to_string()),
                ("s".to_string(), "5".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn static_source_counts_fetches() {
        let source = StaticFeatureSource::from_geojson(COLLECTION).unwrap();
        let election = ElectionId::new("E1");
        assert_eq!(source.fetch(&election).await.unwrap().len(), 2);
        assert_eq!(source.fetch(&election).await.unwrap().len(), 2);
        assert_eq!(source.fetch_count(), 2);
    }
}
