use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use weft_common::WeftError;

/// One forward-geocoding candidate. The provider returns coordinates as
/// strings; parsing happens at the resolver layer.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeHit {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
}

/// Structured address components from a reverse lookup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReverseAddress {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub city_district: Option<String>,
    #[serde(default)]
    pub road: Option<String>,
}

impl ReverseAddress {
    /// Best city-level name. Providers fill exactly one of these depending
    /// on settlement size.
    pub fn city_name(&self) -> Option<&str> {
        self.city
            .as_deref()
            .or(self.town.as_deref())
            .or(self.village.as_deref())
    }

    pub fn district_name(&self) -> Option<&str> {
        self.suburb.as_deref().or(self.city_district.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReverseHit {
    pub display_name: String,
    #[serde(default)]
    pub address: ReverseAddress,
}

/// External geocoding lookup. Implemented by `NominatimClient` and by
/// in-memory mocks in tests.
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    /// Free-text forward lookup. An empty vec means the provider answered
    /// but found nothing; an Err means the call itself failed.
    async fn search(&self, query: &str) -> Result<Vec<GeocodeHit>, WeftError>;

    /// Reverse lookup by coordinates.
    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<ReverseHit>, WeftError>;
}

/// Client for a Nominatim-compatible geocoding service. Identifies itself
/// via User-Agent as the service's usage policy requires; no auth token.
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl GeocodeProvider for NominatimClient {
    async fn search(&self, query: &str) -> Result<Vec<GeocodeHit>, WeftError> {
        if query.len() > 200 {
            return Err(WeftError::Invalid(
                "Geocode query too long (max 200 chars)".to_string(),
            ));
        }

        let resp = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("limit", "3")])
            .send()
            .await
            .map_err(|e| WeftError::Transient(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WeftError::Transient(format!(
                "Geocoder returned status {status}"
            )));
        }

        resp.json::<Vec<GeocodeHit>>()
            .await
            .map_err(|e| WeftError::Transient(e.to_string()))
    }

    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<ReverseHit>, WeftError> {
        let resp = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", lat.to_string().as_str()),
                ("lon", lon.to_string().as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| WeftError::Transient(e.to_string()))?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(WeftError::Transient(format!(
                "Geocoder returned status {status}"
            )));
        }

        let hit = resp
            .json::<ReverseHit>()
            .await
            .map_err(|e| WeftError::Transient(e.to_string()))?;
        Ok(Some(hit))
    }
}
