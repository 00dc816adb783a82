//! Place-name lookup for the map's "fly to location" search.
//!
//! Queries a Nominatim-compatible geocoder, restricted to Great Britain, and
//! returns the best match only.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ApiError;

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Zoom level the client flies to for a matched location
pub const FLY_TO_ZOOM: u8 = 13;

/// Suffix appended to every query to bias results towards the UK
const QUERY_SUFFIX: &str = ", UK";
const COUNTRY_CODES: &str = "gb";

/// Nominatim's usage policy requires an identifying User-Agent
const USER_AGENT: &str = concat!("propertymap/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

/// A resolved location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeMatch {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
    pub zoom: u8,
}

#[derive(Clone)]
pub struct GeocodeClient {
    client: Client,
    base_url: String,
}

impl GeocodeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build geocoder HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Resolve `query` to its best match, or `None` when nothing matched.
    pub async fn search(&self, query: &str) -> Result<Option<GeocodeMatch>> {
        let q = format!("{}{}", query.trim(), QUERY_SUFFIX);
        let url = format!("{}/search", self.base_url);
        debug!(query = %q, "Geocoding location");

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .query(&[
                ("q", q.as_str()),
                ("format", "json"),
                ("limit", "1"),
                ("countrycodes", COUNTRY_CODES),
            ])
            .send()
            .await
            .map_err(ApiError::from)
            .context("Failed to send geocoding request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body).into());
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .context("Failed to parse geocoding response")?;

        Ok(places.into_iter().next().and_then(Self::to_match))
    }

    fn to_match(place: NominatimPlace) -> Option<GeocodeMatch> {
        let latitude: f64 = place.lat.trim().parse().ok()?;
        let longitude: f64 = place.lon.trim().parse().ok()?;
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        Some(GeocodeMatch {
            latitude,
            longitude,
            display_name: place.display_name.unwrap_or_default(),
            zoom: FLY_TO_ZOOM,
        })
    }
}
