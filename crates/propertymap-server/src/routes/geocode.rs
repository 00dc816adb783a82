use std::sync::Arc;

use axum::extract::Query;
use axum::routing::get;
use axum::{Extension, Json, Router};
use propertymap_core::GeocodeMatch;
use serde::Deserialize;
use tracing::warn;

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub q: Option<String>,
}

pub fn router() -> Router {
    Router::new().route("/geocode", get(geocode))
}

/// Resolve a place name for the map's "fly to location" search.
#[tracing::instrument(level = "debug", skip_all)]
pub async fn geocode(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<GeocodeQuery>,
) -> Result<Json<GeocodeMatch>, ApiError> {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return Err(ApiError::InvalidInput("q is required".to_string()));
    }

    match state.geocoder.search(q).await {
        Ok(Some(found)) => Ok(Json(found)),
        Ok(None) => Err(ApiError::LocationNotFound(q.to_string())),
        Err(e) => {
            warn!(query = q, error = %format!("{:#}", e), "Geocoding failed");
            Err(ApiError::Geocode(format!("{:#}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{
        app, app_with_geocoder, get_json, spawn_geocoder, StaticSource,
    };
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let app = app(StaticSource::new(Vec::new()));

        let (status, body) = get_json(&app, "/api/geocode").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "q is required");

        let (status, _) = get_json(&app, "/api/geocode?q=%20%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_geocode_resolves_location() {
        let (url, log) = spawn_geocoder().await;
        let app = app_with_geocoder(StaticSource::new(Vec::new()), &url);

        let (status, body) = get_json(&app, "/api/geocode?q=%20Leeds%20").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["latitude"], 53.7974);
        assert_eq!(body["longitude"], -1.5438);
        assert_eq!(body["zoom"], 13);
        assert_eq!(
            body["displayName"],
            "Leeds, West Yorkshire, England, United Kingdom"
        );

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0]["q"], "Leeds, UK");
        assert_eq!(log[0]["countrycodes"], "gb");
        assert_eq!(log[0]["limit"], "1");
        assert_eq!(log[0]["format"], "json");
    }

    #[tokio::test]
    async fn test_geocode_no_match_is_not_found() {
        let (url, _log) = spawn_geocoder().await;
        let app = app_with_geocoder(StaticSource::new(Vec::new()), &url);

        let (status, body) = get_json(&app, "/api/geocode?q=Nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Location not found");
        assert_eq!(body["message"], r#"No match for "Nowhere""#);
    }

    #[tokio::test]
    async fn test_geocoder_failure_is_bad_gateway() {
        let (url, _log) = spawn_geocoder().await;
        let app = app_with_geocoder(StaticSource::new(Vec::new()), &url);

        let (status, body) = get_json(&app, "/api/geocode?q=Atlantis").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Search failed");
    }
}
