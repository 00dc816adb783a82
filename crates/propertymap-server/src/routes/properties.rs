use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::routing::get;
use axum::{Extension, Json, Router};
use propertymap_core::{FilterFacets, PropertiesResponse, PropertyFilter};
use serde::Deserialize;

use crate::error::ApiError;
use crate::server::AppState;

/// Query string of the listing endpoints.
///
/// `refresh=true` forces a refresh. The remaining fields mirror
/// [`PropertyFilter`]; type lists are comma-separated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertiesQuery {
    pub refresh: Option<String>,
    pub bedrooms_min: Option<f64>,
    pub bedrooms_max: Option<f64>,
    pub bathrooms_min: Option<f64>,
    pub bathrooms_max: Option<f64>,
    pub reception_rooms_min: Option<f64>,
    pub reception_rooms_max: Option<f64>,
    pub parking_types: Option<String>,
    pub property_types: Option<String>,
}

fn split_list(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl PropertiesQuery {
    pub fn force_refresh(&self) -> bool {
        self.refresh.as_deref() == Some("true")
    }

    /// The requested filter, or `None` when it would keep everything.
    pub fn filter(&self) -> Option<PropertyFilter> {
        let defaults = PropertyFilter::default();
        let filter = PropertyFilter {
            bedrooms_min: self.bedrooms_min.unwrap_or(defaults.bedrooms_min),
            bedrooms_max: self.bedrooms_max.unwrap_or(defaults.bedrooms_max),
            bathrooms_min: self.bathrooms_min.unwrap_or(defaults.bathrooms_min),
            bathrooms_max: self.bathrooms_max.unwrap_or(defaults.bathrooms_max),
            reception_rooms_min: self.reception_rooms_min.unwrap_or(defaults.reception_rooms_min),
            reception_rooms_max: self.reception_rooms_max.unwrap_or(defaults.reception_rooms_max),
            parking_types: split_list(&self.parking_types),
            property_types: split_list(&self.property_types),
        };
        filter.has_active_filters().then_some(filter)
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/properties", get(list_properties))
        .route("/properties/facets", get(get_facets))
}

fn parse_query(
    query: Result<Query<PropertiesQuery>, QueryRejection>,
) -> Result<PropertiesQuery, ApiError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| ApiError::InvalidInput(e.body_text()))
}

#[tracing::instrument(level = "debug", skip_all)]
pub async fn list_properties(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<PropertiesQuery>, QueryRejection>,
) -> Result<Json<PropertiesResponse>, ApiError> {
    let query = parse_query(query)?;
    let response = state.store.fetch_properties(query.force_refresh()).await?;

    let response = match query.filter() {
        Some(filter) => response.retain(|p| filter.matches(p)),
        None => response,
    };
    Ok(Json(response))
}

#[tracing::instrument(level = "debug", skip_all)]
pub async fn get_facets(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<PropertiesQuery>, QueryRejection>,
) -> Result<Json<FilterFacets>, ApiError> {
    let query = parse_query(query)?;
    let response = state.store.fetch_properties(query.force_refresh()).await?;
    Ok(Json(FilterFacets::from_properties(
        &response.properties,
        response.last_fetched,
    )))
}
