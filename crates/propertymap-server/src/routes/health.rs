use std::sync::Arc;

use axum::{Extension, Json};
use chrono::SecondsFormat;
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub cached_properties: usize,
    pub last_fetched: Option<String>,
    pub cache_age: Option<String>,
    pub refreshing: bool,
    pub uptime_secs: u64,
}

/// Liveness and cache status. Never triggers a fetch.
pub async fn get_health(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    let cached = state.store.cached().await;

    Json(HealthResponse {
        status: "ok",
        cached_properties: cached.as_ref().map_or(0, |c| c.data.len()),
        last_fetched: cached
            .as_ref()
            .map(|c| c.cached_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        cache_age: cached.as_ref().map(|c| c.age_display()),
        refreshing: state.store.is_refreshing().await,
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
