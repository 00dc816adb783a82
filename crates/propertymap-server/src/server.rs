use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{Extension, Router};
use propertymap_core::{CrmClient, GeocodeClient, PropertyStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::routes;

/// Shared state for every request handler.
///
/// Holds the process's single `PropertyStore`; it is built once in [`serve`]
/// and lives until shutdown.
pub struct AppState {
    pub store: PropertyStore,
    pub geocoder: GeocodeClient,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: PropertyStore, geocoder: GeocodeClient) -> Self {
        Self {
            store,
            geocoder,
            started_at: Instant::now(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let crm = CrmClient::new(config.crm_client_config())?;
        let store = PropertyStore::new(Arc::new(crm), config.page_size);
        let geocoder = GeocodeClient::new(config.geocoder_url.clone(), config.request_timeout)?;
        Ok(Self::new(store, geocoder))
    }
}

pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut app = routes::router();

    if let Some(dir) = static_dir {
        // Unknown paths fall through to the client app's index page
        let assets = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(assets);
    }

    app.layer(Extension(Arc::new(state)))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

pub async fn serve(config: Config) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = router(state, config.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
