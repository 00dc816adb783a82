//! propertymap - serves CRM property listings to the map client.

use std::io;

use anyhow::Result;
use propertymap_server::Config;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default log filter outside production
const DEV_LOG_FILTER: &str = "info,propertymap_core=debug,propertymap_server=debug";

/// Default log filter in production
const PROD_LOG_FILTER: &str = "warn";

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes buffered log lines when dropped.
fn init_tracing(production: bool) -> WorkerGuard {
    // RUST_LOG wins when set (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if production { PROD_LOG_FILTER } else { DEV_LOG_FILTER })
    });

    let (writer, guard) = tracing_appender::non_blocking(io::stdout());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    let _guard = init_tracing(config.production);

    info!(
        crm = %config.crm_base_url,
        page_size = config.page_size,
        api_key = config.crm_api_key.is_some(),
        production = config.production,
        "propertymap starting"
    );

    propertymap_server::serve(config).await?;

    info!("propertymap shutting down");
    Ok(())
}
