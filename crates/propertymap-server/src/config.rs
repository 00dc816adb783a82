//! Server configuration.
//!
//! Read from environment variables (after loading `.env`, if present). Every
//! setting has a default except the CRM API key, which is optional.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use propertymap_core::api::client::{DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS};
use propertymap_core::api::geocode::DEFAULT_GEOCODER_URL;
use propertymap_core::CrmClientConfig;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

/// Value of `APP_ENV` that turns on production mode
const PRODUCTION: &str = "production";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub crm_base_url: String,
    pub crm_api_key: Option<String>,
    pub page_size: usize,
    pub request_timeout: Duration,
    /// Production mode only lowers log verbosity
    pub production: bool,
    pub geocoder_url: String,
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host: IpAddr = get("HOST")
            .as_deref()
            .unwrap_or(DEFAULT_HOST)
            .parse()
            .context("HOST must be an IP address")?;
        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;

        let page_size = parse_or(get("ESPOCRM_PAGE_SIZE"), "ESPOCRM_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            anyhow::bail!("ESPOCRM_PAGE_SIZE must be at least 1");
        }
        let timeout_secs =
            parse_or(get("ESPOCRM_TIMEOUT_SECS"), "ESPOCRM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            anyhow::bail!("ESPOCRM_TIMEOUT_SECS must be at least 1");
        }

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            crm_base_url: get("ESPOCRM_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            crm_api_key: get("ESPOCRM_API_KEY"),
            page_size,
            request_timeout: Duration::from_secs(timeout_secs),
            production: get("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case(PRODUCTION)),
            geocoder_url: get("GEOCODER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEOCODER_URL.to_string()),
            static_dir: get("STATIC_DIR").map(PathBuf::from),
        })
    }

    pub fn crm_client_config(&self) -> CrmClientConfig {
        CrmClientConfig {
            base_url: self.crm_base_url.clone(),
            api_key: self.crm_api_key.clone(),
            timeout: self.request_timeout,
        }
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, v)),
        None => Ok(default),
    }
}
