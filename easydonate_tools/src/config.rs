use std::time::Duration;

use dpg_common::Secret;
use log::*;

const DEFAULT_API_BASE_URL: &str = "https://easydonate.ru/api/v3";
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);
// EasyDonate rate-limits the shop endpoints, so catalog payloads are cached for a few minutes.
const DEFAULT_CATALOG_CACHE_TTL: Duration = Duration::from_secs(3 * 60);

#[derive(Debug, Clone)]
pub struct EasyDonateConfig {
    pub base_url: String,
    pub shop_key: Secret<String>,
    pub call_timeout: Duration,
    pub catalog_cache_ttl: Duration,
}

impl Default for EasyDonateConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            shop_key: Secret::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            catalog_cache_ttl: DEFAULT_CATALOG_CACHE_TTL,
        }
    }
}

impl EasyDonateConfig {
    pub fn new(shop_key: Secret<String>) -> Self {
        Self { shop_key, ..Default::default() }
    }

    pub fn new_from_env_or_default() -> Self {
        let shop_key = Secret::new(std::env::var("EASYDONATE_SHOP_KEY").unwrap_or_else(|_| {
            warn!("EASYDONATE_SHOP_KEY not set. Checkout and webhook reconciliation will be unavailable.");
            String::default()
        }));
        let base_url =
            std::env::var("EASYDONATE_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let call_timeout = std::env::var("EASYDONATE_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CALL_TIMEOUT);
        Self { base_url, shop_key, call_timeout, catalog_cache_ttl: DEFAULT_CATALOG_CACHE_TTL }
    }

    pub fn is_configured(&self) -> bool {
        !self.shop_key.reveal().is_empty()
    }
}
