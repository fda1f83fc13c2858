use std::env;

use chrono::Duration;
use dpg_common::Secret;
use easydonate_tools::EasyDonateConfig;
use log::*;

const DEFAULT_DPG_HOST: &str = "127.0.0.1";
const DEFAULT_DPG_PORT: u16 = 8380;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// EasyDonate API access: base URL, shop key, call timeout and catalog cache TTL.
    pub easydonate: EasyDonateConfig,
    /// The EasyDonate server id to charge against when a product does not carry its own.
    pub default_server_id: Option<i64>,
    /// Redirect URL passed to the payment page, if set.
    pub success_url: Option<String>,
    /// Pending orders older than this window are auto-cancelled. Zero disables the sweep.
    pub order_expiry: Duration,
    /// How unsigned or badly signed webhook deliveries are treated.
    pub signature_mode: SignatureMode,
    /// Bearer key for the admin endpoints. `None` disables them (503).
    pub admin_api_key: Option<Secret<String>>,
    /// Thank-you coupon e-mail settings.
    pub mailer: MailerConfig,
}

/// How a webhook delivery with an absent or mismatched signature is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignatureMode {
    /// Reject with a 400. The default.
    #[default]
    Strict,
    /// Accept when the stored order corroborates the reported nickname and amount.
    Lenient,
}

#[derive(Clone, Debug, Default)]
pub struct MailerConfig {
    pub api_key: Secret<String>,
    pub from_email: String,
}

impl MailerConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.reveal().is_empty() && !self.from_email.is_empty()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DPG_HOST.to_string(),
            port: DEFAULT_DPG_PORT,
            database_url: String::default(),
            easydonate: EasyDonateConfig::default(),
            default_server_id: None,
            success_url: None,
            order_expiry: Duration::zero(),
            signature_mode: SignatureMode::default(),
            admin_api_key: None,
            mailer: MailerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("DPG_HOST").ok().unwrap_or_else(|| DEFAULT_DPG_HOST.into());
        let port = env::var("DPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for DPG_PORT. {e} Using the default, {DEFAULT_DPG_PORT}, instead."
                    );
                    DEFAULT_DPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_DPG_PORT);
        let database_url = env::var("DPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ DPG_DATABASE_URL is not set. Please set it to the URL for the storefront database.");
            String::default()
        });
        let easydonate = EasyDonateConfig::new_from_env_or_default();
        if !easydonate.is_configured() {
            warn!(
                "🪛️ EASYDONATE_SHOP_KEY is not set. Checkout and webhook endpoints will refuse requests until it is \
                 configured."
            );
        }
        let default_server_id = env::var("EASYDONATE_DEFAULT_SERVER_ID").ok().and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for EASYDONATE_DEFAULT_SERVER_ID. {e}"))
                .ok()
        });
        let success_url = env::var("EASYDONATE_SUCCESS_URL").ok().filter(|s| !s.is_empty());
        let order_expiry = configure_order_expiry();
        let signature_mode = match env::var("DPG_WEBHOOK_SIGNATURE_MODE").map(|s| s.to_lowercase()) {
            Ok(s) if s == "lenient" => SignatureMode::Lenient,
            Ok(s) if s == "strict" => SignatureMode::Strict,
            Ok(s) => {
                warn!("🪛️ '{s}' is not a valid DPG_WEBHOOK_SIGNATURE_MODE. Using 'strict'.");
                SignatureMode::Strict
            },
            Err(_) => SignatureMode::Strict,
        };
        let admin_api_key = env::var("DPG_ADMIN_API_KEY").ok().filter(|s| !s.is_empty()).map(Secret::new);
        if admin_api_key.is_none() {
            warn!("🪛️ DPG_ADMIN_API_KEY is not set. The /api admin endpoints are disabled.");
        }
        let mailer = MailerConfig {
            api_key: Secret::new(env::var("RESEND_API_KEY").ok().unwrap_or_default()),
            from_email: env::var("RESEND_FROM_EMAIL").ok().unwrap_or_default(),
        };
        if !mailer.is_configured() {
            info!("🪛️ RESEND_API_KEY / RESEND_FROM_EMAIL are not set. Thank-you coupon e-mails are disabled.");
        }
        Self {
            host,
            port,
            database_url,
            easydonate,
            default_server_id,
            success_url,
            order_expiry,
            signature_mode,
            admin_api_key,
            mailer,
        }
    }
}

fn configure_order_expiry() -> Duration {
    env::var("ORDER_EXPIRATION_MINUTES")
        .map_err(|_| info!("🪛️ ORDER_EXPIRATION_MINUTES is not set. Pending orders never expire."))
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::minutes)
                .map_err(|e| warn!("🪛️ Invalid configuration value for ORDER_EXPIRATION_MINUTES. {e}"))
        })
        .ok()
        .filter(|d| {
            if *d > Duration::zero() {
                true
            } else {
                info!("🪛️ ORDER_EXPIRATION_MINUTES is not positive. Pending orders never expire.");
                false
            }
        })
        .unwrap_or_else(Duration::zero)
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The subset of the server configuration that route handlers need. Generally we try to keep this as small as
/// possible, and exclude secrets that the handlers do not use themselves.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub default_server_id: Option<i64>,
    pub success_url: Option<String>,
    pub order_expiry: Duration,
    pub signature_mode: SignatureMode,
    /// The webhook HMAC key. Shared with the EasyDonate client configuration.
    pub shop_key: Secret<String>,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            default_server_id: config.default_server_id,
            success_url: config.success_url.clone(),
            order_expiry: config.order_expiry,
            signature_mode: config.signature_mode,
            shop_key: config.easydonate.shop_key.clone(),
        }
    }
}
