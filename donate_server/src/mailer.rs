//! Thank-you coupon e-mail delivery via the Resend HTTP API.
//!
//! Delivery is strictly best-effort. The coupon already exists in the database by the time the mailer runs,
//! so a failed send loses the notification, not the coupon.

use donate_engine::db_types::Coupon;
use log::*;
use serde_json::json;

use crate::config::MailerConfig;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Clone)]
pub struct Mailer {
    config: MailerConfig,
    client: reqwest::Client,
}

impl Mailer {
    pub fn new(config: MailerConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Send the thank-you coupon to the buyer. Failures are logged and swallowed.
    pub async fn send_thank_you_coupon(&self, to: &str, nickname: &str, coupon: &Coupon) {
        if !self.is_configured() {
            debug!("📧️ Mailer is not configured. Skipping thank-you mail for {to}");
            return;
        }
        let expires = coupon.expires_at.format("%Y-%m-%d");
        let html = format!(
            "<p>Спасибо за покупку, {nickname}!</p>\
             <p>Ваш промокод на скидку {percent}%: <b>{code}</b></p>\
             <p>Действует до {expires}.</p>",
            percent = coupon.discount_percent,
            code = coupon.code,
        );
        let body = json!({
            "from": self.config.from_email,
            "to": [to],
            "subject": "Спасибо за покупку! Ваш промокод внутри",
            "html": html,
        });
        let result = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(self.config.api_key.reveal())
            .json(&body)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                info!("📧️ Thank-you coupon {} mailed to {to}", coupon.code)
            },
            Ok(response) => {
                let status = response.status();
                let detail = response.text().await.unwrap_or_default();
                warn!("📧️ Thank-you mail to {to} was rejected ({status}): {detail}");
            },
            Err(e) => warn!("📧️ Thank-you mail to {to} could not be sent: {e}"),
        }
    }
}
