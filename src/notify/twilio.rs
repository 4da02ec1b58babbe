//! Twilio programmable voice client

use crate::config::VoiceConfig;
use crate::error::InsightError;
use crate::notify::VoiceProvider;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

pub struct TwilioClient {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    to_number: String,
    from_number: String,
}

impl TwilioClient {
    pub fn new(config: &VoiceConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                InsightError::ConfigError(format!("Failed to build voice HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            to_number: config.to_number.clone(),
            from_number: config.from_number.clone(),
        })
    }
}

#[async_trait]
impl VoiceProvider for TwilioClient {
    async fn place_call(&self, twiml: &str) -> Result<()> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.base_url, self.account_sid
        );

        let form = [
            ("To", self.to_number.as_str()),
            ("From", self.from_number.as_str()),
            ("Twiml", twiml),
        ];

        debug!(to = %self.to_number, "Placing voice call");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!("Voice call request failed: {}", e);
                InsightError::DeliveryError(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Voice call error response: {}", error_text);
            return Err(InsightError::DeliveryError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }
}
