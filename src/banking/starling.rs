//! Starling Bank API client
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::banking::BankingProvider;
use crate::config::{BankingConfig, SpendingPeriod};
use crate::error::{BankResource, InsightError};
use crate::models::{AccountBalance, DirectDebitSet, SpendingBreakdown};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

/// Banking provider backed by the Starling public API
pub struct StarlingClient {
    client: Client,
    base_url: String,
    access_token: String,
    account_uid: String,
    spending_period: SpendingPeriod,
}

impl StarlingClient {
    pub fn new(config: &BankingConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                InsightError::ConfigError(format!("Failed to build banking HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            account_uid: config.account_uid.clone(),
            spending_period: config.spending_period,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: BankResource,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        debug!(%resource, %url, "Calling banking API");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!(%resource, "Banking API request failed: {}", e);
                InsightError::fetch(resource, format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%resource, %status, "Banking API error response: {}", error_text);
            return Err(InsightError::fetch(
                resource,
                format!("HTTP {}: {}", status, error_text),
            ));
        }

        response.json::<T>().await.map_err(|e| {
            error!(%resource, "Failed to parse banking response: {}", e);
            InsightError::fetch(resource, format!("decode failed: {}", e))
        })
    }
}

#[async_trait]
impl BankingProvider for StarlingClient {
    async fn fetch_balance(&self) -> Result<AccountBalance> {
        let path = format!("/api/v2/accounts/{}/balance", self.account_uid);
        self.get_json(BankResource::Balance, &path, &[]).await
    }

    async fn fetch_spending(&self) -> Result<SpendingBreakdown> {
        let path = format!(
            "/api/v2/accounts/{}/spending-insights/spending-category",
            self.account_uid
        );
        let query = [
            ("year", self.spending_period.year.to_string()),
            ("month", self.spending_period.month_param()),
        ];
        self.get_json(BankResource::Spending, &path, &query).await
    }

    async fn fetch_direct_debits(&self) -> Result<DirectDebitSet> {
        let path = format!("/api/v2/direct-debit/mandates/account/{}", self.account_uid);
        self.get_json(BankResource::DirectDebits, &path, &[]).await
    }
}
