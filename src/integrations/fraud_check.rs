//! Courier fraud-history lookups by phone number.

use std::time::Duration;

use reqwest::multipart::Form;
use serde_json::Value;
use tracing::instrument;

use super::{http_client, observe, IntegrationError};
use crate::config::FraudCheckConfig;

const SERVICE: &str = "fraud_check";

pub struct FraudCheckClient {
    client: reqwest::Client,
    config: FraudCheckConfig,
}

impl FraudCheckClient {
    pub fn new(config: FraudCheckConfig) -> Result<Self, IntegrationError> {
        Ok(Self::with_client(config, http_client(Duration::from_secs(20))?))
    }

    pub fn with_client(config: FraudCheckConfig, client: reqwest::Client) -> Self {
        Self { client, config }
    }

    async fn do_check(&self, phone: &str) -> Result<Value, IntegrationError> {
        if self.config.api_key.is_empty() {
            return Err(IntegrationError::NotConfigured("Fraud checker"));
        }
        let url = format!("{}/", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .multipart(Form::new().text("phone", phone.to_string()))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IntegrationError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| IntegrationError::InvalidResponse {
                service: SERVICE,
                reason: e.to_string(),
            })
    }

    /// Returns the checker's report unchanged.
    #[instrument(skip(self))]
    pub async fn check(&self, phone: &str) -> Result<Value, IntegrationError> {
        observe(SERVICE, self.do_check(phone).await)
    }
}
