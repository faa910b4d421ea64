//! PayStation transaction status lookups.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::instrument;

use super::{http_client, observe, IntegrationError};
use crate::config::PayStationConfig;

const SERVICE: &str = "paystation";

/// Gateway reply for a transaction-status lookup, kept verbatim so it can be
/// echoed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionStatus {
    raw: Value,
}

impl TransactionStatus {
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    pub fn status(&self) -> Option<&str> {
        self.raw.get("status").and_then(Value::as_str)
    }

    /// `status_code` arrives either as a string or a number.
    pub fn status_code(&self) -> Option<String> {
        match self.raw.get("status_code")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        self.raw
            .get("data")
            .filter(|d| !d.is_null() && d.as_object().map_or(true, |o| !o.is_empty()))
    }

    pub fn trx_status(&self) -> Option<&str> {
        self.data()?.get("trx_status").and_then(Value::as_str)
    }

    /// The payment cleared: the transaction reports success and the reply
    /// itself is successful.
    pub fn is_settled(&self) -> bool {
        let trx_ok = self
            .trx_status()
            .map(|s| s.eq_ignore_ascii_case("success") || s.eq_ignore_ascii_case("successful"))
            .unwrap_or(false);
        let reply_ok = self
            .status()
            .is_some_and(|s| s.eq_ignore_ascii_case("success"))
            || self.status_code().as_deref() == Some("200");
        trx_ok && reply_ok
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_value(self) -> Value {
        self.raw
    }
}

pub struct PayStationClient {
    client: reqwest::Client,
    config: PayStationConfig,
}

impl PayStationClient {
    pub fn new(config: PayStationConfig) -> Result<Self, IntegrationError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(Self::with_client(config, http_client(timeout)?))
    }

    pub fn with_client(config: PayStationConfig, client: reqwest::Client) -> Self {
        Self { client, config }
    }

    async fn do_lookup(&self, invoice_number: &str) -> Result<TransactionStatus, IntegrationError> {
        if self.config.merchant_id.is_empty() {
            return Err(IntegrationError::NotConfigured("PayStation"));
        }
        let url = format!(
            "{}/transaction-status",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .header("merchantId", &self.config.merchant_id)
            .json(&json!({ "invoice_number": invoice_number }))
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(IntegrationError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        // 4xx replies still carry a JSON body describing the transaction
        let raw = response
            .json::<Value>()
            .await
            .map_err(|e| IntegrationError::InvalidResponse {
                service: SERVICE,
                reason: e.to_string(),
            })?;
        Ok(TransactionStatus::from_value(raw))
    }

    #[instrument(skip(self))]
    pub async fn transaction_status(
        &self,
        invoice_number: &str,
    ) -> Result<TransactionStatus, IntegrationError> {
        observe(SERVICE, self.do_lookup(invoice_number).await)
    }
}
