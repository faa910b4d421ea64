//! SSLCommerz hosted checkout sessions.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::{http_client, observe, IntegrationError};
use crate::config::SslCommerzConfig;

const SERVICE: &str = "sslcommerz";
const DEFAULT_POSTCODE: &str = "1000";
const COUNTRY: &str = "Bangladesh";

/// Customer and basket details for a checkout session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub total_amount: Decimal,
    pub tran_id: String,
    pub product_name: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: String,
    pub billing_address: Option<String>,
    pub shipping_address: String,
    pub city: Option<String>,
    pub postcode: Option<String>,
}

/// Raw gateway reply. `GatewayPageURL` is present only for accepted sessions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "GatewayPageURL", default)]
    pub gateway_page_url: Option<String>,
    #[serde(default)]
    pub failedreason: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl SessionReply {
    pub fn gateway_url(&self) -> Option<&str> {
        self.gateway_page_url.as_deref().filter(|u| !u.is_empty())
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub struct SslCommerzClient {
    client: reqwest::Client,
    config: SslCommerzConfig,
}

impl SslCommerzClient {
    pub fn new(config: SslCommerzConfig) -> Result<Self, IntegrationError> {
        Ok(Self::with_client(config, http_client(Duration::from_secs(30))?))
    }

    pub fn with_client(config: SslCommerzConfig, client: reqwest::Client) -> Self {
        Self { client, config }
    }

    fn form(&self, request: &SessionRequest) -> Vec<(&'static str, String)> {
        let city = request.city.clone().unwrap_or_default();
        let billing = request
            .billing_address
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| request.shipping_address.clone());

        vec![
            ("store_id", self.config.store_id.clone()),
            ("store_passwd", self.config.store_password.clone()),
            ("total_amount", request.total_amount.to_string()),
            ("currency", "BDT".to_string()),
            ("tran_id", request.tran_id.clone()),
            ("success_url", self.config.success_url.clone()),
            ("fail_url", self.config.fail_url.clone()),
            ("cancel_url", self.config.cancel_url.clone()),
            ("ipn_url", self.config.ipn_url.clone()),
            ("shipping_method", "Courier".to_string()),
            ("product_name", request.product_name.clone()),
            ("product_category", "Product".to_string()),
            ("product_profile", "general".to_string()),
            ("cus_name", request.customer_name.clone()),
            ("cus_email", request.customer_email.clone().unwrap_or_default()),
            ("cus_add1", billing),
            ("cus_add2", String::new()),
            ("cus_city", city.clone()),
            ("cus_state", city.clone()),
            (
                "cus_postcode",
                request
                    .postcode
                    .clone()
                    .unwrap_or_else(|| DEFAULT_POSTCODE.to_string()),
            ),
            ("cus_country", COUNTRY.to_string()),
            ("cus_phone", request.customer_phone.clone()),
            ("cus_fax", String::new()),
            ("ship_name", request.customer_name.clone()),
            ("ship_add1", request.shipping_address.clone()),
            ("ship_add2", String::new()),
            ("ship_city", city.clone()),
            ("ship_state", city),
            ("ship_postcode", DEFAULT_POSTCODE.to_string()),
            ("ship_country", COUNTRY.to_string()),
        ]
    }

    async fn do_init(&self, request: &SessionRequest) -> Result<SessionReply, IntegrationError> {
        if self.config.store_id.is_empty() {
            return Err(IntegrationError::NotConfigured("SSLCommerz"));
        }
        let url = format!("{}/gwprocess/v4/api.php", self.config.gateway_base_url());
        let response = self
            .client
            .post(url)
            .form(&self.form(request))
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
            .json::<SessionReply>()
            .await
            .map_err(|e| IntegrationError::InvalidResponse {
                service: SERVICE,
                reason: e.to_string(),
            })
    }

    /// Opens a checkout session; the reply is returned even when the gateway declines.
    #[instrument(skip(self, request), fields(tran_id = %request.tran_id, amount = %request.total_amount))]
    pub async fn init_session(&self, request: &SessionRequest) -> Result<SessionReply, IntegrationError> {
        observe(SERVICE, self.do_init(request).await)
    }
}
