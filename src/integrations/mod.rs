//! Outbound HTTP clients for third-party services.

pub mod cloudinary;
pub mod fraud_check;
pub mod paystation;
pub mod sslcommerz;

use thiserror::Error;

use crate::errors::ServiceError;

pub use cloudinary::{CloudinaryClient, MediaStore, UploadFile, UploadedMedia};
pub use fraud_check::FraudCheckClient;
pub use paystation::{PayStationClient, TransactionStatus};
pub use sslcommerz::{SessionReply, SessionRequest, SslCommerzClient};

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} responded with {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from {service}: {reason}")]
    InvalidResponse {
        service: &'static str,
        reason: String,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl From<IntegrationError> for ServiceError {
    fn from(err: IntegrationError) -> Self {
        ServiceError::ExternalServiceError(err.to_string())
    }
}

fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, IntegrationError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("storefront-api/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Records the outcome of a gateway call and passes the result through.
fn observe<T>(gateway: &str, result: Result<T, IntegrationError>) -> Result<T, IntegrationError> {
    crate::metrics::record_gateway_call(gateway, result.is_ok());
    if let Err(e) = &result {
        tracing::warn!(gateway, error = %e, "gateway call failed");
    }
    result
}
