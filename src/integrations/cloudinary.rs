//! Signed uploads and deletions against the Cloudinary image API.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use super::{http_client, observe, IntegrationError};
use crate::config::CloudinaryConfig;

const SERVICE: &str = "cloudinary";

/// A file received from a multipart request.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedMedia {
    pub secure_url: String,
    pub public_id: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file: UploadFile, folder: &str) -> Result<UploadedMedia, IntegrationError>;

    /// Removes the asset behind a delivery URL.
    async fn delete(&self, url: &str) -> Result<(), IntegrationError>;
}

/// `hex(sha256("k1=v1&k2=v2" + secret))` over parameters sorted by key.
pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Public id of a delivery URL: the path after `/upload/` without the version
/// segment and the file extension.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let path = parsed.path();
    let (_, after) = path.split_once("/upload/")?;

    let mut segments: Vec<&str> = after.split('/').filter(|s| !s.is_empty()).collect();
    if segments
        .first()
        .is_some_and(|s| s.len() > 1 && s.starts_with('v') && s[1..].chars().all(|c| c.is_ascii_digit()))
    {
        segments.remove(0);
    }
    let last = segments.pop()?;
    let stem = last.rsplit_once('.').map_or(last, |(stem, _)| stem);
    segments.push(stem);

    let id = segments.join("/");
    (!id.is_empty()).then_some(id)
}

#[derive(Debug, Deserialize)]
struct DestroyReply {
    result: String,
}

pub struct CloudinaryClient {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Result<Self, IntegrationError> {
        Ok(Self::with_client(config, http_client(Duration::from_secs(60))?))
    }

    pub fn with_client(config: CloudinaryConfig, client: reqwest::Client) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    fn ensure_configured(&self) -> Result<(), IntegrationError> {
        if self.config.cloud_name.is_empty()
            || self.config.api_key.is_empty()
            || self.config.api_secret.is_empty()
        {
            return Err(IntegrationError::NotConfigured("Cloudinary"));
        }
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, IntegrationError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| IntegrationError::InvalidResponse {
                service: SERVICE,
                reason: e.to_string(),
            })
    }

    async fn do_upload(&self, file: UploadFile, folder: &str) -> Result<UploadedMedia, IntegrationError> {
        self.ensure_configured()?;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("folder", folder.to_string()), ("timestamp", timestamp.clone())],
            &self.config.api_secret,
        );

        let mut part = Part::bytes(file.bytes.to_vec()).file_name(file.filename);
        if let Some(mime) = file.content_type {
            part = part.mime_str(&mime)?;
        }
        let form = Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.to_string())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn do_delete(&self, url: &str) -> Result<(), IntegrationError> {
        self.ensure_configured()?;
        let public_id = public_id_from_url(url).ok_or_else(|| IntegrationError::InvalidResponse {
            service: SERVICE,
            reason: format!("cannot derive public id from {url}"),
        })?;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id.clone()), ("timestamp", timestamp.clone())],
            &self.config.api_secret,
        );

        let params = [
            ("public_id", public_id.as_str()),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.config.api_key.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];
        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await?;
        let reply: DestroyReply = Self::read_json(response).await?;
        debug!(public_id = %public_id, result = %reply.result, "cloudinary destroy");

        match reply.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(IntegrationError::InvalidResponse {
                service: SERVICE,
                reason: format!("destroy returned {other}"),
            }),
        }
    }
}

#[async_trait]
impl MediaStore for CloudinaryClient {
    #[instrument(skip(self, file), fields(filename = %file.filename, size = file.bytes.len()))]
    async fn upload(&self, file: UploadFile, folder: &str) -> Result<UploadedMedia, IntegrationError> {
        observe(SERVICE, self.do_upload(file, folder).await)
    }

    #[instrument(skip(self))]
    async fn delete(&self, url: &str) -> Result<(), IntegrationError> {
        observe(SERVICE, self.do_delete(url).await)
    }
}
