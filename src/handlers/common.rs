use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use axum::extract::multipart::{Multipart, MultipartError};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::integrations::UploadFile;
use crate::services::products::{AttributeDraft, ProductDraft};
use crate::services::{non_empty, Pagination};
use crate::ApiResponse;

/// `page`/`limit` query parameters of list endpoints
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl ListQuery {
    pub fn pagination(&self, config: &AppConfig) -> Result<Pagination, ServiceError> {
        Pagination::new(
            self.page.unwrap_or(config.default_page),
            self.limit.unwrap_or(config.default_limit),
        )
    }

    /// A page window only when the caller sent both `page` and `limit`.
    pub fn explicit(&self) -> Result<Option<Pagination>, ServiceError> {
        match (self.page, self.limit) {
            (Some(page), Some(limit)) => Pagination::new(page, limit).map(Some),
            _ => Ok(None),
        }
    }
}

/// "N <noun> found", or the empty message with `null` data.
pub fn listing<T>(items: Vec<T>, noun: &str, empty: &str) -> ApiResponse<Vec<T>> {
    if items.is_empty() {
        ApiResponse::empty(empty)
    } else {
        ApiResponse::success(format!("{} {noun} found", items.len()), items)
    }
}

fn bad_form(err: MultipartError) -> ServiceError {
    ServiceError::BadRequest(format!("Invalid form data: {err}"))
}

static ATTRIBUTE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^productAttributes\[(\d+)\]\[(\w+)\]$").expect("valid attribute key regex")
});

/// Text fields and uploaded files of a multipart request.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    pub files: Vec<UploadFile>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ServiceError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(bad_form)?;
                    if !bytes.is_empty() {
                        form.files.push(UploadFile {
                            filename,
                            content_type,
                            bytes,
                        });
                    }
                }
                None => {
                    let value = field.text().await.map_err(bad_form)?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    #[cfg(test)]
    fn from_fields(fields: &[(&str, &str)]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: Vec::new(),
        }
    }

    pub fn text(&self, key: &str) -> Option<String> {
        non_empty(self.fields.get(key).map(String::as_str)).map(str::to_string)
    }

    pub fn uuid(&self, key: &str) -> Result<Option<Uuid>, ServiceError> {
        self.text(key)
            .map(|raw| {
                Uuid::parse_str(&raw).map_err(|_| ServiceError::BadRequest(format!("Invalid {key}")))
            })
            .transpose()
    }

    /// Accepts `true`/`false` as sent by HTML forms.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.text(key)?.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    /// Variants sent either as a JSON array in `productAttributes` or as
    /// bracketed fields like `productAttributes[0][size]`.
    fn attributes(&self) -> Result<Vec<AttributeDraft>, ServiceError> {
        if let Some(raw) = self.text("productAttributes") {
            return serde_json::from_str(&raw)
                .map_err(|e| ServiceError::BadRequest(format!("Invalid productAttributes: {e}")));
        }

        let mut rows: BTreeMap<usize, HashMap<String, String>> = BTreeMap::new();
        for (key, value) in &self.fields {
            let Some(caps) = ATTRIBUTE_KEY.captures(key) else {
                continue;
            };
            let Ok(index) = caps[1].parse::<usize>() else {
                continue;
            };
            rows.entry(index)
                .or_default()
                .insert(caps[2].to_string(), value.trim().to_string());
        }

        rows.into_values().map(|row| attribute_from_row(&row)).collect()
    }

    pub fn product_draft(&self) -> Result<ProductDraft, ServiceError> {
        Ok(ProductDraft {
            name: self.text("name"),
            category_id: self.uuid("categoryId")?,
            brand_id: self.uuid("brandId")?,
            subcategory_id: self.uuid("subcategoryId")?,
            subsubcategory_id: self.uuid("subsubcategoryId")?,
            campaign_id: self.uuid("campaignId")?,
            supplier_id: self.uuid("supplierId")?,
            product_code: self.text("productCode"),
            barcode: self.text("barcode"),
            short_description: self.text("shortDescription"),
            long_description: self.text("longDescription"),
            sku: self.text("sku"),
            drive_url: self.text("driveUrl"),
            is_trending: self.flag("isTrending"),
            is_featured: self.flag("isFeatured"),
            is_active: self.flag("isActive"),
            product_attributes: self.attributes()?,
        })
    }
}

fn attribute_from_row(row: &HashMap<String, String>) -> Result<AttributeDraft, ServiceError> {
    let decimal = |key: &str| -> Result<Option<Decimal>, ServiceError> {
        row.get(key)
            .filter(|v| !v.is_empty())
            .map(|v| {
                Decimal::from_str(v).map_err(|_| ServiceError::BadRequest(format!("Invalid {key}")))
            })
            .transpose()
    };

    Ok(AttributeDraft {
        size: row.get("size").cloned().unwrap_or_default(),
        cost_price: decimal("costPrice")?,
        retail_price: decimal("retailPrice")?,
        discount_percent: decimal("discountPercent")?,
        stock_amount: row
            .get("stockAmount")
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<i32>()
                    .map_err(|_| ServiceError::BadRequest("Invalid stockAmount".to_string()))
            })
            .transpose()?,
    })
}
