#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::Value;
use storefront_api::{
    auth::{AuthService, AuthUser, SUPER_ADMIN_ROLE},
    config::{AppConfig, FraudCheckConfig, PayStationConfig, SslCommerzConfig},
    db,
    entities::{
        campaign, category, coupon, newsletter, order, product, product_attribute, user,
        OrderStatus,
    },
    handlers::AppServices,
    integrations::{IntegrationError, MediaStore, UploadFile, UploadedMedia},
    notifications::{MailError, Mailer, OutgoingMail},
    AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::MockServer;

pub const JWT_SECRET: &str = "integration-test-secret-with-enough-entropy-42";
pub const ADMIN_MAIL: &str = "owner@shop.test";
pub const STOREFRONT_URL: &str = "https://shop.test";

/// Captures every mail instead of talking SMTP.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.subject).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

/// Media store that hands out predictable URLs and remembers deletions.
#[derive(Default)]
pub struct RecordingMedia {
    uploaded: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl RecordingMedia {
    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for RecordingMedia {
    async fn upload(&self, file: UploadFile, folder: &str) -> Result<UploadedMedia, IntegrationError> {
        let mut uploaded = self.uploaded.lock().unwrap();
        let public_id = format!("{folder}/{}-{}", uploaded.len() + 1, file.filename);
        let secure_url = format!("https://media.test/{public_id}");
        uploaded.push(secure_url.clone());
        Ok(UploadedMedia {
            secure_url,
            public_id,
        })
    }

    async fn delete(&self, url: &str) -> Result<(), IntegrationError> {
        self.deleted.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Application wired against a throwaway SQLite file and a mock gateway host.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub media: Arc<RecordingMedia>,
    /// Stands in for SSLCommerz, PayStation and the fraud checker
    pub gateway: MockServer,
    pub merchant: user::Model,
    token: String,
    _db_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("temp dir");
        let gateway = MockServer::start().await;

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_dir.path().join("storefront.db").display()),
            JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_000,
            "test".to_string(),
        );
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;
        cfg.cors_allow_any_origin = true;
        cfg.storefront_url = STOREFRONT_URL.to_string();
        cfg.store_name = "Test Shop".to_string();
        cfg.mail.admin_address = Some(ADMIN_MAIL.to_string());
        cfg.sslcommerz = SslCommerzConfig {
            store_id: "testbox".to_string(),
            store_password: "testbox@ssl".to_string(),
            base_url: Some(gateway.uri()),
            success_url: "http://127.0.0.1:18000/api/v1/orders-success".to_string(),
            fail_url: "http://127.0.0.1:18000/api/v1/orders-fail".to_string(),
            cancel_url: "http://127.0.0.1:18000/api/v1/orders-fail".to_string(),
            ipn_url: "http://127.0.0.1:18000/api/v1/orders-success".to_string(),
            ..Default::default()
        };
        cfg.paystation = PayStationConfig {
            merchant_id: "104-1653730183".to_string(),
            base_url: gateway.uri(),
            timeout_secs: 5,
        };
        cfg.fraud_check = FraudCheckConfig {
            api_key: "fraud-key".to_string(),
            base_url: format!("{}/fraud", gateway.uri()),
        };

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let pool = Arc::new(pool);

        let mailer = Arc::new(RecordingMailer::default());
        let media = Arc::new(RecordingMedia::default());
        let services = AppServices::new(pool.clone(), &cfg, mailer.clone(), media.clone())
            .expect("failed to wire services");

        let state = AppState::new(pool, cfg, services);
        let router = storefront_api::app(state.clone());

        let merchant = seed_user(&state, "Rahim Store", "admin").await;
        let token = issue_token(&state.auth, &merchant);

        Self {
            router,
            state,
            mailer,
            media,
            gateway,
            merchant,
            token,
            _db_dir: db_dir,
        }
    }

    pub fn db(&self) -> &db::DbPool {
        &self.state.db
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Token for a fresh super-admin account.
    pub async fn super_admin_token(&self) -> String {
        let admin = seed_user(&self.state, "Platform Admin", SUPER_ADMIN_ROLE).await;
        issue_token(&self.state.auth, &admin)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        read_json(self.send(request).await).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None, None).await
    }

    pub async fn get_authed(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None, Some(self.token())).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(body), None).await
    }

    pub async fn post_authed(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(body), Some(self.token())).await
    }

    pub async fn put_authed(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(body), Some(self.token())).await
    }

    pub async fn delete_authed(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, None, Some(self.token())).await
    }

    /// Sends a multipart form as the merchant.
    pub async fn multipart_authed(
        &self,
        method: Method,
        uri: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> (StatusCode, Value) {
        let boundary = "storefront-test-boundary";
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token()))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(multipart_body(boundary, fields, files)))
            .expect("valid request");
        read_json(self.send(request).await).await
    }

    pub async fn seed_category(&self, name: &str, discount: Decimal) -> category::Model {
        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            discount: Set(discount),
            is_active: Set(true),
            is_deleted: Set(false),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed category")
    }

    pub async fn seed_campaign(&self, name: &str, is_active: bool) -> campaign::Model {
        campaign::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            is_active: Set(is_active),
            is_deleted: Set(false),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed campaign")
    }

    /// Active product of the merchant; flags are trending, featured.
    pub async fn seed_product(&self, name: &str, trending: bool, featured: bool) -> product::Model {
        let slug = format!(
            "rahim-store-{}",
            name.to_lowercase().replace(' ', "-")
        );
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(self.merchant.id),
            name: Set(name.to_string()),
            slug: Set(slug),
            short_description: Set(format!("{name} short description")),
            drive_url: Set(Some(format!("https://drive.test/{}", name.len()))),
            view_count: Set(0),
            is_trending: Set(trending),
            is_featured: Set(featured),
            is_active: Set(true),
            is_deleted: Set(false),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed product")
    }

    pub async fn seed_attribute(
        &self,
        product_id: Uuid,
        size: &str,
        price: Decimal,
        cost: Decimal,
        stock: i32,
    ) -> product_attribute::Model {
        product_attribute::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            size: Set(size.to_string()),
            cost_price: Set(cost),
            retail_price: Set(price),
            discount_percent: Set(Decimal::ZERO),
            discount_price: Set(Decimal::ZERO),
            discounted_retail_price: Set(price),
            stock_amount: Set(stock),
            is_deleted: Set(false),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed attribute")
    }

    pub async fn seed_coupon(&self, code: &str, amount: Decimal, is_active: bool) -> coupon::Model {
        coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            discount_amount: Set(amount),
            is_active: Set(is_active),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed coupon")
    }

    pub async fn seed_subscriber(&self, email: &str, is_active: bool) -> newsletter::Model {
        newsletter::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            is_active: Set(is_active),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed subscriber")
    }

    /// Bare order row for dashboard figures.
    pub async fn seed_order(
        &self,
        invoice: &str,
        status: OrderStatus,
        subtotal: Decimal,
        subtotal_cost: Decimal,
        created_at: DateTime<Utc>,
    ) -> order::Model {
        order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(Some(self.merchant.id)),
            customer_name: Set("Karim".to_string()),
            customer_phone: Set("01711000000".to_string()),
            customer_address: Set("Dhanmondi, Dhaka".to_string()),
            invoice_number: Set(invoice.to_string()),
            total_items: Set(1),
            subtotal: Set(subtotal),
            subtotal_cost: Set(subtotal_cost),
            payment_method: Set("cash on delivery".to_string()),
            status: Set(status),
            is_deleted: Set(false),
            created_at: Set(created_at),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed order")
    }

    pub async fn stock_of(&self, attribute_id: Uuid) -> i32 {
        product_attribute::Entity::find_by_id(attribute_id)
            .one(self.db())
            .await
            .expect("load attribute")
            .expect("attribute exists")
            .stock_amount
    }

    pub async fn order_by_invoice(&self, invoice: &str) -> order::Model {
        use sea_orm::{ColumnTrait, QueryFilter};
        order::Entity::find()
            .filter(order::Column::InvoiceNumber.eq(invoice))
            .one(self.db())
            .await
            .expect("load order")
            .expect("order exists")
    }
}

async fn seed_user(state: &AppState, name: &str, role: &str) -> user::Model {
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(format!("{}@shop.test", Uuid::new_v4().simple())),
        role_name: Set(role.to_string()),
        parent_id: Set(None),
        is_active: Set(true),
        is_deleted: Set(false),
        ..Default::default()
    }
    .insert(&*state.db)
    .await
    .expect("seed user")
}

fn issue_token(auth: &AuthService, user: &user::Model) -> String {
    auth.issue_token(&AuthUser {
        id: user.id,
        name: Some(user.name.clone()),
        email: Some(user.email.clone()),
        role_name: user.role_name.clone(),
        parent_id: user.parent_id,
    })
    .expect("issue token")
}

pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn multipart_body(boundary: &str, fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, filename, content) in files {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

/// JSON number as f64; decimals serialize as floats.
pub fn num(value: &Value) -> f64 {
    value.as_f64().unwrap_or_else(|| panic!("expected number, got {value}"))
}
