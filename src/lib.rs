//! Storefront API Library
//!
//! Product catalogue, order lifecycle with payment gateway callbacks, contact
//! inbox and merchant dashboard figures behind one axum router.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod integrations;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod notifications;
pub mod openapi;
pub mod reports;
pub mod services;
pub mod tracing;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, Method},
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
};

use crate::auth::{AuthRouterExt, AuthService};
use crate::config::AppConfig;
use crate::db::DbPool;

/// Multipart product forms carry up to three images
const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: AppConfig, services: handlers::AppServices) -> Self {
        let auth = Arc::new(AuthService::new(config.jwt_secret.clone()));
        Self {
            db,
            config: Arc::new(config),
            auth,
            services,
        }
    }
}

/// Response envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }

    /// Successful response whose `data` is `null`.
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every route served under `/api`.
pub fn api_routes() -> Router<AppState> {
    use handlers::{contacts, dashboard, orders, payments, products};

    let storefront = Router::new()
        .route("/v1/orders", post(orders::create_order))
        .route("/v1/orders-init", post(payments::init_ssl_payment))
        .route("/v1/orders-success", post(payments::ssl_success))
        .route("/v1/orders-fail", post(payments::ssl_fail))
        .route("/v1/verifyPayment", post(payments::verify_payment))
        .route(
            "/v1/payment/track",
            get(payments::payment_callback).post(payments::payment_callback),
        )
        .route("/track", get(orders::track_order))
        .route(
            "/v1/products/:id/view",
            put(products::increase_product_view_count),
        )
        .route(
            "/v1/customer/products",
            get(products::list_products_for_customer),
        )
        .route(
            "/v1/customer/products/trending",
            get(products::list_trending),
        )
        .route(
            "/v1/customer/products/featured",
            get(products::list_featured),
        )
        .route(
            "/v1/customer/products/:slug",
            get(products::get_product_for_customer),
        )
        .route("/v1/contacts", post(contacts::create_contact));

    let order_admin = Router::new()
        .route("/v1/orders", get(orders::list_orders))
        .route("/v1/orders/latest", get(orders::get_latest_order))
        .route("/v1/orders/user/:id", get(orders::list_orders_by_user))
        .route(
            "/v1/orders/month-wise/:year",
            get(orders::monthly_order_count),
        )
        .route(
            "/v1/orders/:id",
            get(orders::get_order)
                .put(orders::update_order_status)
                .delete(orders::delete_order),
        )
        .route("/fraud-check-order", get(orders::fraud_check))
        .with_auth();

    // `:id` is the product slug for GET
    let catalogue = Router::new()
        .route(
            "/v1/products",
            post(products::create_product).get(products::list_products),
        )
        .route(
            "/v1/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/v1/products/:id/ban", put(products::ban_product))
        .route("/v1/products/:id/email", post(products::send_product_email))
        .route(
            "/v1/products/:id/attributes",
            get(products::list_product_attributes),
        )
        .route("/v1/products/:id/images", get(products::list_product_images))
        .route(
            "/v1/product-attributes",
            post(products::create_product_attribute),
        )
        .route(
            "/v1/product-attributes/:id",
            put(products::update_product_attribute).delete(products::delete_product_attribute),
        )
        .route("/v1/product-images", post(products::create_product_image))
        .route(
            "/v1/product-images/:id",
            put(products::update_product_image).delete(products::delete_product_image),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .with_auth();

    let inbox = Router::new()
        .route("/v1/contacts", get(contacts::list_contacts))
        .route(
            "/v1/contacts/:id",
            get(contacts::get_contact)
                .put(contacts::update_contact)
                .delete(contacts::delete_contact),
        )
        .with_auth();

    let dashboard = Router::new()
        .route("/total-category", get(dashboard::total_categories))
        .route("/total-campaign", get(dashboard::total_campaigns))
        .route("/total-product", get(dashboard::total_products))
        .route("/total-order", get(dashboard::total_orders))
        .route("/total-pending-order", get(dashboard::total_pending_orders))
        .route("/total-canceled-order", get(dashboard::total_canceled_orders))
        .route(
            "/total-in-progress-order",
            get(dashboard::total_in_progress_orders),
        )
        .route(
            "/total-delivered-order",
            get(dashboard::total_delivered_orders),
        )
        .route("/total-revenue", get(dashboard::total_revenue))
        .route(
            "/total-revenue-year-wise/:year",
            get(dashboard::revenue_by_month),
        )
        .route("/today-total-order", get(dashboard::today_order_count))
        .route("/today-sell-amount", get(dashboard::today_sell))
        .route("/today-revenue", get(dashboard::today_revenue))
        .route("/last-week", get(dashboard::last_week_revenue))
        .route("/last-week-sale", get(dashboard::last_week_sell))
        .route("/last-month-sale", get(dashboard::last_month_sell))
        .route("/last-year-sale", get(dashboard::last_year_sell))
        .route("/last-month-revenue", get(dashboard::last_month_revenue))
        .route("/last-year-revenue", get(dashboard::last_year_revenue))
        .route("/current-year-sell", get(dashboard::current_year_sell))
        .route("/current-year-revenue", get(dashboard::current_year_revenue))
        .route("/current-month-sale", get(dashboard::current_month_sell))
        .route(
            "/current-month-revenue",
            get(dashboard::current_month_revenue),
        )
        .with_auth();

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(storefront)
        .merge(order_admin)
        .merge(catalogue)
        .merge(inbox)
        .nest("/v1/dashboard/user", dashboard)
}

/// CORS from configuration: explicit origins with credentials, otherwise permissive.
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(auth::LEGACY_TOKEN_HEADER),
            HeaderName::from_static("merchantid"),
        ])
        .allow_credentials(true)
}

/// The complete application with its middleware stack.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let timeout = state.config.request_timeout();
    let auth = state.auth.clone();

    Router::new()
        .route("/", get(root))
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .layer(axum::middleware::from_fn(metrics::track_http_metrics))
        .layer(crate::tracing::configure_http_tracing())
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(cors)
        // Auth middleware looks the service up in request extensions
        .layer(Extension(auth))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "msg": "Storefront API is working" }))
}

async fn api_status() -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "service": "storefront-api",
        "version": env!("CARGO_PKG_VERSION"),
        "git": option_env!("GIT_HASH").unwrap_or("unknown"),
        "build_time": option_env!("BUILD_TIME").unwrap_or("unknown"),
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success("Service is running", status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    db::check_connection(&state.db).await?;
    Ok(Json(ApiResponse::success(
        "Service is healthy",
        json!({ "status": "healthy", "database": "healthy" }),
    )))
}
