//! Gateway-facing endpoints: SSLCommerz session start and return URLs,
//! PayStation verification and callback.

use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    entities::order,
    services::orders::{GatewayRedirect, OrderInput},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct InvoiceRef {
    pub invoice_number: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/orders-init",
    summary = "Start SSLCommerz checkout",
    request_body = OrderInput,
    responses(
        (status = 200, description = "Redirecting to SSL COMMERZ.", body = crate::openapi::ApiEnvelope),
        (status = 400, description = "Invalid payment method or no gateway URL", body = crate::errors::ErrorResponse),
    ),
    tag = "Payments"
)]
pub async fn init_ssl_payment(
    State(state): State<AppState>,
    Json(input): Json<OrderInput>,
) -> ApiResult<GatewayRedirect> {
    let redirect = state.services.orders.init_ssl_payment(input).await?;
    Ok(Json(ApiResponse::success(
        "Redirecting to SSL COMMERZ.",
        redirect,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders-success",
    summary = "SSLCommerz success return",
    responses((status = 303, description = "Redirect to the storefront checkout page")),
    tag = "Payments"
)]
pub async fn ssl_success(State(state): State<AppState>) -> Redirect {
    info!("SSLCommerz reported a successful payment");
    Redirect::to(&state.services.orders.checkout_redirect(true))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders-fail",
    summary = "SSLCommerz failure return",
    responses((status = 303, description = "Redirect to the storefront checkout page")),
    tag = "Payments"
)]
pub async fn ssl_fail(State(state): State<AppState>) -> Redirect {
    info!("SSLCommerz reported a failed payment");
    Redirect::to(&state.services.orders.checkout_redirect(false))
}

#[utoipa::path(
    post,
    path = "/api/v1/verifyPayment",
    summary = "Verify PayStation payment",
    request_body = InvoiceRef,
    responses(
        (status = 200, description = "Payment verified", body = crate::openapi::ApiEnvelope),
        (status = 400, description = "Payment is processing...", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(body): Json<InvoiceRef>,
) -> ApiResult<order::Model> {
    let settled = state
        .services
        .orders
        .verify_payment(body.invoice_number.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(
        format!(
            "Payment verified and order {} is confirmed.",
            settled.invoice_number
        ),
        settled.order,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/payment/track",
    summary = "PayStation return URL",
    description = "Also accepts POST with a JSON body carrying invoice_number",
    params(InvoiceRef),
    responses(
        (status = 200, description = "Order marked as DELIVERED", body = crate::openapi::ApiEnvelope),
        (status = 400, description = "Transaction not found or not completed", body = crate::errors::ErrorResponse),
    ),
    tag = "Payments"
)]
pub async fn payment_callback(
    State(state): State<AppState>,
    Query(query): Query<InvoiceRef>,
    body: Option<Json<InvoiceRef>>,
) -> ApiResult<order::Model> {
    let invoice = query
        .invoice_number
        .or_else(|| body.and_then(|Json(b)| b.invoice_number));
    let order = state
        .services
        .orders
        .payment_callback(invoice.as_deref())
        .await?;
    Ok(Json(ApiResponse::success("Order marked as DELIVERED", order)))
}
