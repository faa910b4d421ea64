use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::{listing, ListQuery};
use crate::{
    auth::AuthUser,
    entities::order,
    services::orders::{MonthlyCount, OrderInput, OrderView, TrackedOrder},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PhoneQuery {
    pub phone: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Place order",
    description = "Validates the cart, prices it and decrements stock in one transaction",
    request_body = OrderInput,
    responses(
        (status = 200, description = "Your order has been placed successfully", body = crate::openapi::ApiEnvelope,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Missing field or unknown product", body = crate::errors::ErrorResponse),
        (status = 409, description = "Invoice already exists", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<OrderInput>,
) -> ApiResult<OrderView> {
    let order = state.services.orders.create_order(input).await?;
    Ok(Json(ApiResponse::success(
        "Your order has been placed successfully",
        order,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Super-admins see every order, merchants their own",
    params(ListQuery),
    responses(
        (status = 200, description = "N orders found", body = crate::openapi::ApiEnvelope),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<OrderView>> {
    let orders = state
        .services
        .orders
        .list_orders(&user, query.pagination(&state.config)?)
        .await?;
    Ok(Json(listing(orders, "orders", "No order is available")))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/user/{id}",
    summary = "List orders of a user",
    params(("id" = Uuid, Path, description = "User ID"), ListQuery),
    responses((status = 200, description = "N orders found", body = crate::openapi::ApiEnvelope)),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn list_orders_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<OrderView>> {
    let orders = state
        .services
        .orders
        .list_orders_by_user(user_id, query.pagination(&state.config)?)
        .await?;
    Ok(Json(listing(orders, "orders", "No order is available")))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "1 order found", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "No order is available", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderView> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success("1 order found", order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/latest",
    summary = "Newest order",
    responses(
        (status = 200, description = "Latest order", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "No orders found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn get_latest_order(State(state): State<AppState>) -> ApiResult<OrderView> {
    let order = state.services.orders.get_latest_order().await?;
    Ok(Json(ApiResponse::success("Latest order found", order)))
}

#[utoipa::path(
    get,
    path = "/api/track",
    summary = "Track newest order by phone",
    params(PhoneQuery),
    responses(
        (status = 200, description = "Order fetched successfully", body = crate::openapi::ApiEnvelope),
        (status = 400, description = "Customer phone number required", body = crate::errors::ErrorResponse),
        (status = 404, description = "No order found with this phone number", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn track_order(
    State(state): State<AppState>,
    Query(query): Query<PhoneQuery>,
) -> ApiResult<TrackedOrder> {
    let tracked = state
        .services
        .orders
        .track_order(query.phone.as_deref())
        .await?;
    Ok(Json(ApiResponse::success("Order fetched successfully", tracked)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    summary = "Set order status",
    description = "CANCELED/RETURNED restock, DELIVERED mails the delivery document",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Order status updated successfully.", body = crate::openapi::ApiEnvelope),
        (status = 400, description = "Invalid order status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusUpdate>,
) -> ApiResult<order::Model> {
    let order = state
        .services
        .orders
        .update_order_status(id, body.status.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(
        "Order status updated successfully.",
        order,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    summary = "Delete order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order has been deleted", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "No order is available", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<order::Model> {
    let order = state.services.orders.delete_order(id).await?;
    Ok(Json(ApiResponse::success("Order has been deleted", order)))
}

#[utoipa::path(
    get,
    path = "/api/fraud-check-order",
    summary = "Courier fraud check",
    params(PhoneQuery),
    responses(
        (status = 200, description = "Fraud check completed successfully", body = crate::openapi::ApiEnvelope),
        (status = 400, description = "Phone number required", body = crate::errors::ErrorResponse),
        (status = 502, description = "Fraud checker unavailable", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn fraud_check(
    State(state): State<AppState>,
    Query(query): Query<PhoneQuery>,
) -> ApiResult<Value> {
    let report = state
        .services
        .orders
        .fraud_check(query.phone.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(
        "Fraud check completed successfully",
        report,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/month-wise/{year}",
    summary = "Orders per month",
    params(("year" = i32, Path, description = "Calendar year")),
    responses((status = 200, description = "Monthly order count", body = crate::openapi::ApiEnvelope)),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn monthly_order_count(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> ApiResult<Vec<MonthlyCount>> {
    let counts = state.services.orders.monthly_order_count(year).await?;
    Ok(Json(ApiResponse::success(
        format!("Monthly order count for {year}"),
        counts,
    )))
}
