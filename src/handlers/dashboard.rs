//! Merchant dashboard figures. Every endpoint is a read-only aggregate.

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;

use crate::{
    entities::order::OrderStatus,
    services::dashboard::{MonthlyRevenue, Period},
    ApiResponse, ApiResult, AppState,
};

fn counted(count: u64, noun: &str) -> ApiResponse<u64> {
    ApiResponse::success(format!("{count} {noun} found"), count)
}

async fn status_count(state: &AppState, status: OrderStatus, noun: &str) -> ApiResult<u64> {
    let count = state.services.dashboard.orders_with_status(status).await?;
    Ok(Json(counted(count, noun)))
}

async fn period_sell(state: &AppState, period: Period, message: &str) -> ApiResult<Decimal> {
    let summary = state.services.dashboard.sales_for(period).await?;
    Ok(Json(ApiResponse::success(message, summary.sell)))
}

async fn period_revenue(state: &AppState, period: Period, message: &str) -> ApiResult<Decimal> {
    let summary = state.services.dashboard.sales_for(period).await?;
    Ok(Json(ApiResponse::success(message, summary.revenue)))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/user/total-category",
    summary = "Active categories",
    responses((status = 200, description = "N categories found", body = crate::openapi::ApiEnvelope)),
    security(("Bearer" = [])),
    tag = "Dashboard"
)]
pub async fn total_categories(State(state): State<AppState>) -> ApiResult<u64> {
    let count = state.services.dashboard.total_categories().await?;
    Ok(Json(counted(count, "categories")))
}

pub async fn total_campaigns(State(state): State<AppState>) -> ApiResult<u64> {
    let count = state.services.dashboard.total_campaigns().await?;
    Ok(Json(counted(count, "campaigns")))
}

pub async fn total_products(State(state): State<AppState>) -> ApiResult<u64> {
    let count = state.services.dashboard.total_products().await?;
    Ok(Json(counted(count, "products")))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/user/total-order",
    summary = "All orders ever placed",
    responses((status = 200, description = "N orders found", body = crate::openapi::ApiEnvelope)),
    security(("Bearer" = [])),
    tag = "Dashboard"
)]
pub async fn total_orders(State(state): State<AppState>) -> ApiResult<u64> {
    let count = state.services.dashboard.total_orders().await?;
    Ok(Json(counted(count, "orders")))
}

pub async fn total_pending_orders(State(state): State<AppState>) -> ApiResult<u64> {
    status_count(&state, OrderStatus::Pending, "pending orders").await
}

pub async fn total_canceled_orders(State(state): State<AppState>) -> ApiResult<u64> {
    status_count(&state, OrderStatus::Canceled, "canceled orders").await
}

pub async fn total_delivered_orders(State(state): State<AppState>) -> ApiResult<u64> {
    status_count(&state, OrderStatus::Delivered, "delivered orders").await
}

/// Shipped orders are reported as "in progress".
pub async fn total_in_progress_orders(State(state): State<AppState>) -> ApiResult<u64> {
    status_count(&state, OrderStatus::Shipped, "in progress orders").await
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/user/total-revenue",
    summary = "Revenue over all orders",
    responses((status = 200, description = "Total revenue is X", body = crate::openapi::ApiEnvelope)),
    security(("Bearer" = [])),
    tag = "Dashboard"
)]
pub async fn total_revenue(State(state): State<AppState>) -> ApiResult<Decimal> {
    let revenue = state.services.dashboard.total_revenue().await?;
    Ok(Json(ApiResponse::success(
        format!("Total revenue is {revenue}"),
        revenue,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/user/total-revenue-year-wise/{year}",
    summary = "Revenue per month of a year",
    params(("year" = i32, Path, description = "Calendar year")),
    responses((status = 200, description = "Revenue generated", body = crate::openapi::ApiEnvelope)),
    security(("Bearer" = [])),
    tag = "Dashboard"
)]
pub async fn revenue_by_month(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> ApiResult<Vec<MonthlyRevenue>> {
    let revenues = state.services.dashboard.revenue_by_month(year).await?;
    Ok(Json(ApiResponse::success("Revenue generated", revenues)))
}

pub async fn today_order_count(State(state): State<AppState>) -> ApiResult<u64> {
    let count = state.services.dashboard.today_order_count().await?;
    Ok(Json(ApiResponse::success(
        format!("Today total {count} orders"),
        count,
    )))
}

pub async fn today_sell(State(state): State<AppState>) -> ApiResult<Decimal> {
    let sell = state.services.dashboard.sales_for(Period::Today).await?.sell;
    Ok(Json(ApiResponse::success(
        format!("Today's delivered sell is {sell}"),
        sell,
    )))
}

pub async fn today_revenue(State(state): State<AppState>) -> ApiResult<Decimal> {
    let revenue = state.services.dashboard.sales_for(Period::Today).await?.revenue;
    Ok(Json(ApiResponse::success(
        format!("Today's delivered revenue is {revenue}"),
        revenue,
    )))
}

pub async fn last_week_sell(State(state): State<AppState>) -> ApiResult<Decimal> {
    period_sell(&state, Period::LastWeek, "Last Week Sell Amount").await
}

pub async fn last_week_revenue(State(state): State<AppState>) -> ApiResult<Decimal> {
    period_revenue(&state, Period::LastWeek, "Last Week Revenue").await
}

pub async fn last_month_sell(State(state): State<AppState>) -> ApiResult<Decimal> {
    period_sell(&state, Period::LastMonth, "Last Month Sell Amount").await
}

pub async fn last_month_revenue(State(state): State<AppState>) -> ApiResult<Decimal> {
    period_revenue(&state, Period::LastMonth, "Last Month Revenue").await
}

pub async fn last_year_sell(State(state): State<AppState>) -> ApiResult<Decimal> {
    period_sell(&state, Period::LastYear, "Last Year Sell Amount").await
}

pub async fn last_year_revenue(State(state): State<AppState>) -> ApiResult<Decimal> {
    period_revenue(&state, Period::LastYear, "Last Year Revenue").await
}

pub async fn current_year_sell(State(state): State<AppState>) -> ApiResult<Decimal> {
    period_sell(&state, Period::CurrentYear, "Current Year Sell Amount").await
}

pub async fn current_year_revenue(State(state): State<AppState>) -> ApiResult<Decimal> {
    period_revenue(&state, Period::CurrentYear, "Current Year Revenue").await
}

pub async fn current_month_sell(State(state): State<AppState>) -> ApiResult<Decimal> {
    period_sell(&state, Period::CurrentMonth, "Current Month Sell Amount").await
}

pub async fn current_month_revenue(State(state): State<AppState>) -> ApiResult<Decimal> {
    period_revenue(&state, Period::CurrentMonth, "Current Month Revenue").await
}
