//! Read-only aggregates behind the merchant dashboard.
//!
//! Date windows are computed from an explicit "now" in the server's local
//! timezone and are half-open: `start <= created_at < end`.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Local, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use futures::{future, TryStreamExt};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Select};
use serde::Serialize;
use tracing::instrument;

use crate::{
    db::DbPool,
    entities::{campaign, category, order, product, OrderStatus},
    errors::ServiceError,
    services::db_error,
};

/// Half-open time range in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn first_of_year(date: NaiveDate) -> NaiveDate {
    date.with_ordinal(1).unwrap_or(date)
}

/// Local midnight today until now.
pub fn today<Tz: TimeZone>(now: &DateTime<Tz>) -> Window {
    Window {
        start: midnight(&now.timezone(), now.date_naive()),
        end: now.with_timezone(&Utc),
    }
}

/// Midnight seven days ago through the end of today.
pub fn last_week<Tz: TimeZone>(now: &DateTime<Tz>) -> Window {
    let tz = now.timezone();
    let date = now.date_naive();
    let start = date.checked_sub_days(Days::new(7)).unwrap_or(date);
    let end = date.checked_add_days(Days::new(1)).unwrap_or(date);
    Window {
        start: midnight(&tz, start),
        end: midnight(&tz, end),
    }
}

/// The previous calendar month.
pub fn last_month<Tz: TimeZone>(now: &DateTime<Tz>) -> Window {
    let tz = now.timezone();
    let this_month = first_of_month(now.date_naive());
    let previous = this_month
        .checked_sub_months(Months::new(1))
        .unwrap_or(this_month);
    Window {
        start: midnight(&tz, previous),
        end: midnight(&tz, this_month),
    }
}

/// The previous calendar year.
pub fn last_year<Tz: TimeZone>(now: &DateTime<Tz>) -> Window {
    let tz = now.timezone();
    let this_year = first_of_year(now.date_naive());
    let previous = this_year
        .checked_sub_months(Months::new(12))
        .unwrap_or(this_year);
    Window {
        start: midnight(&tz, previous),
        end: midnight(&tz, this_year),
    }
}

/// January 1st until now.
pub fn current_year<Tz: TimeZone>(now: &DateTime<Tz>) -> Window {
    Window {
        start: midnight(&now.timezone(), first_of_year(now.date_naive())),
        end: now.with_timezone(&Utc),
    }
}

/// The 1st of this month until now.
pub fn current_month<Tz: TimeZone>(now: &DateTime<Tz>) -> Window {
    Window {
        start: midnight(&now.timezone(), first_of_month(now.date_naive())),
        end: now.with_timezone(&Utc),
    }
}

/// The whole calendar year `year`, or `None` when it is out of range.
pub fn year_window<Tz: TimeZone>(tz: &Tz, year: i32) -> Option<Window> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let end = NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?;
    Some(Window {
        start: midnight(tz, start),
        end: midnight(tz, end),
    })
}

/// Sell and revenue over a window of delivered orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    /// Σ subtotal
    pub sell: Decimal,
    /// Σ subtotal − Σ subtotal_cost
    pub revenue: Decimal,
}

impl SalesSummary {
    /// Builds the summary from SQL `SUM`s, which are NULL over no rows.
    fn from_sums(sell: Option<Decimal>, cost: Option<Decimal>) -> Self {
        let sell = sell.unwrap_or(Decimal::ZERO);
        Self {
            sell,
            revenue: sell - cost.unwrap_or(Decimal::ZERO),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
    pub month: u32,
    pub revenue: Decimal,
}

/// Dashboard period a sell/revenue figure is reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    LastWeek,
    LastMonth,
    LastYear,
    CurrentYear,
    CurrentMonth,
}

impl Period {
    pub fn window<Tz: TimeZone>(self, now: &DateTime<Tz>) -> Window {
        match self {
            Period::Today => today(now),
            Period::LastWeek => last_week(now),
            Period::LastMonth => last_month(now),
            Period::LastYear => last_year(now),
            Period::CurrentYear => current_year(now),
            Period::CurrentMonth => current_month(now),
        }
    }
}

#[derive(Clone)]
pub struct DashboardService {
    db_pool: Arc<DbPool>,
}

impl DashboardService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn count_orders(&self, query: Select<order::Entity>) -> Result<u64, ServiceError> {
        query
            .count(&*self.db_pool)
            .await
            .map_err(db_error("Failed to count orders"))
    }

    #[instrument(skip(self))]
    pub async fn total_categories(&self) -> Result<u64, ServiceError> {
        category::Entity::find()
            .filter(category::Column::IsActive.eq(true))
            .filter(category::Column::IsDeleted.eq(false))
            .count(&*self.db_pool)
            .await
            .map_err(db_error("Failed to count categories"))
    }

    #[instrument(skip(self))]
    pub async fn total_campaigns(&self) -> Result<u64, ServiceError> {
        campaign::Entity::find()
            .filter(campaign::Column::IsActive.eq(true))
            .filter(campaign::Column::IsDeleted.eq(false))
            .count(&*self.db_pool)
            .await
            .map_err(db_error("Failed to count campaigns"))
    }

    #[instrument(skip(self))]
    pub async fn total_products(&self) -> Result<u64, ServiceError> {
        product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::IsDeleted.eq(false))
            .count(&*self.db_pool)
            .await
            .map_err(db_error("Failed to count products"))
    }

    /// Every order ever placed, deleted ones included.
    #[instrument(skip(self))]
    pub async fn total_orders(&self) -> Result<u64, ServiceError> {
        self.count_orders(order::Entity::find()).await
    }

    #[instrument(skip(self))]
    pub async fn orders_with_status(&self, status: OrderStatus) -> Result<u64, ServiceError> {
        self.count_orders(order::Entity::find().filter(order::Column::Status.eq(status)))
            .await
    }

    async fn summarize(&self, query: Select<order::Entity>) -> Result<SalesSummary, ServiceError> {
        let sums: Option<(Option<Decimal>, Option<Decimal>)> = query
            .select_only()
            .column_as(Expr::col(order::Column::Subtotal).sum(), "sell")
            .column_as(Expr::col(order::Column::SubtotalCost).sum(), "cost")
            .into_tuple()
            .one(&*self.db_pool)
            .await
            .map_err(db_error("Failed to sum order amounts"))?;
        let (sell, cost) = sums.unwrap_or_default();
        Ok(SalesSummary::from_sums(sell, cost))
    }

    /// Σ subtotal − Σ subtotal_cost over all orders.
    #[instrument(skip(self))]
    pub async fn total_revenue(&self) -> Result<Decimal, ServiceError> {
        Ok(self.summarize(order::Entity::find()).await?.revenue)
    }

    /// Revenue per calendar month of `year`, only for months that have orders.
    #[instrument(skip(self))]
    pub async fn revenue_by_month(&self, year: i32) -> Result<Vec<MonthlyRevenue>, ServiceError> {
        let window = year_window(&Local, year)
            .ok_or_else(|| ServiceError::BadRequest("Invalid year".to_string()))?;

        // Months follow the server timezone, so rows are bucketed while streaming.
        let rows = order::Entity::find()
            .select_only()
            .column(order::Column::CreatedAt)
            .column(order::Column::Subtotal)
            .column(order::Column::SubtotalCost)
            .filter(order::Column::CreatedAt.gte(window.start))
            .filter(order::Column::CreatedAt.lt(window.end))
            .into_tuple::<(DateTime<Utc>, Decimal, Decimal)>()
            .stream(&*self.db_pool)
            .await
            .map_err(db_error("Failed to sum revenue by month"))?;

        let months = rows
            .try_fold([None::<Decimal>; 12], |mut months, (created_at, subtotal, cost)| {
                let slot = &mut months[created_at.with_timezone(&Local).month0() as usize];
                *slot = Some(slot.unwrap_or(Decimal::ZERO) + subtotal - cost);
                future::ready(Ok(months))
            })
            .await
            .map_err(db_error("Failed to sum revenue by month"))?;

        Ok(months
            .into_iter()
            .zip(1u32..)
            .filter_map(|(revenue, month)| revenue.map(|revenue| MonthlyRevenue { month, revenue }))
            .collect())
    }

    /// Orders of any status placed since local midnight.
    #[instrument(skip(self))]
    pub async fn today_order_count(&self) -> Result<u64, ServiceError> {
        let window = today(&Local::now());
        self.count_orders(
            order::Entity::find()
                .filter(order::Column::CreatedAt.gte(window.start))
                .filter(order::Column::CreatedAt.lt(window.end)),
        )
        .await
    }

    /// Sell and revenue of delivered orders inside `window`.
    pub async fn delivered_sales(&self, window: Window) -> Result<SalesSummary, ServiceError> {
        self.summarize(
            order::Entity::find()
                .filter(order::Column::Status.eq(OrderStatus::Delivered))
                .filter(order::Column::CreatedAt.gte(window.start))
                .filter(order::Column::CreatedAt.lt(window.end)),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn sales_for(&self, period: Period) -> Result<SalesSummary, ServiceError> {
        self.delivered_sales(period.window(&Local::now())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn today_starts_at_midnight() {
        let now = at(2024, 5, 17, 15);
        assert_eq!(today(&now), Window { start: at(2024, 5, 17, 0), end: now });
    }

    #[test]
    fn last_week_covers_seven_days_back_through_today() {
        let w = last_week(&at(2024, 3, 3, 10));
        assert_eq!(w.start, at(2024, 2, 25, 0));
        assert_eq!(w.end, at(2024, 3, 4, 0));
    }

    #[test]
    fn last_month_wraps_the_year() {
        let w = last_month(&at(2024, 1, 15, 9));
        assert_eq!(w.start, at(2023, 12, 1, 0));
        assert_eq!(w.end, at(2024, 1, 1, 0));

        let w = last_month(&at(2024, 3, 31, 9));
        assert_eq!(w.start, at(2024, 2, 1, 0));
        assert_eq!(w.end, at(2024, 3, 1, 0));
    }

    #[test]
    fn last_and_current_year() {
        let now = at(2024, 7, 4, 12);
        assert_eq!(
            last_year(&now),
            Window { start: at(2023, 1, 1, 0), end: at(2024, 1, 1, 0) }
        );
        assert_eq!(current_year(&now), Window { start: at(2024, 1, 1, 0), end: now });
        assert_eq!(current_month(&now), Window { start: at(2024, 7, 1, 0), end: now });
    }

    #[test]
    fn year_window_is_whole_year() {
        let w = year_window(&Utc, 2023).unwrap();
        assert_eq!(w.start, at(2023, 1, 1, 0));
        assert_eq!(w.end, at(2024, 1, 1, 0));
        assert!(year_window(&Utc, i32::MAX).is_none());
    }

    #[test]
    fn period_dispatches_to_its_window() {
        let now = at(2024, 7, 4, 12);
        assert_eq!(Period::LastMonth.window(&now), last_month(&now));
        assert_eq!(Period::Today.window(&now), today(&now));
    }

    #[test]
    fn summary_subtracts_cost() {
        let summary = SalesSummary::from_sums(Some(dec!(750.50)), Some(dec!(400)));
        assert_eq!(summary.sell, dec!(750.50));
        assert_eq!(summary.revenue, dec!(350.50));
        assert_eq!(SalesSummary::from_sums(None, None), SalesSummary::default());
    }
}
