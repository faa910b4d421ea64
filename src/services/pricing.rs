//! Discount and order-total arithmetic.
//!
//! Every price shown to a customer or stored on an order line is derived here.
//! Amounts are rounded to two decimal places, midpoint away from zero.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::errors::ServiceError;

const MONEY_SCALE: u32 = 2;

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Result of applying a percentage discount to a retail price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub retail_price: Decimal,
    pub discount_percent: Decimal,
    pub discount_price: Decimal,
    pub discounted_retail_price: Decimal,
}

pub fn apply_discount(
    retail_price: Decimal,
    discount_percent: Decimal,
) -> Result<PriceBreakdown, ServiceError> {
    if retail_price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Retail price cannot be negative".to_string(),
        ));
    }
    if discount_percent < Decimal::ZERO || discount_percent > dec!(100) {
        return Err(ServiceError::ValidationError(
            "Discount percent must be between 0 and 100".to_string(),
        ));
    }

    let discount_price = round_money(retail_price * discount_percent / dec!(100));
    let discounted_retail_price = round_money(retail_price - discount_price);

    Ok(PriceBreakdown {
        retail_price,
        discount_percent,
        discount_price,
        discounted_retail_price,
    })
}

/// A positive category discount overrides the attribute's own percent.
pub fn effective_discount_percent(
    category_discount: Option<Decimal>,
    attribute_percent: Option<Decimal>,
) -> Decimal {
    match category_discount {
        Some(discount) if discount > Decimal::ZERO => discount,
        _ => attribute_percent.unwrap_or(Decimal::ZERO),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTotals {
    pub total_price: Decimal,
    pub total_cost_price: Decimal,
}

pub fn line_totals(
    quantity: i32,
    discounted_retail_price: Decimal,
    cost_price: Decimal,
) -> LineTotals {
    let qty = Decimal::from(quantity);
    LineTotals {
        total_price: round_money(qty * discounted_retail_price),
        total_cost_price: round_money(qty * cost_price),
    }
}

/// Amount charged for an order. The inside-city delivery charge wins when both
/// are present.
pub fn order_total(
    items_subtotal: Decimal,
    delivery_inside: Option<Decimal>,
    delivery_outside: Option<Decimal>,
    coupon_discount: Decimal,
) -> Decimal {
    let delivery = delivery_inside.or(delivery_outside).unwrap_or(Decimal::ZERO);
    round_money(items_subtotal + delivery - coupon_discount)
}

/// Running sums over the lines of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderTotals {
    pub total_items: i32,
    pub subtotal: Decimal,
    pub subtotal_cost: Decimal,
}

/// Raised when quantities no longer fit the stored integer columns.
pub fn quantity_too_large() -> ServiceError {
    ServiceError::ValidationError("Item quantity is too large".to_string())
}

impl OrderTotals {
    pub fn push_line(&mut self, quantity: i32, line: &LineTotals) -> Result<(), ServiceError> {
        self.total_items = self
            .total_items
            .checked_add(quantity)
            .ok_or_else(quantity_too_large)?;
        self.subtotal += line.total_price;
        self.subtotal_cost += line.total_cost_price;
        Ok(())
    }
}
