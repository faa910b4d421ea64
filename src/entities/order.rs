use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of an order. Any status may be set from any other.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum OrderStatus {
    #[default]
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "SHIPPED")]
    Shipped,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "CANCELED")]
    Canceled,
    #[sea_orm(string_value = "RETURNED")]
    Returned,
}

impl OrderStatus {
    /// Statuses whose items are back on the shelf.
    pub fn is_restocked(self) -> bool {
        matches!(self, OrderStatus::Canceled | OrderStatus::Returned)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub coupon_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub customer_billing_address: Option<String>,
    pub customer_email: Option<String>,
    pub customer_city: Option<String>,
    pub customer_postal_code: Option<String>,
    #[sea_orm(unique)]
    pub invoice_number: String,
    pub total_items: i32,
    /// Amount charged: items + delivery − coupon
    pub subtotal: Decimal,
    pub subtotal_cost: Decimal,
    pub payment_method: String,
    pub delivery_charge_inside: Option<Decimal>,
    pub delivery_charge_outside: Option<Decimal>,
    pub status: OrderStatus,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        let now = Utc::now();
        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
            if let ActiveValue::NotSet = active_model.status {
                active_model.status = Set(OrderStatus::Pending);
            }
            if let ActiveValue::NotSet = active_model.is_deleted {
                active_model.is_deleted = Set(false);
            }
        }
        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}
