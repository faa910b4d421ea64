use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{coupon, order, order_item, product, product_attribute, product_image, OrderStatus},
    errors::ServiceError,
    integrations::{FraudCheckClient, PayStationClient, SessionRequest, SslCommerzClient},
    notifications::OrderNotifier,
    reports::{render_delivery_pdf, DeliveryLine},
    services::{dashboard, db_error, non_empty, pricing, require_fields, Pagination},
};

const DIGITAL_PAYMENT: &str = "digital payment";
const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// One requested line of a checkout.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub product_attribute_id: Uuid,
    pub quantity: i32,
}

/// Checkout payload shared by direct orders and gateway sessions.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderInput {
    pub user_id: Option<Uuid>,
    pub coupon_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub customer_billing_address: Option<String>,
    pub customer_email: Option<String>,
    pub customer_city: Option<String>,
    pub customer_postal_code: Option<String>,
    pub invoice_number: Option<String>,
    pub payment_method: Option<String>,
    pub delivery_charge_inside: Option<Decimal>,
    pub delivery_charge_outside: Option<Decimal>,
    #[serde(default)]
    pub order_items: Vec<OrderLineInput>,
}

impl OrderInput {
    fn validate(&self) -> Result<(), ServiceError> {
        require_fields(&[
            (self.customer_name.as_deref(), "Name"),
            (self.customer_phone.as_deref(), "Phone"),
            (self.customer_address.as_deref(), "Shipping Address"),
            (self.invoice_number.as_deref(), "Invoice"),
            (self.payment_method.as_deref(), "Payment Method"),
        ])?;
        if self.order_items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Please select at least 1 item".to_string(),
            ));
        }
        if self.order_items.iter().any(|line| line.quantity < 1) {
            return Err(ServiceError::ValidationError(
                "Item quantity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn invoice(&self) -> String {
        non_empty(self.invoice_number.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

struct PricedLine {
    request: OrderLineInput,
    product: product::Model,
    attribute: product_attribute::Model,
    totals: pricing::LineTotals,
}

/// Priced checkout, not yet persisted.
struct Quote {
    lines: Vec<PricedLine>,
    totals: pricing::OrderTotals,
    coupon: Option<coupon::Model>,
    amount: Decimal,
}

async fn price_order<C: ConnectionTrait>(db: &C, input: &OrderInput) -> Result<Quote, ServiceError> {
    let mut lines = Vec::with_capacity(input.order_items.len());
    let mut totals = pricing::OrderTotals::default();

    for request in &input.order_items {
        let product = product::Entity::find_by_id(request.product_id)
            .filter(product::Column::IsDeleted.eq(false))
            .filter(product::Column::IsActive.eq(true))
            .one(db)
            .await
            .map_err(db_error("Failed to load ordered product"))?;
        let attribute = product_attribute::Entity::find_by_id(request.product_attribute_id)
            .filter(product_attribute::Column::IsDeleted.eq(false))
            .one(db)
            .await
            .map_err(db_error("Failed to load ordered attribute"))?;

        let (Some(product), Some(attribute)) = (product, attribute) else {
            return Err(ServiceError::BadRequest(
                "Product or attribute does not exist".to_string(),
            ));
        };

        let line = pricing::line_totals(
            request.quantity,
            attribute.discounted_retail_price,
            attribute.cost_price,
        );
        totals.push_line(request.quantity, &line)?;
        lines.push(PricedLine {
            request: request.clone(),
            product,
            attribute,
            totals: line,
        });
    }

    let coupon = match input.coupon_id {
        Some(coupon_id) => coupon::Entity::find_by_id(coupon_id)
            .filter(coupon::Column::IsActive.eq(true))
            .one(db)
            .await
            .map_err(db_error("Failed to load coupon"))?,
        None => None,
    };

    let amount = pricing::order_total(
        totals.subtotal,
        input.delivery_charge_inside,
        input.delivery_charge_outside,
        coupon.as_ref().map_or(Decimal::ZERO, |c| c.discount_amount),
    );

    Ok(Quote {
        lines,
        totals,
        coupon,
        amount,
    })
}

/// An order line with the first image of its product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: order_item::Model,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: order::Model,
    pub order_items: Vec<OrderItemView>,
}

/// What a customer sees when tracking by phone number.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedOrder {
    pub invoice: String,
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub customer_phone: String,
    pub order_items: Vec<order_item::Model>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub month: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayRedirect {
    pub gateway: String,
}

/// Outcome of a settled PayStation lookup.
#[derive(Debug, Clone)]
pub struct SettledPayment {
    pub invoice_number: String,
    pub order: order::Model,
}

async fn load_views<C: ConnectionTrait>(
    db: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderView>, ServiceError> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_item::Column::CreatedAt)
        .all(db)
        .await
        .map_err(db_error("Failed to load order items"))?;

    let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let mut first_images: HashMap<Uuid, String> = HashMap::new();
    if !product_ids.is_empty() {
        for image in product_image::Entity::find()
            .filter(product_image::Column::ProductId.is_in(product_ids))
            .order_by_asc(product_image::Column::CreatedAt)
            .all(db)
            .await
            .map_err(db_error("Failed to load product images"))?
        {
            first_images.entry(image.product_id).or_insert(image.image);
        }
    }

    let mut by_order: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
    for item in items {
        let image = first_images.get(&item.product_id).cloned();
        by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItemView { item, image });
    }

    Ok(orders
        .into_iter()
        .map(|order| OrderView {
            order_items: by_order.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect())
}

async fn items_of<C: ConnectionTrait>(
    db: &C,
    order_id: Uuid,
) -> Result<Vec<order_item::Model>, ServiceError> {
    order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::CreatedAt)
        .all(db)
        .await
        .map_err(db_error("Failed to load order items"))
}

/// Adds `delta` units back to (or takes them from) an attribute's stock in one statement.
async fn adjust_stock<C: ConnectionTrait>(
    db: &C,
    attribute_id: Uuid,
    delta: i32,
) -> Result<(), ServiceError> {
    product_attribute::Entity::update_many()
        .col_expr(
            product_attribute::Column::StockAmount,
            Expr::col(product_attribute::Column::StockAmount).add(delta),
        )
        .filter(product_attribute::Column::Id.eq(attribute_id))
        .exec(db)
        .await
        .map_err(db_error("Failed to adjust stock"))?;
    Ok(())
}

/// Order lifecycle, payment gateways and customer notifications.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    notifier: OrderNotifier,
    sslcommerz: Arc<SslCommerzClient>,
    paystation: Arc<PayStationClient>,
    fraud_check: Arc<FraudCheckClient>,
    store_name: String,
    storefront_url: String,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        notifier: OrderNotifier,
        sslcommerz: Arc<SslCommerzClient>,
        paystation: Arc<PayStationClient>,
        fraud_check: Arc<FraudCheckClient>,
        store_name: impl Into<String>,
        storefront_url: impl Into<String>,
    ) -> Self {
        Self {
            db_pool,
            notifier,
            sslcommerz,
            paystation,
            fraud_check,
            store_name: store_name.into(),
            storefront_url: storefront_url.into(),
        }
    }

    /// Places an order, snapshots prices and takes the stock, all in one transaction.
    #[instrument(skip(self, input), fields(invoice = ?input.invoice_number, lines = input.order_items.len()))]
    pub async fn create_order(&self, input: OrderInput) -> Result<OrderView, ServiceError> {
        input.validate()?;
        let invoice = input.invoice();
        let db = &*self.db_pool;

        let duplicate = order::Entity::find()
            .filter(order::Column::InvoiceNumber.eq(invoice.as_str()))
            .one(db)
            .await
            .map_err(db_error("Failed to check invoice number"))?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!("Invoice {invoice} already exists")));
        }

        let txn = db.begin().await.map_err(db_error("Failed to open transaction"))?;
        let quote = price_order(&txn, &input).await?;

        let order_id = Uuid::new_v4();
        let order = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(input.user_id),
            coupon_id: Set(quote.coupon.as_ref().map(|c| c.id)),
            customer_name: Set(input.customer_name.unwrap_or_default().trim().to_string()),
            customer_phone: Set(input.customer_phone.unwrap_or_default().trim().to_string()),
            customer_address: Set(input.customer_address.unwrap_or_default().trim().to_string()),
            customer_billing_address: Set(input.customer_billing_address),
            customer_email: Set(input.customer_email),
            customer_city: Set(input.customer_city),
            customer_postal_code: Set(input.customer_postal_code),
            invoice_number: Set(invoice.clone()),
            total_items: Set(quote.totals.total_items),
            subtotal: Set(quote.amount),
            subtotal_cost: Set(quote.totals.subtotal_cost),
            payment_method: Set(input.payment_method.unwrap_or_default().trim().to_string()),
            delivery_charge_inside: Set(input.delivery_charge_inside),
            delivery_charge_outside: Set(input.delivery_charge_outside),
            status: Set(OrderStatus::Pending),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            if e.to_string().to_lowercase().contains("unique") {
                ServiceError::Conflict(format!("Invoice {invoice} already exists"))
            } else {
                db_error("Failed to create order")(e)
            }
        })?;

        let mut items = Vec::with_capacity(quote.lines.len());
        for line in quote.lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product.id),
                product_attribute_id: Set(line.attribute.id),
                name: Set(line.product.name.clone()),
                size: Set(Some(line.attribute.size.clone())),
                cost_price: Set(line.attribute.cost_price),
                retail_price: Set(line.attribute.retail_price),
                discount_percent: Set(line.attribute.discount_percent),
                discount_price: Set(line.attribute.discount_price),
                discounted_retail_price: Set(line.attribute.discounted_retail_price),
                quantity: Set(line.request.quantity),
                total_price: Set(line.totals.total_price),
                total_cost_price: Set(line.totals.total_cost_price),
                drive_url: Set(line.product.drive_url.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(db_error("Failed to create order item"))?;

            line.attribute
                .stock_amount
                .checked_sub(line.request.quantity)
                .ok_or_else(pricing::quantity_too_large)?;
            adjust_stock(&txn, line.attribute.id, -line.request.quantity).await?;
            items.push(item);
        }

        txn.commit().await.map_err(db_error("Failed to commit order"))?;

        crate::metrics::record_order_created();
        info!(order_id = %order.id, invoice = %order.invoice_number, subtotal = %order.subtotal, "Order placed");

        self.notifier.order_placed(&order, &items).await;

        let mut views = load_views(db, vec![order]).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::InternalError("order view missing".to_string()))
    }

    /// Prices the checkout and opens an SSLCommerz session without writing anything.
    #[instrument(skip(self, input), fields(invoice = ?input.invoice_number))]
    pub async fn init_ssl_payment(&self, input: OrderInput) -> Result<GatewayRedirect, ServiceError> {
        let digital = input
            .payment_method
            .as_deref()
            .map(|m| m.trim().eq_ignore_ascii_case(DIGITAL_PAYMENT))
            .unwrap_or(false);
        if !digital {
            return Err(ServiceError::BadRequest("Invalid payment method".to_string()));
        }
        input.validate()?;

        let quote = price_order(&*self.db_pool, &input).await?;
        let product_name = quote
            .lines
            .iter()
            .map(|l| l.product.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let request = SessionRequest {
            total_amount: quote.amount,
            tran_id: input.invoice(),
            product_name,
            customer_name: input.customer_name.clone().unwrap_or_default(),
            customer_email: input.customer_email.clone(),
            customer_phone: input.customer_phone.clone().unwrap_or_default(),
            billing_address: input.customer_billing_address.clone(),
            shipping_address: input.customer_address.clone().unwrap_or_default(),
            city: input.customer_city.clone(),
            postcode: input.customer_postal_code.clone(),
        };

        let reply = self.sslcommerz.init_session(&request).await?;
        match reply.gateway_url() {
            Some(url) => {
                info!(invoice = %request.tran_id, "SSLCommerz session created");
                Ok(GatewayRedirect {
                    gateway: url.to_string(),
                })
            }
            None => Err(ServiceError::payment_failed_with(
                "Failed to get Gateway URL",
                json!({ "error": reply.to_value() }),
            )),
        }
    }

    /// Storefront checkout page the gateway returns the customer to.
    pub fn checkout_redirect(&self, success: bool) -> String {
        format!("{}/checkout?isSuccess={}", self.storefront_url, success)
    }

    fn visible() -> Select<order::Entity> {
        order::Entity::find().filter(order::Column::IsDeleted.eq(false))
    }

    async fn page_of(
        &self,
        query: Select<order::Entity>,
        page: Pagination,
    ) -> Result<Vec<OrderView>, ServiceError> {
        let db = &*self.db_pool;
        let orders = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(db, page.limit)
            .fetch_page(page.page_index())
            .await
            .map_err(db_error("Failed to list orders"))?;
        load_views(db, orders).await
    }

    /// Super-admins see every order; other users see the orders of their account.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        actor: &AuthUser,
        page: Pagination,
    ) -> Result<Vec<OrderView>, ServiceError> {
        if actor.is_super_admin() {
            self.page_of(Self::visible(), page).await
        } else {
            self.list_orders_by_user(actor.owner_id(), page).await
        }
    }

    #[instrument(skip(self))]
    pub async fn list_orders_by_user(
        &self,
        user_id: Uuid,
        page: Pagination,
    ) -> Result<Vec<OrderView>, ServiceError> {
        self.page_of(
            Self::visible().filter(order::Column::UserId.eq(user_id)),
            page,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, id: Uuid) -> Result<OrderView, ServiceError> {
        let db = &*self.db_pool;
        let order = Self::visible()
            .filter(order::Column::Id.eq(id))
            .one(db)
            .await
            .map_err(db_error("Failed to load order"))?
            .ok_or_else(|| ServiceError::NotFound("No order is available".to_string()))?;

        let mut views = load_views(db, vec![order]).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::NotFound("No order is available".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn get_latest_order(&self) -> Result<OrderView, ServiceError> {
        let db = &*self.db_pool;
        let order = Self::visible()
            .order_by_desc(order::Column::CreatedAt)
            .one(db)
            .await
            .map_err(db_error("Failed to load latest order"))?
            .ok_or_else(|| ServiceError::NotFound("No orders found".to_string()))?;

        let mut views = load_views(db, vec![order]).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::NotFound("No orders found".to_string()))
    }

    /// Newest order placed with the given phone number.
    #[instrument(skip(self))]
    pub async fn track_order(&self, phone: Option<&str>) -> Result<TrackedOrder, ServiceError> {
        let phone = non_empty(phone).ok_or_else(|| {
            ServiceError::BadRequest("Customer phone number required".to_string())
        })?;

        let db = &*self.db_pool;
        let order = Self::visible()
            .filter(order::Column::CustomerPhone.eq(phone))
            .order_by_desc(order::Column::CreatedAt)
            .one(db)
            .await
            .map_err(db_error("Failed to track order"))?
            .ok_or_else(|| {
                ServiceError::NotFound("No order found with this phone number".to_string())
            })?;

        let order_items = items_of(db, order.id).await?;
        Ok(TrackedOrder {
            invoice: order.invoice_number,
            status: order.status,
            updated_at: order.updated_at,
            estimated_delivery: order.estimated_delivery,
            customer_phone: order.customer_phone,
            order_items,
        })
    }

    /// Sets any status. Entering CANCELED or RETURNED from outside that pair puts
    /// the items back in stock; entering DELIVERED mails the download links.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        id: Uuid,
        status: Option<&str>,
    ) -> Result<order::Model, ServiceError> {
        let status = non_empty(status)
            .and_then(|s| OrderStatus::from_str(s).ok())
            .ok_or_else(|| ServiceError::BadRequest("Invalid order status".to_string()))?;

        let (order, items) = self.transition(id, status).await?;
        if status == OrderStatus::Delivered {
            self.announce_delivery(&order, &items, true).await;
        }
        Ok(order)
    }

    async fn transition(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<(order::Model, Vec<order_item::Model>), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(db_error("Failed to open transaction"))?;

        let existing = Self::visible()
            .filter(order::Column::Id.eq(id))
            .one(&txn)
            .await
            .map_err(db_error("Failed to load order"))?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        let previous = existing.status;
        let items = items_of(&txn, id).await?;

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(status);
        let order = active
            .update(&txn)
            .await
            .map_err(db_error("Failed to update order status"))?;

        let restock = status.is_restocked() && !previous.is_restocked();
        if restock {
            for item in &items {
                adjust_stock(&txn, item.product_attribute_id, item.quantity).await?;
            }
        }

        txn.commit().await.map_err(db_error("Failed to commit status change"))?;

        crate::metrics::record_status_change(status.as_ref());
        info!(order_id = %id, from = %previous, to = %status, restock, "Order status changed");
        Ok((order, items))
    }

    async fn delivery_lines(&self, items: &[order_item::Model]) -> Result<Vec<DeliveryLine>, ServiceError> {
        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products: HashMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(&*self.db_pool)
            .await
            .map_err(db_error("Failed to load delivered products"))?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(items
            .iter()
            .map(|item| {
                let product = products.get(&item.product_id);
                DeliveryLine {
                    name: item.name.clone(),
                    size: item.size.clone(),
                    short_description: product
                        .map(|p| p.short_description.clone())
                        .unwrap_or_default(),
                    long_description: product.and_then(|p| p.long_description.clone()),
                    download_url: item
                        .drive_url
                        .clone()
                        .or_else(|| product.and_then(|p| p.drive_url.clone()))
                        .filter(|u| !u.trim().is_empty())
                        .unwrap_or_else(|| "#".to_string()),
                }
            })
            .collect())
    }

    /// Mails download links for a delivered order. Failures are logged only.
    async fn announce_delivery(
        &self,
        order: &order::Model,
        items: &[order_item::Model],
        with_pdf: bool,
    ) {
        let lines = match self.delivery_lines(items).await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(invoice = %order.invoice_number, error = %e, "could not prepare delivery mail");
                return;
            }
        };

        let pdf = if with_pdf {
            match render_delivery_pdf(
                &self.store_name,
                &order.invoice_number,
                &order.customer_name,
                &lines,
            ) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(invoice = %order.invoice_number, error = %e, "delivery PDF rendering failed");
                    None
                }
            }
        } else {
            None
        };

        self.notifier.order_delivered(order, &lines, pdf).await;
    }

    async fn find_by_invoice(&self, invoice: &str) -> Result<order::Model, ServiceError> {
        order::Entity::find()
            .filter(order::Column::InvoiceNumber.eq(invoice))
            .one(&*self.db_pool)
            .await
            .map_err(db_error("Failed to load order by invoice"))?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }

    /// Confirms a PayStation payment requested by the storefront.
    #[instrument(skip(self))]
    pub async fn verify_payment(
        &self,
        invoice_number: Option<&str>,
    ) -> Result<SettledPayment, ServiceError> {
        let invoice = non_empty(invoice_number)
            .ok_or_else(|| ServiceError::BadRequest("Invoice number required".to_string()))?;

        let reply = self.paystation.transaction_status(invoice).await?;
        if !reply.is_settled() {
            info!(invoice = %invoice, "Payment not settled yet");
            return Err(ServiceError::payment_failed_with(
                "Payment is processing...",
                reply.into_value(),
            ));
        }

        let existing = self.find_by_invoice(invoice).await?;
        let (order, items) = self.transition(existing.id, OrderStatus::Delivered).await?;
        self.announce_delivery(&order, &items, false).await;

        Ok(SettledPayment {
            invoice_number: invoice.to_string(),
            order,
        })
    }

    /// PayStation return URL; a settled payment delivers the order.
    #[instrument(skip(self))]
    pub async fn payment_callback(
        &self,
        invoice_number: Option<&str>,
    ) -> Result<order::Model, ServiceError> {
        let invoice = non_empty(invoice_number)
            .ok_or_else(|| ServiceError::BadRequest("Invoice number required".to_string()))?;

        let reply = self.paystation.transaction_status(invoice).await?;
        let acknowledged = reply.data().is_some()
            && (reply.status_code().as_deref() == Some("200")
                || reply
                    .status()
                    .map_or(false, |s| s.eq_ignore_ascii_case("success")));
        if !acknowledged {
            return Err(ServiceError::BadRequest("Transaction not found".to_string()));
        }
        if !reply.is_settled() {
            return Err(ServiceError::BadRequest("Payment not completed yet".to_string()));
        }

        let existing = self.find_by_invoice(invoice).await?;
        let (order, items) = self.transition(existing.id, OrderStatus::Delivered).await?;
        self.announce_delivery(&order, &items, true).await;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: Uuid) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = Self::visible()
            .filter(order::Column::Id.eq(id))
            .one(db)
            .await
            .map_err(db_error("Failed to load order"))?
            .ok_or_else(|| ServiceError::NotFound("No order is available".to_string()))?;

        let mut active: order::ActiveModel = existing.into();
        active.is_deleted = Set(true);
        let order = active
            .update(db)
            .await
            .map_err(db_error("Failed to delete order"))?;

        info!(order_id = %id, "Order deleted");
        Ok(order)
    }

    /// Courier history of a phone number, passed through from the fraud checker.
    #[instrument(skip(self))]
    pub async fn fraud_check(&self, phone: Option<&str>) -> Result<Value, ServiceError> {
        let phone = non_empty(phone)
            .ok_or_else(|| ServiceError::BadRequest("Phone number required".to_string()))?;
        Ok(self.fraud_check.check(phone).await?)
    }

    /// Orders per calendar month of `year`, January first; empty months count 0.
    #[instrument(skip(self))]
    pub async fn monthly_order_count(&self, year: i32) -> Result<Vec<MonthlyCount>, ServiceError> {
        let window = dashboard::year_window(&Local, year)
            .ok_or_else(|| ServiceError::BadRequest("Invalid year".to_string()))?;

        let created: Vec<DateTime<Utc>> = order::Entity::find()
            .select_only()
            .column(order::Column::CreatedAt)
            .filter(order::Column::CreatedAt.gte(window.start))
            .filter(order::Column::CreatedAt.lt(window.end))
            .into_tuple()
            .all(&*self.db_pool)
            .await
            .map_err(db_error("Failed to count orders by month"))?;

        let mut counts = [0u64; 12];
        for at in created {
            counts[at.with_timezone(&Local).month0() as usize] += 1;
        }

        Ok(MONTH_NAMES
            .into_iter()
            .zip(counts)
            .map(|(month, count)| MonthlyCount { month, count })
            .collect())
    }
}
