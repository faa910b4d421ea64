mod common;

use axum::http::{Method, StatusCode};
use common::{num, TestApp, ADMIN_MAIL};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::{json, Value};
use storefront_api::entities::{order, order_item, OrderStatus};
use uuid::Uuid;
use wiremock::{
    matchers::{header, method, path},
    Mock, ResponseTemplate,
};

fn checkout(invoice: &str, product: Uuid, attribute: Uuid, quantity: i32) -> Value {
    json!({
        "customerName": "Nadia Islam",
        "customerPhone": "01711223344",
        "customerAddress": "House 7, Road 2, Dhanmondi",
        "customerEmail": "nadia@example.com",
        "invoiceNumber": invoice,
        "paymentMethod": "cash on delivery",
        "deliveryChargeInside": 60,
        "deliveryChargeOutside": 120,
        "orderItems": [
            { "productId": product, "productAttributeId": attribute, "quantity": quantity }
        ]
    })
}

#[tokio::test]
async fn placing_an_order_prices_it_and_takes_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("Cotton Panjabi", false, false).await;
    let attribute = app
        .seed_attribute(product.id, "XL", dec!(450), dec!(300), 10)
        .await;
    let coupon = app.seed_coupon("EID50", dec!(50), true).await;

    let mut body = checkout("INV-1001", product.id, attribute.id, 2);
    body["couponId"] = json!(coupon.id);
    let (status, json) = app.post("/api/v1/orders", body).await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["message"], "Your order has been placed successfully");
    let order = &json["data"];
    assert_eq!(order["invoiceNumber"], "INV-1001");
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["totalItems"], 2);
    // 2 x 450 + 60 inside delivery - 50 coupon
    assert_eq!(num(&order["subtotal"]), 910.0);
    assert_eq!(num(&order["subtotalCost"]), 600.0);
    assert_eq!(order["couponId"], json!(coupon.id));
    assert_eq!(order["orderItems"].as_array().unwrap().len(), 1);
    assert_eq!(order["orderItems"][0]["size"], "XL");

    assert_eq!(app.stock_of(attribute.id).await, 8);

    let subjects = app.mailer.subjects();
    assert!(subjects.contains(&"Order Invoice #INV-1001".to_string()));
    assert!(subjects.contains(&"New Order Received #INV-1001".to_string()));
    assert!(app.mailer.sent().iter().any(|m| m.to == ADMIN_MAIL));
}

#[tokio::test]
async fn inactive_coupon_is_ignored() {
    let app = TestApp::new().await;
    let product = app.seed_product("Silk Saree", false, false).await;
    let attribute = app
        .seed_attribute(product.id, "Free", dec!(1000), dec!(700), 3)
        .await;
    let coupon = app.seed_coupon("EXPIRED", dec!(200), false).await;

    let mut body = checkout("INV-1002", product.id, attribute.id, 1);
    body["couponId"] = json!(coupon.id);
    let (status, json) = app.post("/api/v1/orders", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(num(&json["data"]["subtotal"]), 1060.0);
    assert!(json["data"]["couponId"].is_null());
}

#[tokio::test]
async fn order_validation_errors() {
    let app = TestApp::new().await;
    let product = app.seed_product("Kurti", false, false).await;
    let attribute = app.seed_attribute(product.id, "M", dec!(800), dec!(500), 5).await;

    let mut missing_phone = checkout("INV-2001", product.id, attribute.id, 1);
    missing_phone["customerPhone"] = json!("  ");
    let (status, json) = app.post("/api/v1/orders", missing_phone).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Please fill Phone");

    let mut empty_cart = checkout("INV-2002", product.id, attribute.id, 1);
    empty_cart["orderItems"] = json!([]);
    let (status, json) = app.post("/api/v1/orders", empty_cart).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Please select at least 1 item");

    let (status, json) = app
        .post(
            "/api/v1/orders",
            checkout("INV-2003", product.id, Uuid::new_v4(), 1),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Product or attribute does not exist");

    // Nothing was taken from stock by the rejected requests
    assert_eq!(app.stock_of(attribute.id).await, 5);
}

#[tokio::test]
async fn duplicate_invoice_is_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("Lungi", false, false).await;
    let attribute = app.seed_attribute(product.id, "L", dec!(300), dec!(150), 10).await;

    let (status, _) = app
        .post("/api/v1/orders", checkout("INV-3001", product.id, attribute.id, 1))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app
        .post("/api/v1/orders", checkout("INV-3001", product.id, attribute.id, 1))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);
    assert_eq!(app.stock_of(attribute.id).await, 9);
}

#[tokio::test]
async fn canceling_restocks_once_and_delivery_mails_links() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ebook Bundle", false, false).await;
    let attribute = app.seed_attribute(product.id, "PDF", dec!(200), dec!(0), 4).await;

    let (_, json) = app
        .post("/api/v1/orders", checkout("INV-4001", product.id, attribute.id, 3))
        .await;
    let order_id = json["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(app.stock_of(attribute.id).await, 1);

    let uri = format!("/api/v1/orders/{order_id}");
    let (status, json) = app.put_authed(&uri, json!({ "status": "CANCELED" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Order status updated successfully.");
    assert_eq!(json["data"]["status"], "CANCELED");
    assert_eq!(app.stock_of(attribute.id).await, 4);

    // CANCELED -> RETURNED stays within the restocked pair
    let (status, _) = app.put_authed(&uri, json!({ "status": "returned" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stock_of(attribute.id).await, 4);

    let (status, _) = app.put_authed(&uri, json!({ "status": "DELIVERED" })).await;
    assert_eq!(status, StatusCode::OK);
    let delivered = app
        .mailer
        .sent()
        .into_iter()
        .find(|m| m.subject == "Your Order INV-4001 is Delivered")
        .expect("delivery mail");
    assert_eq!(delivered.to, "nadia@example.com");
    assert_eq!(delivered.attachments.len(), 1);
    assert_eq!(delivered.attachments[0].filename, "Order_INV-4001.pdf");

    let (status, json) = app.put_authed(&uri, json!({ "status": "LOST" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid order status");
}

async fn orders_with_invoice(app: &TestApp, invoice: &str) -> u64 {
    order::Entity::find()
        .filter(order::Column::InvoiceNumber.eq(invoice))
        .count(app.db())
        .await
        .unwrap()
}

#[tokio::test]
async fn oversized_quantities_are_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let product = app.seed_product("Gift Card", false, false).await;
    let attribute = app.seed_attribute(product.id, "Digital", dec!(1), dec!(0), 10).await;

    let mut body = checkout("INV-7001", product.id, attribute.id, i32::MAX);
    body["orderItems"] = json!([
        { "productId": product.id, "productAttributeId": attribute.id, "quantity": i32::MAX },
        { "productId": product.id, "productAttributeId": attribute.id, "quantity": i32::MAX }
    ]);
    let (status, json) = app.post("/api/v1/orders", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");
    assert_eq!(json["message"], "Item quantity is too large");
    assert_eq!(app.stock_of(attribute.id).await, 10);
    assert_eq!(orders_with_invoice(&app, "INV-7001").await, 0);
}

#[tokio::test]
async fn failing_line_rolls_back_earlier_stock_changes() {
    let app = TestApp::new().await;
    let product = app.seed_product("Leather Wallet", false, false).await;
    let brown = app.seed_attribute(product.id, "Brown", dec!(650), dec!(400), 10).await;
    // Taking 2 from this stock underflows the column, so the second line fails
    // after the first line's stock was already written.
    let black = app
        .seed_attribute(product.id, "Black", dec!(650), dec!(400), i32::MIN + 1)
        .await;

    let mut body = checkout("INV-7002", product.id, brown.id, 2);
    body["orderItems"] = json!([
        { "productId": product.id, "productAttributeId": brown.id, "quantity": 2 },
        { "productId": product.id, "productAttributeId": black.id, "quantity": 2 }
    ]);
    let (status, json) = app.post("/api/v1/orders", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");
    assert_eq!(json["message"], "Item quantity is too large");
    assert_eq!(app.stock_of(brown.id).await, 10);
    assert_eq!(app.stock_of(black.id).await, i32::MIN + 1);
    assert_eq!(orders_with_invoice(&app, "INV-7002").await, 0);
    assert_eq!(order_item::Entity::find().count(app.db()).await.unwrap(), 0);
    assert!(app.mailer.subjects().is_empty());
}

#[tokio::test]
async fn deleted_order_status_cannot_change() {
    let app = TestApp::new().await;
    let product = app.seed_product("Prayer Mat", false, false).await;
    let attribute = app.seed_attribute(product.id, "Green", dec!(350), dec!(200), 5).await;

    let (_, json) = app
        .post("/api/v1/orders", checkout("INV-7003", product.id, attribute.id, 2))
        .await;
    let uri = format!("/api/v1/orders/{}", json["data"]["id"].as_str().unwrap());
    assert_eq!(app.stock_of(attribute.id).await, 3);

    let (status, _) = app.delete_authed(&uri).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app.put_authed(&uri, json!({ "status": "CANCELED" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Order not found");
    assert_eq!(app.stock_of(attribute.id).await, 3);
    assert_eq!(app.order_by_invoice("INV-7003").await.status, OrderStatus::Pending);
}

#[tokio::test]
async fn merchant_routes_require_a_token() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/api/v1/orders").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/api/v1/orders", None, Some("not-a-jwt"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = app.get_authed("/api/v1/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "No order is available");
    assert!(json["data"].is_null());
}

#[tokio::test]
async fn listing_is_scoped_to_the_account_unless_super_admin() {
    let app = TestApp::new().await;
    let now = chrono::Utc::now();
    app.seed_order("INV-5001", OrderStatus::Pending, dec!(500), dec!(300), now)
        .await;
    let foreign = app
        .seed_order("INV-5002", OrderStatus::Pending, dec!(700), dec!(400), now)
        .await;
    {
        use sea_orm::{ActiveModelTrait, Set};
        let mut active: storefront_api::entities::order::ActiveModel = foreign.into();
        active.user_id = Set(Some(Uuid::new_v4()));
        active.update(app.db()).await.unwrap();
    }

    let (_, json) = app.get_authed("/api/v1/orders").await;
    assert_eq!(json["message"], "1 orders found");
    assert_eq!(json["data"][0]["invoiceNumber"], "INV-5001");

    let admin = app.super_admin_token().await;
    let (_, json) = app
        .call(Method::GET, "/api/v1/orders?page=1&limit=10", None, Some(&admin))
        .await;
    assert_eq!(json["message"], "2 orders found");

    let (_, json) = app
        .call(Method::GET, "/api/v1/orders?page=2&limit=1", None, Some(&admin))
        .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn tracking_latest_and_deletion() {
    let app = TestApp::new().await;
    let older = chrono::Utc::now() - chrono::Duration::days(2);
    let first = app
        .seed_order("INV-6001", OrderStatus::Shipped, dec!(500), dec!(300), older)
        .await;
    let latest = app
        .seed_order("INV-6002", OrderStatus::Pending, dec!(900), dec!(600), chrono::Utc::now())
        .await;

    let (status, json) = app.get("/api/track?phone=01711000000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Order fetched successfully");
    assert_eq!(json["data"]["invoice"], "INV-6002");

    let (status, json) = app.get("/api/track").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Customer phone number required");

    let (status, json) = app.get("/api/track?phone=01999999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "No order found with this phone number");

    let (_, json) = app.get_authed("/api/v1/orders/latest").await;
    assert_eq!(json["message"], "Latest order found");
    assert_eq!(json["data"]["id"], json!(latest.id));

    let (status, json) = app
        .delete_authed(&format!("/api/v1/orders/{}", latest.id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Order has been deleted");

    let (status, _) = app.get_authed(&format!("/api/v1/orders/{}", latest.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = app.get_authed("/api/v1/orders/latest").await;
    assert_eq!(json["data"]["id"], json!(first.id));

    let (_, json) = app.get("/api/track?phone=01711000000").await;
    assert_eq!(json["data"]["invoice"], "INV-6001");
}

#[tokio::test]
async fn orders_by_user_and_monthly_counts() {
    let app = TestApp::new().await;
    let year = 2023;
    let march = chrono::TimeZone::with_ymd_and_hms(&chrono::Local, year, 3, 15, 12, 0, 0)
        .unwrap()
        .with_timezone(&chrono::Utc);
    app.seed_order("INV-7001", OrderStatus::Delivered, dec!(100), dec!(50), march)
        .await;
    app.seed_order("INV-7002", OrderStatus::Pending, dec!(100), dec!(50), march)
        .await;

    let (_, json) = app
        .get_authed(&format!("/api/v1/orders/user/{}", app.merchant.id))
        .await;
    assert_eq!(json["message"], "2 orders found");

    let (_, json) = app
        .get_authed(&format!("/api/v1/orders/user/{}", Uuid::new_v4()))
        .await;
    assert!(json["data"].is_null());

    let (status, json) = app
        .get_authed(&format!("/api/v1/orders/month-wise/{year}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let months = json["data"].as_array().unwrap();
    assert_eq!(months.len(), 12);
    assert_eq!(months[0]["month"], "January");
    assert_eq!(months[2]["month"], "March");
    assert_eq!(months[2]["count"], 2);
    assert_eq!(months[3]["count"], 0);
}

#[tokio::test]
async fn fraud_check_passes_the_report_through() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(path("/fraud/"))
        .and(header("authorization", "Bearer fraud-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "courierData": { "summary": { "total_parcel": 12, "success_parcel": 11 } }
        })))
        .mount(&app.gateway)
        .await;

    let (status, json) = app
        .get_authed("/api/fraud-check-order?phone=01711223344")
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["message"], "Fraud check completed successfully");
    assert_eq!(json["data"]["courierData"]["summary"]["total_parcel"], 12);

    let (status, json) = app.get_authed("/api/fraud-check-order").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Phone number required");
}
