mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{TestApp, STOREFRONT_URL};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use storefront_api::entities::OrderStatus;
use uuid::Uuid;
use wiremock::{
    matchers::{body_json, body_string_contains, header as header_is, method, path},
    Mock, ResponseTemplate,
};

fn digital_checkout(invoice: &str, product: Uuid, attribute: Uuid) -> Value {
    json!({
        "customerName": "Tanvir Ahmed",
        "customerPhone": "01855667788",
        "customerAddress": "Agrabad, Chattogram",
        "customerCity": "Chattogram",
        "invoiceNumber": invoice,
        "paymentMethod": "Digital Payment",
        "deliveryChargeOutside": 120,
        "orderItems": [
            { "productId": product, "productAttributeId": attribute, "quantity": 1 }
        ]
    })
}

async fn settled_reply(app: &TestApp, invoice: &str, trx_status: &str) {
    Mock::given(method("POST"))
        .and(path("/transaction-status"))
        .and(header_is("merchantId", "104-1653730183"))
        .and(body_json(json!({ "invoice_number": invoice })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status_code": "200",
            "status": "success",
            "message": "Transaction found",
            "data": { "invoice_number": invoice, "trx_status": trx_status }
        })))
        .mount(&app.gateway)
        .await;
}

#[tokio::test]
async fn ssl_session_returns_gateway_url_without_writing_an_order() {
    let app = TestApp::new().await;
    let product = app.seed_product("Antivirus License", false, false).await;
    let attribute = app.seed_attribute(product.id, "1 Year", dec!(940), dec!(500), 50).await;

    Mock::given(method("POST"))
        .and(path("/gwprocess/v4/api.php"))
        .and(body_string_contains("tran_id=INV-SSL-1"))
        .and(body_string_contains("product_name=Antivirus+License"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "SUCCESS",
            "GatewayPageURL": "https://sandbox.sslcommerz.com/EasyCheckOut/test123"
        })))
        .expect(1)
        .mount(&app.gateway)
        .await;

    let (status, json) = app
        .post(
            "/api/v1/orders-init",
            digital_checkout("INV-SSL-1", product.id, attribute.id),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["message"], "Redirecting to SSL COMMERZ.");
    assert_eq!(
        json["data"]["gateway"],
        "https://sandbox.sslcommerz.com/EasyCheckOut/test123"
    );
    assert_eq!(app.stock_of(attribute.id).await, 50);
}

#[tokio::test]
async fn ssl_session_rejects_other_payment_methods_and_declines() {
    let app = TestApp::new().await;
    let product = app.seed_product("VPN Subscription", false, false).await;
    let attribute = app.seed_attribute(product.id, "6 Months", dec!(600), dec!(200), 50).await;

    let mut cash = digital_checkout("INV-SSL-2", product.id, attribute.id);
    cash["paymentMethod"] = json!("cash on delivery");
    let (status, json) = app.post("/api/v1/orders-init", cash).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid payment method");

    Mock::given(method("POST"))
        .and(path("/gwprocess/v4/api.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "FAILED",
            "failedreason": "Store Credential Error Or Store is De-active"
        })))
        .mount(&app.gateway)
        .await;

    let (status, json) = app
        .post(
            "/api/v1/orders-init",
            digital_checkout("INV-SSL-3", product.id, attribute.id),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Failed to get Gateway URL");
    assert_eq!(json["data"]["error"]["status"], "FAILED");
}

#[tokio::test]
async fn ssl_return_urls_redirect_to_checkout() {
    let app = TestApp::new().await;

    for (uri, success) in [("/api/v1/orders-success", true), ("/api/v1/orders-fail", false)] {
        let response = app
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            format!("{STOREFRONT_URL}/checkout?isSuccess={success}").as_str()
        );
    }
}

#[tokio::test]
async fn verified_payment_delivers_the_order() {
    let app = TestApp::new().await;
    app.seed_order(
        "INV-PS-1",
        OrderStatus::Pending,
        dec!(1500),
        dec!(900),
        chrono::Utc::now(),
    )
    .await;
    settled_reply(&app, "INV-PS-1", "Success").await;

    let (status, json) = app
        .post("/api/v1/verifyPayment", json!({ "invoice_number": "INV-PS-1" }))
        .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(
        json["message"],
        "Payment verified and order INV-PS-1 is confirmed."
    );
    assert_eq!(json["data"]["status"], "DELIVERED");
    assert_eq!(
        app.order_by_invoice("INV-PS-1").await.status,
        OrderStatus::Delivered
    );
}

#[tokio::test]
async fn unsettled_payment_reports_processing() {
    let app = TestApp::new().await;
    app.seed_order(
        "INV-PS-2",
        OrderStatus::Pending,
        dec!(1500),
        dec!(900),
        chrono::Utc::now(),
    )
    .await;
    settled_reply(&app, "INV-PS-2", "Processing").await;

    let (status, json) = app
        .post("/api/v1/verifyPayment", json!({ "invoice_number": "INV-PS-2" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Payment is processing...");
    assert_eq!(json["data"]["data"]["trx_status"], "Processing");
    assert_eq!(
        app.order_by_invoice("INV-PS-2").await.status,
        OrderStatus::Pending
    );

    let (status, json) = app.post("/api/v1/verifyPayment", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invoice number required");
}

#[tokio::test]
async fn callback_accepts_query_or_body() {
    let app = TestApp::new().await;
    for invoice in ["INV-CB-1", "INV-CB-2"] {
        app.seed_order(invoice, OrderStatus::Pending, dec!(300), dec!(100), chrono::Utc::now())
            .await;
        settled_reply(&app, invoice, "successful").await;
    }

    let (status, json) = app
        .get("/api/v1/payment/track?invoice_number=INV-CB-1")
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["message"], "Order marked as DELIVERED");
    assert_eq!(json["data"]["invoiceNumber"], "INV-CB-1");

    let (status, json) = app
        .post("/api/v1/payment/track", json!({ "invoice_number": "INV-CB-2" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(
        app.order_by_invoice("INV-CB-2").await.status,
        OrderStatus::Delivered
    );
}

#[tokio::test]
async fn callback_rejects_unknown_transactions() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(path("/transaction-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status_code": "404",
            "status": "failed",
            "message": "Transaction not found",
            "data": null
        })))
        .mount(&app.gateway)
        .await;

    let (status, json) = app
        .get("/api/v1/payment/track?invoice_number=INV-NOPE")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Transaction not found");

    let (status, json) = app.get("/api/v1/payment/track").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invoice number required");
}
