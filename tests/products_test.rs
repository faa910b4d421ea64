mod common;

use axum::http::{Method, StatusCode};
use common::{num, TestApp, STOREFRONT_URL};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-bytes";

#[tokio::test]
async fn creating_a_product_applies_category_discount_and_uploads_images() {
    let app = TestApp::new().await;
    let category = app.seed_category("Panjabi", dec!(10)).await;
    let category_id = category.id.to_string();

    let (status, json) = app
        .multipart_authed(
            Method::POST,
            "/api/v1/products",
            &[
                ("name", "Eid Special Panjabi"),
                ("categoryId", category_id.as_str()),
                ("shortDescription", "Cotton panjabi with embroidery"),
                ("isActive", "true"),
                ("isTrending", "1"),
                ("productAttributes[0][size]", "M"),
                ("productAttributes[0][costPrice]", "600"),
                ("productAttributes[0][retailPrice]", "1000"),
                ("productAttributes[0][stockAmount]", "12"),
                ("productAttributes[1][size]", "XL"),
                ("productAttributes[1][retailPrice]", "1200"),
                ("productAttributes[1][discountPercent]", "50"),
            ],
            &[("images", "front.png", PNG), ("images", "back.png", PNG)],
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["message"], "Product has been created successfully");
    let product = &json["data"];
    assert_eq!(product["slug"], "rahim-store-eid-special-panjabi");
    assert_eq!(product["isTrending"], true);
    assert_eq!(product["categoryName"], "Panjabi");

    let attributes = product["productAttributes"].as_array().unwrap();
    assert_eq!(attributes.len(), 2);
    for attribute in attributes {
        // Category discount wins over the per-variant percent
        assert_eq!(num(&attribute["discountPercent"]), 10.0);
    }
    let medium = attributes.iter().find(|a| a["size"] == "M").unwrap();
    assert_eq!(num(&medium["discountedRetailPrice"]), 900.0);
    assert_eq!(medium["stockAmount"], 12);

    assert_eq!(product["images"].as_array().unwrap().len(), 2);
    assert_eq!(app.media.uploaded().len(), 2);
}

#[tokio::test]
async fn product_requires_name_and_short_description() {
    let app = TestApp::new().await;
    let (status, json) = app
        .multipart_authed(Method::POST, "/api/v1/products", &[("name", "Nameless")], &[])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Please fill Short Description");
}

#[tokio::test]
async fn merchant_listing_detail_ban_and_delete() {
    let app = TestApp::new().await;
    let shirt = app.seed_product("Denim Shirt", false, false).await;
    app.seed_product("Linen Shirt", false, false).await;
    app.seed_product("Leather Belt", false, false).await;

    let (_, json) = app.get_authed("/api/v1/products?name=shirt").await;
    assert_eq!(json["message"], "2 products found");

    let (_, json) = app.get_authed("/api/v1/products?page=2&limit=2").await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (status, json) = app
        .get_authed(&format!("/api/v1/products/{}", shirt.slug))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "1 product found");
    assert_eq!(json["data"]["id"], json!(shirt.id));

    let ban_uri = format!("/api/v1/products/{}/ban", shirt.id);
    let (_, json) = app.call(Method::PUT, &ban_uri, None, Some(app.token())).await;
    assert_eq!(json["message"], "Product has been banned");
    assert_eq!(json["data"]["isActive"], false);
    let (_, json) = app.call(Method::PUT, &ban_uri, None, Some(app.token())).await;
    assert_eq!(json["data"]["isActive"], true);

    let image = {
        use sea_orm::{ActiveModelTrait, Set};
        storefront_api::entities::product_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(shirt.id),
            image: Set("https://media.test/product/denim.png".to_string()),
            ..Default::default()
        }
        .insert(app.db())
        .await
        .unwrap()
    };

    let (status, json) = app
        .delete_authed(&format!("/api/v1/products/{}", shirt.id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Product has been deleted");
    assert_eq!(app.media.deleted(), vec![image.image]);

    let (status, _) = app
        .get_authed(&format!("/api/v1/products/{}", shirt.slug))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_rejects_a_taken_name_and_too_many_images() {
    let app = TestApp::new().await;
    let category = app.seed_category("Shoes", dec!(0)).await;
    let category_id = category.id.to_string();
    let sneaker = app.seed_product("Sneaker", false, false).await;
    app.seed_product("Loafer", false, false).await;
    let uri = format!("/api/v1/products/{}", sneaker.id);

    let (status, json) = app
        .multipart_authed(
            Method::PUT,
            &uri,
            &[
                ("name", "Loafer"),
                ("categoryId", category_id.as_str()),
                ("shortDescription", "Comfortable"),
            ],
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["message"], "Loafer already exists. Change its name.");

    let fields = [
        ("name", "Running Sneaker"),
        ("categoryId", category_id.as_str()),
        ("shortDescription", "Light and breathable"),
    ];
    let (status, json) = app
        .multipart_authed(
            Method::PUT,
            &uri,
            &fields,
            &[("images", "a.png", PNG), ("images", "b.png", PNG)],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["slug"], "rahim-store-running-sneaker");
    assert_eq!(json["data"]["images"].as_array().unwrap().len(), 2);

    let (status, json) = app
        .multipart_authed(
            Method::PUT,
            &uri,
            &fields,
            &[("images", "c.png", PNG), ("images", "d.png", PNG)],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "You cannot add more than 3 images");
}

#[tokio::test]
async fn deleted_product_cannot_be_edited() {
    let app = TestApp::new().await;
    let category = app.seed_category("Bags", dec!(0)).await;
    let category_id = category.id.to_string();
    let tote = app.seed_product("Jute Tote", false, false).await;
    let uri = format!("/api/v1/products/{}", tote.id);

    let (status, _) = app.delete_authed(&uri).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app
        .multipart_authed(
            Method::PUT,
            &uri,
            &[
                ("name", "Jute Tote Bag"),
                ("categoryId", category_id.as_str()),
                ("shortDescription", "Handwoven"),
            ],
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "This product does not exist");
}

#[tokio::test]
async fn page_past_the_offset_range_is_rejected() {
    let app = TestApp::new().await;
    app.seed_product("Clay Pot", false, false).await;

    let (status, json) = app
        .get(&format!("/api/v1/customer/products?page={}&limit=10", u64::MAX))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Page is out of range");

    let (status, json) = app
        .get_authed(&format!("/api/v1/products?page={}&limit=500", u64::MAX / 2))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Page is out of range");
}

#[tokio::test]
async fn storefront_views_and_flags() {
    let app = TestApp::new().await;
    let trending = app.seed_product("Smart Watch", true, false).await;
    app.seed_product("Earbuds", true, true).await;
    app.seed_product("Power Bank", false, false).await;

    let (_, json) = app.get("/api/v1/customer/products").await;
    assert_eq!(json["message"], "3 products found");

    let (_, json) = app.get("/api/v1/customer/products/trending").await;
    assert_eq!(json["message"], "2 trending products found");
    let (_, json) = app
        .get("/api/v1/customer/products/trending?page=1&limit=1")
        .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (_, json) = app.get("/api/v1/customer/products/featured").await;
    assert_eq!(json["message"], "1 products found");

    let (status, json) = app
        .get(&format!("/api/v1/customer/products/{}", trending.slug))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["viewCount"], 1);

    let (status, json) = app
        .call(
            Method::PUT,
            &format!("/api/v1/products/{}/view", trending.id),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "A user has viewed your Smart Watch product");
    assert_eq!(json["data"]["viewCount"], 2);

    let (status, json) = app.get("/api/v1/customer/products/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "No product is available");
}

#[tokio::test]
async fn empty_storefront_lists_report_null_data() {
    let app = TestApp::new().await;

    let (status, json) = app.get("/api/v1/customer/products/trending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "No trending product is available");
    assert!(json["data"].is_null());

    let (_, json) = app.get("/api/v1/customer/products/featured").await;
    assert_eq!(json["message"], "No featured products available");
}

#[tokio::test]
async fn attribute_lifecycle() {
    let app = TestApp::new().await;
    let product = app.seed_product("Hoodie", false, false).await;

    let (status, json) = app
        .post_authed(
            "/api/v1/product-attributes",
            json!({ "productId": product.id, "size": "L", "costPrice": 700, "retailPrice": 1500, "discountPercent": 20, "stockAmount": 8 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["message"], "Attribute has been created");
    assert_eq!(num(&json["data"]["discountedRetailPrice"]), 1200.0);
    let attribute_id = json["data"]["id"].as_str().unwrap().to_string();

    let (status, json) = app
        .post_authed(
            "/api/v1/product-attributes",
            json!({ "productId": product.id, "costPrice": 700, "retailPrice": 1500, "stockAmount": 8 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Please fill Variant");

    let (status, json) = app
        .post_authed(
            "/api/v1/product-attributes",
            json!({ "productId": Uuid::new_v4(), "size": "S", "costPrice": 1, "retailPrice": 2, "stockAmount": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["message"], "There is no product.");

    let (_, json) = app
        .put_authed(
            &format!("/api/v1/product-attributes/{attribute_id}"),
            json!({ "stockAmount": 3 }),
        )
        .await;
    assert_eq!(json["message"], "Product attribute has been updated");
    assert_eq!(json["data"]["stockAmount"], 3);
    assert_eq!(json["data"]["size"], "L");
    assert_eq!(num(&json["data"]["discountedRetailPrice"]), 1200.0);

    let (_, json) = app
        .get_authed(&format!("/api/v1/products/{}/attributes?size=l", product.id))
        .await;
    assert_eq!(json["message"], "1 attributes found");

    let (_, json) = app
        .delete_authed(&format!("/api/v1/product-attributes/{attribute_id}"))
        .await;
    assert_eq!(json["message"], "Product Attribute has been deleted");

    let (_, json) = app
        .get_authed(&format!("/api/v1/products/{}/attributes", product.id))
        .await;
    assert_eq!(json["message"], "No attribute is available");
}

#[tokio::test]
async fn image_lifecycle_and_cap() {
    let app = TestApp::new().await;
    let product = app.seed_product("Backpack", false, false).await;
    let product_id = product.id.to_string();

    let mut image_ids = Vec::new();
    for n in 0..3 {
        let (status, json) = app
            .multipart_authed(
                Method::POST,
                "/api/v1/product-images",
                &[("productId", product_id.as_str())],
                &[("image", &format!("bag-{n}.png"), PNG)],
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        image_ids.push(json["data"]["id"].as_str().unwrap().to_string());
    }

    let (status, json) = app
        .multipart_authed(
            Method::POST,
            "/api/v1/product-images",
            &[("productId", product_id.as_str())],
            &[("image", "bag-4.png", PNG)],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "You cannot add more than 3 images");

    let (_, json) = app
        .get_authed(&format!("/api/v1/products/{product_id}/images"))
        .await;
    assert_eq!(json["message"], "3 images found");

    let first = app.media.uploaded()[0].clone();
    let (status, json) = app
        .multipart_authed(
            Method::PUT,
            &format!("/api/v1/product-images/{}", image_ids[0]),
            &[],
            &[("image", "bag-new.png", PNG)],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Product image has been updated");
    assert_ne!(json["data"]["image"], first.as_str());
    assert!(app.media.deleted().contains(&first));

    let (status, json) = app
        .multipart_authed(
            Method::PUT,
            &format!("/api/v1/product-images/{}", image_ids[1]),
            &[],
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Please fill Image");

    let (status, json) = app
        .delete_authed(&format!("/api/v1/product-images/{}", image_ids[2]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Product image has been deleted");
}

#[tokio::test]
async fn announcement_mails_active_subscribers() {
    let app = TestApp::new().await;
    let product = app.seed_product("Winter Jacket", false, false).await;
    app.seed_subscriber("first@example.com", true).await;
    app.seed_subscriber("second@example.com", true).await;
    app.seed_subscriber("gone@example.com", false).await;

    let (status, json) = app
        .post_authed(&format!("/api/v1/products/{}/email", product.id), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Email is sent to the subscribers");
    assert_eq!(json["data"], 2);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|m| m.html.contains(&format!(
        "{STOREFRONT_URL}/product-details/{}",
        product.slug
    ))));
    assert!(!sent.iter().any(|m| m.to == "gone@example.com"));
}
