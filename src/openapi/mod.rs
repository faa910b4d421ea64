use serde::Serialize;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};
use utoipa_swagger_ui::SwaggerUi;

/// Shape of every JSON response; `data` varies per endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiEnvelope {
    pub success: bool,
    pub message: String,
    #[schema(value_type = Object, nullable = true)]
    pub data: Option<serde_json::Value>,
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
# Storefront API

Merchant storefront backend: product catalogue, customer orders with
SSLCommerz and PayStation payments, a contact inbox and dashboard figures.

## Authentication

Merchant endpoints expect a JWT in the `Authorization: Bearer <token>` header.
The bare `token` header is accepted as well.

## Responses

Every response is an envelope:

```json
{ "success": true, "message": "3 products found", "data": [] }
```

Empty listings answer `200` with `data: null`.
        "#
    ),
    tags(
        (name = "Products", description = "Merchant catalogue management"),
        (name = "Storefront", description = "Public product browsing"),
        (name = "Product Attributes", description = "Size, color and stock rows"),
        (name = "Product Images", description = "Product gallery"),
        (name = "Orders", description = "Order placement and lifecycle"),
        (name = "Payments", description = "Gateway redirects and callbacks"),
        (name = "Contacts", description = "Contact inbox"),
        (name = "Dashboard", description = "Merchant figures")
    ),
    paths(
        crate::handlers::products::create_product,
        crate::handlers::products::send_product_email,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::ban_product,
        crate::handlers::products::increase_product_view_count,
        crate::handlers::products::delete_product,
        crate::handlers::products::list_products_for_customer,
        crate::handlers::products::list_trending,
        crate::handlers::products::list_featured,
        crate::handlers::products::get_product_for_customer,
        crate::handlers::products::create_product_attribute,
        crate::handlers::products::list_product_attributes,
        crate::handlers::products::update_product_attribute,
        crate::handlers::products::delete_product_attribute,
        crate::handlers::products::list_product_images,
        crate::handlers::products::create_product_image,
        crate::handlers::products::update_product_image,
        crate::handlers::products::delete_product_image,

        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::list_orders_by_user,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_latest_order,
        crate::handlers::orders::track_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::delete_order,
        crate::handlers::orders::fraud_check,
        crate::handlers::orders::monthly_order_count,

        crate::handlers::payments::init_ssl_payment,
        crate::handlers::payments::ssl_success,
        crate::handlers::payments::ssl_fail,
        crate::handlers::payments::verify_payment,
        crate::handlers::payments::payment_callback,

        crate::handlers::contacts::create_contact,
        crate::handlers::contacts::list_contacts,
        crate::handlers::contacts::get_contact,
        crate::handlers::contacts::update_contact,
        crate::handlers::contacts::delete_contact,

        // Remaining dashboard figures share these shapes
        crate::handlers::dashboard::total_categories,
        crate::handlers::dashboard::total_orders,
        crate::handlers::dashboard::total_revenue,
        crate::handlers::dashboard::revenue_by_month,
    ),
    components(
        schemas(
            ApiEnvelope,
            crate::services::orders::OrderInput,
            crate::services::orders::OrderLineInput,
            crate::services::contacts::ContactInput,
            crate::services::products::NewAttribute,
            crate::services::products::AttributePatch,
            crate::handlers::orders::StatusUpdate,
            crate::handlers::payments::InvoiceRef,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Swagger UI at `/api/docs`, document at `/api/docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_storefront_routes() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("Storefront API"));
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/customer/products/trending"));
        assert!(json.contains("\"Bearer\""));
    }
}
