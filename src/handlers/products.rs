use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{listing, FormData, ListQuery};
use crate::{
    auth::AuthUser,
    entities::{product, product_attribute, product_image},
    errors::ServiceError,
    services::products::{AttributePatch, NewAttribute, ProductDetail, ProductFilter},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SizeFilter {
    pub size: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    summary = "Create product",
    description = "Multipart form with product fields, productAttributes and image files",
    request_body(content_type = "multipart/form-data", description = "Product form"),
    responses(
        (status = 200, description = "Product has been created successfully", body = crate::openapi::ApiEnvelope),
        (status = 400, description = "Missing field or failed upload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> ApiResult<ProductDetail> {
    let form = FormData::read(multipart).await?;
    let draft = form.product_draft()?;
    let product = state
        .services
        .products
        .create_product(&user, draft, form.files)
        .await?;
    Ok(Json(ApiResponse::success(
        "Product has been created successfully",
        product,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/email",
    summary = "Announce product to subscribers",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Email is sent to the subscribers", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "Product is not active", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn send_product_email(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<usize> {
    let sent = state.services.products.send_product_email(id).await?;
    Ok(Json(ApiResponse::success("Email is sent to the subscribers", sent)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    summary = "List merchant products",
    params(ListQuery, ProductFilterParams),
    responses(
        (status = 200, description = "N products found", body = crate::openapi::ApiEnvelope),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Vec<ProductDetail>> {
    let products = state
        .services
        .products
        .list_products(&user, &filter, query.pagination(&state.config)?)
        .await?;
    Ok(Json(listing(products, "products", "No product is available")))
}

/// Query parameters documented for product listings.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductFilterParams {
    pub name: Option<String>,
    pub product_code: Option<String>,
    pub barcode: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{slug}",
    summary = "Get product by slug",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "1 product found", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "No product is available", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<ProductDetail> {
    let product = state.services.products.get_product(&slug).await?;
    Ok(Json(ApiResponse::success("1 product found", product)))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    summary = "Update product",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body(content_type = "multipart/form-data", description = "Product form"),
    responses(
        (status = 200, description = "Product has been updated", body = crate::openapi::ApiEnvelope),
        (status = 400, description = "Missing field or too many images", body = crate::errors::ErrorResponse),
        (status = 404, description = "This product does not exist", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already taken", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<ProductDetail> {
    let form = FormData::read(multipart).await?;
    let draft = form.product_draft()?;
    let product = state
        .services
        .products
        .update_product(&user, id, draft, form.files)
        .await?;
    Ok(Json(ApiResponse::success("Product has been updated", product)))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}/ban",
    summary = "Toggle product visibility",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product has been banned", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "This product does not exist", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn ban_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<product::Model> {
    let product = state.services.products.ban_product(&user, id).await?;
    Ok(Json(ApiResponse::success("Product has been banned", product)))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}/view",
    summary = "Count a product view",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "View recorded", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "Product is not visible", body = crate::errors::ErrorResponse),
    ),
    tag = "Products"
)]
pub async fn increase_product_view_count(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<product::Model> {
    let product = state
        .services
        .products
        .increase_product_view_count(id)
        .await?;
    Ok(Json(ApiResponse::success(
        format!("A user has viewed your {} product", product.name),
        product,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    summary = "Delete product",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product has been deleted", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "This product does not exist", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<product::Model> {
    let product = state.services.products.delete_product(&user, id).await?;
    Ok(Json(ApiResponse::success("Product has been deleted", product)))
}

#[utoipa::path(
    get,
    path = "/api/v1/customer/products",
    summary = "Storefront catalogue",
    params(ListQuery, ProductFilterParams),
    responses((status = 200, description = "N products found", body = crate::openapi::ApiEnvelope)),
    tag = "Storefront"
)]
pub async fn list_products_for_customer(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Vec<ProductDetail>> {
    let products = state
        .services
        .products
        .list_products_for_customer(&filter, query.pagination(&state.config)?)
        .await?;
    Ok(Json(listing(products, "products", "No product is available")))
}

#[utoipa::path(
    get,
    path = "/api/v1/customer/products/trending",
    summary = "Trending products",
    params(ListQuery),
    responses((status = 200, description = "N trending products found", body = crate::openapi::ApiEnvelope)),
    tag = "Storefront"
)]
pub async fn list_trending(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<ProductDetail>> {
    let products = state
        .services
        .products
        .list_trending(query.explicit()?)
        .await?;
    Ok(Json(listing(
        products,
        "trending products",
        "No trending product is available",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/customer/products/featured",
    summary = "Featured products",
    responses((status = 200, description = "N products found", body = crate::openapi::ApiEnvelope)),
    tag = "Storefront"
)]
pub async fn list_featured(State(state): State<AppState>) -> ApiResult<Vec<ProductDetail>> {
    let products = state.services.products.list_featured().await?;
    Ok(Json(listing(
        products,
        "products",
        "No featured products available",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/customer/products/{slug}",
    summary = "Storefront product page",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "1 product found", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "No product is available", body = crate::errors::ErrorResponse),
    ),
    tag = "Storefront"
)]
pub async fn get_product_for_customer(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<ProductDetail> {
    let product = state
        .services
        .products
        .get_product_for_customer(&slug)
        .await?;
    Ok(Json(ApiResponse::success("1 product found", product)))
}

#[utoipa::path(
    post,
    path = "/api/v1/product-attributes",
    summary = "Create product attribute",
    request_body = NewAttribute,
    responses(
        (status = 200, description = "Attribute has been created", body = crate::openapi::ApiEnvelope),
        (status = 400, description = "Missing field", body = crate::errors::ErrorResponse),
        (status = 409, description = "There is no product.", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Product Attributes"
)]
pub async fn create_product_attribute(
    State(state): State<AppState>,
    Json(input): Json<NewAttribute>,
) -> ApiResult<product_attribute::Model> {
    let attribute = state
        .services
        .products
        .create_product_attribute(input)
        .await?;
    Ok(Json(ApiResponse::success("Attribute has been created", attribute)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/attributes",
    summary = "List product attributes",
    params(("id" = Uuid, Path, description = "Product ID"), ListQuery, SizeFilter),
    responses((status = 200, description = "N attributes found", body = crate::openapi::ApiEnvelope)),
    security(("Bearer" = [])),
    tag = "Product Attributes"
)]
pub async fn list_product_attributes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<SizeFilter>,
) -> ApiResult<Vec<product_attribute::Model>> {
    let attributes = state
        .services
        .products
        .list_product_attributes(id, filter.size.as_deref(), query.pagination(&state.config)?)
        .await?;
    Ok(Json(listing(
        attributes,
        "attributes",
        "No attribute is available",
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/product-attributes/{id}",
    summary = "Update product attribute",
    params(("id" = Uuid, Path, description = "Attribute ID")),
    request_body = AttributePatch,
    responses(
        (status = 200, description = "Product attribute has been updated", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "This product attribute does not exist", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Product Attributes"
)]
pub async fn update_product_attribute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<AttributePatch>,
) -> ApiResult<product_attribute::Model> {
    let attribute = state
        .services
        .products
        .update_product_attribute(id, patch)
        .await?;
    Ok(Json(ApiResponse::success(
        "Product attribute has been updated",
        attribute,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/product-attributes/{id}",
    summary = "Delete product attribute",
    params(("id" = Uuid, Path, description = "Attribute ID")),
    responses(
        (status = 200, description = "Product Attribute has been deleted", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "This product attribute does not exist", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Product Attributes"
)]
pub async fn delete_product_attribute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<product_attribute::Model> {
    let attribute = state
        .services
        .products
        .delete_product_attribute(id)
        .await?;
    Ok(Json(ApiResponse::success(
        "Product Attribute has been deleted",
        attribute,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/images",
    summary = "List product images",
    params(("id" = Uuid, Path, description = "Product ID"), ListQuery),
    responses((status = 200, description = "N images found", body = crate::openapi::ApiEnvelope)),
    security(("Bearer" = [])),
    tag = "Product Images"
)]
pub async fn list_product_images(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<product_image::Model>> {
    let images = state
        .services
        .products
        .list_product_images(id, query.pagination(&state.config)?)
        .await?;
    Ok(Json(listing(images, "images", "No image is available")))
}

#[utoipa::path(
    post,
    path = "/api/v1/product-images",
    summary = "Upload product image",
    request_body(content_type = "multipart/form-data", description = "productId and one image file"),
    responses(
        (status = 200, description = "Product image has been uploaded", body = crate::openapi::ApiEnvelope),
        (status = 400, description = "Missing field or too many images", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Product Images"
)]
pub async fn create_product_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<product_image::Model> {
    let form = FormData::read(multipart).await?;
    let product_id = form.uuid("productId")?;
    let image = state
        .services
        .products
        .create_product_image(product_id, form.files.into_iter().next())
        .await?;
    Ok(Json(ApiResponse::success("Product image has been uploaded", image)))
}

#[utoipa::path(
    put,
    path = "/api/v1/product-images/{id}",
    summary = "Replace product image",
    params(("id" = Uuid, Path, description = "Image ID")),
    request_body(content_type = "multipart/form-data", description = "One image file"),
    responses(
        (status = 200, description = "Product image has been updated", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "This product image does not exist", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Product Images"
)]
pub async fn update_product_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<product_image::Model> {
    let form = FormData::read(multipart).await?;
    let file = form
        .files
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::ValidationError("Please fill Image".to_string()))?;
    let image = state
        .services
        .products
        .update_product_image(id, file)
        .await?;
    Ok(Json(ApiResponse::success("Product image has been updated", image)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/product-images/{id}",
    summary = "Delete product image",
    params(("id" = Uuid, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Product image has been deleted", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "This product image does not exist", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Product Images"
)]
pub async fn delete_product_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<product_image::Model> {
    let image = state.services.products.delete_product_image(id).await?;
    Ok(Json(ApiResponse::success("Product image has been deleted", image)))
}
