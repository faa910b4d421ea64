use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{category, newsletter, product, product_attribute, product_image, user},
    errors::ServiceError,
    integrations::{MediaStore, UploadFile},
    notifications::OrderNotifier,
    services::{
        contains_ci, db_error, non_empty, pricing, require_fields, slugify, Pagination,
    },
};

/// Most images a product may carry.
pub const MAX_PRODUCT_IMAGES: usize = 3;

const UPLOAD_FAILED: &str = "Something went wrong while uploading image. Try again";
const PRODUCT_MISSING: &str = "This product does not exist";

/// Substring filters accepted by product listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub product_code: Option<String>,
    pub barcode: Option<String>,
}

impl ProductFilter {
    fn apply(&self, mut query: Select<product::Entity>) -> Select<product::Entity> {
        if let Some(name) = non_empty(self.name.as_deref()) {
            query = query.filter(contains_ci(product::Column::Name, name));
        }
        if let Some(code) = non_empty(self.product_code.as_deref()) {
            query = query.filter(contains_ci(product::Column::ProductCode, code));
        }
        if let Some(barcode) = non_empty(self.barcode.as_deref()) {
            query = query.filter(contains_ci(product::Column::Barcode, barcode));
        }
        query
    }
}

/// A priced size variant submitted with a new product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDraft {
    pub size: String,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    #[serde(default)]
    pub retail_price: Option<Decimal>,
    #[serde(default)]
    pub discount_percent: Option<Decimal>,
    #[serde(default)]
    pub stock_amount: Option<i32>,
}

/// Product fields as submitted by the merchant dashboard.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub subsubcategory_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub product_code: Option<String>,
    pub barcode: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub sku: Option<String>,
    pub drive_url: Option<String>,
    pub is_trending: Option<bool>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
    pub product_attributes: Vec<AttributeDraft>,
}

/// Standalone attribute creation request.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAttribute {
    pub product_id: Option<Uuid>,
    pub size: Option<String>,
    pub cost_price: Option<Decimal>,
    pub retail_price: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
    pub stock_amount: Option<i32>,
}

/// Partial attribute update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttributePatch {
    pub size: Option<String>,
    pub cost_price: Option<Decimal>,
    pub retail_price: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
    pub stock_amount: Option<i32>,
}

/// A product together with its variants, images and category name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: product::Model,
    pub category_name: Option<String>,
    pub product_attributes: Vec<product_attribute::Model>,
    pub images: Vec<product_image::Model>,
}

async fn load_details<C: ConnectionTrait>(
    db: &C,
    products: Vec<product::Model>,
) -> Result<Vec<ProductDetail>, ServiceError> {
    if products.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let category_ids: Vec<Uuid> = products.iter().filter_map(|p| p.category_id).collect();

    let mut attributes: HashMap<Uuid, Vec<product_attribute::Model>> = HashMap::new();
    for attribute in product_attribute::Entity::find()
        .filter(product_attribute::Column::ProductId.is_in(ids.clone()))
        .filter(product_attribute::Column::IsDeleted.eq(false))
        .order_by_asc(product_attribute::Column::CreatedAt)
        .all(db)
        .await
        .map_err(db_error("Failed to load product attributes"))?
    {
        attributes.entry(attribute.product_id).or_default().push(attribute);
    }

    let mut images: HashMap<Uuid, Vec<product_image::Model>> = HashMap::new();
    for image in product_image::Entity::find()
        .filter(product_image::Column::ProductId.is_in(ids))
        .order_by_asc(product_image::Column::CreatedAt)
        .all(db)
        .await
        .map_err(db_error("Failed to load product images"))?
    {
        images.entry(image.product_id).or_default().push(image);
    }

    let categories: HashMap<Uuid, String> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        category::Entity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(db)
            .await
            .map_err(db_error("Failed to load categories"))?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect()
    };

    Ok(products
        .into_iter()
        .map(|product| ProductDetail {
            category_name: product
                .category_id
                .and_then(|id| categories.get(&id).cloned()),
            product_attributes: attributes.remove(&product.id).unwrap_or_default(),
            images: images.remove(&product.id).unwrap_or_default(),
            product,
        })
        .collect())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Catalogue management for merchants and catalogue reads for customers.
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    media: Arc<dyn MediaStore>,
    notifier: OrderNotifier,
    image_folder: String,
    storefront_url: String,
}

impl ProductService {
    pub fn new(
        db_pool: Arc<DbPool>,
        media: Arc<dyn MediaStore>,
        notifier: OrderNotifier,
        image_folder: impl Into<String>,
        storefront_url: impl Into<String>,
    ) -> Self {
        Self {
            db_pool,
            media,
            notifier,
            image_folder: image_folder.into(),
            storefront_url: storefront_url.into(),
        }
    }

    async fn upload_all(&self, files: Vec<UploadFile>) -> Result<Vec<String>, ServiceError> {
        let mut urls = Vec::with_capacity(files.len());
        for file in files {
            let filename = file.filename.clone();
            let uploaded = self
                .media
                .upload(file, &self.image_folder)
                .await
                .map_err(|e| {
                    warn!(file = %filename, error = %e, "image upload failed");
                    ServiceError::BadRequest(UPLOAD_FAILED.to_string())
                })?;
            urls.push(uploaded.secure_url);
        }
        Ok(urls)
    }

    async fn forget_image(&self, url: &str) {
        if let Err(e) = self.media.delete(url).await {
            warn!(url = %url, error = %e, "failed to delete image from media store");
        }
    }

    async fn find_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .filter(product::Column::IsDeleted.eq(false))
            .one(&*self.db_pool)
            .await
            .map_err(db_error("Failed to load product"))?
            .ok_or_else(|| ServiceError::NotFound(PRODUCT_MISSING.to_string()))
    }

    async fn detail(&self, product: product::Model) -> Result<ProductDetail, ServiceError> {
        let mut details = load_details(&*self.db_pool, vec![product]).await?;
        details
            .pop()
            .ok_or_else(|| ServiceError::InternalError("product detail missing".to_string()))
    }

    /// Creates a product with its attributes and uploaded images.
    #[instrument(skip(self, draft, files), fields(owner = %actor.owner_id(), images = files.len()))]
    pub async fn create_product(
        &self,
        actor: &AuthUser,
        draft: ProductDraft,
        files: Vec<UploadFile>,
    ) -> Result<ProductDetail, ServiceError> {
        require_fields(&[
            (draft.name.as_deref(), "Name"),
            (draft.short_description.as_deref(), "Short Description"),
        ])?;

        let image_urls = self.upload_all(files).await?;

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(db_error("Failed to open transaction"))?;

        let owner = user::Entity::find_by_id(actor.owner_id())
            .one(&txn)
            .await
            .map_err(db_error("Failed to load product owner"))?
            .ok_or_else(|| ServiceError::NotFound("This user does not exist".to_string()))?;

        let category_discount = match draft.category_id {
            Some(category_id) => category::Entity::find_by_id(category_id)
                .one(&txn)
                .await
                .map_err(db_error("Failed to load category"))?
                .map(|c| c.discount),
            None => None,
        };

        let name = draft.name.unwrap_or_default().trim().to_string();
        let product_id = Uuid::new_v4();
        let product = product::ActiveModel {
            id: Set(product_id),
            user_id: Set(owner.id),
            category_id: Set(draft.category_id),
            brand_id: Set(draft.brand_id),
            subcategory_id: Set(draft.subcategory_id),
            subsubcategory_id: Set(draft.subsubcategory_id),
            campaign_id: Set(draft.campaign_id),
            supplier_id: Set(draft.supplier_id),
            slug: Set(format!("{}-{}", slugify(&owner.name), slugify(&name))),
            name: Set(name),
            product_code: Set(trimmed(draft.product_code)),
            barcode: Set(trimmed(draft.barcode)),
            short_description: Set(draft.short_description.unwrap_or_default()),
            long_description: Set(trimmed(draft.long_description)),
            sku: Set(trimmed(draft.sku)),
            drive_url: Set(trimmed(draft.drive_url)),
            is_trending: Set(draft.is_trending.unwrap_or(false)),
            is_featured: Set(draft.is_featured.unwrap_or(false)),
            is_active: Set(draft.is_active.unwrap_or(false)),
            created_by: Set(Some(actor.id)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_error("Failed to create product"))?;

        for attribute in draft.product_attributes {
            let percent =
                pricing::effective_discount_percent(category_discount, attribute.discount_percent);
            let price =
                pricing::apply_discount(attribute.retail_price.unwrap_or(Decimal::ZERO), percent)?;
            product_attribute::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product_id),
                size: Set(attribute.size),
                cost_price: Set(attribute.cost_price.unwrap_or(Decimal::ZERO)),
                retail_price: Set(price.retail_price),
                discount_percent: Set(price.discount_percent),
                discount_price: Set(price.discount_price),
                discounted_retail_price: Set(price.discounted_retail_price),
                stock_amount: Set(attribute.stock_amount.unwrap_or(0)),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(db_error("Failed to create product attribute"))?;
        }

        for url in image_urls {
            product_image::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product_id),
                image: Set(url),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(db_error("Failed to store product image"))?;
        }

        txn.commit().await.map_err(db_error("Failed to commit product"))?;

        info!(product_id = %product.id, slug = %product.slug, "Product created");
        self.detail(product).await
    }

    /// Mails the product link to every active newsletter subscriber.
    #[instrument(skip(self))]
    pub async fn send_product_email(&self, product_id: Uuid) -> Result<usize, ServiceError> {
        let db = &*self.db_pool;
        let product = product::Entity::find_by_id(product_id)
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::IsDeleted.eq(false))
            .one(db)
            .await
            .map_err(db_error("Failed to load product"))?
            .ok_or_else(|| ServiceError::NotFound("Something went wrong. Try again".to_string()))?;

        let recipients: Vec<String> = newsletter::Entity::find()
            .filter(newsletter::Column::IsActive.eq(true))
            .order_by_desc(newsletter::Column::CreatedAt)
            .all(db)
            .await
            .map_err(db_error("Failed to load subscribers"))?
            .into_iter()
            .map(|n| n.email)
            .collect();

        let link = format!("{}/product-details/{}", self.storefront_url, product.slug);
        let sent = self
            .notifier
            .product_announcement(recipients, &product.name, &link)
            .await;

        info!(product_id = %product.id, sent, "Product announcement sent");
        Ok(sent)
    }

    /// Merchant listing: super-admins see everything newest first, other
    /// users see their own catalogue oldest first.
    #[instrument(skip(self, filter))]
    pub async fn list_products(
        &self,
        actor: &AuthUser,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<Vec<ProductDetail>, ServiceError> {
        let mut query = filter.apply(
            product::Entity::find().filter(product::Column::IsDeleted.eq(false)),
        );
        query = if actor.is_super_admin() {
            query.order_by_desc(product::Column::CreatedAt)
        } else {
            query
                .filter(product::Column::UserId.eq(actor.owner_id()))
                .order_by_asc(product::Column::CreatedAt)
        };

        let products = query
            .paginate(&*self.db_pool, page.limit)
            .fetch_page(page.page_index())
            .await
            .map_err(db_error("Failed to list products"))?;

        load_details(&*self.db_pool, products).await
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, slug: &str) -> Result<ProductDetail, ServiceError> {
        let product = product::Entity::find()
            .filter(product::Column::Slug.eq(slug))
            .filter(product::Column::IsDeleted.eq(false))
            .one(&*self.db_pool)
            .await
            .map_err(db_error("Failed to load product"))?
            .ok_or_else(|| ServiceError::NotFound("No product is available".to_string()))?;

        self.detail(product).await
    }

    /// Replaces the product fields of a live product. The editing account
    /// becomes the product's owner.
    #[instrument(skip(self, draft, files), fields(images = files.len()))]
    pub async fn update_product(
        &self,
        actor: &AuthUser,
        id: Uuid,
        draft: ProductDraft,
        files: Vec<UploadFile>,
    ) -> Result<ProductDetail, ServiceError> {
        let category = draft.category_id.map(|c| c.to_string());
        require_fields(&[
            (draft.name.as_deref(), "Name"),
            (category.as_deref(), "Category"),
            (draft.short_description.as_deref(), "Short Description"),
        ])?;

        let db = &*self.db_pool;
        let existing = self.find_product(id).await?;

        let owner = user::Entity::find_by_id(existing.user_id)
            .one(db)
            .await
            .map_err(db_error("Failed to load product owner"))?
            .ok_or_else(|| ServiceError::NotFound("This user does not exist".to_string()))?;

        let name = draft.name.unwrap_or_default().trim().to_string();
        let slug = format!("{}-{}", slugify(&owner.name), slugify(&name));
        if name != existing.name {
            let clash = product::Entity::find()
                .filter(product::Column::UserId.eq(actor.owner_id()))
                .filter(product::Column::Slug.eq(slug.as_str()))
                .filter(product::Column::IsDeleted.eq(false))
                .filter(product::Column::Id.ne(id))
                .one(db)
                .await
                .map_err(db_error("Failed to check product slug"))?;
            if clash.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "{name} already exists. Change its name."
                )));
            }
        }

        if !files.is_empty() {
            let stored = product_image::Entity::find()
                .filter(product_image::Column::ProductId.eq(id))
                .count(db)
                .await
                .map_err(db_error("Failed to count product images"))?;
            if stored as usize + files.len() > MAX_PRODUCT_IMAGES {
                return Err(ServiceError::BadRequest(
                    "You cannot add more than 3 images".to_string(),
                ));
            }
        }

        let image_urls = self.upload_all(files).await?;

        let txn = db.begin().await.map_err(db_error("Failed to open transaction"))?;

        let mut active: product::ActiveModel = existing.into();
        active.user_id = Set(actor.owner_id());
        active.category_id = Set(draft.category_id);
        active.brand_id = Set(draft.brand_id);
        active.subcategory_id = Set(draft.subcategory_id);
        active.subsubcategory_id = Set(draft.subsubcategory_id);
        active.campaign_id = Set(draft.campaign_id);
        active.supplier_id = Set(draft.supplier_id);
        active.product_code = Set(trimmed(draft.product_code));
        active.barcode = Set(trimmed(draft.barcode));
        active.name = Set(name);
        active.slug = Set(slug);
        active.short_description = Set(draft.short_description.unwrap_or_default());
        active.long_description = Set(trimmed(draft.long_description));
        active.sku = Set(trimmed(draft.sku));
        if let Some(drive_url) = draft.drive_url {
            active.drive_url = Set(trimmed(Some(drive_url)));
        }
        if let Some(flag) = draft.is_trending {
            active.is_trending = Set(flag);
        }
        if let Some(flag) = draft.is_featured {
            active.is_featured = Set(flag);
        }
        if let Some(flag) = draft.is_active {
            active.is_active = Set(flag);
        }
        active.updated_by = Set(Some(actor.id));

        let product = active
            .update(&txn)
            .await
            .map_err(db_error("Failed to update product"))?;

        for url in image_urls {
            product_image::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(id),
                image: Set(url),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(db_error("Failed to store product image"))?;
        }

        txn.commit().await.map_err(db_error("Failed to commit product update"))?;

        info!(product_id = %id, "Product updated");
        self.detail(product).await
    }

    /// Applies a partial update and reprices the variant.
    #[instrument(skip(self, patch))]
    pub async fn update_product_attribute(
        &self,
        id: Uuid,
        patch: AttributePatch,
    ) -> Result<product_attribute::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = product_attribute::Entity::find_by_id(id)
            .filter(product_attribute::Column::IsDeleted.eq(false))
            .one(db)
            .await
            .map_err(db_error("Failed to load product attribute"))?
            .ok_or_else(|| {
                ServiceError::NotFound("This product attribute does not exist".to_string())
            })?;

        let price = pricing::apply_discount(
            patch.retail_price.unwrap_or(existing.retail_price),
            patch.discount_percent.unwrap_or(existing.discount_percent),
        )?;

        let mut active: product_attribute::ActiveModel = existing.into();
        if let Some(size) = patch.size {
            active.size = Set(size);
        }
        if let Some(cost_price) = patch.cost_price {
            active.cost_price = Set(cost_price);
        }
        if let Some(stock_amount) = patch.stock_amount {
            active.stock_amount = Set(stock_amount);
        }
        active.retail_price = Set(price.retail_price);
        active.discount_percent = Set(price.discount_percent);
        active.discount_price = Set(price.discount_price);
        active.discounted_retail_price = Set(price.discounted_retail_price);

        let updated = active
            .update(db)
            .await
            .map_err(db_error("Failed to update product attribute"))?;

        info!(attribute_id = %id, "Product attribute updated");
        Ok(updated)
    }

    /// Swaps an image for a new upload; the old asset is removed best-effort.
    #[instrument(skip(self, file))]
    pub async fn update_product_image(
        &self,
        id: Uuid,
        file: UploadFile,
    ) -> Result<product_image::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = product_image::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(db_error("Failed to load product image"))?
            .ok_or_else(|| ServiceError::NotFound("This product image does not exist".to_string()))?;

        let mut urls = self.upload_all(vec![file]).await?;
        let url = urls
            .pop()
            .ok_or_else(|| ServiceError::BadRequest(UPLOAD_FAILED.to_string()))?;

        let old_url = existing.image.clone();
        let mut active: product_image::ActiveModel = existing.into();
        active.image = Set(url);
        let updated = active
            .update(db)
            .await
            .map_err(db_error("Failed to update product image"))?;

        self.forget_image(&old_url).await;
        info!(image_id = %id, "Product image replaced");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_product_image(&self, id: Uuid) -> Result<product_image::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = product_image::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(db_error("Failed to load product image"))?
            .ok_or_else(|| ServiceError::NotFound("This product image does not exist".to_string()))?;

        product_image::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(db_error("Failed to delete product image"))?;

        self.forget_image(&existing.image).await;
        info!(image_id = %id, "Product image deleted");
        Ok(existing)
    }

    /// Counts a storefront view of an active product with an active owner.
    #[instrument(skip(self))]
    pub async fn increase_product_view_count(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;
        let product = product::Entity::find_by_id(id)
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::IsDeleted.eq(false))
            .one(db)
            .await
            .map_err(db_error("Failed to load product"))?
            .ok_or_else(|| ServiceError::NotFound(PRODUCT_MISSING.to_string()))?;

        let owner_active = user::Entity::find_by_id(product.user_id)
            .filter(user::Column::IsActive.eq(true))
            .filter(user::Column::IsDeleted.eq(false))
            .one(db)
            .await
            .map_err(db_error("Failed to load product owner"))?
            .is_some();
        if !owner_active {
            return Err(ServiceError::NotFound(PRODUCT_MISSING.to_string()));
        }

        self.bump_view_count(db, id).await?;
        Ok(product::Model {
            view_count: product.view_count + 1,
            ..product
        })
    }

    async fn bump_view_count<C: ConnectionTrait>(&self, db: &C, id: Uuid) -> Result<(), ServiceError> {
        product::Entity::update_many()
            .col_expr(
                product::Column::ViewCount,
                Expr::col(product::Column::ViewCount).add(1),
            )
            .filter(product::Column::Id.eq(id))
            .exec(db)
            .await
            .map_err(db_error("Failed to increase view count"))?;
        Ok(())
    }

    /// Toggles whether the product is listed.
    #[instrument(skip(self))]
    pub async fn ban_product(&self, actor: &AuthUser, id: Uuid) -> Result<product::Model, ServiceError> {
        let existing = self.find_product(id).await?;
        let listed = existing.is_active;

        let mut active: product::ActiveModel = existing.into();
        active.is_active = Set(!listed);
        active.updated_by = Set(Some(actor.id));
        let product = active
            .update(&*self.db_pool)
            .await
            .map_err(db_error("Failed to ban product"))?;

        info!(product_id = %id, is_active = product.is_active, "Product listing toggled");
        Ok(product)
    }

    /// Soft-deletes the product and removes its hosted images.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, actor: &AuthUser, id: Uuid) -> Result<product::Model, ServiceError> {
        let existing = self.find_product(id).await?;

        let mut active: product::ActiveModel = existing.into();
        active.is_deleted = Set(true);
        active.deleted_by = Set(Some(actor.id));
        let product = active
            .update(&*self.db_pool)
            .await
            .map_err(db_error("Failed to delete product"))?;

        let images = product_image::Entity::find()
            .filter(product_image::Column::ProductId.eq(id))
            .all(&*self.db_pool)
            .await
            .map_err(db_error("Failed to load product images"))?;
        for image in &images {
            self.forget_image(&image.image).await;
        }

        info!(product_id = %id, images = images.len(), "Product deleted");
        Ok(product)
    }

    fn storefront_query() -> Select<product::Entity> {
        product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::IsDeleted.eq(false))
    }

    #[instrument(skip(self, filter))]
    pub async fn list_products_for_customer(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<Vec<ProductDetail>, ServiceError> {
        let products = filter
            .apply(Self::storefront_query())
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db_pool, page.limit)
            .fetch_page(page.page_index())
            .await
            .map_err(db_error("Failed to list products"))?;

        load_details(&*self.db_pool, products).await
    }

    /// Trending products; the whole set unless a page window is given.
    #[instrument(skip(self))]
    pub async fn list_trending(
        &self,
        page: Option<Pagination>,
    ) -> Result<Vec<ProductDetail>, ServiceError> {
        self.list_flagged(product::Column::IsTrending, page).await
    }

    #[instrument(skip(self))]
    pub async fn list_featured(&self) -> Result<Vec<ProductDetail>, ServiceError> {
        self.list_flagged(product::Column::IsFeatured, None).await
    }

    async fn list_flagged(
        &self,
        flag: product::Column,
        page: Option<Pagination>,
    ) -> Result<Vec<ProductDetail>, ServiceError> {
        let db = &*self.db_pool;
        let query = Self::storefront_query()
            .filter(flag.eq(true))
            .order_by_desc(product::Column::CreatedAt);

        let products = match page {
            Some(page) => query
                .paginate(db, page.limit)
                .fetch_page(page.page_index())
                .await,
            None => query.all(db).await,
        }
        .map_err(db_error("Failed to list products"))?;

        load_details(db, products).await
    }

    /// Storefront product page; each read counts as a view.
    #[instrument(skip(self))]
    pub async fn get_product_for_customer(&self, slug: &str) -> Result<ProductDetail, ServiceError> {
        let db = &*self.db_pool;
        let product = Self::storefront_query()
            .filter(product::Column::Slug.eq(slug))
            .one(db)
            .await
            .map_err(db_error("Failed to load product"))?
            .ok_or_else(|| ServiceError::NotFound("No product is available".to_string()))?;

        self.bump_view_count(db, product.id).await?;
        self.detail(product::Model {
            view_count: product.view_count + 1,
            ..product
        })
        .await
    }

    #[instrument(skip(self, input))]
    pub async fn create_product_attribute(
        &self,
        input: NewAttribute,
    ) -> Result<product_attribute::Model, ServiceError> {
        let missing = [
            (non_empty(input.size.as_deref()).is_none(), "Variant"),
            (input.cost_price.is_none(), "Cost Price"),
            (input.retail_price.is_none(), "Retail Price"),
            (input.stock_amount.is_none(), "Stock Amount"),
        ];
        if let Some((_, label)) = missing.iter().find(|(absent, _)| *absent) {
            return Err(ServiceError::ValidationError(format!("Please fill {label}")));
        }

        let db = &*self.db_pool;
        let product = match input.product_id {
            Some(product_id) => product::Entity::find_by_id(product_id)
                .filter(product::Column::IsActive.eq(true))
                .filter(product::Column::IsDeleted.eq(false))
                .one(db)
                .await
                .map_err(db_error("Failed to load product"))?,
            None => None,
        }
        .ok_or_else(|| ServiceError::Conflict("There is no product.".to_string()))?;

        let price = pricing::apply_discount(
            input.retail_price.unwrap_or(Decimal::ZERO),
            input.discount_percent.unwrap_or(Decimal::ZERO),
        )?;

        let attribute = product_attribute::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            size: Set(input.size.unwrap_or_default().trim().to_string()),
            cost_price: Set(input.cost_price.unwrap_or(Decimal::ZERO)),
            retail_price: Set(price.retail_price),
            discount_percent: Set(price.discount_percent),
            discount_price: Set(price.discount_price),
            discounted_retail_price: Set(price.discounted_retail_price),
            stock_amount: Set(input.stock_amount.unwrap_or(0)),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(db_error("Failed to create product attribute"))?;

        info!(attribute_id = %attribute.id, product_id = %product.id, "Product attribute created");
        Ok(attribute)
    }

    #[instrument(skip(self))]
    pub async fn list_product_attributes(
        &self,
        product_id: Uuid,
        size: Option<&str>,
        page: Pagination,
    ) -> Result<Vec<product_attribute::Model>, ServiceError> {
        let mut query = product_attribute::Entity::find()
            .filter(product_attribute::Column::ProductId.eq(product_id))
            .filter(product_attribute::Column::IsDeleted.eq(false));
        if let Some(size) = non_empty(size) {
            query = query.filter(contains_ci(product_attribute::Column::Size, size));
        }

        query
            .order_by_desc(product_attribute::Column::CreatedAt)
            .paginate(&*self.db_pool, page.limit)
            .fetch_page(page.page_index())
            .await
            .map_err(db_error("Failed to list product attributes"))
    }

    /// Retires a variant; past order lines keep their snapshot.
    #[instrument(skip(self))]
    pub async fn delete_product_attribute(
        &self,
        id: Uuid,
    ) -> Result<product_attribute::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = product_attribute::Entity::find_by_id(id)
            .filter(product_attribute::Column::IsDeleted.eq(false))
            .one(db)
            .await
            .map_err(db_error("Failed to load product attribute"))?
            .ok_or_else(|| {
                ServiceError::NotFound("This product attribute does not exist".to_string())
            })?;

        let mut active: product_attribute::ActiveModel = existing.into();
        active.is_deleted = Set(true);
        let deleted = active
            .update(db)
            .await
            .map_err(db_error("Failed to delete product attribute"))?;

        info!(attribute_id = %id, "Product attribute deleted");
        Ok(deleted)
    }

    #[instrument(skip(self))]
    pub async fn list_product_images(
        &self,
        product_id: Uuid,
        page: Pagination,
    ) -> Result<Vec<product_image::Model>, ServiceError> {
        product_image::Entity::find()
            .filter(product_image::Column::ProductId.eq(product_id))
            .order_by_desc(product_image::Column::CreatedAt)
            .paginate(&*self.db_pool, page.limit)
            .fetch_page(page.page_index())
            .await
            .map_err(db_error("Failed to list product images"))
    }

    #[instrument(skip(self, file))]
    pub async fn create_product_image(
        &self,
        product_id: Option<Uuid>,
        file: Option<UploadFile>,
    ) -> Result<product_image::Model, ServiceError> {
        let product_id = product_id
            .ok_or_else(|| ServiceError::ValidationError("Please fill Product Id".to_string()))?;
        let file = file.ok_or_else(|| ServiceError::ValidationError("Please fill Image".to_string()))?;

        let db = &*self.db_pool;
        let product = self.find_product(product_id).await?;

        let stored = product_image::Entity::find()
            .filter(product_image::Column::ProductId.eq(product.id))
            .count(db)
            .await
            .map_err(db_error("Failed to count product images"))?;
        if stored as usize >= MAX_PRODUCT_IMAGES {
            return Err(ServiceError::BadRequest(
                "You cannot add more than 3 images".to_string(),
            ));
        }

        let mut urls = self.upload_all(vec![file]).await?;
        let url = urls
            .pop()
            .ok_or_else(|| ServiceError::BadRequest(UPLOAD_FAILED.to_string()))?;

        let image = product_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            image: Set(url),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(db_error("Failed to store product image"))?;

        info!(image_id = %image.id, product_id = %product.id, "Product image uploaded");
        Ok(image)
    }
}
