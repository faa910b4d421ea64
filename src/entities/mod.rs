pub mod campaign;
pub mod category;
pub mod contact;
pub mod coupon;
pub mod newsletter;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_attribute;
pub mod product_image;
pub mod user;

pub use order::OrderStatus;
