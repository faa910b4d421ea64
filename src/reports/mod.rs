pub mod delivery_pdf;

pub use delivery_pdf::{render_delivery_pdf, DeliveryLine};
