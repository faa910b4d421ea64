pub mod common;
pub mod contacts;
pub mod dashboard;
pub mod orders;
pub mod payments;
pub mod products;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    errors::ServiceError,
    integrations::{CloudinaryClient, FraudCheckClient, MediaStore, PayStationClient, SslCommerzClient},
    notifications::{mailer_from_config, Mailer, OrderNotifier},
    services::{
        contacts::ContactService, dashboard::DashboardService, orders::OrderService,
        products::ProductService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<ProductService>,
    pub orders: Arc<OrderService>,
    pub contacts: Arc<ContactService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    /// Wires services around the given mail and media backends; gateway
    /// clients are built from configuration.
    pub fn new(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        mailer: Arc<dyn Mailer>,
        media: Arc<dyn MediaStore>,
    ) -> Result<Self, ServiceError> {
        let notifier = OrderNotifier::new(
            mailer,
            config.store_name.clone(),
            config.mail.admin_address.clone(),
        );

        let sslcommerz = Arc::new(SslCommerzClient::new(config.sslcommerz.clone())?);
        let paystation = Arc::new(PayStationClient::new(config.paystation.clone())?);
        let fraud_check = Arc::new(FraudCheckClient::new(config.fraud_check.clone())?);

        let products = Arc::new(ProductService::new(
            db_pool.clone(),
            media,
            notifier.clone(),
            config.cloudinary.folder.clone(),
            config.storefront_base(),
        ));
        let orders = Arc::new(OrderService::new(
            db_pool.clone(),
            notifier,
            sslcommerz,
            paystation,
            fraud_check,
            config.store_name.clone(),
            config.storefront_base(),
        ));
        let contacts = Arc::new(ContactService::new(db_pool.clone()));
        let dashboard = Arc::new(DashboardService::new(db_pool));

        Ok(Self {
            products,
            orders,
            contacts,
            dashboard,
        })
    }

    /// Production wiring: SMTP (or logging) mail and Cloudinary media.
    pub fn from_config(db_pool: Arc<DbPool>, config: &AppConfig) -> Result<Self, ServiceError> {
        let mailer = mailer_from_config(&config.mail)?;
        let media: Arc<dyn MediaStore> = Arc::new(CloudinaryClient::new(config.cloudinary.clone())?);
        Self::new(db_pool, config, mailer, media)
    }
}
