pub mod carts;
pub mod checkout;
pub mod common;
pub mod orders;
pub mod products;

use crate::config::AppConfig;
use crate::events::EventSender;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

pub use carts::carts_routes;
pub use checkout::checkout_routes;
pub use orders::orders_routes;
pub use products::products_routes;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<crate::services::products::ProductService>,
    pub carts: Arc<crate::services::carts::CartService>,
    pub checkout: Arc<crate::services::checkout::CheckoutService>,
    pub orders: Arc<crate::services::orders::OrderService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        let products = Arc::new(crate::services::products::ProductService::new(db.clone()));
        let carts = Arc::new(crate::services::carts::CartService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let checkout = Arc::new(crate::services::checkout::CheckoutService::new(
            db.clone(),
            event_sender,
            config,
            carts.clone(),
        ));
        let orders = Arc::new(crate::services::orders::OrderService::new(db));

        Self {
            products,
            carts,
            checkout,
            orders,
        }
    }
}
