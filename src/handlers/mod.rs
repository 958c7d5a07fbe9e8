pub mod cart;
pub mod common;
pub mod orders;
pub mod payments;
pub mod products;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::payments::SimulatedGateway;
use crate::services::{CartService, CatalogService, OrderService, PaymentService};

/// All domain services, constructed once at startup and shared through
/// `AppState`.
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Self {
        let gateway = Arc::new(SimulatedGateway::from_config(config));
        AppServices {
            catalog: Arc::new(CatalogService::new(db.clone())),
            cart: Arc::new(CartService::new(db.clone(), event_sender.clone())),
            orders: Arc::new(OrderService::new(db.clone(), event_sender.clone())),
            payments: Arc::new(PaymentService::new(db, event_sender, gateway)),
        }
    }
}
