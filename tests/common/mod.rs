use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use despensa_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::ProductModel,
    events::{self, EventSender},
    handlers::AppServices,
    services::products::CreateProductInput,
    AppState,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::util::ServiceExt;

/// Helper harness for spinning up an application state backed by an
/// in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_config = DbConfig {
            url: "sqlite::memory:".to_string(),
            // A single connection keeps the in-memory database alive and
            // shared for the whole test.
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(5),
        };

        let pool = db::establish_connection_with_config(&db_config)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let cfg = Arc::new(AppConfig::default());
        let services = AppServices::new(db_arc.clone(), event_sender.clone(), cfg.clone());

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", despensa_api::api_v1_routes())
            .with_state(Arc::new(state.clone()));

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Send a JSON request against the router.
    #[allow(dead_code)]
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Seed an active catalog product without inventory tracking.
    #[allow(dead_code)]
    pub async fn seed_product(&self, name: &str, price: Decimal) -> ProductModel {
        self.state
            .services
            .products
            .create_product(CreateProductInput {
                name: name.to_string(),
                brand: None,
                unit_label: None,
                price,
                is_active: Some(true),
                track_inventory: None,
                inventory_quantity: None,
            })
            .await
            .expect("seed product for tests")
    }

    /// Seed a product with tracked inventory.
    #[allow(dead_code)]
    pub async fn seed_tracked_product(
        &self,
        name: &str,
        price: Decimal,
        stock: i32,
    ) -> ProductModel {
        self.state
            .services
            .products
            .create_product(CreateProductInput {
                name: name.to_string(),
                brand: None,
                unit_label: None,
                price,
                is_active: Some(true),
                track_inventory: Some(true),
                inventory_quantity: Some(stock),
            })
            .await
            .expect("seed tracked product for tests")
    }

    /// Seed an inactive product.
    #[allow(dead_code)]
    pub async fn seed_inactive_product(&self, name: &str, price: Decimal) -> ProductModel {
        self.state
            .services
            .products
            .create_product(CreateProductInput {
                name: name.to_string(),
                brand: None,
                unit_label: None,
                price,
                is_active: Some(false),
                track_inventory: None,
                inventory_quantity: None,
            })
            .await
            .expect("seed inactive product for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
