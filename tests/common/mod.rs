//! Shared test harness driving the real router over an in-memory SQLite
//! database.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::auth::AuthService;
use storefront_api::config::AppConfig;
use storefront_api::db;
use storefront_api::entities::product;
use storefront_api::events::{process_events, EventSender};
use storefront_api::handlers::AppServices;
use storefront_api::{app_router, AppState};

pub struct TestApp {
    pub router: Router,
    pub db: Arc<DatabaseConnection>,
    pub auth: Arc<AuthService>,
}

impl TestApp {
    /// Harness with a deterministic, instant payment gateway that always
    /// approves. Tests exercising declines build their own config.
    pub async fn new() -> Self {
        Self::with_config(AppConfig {
            payment_delay_ms: 0,
            payment_success_rate: 1.0,
            ..AppConfig::default()
        })
        .await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        // a single pooled connection keeps the in-memory database alive
        // and shared across the whole test
        let config = AppConfig {
            database_url: "sqlite::memory:".into(),
            db_max_connections: 1,
            db_min_connections: 1,
            db_idle_timeout_secs: 3600,
            ..config
        };

        let db = Arc::new(
            db::establish_connection(&config)
                .await
                .expect("failed to open test database"),
        );
        db::run_migrations(&db).await.expect("migrations failed");

        let (event_tx, event_rx) = mpsc::channel(64);
        tokio::spawn(process_events(event_rx));
        let event_sender = Arc::new(EventSender::new(event_tx));

        let auth = Arc::new(AuthService::new(&config));
        let services = AppServices::new(db.clone(), event_sender.clone(), &config);

        let state = Arc::new(AppState {
            db: db.clone(),
            config: Arc::new(config),
            services,
            auth: auth.clone(),
            event_sender,
        });

        TestApp {
            router: app_router(state),
            db,
            auth,
        }
    }

    pub fn token_for(&self, user_id: &str) -> String {
        self.auth
            .create_token(user_id, "Test User", "test@example.com", Duration::hours(1))
            .expect("failed to mint test token")
    }

    pub async fn seed_product(&self, name: &str, price: i64, stock: i32) -> Uuid {
        self.seed_product_with(name, price, stock, None, true).await
    }

    pub async fn seed_product_with(
        &self,
        name: &str,
        price: i64,
        stock: i32,
        category: Option<&str>,
        is_active: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        product::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            description: Set(None),
            price: Set(price),
            category: Set(category.map(str::to_string)),
            stock_quantity: Set(stock),
            is_active: Set(is_active),
            image_path: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await
        .expect("failed to seed product");
        id
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("failed to build request"),
            None => builder.body(Body::empty()).expect("failed to build request"),
        };
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed")
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(
        &self,
        path: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Response {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: serde_json::Value) -> Response {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Response {
        self.request(Method::DELETE, path, token, None).await
    }
}

pub async fn response_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body was not valid JSON")
    }
}

/// A complete shipping address as the checkout endpoint expects it.
pub fn shipping_address() -> serde_json::Value {
    serde_json::json!({
        "name": "Dana Lee",
        "phone": "010-1234-5678",
        "address": "1 Main Street",
        "detail": "Apt 3",
        "zip_code": "04524"
    })
}
