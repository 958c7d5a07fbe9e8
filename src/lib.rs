pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{extract::State, http::StatusCode, middleware, response::IntoResponse, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::auth::{require_auth, AuthService};
use crate::config::AppConfig;
use crate::events::EventSender;
use crate::handlers::{
    cart::cart_routes, orders::orders_routes, payments::payments_routes,
    products::products_routes, AppServices,
};

/// Shared application state handed to every handler.
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub services: AppServices,
    pub auth: Arc<AuthService>,
    pub event_sender: Arc<EventSender>,
}

/// Standard success envelope. Errors render through `ServiceError` /
/// `AuthError` instead.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
        }
    }
}

async fn api_status() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match db::check_connection(&state.db).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "healthy" }))),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy" })),
        ),
    }
}

/// All `/api/v1` routes. The catalog is public; cart, orders and payments
/// sit behind the bearer-token middleware.
pub fn api_v1_routes(auth: Arc<AuthService>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .nest("/cart", cart_routes())
        .nest("/orders", orders_routes())
        .nest("/payments", payments_routes())
        .route_layer(middleware::from_fn_with_state(auth, require_auth));

    Router::new()
        .route("/status", get(api_status))
        .nest("/products", products_routes())
        .merge(protected)
}

/// The application router without transport layers (trace, timeout, CORS);
/// `main` adds those, the test harness drives this directly.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes(state.auth.clone()))
        .with_state(state)
}
