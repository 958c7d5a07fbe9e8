use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response, PaginationParams};
use crate::services::orders::{CreateOrderInput, OrderSummary};
use crate::AppState;

#[derive(Debug, Serialize)]
struct OrderListResponse {
    orders: Vec<OrderSummary>,
    total: u64,
    page: u64,
    per_page: u64,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(input): Json<CreateOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .create_order(&user.user_id, &input)
        .await?;
    Ok(created_response(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.clamped();
    let (orders, total) = state
        .services
        .orders
        .list_orders(&user.user_id, page, per_page)
        .await?;

    Ok(success_response(OrderListResponse {
        orders,
        total,
        page,
        per_page,
    }))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state
        .services
        .orders
        .get_order(&user.user_id, order_id)
        .await?;
    Ok(success_response(details))
}

pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order))
}
