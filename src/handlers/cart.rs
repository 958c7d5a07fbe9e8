use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, no_content_response, success_response, validate_input,
};
use crate::services::cart::AddToCartInput;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct UpdateQuantityInput {
    quantity: i32,
}

async fn get_cart(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.cart.get_cart(&user.user_id).await?;
    Ok(success_response(cart))
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(input): Json<AddToCartInput>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&input)?;
    let line = state.services.cart.add_item(&user.user_id, &input).await?;
    Ok(created_response(line))
}

// quantities below 1 are accepted and ignored; the line is returned as-is
async fn update_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<UpdateQuantityInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let line = state
        .services
        .cart
        .update_quantity(&user.user_id, item_id, input.quantity)
        .await?;
    Ok(success_response(line))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .cart
        .remove_item(&user.user_id, item_id)
        .await?;
    Ok(no_content_response())
}

pub fn cart_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/items", post(add_item))
        .route("/items/:id", put(update_item).delete(remove_item))
}
