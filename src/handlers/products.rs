use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::ProductModel;
use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::services::catalog::{ProductListQuery, DEFAULT_PAGE_SIZE};
use crate::AppState;

#[derive(Debug, Serialize)]
struct ProductListResponse {
    items: Vec<ProductModel>,
    total: u64,
    page: u64,
    per_page: u64,
    total_pages: u64,
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);
    let (items, total) = state.services.catalog.list_products(&query).await?;

    Ok(success_response(ProductListResponse {
        items,
        total,
        page,
        per_page,
        total_pages: total.div_ceil(per_page),
    }))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.get_product(product_id).await?;
    Ok(success_response(product))
}

pub fn products_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
}
