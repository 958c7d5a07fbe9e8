use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{product, Product, ProductModel};
use crate::errors::ServiceError;

pub const DEFAULT_PAGE_SIZE: u64 = 12;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Sort orders accepted by the product listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Latest,
    PriceAsc,
    PriceDesc,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Read-only catalog access. Listing shows active products only; a product
/// detail stays reachable after deactivation so existing carts and orders
/// keep rendering.
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: &ProductListQuery,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let mut select = Product::find().filter(product::Column::IsActive.eq(true));
        if let Some(category) = &query.category {
            select = select.filter(product::Column::Category.eq(category.clone()));
        }

        // created_at breaks ties on the price sorts so pages stay stable
        let select = match query.sort {
            ProductSort::Latest => select.order_by_desc(product::Column::CreatedAt),
            ProductSort::PriceAsc => select
                .order_by_asc(product::Column::Price)
                .order_by_desc(product::Column::CreatedAt),
            ProductSort::PriceDesc => select
                .order_by_desc(product::Column::Price)
                .order_by_desc(product::Column::CreatedAt),
        };

        let paginator = select.paginate(self.db.as_ref(), per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))
    }
}
