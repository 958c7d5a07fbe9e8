use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{cart_item, CartItem, CartItemModel, Product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
}

/// A cart line joined with its current product.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: i64,
    pub image_path: Option<String>,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub quantity: i32,
    pub line_total: i64,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    /// Total at current catalog prices; orders snapshot their own.
    pub total_amount: i64,
}

/// Per-user cart persistence. All methods take the verified user id
/// explicitly and scope every query by it.
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Add a product to the cart, incrementing the existing line when the
    /// product is already present. Stock is not enforced here; checkout
    /// re-validates against live stock.
    #[instrument(skip(self, input), fields(product_id = %input.product_id))]
    pub async fn add_item(
        &self,
        user_id: &str,
        input: &AddToCartInput,
    ) -> Result<CartItemModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let product = Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let existing = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product.id))
            .one(&txn)
            .await?;

        let line = match existing {
            Some(line) => {
                let quantity = line.quantity.saturating_add(input.quantity);
                let mut active: cart_item::ActiveModel = line.into();
                active.quantity = Set(quantity);
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?
            }
            None => {
                let now = Utc::now();
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id.to_string()),
                    product_id: Set(product.id),
                    quantity: Set(input.quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?
            }
        };

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id: user_id.to_string(),
                product_id: product.id,
                quantity: line.quantity,
            })
            .await;

        Ok(line)
    }

    /// Set the absolute quantity of a line. A quantity below 1 is a silent
    /// no-op returning the line unchanged.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: &str,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartItemModel, ServiceError> {
        let line = CartItem::find_by_id(item_id)
            .filter(cart_item::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {item_id} not found")))?;

        if quantity < 1 {
            return Ok(line);
        }

        let mut active: cart_item::ActiveModel = line.into();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now());
        let updated = active.update(self.db.as_ref()).await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                user_id: user_id.to_string(),
                item_id,
                quantity: updated.quantity,
            })
            .await;

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: &str, item_id: Uuid) -> Result<(), ServiceError> {
        let line = CartItem::find_by_id(item_id)
            .filter(cart_item::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {item_id} not found")))?;

        line.delete(self.db.as_ref()).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                user_id: user_id.to_string(),
                item_id,
            })
            .await;

        Ok(())
    }

    /// The cart newest-first, each line joined with its product. Lines whose
    /// product row has been deleted are skipped.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: &str) -> Result<CartView, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_desc(cart_item::Column::CreatedAt)
            .find_also_related(Product)
            .all(self.db.as_ref())
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        let mut total_amount: i64 = 0;
        for (line, product) in rows {
            let Some(product) = product else { continue };
            let line_total = product.price * i64::from(line.quantity);
            total_amount += line_total;
            items.push(CartLine {
                id: line.id,
                product_id: product.id,
                product_name: product.name,
                price: product.price,
                image_path: product.image_path,
                stock_quantity: product.stock_quantity,
                is_active: product.is_active,
                quantity: line.quantity,
                line_total,
                created_at: line.created_at,
            });
        }

        Ok(CartView {
            items,
            total_amount,
        })
    }

    /// Remove every line for the user. Returns the number of rows deleted.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: &str) -> Result<u64, ServiceError> {
        let result = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await?;

        self.event_sender
            .send_or_log(Event::CartCleared {
                user_id: user_id.to_string(),
            })
            .await;

        Ok(result.rows_affected)
    }
}
