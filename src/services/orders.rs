use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::entities::{
    cart_item, order, order_item, CartItem, CartItemModel, Order, OrderItem, OrderItemModel,
    OrderModel, OrderStatus, PaymentStatus, Product, ProductModel,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Destination for an order. Every field is required; the values are stored
/// verbatim on the order as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub detail: String,
    pub zip_code: String,
}

impl ShippingAddress {
    pub fn validate_complete(&self) -> Result<(), ServiceError> {
        for (value, field) in [
            (&self.name, "name"),
            (&self.phone, "phone"),
            (&self.address, "address"),
            (&self.detail, "detail"),
            (&self.zip_code, "zip_code"),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::ValidationError(format!(
                    "shipping {field} is required"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    pub shipping_address: ShippingAddress,
    pub order_note: Option<String>,
}

/// One row of the order history listing.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub item_count: u64,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

fn order_total(lines: &[(CartItemModel, ProductModel)]) -> i64 {
    lines
        .iter()
        .map(|(line, product)| product.price * i64::from(line.quantity))
        .sum()
}

/// Checkout and order history. Orders are created pending/pending and only
/// the payment flow moves them, through the status transition tables.
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create an order from the user's cart.
    ///
    /// The order and its item snapshots are written in one transaction. The
    /// cart clear afterwards is best-effort: a failure there is logged and
    /// the order stands, leaving stale cart lines rather than losing a sale.
    #[instrument(skip(self, input))]
    pub async fn create_order(
        &self,
        user_id: &str,
        input: &CreateOrderInput,
    ) -> Result<OrderModel, ServiceError> {
        input.shipping_address.validate_complete()?;

        let rows = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .find_also_related(Product)
            .all(self.db.as_ref())
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for (line, product) in rows {
            let product = product.ok_or_else(|| {
                ServiceError::InternalError(format!("product missing for cart line {}", line.id))
            })?;
            lines.push((line, product));
        }

        if lines.is_empty() {
            return Err(ServiceError::InvalidOperation("Cart is empty".into()));
        }

        for (line, product) in &lines {
            if !product.is_active {
                return Err(ServiceError::InvalidOperation(format!(
                    "Product '{}' is no longer available",
                    product.name
                )));
            }
            if line.quantity > product.stock_quantity {
                return Err(ServiceError::InvalidOperation(format!(
                    "Insufficient stock for '{}'",
                    product.name
                )));
            }
        }

        let total_amount = order_total(&lines);
        let shipping_address = serde_json::to_value(&input.shipping_address)
            .map_err(|err| ServiceError::InternalError(err.to_string()))?;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = self.db.begin().await?;

        let created = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id.to_string()),
            total_amount: Set(total_amount),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            payment_id: Set(None),
            payment_method: Set(None),
            shipping_address: Set(shipping_address),
            order_note: Set(input.order_note.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for (line, product) in &lines {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                product_name: Set(product.name.clone()),
                price: Set(product.price),
                quantity: Set(line.quantity),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        if let Err(err) = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
        {
            warn!(%order_id, error = %err, "cart clear after checkout failed");
        }

        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id,
                user_id: user_id.to_string(),
                total_amount,
            })
            .await;

        Ok(created)
    }

    /// The caller's orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        user_id: &str,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderSummary>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(self.db.as_ref(), per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .all(self.db.as_ref())
            .await?;

        let summaries = orders
            .into_iter()
            .map(|o| {
                let item_count = items.iter().filter(|i| i.order_id == o.id).count() as u64;
                OrderSummary {
                    id: o.id,
                    total_amount: o.total_amount,
                    status: o.status,
                    payment_status: o.payment_status,
                    item_count,
                    created_at: o.created_at,
                }
            })
            .collect();

        Ok((summaries, total))
    }

    /// One order with its snapshot items. Scoped by user id, so another
    /// user's order id is indistinguishable from a missing one.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        user_id: &str,
        order_id: Uuid,
    ) -> Result<OrderDetails, ServiceError> {
        let order = Order::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        let items = order.find_related(OrderItem).all(self.db.as_ref()).await?;

        Ok(OrderDetails { order, items })
    }
}
