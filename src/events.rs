use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::entities::{OrderStatus, PaymentStatus};

/// Domain events emitted by the services after successful writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CartItemAdded {
        user_id: String,
        product_id: Uuid,
        quantity: i32,
    },
    CartItemUpdated {
        user_id: String,
        item_id: Uuid,
        quantity: i32,
    },
    CartItemRemoved {
        user_id: String,
        item_id: Uuid,
    },
    CartCleared {
        user_id: String,
    },
    OrderCreated {
        order_id: Uuid,
        user_id: String,
        total_amount: i64,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    PaymentCaptured {
        order_id: Uuid,
        payment_id: String,
    },
    PaymentFailed {
        order_id: Uuid,
        payment_status: PaymentStatus,
    },
}

/// Thin wrapper around the event channel handed to every service.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), mpsc::error::SendError<Event>> {
        self.sender.send(event).await
    }

    /// Events are advisory; a full or closed channel must never fail the
    /// request that produced the event.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(err) = self.sender.send(event).await {
            error!(error = %err, "failed to publish event");
        }
    }
}

/// Drain the event channel, logging each event. Runs as a background task
/// for the lifetime of the process.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("event processor started");
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                user_id,
                total_amount,
            } => {
                info!(%order_id, %user_id, total_amount, "order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    %order_id,
                    from = old_status.as_str(),
                    to = new_status.as_str(),
                    "order status changed"
                );
            }
            Event::PaymentCaptured {
                order_id,
                payment_id,
            } => {
                info!(%order_id, %payment_id, "payment captured");
            }
            Event::PaymentFailed { order_id, .. } => {
                info!(%order_id, "payment attempt failed");
            }
            other => debug!(event = ?other, "event"),
        }
    }
    info!("event processor stopped");
}
