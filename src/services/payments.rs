use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::{order, Order, OrderModel, OrderStatus, PaymentStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Approved,
    Declined,
}

#[derive(Debug, Clone)]
pub struct ChargeReceipt {
    pub outcome: PaymentOutcome,
    pub payment_id: Option<String>,
}

/// The seam a real payment gateway would implement.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn charge(&self, order_id: Uuid, amount: i64) -> Result<ChargeReceipt, ServiceError>;
}

/// Simulated gateway: waits a configured delay, then approves with a
/// configured probability. Rates of 1.0 and 0.0 make the outcome
/// deterministic.
pub struct SimulatedGateway {
    delay: Duration,
    success_rate: f64,
}

impl SimulatedGateway {
    pub fn new(delay: Duration, success_rate: f64) -> Self {
        Self {
            delay,
            success_rate,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Duration::from_millis(config.payment_delay_ms),
            config.payment_success_rate,
        )
    }
}

#[async_trait]
impl PaymentProcessor for SimulatedGateway {
    async fn charge(&self, order_id: Uuid, amount: i64) -> Result<ChargeReceipt, ServiceError> {
        tokio::time::sleep(self.delay).await;

        let approved = rand::thread_rng().gen_bool(self.success_rate);
        info!(%order_id, amount, approved, "simulated charge");

        if approved {
            Ok(ChargeReceipt {
                outcome: PaymentOutcome::Approved,
                payment_id: Some(format!("pay_{}", Uuid::new_v4().simple())),
            })
        } else {
            Ok(ChargeReceipt {
                outcome: PaymentOutcome::Declined,
                payment_id: None,
            })
        }
    }
}

/// Drives an order's payment through the gateway and the status transition
/// tables. A declined charge leaves the order pending so the caller can
/// retry; there is no idempotency guard beyond the completed short-circuit.
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    processor: Arc<dyn PaymentProcessor>,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        processor: Arc<dyn PaymentProcessor>,
    ) -> Self {
        Self {
            db,
            event_sender,
            processor,
        }
    }

    #[instrument(skip(self))]
    pub async fn process_payment(
        &self,
        user_id: &str,
        order_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        let order = Order::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        // an already-paid order is never re-charged
        if order.payment_status == PaymentStatus::Completed {
            return Ok(order);
        }

        let receipt = self.processor.charge(order.id, order.total_amount).await?;

        match receipt.outcome {
            PaymentOutcome::Approved => self.capture(order, receipt).await,
            PaymentOutcome::Declined => self.decline(order).await,
        }
    }

    async fn capture(
        &self,
        order: OrderModel,
        receipt: ChargeReceipt,
    ) -> Result<OrderModel, ServiceError> {
        if !order
            .payment_status
            .can_transition_to(PaymentStatus::Completed)
        {
            return Err(ServiceError::InvalidStatusTransition {
                from: order.payment_status.as_str().to_string(),
                to: PaymentStatus::Completed.as_str().to_string(),
            });
        }
        if !order.status.can_transition_to(OrderStatus::Confirmed) {
            return Err(ServiceError::InvalidStatusTransition {
                from: order.status.as_str().to_string(),
                to: OrderStatus::Confirmed.as_str().to_string(),
            });
        }

        let payment_id = receipt.payment_id.ok_or_else(|| {
            ServiceError::InternalError("gateway approved a charge without a payment id".into())
        })?;

        let order_id = order.id;
        let old_status = order.status;
        let mut active: order::ActiveModel = order.into();
        active.payment_id = Set(Some(payment_id.clone()));
        active.payment_method = Set(Some("card".to_string()));
        active.payment_status = Set(PaymentStatus::Completed);
        active.status = Set(OrderStatus::Confirmed);
        active.updated_at = Set(Utc::now());
        let updated = active.update(self.db.as_ref()).await?;

        self.event_sender
            .send_or_log(Event::PaymentCaptured {
                order_id,
                payment_id,
            })
            .await;
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status: OrderStatus::Confirmed,
            })
            .await;

        Ok(updated)
    }

    async fn decline(&self, order: OrderModel) -> Result<OrderModel, ServiceError> {
        if !order
            .payment_status
            .can_transition_to(PaymentStatus::Failed)
        {
            return Err(ServiceError::InvalidStatusTransition {
                from: order.payment_status.as_str().to_string(),
                to: PaymentStatus::Failed.as_str().to_string(),
            });
        }

        let order_id = order.id;
        let mut active: order::ActiveModel = order.into();
        active.payment_status = Set(PaymentStatus::Failed);
        active.updated_at = Set(Utc::now());
        let updated = active.update(self.db.as_ref()).await?;

        self.event_sender
            .send_or_log(Event::PaymentFailed {
                order_id,
                payment_status: PaymentStatus::Failed,
            })
            .await;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_success_rate_always_approves() {
        let gateway = SimulatedGateway::new(Duration::ZERO, 1.0);
        for _ in 0..16 {
            let receipt = gateway.charge(Uuid::new_v4(), 7000).await.unwrap();
            assert_eq!(receipt.outcome, PaymentOutcome::Approved);
            let payment_id = receipt.payment_id.unwrap();
            assert!(payment_id.starts_with("pay_"));
        }
    }

    #[tokio::test]
    async fn zero_success_rate_always_declines() {
        let gateway = SimulatedGateway::new(Duration::ZERO, 0.0);
        for _ in 0..16 {
            let receipt = gateway.charge(Uuid::new_v4(), 7000).await.unwrap();
            assert_eq!(receipt.outcome, PaymentOutcome::Declined);
            assert!(receipt.payment_id.is_none());
        }
    }

    #[tokio::test]
    async fn payment_ids_are_unique_per_charge() {
        let gateway = SimulatedGateway::new(Duration::ZERO, 1.0);
        let a = gateway.charge(Uuid::new_v4(), 100).await.unwrap();
        let b = gateway.charge(Uuid::new_v4(), 100).await.unwrap();
        assert_ne!(a.payment_id, b.payment_id);
    }
}
