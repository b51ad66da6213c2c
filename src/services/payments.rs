use crate::{
    entities::commerce::{order, order::OrderStatus, payment, payment::PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::pricing::{calculate_refund_amount, round_money},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RefundRequest {
    /// Omitted refunds the remaining balance
    pub amount: Option<Decimal>,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FailPaymentRequest {
    #[validate(length(max = 500))]
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct RefundOutcome {
    pub payment: payment::Model,
    pub refunded: Decimal,
    pub order_refunded: bool,
}

/// Payment failure and refunds. Payments are simulated, there is no gateway.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl PaymentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    pub async fn get_payment(&self, id: Uuid) -> Result<payment::Model, ServiceError> {
        payment::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payment", id))
    }

    /// Marks the payment and its order's payment status as failed.
    ///
    /// A failed payment is final. An order that was processing goes back to
    /// pending so that [`OrderService::process_payment`] can open a new one.
    ///
    /// [`OrderService::process_payment`]: crate::services::orders::OrderService::process_payment
    ///
    /// # Errors
    ///
    /// * [`ServiceError::NotFound`] - unknown payment
    /// * [`ServiceError::InvalidStatus`] - the payment is not pending or processing
    #[instrument(skip(self, request))]
    pub async fn fail_payment(
        &self,
        payment_id: Uuid,
        request: FailPaymentRequest,
    ) -> Result<payment::Model, ServiceError> {
        request.validate()?;
        let txn = self.db.begin().await?;
        let payment = payment::Entity::find_by_id(payment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payment", payment_id))?;
        if !matches!(
            payment.status,
            PaymentStatus::Pending | PaymentStatus::Processing
        ) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot fail a payment that is {}",
                payment.status
            )));
        }
        let order = payment
            .find_related(order::Entity)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", payment.order_id))?;

        let now = Utc::now();
        let mut model: payment::ActiveModel = payment.into();
        model.status = Set(PaymentStatus::Failed);
        model.gateway_error = Set(Some(request.error).filter(|e| !e.is_empty()));
        model.updated_at = Set(now);
        let payment = model.update(&txn).await?;

        let reopen = order.status == OrderStatus::Processing;
        let mut order_model: order::ActiveModel = order.into();
        order_model.payment_status = Set(PaymentStatus::Failed);
        // Back to pending so the buyer can retry with a new payment
        if reopen {
            order_model.status = Set(OrderStatus::Pending);
        }
        order_model.updated_at = Set(now);
        order_model.update(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PaymentFailed(payment.id))
            .await;
        warn!(payment_id = %payment.id, order_id = %payment.order_id, "Payment failed");
        Ok(payment)
    }

    /// Refunds part or all of a completed payment.
    ///
    /// The payment becomes `refunded` only once fully refunded. The order
    /// becomes refunded when refunds across its payments reach the total of
    /// its completed payments.
    ///
    /// # Arguments
    ///
    /// * `payment_id` - the completed payment to refund
    /// * `request` - amount and reason
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidStatus`] for payments that never completed,
    /// [`ServiceError::ValidationError`] when the amount exceeds what is left to refund,
    /// and [`ServiceError::InvalidOperation`] once nothing is left.
    #[instrument(skip(self, request))]
    pub async fn process_refund(
        &self,
        payment_id: Uuid,
        request: RefundRequest,
    ) -> Result<RefundOutcome, ServiceError> {
        request.validate()?;
        let txn = self.db.begin().await?;
        let payment = payment::Entity::find_by_id(payment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payment", payment_id))?;
        if !matches!(
            payment.status,
            PaymentStatus::Completed | PaymentStatus::Refunded
        ) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot refund a payment that is {}",
                payment.status
            )));
        }

        let refund = round_money(calculate_refund_amount(
            payment.amount,
            payment.refunded_amount,
            request.amount,
        )?);
        let refunded_amount = payment.refunded_amount + refund;
        let fully_refunded = refunded_amount >= payment.amount;

        let now = Utc::now();
        let order_id = payment.order_id;
        let mut model: payment::ActiveModel = payment.into();
        model.refunded_amount = Set(refunded_amount);
        model.refunded_at = Set(Some(now));
        model.refund_reason = Set(Some(request.reason).filter(|r| !r.is_empty()));
        if fully_refunded {
            model.status = Set(PaymentStatus::Refunded);
        }
        model.updated_at = Set(now);
        let payment = model.update(&txn).await?;

        let payments = payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;
        let total_refunded: Decimal = payments.iter().map(|p| p.refunded_amount).sum();
        let total_paid: Decimal = payments
            .iter()
            .filter(|p| matches!(p.status, PaymentStatus::Completed | PaymentStatus::Refunded))
            .map(|p| p.amount)
            .sum();

        let order_refunded = total_paid > Decimal::ZERO && total_refunded >= total_paid;
        if order_refunded {
            let order = order::Entity::find_by_id(order_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::not_found("Order", order_id))?;
            let mut order_model: order::ActiveModel = order.into();
            order_model.status = Set(OrderStatus::Refunded);
            order_model.payment_status = Set(PaymentStatus::Refunded);
            order_model.updated_at = Set(now);
            order_model.update(&txn).await?;
        }
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PaymentRefunded {
                payment_id: payment.id,
                amount: refund,
                fully_refunded,
            })
            .await;
        info!(payment_id = %payment.id, amount = %refund, fully_refunded, order_refunded, "Refund processed");
        Ok(RefundOutcome {
            payment,
            refunded: refund,
            order_refunded,
        })
    }
}
