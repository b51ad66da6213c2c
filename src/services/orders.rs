use crate::{
    config::AppConfig,
    entities::commerce::{
        factory_purchase, order, order::OrderStatus, order_item, payment, payment::PaymentStatus,
    },
    entities::{factory, user},
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{deliver, templates, Mailer},
    services::{
        cart::{clear_cart, load_cart},
        factories::factory_details,
        page_bounds,
        pricing::{
            generate_order_number, generate_transaction_id, line_total, validate_payment_amount,
            OrderTotals,
        },
        purchases::{has_purchased, mark_emailed, record_history, HistoryEntry},
        Actor,
    },
    PaginatedResponse,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr,
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const ORDER_PAGE_SIZE: u64 = 10;

/// Methods accepted at checkout.
pub const PAYMENT_METHODS: [&str; 6] = [
    "credit_card",
    "debit_card",
    "upi",
    "net_banking",
    "wallet",
    "cod",
];

pub fn validate_payment_method(method: &str) -> Result<(), ValidationError> {
    if PAYMENT_METHODS.contains(&method) {
        Ok(())
    } else {
        let mut err = ValidationError::new("payment_method");
        err.message = Some(format!("Unsupported payment method '{}'", method).into());
        Err(err)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(custom = "validate_payment_method")]
    pub payment_method: String,
    #[validate(length(max = 200))]
    pub customer_name: Option<String>,
    #[validate(email)]
    pub customer_email: Option<String>,
    #[validate(length(max = 20))]
    pub customer_phone: Option<String>,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub notes: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BulkOrderAction {
    MarkCompleted,
    MarkCancelled,
    MarkRefunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkOrderRequest {
    pub order_ids: Vec<Uuid>,
    pub action: BulkOrderAction,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct BulkOrderResult {
    pub updated: Vec<Uuid>,
    /// Orders whose current status does not allow the action
    pub skipped: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    pub payments: Vec<payment::Model>,
}

/// Outcome of completing an order's payment.
#[derive(Debug, Serialize)]
pub struct CompletionReport {
    pub order: OrderDetail,
    pub purchases_created: usize,
    pub confirmation_sent: bool,
    pub details_sent: bool,
}

/// A cart line priced for an order.
#[derive(Debug, Clone)]
struct PricedLine {
    factory: factory::Model,
    quantity: i32,
    total: Decimal,
}

/// Rejects carts with unavailable factories or out-of-range quantities.
pub fn validate_order_items(
    lines: &[(i32, &factory::Model)],
    max_quantity: i32,
) -> Result<(), ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::InvalidOperation("Cart is empty".to_string()));
    }
    for (quantity, factory) in lines {
        if !factory.is_purchasable() {
            return Err(ServiceError::ValidationError(format!(
                "Factory '{}' is no longer available",
                factory.name
            )));
        }
        if !(1..=max_quantity).contains(quantity) {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for '{}' must be between 1 and {}",
                factory.name, max_quantity
            )));
        }
    }
    Ok(())
}

/// Checkout and the order/payment lifecycle.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
    mailer: Arc<dyn Mailer>,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
            mailer,
        }
    }

    /// Turns the user's cart into a pending order with snapshot prices.
    ///
    /// # Arguments
    ///
    /// * `user_id` - the buyer whose cart is checked out
    /// * `request` - payment method and optional customer details overriding the profile
    ///
    /// # Errors
    ///
    /// * [`ServiceError::ValidationError`] - unknown payment method or an over-limit line
    /// * [`ServiceError::InvalidOperation`] - the cart is empty
    /// * [`ServiceError::NotFound`] - the buyer account no longer exists
    #[instrument(skip(self, request))]
    pub async fn checkout(
        &self,
        user_id: Uuid,
        request: CheckoutRequest,
    ) -> Result<OrderDetail, ServiceError> {
        request.validate()?;
        let txn = self.db.begin().await?;
        let account = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;

        let cart = load_cart(&txn, user_id).await?;
        let check: Vec<(i32, &factory::Model)> =
            cart.iter().map(|(item, f)| (item.quantity, f)).collect();
        validate_order_items(&check, self.config.max_cart_quantity)?;

        let lines: Vec<PricedLine> = cart
            .into_iter()
            .map(|(item, factory)| PricedLine {
                total: line_total(factory.price, item.quantity),
                quantity: item.quantity,
                factory,
            })
            .collect();
        let totals = OrderTotals::compute(
            lines.iter().map(|l| l.total),
            self.config.tax_rate,
            self.config.service_fee,
        );

        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(generate_order_number(now)),
            user_id: Set(user_id),
            customer_name: Set(request
                .customer_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| account.display_name())),
            customer_email: Set(request.customer_email.unwrap_or_else(|| account.email.clone())),
            customer_phone: Set(request
                .customer_phone
                .unwrap_or_else(|| account.phone_number.clone())),
            subtotal: Set(totals.subtotal),
            tax_amount: Set(totals.tax_amount),
            service_fee: Set(totals.service_fee),
            total_amount: Set(totals.total_amount),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            payment_method: Set(request.payment_method),
            notes: Set(request.notes),
            tracking_number: Set(None),
            migrated_from_purchase: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            completed_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                factory_id: Set(Some(line.factory.id)),
                factory_name: Set(line.factory.name.clone()),
                quantity: Set(line.quantity),
                price_at_purchase: Set(line.factory.price),
                total_price: Set(line.total),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id: order.id,
                order_number: order.order_number.clone(),
                total: order.total_amount,
            })
            .await;
        info!(order_id = %order.id, order_number = %order.order_number, total = %order.total_amount, "Order created");
        Ok(OrderDetail {
            order,
            items,
            payments: Vec::new(),
        })
    }

    async fn find_for(&self, actor: Actor, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;
        if !actor.can_manage(Some(order.user_id)) {
            // Other users' orders are reported as missing
            return Err(ServiceError::not_found("Order", order_id));
        }
        Ok(order)
    }

    async fn detail<C: ConnectionTrait>(
        db: &C,
        order: order::Model,
    ) -> Result<OrderDetail, ServiceError> {
        let items = order
            .find_related(order_item::Entity)
            .order_by_asc(order_item::Column::CreatedAt)
            .all(db)
            .await?;
        let payments = order
            .find_related(payment::Entity)
            .order_by_asc(payment::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(OrderDetail {
            order,
            items,
            payments,
        })
    }

    pub async fn get_order(&self, actor: Actor, order_id: Uuid) -> Result<OrderDetail, ServiceError> {
        let order = self.find_for(actor, order_id).await?;
        Self::detail(&*self.db, order).await
    }

    /// The user's orders, newest first.
    pub async fn list_orders(
        &self,
        user_id: Uuid,
        page: u64,
    ) -> Result<PaginatedResponse<order::Model>, ServiceError> {
        let (index, per_page) = page_bounds(page, ORDER_PAGE_SIZE);
        let paginator = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(index).await?;
        Ok(PaginatedResponse::new(items, total, index + 1, per_page))
    }

    /// Every order, newest first, optionally by status.
    pub async fn list_all_orders(
        &self,
        status: Option<OrderStatus>,
        page: u64,
    ) -> Result<PaginatedResponse<order::Model>, ServiceError> {
        let (index, per_page) = page_bounds(page, ORDER_PAGE_SIZE);
        let mut query = order::Entity::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(index).await?;
        Ok(PaginatedResponse::new(items, total, index + 1, per_page))
    }

    /// Opens a processing payment for the full order total.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidStatus`] unless the order is pending.
    #[instrument(skip(self))]
    pub async fn process_payment(
        &self,
        actor: Actor,
        order_id: Uuid,
    ) -> Result<payment::Model, ServiceError> {
        let order = self.find_for(actor, order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot pay for an order that is {}",
                order.status
            )));
        }
        let amount = validate_payment_amount(order.total_amount)?;

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let payment = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            payment_method: Set(order.payment_method.clone()),
            amount: Set(amount),
            currency: Set(self.config.currency.clone()),
            status: Set(PaymentStatus::Processing),
            transaction_id: Set(generate_transaction_id(now)),
            gateway_response: Set(None),
            gateway_error: Set(None),
            refunded_amount: Set(Decimal::ZERO),
            refund_reason: Set(None),
            refunded_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            completed_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut model: order::ActiveModel = order.into();
        model.status = Set(OrderStatus::Processing);
        model.payment_status = Set(PaymentStatus::Processing);
        model.updated_at = Set(now);
        model.update(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PaymentProcessing(payment.id))
            .await;
        info!(order_id = %order_id, payment_id = %payment.id, "Payment processing");
        Ok(payment)
    }

    /// Completes payment and order, clears the cart, records purchases and
    /// sends the confirmation and factory-details emails.
    ///
    /// The newest open (pending or processing) payment is completed. When the
    /// order has none, a new payment for the full total is opened first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the order is not visible to `actor` and
    /// `InvalidStatus` when the order is no longer pending or processing.
    /// Email failures are reported in the [`CompletionReport`], not as errors.
    #[instrument(skip(self))]
    pub async fn complete_payment(
        &self,
        actor: Actor,
        order_id: Uuid,
    ) -> Result<CompletionReport, ServiceError> {
        let order = self.find_for(actor, order_id).await?;
        if !order.status.is_cancellable() {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot complete an order that is {}",
                order.status
            )));
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();
        // Failed and refunded payments stay as they are
        let existing = order
            .find_related(payment::Entity)
            .filter(
                payment::Column::Status
                    .is_in([PaymentStatus::Pending, PaymentStatus::Processing]),
            )
            .order_by_desc(payment::Column::CreatedAt)
            .one(&txn)
            .await?;
        let payment = match existing {
            Some(payment) => payment,
            None => {
                payment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order.id),
                    payment_method: Set(order.payment_method.clone()),
                    amount: Set(validate_payment_amount(order.total_amount)?),
                    currency: Set(self.config.currency.clone()),
                    status: Set(PaymentStatus::Pending),
                    transaction_id: Set(generate_transaction_id(now)),
                    gateway_response: Set(None),
                    gateway_error: Set(None),
                    refunded_amount: Set(Decimal::ZERO),
                    refund_reason: Set(None),
                    refunded_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                    completed_at: Set(None),
                }
                .insert(&txn)
                .await?
            }
        };
        let mut payment_model: payment::ActiveModel = payment.into();
        payment_model.status = Set(PaymentStatus::Completed);
        payment_model.completed_at = Set(Some(now));
        payment_model.updated_at = Set(now);
        let payment = payment_model.update(&txn).await?;

        let user_id = order.user_id;
        let mut order_model: order::ActiveModel = order.into();
        order_model.status = Set(OrderStatus::Completed);
        order_model.payment_status = Set(PaymentStatus::Completed);
        order_model.completed_at = Set(Some(now));
        order_model.updated_at = Set(now);
        let order = order_model.update(&txn).await?;

        clear_cart(&txn, user_id).await?;

        let items = order
            .find_related(order_item::Entity)
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&txn)
            .await?;
        let mut new_purchases = Vec::new();
        let mut details = Vec::new();
        for item in &items {
            let Some(factory_id) = item.factory_id else {
                continue;
            };
            let Some(factory) = factory::Entity::find_by_id(factory_id).one(&txn).await? else {
                continue;
            };
            if has_purchased(&txn, user_id, factory.id).await? {
                continue;
            }
            let purchase = factory_purchase::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                factory_id: Set(factory.id),
                quantity: Set(item.quantity),
                price_at_purchase: Set(item.price_at_purchase),
                payment_status: Set(PaymentStatus::Completed),
                transaction_id: Set(Some(order.order_number.clone())),
                purchased_at: Set(now),
                email_sent: Set(false),
                email_sent_at: Set(None),
                // Already backed by an order
                migrated_to_order: Set(true),
            }
            .insert(&txn)
            .await?;
            record_history(
                &txn,
                &factory,
                HistoryEntry {
                    user_id,
                    purchase_id: Some(purchase.id),
                    order_id: Some(order.id),
                    price_paid: item.total_price,
                    quantity: item.quantity,
                    purchased_at: now,
                    email_delivered_at: None,
                },
            )
            .await?;
            details.push(factory_details(&txn, &factory).await?);
            new_purchases.push((purchase.id, factory.id));
        }
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PaymentCompleted(payment.id))
            .await;
        self.event_sender
            .send_or_log(Event::OrderCompleted(order.id))
            .await;
        self.event_sender.send_or_log(Event::CartCleared(user_id)).await;
        for (purchase_id, factory_id) in &new_purchases {
            self.event_sender
                .send_or_log(Event::PurchaseRecorded {
                    purchase_id: *purchase_id,
                    factory_id: *factory_id,
                })
                .await;
        }

        let confirmation = templates::order_confirmation(&order, &items, self.config.tax_rate);
        let confirmation_sent = self.send_mail(&confirmation).await;

        let mut details_sent = false;
        if !details.is_empty() {
            let message = templates::factory_details(
                &order.customer_email,
                &order.customer_name,
                &details,
                Some(&order.order_number),
            );
            details_sent = self.send_mail(&message).await;
            if details_sent {
                let ids: Vec<Uuid> = new_purchases.iter().map(|(id, _)| *id).collect();
                mark_emailed(&*self.db, &ids, Utc::now()).await?;
            }
        }

        info!(
            order_id = %order.id,
            purchases = new_purchases.len(),
            confirmation_sent,
            details_sent,
            "Order completed"
        );
        Ok(CompletionReport {
            order: Self::detail(&*self.db, order).await?,
            purchases_created: new_purchases.len(),
            confirmation_sent,
            details_sent,
        })
    }

    async fn send_mail(&self, message: &crate::notifications::EmailMessage) -> bool {
        let sent = deliver(self.mailer.as_ref(), message).await;
        if !sent {
            self.event_sender
                .send_or_log(Event::EmailFailed {
                    recipient: message.to.clone(),
                    subject: message.subject.clone(),
                })
                .await;
        }
        sent
    }

    /// Only pending or processing orders can be cancelled.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::NotFound`] - the order is not visible to `actor`
    /// * [`ServiceError::InvalidStatus`] - the order is already completed, cancelled or refunded
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        actor: Actor,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = self.find_for(actor, order_id).await?;
        if !order.status.is_cancellable() {
            warn!(order_id = %order_id, status = %order.status, "Cancel rejected");
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot cancel an order that is {}",
                order.status
            )));
        }
        let txn = self.db.begin().await?;
        let order = cancel_in(&txn, order).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCancelled(order.id))
            .await;
        info!(order_id = %order.id, "Order cancelled");
        Ok(order)
    }

    /// Applies one admin action to many orders in a single transaction.
    ///
    /// Unknown ids and orders whose status does not allow the action are reported
    /// in [`BulkOrderResult::skipped`]. Refunds only touch completed payments.
    #[instrument(skip(self, request), fields(action = %request.action, count = request.order_ids.len()))]
    pub async fn bulk_action(
        &self,
        request: BulkOrderRequest,
    ) -> Result<BulkOrderResult, ServiceError> {
        let txn = self.db.begin().await?;
        let orders = order::Entity::find()
            .filter(order::Column::Id.is_in(request.order_ids.clone()))
            .all(&txn)
            .await?;

        let mut result = BulkOrderResult::default();
        for id in &request.order_ids {
            if !orders.iter().any(|o| o.id == *id) {
                result.skipped.push(*id);
            }
        }

        let now = Utc::now();
        for order in orders {
            let id = order.id;
            match request.action {
                BulkOrderAction::MarkCompleted if order.status.is_cancellable() => {
                    let mut model: order::ActiveModel = order.into();
                    model.status = Set(OrderStatus::Completed);
                    model.payment_status = Set(PaymentStatus::Completed);
                    model.completed_at = Set(Some(now));
                    model.updated_at = Set(now);
                    model.update(&txn).await?;
                }
                BulkOrderAction::MarkCancelled if order.status.is_cancellable() => {
                    cancel_in(&txn, order).await?;
                }
                BulkOrderAction::MarkRefunded if order.status == OrderStatus::Completed => {
                    let payments = order
                        .find_related(payment::Entity)
                        .filter(payment::Column::Status.eq(PaymentStatus::Completed))
                        .all(&txn)
                        .await?;
                    for payment in payments {
                        let mut model: payment::ActiveModel = payment.clone().into();
                        model.refunded_amount = Set(payment.amount);
                        model.status = Set(PaymentStatus::Refunded);
                        model.refund_reason = Set(Some("Bulk refund".to_string()));
                        model.refunded_at = Set(Some(now));
                        model.updated_at = Set(now);
                        model.update(&txn).await?;
                    }
                    let mut model: order::ActiveModel = order.into();
                    model.status = Set(OrderStatus::Refunded);
                    model.payment_status = Set(PaymentStatus::Refunded);
                    model.updated_at = Set(now);
                    model.update(&txn).await?;
                }
                _ => {
                    result.skipped.push(id);
                    continue;
                }
            }
            result.updated.push(id);
        }
        txn.commit().await?;

        info!(
            updated = result.updated.len(),
            skipped = result.skipped.len(),
            "Bulk order action applied"
        );
        Ok(result)
    }
}

async fn cancel_in<C: ConnectionTrait>(
    db: &C,
    order: order::Model,
) -> Result<order::Model, ServiceError> {
    let now = Utc::now();
    payment::Entity::update_many()
        .col_expr(
            payment::Column::Status,
            Expr::value(PaymentStatus::Cancelled.into_value()),
        )
        .col_expr(payment::Column::UpdatedAt, Expr::value(now))
        .filter(payment::Column::OrderId.eq(order.id))
        .filter(payment::Column::Status.is_in([
            PaymentStatus::Pending.into_value(),
            PaymentStatus::Processing.into_value(),
        ]))
        .exec(db)
        .await?;

    let mut model: order::ActiveModel = order.into();
    model.status = Set(OrderStatus::Cancelled);
    model.payment_status = Set(PaymentStatus::Cancelled);
    model.updated_at = Set(now);
    Ok(model.update(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_payment_methods_pass() {
        for method in PAYMENT_METHODS {
            assert!(validate_payment_method(method).is_ok());
        }
        assert!(validate_payment_method("manual").is_err());
        assert!(validate_payment_method("bitcoin").is_err());
    }

    #[test]
    fn bulk_actions_parse_from_snake_case() {
        assert_eq!(
            "mark_refunded".parse::<BulkOrderAction>().unwrap(),
            BulkOrderAction::MarkRefunded
        );
        assert!("refund_everything".parse::<BulkOrderAction>().is_err());
    }
}
