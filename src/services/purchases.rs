use crate::{
    entities::commerce::{
        factory_purchase, order, order::OrderStatus, order_item, payment, payment::PaymentStatus,
        purchase_history,
    },
    entities::factory,
    entities::user,
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{deliver, templates, Mailer},
    services::factories::{factory_details, full_address, AddressParts},
    services::pricing::{generate_transaction_id, OrderTotals},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr,
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Payment method recorded on migrated orders
pub const MIGRATED_PAYMENT_METHOD: &str = "manual";

/// True once the user holds a completed purchase of the factory.
pub async fn has_purchased<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    factory_id: Uuid,
) -> Result<bool, ServiceError> {
    Ok(factory_purchase::Entity::find()
        .filter(factory_purchase::Column::UserId.eq(user_id))
        .filter(factory_purchase::Column::FactoryId.eq(factory_id))
        .filter(factory_purchase::Column::PaymentStatus.eq(PaymentStatus::Completed))
        .one(db)
        .await?
        .is_some())
}

/// What a history row freezes about a purchase.
pub(crate) struct HistoryEntry {
    pub user_id: Uuid,
    pub purchase_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub price_paid: Decimal,
    pub quantity: i32,
    pub purchased_at: DateTime<Utc>,
    pub email_delivered_at: Option<DateTime<Utc>>,
}

/// Writes the receipt snapshot for a factory.
pub(crate) async fn record_history<C: ConnectionTrait>(
    db: &C,
    factory: &factory::Model,
    entry: HistoryEntry,
) -> Result<purchase_history::Model, ServiceError> {
    let parts = AddressParts::load(db, factory).await?;
    Ok(purchase_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(entry.user_id),
        factory_id: Set(Some(factory.id)),
        purchase_id: Set(entry.purchase_id),
        order_id: Set(entry.order_id),
        factory_name: Set(factory.name.clone()),
        factory_slug: Set(factory.slug.clone()),
        factory_contact_email: Set(factory.contact_email.clone()),
        factory_contact_phone: Set(factory.contact_phone.clone()),
        factory_address: Set(full_address(&factory.address, &parts, &factory.pincode)),
        factory_description: Set(factory.description.clone()),
        price_paid: Set(entry.price_paid),
        quantity: Set(entry.quantity),
        purchase_date: Set(entry.purchased_at),
        email_delivered: Set(entry.email_delivered_at.is_some()),
        email_delivered_at: Set(entry.email_delivered_at),
    }
    .insert(db)
    .await?)
}

/// Flags purchases and their history rows as emailed.
pub(crate) async fn mark_emailed<C: ConnectionTrait>(
    db: &C,
    purchase_ids: &[Uuid],
    at: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if purchase_ids.is_empty() {
        return Ok(());
    }
    factory_purchase::Entity::update_many()
        .col_expr(factory_purchase::Column::EmailSent, Expr::value(true))
        .col_expr(factory_purchase::Column::EmailSentAt, Expr::value(Some(at)))
        .filter(factory_purchase::Column::Id.is_in(purchase_ids.to_vec()))
        .exec(db)
        .await?;
    purchase_history::Entity::update_many()
        .col_expr(purchase_history::Column::EmailDelivered, Expr::value(true))
        .col_expr(purchase_history::Column::EmailDeliveredAt, Expr::value(Some(at)))
        .filter(purchase_history::Column::PurchaseId.is_in(purchase_ids.to_vec()))
        .exec(db)
        .await?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct PurchaseReceipt {
    pub purchase: factory_purchase::Model,
    pub history: purchase_history::Model,
    pub email_sent: bool,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub migrated: Vec<(Uuid, String)>,
    pub failed: Vec<(Uuid, String)>,
}

/// Legacy single-factory purchases and the receipt history.
#[derive(Clone)]
pub struct PurchaseService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    mailer: Arc<dyn Mailer>,
}

impl PurchaseService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            event_sender,
            mailer,
        }
    }

    /// Opens a pending purchase at the factory's current price.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Conflict`] when the user already owns the factory's details.
    #[instrument(skip(self))]
    pub async fn process_legacy_purchase(
        &self,
        user_id: Uuid,
        factory_id: Uuid,
    ) -> Result<factory_purchase::Model, ServiceError> {
        let db = &*self.db;
        let factory = factory::Entity::find_by_id(factory_id)
            .one(db)
            .await?
            .filter(|f| f.is_purchasable())
            .ok_or_else(|| ServiceError::not_found("Factory", factory_id))?;

        if has_purchased(db, user_id, factory.id).await? {
            warn!(user_id = %user_id, factory_id = %factory.id, "Repeat purchase rejected");
            return Err(ServiceError::Conflict(
                "You have already purchased this factory".to_string(),
            ));
        }

        let purchase = factory_purchase::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            factory_id: Set(factory.id),
            quantity: Set(1),
            price_at_purchase: Set(factory.price),
            payment_status: Set(PaymentStatus::Pending),
            transaction_id: Set(None),
            purchased_at: Set(Utc::now()),
            email_sent: Set(false),
            email_sent_at: Set(None),
            migrated_to_order: Set(false),
        }
        .insert(db)
        .await?;
        info!(purchase_id = %purchase.id, "Legacy purchase opened");
        Ok(purchase)
    }

    /// Completes a pending purchase, freezes the receipt and mails the details.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] for an unknown purchase or one owned by another user,
    /// [`ServiceError::InvalidStatus`] when it is not pending.
    #[instrument(skip(self))]
    pub async fn complete_legacy_purchase(
        &self,
        user_id: Uuid,
        purchase_id: Uuid,
    ) -> Result<PurchaseReceipt, ServiceError> {
        let txn = self.db.begin().await?;
        let purchase = factory_purchase::Entity::find_by_id(purchase_id)
            .filter(factory_purchase::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Purchase", purchase_id))?;
        if purchase.payment_status != PaymentStatus::Pending {
            return Err(ServiceError::InvalidStatus(format!(
                "Purchase is already {}",
                purchase.payment_status
            )));
        }
        let factory = factory::Entity::find_by_id(purchase.factory_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Factory", purchase.factory_id))?;
        let account = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;

        let now = Utc::now();
        let mut model: factory_purchase::ActiveModel = purchase.into();
        model.payment_status = Set(PaymentStatus::Completed);
        model.transaction_id = Set(Some(generate_transaction_id(now)));
        model.purchased_at = Set(now);
        let purchase = model.update(&txn).await?;

        let history = record_history(
            &txn,
            &factory,
            HistoryEntry {
                user_id,
                purchase_id: Some(purchase.id),
                order_id: None,
                price_paid: purchase.total_amount(),
                quantity: purchase.quantity,
                purchased_at: now,
                email_delivered_at: None,
            },
        )
        .await?;
        let details = factory_details(&txn, &factory).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PurchaseRecorded {
                purchase_id: purchase.id,
                factory_id: factory.id,
            })
            .await;

        let message =
            templates::factory_details(&account.email, &account.display_name(), &[details], None);
        let email_sent = deliver(self.mailer.as_ref(), &message).await;
        let (purchase, history) = if email_sent {
            mark_emailed(&*self.db, &[purchase.id], Utc::now()).await?;
            (
                self.reload_purchase(purchase.id).await?,
                self.reload_history(history.id).await?,
            )
        } else {
            self.event_sender
                .send_or_log(Event::EmailFailed {
                    recipient: account.email.clone(),
                    subject: message.subject.clone(),
                })
                .await;
            (purchase, history)
        };

        info!(purchase_id = %purchase.id, email_sent, "Legacy purchase completed");
        Ok(PurchaseReceipt {
            purchase,
            history,
            email_sent,
        })
    }

    async fn reload_purchase(&self, id: Uuid) -> Result<factory_purchase::Model, ServiceError> {
        factory_purchase::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Purchase", id))
    }

    async fn reload_history(&self, id: Uuid) -> Result<purchase_history::Model, ServiceError> {
        purchase_history::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Purchase history", id))
    }

    /// The user's receipts, newest first.
    pub async fn purchase_history(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<purchase_history::Model>, ServiceError> {
        Ok(purchase_history::Entity::find()
            .filter(purchase_history::Column::UserId.eq(user_id))
            .order_by_desc(purchase_history::Column::PurchaseDate)
            .all(&*self.db)
            .await?)
    }

    pub async fn has_purchased(&self, user_id: Uuid, factory_id: Uuid) -> Result<bool, ServiceError> {
        has_purchased(&*self.db, user_id, factory_id).await
    }

    /// Converts every non-migrated legacy purchase into an order.
    ///
    /// Each purchase runs in its own savepoint so one bad row does not stop
    /// the rest. A dry run rolls everything back.
    #[instrument(skip(self))]
    pub async fn migrate_purchases(&self, dry_run: bool) -> Result<MigrationReport, ServiceError> {
        let txn = self.db.begin().await?;
        let pending = factory_purchase::Entity::find()
            .filter(factory_purchase::Column::MigratedToOrder.eq(false))
            .order_by_asc(factory_purchase::Column::PurchasedAt)
            .all(&txn)
            .await?;

        let mut report = MigrationReport {
            dry_run,
            ..Default::default()
        };
        for purchase in pending {
            let savepoint = txn.begin().await?;
            match migrate_one(&savepoint, &purchase).await {
                Ok(order) => {
                    savepoint.commit().await?;
                    info!(purchase_id = %purchase.id, order_number = %order.order_number, "Purchase migrated");
                    report.migrated.push((purchase.id, order.order_number));
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    error!(purchase_id = %purchase.id, error = %e, "Purchase migration failed");
                    report.failed.push((purchase.id, e.to_string()));
                }
            }
        }

        if dry_run {
            txn.rollback().await?;
            warn!(would_migrate = report.migrated.len(), "Dry run, nothing written");
            return Ok(report);
        }
        txn.commit().await?;

        for (purchase_id, order_number) in &report.migrated {
            if let Some(order_id) = order::Entity::find()
                .filter(order::Column::OrderNumber.eq(order_number.as_str()))
                .one(&*self.db)
                .await?
                .map(|o| o.id)
            {
                self.event_sender
                    .send_or_log(Event::PurchaseMigrated {
                        purchase_id: *purchase_id,
                        order_id,
                    })
                    .await;
            }
        }
        info!(
            migrated = report.migrated.len(),
            failed = report.failed.len(),
            "Purchase migration finished"
        );
        Ok(report)
    }
}

async fn migrate_one<C: ConnectionTrait>(
    db: &C,
    purchase: &factory_purchase::Model,
) -> Result<order::Model, ServiceError> {
    let account = user::Entity::find_by_id(purchase.user_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("User", purchase.user_id))?;
    let factory = factory::Entity::find_by_id(purchase.factory_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Factory", purchase.factory_id))?;

    let completed = purchase.payment_status == PaymentStatus::Completed;
    let completed_at = completed.then_some(purchase.purchased_at);
    let total = purchase.total_amount();
    let totals = OrderTotals::untaxed(total);
    let note = format!("Migrated from FactoryPurchase ID: {}", purchase.id);

    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_number: Set(format!("MIGRATED-{}", purchase.id)),
        user_id: Set(account.id),
        customer_name: Set(account.display_name()),
        customer_email: Set(account.email.clone()),
        customer_phone: Set(account.phone_number.clone()),
        subtotal: Set(totals.subtotal),
        tax_amount: Set(totals.tax_amount),
        service_fee: Set(totals.service_fee),
        total_amount: Set(totals.total_amount),
        status: Set(if completed {
            OrderStatus::Completed
        } else {
            OrderStatus::Cancelled
        }),
        payment_status: Set(purchase.payment_status),
        payment_method: Set(MIGRATED_PAYMENT_METHOD.to_string()),
        notes: Set(note.clone()),
        tracking_number: Set(None),
        migrated_from_purchase: Set(true),
        created_at: Set(purchase.purchased_at),
        updated_at: Set(Utc::now()),
        completed_at: Set(completed_at),
    }
    .insert(db)
    .await?;

    order_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        factory_id: Set(Some(factory.id)),
        factory_name: Set(factory.name.clone()),
        quantity: Set(purchase.quantity),
        price_at_purchase: Set(purchase.price_at_purchase),
        total_price: Set(totals.subtotal),
        created_at: Set(purchase.purchased_at),
    }
    .insert(db)
    .await?;

    payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        payment_method: Set(MIGRATED_PAYMENT_METHOD.to_string()),
        amount: Set(totals.total_amount),
        currency: Set("INR".to_string()),
        status: Set(purchase.payment_status),
        transaction_id: Set(format!("MIGRATED-PURCHASE-{}", purchase.id)),
        gateway_response: Set(Some(serde_json::json!({ "note": note }))),
        gateway_error: Set(None),
        refunded_amount: Set(Decimal::ZERO),
        refund_reason: Set(None),
        refunded_at: Set(None),
        created_at: Set(purchase.purchased_at),
        updated_at: Set(Utc::now()),
        completed_at: Set(completed_at),
    }
    .insert(db)
    .await?;

    let mut model: factory_purchase::ActiveModel = purchase.clone().into();
    model.migrated_to_order = Set(true);
    model.update(db).await?;

    let has_history = purchase_history::Entity::find()
        .filter(purchase_history::Column::UserId.eq(account.id))
        .filter(purchase_history::Column::FactoryId.eq(factory.id))
        .one(db)
        .await?
        .is_some();
    if completed && !has_history {
        record_history(
            db,
            &factory,
            HistoryEntry {
                user_id: account.id,
                purchase_id: Some(purchase.id),
                order_id: Some(order.id),
                price_paid: total,
                quantity: purchase.quantity,
                purchased_at: purchase.purchased_at,
                email_delivered_at: Some(purchase.email_sent_at.unwrap_or(purchase.purchased_at)),
            },
        )
        .await?;
    }
    Ok(order)
}
