use crate::{
    config::AppConfig,
    entities::commerce::cart_item,
    entities::factory,
    errors::ServiceError,
    events::{Event, EventSender},
    services::pricing::{line_total, OrderTotals},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Per-line ceiling for a factory in one cart.
pub const MAX_CART_QUANTITY: i32 = 10;

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub factory_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub item: cart_item::Model,
    pub factory: factory::Model,
    pub line_total: Decimal,
    /// False once the factory is deactivated or deleted
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub item_count: i32,
    pub totals: OrderTotals,
}

impl CartView {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Shopping cart, one row per (user, factory).
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    fn check_quantity(&self, quantity: i32) -> Result<(), ServiceError> {
        let max = self.config.max_cart_quantity;
        if !(1..=max).contains(&quantity) {
            return Err(ServiceError::ValidationError(format!(
                "Quantity must be between 1 and {}",
                max
            )));
        }
        Ok(())
    }

    /// Adds a factory, incrementing the quantity when it is already in the cart.
    ///
    /// # Arguments
    ///
    /// * `user_id` - owner of the cart
    /// * `request` - factory and quantity to add
    ///
    /// # Errors
    ///
    /// * [`ServiceError::NotFound`] - the factory is unknown, deleted or inactive
    /// * [`ServiceError::ValidationError`] - the resulting quantity exceeds the per-line limit
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        request: AddToCartRequest,
    ) -> Result<cart_item::Model, ServiceError> {
        request.validate()?;
        self.check_quantity(request.quantity)?;

        let txn = self.db.begin().await?;
        let factory = factory::Entity::find_by_id(request.factory_id)
            .one(&txn)
            .await?
            .filter(|f| f.is_purchasable())
            .ok_or_else(|| ServiceError::not_found("Factory", request.factory_id))?;

        let existing = cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::FactoryId.eq(factory.id))
            .one(&txn)
            .await?;

        let now = Utc::now();
        let item = match existing {
            Some(item) => {
                let quantity = item.quantity + request.quantity;
                if quantity > self.config.max_cart_quantity {
                    warn!(user_id = %user_id, factory_id = %factory.id, quantity, "Cart limit exceeded");
                    return Err(ServiceError::ValidationError(format!(
                        "Cannot have more than {} of '{}' in the cart",
                        self.config.max_cart_quantity, factory.name
                    )));
                }
                let mut model: cart_item::ActiveModel = item.into();
                model.quantity = Set(quantity);
                model.updated_at = Set(now);
                model.update(&txn).await?
            }
            None => {
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    factory_id: Set(factory.id),
                    quantity: Set(request.quantity),
                    added_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?
            }
        };
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id,
                factory_id: item.factory_id,
                quantity: item.quantity,
            })
            .await;
        info!(user_id = %user_id, factory_id = %item.factory_id, quantity = item.quantity, "Cart item added");
        Ok(item)
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when the factory is not in the cart and
    /// [`ServiceError::ValidationError`] for quantities outside the allowed range.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: Uuid,
        factory_id: Uuid,
        request: UpdateCartItemRequest,
    ) -> Result<cart_item::Model, ServiceError> {
        request.validate()?;
        self.check_quantity(request.quantity)?;
        let item = self.find_item(user_id, factory_id).await?;

        let mut model: cart_item::ActiveModel = item.into();
        model.quantity = Set(request.quantity);
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, factory_id: Uuid) -> Result<(), ServiceError> {
        let item = self.find_item(user_id, factory_id).await?;
        cart_item::Entity::delete_by_id(item.id)
            .exec(&*self.db)
            .await?;
        info!(user_id = %user_id, factory_id = %factory_id, "Cart item removed");
        Ok(())
    }

    async fn find_item(
        &self,
        user_id: Uuid,
        factory_id: Uuid,
    ) -> Result<cart_item::Model, ServiceError> {
        cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::FactoryId.eq(factory_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cart item for factory", factory_id))
    }

    /// Cart contents with live prices and the totals checkout would charge.
    #[instrument(skip(self))]
    pub async fn view(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let rows = load_cart(&*self.db, user_id).await?;
        let lines: Vec<CartLine> = rows
            .into_iter()
            .map(|(item, factory)| CartLine {
                line_total: line_total(factory.price, item.quantity),
                available: factory.is_purchasable(),
                item,
                factory,
            })
            .collect();

        let totals = OrderTotals::compute(
            lines.iter().map(|l| l.line_total),
            self.config.tax_rate,
            self.config.service_fee,
        );
        Ok(CartView {
            item_count: lines.iter().map(|l| l.item.quantity).sum(),
            lines,
            totals,
        })
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let removed = clear_cart(&*self.db, user_id).await?;
        if removed > 0 {
            self.event_sender.send_or_log(Event::CartCleared(user_id)).await;
        }
        Ok(removed)
    }
}

/// Cart rows joined with their factories, oldest first.
pub(crate) async fn load_cart<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<Vec<(cart_item::Model, factory::Model)>, ServiceError> {
    let rows = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .find_also_related(factory::Entity)
        .order_by_asc(cart_item::Column::AddedAt)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(item, factory)| factory.map(|f| (item, f)))
        .collect())
}

pub(crate) async fn clear_cart<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<u64, ServiceError> {
    let result = cart_item::Entity::delete_many()
        .filter(cart_item::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
