use crate::{
    entities::commerce::{order, order::OrderStatus},
    entities::content::{blog_post, contact_message, faq_question},
    entities::soft_delete::{self, SoftDelete, TrashEntry},
    entities::taxonomy::{category, city, country, district, region, state, sub_category},
    entities::{factory, user, worker},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{ensure_exists, restore_existing},
};
use chrono::{NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const RECENT_ORDERS: u64 = 5;

/// Soft-deletable record kinds, as they appear in `/admin/{entity}` paths.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrashKind {
    Category,
    Subcategory,
    Country,
    State,
    City,
    District,
    Region,
    Factory,
    Worker,
    BlogPost,
    FaqQuestion,
    ContactMessage,
}

/// Runs a generic soft-delete helper against the entity behind a [`TrashKind`].
macro_rules! for_kind {
    ($kind:expr, $func:ident ( $($arg:expr),* )) => {
        match $kind {
            TrashKind::Category => $func::<category::Entity, _>($($arg),*).await,
            TrashKind::Subcategory => $func::<sub_category::Entity, _>($($arg),*).await,
            TrashKind::Country => $func::<country::Entity, _>($($arg),*).await,
            TrashKind::State => $func::<state::Entity, _>($($arg),*).await,
            TrashKind::City => $func::<city::Entity, _>($($arg),*).await,
            TrashKind::District => $func::<district::Entity, _>($($arg),*).await,
            TrashKind::Region => $func::<region::Entity, _>($($arg),*).await,
            TrashKind::Factory => $func::<factory::Entity, _>($($arg),*).await,
            TrashKind::Worker => $func::<worker::Entity, _>($($arg),*).await,
            TrashKind::BlogPost => $func::<blog_post::Entity, _>($($arg),*).await,
            TrashKind::FaqQuestion => $func::<faq_question::Entity, _>($($arg),*).await,
            TrashKind::ContactMessage => $func::<contact_message::Entity, _>($($arg),*).await,
        }
    };
}

#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub refunded: u64,
    /// Sum of completed order totals
    pub revenue: Decimal,
}

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub users: u64,
    pub factories: u64,
    pub workers: u64,
    pub blog_posts: u64,
    pub faq_questions: u64,
    pub new_users_today: u64,
    pub new_factories_today: u64,
    pub new_workers_today: u64,
    pub deleted_records: u64,
    pub orders: OrderSummary,
    pub recent_orders: Vec<order::Model>,
}

/// Back-office views: trash management and the dashboard.
#[derive(Clone)]
pub struct AdminService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl AdminService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    pub async fn list_deleted(&self, kind: TrashKind) -> Result<Vec<TrashEntry>, ServiceError> {
        use soft_delete::list_deleted;
        let db = &*self.db;
        Ok(for_kind!(kind, list_deleted(db))?)
    }

    /// Restores a soft-deleted record of any [`TrashKind`]. Restoring a live record is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when no row of that kind has the id.
    #[instrument(skip(self))]
    pub async fn restore(&self, kind: TrashKind, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;
        let label = kind.to_string();
        let changed = for_kind!(kind, restore_existing(db, &label, id))?;
        if changed {
            self.event_sender
                .send_or_log(Event::RecordRestored { kind: label, id })
                .await;
            info!(kind = %kind, id = %id, "Record restored");
        }
        Ok(())
    }

    /// Permanent removal. Dependent rows follow the schema's cascade rules.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown ids. Foreign keys that restrict
    /// deletion surface as [`ServiceError::DatabaseError`].
    #[instrument(skip(self))]
    pub async fn hard_delete(&self, kind: TrashKind, id: Uuid) -> Result<(), ServiceError> {
        use soft_delete::hard_delete;
        let db = &*self.db;
        let label = kind.to_string();
        for_kind!(kind, ensure_exists(db, &label, id))?;
        for_kind!(kind, hard_delete(db, id))?;
        warn!(kind = %kind, id = %id, "Record permanently deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<AdminDashboard, ServiceError> {
        let db = &*self.db;
        let today = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();

        let mut deleted_records = 0;
        for kind in <TrashKind as strum::IntoEnumIterator>::iter() {
            deleted_records += self.list_deleted(kind).await?.len() as u64;
        }

        let by_status = |status: OrderStatus| {
            order::Entity::find().filter(order::Column::Status.eq(status))
        };
        let completed_totals: Vec<Decimal> = by_status(OrderStatus::Completed)
            .select_only()
            .column(order::Column::TotalAmount)
            .into_tuple()
            .all(db)
            .await?;

        let orders = OrderSummary {
            total: order::Entity::find().count(db).await?,
            pending: by_status(OrderStatus::Pending).count(db).await?,
            processing: by_status(OrderStatus::Processing).count(db).await?,
            completed: completed_totals.len() as u64,
            cancelled: by_status(OrderStatus::Cancelled).count(db).await?,
            refunded: by_status(OrderStatus::Refunded).count(db).await?,
            revenue: completed_totals.into_iter().sum(),
        };

        Ok(AdminDashboard {
            users: user::Entity::find().count(db).await?,
            factories: factory::Entity::find_active().count(db).await?,
            workers: worker::Entity::find_active().count(db).await?,
            blog_posts: blog_post::Entity::find_active().count(db).await?,
            faq_questions: faq_question::Entity::find_active().count(db).await?,
            new_users_today: user::Entity::find()
                .filter(user::Column::CreatedAt.gte(today))
                .count(db)
                .await?,
            new_factories_today: factory::Entity::find_active()
                .filter(factory::Column::CreatedAt.gte(today))
                .count(db)
                .await?,
            new_workers_today: worker::Entity::find_active()
                .filter(worker::Column::CreatedAt.gte(today))
                .count(db)
                .await?,
            deleted_records,
            orders,
            recent_orders: order::Entity::find()
                .order_by_desc(order::Column::CreatedAt)
                .limit(RECENT_ORDERS)
                .all(db)
                .await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trash_kinds_use_path_names() {
        assert_eq!("blog_post".parse::<TrashKind>().unwrap(), TrashKind::BlogPost);
        assert_eq!(TrashKind::FaqQuestion.to_string(), "faq_question");
        assert!("order".parse::<TrashKind>().is_err());
    }
}
