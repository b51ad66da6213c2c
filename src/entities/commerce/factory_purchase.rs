use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payment::PaymentStatus;

/// Single-factory purchase record predating the order workflow
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "factory_purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub factory_id: Uuid,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price_at_purchase: Decimal,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub purchased_at: DateTime<Utc>,
    pub email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub migrated_to_order: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::entities::factory::Entity",
        from = "Column::FactoryId",
        to = "crate::entities::factory::Column::Id"
    )]
    Factory,
}

impl Related<crate::entities::factory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Factory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn total_amount(&self) -> Decimal {
        self.price_at_purchase * Decimal::from(self.quantity)
    }
}
