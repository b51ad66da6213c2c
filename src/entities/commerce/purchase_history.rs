use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Frozen receipt of a purchased factory. Survives factory deletion.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub factory_id: Option<Uuid>,
    pub purchase_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub factory_name: String,
    pub factory_slug: String,
    pub factory_contact_email: String,
    pub factory_contact_phone: String,
    pub factory_address: String,
    #[sea_orm(column_type = "Text")]
    pub factory_description: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price_paid: Decimal,
    pub quantity: i32,
    pub purchase_date: DateTime<Utc>,
    pub email_delivered: bool,
    pub email_delivered_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
