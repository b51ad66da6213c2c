use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Factory listing entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "factories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub description: String,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,

    pub country_id: Uuid,
    pub state_id: Uuid,
    pub city_id: Uuid,
    pub district_id: Option<Uuid>,
    pub region_id: Option<Uuid>,

    pub address: String,
    pub pincode: String,
    pub contact_person: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub website: String,
    pub established_year: Option<i32>,
    pub employee_count: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))", nullable)]
    pub annual_turnover: Option<Decimal>,

    pub factory_type: String,
    pub production_capacity: String,
    pub working_hours: String,
    pub holidays: String,
    /// Price charged for the factory's contact details
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,

    pub is_active: bool,
    pub is_verified: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::taxonomy::category::Entity",
        from = "Column::CategoryId",
        to = "super::taxonomy::category::Column::Id"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::taxonomy::city::Entity",
        from = "Column::CityId",
        to = "super::taxonomy::city::Column::Id"
    )]
    City,
    #[sea_orm(
        belongs_to = "super::taxonomy::state::Entity",
        from = "Column::StateId",
        to = "super::taxonomy::state::Column::Id"
    )]
    State,
    #[sea_orm(
        belongs_to = "super::taxonomy::country::Entity",
        from = "Column::CountryId",
        to = "super::taxonomy::country::Column::Id"
    )]
    Country,
}

impl Related<super::taxonomy::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::taxonomy::city::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::City.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

crate::entities::soft_delete::impl_soft_delete!(name);

impl Model {
    pub fn is_purchasable(&self) -> bool {
        self.is_active && !self.is_deleted
    }
}
