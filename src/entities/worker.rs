use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Gender,
    pub phone_number: String,
    pub email: String,

    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub years_of_experience: i32,
    pub skills: String,
    pub availability: Availability,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub expected_daily_wage: Decimal,

    pub country_id: Option<Uuid>,
    pub state_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
    pub address: String,

    #[sea_orm(unique)]
    pub slug: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_by: Option<Uuid>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(1))")]
pub enum Gender {
    #[sea_orm(string_value = "M")]
    #[serde(rename = "M")]
    Male,
    #[sea_orm(string_value = "F")]
    #[serde(rename = "F")]
    Female,
    #[sea_orm(string_value = "O")]
    #[serde(rename = "O")]
    Other,
    #[sea_orm(string_value = "N")]
    #[serde(rename = "N")]
    PreferNotToSay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(2))")]
pub enum Availability {
    #[sea_orm(string_value = "FT")]
    #[serde(rename = "FT")]
    FullTime,
    #[sea_orm(string_value = "PT")]
    #[serde(rename = "PT")]
    PartTime,
    #[sea_orm(string_value = "C")]
    #[serde(rename = "C")]
    Contract,
    #[sea_orm(string_value = "T")]
    #[serde(rename = "T")]
    Temporary,
    #[sea_orm(string_value = "A")]
    #[serde(rename = "A")]
    Immediate,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::work_experience::Entity")]
    Experiences,
    #[sea_orm(
        belongs_to = "super::taxonomy::category::Entity",
        from = "Column::CategoryId",
        to = "super::taxonomy::category::Column::Id"
    )]
    Category,
}

impl Related<super::work_experience::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Experiences.def()
    }
}

impl Related<super::taxonomy::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

crate::entities::soft_delete::impl_soft_delete!(full_name);

impl Model {
    pub fn is_available(&self) -> bool {
        self.is_active && !self.is_deleted
    }
}
