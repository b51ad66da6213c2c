use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blog_posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub excerpt: String,
    pub author_id: Option<Uuid>,

    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub country_id: Option<Uuid>,
    pub state_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
    pub region_id: Option<Uuid>,

    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::blog_post_factory::Entity")]
    RelatedFactories,
}

impl Related<super::blog_post_factory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RelatedFactories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

crate::entities::soft_delete::impl_soft_delete!(title);
