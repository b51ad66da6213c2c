use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "faq_questions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub category_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub question_text: String,
    #[sea_orm(column_type = "Text")]
    pub answer_text: String,
    pub status: FaqStatus,
    pub is_featured: bool,
    pub view_count: i32,
    /// Comma-separated
    pub tags: String,
    pub sort_order: i32,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FaqStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::faq_feedback::Entity")]
    Feedback,
}

impl Related<super::faq_feedback::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feedback.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

crate::entities::soft_delete::impl_soft_delete!(title);

impl Model {
    pub fn tags_list(&self) -> Vec<String> {
        tags_list(&self.tags)
    }

    pub fn is_published(&self) -> bool {
        self.status == FaqStatus::Published
    }
}

/// Splits a comma-separated tag string, dropping blanks.
pub fn tags_list(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::tags_list;

    #[test]
    fn tags_are_trimmed_and_blanks_dropped() {
        assert_eq!(
            tags_list(" orders, payments ,, refunds ,"),
            vec!["orders", "payments", "refunds"]
        );
        assert!(tags_list("").is_empty());
        assert!(tags_list(" , ").is_empty());
    }
}
