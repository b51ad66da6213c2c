use crate::{
    entities::soft_delete::SoftDelete,
    entities::taxonomy::{category, sub_category},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{restore_existing, slug::unique_slug, soft_delete_existing},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSubCategoryRequest {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateSubCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Category with its live subcategory count
#[derive(Debug, Serialize)]
pub struct CategorySummary {
    #[serde(flatten)]
    pub category: category::Model,
    pub subcategory_count: u64,
}

/// Categories and their subcategories.
#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::Conflict`] if a category with the same name exists,
    /// deleted ones included.
    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        request: CreateCategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let name = request.name.trim().to_string();

        let exists = category::Entity::find()
            .filter(category::Column::Name.eq(name.as_str()))
            .one(db)
            .await?;
        if exists.is_some() {
            warn!(name = %name, "Duplicate category name");
            return Err(ServiceError::Conflict(format!(
                "Category '{}' already exists",
                name
            )));
        }

        let slug = unique_slug::<category::Entity, _>(db, category::Column::Slug, &name).await?;
        let now = Utc::now();
        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            slug: Set(slug),
            description: Set(request.description),
            is_active: Set(request.is_active),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(category_id = %model.id, slug = %model.slug, "Category created");
        Ok(model)
    }

    /// Renames a category or toggles it. The slug is kept.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::NotFound`] - unknown or deleted category
    /// * [`ServiceError::Conflict`] - another category already has the name
    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: Uuid,
        request: UpdateCategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let existing = self.get_category(id).await?;

        let mut model: category::ActiveModel = existing.clone().into();
        if let Some(name) = request.name.map(|n| n.trim().to_string()) {
            if name != existing.name {
                let taken = category::Entity::find()
                    .filter(category::Column::Name.eq(name.as_str()))
                    .filter(category::Column::Id.ne(id))
                    .one(db)
                    .await?;
                if taken.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Category '{}' already exists",
                        name
                    )));
                }
                model.name = Set(name);
            }
        }
        if let Some(description) = request.description {
            model.description = Set(description);
        }
        if let Some(is_active) = request.is_active {
            model.is_active = Set(is_active);
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(db).await?;
        info!(category_id = %id, "Category updated");
        Ok(updated)
    }

    pub async fn get_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_active()
            .filter(category::Column::Id.eq(id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", id))
    }

    /// Non-deleted categories by name. Inactive ones only when asked.
    #[instrument(skip(self))]
    pub async fn list_categories(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<CategorySummary>, ServiceError> {
        let db = &*self.db;
        let mut query = category::Entity::find_active();
        if !include_inactive {
            query = query.filter(category::Column::IsActive.eq(true));
        }
        let categories = query.order_by_asc(category::Column::Name).all(db).await?;

        let mut summaries = Vec::with_capacity(categories.len());
        for category in categories {
            let subcategory_count = sub_category::Entity::find_active()
                .filter(sub_category::Column::CategoryId.eq(category.id))
                .count(db)
                .await?;
            summaries.push(CategorySummary {
                category,
                subcategory_count,
            });
        }
        Ok(summaries)
    }

    /// Soft deletes the category. Deleting an already deleted category succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for ids that never existed.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        if soft_delete_existing::<category::Entity, _>(&*self.db, "Category", id).await? {
            self.event_sender
                .send_or_log(Event::RecordSoftDeleted {
                    kind: "category".to_string(),
                    id,
                })
                .await;
            info!(category_id = %id, "Category soft deleted");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn restore_category(&self, id: Uuid) -> Result<(), ServiceError> {
        if restore_existing::<category::Entity, _>(&*self.db, "Category", id).await? {
            info!(category_id = %id, "Category restored");
        }
        Ok(())
    }

    /// # Arguments
    ///
    /// * `request` - parent category, name and description
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when the parent category is missing and
    /// [`ServiceError::Conflict`] when the category already has a subcategory of that name.
    #[instrument(skip(self))]
    pub async fn create_subcategory(
        &self,
        request: CreateSubCategoryRequest,
    ) -> Result<sub_category::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let parent = self.get_category(request.category_id).await?;
        let name = request.name.trim().to_string();

        let exists = sub_category::Entity::find()
            .filter(sub_category::Column::CategoryId.eq(parent.id))
            .filter(sub_category::Column::Name.eq(name.as_str()))
            .one(db)
            .await?;
        if exists.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Subcategory '{}' already exists in '{}'",
                name, parent.name
            )));
        }

        let slug = unique_slug::<sub_category::Entity, _>(
            db,
            sub_category::Column::Slug,
            &format!("{}-{}", parent.name, name),
        )
        .await?;
        let now = Utc::now();
        let model = sub_category::ActiveModel {
            id: Set(Uuid::new_v4()),
            category_id: Set(parent.id),
            name: Set(name),
            slug: Set(slug),
            description: Set(request.description),
            is_active: Set(request.is_active),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(subcategory_id = %model.id, category_id = %parent.id, "Subcategory created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn update_subcategory(
        &self,
        id: Uuid,
        request: UpdateSubCategoryRequest,
    ) -> Result<sub_category::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let existing = self.get_subcategory(id).await?;

        let mut model: sub_category::ActiveModel = existing.clone().into();
        if let Some(name) = request.name.map(|n| n.trim().to_string()) {
            if name != existing.name {
                let taken = sub_category::Entity::find()
                    .filter(sub_category::Column::CategoryId.eq(existing.category_id))
                    .filter(sub_category::Column::Name.eq(name.as_str()))
                    .one(db)
                    .await?;
                if taken.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Subcategory '{}' already exists",
                        name
                    )));
                }
                model.name = Set(name);
            }
        }
        if let Some(description) = request.description {
            model.description = Set(description);
        }
        if let Some(is_active) = request.is_active {
            model.is_active = Set(is_active);
        }
        model.updated_at = Set(Utc::now());

        Ok(model.update(db).await?)
    }

    pub async fn get_subcategory(&self, id: Uuid) -> Result<sub_category::Model, ServiceError> {
        sub_category::Entity::find_active()
            .filter(sub_category::Column::Id.eq(id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Subcategory", id))
    }

    /// All non-deleted subcategories, optionally limited to one category.
    pub async fn list_subcategories(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<sub_category::Model>, ServiceError> {
        let mut query = sub_category::Entity::find_active();
        if let Some(category_id) = category_id {
            query = query.filter(sub_category::Column::CategoryId.eq(category_id));
        }
        Ok(query
            .order_by_asc(sub_category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Dropdown lookup: active, non-deleted children of a category.
    #[instrument(skip(self))]
    pub async fn subcategories_of(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<sub_category::Model>, ServiceError> {
        Ok(sub_category::Entity::find_active()
            .filter(sub_category::Column::CategoryId.eq(category_id))
            .filter(sub_category::Column::IsActive.eq(true))
            .order_by_asc(sub_category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_subcategory(&self, id: Uuid) -> Result<(), ServiceError> {
        if soft_delete_existing::<sub_category::Entity, _>(&*self.db, "Subcategory", id).await? {
            self.event_sender
                .send_or_log(Event::RecordSoftDeleted {
                    kind: "subcategory".to_string(),
                    id,
                })
                .await;
        }
        Ok(())
    }

    /// Verifies that `subcategory_id` belongs to `category_id`.
    pub(crate) async fn check_pair(
        db: &DatabaseConnection,
        category_id: Uuid,
        subcategory_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        category::Entity::find_active()
            .filter(category::Column::Id.eq(category_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", category_id))?;

        if let Some(subcategory_id) = subcategory_id {
            let sub = sub_category::Entity::find_active()
                .filter(sub_category::Column::Id.eq(subcategory_id))
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found("Subcategory", subcategory_id))?;
            if sub.category_id != category_id {
                return Err(ServiceError::ValidationError(
                    "Selected subcategory does not belong to the selected category".to_string(),
                ));
            }
        }
        Ok(())
    }
}
