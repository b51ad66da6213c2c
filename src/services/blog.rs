use crate::{
    entities::content::{blog_post, blog_post_factory},
    entities::factory,
    entities::soft_delete::SoftDelete,
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        categories::CategoryService,
        contains_ci,
        locations::{LocationChain, LocationService},
        page_bounds, restore_existing,
        slug::unique_slug,
        soft_delete_existing, Actor,
    },
    PaginatedResponse,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

pub const BLOG_PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BlogPostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub excerpt: String,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub country_id: Option<Uuid>,
    pub state_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
    #[serde(default)]
    pub is_published: bool,
    /// Factories the post mentions
    #[serde(default)]
    pub related_factory_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BlogFilter {
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub country_id: Option<Uuid>,
    pub state_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
    pub page: Option<u64>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BlogStatistics {
    /// Deleted posts included
    pub total_posts: u64,
    pub published_posts: u64,
    pub draft_posts: u64,
    pub deleted_posts: u64,
}

#[derive(Debug, Serialize)]
pub struct BlogPostDetail {
    #[serde(flatten)]
    pub post: blog_post::Model,
    pub related_factories: Vec<factory::Model>,
}

#[derive(Clone)]
pub struct BlogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl BlogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn validate_links(&self, request: &BlogPostRequest) -> Result<(), ServiceError> {
        let db = &*self.db;
        match request.category_id {
            Some(category_id) => {
                CategoryService::check_pair(db, category_id, request.subcategory_id).await?
            }
            None if request.subcategory_id.is_some() => {
                return Err(ServiceError::ValidationError(
                    "A subcategory requires a category".to_string(),
                ))
            }
            None => {}
        }
        LocationService::check_chain(
            db,
            LocationChain {
                country_id: request.country_id,
                state_id: request.state_id,
                city_id: request.city_id,
                district_id: request.district_id,
                region_id: request.region_id,
            },
        )
        .await
    }

    /// Creates a post owned by `author_id`. Publishing on creation stamps `published_at`.
    ///
    /// # Arguments
    ///
    /// * `author_id` - the signed-in author
    /// * `request` - content, taxonomy and location links, and related factories
    ///
    /// # Errors
    ///
    /// * [`ServiceError::ValidationError`] - invalid fields, or links that do not nest
    /// * [`ServiceError::NotFound`] - a linked category, location or factory is missing
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn create_post(
        &self,
        author_id: Uuid,
        request: BlogPostRequest,
    ) -> Result<blog_post::Model, ServiceError> {
        request.validate()?;
        self.validate_links(&request).await?;

        let txn = self.db.begin().await?;
        let slug = unique_slug::<blog_post::Entity, _>(&txn, blog_post::Column::Slug, &request.title)
            .await?;
        let now = Utc::now();
        let post = blog_post::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(request.title.trim().to_string()),
            slug: Set(slug),
            content: Set(request.content),
            excerpt: Set(request.excerpt),
            author_id: Set(Some(author_id)),
            category_id: Set(request.category_id),
            subcategory_id: Set(request.subcategory_id),
            country_id: Set(request.country_id),
            state_id: Set(request.state_id),
            city_id: Set(request.city_id),
            district_id: Set(request.district_id),
            region_id: Set(request.region_id),
            is_published: Set(request.is_published),
            published_at: Set(request.is_published.then_some(now)),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        link_factories(&txn, post.id, &request.related_factory_ids).await?;
        txn.commit().await?;

        info!(post_id = %post.id, slug = %post.slug, "Blog post created");
        Ok(post)
    }

    /// Replaces the post content and its related factories. The slug is kept.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Forbidden`] unless `actor` is the author or staff, plus
    /// the validation errors of [`BlogService::create_post`].
    #[instrument(skip(self, request))]
    pub async fn update_post(
        &self,
        actor: Actor,
        slug: &str,
        request: BlogPostRequest,
    ) -> Result<blog_post::Model, ServiceError> {
        request.validate()?;
        let existing = self.find_post(slug).await?;
        self.ensure_author(actor, &existing)?;
        self.validate_links(&request).await?;

        let txn = self.db.begin().await?;
        let first_publish = request.is_published && existing.published_at.is_none();
        let mut model: blog_post::ActiveModel = existing.into();
        model.title = Set(request.title.trim().to_string());
        model.content = Set(request.content);
        model.excerpt = Set(request.excerpt);
        model.category_id = Set(request.category_id);
        model.subcategory_id = Set(request.subcategory_id);
        model.country_id = Set(request.country_id);
        model.state_id = Set(request.state_id);
        model.city_id = Set(request.city_id);
        model.district_id = Set(request.district_id);
        model.region_id = Set(request.region_id);
        model.is_published = Set(request.is_published);
        if first_publish {
            model.published_at = Set(Some(Utc::now()));
        }
        model.updated_at = Set(Utc::now());
        let post = model.update(&txn).await?;

        blog_post_factory::Entity::delete_many()
            .filter(blog_post_factory::Column::BlogPostId.eq(post.id))
            .exec(&txn)
            .await?;
        link_factories(&txn, post.id, &request.related_factory_ids).await?;
        txn.commit().await?;

        Ok(post)
    }

    fn ensure_author(&self, actor: Actor, post: &blog_post::Model) -> Result<(), ServiceError> {
        if actor.can_manage(post.author_id) {
            Ok(())
        } else {
            warn!(post_id = %post.id, user_id = %actor.user_id, "Blog edit denied");
            Err(ServiceError::Forbidden(
                "Only the author can change this post".to_string(),
            ))
        }
    }

    /// Any non-deleted post, drafts included.
    pub async fn find_post(&self, slug: &str) -> Result<blog_post::Model, ServiceError> {
        blog_post::Entity::find_active()
            .filter(blog_post::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Blog post", slug))
    }

    /// Public detail: published posts only, with their factories.
    pub async fn get_published(&self, slug: &str) -> Result<BlogPostDetail, ServiceError> {
        let post = blog_post::Entity::find_active()
            .filter(blog_post::Column::Slug.eq(slug))
            .filter(blog_post::Column::IsPublished.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Blog post", slug))?;
        let related_factories = self.related_factories(post.id).await?;
        Ok(BlogPostDetail {
            post,
            related_factories,
        })
    }

    /// Linked factories that are still live.
    pub async fn related_factories(&self, post_id: Uuid) -> Result<Vec<factory::Model>, ServiceError> {
        let ids: Vec<Uuid> = blog_post_factory::Entity::find()
            .filter(blog_post_factory::Column::BlogPostId.eq(post_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|link| link.factory_id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(factory::Entity::find_active()
            .filter(factory::Column::Id.is_in(ids))
            .filter(factory::Column::IsActive.eq(true))
            .order_by_asc(factory::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Published posts, newest first.
    #[instrument(skip(self))]
    pub async fn list_published(
        &self,
        filter: BlogFilter,
    ) -> Result<PaginatedResponse<blog_post::Model>, ServiceError> {
        let mut query =
            blog_post::Entity::find_active().filter(blog_post::Column::IsPublished.eq(true));

        if let Some(term) = filter.q.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(contains_ci::<blog_post::Entity>(blog_post::Column::Title, term));
        }
        if let Some(id) = filter.category_id {
            query = query.filter(blog_post::Column::CategoryId.eq(id));
        }
        if let Some(id) = filter.country_id {
            query = query.filter(blog_post::Column::CountryId.eq(id));
        }
        if let Some(id) = filter.state_id {
            query = query.filter(blog_post::Column::StateId.eq(id));
        }
        if let Some(id) = filter.city_id {
            query = query.filter(blog_post::Column::CityId.eq(id));
        }
        if let Some(id) = filter.district_id {
            query = query.filter(blog_post::Column::DistrictId.eq(id));
        }
        if let Some(id) = filter.region_id {
            query = query.filter(blog_post::Column::RegionId.eq(id));
        }

        let (index, per_page) = page_bounds(filter.page.unwrap_or(1), BLOG_PAGE_SIZE);
        let paginator = query
            .order_by_desc(blog_post::Column::PublishedAt)
            .order_by_desc(blog_post::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(index).await?;
        Ok(PaginatedResponse::new(items, total, index + 1, per_page))
    }

    /// Back-office listing: drafts included, deleted excluded.
    pub async fn list_all(&self) -> Result<Vec<blog_post::Model>, ServiceError> {
        Ok(blog_post::Entity::find_active()
            .order_by_desc(blog_post::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Sets `published_at` only the first time a post goes live.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] for unknown or deleted posts, [`ServiceError::Forbidden`]
    /// for anyone but the author or staff.
    #[instrument(skip(self))]
    pub async fn publish(&self, actor: Actor, slug: &str) -> Result<blog_post::Model, ServiceError> {
        let existing = self.find_post(slug).await?;
        self.ensure_author(actor, &existing)?;
        let first_publish = existing.published_at.is_none();
        let mut model: blog_post::ActiveModel = existing.into();
        model.is_published = Set(true);
        if first_publish {
            model.published_at = Set(Some(Utc::now()));
        }
        model.updated_at = Set(Utc::now());
        let post = model.update(&*self.db).await?;
        info!(post_id = %post.id, "Blog post published");
        Ok(post)
    }

    #[instrument(skip(self))]
    pub async fn unpublish(&self, actor: Actor, slug: &str) -> Result<blog_post::Model, ServiceError> {
        let existing = self.find_post(slug).await?;
        self.ensure_author(actor, &existing)?;
        let mut model: blog_post::ActiveModel = existing.into();
        model.is_published = Set(false);
        model.updated_at = Set(Utc::now());
        let post = model.update(&*self.db).await?;
        info!(post_id = %post.id, "Blog post unpublished");
        Ok(post)
    }

    /// Soft deletes the post. Only the author or staff may do this.
    #[instrument(skip(self))]
    pub async fn delete_post(&self, actor: Actor, slug: &str) -> Result<(), ServiceError> {
        let post = self.find_post(slug).await?;
        self.ensure_author(actor, &post)?;
        if soft_delete_existing::<blog_post::Entity, _>(&*self.db, "Blog post", post.id).await? {
            self.event_sender
                .send_or_log(Event::RecordSoftDeleted {
                    kind: "blog_post".to_string(),
                    id: post.id,
                })
                .await;
        }
        Ok(())
    }

    pub async fn restore_post(&self, id: Uuid) -> Result<(), ServiceError> {
        restore_existing::<blog_post::Entity, _>(&*self.db, "Blog post", id).await?;
        Ok(())
    }

    pub async fn statistics(&self) -> Result<BlogStatistics, ServiceError> {
        let db = &*self.db;
        Ok(BlogStatistics {
            total_posts: blog_post::Entity::find_with_deleted().count(db).await?,
            published_posts: blog_post::Entity::find_active()
                .filter(blog_post::Column::IsPublished.eq(true))
                .count(db)
                .await?,
            draft_posts: blog_post::Entity::find_active()
                .filter(blog_post::Column::IsPublished.eq(false))
                .count(db)
                .await?,
            deleted_posts: blog_post::Entity::find_deleted_only().count(db).await?,
        })
    }
}

async fn link_factories<C: sea_orm::ConnectionTrait>(
    db: &C,
    post_id: Uuid,
    factory_ids: &[Uuid],
) -> Result<(), ServiceError> {
    let mut seen = std::collections::HashSet::new();
    for factory_id in factory_ids.iter().copied().filter(|id| seen.insert(*id)) {
        factory::Entity::find_active()
            .filter(factory::Column::Id.eq(factory_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Factory", factory_id))?;
        blog_post_factory::ActiveModel {
            blog_post_id: Set(post_id),
            factory_id: Set(factory_id),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}
