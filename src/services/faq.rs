use crate::{
    entities::content::{
        faq_feedback, faq_question,
        faq_question::FaqStatus,
        faq_search_log,
    },
    entities::soft_delete::SoftDelete,
    entities::taxonomy::category,
    errors::ServiceError,
    events::{Event, EventSender},
    services::{contains_ci, page_bounds, restore_existing, slug::unique_slug, soft_delete_existing},
    PaginatedResponse,
};
use chrono::Utc;
use sea_orm::{
    sea_query::{Alias, Condition, Expr},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

pub const FAQ_PAGE_SIZE: u64 = 10;
pub const RELATED_QUESTIONS: u64 = 3;
const TOP_LIMIT: u64 = 10;
const RECENT_SEARCHES: u64 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FaqRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub category_id: Uuid,
    #[validate(length(min = 1))]
    pub question_text: String,
    #[validate(length(min = 1))]
    pub answer_text: String,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub comment: String,
    pub is_helpful: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FaqSearchQuery {
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub page: Option<u64>,
}

/// Published question with what the detail page shows next to it.
#[derive(Debug, Serialize)]
pub struct FaqQuestionView {
    #[serde(flatten)]
    pub question: faq_question::Model,
    pub tags: Vec<String>,
    pub related: Vec<faq_question::Model>,
    pub average_rating: Option<f64>,
    pub feedback_count: usize,
}

#[derive(Debug, Serialize)]
pub struct FaqCategoryCount {
    pub category: category::Model,
    pub question_count: u64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SearchTerm {
    pub query: String,
    pub hits: i64,
}

#[derive(Debug, Serialize)]
pub struct FaqStatistics {
    pub published: u64,
    pub drafts: u64,
    pub archived: u64,
    pub deleted: u64,
    pub total_feedback: u64,
    pub total_searches: u64,
    pub average_rating: Option<f64>,
    pub helpful_count: u64,
    pub not_helpful_count: u64,
    pub top_viewed: Vec<faq_question::Model>,
    pub popular_searches: Vec<SearchTerm>,
    pub recent_searches: Vec<faq_search_log::Model>,
}

/// Who asked: feeds feedback and search logs.
#[derive(Debug, Clone, Default)]
pub struct Visitor {
    pub user_id: Option<Uuid>,
    pub ip_address: Option<String>,
}

fn average(ratings: &[i32]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    Some(((sum as f64 / ratings.len() as f64) * 100.0).round() / 100.0)
}

/// Questions, feedback and the search log.
#[derive(Clone)]
pub struct FaqService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl FaqService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn check_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        category::Entity::find_active()
            .filter(category::Column::Id.eq(category_id))
            .one(&*self.db)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found("Category", category_id))
    }

    /// # Arguments
    ///
    /// * `author_id` - the staff member creating it, if known
    /// * `request` - question, answer and `publish` flag
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ValidationError`] for invalid fields and
    /// [`ServiceError::NotFound`] for an unknown category.
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn create_question(
        &self,
        author_id: Option<Uuid>,
        request: FaqRequest,
    ) -> Result<faq_question::Model, ServiceError> {
        request.validate()?;
        self.check_category(request.category_id).await?;
        let db = &*self.db;

        let slug =
            unique_slug::<faq_question::Entity, _>(db, faq_question::Column::Slug, &request.title)
                .await?;
        let now = Utc::now();
        let status = if request.publish {
            FaqStatus::Published
        } else {
            FaqStatus::Draft
        };
        let question = faq_question::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(request.title.trim().to_string()),
            slug: Set(slug),
            category_id: Set(request.category_id),
            question_text: Set(request.question_text),
            answer_text: Set(request.answer_text),
            status: Set(status),
            is_featured: Set(request.is_featured),
            view_count: Set(0),
            tags: Set(faq_question::tags_list(&request.tags).join(", ")),
            sort_order: Set(request.sort_order),
            created_by: Set(author_id),
            updated_by: Set(author_id),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(question_id = %question.id, status = %question.status, "FAQ question created");
        Ok(question)
    }

    /// Replaces the content; the slug and view counter are kept.
    #[instrument(skip(self, request))]
    pub async fn update_question(
        &self,
        editor_id: Option<Uuid>,
        slug: &str,
        request: FaqRequest,
    ) -> Result<faq_question::Model, ServiceError> {
        request.validate()?;
        let existing = self.find_question(slug).await?;
        if existing.category_id != request.category_id {
            self.check_category(request.category_id).await?;
        }

        let mut model: faq_question::ActiveModel = existing.into();
        model.title = Set(request.title.trim().to_string());
        model.category_id = Set(request.category_id);
        model.question_text = Set(request.question_text);
        model.answer_text = Set(request.answer_text);
        model.is_featured = Set(request.is_featured);
        model.tags = Set(faq_question::tags_list(&request.tags).join(", "));
        model.sort_order = Set(request.sort_order);
        if request.publish {
            model.status = Set(FaqStatus::Published);
        }
        model.updated_by = Set(editor_id);
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db).await?)
    }

    pub async fn publish(&self, slug: &str) -> Result<faq_question::Model, ServiceError> {
        self.set_status(slug, FaqStatus::Published).await
    }

    pub async fn archive(&self, slug: &str) -> Result<faq_question::Model, ServiceError> {
        self.set_status(slug, FaqStatus::Archived).await
    }

    #[instrument(skip(self))]
    async fn set_status(
        &self,
        slug: &str,
        status: FaqStatus,
    ) -> Result<faq_question::Model, ServiceError> {
        let existing = self.find_question(slug).await?;
        let mut model: faq_question::ActiveModel = existing.into();
        model.status = Set(status);
        model.updated_at = Set(Utc::now());
        let question = model.update(&*self.db).await?;
        info!(question_id = %question.id, status = %status, "FAQ status changed");
        Ok(question)
    }

    #[instrument(skip(self))]
    pub async fn delete_question(&self, slug: &str) -> Result<(), ServiceError> {
        let question = self.find_question(slug).await?;
        if soft_delete_existing::<faq_question::Entity, _>(&*self.db, "FAQ question", question.id)
            .await?
        {
            self.event_sender
                .send_or_log(Event::RecordSoftDeleted {
                    kind: "faq_question".to_string(),
                    id: question.id,
                })
                .await;
        }
        Ok(())
    }

    pub async fn restore_question(&self, id: Uuid) -> Result<(), ServiceError> {
        restore_existing::<faq_question::Entity, _>(&*self.db, "FAQ question", id).await?;
        Ok(())
    }

    /// Any non-deleted question regardless of status.
    pub async fn find_question(&self, slug: &str) -> Result<faq_question::Model, ServiceError> {
        faq_question::Entity::find_active()
            .filter(faq_question::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("FAQ question", slug))
    }

    fn published() -> sea_orm::Select<faq_question::Entity> {
        faq_question::Entity::find_active()
            .filter(faq_question::Column::Status.eq(FaqStatus::Published))
    }

    /// Featured first, then manual order, then title.
    pub async fn list_published(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<faq_question::Model>, ServiceError> {
        let mut query = Self::published();
        if let Some(category_id) = category_id {
            query = query.filter(faq_question::Column::CategoryId.eq(category_id));
        }
        Ok(query
            .order_by_desc(faq_question::Column::IsFeatured)
            .order_by_asc(faq_question::Column::SortOrder)
            .order_by_asc(faq_question::Column::Title)
            .all(&*self.db)
            .await?)
    }

    pub async fn featured(&self) -> Result<Vec<faq_question::Model>, ServiceError> {
        Ok(Self::published()
            .filter(faq_question::Column::IsFeatured.eq(true))
            .order_by_asc(faq_question::Column::SortOrder)
            .order_by_asc(faq_question::Column::Title)
            .all(&*self.db)
            .await?)
    }

    /// Active categories holding at least one published question.
    pub async fn categories_with_counts(&self) -> Result<Vec<FaqCategoryCount>, ServiceError> {
        let db = &*self.db;
        let categories = category::Entity::find_active()
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::Name)
            .all(db)
            .await?;

        let mut counts = Vec::new();
        for category in categories {
            let question_count = Self::published()
                .filter(faq_question::Column::CategoryId.eq(category.id))
                .count(db)
                .await?;
            if question_count > 0 {
                counts.push(FaqCategoryCount {
                    category,
                    question_count,
                });
            }
        }
        Ok(counts)
    }

    /// Public detail. Counts the view before loading the rest.
    #[instrument(skip(self))]
    pub async fn view_question(&self, slug: &str) -> Result<FaqQuestionView, ServiceError> {
        let db = &*self.db;
        let found = Self::published()
            .filter(faq_question::Column::Slug.eq(slug))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("FAQ question", slug))?;

        faq_question::Entity::update_many()
            .col_expr(
                faq_question::Column::ViewCount,
                Expr::col(faq_question::Column::ViewCount).add(1),
            )
            .filter(faq_question::Column::Id.eq(found.id))
            .exec(db)
            .await?;
        let question = faq_question::Model {
            view_count: found.view_count + 1,
            ..found
        };

        let related = Self::published()
            .filter(faq_question::Column::CategoryId.eq(question.category_id))
            .filter(faq_question::Column::Id.ne(question.id))
            .order_by_desc(faq_question::Column::IsFeatured)
            .order_by_desc(faq_question::Column::ViewCount)
            .limit(RELATED_QUESTIONS)
            .all(db)
            .await?;

        let ratings: Vec<i32> = faq_feedback::Entity::find()
            .select_only()
            .column(faq_feedback::Column::Rating)
            .filter(faq_feedback::Column::QuestionId.eq(question.id))
            .into_tuple()
            .all(db)
            .await?;

        Ok(FaqQuestionView {
            tags: question.tags_list(),
            related,
            average_rating: average(&ratings),
            feedback_count: ratings.len(),
            question,
        })
    }

    /// Published questions matching title, question, answer or tags.
    /// Non-empty queries are written to the search log.
    #[instrument(skip(self, visitor))]
    pub async fn search(
        &self,
        params: FaqSearchQuery,
        visitor: &Visitor,
    ) -> Result<PaginatedResponse<faq_question::Model>, ServiceError> {
        let db = &*self.db;
        let (index, per_page) = page_bounds(params.page.unwrap_or(1), FAQ_PAGE_SIZE);
        let term = params.q.as_deref().map(str::trim).unwrap_or_default();
        if term.is_empty() {
            return Ok(PaginatedResponse::new(Vec::new(), 0, index + 1, per_page));
        }

        let mut query = Self::published().filter(
            Condition::any()
                .add(contains_ci::<faq_question::Entity>(faq_question::Column::Title, term))
                .add(contains_ci::<faq_question::Entity>(
                    faq_question::Column::QuestionText,
                    term,
                ))
                .add(contains_ci::<faq_question::Entity>(
                    faq_question::Column::AnswerText,
                    term,
                ))
                .add(contains_ci::<faq_question::Entity>(faq_question::Column::Tags, term)),
        );
        if let Some(category_id) = params.category_id {
            query = query.filter(faq_question::Column::CategoryId.eq(category_id));
        }

        let paginator = query
            .order_by_desc(faq_question::Column::IsFeatured)
            .order_by_desc(faq_question::Column::ViewCount)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(index).await?;

        faq_search_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            search_query: Set(term.to_string()),
            results_count: Set(i32::try_from(total).unwrap_or(i32::MAX)),
            ip_address: Set(visitor.ip_address.clone()),
            user_id: Set(visitor.user_id),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        info!(query = %term, results = total, "FAQ search");
        Ok(PaginatedResponse::new(items, total, index + 1, per_page))
    }

    /// One feedback per question from each signed-in user, or from each IP address
    /// for anonymous visitors. Anonymous visitors without an address are not limited.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::NotFound`] - no published question with this slug
    /// * [`ServiceError::Conflict`] - this visitor already gave feedback
    #[instrument(skip(self, request, visitor))]
    pub async fn submit_feedback(
        &self,
        slug: &str,
        request: FeedbackRequest,
        visitor: &Visitor,
    ) -> Result<faq_feedback::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let question = Self::published()
            .filter(faq_question::Column::Slug.eq(slug))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("FAQ question", slug))?;

        let previous = match (visitor.user_id, visitor.ip_address.as_deref()) {
            (Some(user_id), _) => {
                Some(Condition::all().add(faq_feedback::Column::UserId.eq(user_id)))
            }
            (None, Some(ip)) => Some(
                Condition::all()
                    .add(faq_feedback::Column::UserId.is_null())
                    .add(faq_feedback::Column::IpAddress.eq(ip)),
            ),
            (None, None) => None,
        };
        if let Some(previous) = previous {
            let existing = faq_feedback::Entity::find()
                .filter(faq_feedback::Column::QuestionId.eq(question.id))
                .filter(previous)
                .one(db)
                .await?;
            if existing.is_some() {
                warn!(question_id = %question.id, "Duplicate FAQ feedback");
                return Err(ServiceError::Conflict(
                    "You have already provided feedback for this question".to_string(),
                ));
            }
        }

        let feedback = faq_feedback::ActiveModel {
            id: Set(Uuid::new_v4()),
            question_id: Set(question.id),
            user_id: Set(visitor.user_id),
            rating: Set(request.rating),
            comment: Set(request.comment.trim().to_string()),
            is_helpful: Set(request.is_helpful),
            ip_address: Set(visitor.ip_address.clone()),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;
        info!(question_id = %question.id, rating = feedback.rating, "FAQ feedback recorded");
        Ok(feedback)
    }

    #[instrument(skip(self))]
    pub async fn statistics(&self) -> Result<FaqStatistics, ServiceError> {
        let db = &*self.db;
        let by_status = |status: FaqStatus| {
            faq_question::Entity::find_active().filter(faq_question::Column::Status.eq(status))
        };

        let ratings: Vec<i32> = faq_feedback::Entity::find()
            .select_only()
            .column(faq_feedback::Column::Rating)
            .into_tuple()
            .all(db)
            .await?;

        let popular: Vec<(String, i64)> = faq_search_log::Entity::find()
            .select_only()
            .column(faq_search_log::Column::SearchQuery)
            .column_as(Expr::col(faq_search_log::Column::Id).count(), "hits")
            .group_by(faq_search_log::Column::SearchQuery)
            .order_by_desc(Expr::col(Alias::new("hits")))
            .order_by_asc(faq_search_log::Column::SearchQuery)
            .limit(TOP_LIMIT)
            .into_tuple()
            .all(db)
            .await?;

        Ok(FaqStatistics {
            published: by_status(FaqStatus::Published).count(db).await?,
            drafts: by_status(FaqStatus::Draft).count(db).await?,
            archived: by_status(FaqStatus::Archived).count(db).await?,
            deleted: faq_question::Entity::find_deleted_only().count(db).await?,
            total_feedback: ratings.len() as u64,
            total_searches: faq_search_log::Entity::find().count(db).await?,
            average_rating: average(&ratings),
            helpful_count: faq_feedback::Entity::find()
                .filter(faq_feedback::Column::IsHelpful.eq(true))
                .count(db)
                .await?,
            not_helpful_count: faq_feedback::Entity::find()
                .filter(faq_feedback::Column::IsHelpful.eq(false))
                .count(db)
                .await?,
            top_viewed: Self::published()
                .order_by_desc(faq_question::Column::ViewCount)
                .limit(TOP_LIMIT)
                .all(db)
                .await?,
            popular_searches: popular
                .into_iter()
                .map(|(query, hits)| SearchTerm { query, hits })
                .collect(),
            recent_searches: faq_search_log::Entity::find()
                .order_by_desc(faq_search_log::Column::CreatedAt)
                .limit(RECENT_SEARCHES)
                .all(db)
                .await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_rating_rounds_to_two_places() {
        assert_eq!(average(&[]), None);
        assert_eq!(average(&[5]), Some(5.0));
        assert_eq!(average(&[4, 5, 5]), Some(4.67));
    }

    #[test]
    fn feedback_rating_is_bounded() {
        let mut request = FeedbackRequest {
            rating: 0,
            comment: String::new(),
            is_helpful: Some(true),
        };
        assert!(request.validate().is_err());
        request.rating = 6;
        assert!(request.validate().is_err());
        request.rating = 3;
        assert!(request.validate().is_ok());
    }
}
