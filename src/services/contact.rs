use crate::{
    entities::content::contact_message,
    entities::soft_delete::SoftDelete,
    errors::ServiceError,
    events::{Event, EventSender},
    services::{contains_ci, page_bounds, soft_delete_existing},
    PaginatedResponse,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

pub const CONTACT_PAGE_SIZE: u64 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadState {
    Read,
    Unread,
}

/// Inbox filters. Dates are inclusive calendar days in UTC.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactFilter {
    pub search: Option<String>,
    pub status: Option<ReadState>,
    pub user_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactBulkAction {
    MarkRead,
    MarkUnread,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactBulkRequest {
    pub ids: Vec<Uuid>,
    pub action: ContactBulkAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactBulkResult {
    pub changed: u64,
}

/// Counts over the filtered inbox, not just the current page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactSummary {
    pub total: u64,
    pub unread: u64,
    pub read: u64,
    pub this_month: u64,
}

#[derive(Debug, Serialize)]
pub struct ContactInbox {
    pub messages: PaginatedResponse<contact_message::Model>,
    pub summary: ContactSummary,
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn filtered(filter: &ContactFilter) -> Select<contact_message::Entity> {
    let mut query = contact_message::Entity::find_active();
    if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        query = query.filter(
            Condition::any()
                .add(contains_ci::<contact_message::Entity>(
                    contact_message::Column::Name,
                    term,
                ))
                .add(contains_ci::<contact_message::Entity>(
                    contact_message::Column::Email,
                    term,
                ))
                .add(contains_ci::<contact_message::Entity>(
                    contact_message::Column::Subject,
                    term,
                ))
                .add(contains_ci::<contact_message::Entity>(
                    contact_message::Column::Message,
                    term,
                )),
        );
    }
    if let Some(status) = filter.status {
        query = query.filter(contact_message::Column::IsRead.eq(status == ReadState::Read));
    }
    if let Some(user_id) = filter.user_id {
        query = query.filter(contact_message::Column::UserId.eq(user_id));
    }
    if let Some(start) = filter.start_date {
        query = query.filter(contact_message::Column::CreatedAt.gte(start_of_day(start)));
    }
    if let Some(end) = filter.end_date {
        query = query.filter(
            contact_message::Column::CreatedAt.lt(start_of_day(end) + Duration::days(1)),
        );
    }
    query
}

/// Contact form submissions and the staff inbox.
#[derive(Clone)]
pub struct ContactService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ContactService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Stores a contact form submission as unread.
    ///
    /// # Arguments
    ///
    /// * `user_id` - the signed-in sender, if any
    /// * `request` - the form fields
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ValidationError`] when a field is empty or too long.
    #[instrument(skip(self, request), fields(subject = %request.subject))]
    pub async fn submit(
        &self,
        user_id: Option<Uuid>,
        request: ContactRequest,
    ) -> Result<contact_message::Model, ServiceError> {
        request.validate()?;
        let now = Utc::now();
        let message = contact_message::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            email: Set(request.email.trim().to_lowercase()),
            subject: Set(request.subject.trim().to_string()),
            message: Set(request.message),
            user_id: Set(user_id),
            is_read: Set(false),
            read_at: Set(None),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::ContactMessageReceived(message.id))
            .await;
        info!(message_id = %message.id, "Contact message received");
        Ok(message)
    }

    /// Newest first, with summary counts over the same filters.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: ContactFilter) -> Result<ContactInbox, ServiceError> {
        let db = &*self.db;
        let base = filtered(&filter);
        let today = Utc::now().date_naive();
        let month_start = start_of_day(today - Duration::days(i64::from(today.day0())));

        let summary = ContactSummary {
            total: base.clone().count(db).await?,
            unread: base
                .clone()
                .filter(contact_message::Column::IsRead.eq(false))
                .count(db)
                .await?,
            read: base
                .clone()
                .filter(contact_message::Column::IsRead.eq(true))
                .count(db)
                .await?,
            this_month: base
                .clone()
                .filter(contact_message::Column::CreatedAt.gte(month_start))
                .count(db)
                .await?,
        };

        let (index, per_page) = page_bounds(filter.page.unwrap_or(1), CONTACT_PAGE_SIZE);
        let paginator = base
            .order_by_desc(contact_message::Column::CreatedAt)
            .paginate(db, per_page);
        let items = paginator.fetch_page(index).await?;
        Ok(ContactInbox {
            messages: PaginatedResponse::new(items, summary.total, index + 1, per_page),
            summary,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<contact_message::Model, ServiceError> {
        contact_message::Entity::find_active()
            .filter(contact_message::Column::Id.eq(id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Contact message", id))
    }

    /// Sets the read flag. `read_at` records the first time a message was read
    /// and is cleared when it goes back to unread.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown or deleted messages.
    pub async fn set_read(
        &self,
        id: Uuid,
        read: bool,
    ) -> Result<contact_message::Model, ServiceError> {
        let message = self.get(id).await?;
        if message.is_read == read {
            return Ok(message);
        }
        let now = Utc::now();
        let mut model: contact_message::ActiveModel = message.into();
        model.is_read = Set(read);
        model.read_at = Set(read.then_some(now));
        model.updated_at = Set(now);
        Ok(model.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        if soft_delete_existing::<contact_message::Entity, _>(&*self.db, "Contact message", id)
            .await?
        {
            self.event_sender
                .send_or_log(Event::RecordSoftDeleted {
                    kind: "contact_message".to_string(),
                    id,
                })
                .await;
            info!(message_id = %id, "Contact message deleted");
        }
        Ok(())
    }

    /// Applies one action to many messages and returns how many changed.
    ///
    /// Unknown ids and messages already in the requested state are not counted.
    #[instrument(skip(self, request), fields(action = ?request.action, ids = request.ids.len()))]
    pub async fn bulk(
        &self,
        request: ContactBulkRequest,
    ) -> Result<ContactBulkResult, ServiceError> {
        if request.ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "Select at least one message".to_string(),
            ));
        }
        let messages = contact_message::Entity::find_active()
            .filter(contact_message::Column::Id.is_in(request.ids))
            .all(&*self.db)
            .await?;

        let mut changed = 0;
        for message in messages {
            let applies = match request.action {
                ContactBulkAction::MarkRead => !message.is_read,
                ContactBulkAction::MarkUnread => message.is_read,
                ContactBulkAction::Delete => true,
            };
            if !applies {
                continue;
            }
            match request.action {
                ContactBulkAction::MarkRead => {
                    self.set_read(message.id, true).await?;
                }
                ContactBulkAction::MarkUnread => {
                    self.set_read(message.id, false).await?;
                }
                ContactBulkAction::Delete => self.delete(message.id).await?,
            }
            changed += 1;
        }
        info!(changed, "Contact bulk action applied");
        Ok(ContactBulkResult { changed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_date_covers_the_whole_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let next = start_of_day(day) + Duration::days(1);
        assert_eq!(next.to_rfc3339(), "2024-04-01T00:00:00+00:00");
    }

    #[test]
    fn wire_names_are_snake_case() {
        let action: ContactBulkAction = serde_json::from_str("\"mark_unread\"").unwrap();
        assert_eq!(action, ContactBulkAction::MarkUnread);
        let state: ReadState = serde_json::from_str("\"unread\"").unwrap();
        assert_eq!(state, ReadState::Unread);
    }
}
