use crate::{
    entities::soft_delete::SoftDelete,
    entities::taxonomy::category,
    entities::work_experience,
    entities::worker::{self, Availability, Gender},
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
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, JoinType,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const WORKER_PAGE_SIZE: u64 = 10;

fn validate_wage(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative_wage"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WorkerRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Gender,
    #[validate(length(min = 7, max = 20))]
    pub phone_number: String,
    #[validate(email)]
    pub email: Option<String>,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    #[validate(range(min = 0, max = 70))]
    #[serde(default)]
    pub years_of_experience: i32,
    #[serde(default)]
    pub skills: String,
    pub availability: Availability,
    #[validate(custom = "validate_wage")]
    #[serde(default)]
    pub expected_daily_wage: Decimal,
    pub country_id: Option<Uuid>,
    pub state_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkerFilter {
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub country_id: Option<Uuid>,
    pub state_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
    pub availability: Option<Availability>,
    pub min_experience: Option<i32>,
    pub max_wage: Option<Decimal>,
    pub q: Option<String>,
    pub page: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExperienceRequest {
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    #[validate(length(min = 1, max = 100))]
    pub job_title: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Debug, Serialize)]
pub struct ExperienceView {
    #[serde(flatten)]
    pub experience: work_experience::Model,
    pub duration: String,
}

impl From<work_experience::Model> for ExperienceView {
    fn from(experience: work_experience::Model) -> Self {
        let duration = duration_display(experience.start_date, experience.end_date, experience.is_current);
        Self {
            experience,
            duration,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorkerProfile {
    #[serde(flatten)]
    pub worker: worker::Model,
    pub skill_list: Vec<String>,
    pub is_available: bool,
    pub experiences: Vec<ExperienceView>,
}

/// Checks a single experience on its own.
pub fn check_experience_dates(
    start: NaiveDate,
    end: Option<NaiveDate>,
    is_current: bool,
) -> Result<(), ServiceError> {
    if let Some(end) = end {
        if end < start {
            return Err(ServiceError::ValidationError(
                "End date cannot be before start date".to_string(),
            ));
        }
        if is_current {
            return Err(ServiceError::ValidationError(
                "Cannot have an end date for a current position".to_string(),
            ));
        }
    }
    Ok(())
}

/// Inclusive range overlap. An open end counts as `today`.
pub fn ranges_overlap(
    a: (NaiveDate, Option<NaiveDate>),
    b: (NaiveDate, Option<NaiveDate>),
    today: NaiveDate,
) -> bool {
    let a_end = a.1.unwrap_or(today);
    let b_end = b.1.unwrap_or(today);
    a.0 <= b_end && b.0 <= a_end
}

/// Human-readable length of a job, counting 30-day months.
pub fn duration_display(start: NaiveDate, end: Option<NaiveDate>, is_current: bool) -> String {
    match end {
        Some(end) => {
            let months = (end - start).num_days() / 30;
            let years = months / 12;
            let remaining = months % 12;
            match (years, remaining) {
                (0, _) => format!("{} months", months),
                (_, 0) => format!("{} years", years),
                _ => format!("{} years, {} months", years, remaining),
            }
        }
        None if is_current => "Ongoing".to_string(),
        None => "Duration not specified".to_string(),
    }
}

/// Comma-separated skills, trimmed.
pub fn skill_list(skills: &str) -> Vec<String> {
    skills
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Worker registry and work history.
#[derive(Clone)]
pub struct WorkerService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl WorkerService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn validate_links(&self, request: &WorkerRequest) -> Result<(), ServiceError> {
        let db = &*self.db;
        CategoryService::check_pair(db, request.category_id, request.subcategory_id).await?;
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

    /// # Arguments
    ///
    /// * `created_by` - the signed-in user, who may later edit the profile
    /// * `request` - profile fields with category and location links
    ///
    /// # Errors
    ///
    /// * [`ServiceError::ValidationError`] - invalid fields or mismatched links
    /// * [`ServiceError::NotFound`] - a referenced category or location is missing
    #[instrument(skip(self, request), fields(full_name = %request.full_name))]
    pub async fn register_worker(
        &self,
        created_by: Option<Uuid>,
        request: WorkerRequest,
    ) -> Result<worker::Model, ServiceError> {
        request.validate()?;
        self.validate_links(&request).await?;

        let db = &*self.db;
        let full_name = request.full_name.trim().to_string();
        let slug = unique_slug::<worker::Entity, _>(db, worker::Column::Slug, &full_name).await?;
        let now = Utc::now();
        let model = worker::ActiveModel {
            id: Set(Uuid::new_v4()),
            full_name: Set(full_name),
            date_of_birth: Set(request.date_of_birth),
            gender: Set(request.gender),
            phone_number: Set(request.phone_number),
            email: Set(request.email.unwrap_or_default()),
            category_id: Set(request.category_id),
            subcategory_id: Set(request.subcategory_id),
            years_of_experience: Set(request.years_of_experience),
            skills: Set(request.skills),
            availability: Set(request.availability),
            expected_daily_wage: Set(request.expected_daily_wage),
            country_id: Set(request.country_id),
            state_id: Set(request.state_id),
            city_id: Set(request.city_id),
            district_id: Set(request.district_id),
            region_id: Set(request.region_id),
            address: Set(request.address),
            slug: Set(slug),
            is_active: Set(true),
            is_verified: Set(false),
            created_by: Set(created_by),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(worker_id = %model.id, slug = %model.slug, "Worker registered");
        Ok(model)
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::Forbidden`] unless `actor` created the profile or is staff.
    #[instrument(skip(self, request))]
    pub async fn update_worker(
        &self,
        actor: Actor,
        slug: &str,
        request: WorkerRequest,
    ) -> Result<worker::Model, ServiceError> {
        request.validate()?;
        let existing = self.get_by_slug(slug).await?;
        self.ensure_manager(actor, &existing)?;
        self.validate_links(&request).await?;

        let mut model: worker::ActiveModel = existing.into();
        model.full_name = Set(request.full_name.trim().to_string());
        model.date_of_birth = Set(request.date_of_birth);
        model.gender = Set(request.gender);
        model.phone_number = Set(request.phone_number);
        model.email = Set(request.email.unwrap_or_default());
        model.category_id = Set(request.category_id);
        model.subcategory_id = Set(request.subcategory_id);
        model.years_of_experience = Set(request.years_of_experience);
        model.skills = Set(request.skills);
        model.availability = Set(request.availability);
        model.expected_daily_wage = Set(request.expected_daily_wage);
        model.country_id = Set(request.country_id);
        model.state_id = Set(request.state_id);
        model.city_id = Set(request.city_id);
        model.district_id = Set(request.district_id);
        model.region_id = Set(request.region_id);
        model.address = Set(request.address);
        model.updated_at = Set(Utc::now());

        Ok(model.update(&*self.db).await?)
    }

    fn ensure_manager(&self, actor: Actor, worker: &worker::Model) -> Result<(), ServiceError> {
        if actor.can_manage(worker.created_by) {
            Ok(())
        } else {
            warn!(worker_id = %worker.id, user_id = %actor.user_id, "Worker edit denied");
            Err(ServiceError::Forbidden(
                "You can only manage your own worker profile".to_string(),
            ))
        }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<worker::Model, ServiceError> {
        worker::Entity::find_active()
            .filter(worker::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Worker", slug))
    }

    pub async fn profile(&self, slug: &str) -> Result<WorkerProfile, ServiceError> {
        let worker = self.get_by_slug(slug).await?;
        let experiences = worker
            .find_related(work_experience::Entity)
            .order_by_desc(work_experience::Column::StartDate)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(ExperienceView::from)
            .collect();
        Ok(WorkerProfile {
            skill_list: skill_list(&worker.skills),
            is_available: worker.is_available(),
            worker,
            experiences,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_workers(
        &self,
        filter: WorkerFilter,
    ) -> Result<PaginatedResponse<worker::Model>, ServiceError> {
        let mut query = worker::Entity::find_active().filter(worker::Column::IsActive.eq(true));

        if let Some(id) = filter.category_id {
            query = query.filter(worker::Column::CategoryId.eq(id));
        }
        if let Some(id) = filter.subcategory_id {
            query = query.filter(worker::Column::SubcategoryId.eq(id));
        }
        if let Some(id) = filter.country_id {
            query = query.filter(worker::Column::CountryId.eq(id));
        }
        if let Some(id) = filter.state_id {
            query = query.filter(worker::Column::StateId.eq(id));
        }
        if let Some(id) = filter.city_id {
            query = query.filter(worker::Column::CityId.eq(id));
        }
        if let Some(id) = filter.district_id {
            query = query.filter(worker::Column::DistrictId.eq(id));
        }
        if let Some(id) = filter.region_id {
            query = query.filter(worker::Column::RegionId.eq(id));
        }
        if let Some(availability) = filter.availability {
            query = query.filter(worker::Column::Availability.eq(availability));
        }
        if let Some(min) = filter.min_experience {
            query = query.filter(worker::Column::YearsOfExperience.gte(min));
        }
        if let Some(max) = filter.max_wage {
            query = query.filter(worker::Column::ExpectedDailyWage.lte(max));
        }
        if let Some(term) = filter.q.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query
                .join(JoinType::LeftJoin, worker::Relation::Category.def())
                .filter(
                    Condition::any()
                        .add(contains_ci::<worker::Entity>(worker::Column::FullName, term))
                        .add(contains_ci::<worker::Entity>(worker::Column::Skills, term))
                        .add(contains_ci::<worker::Entity>(worker::Column::Address, term))
                        .add(contains_ci::<category::Entity>(category::Column::Name, term)),
                );
        }

        let (index, per_page) = page_bounds(filter.page.unwrap_or(1), WORKER_PAGE_SIZE);
        let paginator = query
            .order_by_desc(worker::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(index).await?;
        Ok(PaginatedResponse::new(items, total, index + 1, per_page))
    }

    #[instrument(skip(self))]
    pub async fn delete_worker(&self, actor: Actor, slug: &str) -> Result<(), ServiceError> {
        let worker = self.get_by_slug(slug).await?;
        self.ensure_manager(actor, &worker)?;
        if soft_delete_existing::<worker::Entity, _>(&*self.db, "Worker", worker.id).await? {
            self.event_sender
                .send_or_log(Event::RecordSoftDeleted {
                    kind: "worker".to_string(),
                    id: worker.id,
                })
                .await;
        }
        Ok(())
    }

    pub async fn restore_worker(&self, id: Uuid) -> Result<(), ServiceError> {
        restore_existing::<worker::Entity, _>(&*self.db, "Worker", id).await?;
        Ok(())
    }

    async fn check_overlap(
        &self,
        worker_id: Uuid,
        exclude: Option<Uuid>,
        request: &ExperienceRequest,
    ) -> Result<(), ServiceError> {
        let mut query = work_experience::Entity::find()
            .filter(work_experience::Column::WorkerId.eq(worker_id));
        if let Some(id) = exclude {
            query = query.filter(work_experience::Column::Id.ne(id));
        }
        let today = Utc::now().date_naive();
        let clash = query.all(&*self.db).await?.into_iter().any(|other| {
            ranges_overlap(
                (request.start_date, request.end_date),
                (other.start_date, other.end_date),
                today,
            )
        });
        if clash {
            return Err(ServiceError::ValidationError(
                "Work experience dates overlap with existing experience".to_string(),
            ));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// * [`ServiceError::ValidationError`] - bad dates, or the range overlaps another entry
    /// * [`ServiceError::Forbidden`] - `actor` does not manage the worker
    #[instrument(skip(self, request))]
    pub async fn add_experience(
        &self,
        actor: Actor,
        slug: &str,
        request: ExperienceRequest,
    ) -> Result<work_experience::Model, ServiceError> {
        request.validate()?;
        check_experience_dates(request.start_date, request.end_date, request.is_current)?;
        let worker = self.get_by_slug(slug).await?;
        self.ensure_manager(actor, &worker)?;
        self.check_overlap(worker.id, None, &request).await?;

        let model = work_experience::ActiveModel {
            id: Set(Uuid::new_v4()),
            worker_id: Set(worker.id),
            company_name: Set(request.company_name),
            job_title: Set(request.job_title),
            start_date: Set(request.start_date),
            end_date: Set(request.end_date),
            description: Set(request.description),
            is_current: Set(request.is_current),
        }
        .insert(&*self.db)
        .await?;
        info!(worker_id = %worker.id, experience_id = %model.id, "Work experience added");
        Ok(model)
    }

    async fn owned_experience(
        &self,
        actor: Actor,
        experience_id: Uuid,
    ) -> Result<work_experience::Model, ServiceError> {
        let experience = work_experience::Entity::find_by_id(experience_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Work experience", experience_id))?;
        let worker = worker::Entity::find_by_id(experience.worker_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Worker", experience.worker_id))?;
        self.ensure_manager(actor, &worker)?;
        Ok(experience)
    }

    #[instrument(skip(self, request))]
    pub async fn update_experience(
        &self,
        actor: Actor,
        experience_id: Uuid,
        request: ExperienceRequest,
    ) -> Result<work_experience::Model, ServiceError> {
        request.validate()?;
        check_experience_dates(request.start_date, request.end_date, request.is_current)?;
        let existing = self.owned_experience(actor, experience_id).await?;
        self.check_overlap(existing.worker_id, Some(existing.id), &request)
            .await?;

        let mut model: work_experience::ActiveModel = existing.into();
        model.company_name = Set(request.company_name);
        model.job_title = Set(request.job_title);
        model.start_date = Set(request.start_date);
        model.end_date = Set(request.end_date);
        model.description = Set(request.description);
        model.is_current = Set(request.is_current);
        Ok(model.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_experience(&self, actor: Actor, experience_id: Uuid) -> Result<(), ServiceError> {
        let existing = self.owned_experience(actor, experience_id).await?;
        existing.delete(&*self.db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn end_before_start_is_rejected() {
        assert!(check_experience_dates(date(2020, 5, 1), Some(date(2020, 4, 30)), false).is_err());
        assert!(check_experience_dates(date(2020, 5, 1), Some(date(2020, 5, 1)), false).is_ok());
    }

    #[test]
    fn current_position_has_no_end() {
        assert!(check_experience_dates(date(2020, 1, 1), Some(date(2021, 1, 1)), true).is_err());
        assert!(check_experience_dates(date(2020, 1, 1), None, true).is_ok());
    }

    #[test]
    fn overlap_is_inclusive_and_open_end_means_today() {
        let today = date(2024, 6, 1);
        let a = (date(2019, 1, 1), Some(date(2020, 1, 1)));
        assert!(ranges_overlap(a, (date(2020, 1, 1), None), today));
        assert!(!ranges_overlap(a, (date(2020, 1, 2), Some(date(2021, 1, 1))), today));
        assert!(ranges_overlap(
            (date(2023, 1, 1), None),
            (date(2024, 5, 1), Some(date(2024, 7, 1))),
            today
        ));
        assert!(!ranges_overlap(
            (date(2023, 1, 1), None),
            (date(2024, 6, 2), Some(date(2024, 7, 1))),
            today
        ));
    }

    #[test]
    fn duration_uses_thirty_day_months() {
        assert_eq!(
            duration_display(date(2020, 1, 1), Some(date(2022, 3, 1)), false),
            "2 years, 2 months"
        );
        assert_eq!(
            duration_display(date(2020, 1, 1), Some(date(2021, 1, 1)), false),
            "1 years"
        );
        assert_eq!(
            duration_display(date(2020, 1, 1), Some(date(2020, 3, 15)), false),
            "2 months"
        );
        assert_eq!(duration_display(date(2020, 1, 1), None, true), "Ongoing");
        assert_eq!(
            duration_display(date(2020, 1, 1), None, false),
            "Duration not specified"
        );
    }

    #[test]
    fn skills_split_and_trim() {
        assert_eq!(skill_list("welding, lathe ,,CNC"), vec!["welding", "lathe", "CNC"]);
    }
}
