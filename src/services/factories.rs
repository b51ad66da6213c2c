use crate::{
    entities::factory,
    entities::soft_delete::SoftDelete,
    entities::taxonomy::{category, city, country, district, region, state},
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::templates::FactoryDetails,
    services::{
        categories::CategoryService,
        contains_ci,
        locations::{LocationChain, LocationService},
        page_bounds, restore_existing,
        slug::unique_slug,
        soft_delete_existing,
    },
    PaginatedResponse,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Page size of the public factory listing
pub const FACTORY_PAGE_SIZE: u64 = 10;
const RELATED_LIMIT: u64 = 3;
const RECENT_LIMIT: u64 = 5;

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative_amount"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FactoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub country_id: Uuid,
    pub state_id: Uuid,
    pub city_id: Uuid,
    pub district_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(max = 10))]
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub contact_person: String,
    #[validate(length(max = 20))]
    #[serde(default)]
    pub contact_phone: String,
    #[validate(email)]
    pub contact_email: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    #[validate(range(min = 1800, max = 2100))]
    pub established_year: Option<i32>,
    #[validate(range(min = 0))]
    pub employee_count: Option<i32>,
    #[validate(custom = "validate_non_negative")]
    pub annual_turnover: Option<Decimal>,
    #[serde(default)]
    pub factory_type: String,
    #[serde(default)]
    pub production_capacity: String,
    #[serde(default)]
    pub working_hours: String,
    #[serde(default)]
    pub holidays: String,
    #[validate(custom = "validate_non_negative")]
    #[serde(default)]
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FactorySort {
    #[default]
    Name,
    CreatedAt,
    UpdatedAt,
    Category,
    Location,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FactoryFilter {
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub country_id: Option<Uuid>,
    pub state_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub factory_type: Option<String>,
    /// Defaults to active factories only
    pub is_active: Option<bool>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: FactorySort,
    pub page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct FactoryDashboard {
    pub total_factories: u64,
    pub active_factories: u64,
    pub verified_factories: u64,
    pub categories_with_factories: u64,
    pub recent_factories: Vec<factory::Model>,
}

/// Factory listings: CRUD, search and dashboard.
#[derive(Clone)]
pub struct FactoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl FactoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn validate_links(&self, request: &FactoryRequest) -> Result<(), ServiceError> {
        let db = &*self.db;
        CategoryService::check_pair(db, request.category_id, request.subcategory_id).await?;

        country::Entity::find_active()
            .filter(country::Column::Id.eq(request.country_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Country", request.country_id))?;
        LocationService::check_chain(
            db,
            LocationChain {
                country_id: Some(request.country_id),
                state_id: Some(request.state_id),
                city_id: Some(request.city_id),
                district_id: request.district_id,
                region_id: request.region_id,
            },
        )
        .await?;
        if request.region_id.is_some() && request.district_id.is_none() {
            return Err(ServiceError::ValidationError(
                "A region requires a district".to_string(),
            ));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// * [`ServiceError::ValidationError`] - invalid fields or mismatched category/location links
    /// * [`ServiceError::NotFound`] - a referenced category or location does not exist
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_factory(&self, request: FactoryRequest) -> Result<factory::Model, ServiceError> {
        request.validate()?;
        self.validate_links(&request).await?;

        let db = &*self.db;
        let slug = unique_slug::<factory::Entity, _>(db, factory::Column::Slug, &request.name).await?;
        let now = Utc::now();
        let model = factory::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            slug: Set(slug),
            description: Set(request.description),
            category_id: Set(request.category_id),
            subcategory_id: Set(request.subcategory_id),
            country_id: Set(request.country_id),
            state_id: Set(request.state_id),
            city_id: Set(request.city_id),
            district_id: Set(request.district_id),
            region_id: Set(request.region_id),
            address: Set(request.address),
            pincode: Set(request.pincode),
            contact_person: Set(request.contact_person),
            contact_phone: Set(request.contact_phone),
            contact_email: Set(request.contact_email.unwrap_or_default()),
            website: Set(request.website.unwrap_or_default()),
            established_year: Set(request.established_year),
            employee_count: Set(request.employee_count),
            annual_turnover: Set(request.annual_turnover),
            factory_type: Set(request.factory_type),
            production_capacity: Set(request.production_capacity),
            working_hours: Set(request.working_hours),
            holidays: Set(request.holidays),
            price: Set(request.price),
            is_active: Set(request.is_active),
            is_verified: Set(request.is_verified),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        self.event_sender
            .send_or_log(Event::FactoryCreated(model.id))
            .await;
        info!(factory_id = %model.id, slug = %model.slug, "Factory created");
        Ok(model)
    }

    /// Replaces the editable fields. The slug is kept.
    ///
    /// # Errors
    ///
    /// Same as [`FactoryService::create_factory`], plus [`ServiceError::NotFound`]
    /// for an unknown slug.
    #[instrument(skip(self, request))]
    pub async fn update_factory(
        &self,
        slug: &str,
        request: FactoryRequest,
    ) -> Result<factory::Model, ServiceError> {
        request.validate()?;
        let existing = self.find_editable(slug).await?;
        self.validate_links(&request).await?;

        let mut model: factory::ActiveModel = existing.into();
        model.name = Set(request.name.trim().to_string());
        model.description = Set(request.description);
        model.category_id = Set(request.category_id);
        model.subcategory_id = Set(request.subcategory_id);
        model.country_id = Set(request.country_id);
        model.state_id = Set(request.state_id);
        model.city_id = Set(request.city_id);
        model.district_id = Set(request.district_id);
        model.region_id = Set(request.region_id);
        model.address = Set(request.address);
        model.pincode = Set(request.pincode);
        model.contact_person = Set(request.contact_person);
        model.contact_phone = Set(request.contact_phone);
        model.contact_email = Set(request.contact_email.unwrap_or_default());
        model.website = Set(request.website.unwrap_or_default());
        model.established_year = Set(request.established_year);
        model.employee_count = Set(request.employee_count);
        model.annual_turnover = Set(request.annual_turnover);
        model.factory_type = Set(request.factory_type);
        model.production_capacity = Set(request.production_capacity);
        model.working_hours = Set(request.working_hours);
        model.holidays = Set(request.holidays);
        model.price = Set(request.price);
        model.is_active = Set(request.is_active);
        model.is_verified = Set(request.is_verified);
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db).await?;
        info!(factory_id = %updated.id, "Factory updated");
        Ok(updated)
    }

    /// Public detail lookup: active and not deleted.
    pub async fn get_by_slug(&self, slug: &str) -> Result<factory::Model, ServiceError> {
        factory::Entity::find_active()
            .filter(factory::Column::Slug.eq(slug))
            .filter(factory::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Factory", slug))
    }

    /// Back-office lookup: any non-deleted factory.
    pub async fn find_editable(&self, slug: &str) -> Result<factory::Model, ServiceError> {
        factory::Entity::find_active()
            .filter(factory::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Factory", slug))
    }

    #[instrument(skip(self))]
    pub async fn list_factories(
        &self,
        filter: FactoryFilter,
    ) -> Result<PaginatedResponse<factory::Model>, ServiceError> {
        let mut query = factory::Entity::find_active()
            .filter(factory::Column::IsActive.eq(filter.is_active.unwrap_or(true)));

        if let Some(id) = filter.category_id {
            query = query.filter(factory::Column::CategoryId.eq(id));
        }
        if let Some(id) = filter.subcategory_id {
            query = query.filter(factory::Column::SubcategoryId.eq(id));
        }
        if let Some(id) = filter.country_id {
            query = query.filter(factory::Column::CountryId.eq(id));
        }
        if let Some(id) = filter.state_id {
            query = query.filter(factory::Column::StateId.eq(id));
        }
        if let Some(id) = filter.city_id {
            query = query.filter(factory::Column::CityId.eq(id));
        }
        if let Some(kind) = filter.factory_type.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(contains_ci::<factory::Entity>(
                factory::Column::FactoryType,
                kind,
            ));
        }
        if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(contains_ci::<factory::Entity>(factory::Column::Name, term))
                    .add(contains_ci::<factory::Entity>(factory::Column::Description, term))
                    .add(contains_ci::<factory::Entity>(factory::Column::Address, term))
                    .add(contains_ci::<factory::Entity>(factory::Column::ContactPerson, term))
                    .add(contains_ci::<factory::Entity>(factory::Column::FactoryType, term)),
            );
        }

        query = match filter.sort {
            FactorySort::Name => query.order_by_asc(factory::Column::Name),
            FactorySort::CreatedAt => query.order_by_asc(factory::Column::CreatedAt),
            FactorySort::UpdatedAt => query.order_by_asc(factory::Column::UpdatedAt),
            FactorySort::Category => query
                .join(JoinType::InnerJoin, factory::Relation::Category.def())
                .order_by_asc(category::Column::Name)
                .order_by_asc(factory::Column::Name),
            FactorySort::Location => query
                .join(JoinType::InnerJoin, factory::Relation::Country.def())
                .join(JoinType::InnerJoin, factory::Relation::State.def())
                .join(JoinType::InnerJoin, factory::Relation::City.def())
                .order_by_asc(country::Column::Name)
                .order_by_asc(state::Column::Name)
                .order_by_asc(city::Column::Name)
                .order_by_asc(factory::Column::Name),
        };

        let page = filter.page.unwrap_or(1);
        let (index, per_page) = page_bounds(page, FACTORY_PAGE_SIZE);
        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(index).await?;

        Ok(PaginatedResponse::new(items, total, index + 1, per_page))
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown slug.
    #[instrument(skip(self))]
    pub async fn delete_factory(&self, slug: &str) -> Result<(), ServiceError> {
        let factory = self.find_editable(slug).await?;
        if soft_delete_existing::<factory::Entity, _>(&*self.db, "Factory", factory.id).await? {
            self.event_sender
                .send_or_log(Event::RecordSoftDeleted {
                    kind: "factory".to_string(),
                    id: factory.id,
                })
                .await;
            info!(factory_id = %factory.id, "Factory soft deleted");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn restore_factory(&self, id: Uuid) -> Result<(), ServiceError> {
        if restore_existing::<factory::Entity, _>(&*self.db, "Factory", id).await? {
            self.event_sender
                .send_or_log(Event::RecordRestored {
                    kind: "factory".to_string(),
                    id,
                })
                .await;
        }
        Ok(())
    }

    /// Flips `is_active` and returns the updated factory.
    #[instrument(skip(self))]
    pub async fn toggle_active(&self, slug: &str) -> Result<factory::Model, ServiceError> {
        let existing = self.find_editable(slug).await?;
        let active = !existing.is_active;
        let mut model: factory::ActiveModel = existing.into();
        model.is_active = Set(active);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;
        info!(factory_id = %updated.id, active, "Factory {}", if active { "activated" } else { "deactivated" });
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn toggle_verified(&self, slug: &str) -> Result<factory::Model, ServiceError> {
        let existing = self.find_editable(slug).await?;
        let verified = !existing.is_verified;
        let mut model: factory::ActiveModel = existing.into();
        model.is_verified = Set(verified);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;
        info!(factory_id = %updated.id, verified, "Factory verification toggled");
        Ok(updated)
    }

    /// Up to three other live factories from the same category.
    pub async fn related_factories(&self, slug: &str) -> Result<Vec<factory::Model>, ServiceError> {
        let factory = self.get_by_slug(slug).await?;
        Ok(factory::Entity::find_active()
            .filter(factory::Column::CategoryId.eq(factory.category_id))
            .filter(factory::Column::IsActive.eq(true))
            .filter(factory::Column::Id.ne(factory.id))
            .order_by_desc(factory::Column::CreatedAt)
            .limit(RELATED_LIMIT)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<FactoryDashboard, ServiceError> {
        let db = &*self.db;
        let total_factories = factory::Entity::find_active().count(db).await?;
        let active_factories = factory::Entity::find_active()
            .filter(factory::Column::IsActive.eq(true))
            .count(db)
            .await?;
        let verified_factories = factory::Entity::find_active()
            .filter(factory::Column::IsVerified.eq(true))
            .count(db)
            .await?;

        let category_ids: HashSet<Uuid> = factory::Entity::find_active()
            .select_only()
            .column(factory::Column::CategoryId)
            .into_tuple::<Uuid>()
            .all(db)
            .await?
            .into_iter()
            .collect();

        let recent_factories = factory::Entity::find_active()
            .order_by_desc(factory::Column::CreatedAt)
            .limit(RECENT_LIMIT)
            .all(db)
            .await?;

        Ok(FactoryDashboard {
            total_factories,
            active_factories,
            verified_factories,
            categories_with_factories: category_ids.len() as u64,
            recent_factories,
        })
    }

    pub async fn full_address(&self, factory: &factory::Model) -> Result<String, ServiceError> {
        let parts = AddressParts::load(&*self.db, factory).await?;
        Ok(full_address(&factory.address, &parts, &factory.pincode))
    }
}

/// Names of the location levels a factory points at
#[derive(Debug, Clone, Default)]
pub struct AddressParts {
    pub region: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
}

impl AddressParts {
    /// Looks the names up with deleted rows included so receipts never lose a level.
    pub async fn load<C: ConnectionTrait>(
        db: &C,
        factory: &factory::Model,
    ) -> Result<Self, ServiceError> {
        let region = match factory.region_id {
            Some(id) => region::Entity::find_by_id(id).one(db).await?.map(|r| r.name),
            None => None,
        };
        let district = match factory.district_id {
            Some(id) => district::Entity::find_by_id(id).one(db).await?.map(|d| d.name),
            None => None,
        };
        Ok(Self {
            region,
            district,
            city: city::Entity::find_by_id(factory.city_id)
                .one(db)
                .await?
                .map(|c| c.name),
            state: state::Entity::find_by_id(factory.state_id)
                .one(db)
                .await?
                .map(|s| s.name),
            country: country::Entity::find_by_id(factory.country_id)
                .one(db)
                .await?
                .map(|c| c.name),
            category: category::Entity::find_by_id(factory.category_id)
                .one(db)
                .await?
                .map(|c| c.name),
        })
    }
}

/// Comma-joins the non-empty parts: address, region, district, city, state, country, pincode.
pub fn full_address(address: &str, parts: &AddressParts, pincode: &str) -> String {
    [
        Some(address),
        parts.region.as_deref(),
        parts.district.as_deref(),
        parts.city.as_deref(),
        parts.state.as_deref(),
        parts.country.as_deref(),
        Some(pincode),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

/// Email rendering input for one factory.
pub async fn factory_details<C: ConnectionTrait>(
    db: &C,
    factory: &factory::Model,
) -> Result<FactoryDetails, ServiceError> {
    let parts = AddressParts::load(db, factory).await?;
    Ok(FactoryDetails {
        name: factory.name.clone(),
        category: parts.category.clone().unwrap_or_default(),
        location: full_address(&factory.address, &parts, &factory.pincode),
        factory_type: factory.factory_type.clone(),
        production_capacity: factory.production_capacity.clone(),
        employee_count: factory.employee_count,
        established_year: factory.established_year,
        annual_turnover: factory.annual_turnover,
        contact_person: factory.contact_person.clone(),
        contact_phone: factory.contact_phone.clone(),
        contact_email: factory.contact_email.clone(),
        website: factory.website.clone(),
        address: factory.address.clone(),
        city: parts.city.unwrap_or_default(),
        state: parts.state.unwrap_or_default(),
        pincode: factory.pincode.clone(),
        country: parts.country.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn full_address_skips_empty_parts() {
        let parts = AddressParts {
            region: None,
            district: Some("Haveli".into()),
            city: Some("Pune".into()),
            state: Some("Maharashtra".into()),
            country: Some("India".into()),
            category: None,
        };
        assert_eq!(
            full_address("Plot 7, MIDC", &parts, "411019"),
            "Plot 7, MIDC, Haveli, Pune, Maharashtra, India, 411019"
        );
        assert_eq!(
            full_address("", &AddressParts::default(), " "),
            ""
        );
    }

    #[test]
    fn sort_parses_from_query_values() {
        assert_eq!(FactorySort::from_str("created_at").unwrap(), FactorySort::CreatedAt);
        assert_eq!(FactorySort::from_str("location").unwrap(), FactorySort::Location);
        assert!(FactorySort::from_str("price").is_err());
        assert_eq!(FactorySort::default(), FactorySort::Name);
    }
}
