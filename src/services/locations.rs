use crate::{
    entities::soft_delete::SoftDelete,
    entities::taxonomy::{city, country, district, region, state},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{slug::unique_slug, soft_delete_existing},
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationError};

static ISO_ALPHA3: Lazy<Regex> = Lazy::new(|| Regex::new("^[A-Z]{3}$").expect("static code pattern"));

fn validate_iso_alpha3(code: &str) -> Result<(), ValidationError> {
    if ISO_ALPHA3.is_match(code) {
        Ok(())
    } else {
        Err(ValidationError::new("iso_alpha3"))
    }
}

fn validate_latitude(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::from(-90) && *value <= Decimal::from(90) {
        Ok(())
    } else {
        Err(ValidationError::new("latitude_range"))
    }
}

fn validate_longitude(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::from(-180) && *value <= Decimal::from(180) {
        Ok(())
    } else {
        Err(ValidationError::new("longitude_range"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCountryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// ISO 3166-1 alpha-3, upper case
    #[validate(custom = "validate_iso_alpha3")]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStateRequest {
    pub country_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 10))]
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCityRequest {
    pub state_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 10))]
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub is_capital: bool,
    #[validate(range(min = 0))]
    pub population: Option<i64>,
    pub area: Option<Decimal>,
    #[validate(custom = "validate_latitude")]
    pub latitude: Option<Decimal>,
    #[validate(custom = "validate_longitude")]
    pub longitude: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDistrictRequest {
    pub city_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 10))]
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRegionRequest {
    pub district_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 10))]
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCountryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(custom = "validate_iso_alpha3")]
    pub code: Option<String>,
}

/// Shared by states and districts, which only carry a name and a code.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePlaceRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 10))]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCityRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 10))]
    pub code: Option<String>,
    pub is_capital: Option<bool>,
    #[validate(range(min = 0))]
    pub population: Option<i64>,
    pub area: Option<Decimal>,
    #[validate(custom = "validate_latitude")]
    pub latitude: Option<Decimal>,
    #[validate(custom = "validate_longitude")]
    pub longitude: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateRegionRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 10))]
    pub code: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// A region with the names of every level above it.
#[derive(Debug, Clone, Serialize)]
pub struct LocationHierarchy {
    pub region: region::Model,
    pub district: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

impl LocationHierarchy {
    /// `"region, district, city, state, country"`
    pub fn display(&self) -> String {
        [
            self.region.name.as_str(),
            self.district.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.country.as_str(),
        ]
        .join(", ")
    }
}

/// The country → state → city → district → region tree.
///
/// Names are unique among siblings. Slugs are fixed at creation and survive
/// renames. A level can only be soft deleted once it has no live children.
#[derive(Clone)]
pub struct LocationService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

fn duplicate(kind: &str, name: &str, parent: &str) -> ServiceError {
    ServiceError::Conflict(format!("{} '{}' already exists in {}", kind, name, parent))
}

/// Fails when `parent` still has live rows of `E` pointing at it.
async fn ensure_no_children<E, C>(
    db: &C,
    parent_column: E::Column,
    parent_id: Uuid,
    parent: &str,
    children: &str,
) -> Result<(), ServiceError>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    let child = E::find_active()
        .filter(parent_column.eq(parent_id))
        .one(db)
        .await?;
    if child.is_some() {
        return Err(ServiceError::InvalidOperation(format!(
            "{} still has active {}; delete them first",
            parent, children
        )));
    }
    Ok(())
}

impl LocationService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// # Errors
    ///
    /// * [`ServiceError::ValidationError`] - the code is not three upper-case letters
    /// * [`ServiceError::Conflict`] - the name or code is taken
    #[instrument(skip(self))]
    pub async fn create_country(
        &self,
        request: CreateCountryRequest,
    ) -> Result<country::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let name = request.name.trim().to_string();

        let clash = country::Entity::find()
            .filter(
                sea_orm::Condition::any()
                    .add(country::Column::Name.eq(name.as_str()))
                    .add(country::Column::Code.eq(request.code.as_str())),
            )
            .one(db)
            .await?;
        if clash.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Country '{}' ({}) already exists",
                name, request.code
            )));
        }

        let slug = unique_slug::<country::Entity, _>(db, country::Column::Slug, &name).await?;
        let now = Utc::now();
        let model = country::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            code: Set(request.code),
            slug: Set(slug),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        info!(country_id = %model.id, "Country created");
        Ok(model)
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown country and
    /// [`ServiceError::Conflict`] when the country already has a state of that name.
    #[instrument(skip(self))]
    pub async fn create_state(
        &self,
        request: CreateStateRequest,
    ) -> Result<state::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let parent = self.get_country(request.country_id).await?;
        let name = request.name.trim().to_string();

        let clash = state::Entity::find()
            .filter(state::Column::CountryId.eq(parent.id))
            .filter(state::Column::Name.eq(name.as_str()))
            .one(db)
            .await?;
        if clash.is_some() {
            return Err(duplicate("State", &name, &parent.name));
        }

        let slug = unique_slug::<state::Entity, _>(
            db,
            state::Column::Slug,
            &format!("{}-{}", parent.name, name),
        )
        .await?;
        let now = Utc::now();
        let model = state::ActiveModel {
            id: Set(Uuid::new_v4()),
            country_id: Set(parent.id),
            name: Set(name),
            code: Set(request.code),
            slug: Set(slug),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        info!(state_id = %model.id, "State created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn create_city(&self, request: CreateCityRequest) -> Result<city::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let parent = self.get_state(request.state_id).await?;
        let name = request.name.trim().to_string();

        let clash = city::Entity::find()
            .filter(city::Column::StateId.eq(parent.id))
            .filter(city::Column::Name.eq(name.as_str()))
            .one(db)
            .await?;
        if clash.is_some() {
            return Err(duplicate("City", &name, &parent.name));
        }

        let slug = unique_slug::<city::Entity, _>(
            db,
            city::Column::Slug,
            &format!("{}-{}", parent.name, name),
        )
        .await?;
        let now = Utc::now();
        let model = city::ActiveModel {
            id: Set(Uuid::new_v4()),
            state_id: Set(parent.id),
            name: Set(name),
            code: Set(request.code),
            slug: Set(slug),
            is_capital: Set(request.is_capital),
            population: Set(request.population),
            area: Set(request.area),
            latitude: Set(request.latitude),
            longitude: Set(request.longitude),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        info!(city_id = %model.id, "City created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn create_district(
        &self,
        request: CreateDistrictRequest,
    ) -> Result<district::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let parent = self.get_city(request.city_id).await?;
        let name = request.name.trim().to_string();

        let clash = district::Entity::find()
            .filter(district::Column::CityId.eq(parent.id))
            .filter(district::Column::Name.eq(name.as_str()))
            .one(db)
            .await?;
        if clash.is_some() {
            return Err(duplicate("District", &name, &parent.name));
        }

        let slug = unique_slug::<district::Entity, _>(
            db,
            district::Column::Slug,
            &format!("{}-{}", parent.name, name),
        )
        .await?;
        let now = Utc::now();
        let model = district::ActiveModel {
            id: Set(Uuid::new_v4()),
            city_id: Set(parent.id),
            name: Set(name),
            code: Set(request.code),
            slug: Set(slug),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        info!(district_id = %model.id, "District created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn create_region(
        &self,
        request: CreateRegionRequest,
    ) -> Result<region::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let parent = self.get_district(request.district_id).await?;
        let name = request.name.trim().to_string();

        let clash = region::Entity::find()
            .filter(region::Column::DistrictId.eq(parent.id))
            .filter(region::Column::Name.eq(name.as_str()))
            .one(db)
            .await?;
        if clash.is_some() {
            return Err(duplicate("Region", &name, &parent.name));
        }

        let slug = unique_slug::<region::Entity, _>(
            db,
            region::Column::Slug,
            &format!("{}-{}", parent.name, name),
        )
        .await?;
        let now = Utc::now();
        let model = region::ActiveModel {
            id: Set(Uuid::new_v4()),
            district_id: Set(parent.id),
            name: Set(name),
            code: Set(request.code),
            slug: Set(slug),
            description: Set(request.description),
            is_active: Set(true),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        info!(region_id = %model.id, "Region created");
        Ok(model)
    }

    /// Renames a country or changes its ISO code.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown or deleted country, `Conflict` when the new
    /// name or code belongs to another country.
    #[instrument(skip(self))]
    pub async fn update_country(
        &self,
        id: Uuid,
        request: UpdateCountryRequest,
    ) -> Result<country::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let existing = self.get_country(id).await?;
        let name = request.name.map(|n| n.trim().to_string());

        if name.is_some() || request.code.is_some() {
            let mut clash = sea_orm::Condition::any();
            if let Some(name) = &name {
                clash = clash.add(country::Column::Name.eq(name.as_str()));
            }
            if let Some(code) = &request.code {
                clash = clash.add(country::Column::Code.eq(code.as_str()));
            }
            let taken = country::Entity::find()
                .filter(clash)
                .filter(country::Column::Id.ne(id))
                .one(db)
                .await?;
            if let Some(other) = taken {
                return Err(ServiceError::Conflict(format!(
                    "Country '{}' ({}) already exists",
                    other.name, other.code
                )));
            }
        }

        let mut model: country::ActiveModel = existing.into();
        if let Some(name) = name {
            model.name = Set(name);
        }
        if let Some(code) = request.code {
            model.code = Set(code);
        }
        model.updated_at = Set(Utc::now());
        let updated = model.update(db).await?;
        info!(country_id = %id, "Country updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn update_state(
        &self,
        id: Uuid,
        request: UpdatePlaceRequest,
    ) -> Result<state::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let existing = self.get_state(id).await?;

        let mut model: state::ActiveModel = existing.clone().into();
        if let Some(name) = request.name.map(|n| n.trim().to_string()) {
            let taken = state::Entity::find()
                .filter(state::Column::CountryId.eq(existing.country_id))
                .filter(state::Column::Name.eq(name.as_str()))
                .filter(state::Column::Id.ne(id))
                .one(db)
                .await?;
            if taken.is_some() {
                let parent = self.get_country(existing.country_id).await?;
                return Err(duplicate("State", &name, &parent.name));
            }
            model.name = Set(name);
        }
        if let Some(code) = request.code {
            model.code = Set(code);
        }
        model.updated_at = Set(Utc::now());
        let updated = model.update(db).await?;
        info!(state_id = %id, "State updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn update_city(
        &self,
        id: Uuid,
        request: UpdateCityRequest,
    ) -> Result<city::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let existing = self.get_city(id).await?;

        let mut model: city::ActiveModel = existing.clone().into();
        if let Some(name) = request.name.map(|n| n.trim().to_string()) {
            let taken = city::Entity::find()
                .filter(city::Column::StateId.eq(existing.state_id))
                .filter(city::Column::Name.eq(name.as_str()))
                .filter(city::Column::Id.ne(id))
                .one(db)
                .await?;
            if taken.is_some() {
                let parent = self.get_state(existing.state_id).await?;
                return Err(duplicate("City", &name, &parent.name));
            }
            model.name = Set(name);
        }
        if let Some(code) = request.code {
            model.code = Set(code);
        }
        if let Some(is_capital) = request.is_capital {
            model.is_capital = Set(is_capital);
        }
        if let Some(population) = request.population {
            model.population = Set(Some(population));
        }
        if let Some(area) = request.area {
            model.area = Set(Some(area));
        }
        if let Some(latitude) = request.latitude {
            model.latitude = Set(Some(latitude));
        }
        if let Some(longitude) = request.longitude {
            model.longitude = Set(Some(longitude));
        }
        model.updated_at = Set(Utc::now());
        let updated = model.update(db).await?;
        info!(city_id = %id, "City updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn update_district(
        &self,
        id: Uuid,
        request: UpdatePlaceRequest,
    ) -> Result<district::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let existing = self.get_district(id).await?;

        let mut model: district::ActiveModel = existing.clone().into();
        if let Some(name) = request.name.map(|n| n.trim().to_string()) {
            let taken = district::Entity::find()
                .filter(district::Column::CityId.eq(existing.city_id))
                .filter(district::Column::Name.eq(name.as_str()))
                .filter(district::Column::Id.ne(id))
                .one(db)
                .await?;
            if taken.is_some() {
                let parent = self.get_city(existing.city_id).await?;
                return Err(duplicate("District", &name, &parent.name));
            }
            model.name = Set(name);
        }
        if let Some(code) = request.code {
            model.code = Set(code);
        }
        model.updated_at = Set(Utc::now());
        let updated = model.update(db).await?;
        info!(district_id = %id, "District updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn update_region(
        &self,
        id: Uuid,
        request: UpdateRegionRequest,
    ) -> Result<region::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let existing = self.get_region(id).await?;

        let mut model: region::ActiveModel = existing.clone().into();
        if let Some(name) = request.name.map(|n| n.trim().to_string()) {
            let taken = region::Entity::find()
                .filter(region::Column::DistrictId.eq(existing.district_id))
                .filter(region::Column::Name.eq(name.as_str()))
                .filter(region::Column::Id.ne(id))
                .one(db)
                .await?;
            if taken.is_some() {
                let parent = self.get_district(existing.district_id).await?;
                return Err(duplicate("Region", &name, &parent.name));
            }
            model.name = Set(name);
        }
        if let Some(code) = request.code {
            model.code = Set(code);
        }
        if let Some(description) = request.description {
            model.description = Set(description);
        }
        if let Some(is_active) = request.is_active {
            model.is_active = Set(is_active);
        }
        model.updated_at = Set(Utc::now());
        let updated = model.update(db).await?;
        info!(region_id = %id, "Region updated");
        Ok(updated)
    }

    /// Soft deletes a country with no live states.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidOperation` while states remain.
    #[instrument(skip(self))]
    pub async fn delete_country(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;
        ensure_no_children::<state::Entity, _>(
            db,
            state::Column::CountryId,
            id,
            "Country",
            "states",
        )
        .await?;
        let changed = soft_delete_existing::<country::Entity, _>(db, "Country", id).await?;
        self.deleted("country", id, changed).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_state(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;
        ensure_no_children::<city::Entity, _>(
            db,
            city::Column::StateId,
            id,
            "State",
            "cities",
        )
        .await?;
        let changed = soft_delete_existing::<state::Entity, _>(db, "State", id).await?;
        self.deleted("state", id, changed).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_city(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;
        ensure_no_children::<district::Entity, _>(
            db,
            district::Column::CityId,
            id,
            "City",
            "districts",
        )
        .await?;
        let changed = soft_delete_existing::<city::Entity, _>(db, "City", id).await?;
        self.deleted("city", id, changed).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_district(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;
        ensure_no_children::<region::Entity, _>(
            db,
            region::Column::DistrictId,
            id,
            "District",
            "regions",
        )
        .await?;
        let changed = soft_delete_existing::<district::Entity, _>(db, "District", id).await?;
        self.deleted("district", id, changed).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_region(&self, id: Uuid) -> Result<(), ServiceError> {
        let changed = soft_delete_existing::<region::Entity, _>(&*self.db, "Region", id).await?;
        self.deleted("region", id, changed).await;
        Ok(())
    }

    async fn deleted(&self, kind: &str, id: Uuid, changed: bool) {
        if changed {
            self.event_sender
                .send_or_log(Event::RecordSoftDeleted {
                    kind: kind.to_string(),
                    id,
                })
                .await;
            info!(kind, id = %id, "Location soft deleted");
        }
    }

    pub async fn get_country(&self, id: Uuid) -> Result<country::Model, ServiceError> {
        country::Entity::find_active()
            .filter(country::Column::Id.eq(id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Country", id))
    }

    pub async fn get_state(&self, id: Uuid) -> Result<state::Model, ServiceError> {
        state::Entity::find_active()
            .filter(state::Column::Id.eq(id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("State", id))
    }

    pub async fn get_city(&self, id: Uuid) -> Result<city::Model, ServiceError> {
        city::Entity::find_active()
            .filter(city::Column::Id.eq(id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("City", id))
    }

    pub async fn get_district(&self, id: Uuid) -> Result<district::Model, ServiceError> {
        district::Entity::find_active()
            .filter(district::Column::Id.eq(id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("District", id))
    }

    pub async fn get_region(&self, id: Uuid) -> Result<region::Model, ServiceError> {
        region::Entity::find_active()
            .filter(region::Column::Id.eq(id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Region", id))
    }

    pub async fn list_countries(&self) -> Result<Vec<country::Model>, ServiceError> {
        Ok(country::Entity::find_active()
            .order_by_asc(country::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Every non-deleted state, or only those of `country_id`.
    pub async fn list_states(
        &self,
        country_id: Option<Uuid>,
    ) -> Result<Vec<state::Model>, ServiceError> {
        match country_id {
            Some(country_id) => self.states_of(country_id).await,
            None => Ok(state::Entity::find_active()
                .order_by_asc(state::Column::Name)
                .all(&*self.db)
                .await?),
        }
    }

    pub async fn list_cities(&self, state_id: Option<Uuid>) -> Result<Vec<city::Model>, ServiceError> {
        match state_id {
            Some(state_id) => self.cities_of(state_id).await,
            None => Ok(city::Entity::find_active()
                .order_by_asc(city::Column::Name)
                .all(&*self.db)
                .await?),
        }
    }

    pub async fn list_districts(
        &self,
        city_id: Option<Uuid>,
    ) -> Result<Vec<district::Model>, ServiceError> {
        match city_id {
            Some(city_id) => self.districts_of(city_id).await,
            None => Ok(district::Entity::find_active()
                .order_by_asc(district::Column::Name)
                .all(&*self.db)
                .await?),
        }
    }

    pub async fn list_regions(
        &self,
        district_id: Option<Uuid>,
    ) -> Result<Vec<region::Model>, ServiceError> {
        match district_id {
            Some(district_id) => self.regions_of(district_id).await,
            None => Ok(region::Entity::find_active()
                .order_by_asc(region::Column::Name)
                .all(&*self.db)
                .await?),
        }
    }

    pub async fn states_of(&self, country_id: Uuid) -> Result<Vec<state::Model>, ServiceError> {
        Ok(state::Entity::find_active()
            .filter(state::Column::CountryId.eq(country_id))
            .order_by_asc(state::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn cities_of(&self, state_id: Uuid) -> Result<Vec<city::Model>, ServiceError> {
        Ok(city::Entity::find_active()
            .filter(city::Column::StateId.eq(state_id))
            .order_by_asc(city::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn districts_of(&self, city_id: Uuid) -> Result<Vec<district::Model>, ServiceError> {
        Ok(district::Entity::find_active()
            .filter(district::Column::CityId.eq(city_id))
            .order_by_asc(district::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn regions_of(&self, district_id: Uuid) -> Result<Vec<region::Model>, ServiceError> {
        Ok(region::Entity::find_active()
            .filter(region::Column::DistrictId.eq(district_id))
            .order_by_asc(region::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Every level from `region_id` up to its country.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when the region or any ancestor is missing.
    #[instrument(skip(self))]
    pub async fn location_hierarchy(&self, region_id: Uuid) -> Result<LocationHierarchy, ServiceError> {
        let region = self.get_region(region_id).await?;
        let db = &*self.db;

        let district = district::Entity::find_by_id(region.district_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("District", region.district_id))?;
        let city = city::Entity::find_by_id(district.city_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("City", district.city_id))?;
        let state = state::Entity::find_by_id(city.state_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("State", city.state_id))?;
        let country = country::Entity::find_by_id(state.country_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Country", state.country_id))?;

        Ok(LocationHierarchy {
            region,
            district: district.name,
            city: city.name,
            state: state.name,
            country: country.name,
        })
    }

    /// Checks that each given level is a child of the one above it.
    pub(crate) async fn check_chain(
        db: &DatabaseConnection,
        chain: LocationChain,
    ) -> Result<(), ServiceError> {
        let LocationChain {
            country_id,
            state_id,
            city_id,
            district_id,
            region_id,
        } = chain;

        if let Some(state_id) = state_id {
            let state = state::Entity::find_active()
                .filter(state::Column::Id.eq(state_id))
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found("State", state_id))?;
            if country_id.is_some_and(|country_id| state.country_id != country_id) {
                return Err(mismatch("state", "country"));
            }
        }
        if let Some(city_id) = city_id {
            let city = city::Entity::find_active()
                .filter(city::Column::Id.eq(city_id))
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found("City", city_id))?;
            if state_id.is_some_and(|state_id| city.state_id != state_id) {
                return Err(mismatch("city", "state"));
            }
        }
        if let Some(district_id) = district_id {
            let district = district::Entity::find_active()
                .filter(district::Column::Id.eq(district_id))
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found("District", district_id))?;
            if city_id.is_some_and(|city_id| district.city_id != city_id) {
                return Err(mismatch("district", "city"));
            }
        }
        if let Some(region_id) = region_id {
            let region = region::Entity::find_active()
                .filter(region::Column::Id.eq(region_id))
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found("Region", region_id))?;
            if district_id.is_some_and(|district_id| region.district_id != district_id) {
                return Err(mismatch("region", "district"));
            }
        }
        Ok(())
    }
}

/// Optional location ids as chosen on a form
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationChain {
    pub country_id: Option<Uuid>,
    pub state_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
}

fn mismatch(child: &str, parent: &str) -> ServiceError {
    ServiceError::ValidationError(format!(
        "Selected {} does not belong to the selected {}",
        child, parent
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn country_code_must_be_alpha3() {
        let mut request = CreateCountryRequest {
            name: "India".into(),
            code: "IND".into(),
        };
        assert!(request.validate().is_ok());
        request.code = "IN".into();
        assert!(request.validate().is_err());
        request.code = "ind".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn coordinates_are_range_checked() {
        assert!(validate_latitude(&dec!(18.5204)).is_ok());
        assert!(validate_latitude(&dec!(90.1)).is_err());
        assert!(validate_longitude(&dec!(-180)).is_ok());
        assert!(validate_longitude(&dec!(180.5)).is_err());
    }
}
