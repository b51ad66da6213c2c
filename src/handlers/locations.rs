use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::taxonomy::{city, country, district, region, state},
    errors::ServiceError,
    handlers::common::{created_response, ensure_staff, message_response},
    services::locations::{
        CreateCityRequest, CreateCountryRequest, CreateDistrictRequest, CreateRegionRequest,
        CreateStateRequest, LocationHierarchy, UpdateCityRequest, UpdateCountryRequest,
        UpdatePlaceRequest, UpdateRegionRequest,
    },
    ApiResponse, ApiResult, AppState,
};

/// Optional parent filters for the flat list endpoints.
#[derive(Debug, Default, Deserialize)]
struct ParentQuery {
    country_id: Option<Uuid>,
    state_id: Option<Uuid>,
    city_id: Option<Uuid>,
    district_id: Option<Uuid>,
}

pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/countries", get(list_countries).post(create_country))
        .route(
            "/countries/{id}",
            get(get_country).put(update_country).delete(delete_country),
        )
        .route("/countries/{id}/states", get(states_of))
        .route("/states", get(list_states).post(create_state))
        .route(
            "/states/{id}",
            get(get_state).put(update_state).delete(delete_state),
        )
        .route("/states/{id}/cities", get(cities_of))
        .route("/cities", get(list_cities).post(create_city))
        .route(
            "/cities/{id}",
            get(get_city).put(update_city).delete(delete_city),
        )
        .route("/cities/{id}/districts", get(districts_of))
        .route("/districts", get(list_districts).post(create_district))
        .route(
            "/districts/{id}",
            get(get_district).put(update_district).delete(delete_district),
        )
        .route("/districts/{id}/regions", get(regions_of))
        .route("/regions", get(list_regions).post(create_region))
        .route(
            "/regions/{id}",
            get(get_region).put(update_region).delete(delete_region),
        )
        .route("/regions/{id}/hierarchy", get(hierarchy))
}

async fn list_countries(State(state): State<AppState>) -> ApiResult<Vec<country::Model>> {
    let countries = state.services.locations.list_countries().await?;
    Ok(Json(ApiResponse::success(countries)))
}

async fn create_country(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCountryRequest>,
) -> Result<Response, ServiceError> {
    ensure_staff(&user)?;
    let country = state.services.locations.create_country(payload).await?;
    Ok(created_response(country))
}

async fn get_country(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<country::Model> {
    let country = state.services.locations.get_country(id).await?;
    Ok(Json(ApiResponse::success(country)))
}

async fn update_country(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCountryRequest>,
) -> ApiResult<country::Model> {
    ensure_staff(&user)?;
    let country = state.services.locations.update_country(id, payload).await?;
    Ok(Json(ApiResponse::success(country)))
}

async fn delete_country(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    ensure_staff(&user)?;
    state.services.locations.delete_country(id).await?;
    Ok(message_response("Country deleted"))
}

async fn states_of(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<state::Model>> {
    let states = state.services.locations.states_of(id).await?;
    Ok(Json(ApiResponse::success(states)))
}

async fn list_states(
    State(state): State<AppState>,
    Query(query): Query<ParentQuery>,
) -> ApiResult<Vec<state::Model>> {
    let states = state.services.locations.list_states(query.country_id).await?;
    Ok(Json(ApiResponse::success(states)))
}

async fn create_state(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateStateRequest>,
) -> Result<Response, ServiceError> {
    ensure_staff(&user)?;
    let created = state.services.locations.create_state(payload).await?;
    Ok(created_response(created))
}

async fn get_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<state::Model> {
    let found = state.services.locations.get_state(id).await?;
    Ok(Json(ApiResponse::success(found)))
}

async fn update_state(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlaceRequest>,
) -> ApiResult<state::Model> {
    ensure_staff(&user)?;
    let updated = state.services.locations.update_state(id, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

async fn delete_state(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    ensure_staff(&user)?;
    state.services.locations.delete_state(id).await?;
    Ok(message_response("State deleted"))
}

async fn cities_of(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<city::Model>> {
    let cities = state.services.locations.cities_of(id).await?;
    Ok(Json(ApiResponse::success(cities)))
}

async fn list_cities(
    State(state): State<AppState>,
    Query(query): Query<ParentQuery>,
) -> ApiResult<Vec<city::Model>> {
    let cities = state.services.locations.list_cities(query.state_id).await?;
    Ok(Json(ApiResponse::success(cities)))
}

async fn create_city(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCityRequest>,
) -> Result<Response, ServiceError> {
    ensure_staff(&user)?;
    let city = state.services.locations.create_city(payload).await?;
    Ok(created_response(city))
}

async fn get_city(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<city::Model> {
    let city = state.services.locations.get_city(id).await?;
    Ok(Json(ApiResponse::success(city)))
}

async fn update_city(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCityRequest>,
) -> ApiResult<city::Model> {
    ensure_staff(&user)?;
    let city = state.services.locations.update_city(id, payload).await?;
    Ok(Json(ApiResponse::success(city)))
}

async fn delete_city(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    ensure_staff(&user)?;
    state.services.locations.delete_city(id).await?;
    Ok(message_response("City deleted"))
}

async fn districts_of(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<district::Model>> {
    let districts = state.services.locations.districts_of(id).await?;
    Ok(Json(ApiResponse::success(districts)))
}

async fn list_districts(
    State(state): State<AppState>,
    Query(query): Query<ParentQuery>,
) -> ApiResult<Vec<district::Model>> {
    let districts = state.services.locations.list_districts(query.city_id).await?;
    Ok(Json(ApiResponse::success(districts)))
}

async fn create_district(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateDistrictRequest>,
) -> Result<Response, ServiceError> {
    ensure_staff(&user)?;
    let district = state.services.locations.create_district(payload).await?;
    Ok(created_response(district))
}

async fn get_district(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<district::Model> {
    let district = state.services.locations.get_district(id).await?;
    Ok(Json(ApiResponse::success(district)))
}

async fn update_district(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlaceRequest>,
) -> ApiResult<district::Model> {
    ensure_staff(&user)?;
    let district = state.services.locations.update_district(id, payload).await?;
    Ok(Json(ApiResponse::success(district)))
}

async fn delete_district(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    ensure_staff(&user)?;
    state.services.locations.delete_district(id).await?;
    Ok(message_response("District deleted"))
}

async fn regions_of(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<region::Model>> {
    let regions = state.services.locations.regions_of(id).await?;
    Ok(Json(ApiResponse::success(regions)))
}

async fn list_regions(
    State(state): State<AppState>,
    Query(query): Query<ParentQuery>,
) -> ApiResult<Vec<region::Model>> {
    let regions = state.services.locations.list_regions(query.district_id).await?;
    Ok(Json(ApiResponse::success(regions)))
}

async fn create_region(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateRegionRequest>,
) -> Result<Response, ServiceError> {
    ensure_staff(&user)?;
    let region = state.services.locations.create_region(payload).await?;
    Ok(created_response(region))
}

async fn get_region(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<region::Model> {
    let region = state.services.locations.get_region(id).await?;
    Ok(Json(ApiResponse::success(region)))
}

async fn update_region(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRegionRequest>,
) -> ApiResult<region::Model> {
    ensure_staff(&user)?;
    let region = state.services.locations.update_region(id, payload).await?;
    Ok(Json(ApiResponse::success(region)))
}

async fn delete_region(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    ensure_staff(&user)?;
    state.services.locations.delete_region(id).await?;
    Ok(message_response("Region deleted"))
}

async fn hierarchy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<LocationHierarchy> {
    let hierarchy = state.services.locations.location_hierarchy(id).await?;
    Ok(Json(ApiResponse::success(hierarchy)))
}
