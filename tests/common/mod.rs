#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use factory_infohub::{
    config::AppConfig,
    db,
    entities::{
        factory,
        taxonomy::{category, city, country, state, sub_category},
        user,
        user::UserRole,
    },
    events::{self, EventSender},
    handlers::AppServices,
    notifications::{Mailer, RecordingMailer},
    services::{
        accounts::RegisterRequest,
        categories::{CreateCategoryRequest, CreateSubCategoryRequest},
        factories::FactoryRequest,
        locations::{CreateCityRequest, CreateCountryRequest, CreateStateRequest},
    },
    AppState,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "Factory123";

/// The taxonomy and location rows every factory needs.
pub struct Directory {
    pub category: category::Model,
    pub subcategory: sub_category::Model,
    pub country: country::Model,
    pub state: state::Model,
    pub city: city::Model,
}

/// Application state over a throwaway SQLite file with a recording mailer.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_mailer(RecordingMailer::new()).await
    }

    pub async fn with_mailer(mailer: RecordingMailer) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("infohub_test.db");
        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let (tx, rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(rx));
        let event_sender = Arc::new(EventSender::new(tx));

        let mailer = Arc::new(mailer);
        let dyn_mailer: Arc<dyn Mailer> = mailer.clone();
        let state = AppState::new(Arc::new(pool), Arc::new(cfg), event_sender, dyn_mailer);
        let router = factory_infohub::build_router(state.clone());

        Self {
            router,
            state,
            mailer,
            _dir: dir,
            _event_task: event_task,
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    pub async fn register_user(&self, username: &str, role: UserRole) -> user::Model {
        self.services()
            .accounts
            .register_with_role(
                RegisterRequest {
                    username: username.to_string(),
                    email: format!("{username}@example.com"),
                    password: TEST_PASSWORD.to_string(),
                    first_name: "Test".to_string(),
                    last_name: username.to_string(),
                    phone_number: "9876543210".to_string(),
                },
                role,
            )
            .await
            .expect("failed to register user")
    }

    pub fn token_for(&self, account: &user::Model) -> String {
        self.state
            .auth
            .generate_token(account)
            .expect("failed to issue token")
            .access_token
    }

    /// A category, subcategory and a country/state/city chain.
    pub async fn seed_directory(&self) -> Directory {
        let services = self.services();
        let category = services
            .categories
            .create_category(CreateCategoryRequest {
                name: "Textiles".to_string(),
                description: "Spinning, weaving and garments".to_string(),
                is_active: true,
            })
            .await
            .expect("category");
        let subcategory = services
            .categories
            .create_subcategory(CreateSubCategoryRequest {
                category_id: category.id,
                name: "Cotton".to_string(),
                description: String::new(),
                is_active: true,
            })
            .await
            .expect("subcategory");
        let country = services
            .locations
            .create_country(CreateCountryRequest {
                name: "India".to_string(),
                code: "IND".to_string(),
            })
            .await
            .expect("country");
        let state = services
            .locations
            .create_state(CreateStateRequest {
                country_id: country.id,
                name: "Gujarat".to_string(),
                code: "GJ".to_string(),
            })
            .await
            .expect("state");
        let city = services
            .locations
            .create_city(CreateCityRequest {
                state_id: state.id,
                name: "Surat".to_string(),
                code: "STV".to_string(),
                is_capital: false,
                population: None,
                area: None,
                latitude: None,
                longitude: None,
            })
            .await
            .expect("city");

        Directory {
            category,
            subcategory,
            country,
            state,
            city,
        }
    }

    pub async fn create_factory(&self, dir: &Directory, name: &str, price: Decimal) -> factory::Model {
        self.services()
            .factories
            .create_factory(factory_request(dir, name, price))
            .await
            .expect("failed to create factory")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        self.request_with_headers(method, uri, body, token, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn factory_request(dir: &Directory, name: &str, price: Decimal) -> FactoryRequest {
    FactoryRequest {
        name: name.to_string(),
        description: format!("{name} makes cotton yarn"),
        category_id: dir.category.id,
        subcategory_id: Some(dir.subcategory.id),
        country_id: dir.country.id,
        state_id: dir.state.id,
        city_id: dir.city.id,
        district_id: None,
        region_id: None,
        address: "Plot 12, Ring Road".to_string(),
        pincode: "395002".to_string(),
        contact_person: "Asha Patel".to_string(),
        contact_phone: "02612345678".to_string(),
        contact_email: Some("sales@example.com".to_string()),
        website: None,
        established_year: Some(1998),
        employee_count: Some(120),
        annual_turnover: None,
        factory_type: "Manufacturing".to_string(),
        production_capacity: "20 tonnes/day".to_string(),
        working_hours: "9-6".to_string(),
        holidays: "Sunday".to_string(),
        price,
        is_active: true,
        is_verified: true,
    }
}

/// Reads a response body as JSON.
pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}

pub fn id_of(value: &Value) -> Uuid {
    value["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("id field")
}
