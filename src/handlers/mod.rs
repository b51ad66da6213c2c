pub mod admin;
pub mod auth;
pub mod blog;
pub mod cart;
pub mod categories;
pub mod common;
pub mod contact;
pub mod factories;
pub mod faq;
pub mod locations;
pub mod orders;
pub mod payments;
pub mod purchases;
pub mod workers;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::events::EventSender;
use crate::notifications::Mailer;
use crate::services::{
    accounts::AccountService, admin::AdminService, blog::BlogService, cart::CartService,
    categories::CategoryService, contact::ContactService, factories::FactoryService,
    faq::FaqService,
    locations::LocationService, orders::OrderService, payments::PaymentService,
    purchases::PurchaseService, workers::WorkerService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub categories: Arc<CategoryService>,
    pub locations: Arc<LocationService>,
    pub factories: Arc<FactoryService>,
    pub workers: Arc<WorkerService>,
    pub blog: Arc<BlogService>,
    pub faq: Arc<FaqService>,
    pub accounts: Arc<AccountService>,
    pub cart: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub purchases: Arc<PurchaseService>,
    pub contact: Arc<ContactService>,
    pub admin: Arc<AdminService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        event_sender: Arc<EventSender>,
        mailer: Arc<dyn Mailer>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            categories: Arc::new(CategoryService::new(db.clone(), event_sender.clone())),
            locations: Arc::new(LocationService::new(db.clone(), event_sender.clone())),
            factories: Arc::new(FactoryService::new(db.clone(), event_sender.clone())),
            workers: Arc::new(WorkerService::new(db.clone(), event_sender.clone())),
            blog: Arc::new(BlogService::new(db.clone(), event_sender.clone())),
            faq: Arc::new(FaqService::new(db.clone(), event_sender.clone())),
            accounts: Arc::new(AccountService::new(
                db.clone(),
                event_sender.clone(),
                auth,
                mailer.clone(),
            )),
            cart: Arc::new(CartService::new(
                db.clone(),
                event_sender.clone(),
                config.clone(),
            )),
            orders: Arc::new(OrderService::new(
                db.clone(),
                event_sender.clone(),
                config,
                mailer.clone(),
            )),
            payments: Arc::new(PaymentService::new(db.clone(), event_sender.clone())),
            purchases: Arc::new(PurchaseService::new(
                db.clone(),
                event_sender.clone(),
                mailer,
            )),
            contact: Arc::new(ContactService::new(db.clone(), event_sender.clone())),
            admin: Arc::new(AdminService::new(db, event_sender)),
        }
    }
}
