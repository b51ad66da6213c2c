mod common;

use assert_matches::assert_matches;
use common::TestApp;
use factory_infohub::{
    entities::commerce::{
        factory_purchase, order, order::OrderStatus, order_item, payment,
        payment::PaymentStatus,
    },
    entities::user::UserRole,
    errors::ServiceError,
    services::{cart::AddToCartRequest, orders::CheckoutRequest, Actor},
};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn legacy_purchase_completes_once_and_mails_details() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Kanpur Leather", dec!(1500)).await;
    let buyer = app.register_user("buyer", UserRole::User).await;
    let purchases = &app.services().purchases;

    let pending = purchases
        .process_legacy_purchase(buyer.id, factory.id)
        .await
        .unwrap();
    assert_eq!(pending.payment_status, PaymentStatus::Pending);
    assert_eq!(pending.price_at_purchase, dec!(1500));
    assert!(!purchases.has_purchased(buyer.id, factory.id).await.unwrap());

    let receipt = purchases
        .complete_legacy_purchase(buyer.id, pending.id)
        .await
        .unwrap();
    assert!(receipt.email_sent);
    assert_eq!(receipt.purchase.payment_status, PaymentStatus::Completed);
    assert!(receipt.purchase.email_sent);
    assert!(receipt.history.email_delivered);
    assert_eq!(receipt.history.price_paid, dec!(1500));
    assert_eq!(receipt.history.order_id, None);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Factory Details: Kanpur Leather");

    let repeat = purchases.process_legacy_purchase(buyer.id, factory.id).await;
    assert_matches!(repeat, Err(ServiceError::Conflict(_)));
    let recomplete = purchases
        .complete_legacy_purchase(buyer.id, pending.id)
        .await;
    assert_matches!(recomplete, Err(ServiceError::InvalidStatus(_)));
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Agra Footwear", dec!(800)).await;
    let buyer = app.register_user("buyer", UserRole::User).await;
    let purchases = &app.services().purchases;

    let purchase = purchases
        .process_legacy_purchase(buyer.id, factory.id)
        .await
        .unwrap();
    purchases
        .complete_legacy_purchase(buyer.id, purchase.id)
        .await
        .unwrap();

    let report = purchases.migrate_purchases(true).await.unwrap();
    assert!(report.dry_run);
    assert_eq!(report.migrated.len(), 1);
    assert!(report.failed.is_empty());

    let db = &*app.state.db;
    assert_eq!(order::Entity::find().count(db).await.unwrap(), 0);
    let untouched = factory_purchase::Entity::find_by_id(purchase.id)
        .one(db)
        .await
        .unwrap()
        .unwrap();
    assert!(!untouched.migrated_to_order);
}

#[tokio::test]
async fn migration_builds_orders_and_is_idempotent() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let paid = app.create_factory(&dir, "Ludhiana Hosiery", dec!(1200)).await;
    let unpaid = app.create_factory(&dir, "Tiruppur Knitwear", dec!(600)).await;
    let buyer = app.register_user("buyer", UserRole::User).await;
    let purchases = &app.services().purchases;

    let completed = purchases
        .process_legacy_purchase(buyer.id, paid.id)
        .await
        .unwrap();
    purchases
        .complete_legacy_purchase(buyer.id, completed.id)
        .await
        .unwrap();
    let abandoned = purchases
        .process_legacy_purchase(buyer.id, unpaid.id)
        .await
        .unwrap();

    let report = purchases.migrate_purchases(false).await.unwrap();
    assert!(!report.dry_run);
    assert_eq!(report.migrated.len(), 2);
    assert!(report
        .migrated
        .iter()
        .any(|(id, number)| *id == completed.id && *number == format!("MIGRATED-{}", completed.id)));

    let db = &*app.state.db;
    let migrated = order::Entity::find()
        .filter(order::Column::OrderNumber.eq(format!("MIGRATED-{}", completed.id)))
        .one(db)
        .await
        .unwrap()
        .unwrap();
    assert!(migrated.migrated_from_purchase);
    assert_eq!(migrated.status, OrderStatus::Completed);
    assert_eq!(migrated.total_amount, dec!(1200));
    assert_eq!(migrated.tax_amount, dec!(0));
    assert_eq!(migrated.payment_method, "manual");

    let items = migrated
        .find_related(order_item::Entity)
        .all(db)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].factory_id, Some(paid.id));
    let payments = migrated.find_related(payment::Entity).all(db).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(
        payments[0].transaction_id,
        format!("MIGRATED-PURCHASE-{}", completed.id)
    );

    let cancelled = order::Entity::find()
        .filter(order::Column::OrderNumber.eq(format!("MIGRATED-{}", abandoned.id)))
        .one(db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::Pending);

    // The completed purchase already had a receipt
    let history = purchases.purchase_history(buyer.id).await.unwrap();
    assert_eq!(history.len(), 1);

    let second = purchases.migrate_purchases(false).await.unwrap();
    assert!(second.migrated.is_empty());
    assert_eq!(order::Entity::find().count(db).await.unwrap(), 2);
}

#[tokio::test]
async fn order_backed_purchases_are_not_migrated() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Panipat Rugs", dec!(900)).await;
    let buyer = app.register_user("buyer", UserRole::User).await;
    let services = app.services();

    services
        .cart
        .add_item(
            buyer.id,
            AddToCartRequest {
                factory_id: factory.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();
    let detail = services
        .orders
        .checkout(
            buyer.id,
            CheckoutRequest {
                payment_method: "net_banking".to_string(),
                customer_name: Some("Ravi Kumar".to_string()),
                customer_email: None,
                customer_phone: None,
                notes: String::new(),
            },
        )
        .await
        .unwrap();
    services
        .orders
        .complete_payment(
            Actor {
                user_id: buyer.id,
                is_staff: false,
            },
            detail.order.id,
        )
        .await
        .unwrap();

    let report = services.purchases.migrate_purchases(false).await.unwrap();
    assert!(report.migrated.is_empty());
    assert_eq!(order::Entity::find().count(&*app.state.db).await.unwrap(), 1);
}
