mod common;

use assert_matches::assert_matches;
use common::{Directory, TestApp};
use factory_infohub::{
    entities::commerce::{order::OrderStatus, payment::PaymentStatus},
    entities::user::UserRole,
    errors::ServiceError,
    services::{
        cart::{AddToCartRequest, UpdateCartItemRequest},
        factories::FactoryRequest,
        orders::{BulkOrderAction, BulkOrderRequest, CheckoutRequest},
        payments::{FailPaymentRequest, RefundRequest},
        Actor,
    },
};
use rust_decimal_macros::dec;

fn checkout_request() -> CheckoutRequest {
    CheckoutRequest {
        payment_method: "upi".to_string(),
        customer_name: None,
        customer_email: None,
        customer_phone: None,
        notes: String::new(),
    }
}

fn owner(user_id: uuid::Uuid) -> Actor {
    Actor {
        user_id,
        is_staff: false,
    }
}

/// Checks out one factory for a fresh buyer and returns the buyer and order ids.
async fn pending_order(
    app: &TestApp,
    dir: &Directory,
    factory_name: &str,
    buyer: &str,
) -> (uuid::Uuid, uuid::Uuid) {
    let factory = app.create_factory(dir, factory_name, dec!(300)).await;
    let buyer = app.register_user(buyer, UserRole::User).await;
    app.services()
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
    let detail = app
        .services()
        .orders
        .checkout(buyer.id, checkout_request())
        .await
        .unwrap();
    (buyer.id, detail.order.id)
}

#[tokio::test]
async fn cart_merges_lines_and_enforces_the_quantity_limit() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Surat Spinners", dec!(1000)).await;
    let buyer = app.register_user("buyer", UserRole::User).await;
    let cart = &app.services().cart;

    cart.add_item(
        buyer.id,
        AddToCartRequest {
            factory_id: factory.id,
            quantity: 4,
        },
    )
    .await
    .unwrap();
    let item = cart
        .add_item(
            buyer.id,
            AddToCartRequest {
                factory_id: factory.id,
                quantity: 6,
            },
        )
        .await
        .unwrap();
    assert_eq!(item.quantity, 10);

    let over = cart
        .add_item(
            buyer.id,
            AddToCartRequest {
                factory_id: factory.id,
                quantity: 1,
            },
        )
        .await;
    assert_matches!(over, Err(ServiceError::ValidationError(_)));

    let zero = cart
        .update_quantity(buyer.id, factory.id, UpdateCartItemRequest { quantity: 0 })
        .await;
    assert_matches!(zero, Err(ServiceError::ValidationError(_)));

    let view = cart.view(buyer.id).await.unwrap();
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.item_count, 10);
    assert_eq!(view.totals.subtotal, dec!(10000));
}

#[tokio::test]
async fn inactive_factories_cannot_be_added() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Closed Mill", dec!(750)).await;
    app.services()
        .factories
        .toggle_active(&factory.slug)
        .await
        .unwrap();
    let buyer = app.register_user("buyer", UserRole::User).await;

    let result = app
        .services()
        .cart
        .add_item(
            buyer.id,
            AddToCartRequest {
                factory_id: factory.id,
                quantity: 1,
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn checkout_prices_with_tax_and_keeps_price_snapshots() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let first = app.create_factory(&dir, "Alpha Looms", dec!(1000)).await;
    let second = app.create_factory(&dir, "Beta Dyes", dec!(500)).await;
    let buyer = app.register_user("buyer", UserRole::User).await;
    let services = app.services();

    for (factory_id, quantity) in [(first.id, 2), (second.id, 1)] {
        services
            .cart
            .add_item(buyer.id, AddToCartRequest { factory_id, quantity })
            .await
            .unwrap();
    }

    let detail = services
        .orders
        .checkout(buyer.id, checkout_request())
        .await
        .unwrap();
    assert_eq!(detail.order.subtotal, dec!(2500));
    assert_eq!(detail.order.tax_amount, dec!(450));
    assert_eq!(detail.order.total_amount, dec!(2950));
    assert_eq!(detail.order.status, OrderStatus::Pending);
    assert_eq!(detail.order.customer_email, "buyer@example.com");
    assert!(detail.order.order_number.starts_with("ORD-"));
    assert_eq!(detail.items.len(), 2);

    // A later price change does not touch the order
    let mut update: FactoryRequest = common::factory_request(&dir, "Alpha Looms", dec!(1500));
    update.description = first.description.clone();
    services
        .factories
        .update_factory(&first.slug, update)
        .await
        .unwrap();

    let reloaded = services
        .orders
        .get_order(owner(buyer.id), detail.order.id)
        .await
        .unwrap();
    let alpha = reloaded
        .items
        .iter()
        .find(|i| i.factory_id == Some(first.id))
        .unwrap();
    assert_eq!(alpha.price_at_purchase, dec!(1000));
    assert_eq!(alpha.total_price, dec!(2000));
    assert_eq!(reloaded.order.total_amount, dec!(2950));
}

#[tokio::test]
async fn checkout_rejects_empty_cart_and_unknown_payment_method() {
    let app = TestApp::new().await;
    let buyer = app.register_user("buyer", UserRole::User).await;
    let orders = &app.services().orders;

    let empty = orders.checkout(buyer.id, checkout_request()).await;
    assert_matches!(empty, Err(ServiceError::InvalidOperation(_)));

    let mut request = checkout_request();
    request.payment_method = "barter".to_string();
    let bad_method = orders.checkout(buyer.id, request).await;
    assert_matches!(bad_method, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn completing_payment_records_purchases_and_sends_mail() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Gamma Knits", dec!(1000)).await;
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
        .checkout(buyer.id, checkout_request())
        .await
        .unwrap();
    // Checkout leaves the cart alone
    assert!(!services.cart.view(buyer.id).await.unwrap().is_empty());

    let payment = services
        .orders
        .process_payment(owner(buyer.id), detail.order.id)
        .await
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Processing);
    assert_eq!(payment.amount, dec!(1180));
    assert!(payment.transaction_id.starts_with("TXN-"));

    let report = services
        .orders
        .complete_payment(owner(buyer.id), detail.order.id)
        .await
        .unwrap();
    assert_eq!(report.order.order.status, OrderStatus::Completed);
    assert_eq!(report.order.order.payment_status, PaymentStatus::Completed);
    assert_eq!(report.order.payments.len(), 1);
    assert_eq!(report.order.payments[0].status, PaymentStatus::Completed);
    assert_eq!(report.purchases_created, 1);
    assert!(report.confirmation_sent);
    assert!(report.details_sent);

    assert!(services.cart.view(buyer.id).await.unwrap().is_empty());
    assert!(services
        .purchases
        .has_purchased(buyer.id, factory.id)
        .await
        .unwrap());

    let history = services.purchases.purchase_history(buyer.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].factory_name, "Gamma Knits");
    assert_eq!(history[0].order_id, Some(detail.order.id));
    assert!(history[0].email_delivered);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent
        .iter()
        .any(|m| m.subject.starts_with("Order Confirmation")));
    assert!(sent.iter().all(|m| m.to == "buyer@example.com"));

    let again = services
        .orders
        .complete_payment(owner(buyer.id), detail.order.id)
        .await;
    assert_matches!(again, Err(ServiceError::InvalidStatus(_)));
}

#[tokio::test]
async fn failed_mail_does_not_undo_the_order() {
    let app = TestApp::with_mailer(factory_infohub::notifications::RecordingMailer::failing()).await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Delta Weaves", dec!(200)).await;
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
        .checkout(buyer.id, checkout_request())
        .await
        .unwrap();
    let report = services
        .orders
        .complete_payment(owner(buyer.id), detail.order.id)
        .await
        .unwrap();

    assert_eq!(report.order.order.status, OrderStatus::Completed);
    assert!(!report.confirmation_sent);
    assert!(!report.details_sent);
    let history = services.purchases.purchase_history(buyer.id).await.unwrap();
    assert!(!history[0].email_delivered);
}

#[tokio::test]
async fn other_users_cannot_see_or_pay_an_order() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Epsilon Prints", dec!(300)).await;
    let buyer = app.register_user("buyer", UserRole::User).await;
    let stranger = app.register_user("stranger", UserRole::User).await;
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
        .checkout(buyer.id, checkout_request())
        .await
        .unwrap();

    let peek = services
        .orders
        .get_order(owner(stranger.id), detail.order.id)
        .await;
    assert_matches!(peek, Err(ServiceError::NotFound(_)));
    let pay = services
        .orders
        .process_payment(owner(stranger.id), detail.order.id)
        .await;
    assert_matches!(pay, Err(ServiceError::NotFound(_)));

    let staff = Actor {
        user_id: stranger.id,
        is_staff: true,
    };
    assert!(services.orders.get_order(staff, detail.order.id).await.is_ok());
}

#[tokio::test]
async fn partial_then_full_refund_marks_the_order_refunded() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Zeta Cottons", dec!(1000)).await;
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
        .checkout(buyer.id, checkout_request())
        .await
        .unwrap();
    let report = services
        .orders
        .complete_payment(owner(buyer.id), detail.order.id)
        .await
        .unwrap();
    let payment_id = report.order.payments[0].id;

    let partial = services
        .payments
        .process_refund(
            payment_id,
            RefundRequest {
                amount: Some(dec!(180)),
                reason: "Duplicate contact".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(partial.refunded, dec!(180));
    assert_eq!(partial.payment.status, PaymentStatus::Completed);
    assert!(!partial.order_refunded);

    let too_much = services
        .payments
        .process_refund(
            payment_id,
            RefundRequest {
                amount: Some(dec!(5000)),
                reason: String::new(),
            },
        )
        .await;
    assert_matches!(too_much, Err(ServiceError::ValidationError(_)));

    let rest = services
        .payments
        .process_refund(payment_id, RefundRequest::default())
        .await
        .unwrap();
    assert_eq!(rest.refunded, dec!(1000));
    assert_eq!(rest.payment.status, PaymentStatus::Refunded);
    assert_eq!(rest.payment.refunded_amount, dec!(1180));
    assert!(rest.order_refunded);

    let order = services
        .orders
        .get_order(owner(buyer.id), detail.order.id)
        .await
        .unwrap();
    assert_eq!(order.order.status, OrderStatus::Refunded);

    let nothing_left = services
        .payments
        .process_refund(payment_id, RefundRequest::default())
        .await;
    assert_matches!(nothing_left, Err(ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn failed_payment_and_cancellation() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Eta Fabrics", dec!(400)).await;
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
        .checkout(buyer.id, checkout_request())
        .await
        .unwrap();
    let payment = services
        .orders
        .process_payment(owner(buyer.id), detail.order.id)
        .await
        .unwrap();

    let failed = services
        .payments
        .fail_payment(
            payment.id,
            FailPaymentRequest {
                error: "Card declined".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(failed.status, PaymentStatus::Failed);
    assert_eq!(failed.gateway_error.as_deref(), Some("Card declined"));

    let order = services
        .orders
        .cancel_order(owner(buyer.id), detail.order.id)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);

    let refund = services
        .payments
        .process_refund(payment.id, RefundRequest::default())
        .await;
    assert_matches!(refund, Err(ServiceError::InvalidStatus(_)));
    let cancel_again = services
        .orders
        .cancel_order(owner(buyer.id), detail.order.id)
        .await;
    assert_matches!(cancel_again, Err(ServiceError::InvalidStatus(_)));
}

#[tokio::test]
async fn failed_payment_stays_failed_and_the_order_can_be_retried() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Iota Weaves", dec!(400)).await;
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
        .checkout(buyer.id, checkout_request())
        .await
        .unwrap();
    let first = services
        .orders
        .process_payment(owner(buyer.id), detail.order.id)
        .await
        .unwrap();
    services
        .payments
        .fail_payment(
            first.id,
            FailPaymentRequest {
                error: "declined".to_string(),
            },
        )
        .await
        .unwrap();

    let reopened = services
        .orders
        .get_order(owner(buyer.id), detail.order.id)
        .await
        .unwrap();
    assert_eq!(reopened.order.status, OrderStatus::Pending);
    assert_eq!(reopened.order.payment_status, PaymentStatus::Failed);

    let retry = services
        .orders
        .process_payment(owner(buyer.id), detail.order.id)
        .await
        .unwrap();
    assert_ne!(retry.id, first.id);
    assert_eq!(retry.status, PaymentStatus::Processing);

    let report = services
        .orders
        .complete_payment(owner(buyer.id), detail.order.id)
        .await
        .unwrap();
    assert_eq!(report.order.order.status, OrderStatus::Completed);
    assert_eq!(report.order.payments.len(), 2);

    let old = services.payments.get_payment(first.id).await.unwrap();
    assert_eq!(old.status, PaymentStatus::Failed);
    assert_eq!(old.gateway_error.as_deref(), Some("declined"));
    let new = services.payments.get_payment(retry.id).await.unwrap();
    assert_eq!(new.status, PaymentStatus::Completed);
    assert!(new.gateway_error.is_none());
}

#[tokio::test]
async fn completing_after_a_failure_opens_a_fresh_payment() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Kappa Cloth", dec!(100)).await;
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
        .checkout(buyer.id, checkout_request())
        .await
        .unwrap();
    let first = services
        .orders
        .process_payment(owner(buyer.id), detail.order.id)
        .await
        .unwrap();
    services
        .payments
        .fail_payment(first.id, FailPaymentRequest::default())
        .await
        .unwrap();

    let report = services
        .orders
        .complete_payment(owner(buyer.id), detail.order.id)
        .await
        .unwrap();
    let completed: Vec<_> = report
        .order
        .payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .collect();
    assert_eq!(completed.len(), 1);
    assert_ne!(completed[0].id, first.id);
    assert_eq!(
        services.payments.get_payment(first.id).await.unwrap().status,
        PaymentStatus::Failed
    );
}

#[tokio::test]
async fn bulk_refund_returns_completed_payments_only() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let services = app.services();
    let (buyer, paid) = pending_order(&app, &dir, "Lambda Looms", "first").await;
    let (_, open) = pending_order(&app, &dir, "Mu Mills", "second").await;

    let declined = services
        .orders
        .process_payment(owner(buyer), paid)
        .await
        .unwrap();
    services
        .payments
        .fail_payment(declined.id, FailPaymentRequest::default())
        .await
        .unwrap();
    services
        .orders
        .complete_payment(owner(buyer), paid)
        .await
        .unwrap();

    let unknown = uuid::Uuid::new_v4();
    let result = services
        .orders
        .bulk_action(BulkOrderRequest {
            order_ids: vec![paid, open, unknown],
            action: BulkOrderAction::MarkRefunded,
        })
        .await
        .unwrap();
    assert_eq!(result.updated, vec![paid]);
    assert_eq!(result.skipped.len(), 2);
    assert!(result.skipped.contains(&open));
    assert!(result.skipped.contains(&unknown));

    let refunded = services
        .orders
        .get_order(owner(buyer), paid)
        .await
        .unwrap();
    assert_eq!(refunded.order.status, OrderStatus::Refunded);
    assert_eq!(refunded.order.payment_status, PaymentStatus::Refunded);
    for payment in &refunded.payments {
        if payment.id == declined.id {
            assert_eq!(payment.status, PaymentStatus::Failed);
            assert_eq!(payment.refunded_amount, dec!(0));
        } else {
            assert_eq!(payment.status, PaymentStatus::Refunded);
            assert_eq!(payment.refunded_amount, payment.amount);
            assert_eq!(payment.refund_reason.as_deref(), Some("Bulk refund"));
        }
    }
}

#[tokio::test]
async fn bulk_cancel_and_complete_skip_ineligible_orders() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let services = app.services();
    let (_, first) = pending_order(&app, &dir, "Nu Knits", "first").await;
    let (_, second) = pending_order(&app, &dir, "Xi Yarns", "second").await;

    let cancelled = services
        .orders
        .bulk_action(BulkOrderRequest {
            order_ids: vec![first],
            action: BulkOrderAction::MarkCancelled,
        })
        .await
        .unwrap();
    assert_eq!(cancelled.updated, vec![first]);
    assert!(cancelled.skipped.is_empty());

    let completed = services
        .orders
        .bulk_action(BulkOrderRequest {
            order_ids: vec![first, second],
            action: BulkOrderAction::MarkCompleted,
        })
        .await
        .unwrap();
    assert_eq!(completed.updated, vec![second]);
    assert_eq!(completed.skipped, vec![first]);

    let staff = Actor {
        user_id: uuid::Uuid::new_v4(),
        is_staff: true,
    };
    let first_order = services.orders.get_order(staff, first).await.unwrap();
    assert_eq!(first_order.order.status, OrderStatus::Cancelled);
    let second_order = services.orders.get_order(staff, second).await.unwrap();
    assert_eq!(second_order.order.status, OrderStatus::Completed);
    assert!(second_order.order.completed_at.is_some());

    // Refunds need a completed order
    let refund = services
        .orders
        .bulk_action(BulkOrderRequest {
            order_ids: vec![first],
            action: BulkOrderAction::MarkRefunded,
        })
        .await
        .unwrap();
    assert!(refund.updated.is_empty());
    assert_eq!(refund.skipped, vec![first]);
}

#[tokio::test]
async fn history_outlives_a_hard_deleted_factory() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Theta Threads", dec!(250)).await;
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
        .checkout(buyer.id, checkout_request())
        .await
        .unwrap();
    services
        .orders
        .complete_payment(owner(buyer.id), detail.order.id)
        .await
        .unwrap();

    services
        .admin
        .hard_delete(
            factory_infohub::services::admin::TrashKind::Factory,
            factory.id,
        )
        .await
        .unwrap();

    let history = services.purchases.purchase_history(buyer.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].factory_id, None);
    assert_eq!(history[0].factory_name, "Theta Threads");
    assert_eq!(history[0].factory_contact_email, "sales@example.com");

    let order = services
        .orders
        .get_order(owner(buyer.id), detail.order.id)
        .await
        .unwrap();
    assert_eq!(order.items[0].factory_id, None);
    assert_eq!(order.items[0].factory_name, "Theta Threads");
}
