mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::TestApp;
use factory_infohub::{
    entities::{password_reset_token, user::UserRole},
    errors::ServiceError,
    services::{
        accounts::{reset_token_digest, ConfirmPasswordResetRequest, PasswordResetRequest},
        admin::TrashKind,
        contact::{ContactBulkAction, ContactBulkRequest, ContactFilter, ContactRequest, ReadState},
    },
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

fn contact(name: &str, subject: &str, message: &str) -> ContactRequest {
    ContactRequest {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        subject: subject.to_string(),
        message: message.to_string(),
    }
}

fn search(term: &str) -> ContactFilter {
    ContactFilter {
        search: Some(term.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn reset_tokens_are_stored_hashed_and_expire() {
    let app = TestApp::new().await;
    let account = app.register_user("kiran", UserRole::User).await;
    let accounts = &app.services().accounts;

    accounts
        .request_password_reset(PasswordResetRequest {
            email: "kiran@example.com".to_string(),
        })
        .await
        .unwrap();
    let body = app.mailer.sent()[0].body.clone();
    let token = body
        .lines()
        .find_map(|line| line.strip_prefix("Reset token: "))
        .unwrap()
        .to_string();

    let grant = password_reset_token::Entity::find()
        .filter(password_reset_token::Column::UserId.eq(account.id))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(grant.token_hash, token);
    assert_eq!(grant.token_hash, reset_token_digest(&token));
    assert!(grant.is_usable(Utc::now()));

    let mut expired: password_reset_token::ActiveModel = grant.into();
    expired.expires_at = Set(Utc::now() - Duration::minutes(1));
    expired.update(&*app.state.db).await.unwrap();

    let result = accounts
        .confirm_password_reset(ConfirmPasswordResetRequest {
            token,
            new_password: "Spindle2024".to_string(),
        })
        .await;
    assert_matches!(result, Err(ServiceError::InvalidOperation(_)));

    let unknown = accounts
        .confirm_password_reset(ConfirmPasswordResetRequest {
            token: "not-a-real-token".to_string(),
            new_password: "Spindle2024".to_string(),
        })
        .await;
    assert_matches!(unknown, Err(ServiceError::InvalidOperation(_)));

    assert_matches!(
        accounts
            .request_password_reset(PasswordResetRequest {
                email: "not an email".to_string(),
            })
            .await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn contact_inbox_filters_and_counts() {
    let app = TestApp::new().await;
    let sender = app.register_user("sender", UserRole::User).await;
    let contact_service = &app.services().contact;

    assert_matches!(
        contact_service
            .submit(None, contact("Meena", "", "No subject"))
            .await,
        Err(ServiceError::ValidationError(_))
    );

    let invoice = contact_service
        .submit(
            Some(sender.id),
            contact("Sender", "Invoice copy", "Please resend my invoice."),
        )
        .await
        .unwrap();
    contact_service
        .submit(
            None,
            contact("Meena", "Listing my factory", "How do I add a dyeing unit?"),
        )
        .await
        .unwrap();
    contact_service
        .submit(
            None,
            contact("Arjun", "Cotton grades", "Is 100% organic cotton listed?"),
        )
        .await
        .unwrap();

    let inbox = contact_service.list(ContactFilter::default()).await.unwrap();
    assert_eq!(inbox.summary.total, 3);
    assert_eq!(inbox.summary.unread, 3);
    assert_eq!(inbox.summary.read, 0);
    assert_eq!(inbox.summary.this_month, 3);
    assert_eq!(inbox.messages.items.len(), 3);

    assert_eq!(contact_service.list(search("INVOICE")).await.unwrap().summary.total, 1);
    assert_eq!(contact_service.list(search("dyeing")).await.unwrap().summary.total, 1);
    assert_eq!(contact_service.list(search("meena@")).await.unwrap().summary.total, 1);

    // Wildcards in the search term match literally
    let percent = contact_service.list(search("100%")).await.unwrap();
    assert_eq!(percent.summary.total, 1);
    assert_eq!(percent.messages.items[0].subject, "Cotton grades");
    assert_eq!(contact_service.list(search("%")).await.unwrap().summary.total, 1);
    assert_eq!(contact_service.list(search("_")).await.unwrap().summary.total, 0);

    let mine = contact_service
        .list(ContactFilter {
            user_id: Some(sender.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(mine.messages.items[0].id, invoice.id);

    let read = contact_service.set_read(invoice.id, true).await.unwrap();
    assert!(read.is_read);
    let first_read_at = read.read_at.unwrap();
    let again = contact_service.set_read(invoice.id, true).await.unwrap();
    assert_eq!(again.read_at, Some(first_read_at));

    let only_read = contact_service
        .list(ContactFilter {
            status: Some(ReadState::Read),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(only_read.summary.total, 1);
    let all = contact_service.list(ContactFilter::default()).await.unwrap();
    assert_eq!(all.summary.read, 1);
    assert_eq!(all.summary.unread, 2);

    let unread = contact_service.set_read(invoice.id, false).await.unwrap();
    assert!(!unread.is_read);
    assert_eq!(unread.read_at, None);

    let today = Utc::now().date_naive();
    let range = |start, end| ContactFilter {
        start_date: start,
        end_date: end,
        ..Default::default()
    };
    let tomorrow = contact_service
        .list(range(Some(today + Duration::days(1)), None))
        .await
        .unwrap();
    assert_eq!(tomorrow.summary.total, 0);
    let through_today = contact_service
        .list(range(Some(today), Some(today)))
        .await
        .unwrap();
    assert_eq!(through_today.summary.total, 3);
    let before_today = contact_service
        .list(range(None, Some(today - Duration::days(1))))
        .await
        .unwrap();
    assert_eq!(before_today.summary.total, 0);
}

#[tokio::test]
async fn contact_bulk_actions_count_only_changes() {
    let app = TestApp::new().await;
    let contact_service = &app.services().contact;
    let first = contact_service
        .submit(None, contact("Asha", "Pricing", "What does a listing cost?"))
        .await
        .unwrap();
    let second = contact_service
        .submit(None, contact("Vikram", "Refund", "I was charged twice."))
        .await
        .unwrap();
    let third = contact_service
        .submit(None, contact("Nisha", "Workers", "Do you list welders?"))
        .await
        .unwrap();
    let bulk = |ids: Vec<Uuid>, action| ContactBulkRequest { ids, action };

    let marked = contact_service
        .bulk(bulk(
            vec![first.id, second.id, Uuid::new_v4()],
            ContactBulkAction::MarkRead,
        ))
        .await
        .unwrap();
    assert_eq!(marked.changed, 2);
    let repeated = contact_service
        .bulk(bulk(vec![first.id, second.id], ContactBulkAction::MarkRead))
        .await
        .unwrap();
    assert_eq!(repeated.changed, 0);
    let unmarked = contact_service
        .bulk(bulk(
            vec![first.id, third.id],
            ContactBulkAction::MarkUnread,
        ))
        .await
        .unwrap();
    assert_eq!(unmarked.changed, 1);

    let deleted = contact_service
        .bulk(bulk(vec![first.id, second.id], ContactBulkAction::Delete))
        .await
        .unwrap();
    assert_eq!(deleted.changed, 2);
    let inbox = contact_service.list(ContactFilter::default()).await.unwrap();
    assert_eq!(inbox.summary.total, 1);
    assert_eq!(inbox.messages.items[0].id, third.id);

    let admin = &app.services().admin;
    let trash = admin.list_deleted(TrashKind::ContactMessage).await.unwrap();
    assert_eq!(trash.len(), 2);
    admin
        .restore(TrashKind::ContactMessage, first.id)
        .await
        .unwrap();
    assert_eq!(
        contact_service
            .list(ContactFilter::default())
            .await
            .unwrap()
            .summary
            .total,
        2
    );

    assert_matches!(
        contact_service
            .bulk(bulk(Vec::new(), ContactBulkAction::Delete))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        contact_service.delete(Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
}
