use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the consumer is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping domain event: {}", e);
        }
    }
}

/// Domain events emitted by the service layer after a successful commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    UserRegistered(Uuid),
    AccountLocked {
        user_id: Uuid,
        until: DateTime<Utc>,
    },
    CartItemAdded {
        user_id: Uuid,
        factory_id: Uuid,
        quantity: i32,
    },
    CartCleared(Uuid),
    OrderCreated {
        order_id: Uuid,
        order_number: String,
        total: Decimal,
    },
    OrderCompleted(Uuid),
    OrderCancelled(Uuid),
    PaymentProcessing(Uuid),
    PaymentCompleted(Uuid),
    PaymentFailed(Uuid),
    PaymentRefunded {
        payment_id: Uuid,
        amount: Decimal,
        fully_refunded: bool,
    },
    PurchaseRecorded {
        purchase_id: Uuid,
        factory_id: Uuid,
    },
    PurchaseMigrated {
        purchase_id: Uuid,
        order_id: Uuid,
    },
    FactoryCreated(Uuid),
    RecordSoftDeleted {
        kind: String,
        id: Uuid,
    },
    RecordRestored {
        kind: String,
        id: Uuid,
    },
    EmailFailed {
        recipient: String,
        subject: String,
    },
    PasswordResetRequested(Uuid),
    PasswordReset(Uuid),
    ContactMessageReceived(Uuid),
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PaymentFailed(payment_id) => {
                warn!(payment_id = %payment_id, "Payment failed");
            }
            Event::AccountLocked { user_id, until } => {
                warn!(user_id = %user_id, until = %until, "Account locked after repeated failed logins");
            }
            Event::EmailFailed { recipient, subject } => {
                warn!(recipient = %recipient, subject = %subject, "Email delivery failed");
            }
            Event::OrderCreated {
                order_id,
                order_number,
                total,
            } => {
                info!(order_id = %order_id, order_number = %order_number, total = %total, "Order created");
            }
            other => {
                info!(event = ?other, "Domain event");
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();

        sender.send(Event::OrderCompleted(id)).await.unwrap();
        match rx.recv().await {
            Some(Event::OrderCompleted(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_tolerates_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender.send(Event::CartCleared(Uuid::new_v4())).await.is_err());
        sender.send_or_log(Event::CartCleared(Uuid::new_v4())).await;
    }
}
