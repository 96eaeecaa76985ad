//! Background delivery of notifications.
//!
//! Workflows hand notifications to [`NotificationDispatcher::dispatch`], which
//! queues them and returns immediately. A single consumer task delivers them
//! through a [`Notifier`]; failures are logged and counted, never returned.

use domain::{Order, OrderStatus, User};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::Notifier;

/// Something worth telling a customer or an admin about.
#[derive(Debug, Clone)]
pub enum Notification {
    /// Sends the customer confirmation and the admin alert independently.
    OrderPlaced(Order),
    StatusChanged { order: Order, previous: OrderStatus },
    AccountVerification { user: User, token: String },
}

impl Notification {
    fn kind(&self) -> &'static str {
        match self {
            Notification::OrderPlaced(_) => "order_placed",
            Notification::StatusChanged { .. } => "status_changed",
            Notification::AccountVerification { .. } => "account_verification",
        }
    }
}

enum Message {
    Deliver(Box<Notification>),
    Flush(oneshot::Sender<()>),
}

/// Handle for queueing notifications. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<Message>,
}

impl NotificationDispatcher {
    /// Starts the consumer task. It runs until every handle is dropped.
    pub fn spawn<N: Notifier>(notifier: N) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(notifier, rx));
        (Self { tx }, handle)
    }

    pub fn dispatch(&self, notification: Notification) {
        let kind = notification.kind();
        if self.tx.send(Message::Deliver(Box::new(notification))).is_err() {
            tracing::warn!(kind, "notification consumer stopped; dropping notification");
            metrics::counter!("notifications_failed_total", "kind" => kind).increment(1);
        }
    }

    /// Waits until everything queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Message::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run<N: Notifier>(notifier: N, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = rx.recv().await {
        match message {
            Message::Deliver(notification) => deliver(&notifier, *notification).await,
            Message::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("notification consumer finished");
}

async fn deliver<N: Notifier>(notifier: &N, notification: Notification) {
    match notification {
        Notification::OrderPlaced(order) => {
            report(
                "order_confirmation",
                notifier.send_order_confirmation(&order).await,
            );
            report(
                "admin_new_order_alert",
                notifier.send_admin_new_order_alert(&order).await,
            );
        }
        Notification::StatusChanged { order, previous } => {
            report(
                "order_status_change",
                notifier.send_order_status_change(&order, previous).await,
            );
        }
        Notification::AccountVerification { user, token } => {
            report(
                "account_verification",
                notifier.send_account_verification(&user, &token).await,
            );
        }
    }
}

fn report(kind: &'static str, result: Result<(), super::NotifyError>) {
    match result {
        Ok(()) => metrics::counter!("notifications_sent_total", "kind" => kind).increment(1),
        Err(e) => {
            tracing::warn!(kind, error = %e, "notification failed");
            metrics::counter!("notifications_failed_total", "kind" => kind).increment(1);
        }
    }
}
