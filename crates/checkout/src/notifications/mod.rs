//! Customer and admin notifications, delivered off the request path.

mod dispatcher;
mod notifier;

pub use dispatcher::{Notification, NotificationDispatcher};
pub use notifier::{InMemoryNotifier, LoggingNotifier, Notifier, NotifyError, Sent};
