//! User-facing notification sink.

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Operation completed.
    Success,
    /// Operation failed.
    Error,
    /// Neutral information.
    Info,
}

/// Single message addressed to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Human-readable text.
    pub message: String,
    /// How long the message should stay visible, if the sink cares.
    pub duration: Option<Duration>,
}

/// Fire-and-forget delivery of notifications.
pub trait Notifier: Send + Sync {
    /// Deliver a notification. Failures must not propagate.
    fn notify(&self, notification: Notification);

    /// Report a successful operation.
    fn success(&self, message: &str, duration: Option<Duration>) {
        self.notify(Notification {
            level: NotificationLevel::Success,
            message: message.to_owned(),
            duration,
        });
    }

    /// Report a failed operation.
    fn error(&self, message: &str, duration: Option<Duration>) {
        self.notify(Notification {
            level: NotificationLevel::Error,
            message: message.to_owned(),
            duration,
        });
    }

    /// Report neutral information.
    fn info(&self, message: &str, duration: Option<Duration>) {
        self.notify(Notification {
            level: NotificationLevel::Info,
            message: message.to_owned(),
            duration,
        });
    }
}

pub(crate) fn dispatch<N: Notifier + ?Sized>(
    notifier: &N,
    level: NotificationLevel,
    message: &str,
    duration: Option<Duration>,
) {
    match level {
        NotificationLevel::Success => notifier.success(message, duration),
        NotificationLevel::Error => notifier.error(message, duration),
        NotificationLevel::Info => notifier.info(message, duration),
    }
}

/// Writes notifications to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => warn!(message = %notification.message, "notification"),
            NotificationLevel::Success | NotificationLevel::Info => {
                info!(level = ?notification.level, message = %notification.message, "notification");
            }
        }
    }
}

/// Forwards notifications to a presentation layer over a channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver that drains it.
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        // A closed receiver means nobody is listening anymore.
        let _ = self.tx.send(notification);
    }
}
