use crate::domain::Error;
use crate::domain::notification::driven_ports::NotificationHistoryReader;
use chrono::{DateTime, Utc};
use derive_more::Display;
use std::sync::{PoisonError, RwLock};
use tracing::info;

/// Reminder pushed by the notification service for a task, meeting, or visa deadline
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    /// Kind of record the reminder is about, e.g. "task"
    pub source_type: String,
    pub source_id: i64,
    pub title: String,
    pub message: String,
    pub notify_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub sent: bool,
}

/// State of the live notification connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConnectionStatus {
    #[display("connecting")]
    Connecting,
    #[display("connected")]
    Connected,
    #[display("disconnected")]
    Disconnected,
    #[display("error")]
    Error,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

/// Notifications received over the live connection, oldest first
#[derive(Default)]
pub struct NotificationFeed {
    received: RwLock<Vec<Notification>>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notification: Notification) {
        self.received
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }

    pub fn clear(&self) {
        self.received
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.received
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.received
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Received notifications the service has not marked as sent
    pub fn unsent(&self) -> Vec<Notification> {
        self.received
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|notification| !notification.sent)
            .cloned()
            .collect()
    }
}

pub mod driven_ports {
    use super::*;
    use crate::domain::DrivenPortError;

    pub trait NotificationHistoryReader {
        async fn notification_history(
            &self,
            user_id: i64,
        ) -> Result<Vec<Notification>, DrivenPortError>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait NotificationPort {
        async fn history(
            &self,
            user_id: i64,
            history_read: &impl NotificationHistoryReader,
        ) -> Result<Vec<Notification>, Error>;
    }
}

pub struct NotificationService;

impl driving_ports::NotificationPort for NotificationService {
    async fn history(
        &self,
        user_id: i64,
        history_read: &impl NotificationHistoryReader,
    ) -> Result<Vec<Notification>, Error> {
        let history = history_read
            .notification_history(user_id)
            .await
            .map_err(|err| err.into_error_trying_to("load notifications"))?;
        info!("Loaded {} past notifications for user {user_id}", history.len());

        Ok(history)
    }
}
