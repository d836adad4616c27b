use crate::domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification as sent by the notification service, over HTTP or the live socket
#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(test, derive(Serialize))]
pub struct NotificationDto {
    pub id: i64,
    pub user_id: i64,
    pub source_type: String,
    pub source_id: i64,
    pub title: String,
    pub message: String,
    pub notify_at: DateTime<Utc>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sent: bool,
}

impl From<NotificationDto> for domain::notification::Notification {
    fn from(value: NotificationDto) -> Self {
        domain::notification::Notification {
            id: value.id,
            user_id: value.user_id,
            source_type: value.source_type,
            source_id: value.source_id,
            title: value.title,
            message: value.message,
            notify_at: value.notify_at,
            sent_at: value.sent_at,
            created_at: value.created_at,
            sent: value.sent,
        }
    }
}

/// First frame sent after the socket opens
#[derive(Serialize, Debug)]
pub struct SubscribeMessage {
    pub action: &'static str,
    #[serde(rename = "userId")]
    pub user_id: i64,
}

impl SubscribeMessage {
    pub fn for_user(user_id: i64) -> Self {
        SubscribeMessage {
            action: "subscribe",
            user_id,
        }
    }
}
