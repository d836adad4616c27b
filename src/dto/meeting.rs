use crate::domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(test, derive(Serialize))]
pub struct MeetingScheduleDto {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// The backend spells this `create_at`
    #[serde(alias = "create_at", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<MeetingScheduleDto> for domain::meeting::MeetingSchedule {
    fn from(value: MeetingScheduleDto) -> Self {
        domain::meeting::MeetingSchedule {
            id: value.id,
            user_id: value.user_id,
            title: value.title,
            description: value.description.unwrap_or_default(),
            start_time: value.start_time,
            end_time: value.end_time,
            created_at: value.created_at,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct UpsertMeetingDto {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<&domain::meeting::UpsertMeeting> for UpsertMeetingDto {
    fn from(value: &domain::meeting::UpsertMeeting) -> Self {
        UpsertMeetingDto {
            id: value.id,
            user_id: value.user_id,
            title: value.title.clone(),
            description: value.description.clone(),
            start_time: value.start_time,
            end_time: value.end_time,
        }
    }
}
