use crate::domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(test, derive(Serialize))]
pub struct CountryLogDto {
    pub id: i64,
    pub user_id: i64,
    pub country_name: String,
    pub visa_type: String,
    pub entry_date: DateTime<Utc>,
    pub exit_date: DateTime<Utc>,
    pub visa_limit_days: i64,
    #[serde(default)]
    pub notify_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<CountryLogDto> for domain::country_log::CountryLog {
    fn from(value: CountryLogDto) -> Self {
        domain::country_log::CountryLog {
            id: value.id,
            user_id: value.user_id,
            country_name: value.country_name,
            visa_type: value.visa_type,
            entry_date: value.entry_date,
            exit_date: value.exit_date,
            visa_limit_days: value.visa_limit_days,
            notify_at: value.notify_at,
            created_at: value.created_at,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct UpsertCountryLogDto {
    pub id: i64,
    pub user_id: i64,
    pub country_name: String,
    pub visa_type: String,
    pub entry_date: DateTime<Utc>,
    pub exit_date: DateTime<Utc>,
    pub visa_limit_days: i64,
    pub notify_at: Option<DateTime<Utc>>,
}

impl From<&domain::country_log::UpsertCountryLog> for UpsertCountryLogDto {
    fn from(value: &domain::country_log::UpsertCountryLog) -> Self {
        UpsertCountryLogDto {
            id: value.id,
            user_id: value.user_id,
            country_name: value.country_name.clone(),
            visa_type: value.visa_type.clone(),
            entry_date: value.entry_date,
            exit_date: value.exit_date,
            visa_limit_days: value.visa_limit_days,
            notify_at: value.notify_at,
        }
    }
}
