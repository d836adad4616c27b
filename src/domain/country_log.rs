use crate::domain::Error;
use crate::domain::country_log::driven_ports::{CountryLogReader, CountryLogWriter};
use crate::domain::filters::PageQuery;
use crate::domain::query_cache::{QueryCache, QueryKey};
use crate::domain::view::{ListView, ViewItem};
use chrono::{DateTime, Utc};
use tracing::{error, info};
use validator::{Validate, ValidationError};

const RESOURCE: &str = "country-log";
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// A stay in a foreign country, tracked against the visa's day limit
#[derive(Debug, Clone, PartialEq)]
pub struct CountryLog {
    pub id: i64,
    pub user_id: i64,
    pub country_name: String,
    pub visa_type: String,
    pub entry_date: DateTime<Utc>,
    pub exit_date: DateTime<Utc>,
    pub visa_limit_days: i64,
    pub notify_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl CountryLog {
    /// Days spent in the country. Partial days count as a full day; an exit before the entry
    /// counts as zero.
    pub fn stay_length_days(&self) -> i64 {
        let seconds = (self.exit_date - self.entry_date).num_seconds();
        if seconds <= 0 {
            return 0;
        }
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }

    pub fn remaining_visa_days(&self) -> i64 {
        (self.visa_limit_days - self.stay_length_days()).max(0)
    }
}

impl ViewItem for CountryLog {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Validate)]
#[validate(schema(function = "exits_after_entry"))]
pub struct UpsertCountryLog {
    pub id: i64,
    pub user_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub country_name: String,
    #[validate(length(min = 1, max = 100))]
    pub visa_type: String,
    pub entry_date: DateTime<Utc>,
    pub exit_date: DateTime<Utc>,
    #[validate(range(min = 0))]
    pub visa_limit_days: i64,
    pub notify_at: Option<DateTime<Utc>>,
}

fn exits_after_entry(log: &UpsertCountryLog) -> Result<(), ValidationError> {
    if log.exit_date < log.entry_date {
        return Err(ValidationError::new("exit_before_entry"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CountryLogQuery {
    pub paging: PageQuery,
}

impl CountryLogQuery {
    pub fn key(&self) -> QueryKey {
        QueryKey::new(RESOURCE)
            .with(self.paging.page)
            .with(self.paging.page_size)
            .with(self.paging.sort)
            .with_opt(self.paging.search.as_deref())
    }
}

pub mod driven_ports {
    use super::*;
    use crate::domain::DrivenPortError;

    pub trait CountryLogReader {
        async fn country_log_page(
            &self,
            user_id: i64,
            query: &CountryLogQuery,
        ) -> Result<ListView<CountryLog>, DrivenPortError>;
        async fn country_log_by_id(
            &self,
            id: i64,
            user_id: i64,
        ) -> Result<CountryLog, DrivenPortError>;
    }

    pub trait CountryLogWriter {
        async fn create_country_log(
            &self,
            log: &UpsertCountryLog,
        ) -> Result<CountryLog, DrivenPortError>;
        async fn update_country_log(
            &self,
            id: i64,
            user_id: i64,
            log: &UpsertCountryLog,
        ) -> Result<CountryLog, DrivenPortError>;
        async fn delete_country_log(&self, id: i64, user_id: i64)
        -> Result<String, DrivenPortError>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait CountryLogPort {
        async fn page(
            &self,
            user_id: i64,
            query: &CountryLogQuery,
            log_read: &impl CountryLogReader,
        ) -> Result<ListView<CountryLog>, Error>;
        async fn country_log(
            &self,
            id: i64,
            user_id: i64,
            log_read: &impl CountryLogReader,
        ) -> Result<CountryLog, Error>;
        async fn create(
            &self,
            user_id: i64,
            log: UpsertCountryLog,
            log_write: &impl CountryLogWriter,
        ) -> Result<CountryLog, Error>;
        async fn update(
            &self,
            id: i64,
            user_id: i64,
            log: UpsertCountryLog,
            log_write: &impl CountryLogWriter,
        ) -> Result<CountryLog, Error>;
        async fn delete(
            &self,
            id: i64,
            user_id: i64,
            log_write: &impl CountryLogWriter,
        ) -> Result<String, Error>;
    }
}

#[derive(Default)]
pub struct CountryLogService {
    cache: QueryCache<CountryLog>,
}

impl CountryLogService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, query: &CountryLogQuery) -> Option<ListView<CountryLog>> {
        self.cache.get(&query.key())
    }
}

impl driving_ports::CountryLogPort for CountryLogService {
    async fn page(
        &self,
        user_id: i64,
        query: &CountryLogQuery,
        log_read: &impl CountryLogReader,
    ) -> Result<ListView<CountryLog>, Error> {
        self.cache
            .fetch(&query.key(), log_read.country_log_page(user_id, query))
            .await
            .map_err(|err| err.into_error_trying_to("load country logs"))
    }

    async fn country_log(
        &self,
        id: i64,
        user_id: i64,
        log_read: &impl CountryLogReader,
    ) -> Result<CountryLog, Error> {
        log_read
            .country_log_by_id(id, user_id)
            .await
            .map_err(|err| err.into_error_trying_to("load a country log"))
    }

    async fn create(
        &self,
        user_id: i64,
        mut log: UpsertCountryLog,
        log_write: &impl CountryLogWriter,
    ) -> Result<CountryLog, Error> {
        log.validate()?;
        log.user_id = user_id;

        info!("Logging stay in {}", log.country_name);
        let result = log_write.create_country_log(&log).await;
        self.cache.invalidate_resource(RESOURCE);

        result.map_err(|err| {
            error!("Country log create failure: {err}");
            err.into_error_trying_to("create a country log")
        })
    }

    async fn update(
        &self,
        id: i64,
        user_id: i64,
        mut log: UpsertCountryLog,
        log_write: &impl CountryLogWriter,
    ) -> Result<CountryLog, Error> {
        log.validate()?;
        log.id = id;
        log.user_id = user_id;

        info!("Updating country log {id}");
        let result = log_write.update_country_log(id, user_id, &log).await;
        self.cache.invalidate_resource(RESOURCE);

        result.map_err(|err| {
            error!("Country log update failure: {err}");
            err.into_error_trying_to("update a country log")
        })
    }

    async fn delete(
        &self,
        id: i64,
        user_id: i64,
        log_write: &impl CountryLogWriter,
    ) -> Result<String, Error> {
        info!("Deleting country log {id}");
        let result = log_write.delete_country_log(id, user_id).await;
        self.cache.invalidate_resource(RESOURCE);

        result.map_err(|err| err.into_error_trying_to("delete a country log"))
    }
}
