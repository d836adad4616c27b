use super::{ApiClient, page_params, with_body};
use crate::domain::DrivenPortError;
use crate::domain::country_log::driven_ports::{CountryLogReader, CountryLogWriter};
use crate::domain::country_log::{CountryLog, CountryLogQuery, UpsertCountryLog};
use crate::domain::view::ListView;
use crate::dto::country_log::{CountryLogDto, UpsertCountryLogDto};
use crate::dto::view::ListViewDto;
use crate::external_connections::{ApiRequest, HttpTransport};

impl<T: HttpTransport> CountryLogReader for ApiClient<T> {
    #[tracing::instrument(skip(self))]
    async fn country_log_page(
        &self,
        user_id: i64,
        query: &CountryLogQuery,
    ) -> Result<ListView<CountryLog>, DrivenPortError> {
        let request = ApiRequest::get(self.endpoint("/country-log/get-by-paging")?)
            .with_query(page_params(&query.paging, user_id, None));
        let page: ListViewDto<CountryLogDto> = self.call(request).await?;

        Ok(page.into())
    }

    #[tracing::instrument(skip(self))]
    async fn country_log_by_id(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<CountryLog, DrivenPortError> {
        let request =
            ApiRequest::get(self.endpoint(&format!("/country-log/get-by-id/{id}/{user_id}"))?);
        let log: CountryLogDto = self.call(request).await?;

        Ok(log.into())
    }
}

impl<T: HttpTransport> CountryLogWriter for ApiClient<T> {
    #[tracing::instrument(skip(self, log))]
    async fn create_country_log(
        &self,
        log: &UpsertCountryLog,
    ) -> Result<CountryLog, DrivenPortError> {
        let request = with_body(
            ApiRequest::post(self.endpoint("/country-log/insert")?),
            &UpsertCountryLogDto::from(log),
        )?;
        let created: CountryLogDto = self.call(request).await?;

        Ok(created.into())
    }

    #[tracing::instrument(skip(self, log))]
    async fn update_country_log(
        &self,
        id: i64,
        user_id: i64,
        log: &UpsertCountryLog,
    ) -> Result<CountryLog, DrivenPortError> {
        let request = with_body(
            ApiRequest::put(self.endpoint(&format!("/country-log/update/{id}/{user_id}"))?),
            &UpsertCountryLogDto::from(log),
        )?;
        let updated: CountryLogDto = self.call(request).await?;

        Ok(updated.into())
    }

    /// Country logs have no soft delete
    #[tracing::instrument(skip(self))]
    async fn delete_country_log(&self, id: i64, user_id: i64) -> Result<String, DrivenPortError> {
        let request =
            ApiRequest::delete(self.endpoint(&format!("/country-log/delete/{id}/{user_id}"))?);
        Ok(self.call(request).await?)
    }
}
