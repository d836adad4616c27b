use super::{ApiClient, page_params, with_body};
use crate::domain::DrivenPortError;
use crate::domain::meeting::driven_ports::{MeetingReader, MeetingWriter};
use crate::domain::meeting::{MeetingQuery, MeetingSchedule, UpsertMeeting};
use crate::domain::view::ListView;
use crate::dto::meeting::{MeetingScheduleDto, UpsertMeetingDto};
use crate::dto::view::ListViewDto;
use crate::external_connections::{ApiRequest, HttpTransport};

impl<T: HttpTransport> MeetingReader for ApiClient<T> {
    #[tracing::instrument(skip(self))]
    async fn meeting_page(
        &self,
        user_id: i64,
        query: &MeetingQuery,
    ) -> Result<ListView<MeetingSchedule>, DrivenPortError> {
        let request = ApiRequest::get(self.endpoint("/meeting-schedule/get-by-paging")?)
            .with_query(page_params(&query.paging, user_id, None));
        let page: ListViewDto<MeetingScheduleDto> = self.call(request).await?;

        Ok(page.into())
    }

    #[tracing::instrument(skip(self))]
    async fn meeting_by_id(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<MeetingSchedule, DrivenPortError> {
        let request = ApiRequest::get(
            self.endpoint(&format!("/meeting-schedule/get-by-id/{id}/{user_id}"))?,
        );
        let meeting: MeetingScheduleDto = self.call(request).await?;

        Ok(meeting.into())
    }

    /// The calendar file comes back as plain text, not wrapped in the usual envelope
    #[tracing::instrument(skip(self))]
    async fn ics_content(&self, id: i64, user_id: i64) -> Result<String, DrivenPortError> {
        let request = ApiRequest::get(self.endpoint(&format!(
            "/meeting-schedule/generate-ics-content/{id}/{user_id}"
        ))?);
        Ok(self.call_text(request).await?)
    }
}

impl<T: HttpTransport> MeetingWriter for ApiClient<T> {
    #[tracing::instrument(skip(self, meeting))]
    async fn create_meeting(
        &self,
        meeting: &UpsertMeeting,
    ) -> Result<MeetingSchedule, DrivenPortError> {
        let request = with_body(
            ApiRequest::post(self.endpoint("/meeting-schedule/insert")?),
            &UpsertMeetingDto::from(meeting),
        )?;
        let created: MeetingScheduleDto = self.call(request).await?;

        Ok(created.into())
    }

    #[tracing::instrument(skip(self, meeting))]
    async fn update_meeting(
        &self,
        id: i64,
        user_id: i64,
        meeting: &UpsertMeeting,
    ) -> Result<MeetingSchedule, DrivenPortError> {
        let request = with_body(
            ApiRequest::put(self.endpoint(&format!("/meeting-schedule/update/{id}/{user_id}"))?),
            &UpsertMeetingDto::from(meeting),
        )?;
        let updated: MeetingScheduleDto = self.call(request).await?;

        Ok(updated.into())
    }

    #[tracing::instrument(skip(self))]
    async fn soft_delete_meeting(&self, id: i64, user_id: i64) -> Result<String, DrivenPortError> {
        let request = ApiRequest::patch(
            self.endpoint(&format!("/meeting-schedule/soft-delete/{id}/{user_id}"))?,
        );
        Ok(self.call(request).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn hard_delete_meeting(&self, id: i64, user_id: i64) -> Result<String, DrivenPortError> {
        let request = ApiRequest::delete(
            self.endpoint(&format!("/meeting-schedule/hard-delete/{id}/{user_id}"))?,
        );
        Ok(self.call(request).await?)
    }
}
