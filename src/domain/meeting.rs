use crate::domain::Error;
use crate::domain::filters::PageQuery;
use crate::domain::meeting::driven_ports::{MeetingReader, MeetingWriter};
use crate::domain::query_cache::{QueryCache, QueryKey};
use crate::domain::view::{ListView, ViewItem};
use chrono::{DateTime, Utc};
use tracing::{error, info};
use validator::{Validate, ValidationError};

const RESOURCE: &str = "meeting-schedule";

#[derive(Debug, Clone, PartialEq)]
pub struct MeetingSchedule {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ViewItem for MeetingSchedule {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Validate)]
#[validate(schema(function = "ends_after_start"))]
pub struct UpsertMeeting {
    pub id: i64,
    pub user_id: i64,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

fn ends_after_start(meeting: &UpsertMeeting) -> Result<(), ValidationError> {
    if meeting.end_time < meeting.start_time {
        return Err(ValidationError::new("end_before_start"));
    }
    Ok(())
}

/// Calendar file for a meeting, ready to be saved or attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcsFile {
    pub file_name: String,
    /// RFC 5545 text rendered by the server
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MeetingQuery {
    pub paging: PageQuery,
}

impl MeetingQuery {
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

    pub trait MeetingReader {
        async fn meeting_page(
            &self,
            user_id: i64,
            query: &MeetingQuery,
        ) -> Result<ListView<MeetingSchedule>, DrivenPortError>;
        async fn meeting_by_id(
            &self,
            id: i64,
            user_id: i64,
        ) -> Result<MeetingSchedule, DrivenPortError>;
        async fn ics_content(&self, id: i64, user_id: i64) -> Result<String, DrivenPortError>;
    }

    pub trait MeetingWriter {
        async fn create_meeting(
            &self,
            meeting: &UpsertMeeting,
        ) -> Result<MeetingSchedule, DrivenPortError>;
        async fn update_meeting(
            &self,
            id: i64,
            user_id: i64,
            meeting: &UpsertMeeting,
        ) -> Result<MeetingSchedule, DrivenPortError>;
        async fn soft_delete_meeting(&self, id: i64, user_id: i64)
        -> Result<String, DrivenPortError>;
        async fn hard_delete_meeting(&self, id: i64, user_id: i64)
        -> Result<String, DrivenPortError>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait MeetingPort {
        async fn page(
            &self,
            user_id: i64,
            query: &MeetingQuery,
            meeting_read: &impl MeetingReader,
        ) -> Result<ListView<MeetingSchedule>, Error>;
        async fn meeting(
            &self,
            id: i64,
            user_id: i64,
            meeting_read: &impl MeetingReader,
        ) -> Result<MeetingSchedule, Error>;
        async fn create(
            &self,
            user_id: i64,
            meeting: UpsertMeeting,
            meeting_write: &impl MeetingWriter,
        ) -> Result<MeetingSchedule, Error>;
        async fn update(
            &self,
            id: i64,
            user_id: i64,
            meeting: UpsertMeeting,
            meeting_write: &impl MeetingWriter,
        ) -> Result<MeetingSchedule, Error>;
        async fn soft_delete(
            &self,
            id: i64,
            user_id: i64,
            meeting_write: &impl MeetingWriter,
        ) -> Result<String, Error>;
        async fn hard_delete(
            &self,
            id: i64,
            user_id: i64,
            meeting_write: &impl MeetingWriter,
        ) -> Result<String, Error>;
        async fn ics_content(
            &self,
            id: i64,
            user_id: i64,
            meeting_read: &impl MeetingReader,
        ) -> Result<IcsFile, Error>;
    }
}

/// Meeting schedule operations. Mutations drop every cached meeting page.
#[derive(Default)]
pub struct MeetingService {
    cache: QueryCache<MeetingSchedule>,
}

impl MeetingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, query: &MeetingQuery) -> Option<ListView<MeetingSchedule>> {
        self.cache.get(&query.key())
    }
}

impl driving_ports::MeetingPort for MeetingService {
    async fn page(
        &self,
        user_id: i64,
        query: &MeetingQuery,
        meeting_read: &impl MeetingReader,
    ) -> Result<ListView<MeetingSchedule>, Error> {
        self.cache
            .fetch(&query.key(), meeting_read.meeting_page(user_id, query))
            .await
            .map_err(|err| err.into_error_trying_to("load meetings"))
    }

    async fn meeting(
        &self,
        id: i64,
        user_id: i64,
        meeting_read: &impl MeetingReader,
    ) -> Result<MeetingSchedule, Error> {
        meeting_read
            .meeting_by_id(id, user_id)
            .await
            .map_err(|err| err.into_error_trying_to("load a meeting"))
    }

    async fn create(
        &self,
        user_id: i64,
        mut meeting: UpsertMeeting,
        meeting_write: &impl MeetingWriter,
    ) -> Result<MeetingSchedule, Error> {
        meeting.validate()?;
        meeting.user_id = user_id;

        info!("Scheduling meeting \"{}\"", meeting.title);
        let result = meeting_write.create_meeting(&meeting).await;
        self.cache.invalidate_resource(RESOURCE);

        result.map_err(|err| {
            error!("Meeting create failure: {err}");
            err.into_error_trying_to("schedule a meeting")
        })
    }

    async fn update(
        &self,
        id: i64,
        user_id: i64,
        mut meeting: UpsertMeeting,
        meeting_write: &impl MeetingWriter,
    ) -> Result<MeetingSchedule, Error> {
        meeting.validate()?;
        meeting.id = id;
        meeting.user_id = user_id;

        info!("Updating meeting {id}");
        let result = meeting_write.update_meeting(id, user_id, &meeting).await;
        self.cache.invalidate_resource(RESOURCE);

        result.map_err(|err| {
            error!("Meeting update failure: {err}");
            err.into_error_trying_to("update a meeting")
        })
    }

    async fn soft_delete(
        &self,
        id: i64,
        user_id: i64,
        meeting_write: &impl MeetingWriter,
    ) -> Result<String, Error> {
        info!("Deleting meeting {id}");
        let result = meeting_write.soft_delete_meeting(id, user_id).await;
        self.cache.invalidate_resource(RESOURCE);

        result.map_err(|err| err.into_error_trying_to("delete a meeting"))
    }

    async fn hard_delete(
        &self,
        id: i64,
        user_id: i64,
        meeting_write: &impl MeetingWriter,
    ) -> Result<String, Error> {
        info!("Permanently deleting meeting {id}");
        let result = meeting_write.hard_delete_meeting(id, user_id).await;
        self.cache.invalidate_resource(RESOURCE);

        result.map_err(|err| err.into_error_trying_to("permanently delete a meeting"))
    }

    async fn ics_content(
        &self,
        id: i64,
        user_id: i64,
        meeting_read: &impl MeetingReader,
    ) -> Result<IcsFile, Error> {
        let content = meeting_read
            .ics_content(id, user_id)
            .await
            .map_err(|err| err.into_error_trying_to("generate a calendar file"))?;

        Ok(IcsFile {
            file_name: format!("meeting-{id}.ics"),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DrivenPortError;
    use crate::domain::meeting::driving_ports::MeetingPort;
    use crate::domain::test_util::FakeImplementation;
    use crate::domain::view::Page;
    use chrono::{Duration, TimeZone};
    use speculoos::prelude::*;
    use std::sync::RwLock;

    struct FakeMeetingRemote {
        meetings: Vec<MeetingSchedule>,
        ics: FakeImplementation<(i64, i64), Result<String, DrivenPortError>>,
        created: FakeImplementation<UpsertMeeting, ()>,
    }

    fn standup(id: i64) -> MeetingSchedule {
        let start = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        MeetingSchedule {
            id,
            user_id: 1,
            title: format!("Standup {id}"),
            description: String::new(),
            start_time: start,
            end_time: start + Duration::minutes(15),
            created_at: None,
        }
    }

    fn upsert_standup() -> UpsertMeeting {
        let meeting = standup(0);
        UpsertMeeting {
            id: 0,
            user_id: 0,
            title: meeting.title,
            description: meeting.description,
            start_time: meeting.start_time,
            end_time: meeting.end_time,
        }
    }

    fn remote_with(ids: &[i64]) -> RwLock<FakeMeetingRemote> {
        RwLock::new(FakeMeetingRemote {
            meetings: ids.iter().copied().map(standup).collect(),
            ics: FakeImplementation::new(),
            created: FakeImplementation::new(),
        })
    }

    impl MeetingReader for RwLock<FakeMeetingRemote> {
        async fn meeting_page(
            &self,
            _user_id: i64,
            query: &MeetingQuery,
        ) -> Result<ListView<MeetingSchedule>, DrivenPortError> {
            let remote = self.read().expect("meeting remote lock poisoned");
            Ok(ListView::Paged(Page {
                results: remote.meetings.clone(),
                page: query.paging.page,
                total_page: 1,
                additional_data: None,
            }))
        }

        async fn meeting_by_id(
            &self,
            id: i64,
            _user_id: i64,
        ) -> Result<MeetingSchedule, DrivenPortError> {
            let remote = self.read().expect("meeting remote lock poisoned");
            remote
                .meetings
                .iter()
                .find(|meeting| meeting.id == id)
                .cloned()
                .ok_or(DrivenPortError::DoesNotExist)
        }

        async fn ics_content(&self, id: i64, user_id: i64) -> Result<String, DrivenPortError> {
            let mut remote = self.write().expect("meeting remote lock poisoned");
            remote.ics.save_arguments((id, user_id));
            remote.ics.return_value_result()
        }
    }

    impl MeetingWriter for RwLock<FakeMeetingRemote> {
        async fn create_meeting(
            &self,
            meeting: &UpsertMeeting,
        ) -> Result<MeetingSchedule, DrivenPortError> {
            let mut remote = self.write().expect("meeting remote lock poisoned");
            remote.created.save_arguments(meeting.clone());
            let mut created = standup(remote.meetings.len() as i64 + 1);
            created.user_id = meeting.user_id;
            remote.meetings.push(created.clone());
            Ok(created)
        }

        async fn update_meeting(
            &self,
            _id: i64,
            _user_id: i64,
            _meeting: &UpsertMeeting,
        ) -> Result<MeetingSchedule, DrivenPortError> {
            Err(DrivenPortError::DoesNotExist)
        }

        async fn soft_delete_meeting(
            &self,
            id: i64,
            _user_id: i64,
        ) -> Result<String, DrivenPortError> {
            let mut remote = self.write().expect("meeting remote lock poisoned");
            remote.meetings.retain(|meeting| meeting.id != id);
            Ok("Meeting deleted".to_owned())
        }

        async fn hard_delete_meeting(
            &self,
            id: i64,
            user_id: i64,
        ) -> Result<String, DrivenPortError> {
            self.soft_delete_meeting(id, user_id).await
        }
    }

    #[tokio::test]
    async fn create_drops_cached_pages() {
        let remote = remote_with(&[1]);
        let service = MeetingService::new();
        let query = MeetingQuery::default();
        service.page(1, &query, &remote).await.expect("initial fetch");

        let created = service.create(5, upsert_standup(), &remote).await;

        assert_that!(created).is_ok().matches(|meeting| meeting.user_id == 5);
        assert_that!(service.cached(&query)).is_none();
        let reloaded = service.page(5, &query, &remote).await.expect("reload");
        assert_eq!(2, reloaded.items().len());
    }

    #[tokio::test]
    async fn rejects_meeting_ending_before_start() {
        let remote = remote_with(&[]);
        let mut meeting = upsert_standup();
        meeting.end_time = meeting.start_time - Duration::hours(1);

        let created = MeetingService::new().create(1, meeting, &remote).await;

        let Err(Error::Invalid(_)) = created else {
            panic!("Expected a validation failure, got {created:#?}");
        };
        assert!(remote.read().expect("lock").created.calls().is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_meeting() {
        let remote = remote_with(&[1]);

        let updated = MeetingService::new()
            .update(3, 1, upsert_standup(), &remote)
            .await;

        let Err(Error::DoesNotExist) = updated else {
            panic!("Expected a missing meeting, got {updated:#?}");
        };
    }

    #[tokio::test]
    async fn delete_drops_cached_pages() {
        let remote = remote_with(&[1, 2]);
        let service = MeetingService::new();
        let query = MeetingQuery::default();
        service.page(1, &query, &remote).await.expect("initial fetch");

        let deleted = service.soft_delete(1, 1, &remote).await;

        assert_that!(deleted).is_ok();
        assert_that!(service.cached(&query)).is_none();
    }

    mod ics_content {
        use super::*;

        #[tokio::test]
        async fn names_file_after_meeting() {
            let remote = remote_with(&[4]);
            remote
                .write()
                .expect("lock")
                .ics
                .set_returned_result(Ok("BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n".to_owned()));

            let file = MeetingService::new().ics_content(4, 1, &remote).await;

            assert_that!(file).is_ok().is_equal_to(IcsFile {
                file_name: "meeting-4.ics".to_owned(),
                content: "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n".to_owned(),
            });
            assert_eq!(&[(4, 1)], remote.read().expect("lock").ics.calls());
        }

        #[tokio::test]
        async fn reports_server_rejection() {
            let remote = remote_with(&[4]);
            remote
                .write()
                .expect("lock")
                .ics
                .set_returned_result(Err(DrivenPortError::Rejected {
                    status: 404,
                    message: "Meeting not found".to_owned(),
                }));

            let file = MeetingService::new().ics_content(4, 1, &remote).await;

            assert_that!(file)
                .is_err()
                .matches(|err| matches!(err, Error::Rejected { .. }));
        }
    }
}
