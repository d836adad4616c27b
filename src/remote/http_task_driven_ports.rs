use super::{ApiClient, with_body};
use crate::domain::DrivenPortError;
use crate::domain::task::driven_ports::{TaskReader, TaskWriter};
use crate::domain::task::{Task, TaskViewQuery, UpsertTask};
use crate::domain::view::ListView;
use crate::dto::task::{TaskDto, UpsertTaskDto};
use crate::dto::view::ListViewDto;
use crate::external_connections::{ApiRequest, HttpTransport};

/// Query string of `/task/get-by-view`. The cursor is always sent, empty on the first page.
fn view_params(user_id: i64, query: &TaskViewQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("viewMode", query.view_mode.to_string()),
        ("cursor", query.cursor.clone().unwrap_or_default()),
        ("limit", query.limit.to_string()),
        ("userId", user_id.to_string()),
    ];
    params.extend(query.month.params());
    params.push(("sortDir", query.sort.to_string()));

    if let Some(search) = &query.search {
        params.push(("q", search.clone()));
    }
    if let Some(status) = query.status {
        params.push(("status", status.title().to_owned()));
    }
    if let Some(priority) = query.priority {
        params.push(("priority", priority.to_string()));
    }

    params
}

impl<T: HttpTransport> TaskReader for ApiClient<T> {
    #[tracing::instrument(skip(self))]
    async fn task_view(
        &self,
        user_id: i64,
        query: &TaskViewQuery,
    ) -> Result<ListView<Task>, DrivenPortError> {
        let request =
            ApiRequest::get(self.endpoint("/task/get-by-view")?).with_query(view_params(user_id, query));
        let view: ListViewDto<TaskDto> = self.call(request).await?;

        Ok(view.into())
    }

    #[tracing::instrument(skip(self))]
    async fn task_by_id(&self, id: i64, user_id: i64) -> Result<Task, DrivenPortError> {
        let request = ApiRequest::get(self.endpoint(&format!("/task/get-by-id/{id}/{user_id}"))?);
        let task: TaskDto = self.call(request).await?;

        Ok(task.into())
    }
}

impl<T: HttpTransport> TaskWriter for ApiClient<T> {
    #[tracing::instrument(skip(self, task))]
    async fn create_task(&self, task: &UpsertTask) -> Result<Task, DrivenPortError> {
        let request = with_body(
            ApiRequest::post(self.endpoint("/task/insert")?),
            &UpsertTaskDto::from(task),
        )?;
        let created: TaskDto = self.call(request).await?;

        Ok(created.into())
    }

    #[tracing::instrument(skip(self, task))]
    async fn update_task(
        &self,
        id: i64,
        user_id: i64,
        task: &UpsertTask,
    ) -> Result<Task, DrivenPortError> {
        let request = with_body(
            ApiRequest::put(self.endpoint(&format!("/task/update/{id}/{user_id}"))?),
            &UpsertTaskDto::from(task),
        )?;
        let updated: TaskDto = self.call(request).await?;

        Ok(updated.into())
    }

    #[tracing::instrument(skip(self))]
    async fn soft_delete_task(&self, id: i64, user_id: i64) -> Result<String, DrivenPortError> {
        let request = ApiRequest::patch(self.endpoint(&format!("/task/soft-delete/{id}/{user_id}"))?);
        Ok(self.call(request).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn hard_delete_task(&self, id: i64, user_id: i64) -> Result<String, DrivenPortError> {
        let request = ApiRequest::delete(self.endpoint(&format!("/task/hard-delete/{id}/{user_id}"))?);
        Ok(self.call(request).await?)
    }
}
