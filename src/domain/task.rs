use crate::domain;
use crate::domain::Error;
use crate::domain::filters::{MonthFilter, SortDirection, non_blank};
use crate::domain::query_cache::{QueryCache, QueryKey};
use crate::domain::task::driven_ports::{TaskReader, TaskWriter};
use crate::domain::view::{BoardItem, ListView, MoveOutcome, ViewItem};
use chrono::{DateTime, Utc};
use derive_more::Display;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use tracing::{error, info, warn};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TaskStatus {
    #[display("To Do")]
    ToDo,
    #[display("In Progress")]
    InProgress,
    #[display("Done")]
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::ToDo, Self::InProgress, Self::Done];

    /// Human readable name, also used as the kanban column title
    pub fn title(self) -> &'static str {
        match self {
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Key of the kanban column holding tasks with this status
    pub fn column_key(self) -> &'static str {
        match self {
            Self::ToDo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn from_title(title: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.title() == title)
    }

    pub fn from_column_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.column_key() == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn from_title(title: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.to_string() == title)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub notify_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_deleted: Option<bool>,
}

impl Task {
    /// Builds the placeholder shown while the server is still creating the task
    fn optimistic(temp_id: i64, user_id: i64, upsert: &UpsertTask) -> Task {
        let mut task = Task {
            id: temp_id,
            user_id,
            title: None,
            description: None,
            status: upsert.status,
            priority: upsert.priority,
            start_date: None,
            due_date: None,
            notify_at: None,
            created_at: Some(Utc::now()),
            is_deleted: Some(false),
        };
        task.apply(upsert);
        task
    }

    /// Copies the editable fields of an upsert onto this task
    pub fn apply(&mut self, upsert: &UpsertTask) {
        self.title = upsert.title.clone();
        self.description = upsert.description.clone();
        self.status = upsert.status;
        self.priority = upsert.priority;
        self.start_date = upsert.start_date;
        self.due_date = upsert.due_date;
        self.notify_at = upsert.notify_at;
    }

    /// Upsert that writes this task back unchanged
    pub fn to_upsert(&self) -> UpsertTask {
        UpsertTask {
            id: self.id,
            user_id: self.user_id,
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            priority: self.priority,
            start_date: self.start_date,
            due_date: self.due_date,
            notify_at: self.notify_at,
        }
    }
}

impl ViewItem for Task {
    fn id(&self) -> i64 {
        self.id
    }

    fn board_title(&self) -> Option<&'static str> {
        Some(self.status.title())
    }
}

impl BoardItem for Task {
    fn status(&self) -> TaskStatus {
        self.status
    }

    fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }
}

/// Data sent to create or update a task. [UpsertTask::id] is 0 for new tasks.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct UpsertTask {
    pub id: i64,
    pub user_id: i64,
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub notify_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum ViewMode {
    #[default]
    #[display("board")]
    Board,
    #[display("list")]
    List,
}

pub const DEFAULT_TASK_LIMIT: u32 = 20;

/// Filters for the task board and the infinite-scroll task list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskViewQuery {
    pub view_mode: ViewMode,
    pub cursor: Option<String>,
    pub limit: u32,
    pub month: MonthFilter,
    pub sort: SortDirection,
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl TaskViewQuery {
    pub fn new(view_mode: ViewMode, month: MonthFilter) -> Self {
        TaskViewQuery {
            view_mode,
            cursor: None,
            limit: DEFAULT_TASK_LIMIT,
            month,
            sort: SortDirection::default(),
            search: None,
            status: None,
            priority: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = non_blank(search.into());
        self
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::new("tasks")
            .with(self.view_mode)
            .with_opt(self.cursor.as_deref())
            .with(self.limit)
            .with(self.month.year)
            .with(self.month.month)
            .with(self.sort)
            .with_opt(self.search.as_deref())
            .with_opt(self.status)
            .with_opt(self.priority)
    }

    /// The same query continuing from [cursor]
    fn continuing_from(&self, cursor: &str) -> Self {
        TaskViewQuery {
            cursor: Some(cursor.to_owned()),
            ..self.clone()
        }
    }
}

pub mod driven_ports {
    use super::*;
    use crate::domain::DrivenPortError;

    pub trait TaskReader {
        async fn task_view(
            &self,
            user_id: i64,
            query: &TaskViewQuery,
        ) -> Result<ListView<Task>, DrivenPortError>;
        async fn task_by_id(&self, id: i64, user_id: i64) -> Result<Task, DrivenPortError>;
    }

    pub trait TaskWriter {
        async fn create_task(&self, task: &UpsertTask) -> Result<Task, DrivenPortError>;
        async fn update_task(
            &self,
            id: i64,
            user_id: i64,
            task: &UpsertTask,
        ) -> Result<Task, DrivenPortError>;
        async fn soft_delete_task(&self, id: i64, user_id: i64) -> Result<String, DrivenPortError>;
        async fn hard_delete_task(&self, id: i64, user_id: i64) -> Result<String, DrivenPortError>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait TaskPort {
        async fn view(
            &self,
            user_id: i64,
            query: &TaskViewQuery,
            task_read: &impl TaskReader,
        ) -> Result<ListView<Task>, Error>;
        async fn task(&self, id: i64, user_id: i64, task_read: &impl TaskReader)
        -> Result<Task, Error>;
        async fn create(
            &self,
            user_id: i64,
            query: &TaskViewQuery,
            task: UpsertTask,
            task_read: &impl TaskReader,
            task_write: &impl TaskWriter,
        ) -> Result<Task, Error>;
        async fn edit(
            &self,
            id: i64,
            user_id: i64,
            query: &TaskViewQuery,
            task: UpsertTask,
            task_read: &impl TaskReader,
            task_write: &impl TaskWriter,
        ) -> Result<Task, Error>;
        async fn move_status(
            &self,
            id: i64,
            user_id: i64,
            query: &TaskViewQuery,
            status: TaskStatus,
            task_read: &impl TaskReader,
            task_write: &impl TaskWriter,
        ) -> Result<Task, Error>;
        async fn remove(
            &self,
            id: i64,
            user_id: i64,
            query: &TaskViewQuery,
            task_read: &impl TaskReader,
            task_write: &impl TaskWriter,
        ) -> Result<String, Error>;
        async fn hard_delete(
            &self,
            id: i64,
            user_id: i64,
            query: &TaskViewQuery,
            task_read: &impl TaskReader,
            task_write: &impl TaskWriter,
        ) -> Result<String, Error>;
        async fn load_more(
            &self,
            user_id: i64,
            query: &TaskViewQuery,
            task_read: &impl TaskReader,
        ) -> Result<bool, Error>;
    }
}

/// Task operations with optimistic updates to the cached board or list
pub struct TaskService {
    cache: QueryCache<Task>,
    loading_more: Mutex<HashSet<QueryKey>>,
}

impl Default for TaskService {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskService {
    pub fn new() -> Self {
        TaskService {
            cache: QueryCache::new(),
            loading_more: Mutex::new(HashSet::new()),
        }
    }

    /// The currently cached view for a query, without going to the server
    pub fn cached(&self, query: &TaskViewQuery) -> Option<ListView<Task>> {
        self.cache.get(&query.key())
    }

    async fn refetch(&self, user_id: i64, query: &TaskViewQuery, task_read: &impl TaskReader) {
        self.cache
            .refetch(&query.key(), task_read.task_view(user_id, query))
            .await;
    }

    /// Marks the next page of a list as loading. None if it is already being loaded.
    fn start_loading_more(&self, key: &QueryKey) -> Option<LoadingMoreGuard<'_>> {
        let mut loading = self
            .loading_more
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !loading.insert(key.clone()) {
            return None;
        }

        Some(LoadingMoreGuard {
            loading: &self.loading_more,
            key: key.clone(),
        })
    }
}

/// Releases a list's loading-more mark when the load finishes or its future is dropped
struct LoadingMoreGuard<'service> {
    loading: &'service Mutex<HashSet<QueryKey>>,
    key: QueryKey,
}

impl Drop for LoadingMoreGuard<'_> {
    fn drop(&mut self) {
        self.loading
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl driving_ports::TaskPort for TaskService {
    async fn view(
        &self,
        user_id: i64,
        query: &TaskViewQuery,
        task_read: &impl TaskReader,
    ) -> Result<ListView<Task>, Error> {
        self.cache
            .fetch(&query.key(), task_read.task_view(user_id, query))
            .await
            .map_err(|err| err.into_error_trying_to("load tasks"))
    }

    async fn task(
        &self,
        id: i64,
        user_id: i64,
        task_read: &impl TaskReader,
    ) -> Result<Task, Error> {
        task_read
            .task_by_id(id, user_id)
            .await
            .map_err(|err| err.into_error_trying_to("load a task"))
    }

    async fn create(
        &self,
        user_id: i64,
        query: &TaskViewQuery,
        mut task: UpsertTask,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
    ) -> Result<Task, Error> {
        task.validate()?;
        task.user_id = user_id;

        let key = query.key();
        let temp_id = domain::temporary_id();
        self.cache.cancel(&key);
        self.cache.optimistic(&key, |view| {
            view.insert(Task::optimistic(temp_id, user_id, &task))
        });

        info!("Creating task for user {user_id}");
        match task_write.create_task(&task).await {
            Ok(created) => {
                self.cache.optimistic(&key, |view| {
                    view.update(temp_id, |placeholder| *placeholder = created.clone())
                });
                self.refetch(user_id, query, task_read).await;
                Ok(created)
            }
            Err(err) => {
                error!("Task create failure: {err}");
                self.refetch(user_id, query, task_read).await;
                Err(err.into_error_trying_to("create a task"))
            }
        }
    }

    async fn edit(
        &self,
        id: i64,
        user_id: i64,
        query: &TaskViewQuery,
        mut task: UpsertTask,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
    ) -> Result<Task, Error> {
        task.validate()?;
        task.id = id;
        task.user_id = user_id;

        let key = query.key();
        self.cache.cancel(&key);
        self.cache
            .optimistic(&key, |view| view.update(id, |cached| cached.apply(&task)));

        info!("Updating task {id}");
        match task_write.update_task(id, user_id, &task).await {
            Ok(updated) => {
                self.cache.optimistic(&key, |view| view.replace(updated.clone()));
                self.refetch(user_id, query, task_read).await;
                Ok(updated)
            }
            Err(err) => {
                error!("Task update failure: {err}");
                self.refetch(user_id, query, task_read).await;
                Err(err.into_error_trying_to("update a task"))
            }
        }
    }

    async fn move_status(
        &self,
        id: i64,
        user_id: i64,
        query: &TaskViewQuery,
        status: TaskStatus,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
    ) -> Result<Task, Error> {
        let key = query.key();
        let Some(current) = self.cache.get(&key).and_then(|view| view.find(id).cloned()) else {
            return Err(Error::DoesNotExist);
        };

        self.cache.cancel(&key);
        let outcome = self.cache.optimistic(&key, |view| view.move_to(id, status));
        if let Some(MoveOutcome::TargetMissing { target }) = &outcome {
            warn!("Board for {key} has no \"{target}\" column, task {id} stays put until refetch");
        }

        let mut update = current.to_upsert();
        update.user_id = user_id;
        update.status = status;

        info!("Moving task {id} to {status}");
        match task_write.update_task(id, user_id, &update).await {
            Ok(updated) => {
                self.cache.optimistic(&key, |view| view.replace(updated.clone()));
                self.refetch(user_id, query, task_read).await;
                Ok(updated)
            }
            Err(err) => {
                error!("Task status update failure: {err}");
                self.refetch(user_id, query, task_read).await;
                Err(err.into_error_trying_to("move a task"))
            }
        }
    }

    async fn remove(
        &self,
        id: i64,
        user_id: i64,
        query: &TaskViewQuery,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
    ) -> Result<String, Error> {
        let key = query.key();
        self.cache.cancel(&key);
        self.cache.optimistic(&key, |view| view.remove(id));

        info!("Deleting task {id}");
        let result = task_write.soft_delete_task(id, user_id).await;
        self.refetch(user_id, query, task_read).await;

        result.map_err(|err| {
            error!("Task delete failure: {err}");
            err.into_error_trying_to("delete a task")
        })
    }

    async fn hard_delete(
        &self,
        id: i64,
        user_id: i64,
        query: &TaskViewQuery,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
    ) -> Result<String, Error> {
        let key = query.key();
        self.cache.cancel(&key);
        self.cache.optimistic(&key, |view| view.remove(id));

        info!("Permanently deleting task {id}");
        let result = task_write.hard_delete_task(id, user_id).await;
        self.refetch(user_id, query, task_read).await;

        result.map_err(|err| {
            error!("Task hard delete failure: {err}");
            err.into_error_trying_to("permanently delete a task")
        })
    }

    async fn load_more(
        &self,
        user_id: i64,
        query: &TaskViewQuery,
        task_read: &impl TaskReader,
    ) -> Result<bool, Error> {
        let key = query.key();
        let next_cursor = match self.cache.get(&key) {
            Some(ListView::Cursor(page)) if page.has_next_page => page.next_cursor,
            _ => None,
        };
        let Some(cursor) = next_cursor else {
            return Ok(false);
        };
        let Some(loading) = self.start_loading_more(&key) else {
            return Ok(false);
        };

        let next = task_read
            .task_view(user_id, &query.continuing_from(&cursor))
            .await;
        drop(loading);

        match next.map_err(|err| err.into_error_trying_to("load more tasks"))? {
            ListView::Cursor(page) => Ok(self
                .cache
                .optimistic(&key, |view| view.merge_next_page(page))
                .unwrap_or(false)),
            other => {
                warn!("Expected a cursor page when loading more tasks, got {:?}", other.kind());
                Ok(false)
            }
        }
    }
}
