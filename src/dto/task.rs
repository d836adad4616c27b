use crate::domain;
use crate::domain::task::{TaskPriority, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatusDto {
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
}

impl From<TaskStatusDto> for TaskStatus {
    fn from(value: TaskStatusDto) -> Self {
        match value {
            TaskStatusDto::ToDo => TaskStatus::ToDo,
            TaskStatusDto::InProgress => TaskStatus::InProgress,
            TaskStatusDto::Done => TaskStatus::Done,
        }
    }
}

impl From<TaskStatus> for TaskStatusDto {
    fn from(value: TaskStatus) -> Self {
        match value {
            TaskStatus::ToDo => TaskStatusDto::ToDo,
            TaskStatus::InProgress => TaskStatusDto::InProgress,
            TaskStatus::Done => TaskStatusDto::Done,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPriorityDto {
    High,
    Medium,
    Low,
}

impl From<TaskPriorityDto> for TaskPriority {
    fn from(value: TaskPriorityDto) -> Self {
        match value {
            TaskPriorityDto::High => TaskPriority::High,
            TaskPriorityDto::Medium => TaskPriority::Medium,
            TaskPriorityDto::Low => TaskPriority::Low,
        }
    }
}

impl From<TaskPriority> for TaskPriorityDto {
    fn from(value: TaskPriority) -> Self {
        match value {
            TaskPriority::High => TaskPriorityDto::High,
            TaskPriority::Medium => TaskPriorityDto::Medium,
            TaskPriority::Low => TaskPriorityDto::Low,
        }
    }
}

/// A task as the backend returns it
#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(test, derive(Serialize))]
pub struct TaskDto {
    pub id: i64,
    pub user_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: TaskStatusDto,
    pub priority: TaskPriorityDto,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub notify_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_deleted: Option<bool>,
}

impl From<TaskDto> for domain::task::Task {
    fn from(value: TaskDto) -> Self {
        domain::task::Task {
            id: value.id,
            user_id: value.user_id,
            title: value.title,
            description: value.description,
            status: value.status.into(),
            priority: value.priority.into(),
            start_date: value.start_date,
            due_date: value.due_date,
            notify_at: value.notify_at,
            created_at: value.created_at,
            is_deleted: value.is_deleted,
        }
    }
}

/// Body of task insert and update requests
#[derive(Serialize, Debug)]
#[cfg_attr(test, derive(Deserialize))]
pub struct UpsertTaskDto {
    pub id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: TaskStatusDto,
    pub priority: TaskPriorityDto,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub notify_at: Option<DateTime<Utc>>,
}

impl From<&domain::task::UpsertTask> for UpsertTaskDto {
    fn from(value: &domain::task::UpsertTask) -> Self {
        UpsertTaskDto {
            id: value.id,
            user_id: value.user_id,
            title: value.title.clone(),
            description: value.description.clone(),
            status: value.status.into(),
            priority: value.priority.into(),
            start_date: value.start_date,
            due_date: value.due_date,
            notify_at: value.notify_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::UpsertTask;
    use serde_json::json;

    #[test]
    fn reads_backend_task() {
        let dto: TaskDto = serde_json::from_value(json!({
            "id": 12,
            "user_id": 3,
            "title": "Pay rent",
            "description": null,
            "status": "In Progress",
            "priority": "High",
            "start_date": "2025-06-01T00:00:00Z",
            "due_date": null,
            "notify_at": null,
            "created_at": "2025-05-30T10:15:00Z",
            "is_deleted": false
        }))
        .expect("task should decode");

        let task = domain::task::Task::from(dto);
        assert_eq!(TaskStatus::InProgress, task.status);
        assert_eq!(TaskPriority::High, task.priority);
        assert!(task.start_date.is_some());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let decoded = serde_json::from_value::<TaskStatusDto>(json!("Blocked"));
        assert!(decoded.is_err());
    }

    #[test]
    fn upsert_uses_camel_case_owner() {
        let upsert = UpsertTask {
            id: 0,
            user_id: 3,
            title: Some("Pay rent".to_owned()),
            description: None,
            status: TaskStatus::ToDo,
            priority: TaskPriority::Low,
            start_date: None,
            due_date: None,
            notify_at: None,
        };

        let body = serde_json::to_value(UpsertTaskDto::from(&upsert)).expect("serializes");

        assert_eq!(json!(3), body["userId"]);
        assert_eq!(json!("To Do"), body["status"]);
        assert_eq!(json!(null), body["due_date"]);
    }
}
