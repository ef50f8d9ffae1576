use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task is yet to be started.
    #[default]
    Todo,
    /// Focus time has been logged or the task was moved along explicitly.
    InProgress,
    /// Task is completed.
    Done,
}

fn not_in_past(due_date: &DateTime<Utc>) -> Result<(), ValidationError> {
    if *due_date < Utc::now() {
        let mut error = ValidationError::new("due_date_in_past");
        error.message = Some("Due date cannot be in the past.".into());
        return Err(error);
    }
    Ok(())
}

fn trim_owned(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.len() == value.len() {
        value
    } else {
        trimmed.to_string()
    }
}

/// Payload for creating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskCreate {
    /// 1 to 255 characters once surrounding whitespace is removed.
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(min = 1, max = 5000))]
    pub description: Option<String>,

    /// Defaults to `MEDIUM`.
    pub priority: Option<TaskPriority>,

    /// Defaults to `TODO`.
    pub status: Option<TaskStatus>,

    /// Must not be in the past at creation time.
    #[validate(custom = "not_in_past")]
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskCreate {
    /// Strips surrounding whitespace from the text fields. Call before `validate`.
    pub fn trimmed(self) -> Self {
        Self {
            title: trim_owned(self.title),
            description: self.description.map(trim_owned),
            ..self
        }
    }
}

/// Partial update. Only the fields present are changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TaskUpdate {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 5000))]
    pub description: Option<String>,

    pub priority: Option<TaskPriority>,

    pub status: Option<TaskStatus>,

    pub due_date: Option<DateTime<Utc>>,
}

impl TaskUpdate {
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.map(trim_owned),
            description: self.description.map(trim_owned),
            ..self
        }
    }
}

/// Payload for logging a focus session against a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct FocusSessionRequest {
    #[validate(range(min = 1, max = 480))]
    pub minutes: i32,
}

fn default_limit() -> i64 {
    20
}

/// Query parameters for listing tasks.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskListQuery {
    #[serde(default)]
    #[validate(range(min = 0))]
    pub skip: i64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: i64,
}

impl Default for TaskListQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Always equal to `status == DONE`.
    pub is_completed: bool,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    /// Total minutes of focus time logged against the task.
    pub focus_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Identifier of the user who owns the task.
    pub owner_id: Uuid,
}

impl Task {
    /// Creates a new `Task` instance from `TaskCreate` and the owner's id.
    /// Sets `created_at`, `updated_at` to the current time, and `id` to a new UUID.
    pub fn new(input: TaskCreate, owner_id: Uuid) -> Self {
        let now = Utc::now();
        let status = input.status.unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            is_completed: status == TaskStatus::Done,
            priority: input.priority.unwrap_or_default(),
            status,
            due_date: input.due_date,
            focus_minutes: 0,
            created_at: now,
            updated_at: now,
            owner_id,
        }
    }

    pub fn apply_update(&mut self, changes: &TaskUpdate, now: DateTime<Utc>) {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(description) = &changes.description {
            self.description = Some(description.clone());
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = Some(due_date);
        }
        if let Some(status) = changes.status {
            self.status = status;
            self.is_completed = status == TaskStatus::Done;
        }
        self.updated_at = now;
    }

    /// Flips completion: `DONE` goes back to `TODO`, anything else becomes `DONE`.
    pub fn toggle_completion(&mut self, now: DateTime<Utc>) {
        self.is_completed = !self.is_completed;
        self.status = if self.is_completed {
            TaskStatus::Done
        } else {
            TaskStatus::Todo
        };
        self.updated_at = now;
    }

    /// Adds focus time, capped at `i32::MAX`. A task still in `TODO` moves to `IN_PROGRESS`.
    pub fn add_focus(&mut self, minutes: i32, now: DateTime<Utc>) {
        self.focus_minutes = self.focus_minutes.saturating_add(minutes);
        if self.status == TaskStatus::Todo {
            self.status = TaskStatus::InProgress;
        }
        self.updated_at = now;
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Done && self.due_date.map_or(false, |due| due < now)
    }
}

/// Aggregate deep-work metrics over one user's tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskOverview {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub in_progress_tasks: i64,
    pub overdue_tasks: i64,
    pub total_focus_minutes: i64,
    /// Percentage of tasks done, rounded to two decimals.
    pub completion_rate: f64,
}

impl TaskOverview {
    pub fn new(
        total_tasks: i64,
        completed_tasks: i64,
        in_progress_tasks: i64,
        overdue_tasks: i64,
        total_focus_minutes: i64,
    ) -> Self {
        let completion_rate = if total_tasks > 0 {
            let rate = completed_tasks as f64 / total_tasks as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        } else {
            0.0
        };
        Self {
            total_tasks,
            completed_tasks,
            in_progress_tasks,
            overdue_tasks,
            total_focus_minutes,
            completion_rate,
        }
    }
}
