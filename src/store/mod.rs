//! Persistence contracts for users and tasks.
//!
//! Every task operation takes the owner's id and is scoped by it in a single lookup, so a
//! task that exists but belongs to someone else is indistinguishable from one that does
//! not exist.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewUser, Task, TaskCreate, TaskOverview, TaskUpdate, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Fails with `AppError::EmailAlreadyExists` when the email is taken.
    async fn create_user(&self, input: NewUser) -> Result<User, AppError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Newest first.
    async fn list_tasks(&self, owner_id: Uuid, skip: i64, limit: i64)
        -> Result<Vec<Task>, AppError>;

    async fn create_task(&self, owner_id: Uuid, input: TaskCreate) -> Result<Task, AppError>;

    async fn find_task(&self, task_id: Uuid, owner_id: Uuid) -> Result<Option<Task>, AppError>;

    async fn update_task(
        &self,
        task_id: Uuid,
        owner_id: Uuid,
        changes: TaskUpdate,
    ) -> Result<Option<Task>, AppError>;

    /// Returns `false` when nothing was deleted.
    async fn delete_task(&self, task_id: Uuid, owner_id: Uuid) -> Result<bool, AppError>;

    async fn toggle_completion(
        &self,
        task_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Task>, AppError>;

    async fn add_focus_minutes(
        &self,
        task_id: Uuid,
        owner_id: Uuid,
        minutes: i32,
    ) -> Result<Option<Task>, AppError>;

    async fn tasks_overview(&self, owner_id: Uuid) -> Result<TaskOverview, AppError>;
}
