use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{NewUser, Task, TaskCreate, TaskOverview, TaskStatus, TaskUpdate, User};

/// Process-local store. Used when no database is configured, and by the test suite.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    tasks: RwLock<HashMap<Uuid, Task>>,
}

fn poisoned<T>(_: T) -> AppError {
    AppError::InternalServerError("in-memory store lock poisoned".into())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, User>>, AppError> {
        self.users.read().map_err(poisoned)
    }

    fn users_mut(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, User>>, AppError> {
        self.users.write().map_err(poisoned)
    }

    fn tasks(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, Task>>, AppError> {
        self.tasks.read().map_err(poisoned)
    }

    fn tasks_mut(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, Task>>, AppError> {
        self.tasks.write().map_err(poisoned)
    }

    /// Removes an account and its tasks. Tokens already issued to it stay signed but
    /// no longer resolve to a user.
    pub fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let removed = self.users_mut()?.remove(&id).is_some();
        self.tasks_mut()?.retain(|_, task| task.owner_id != id);
        Ok(removed)
    }

    fn modify_task<F>(&self, task_id: Uuid, owner_id: Uuid, change: F) -> Result<Option<Task>, AppError>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.tasks_mut()?;
        match tasks.get_mut(&task_id) {
            Some(task) if task.owner_id == owner_id => {
                change(task);
                Ok(Some(task.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users()?.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users()?
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn create_user(&self, input: NewUser) -> Result<User, AppError> {
        let mut users = self.users_mut()?;
        if users.values().any(|user| user.email == input.email) {
            return Err(AppError::EmailAlreadyExists);
        }
        let user = User::new(input);
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_tasks(
        &self,
        owner_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Task>, AppError> {
        let mut owned: Vec<Task> = self
            .tasks()?
            .values()
            .filter(|task| task.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(owned
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn create_task(&self, owner_id: Uuid, input: TaskCreate) -> Result<Task, AppError> {
        let task = Task::new(input, owner_id);
        self.tasks_mut()?.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, task_id: Uuid, owner_id: Uuid) -> Result<Option<Task>, AppError> {
        Ok(self
            .tasks()?
            .get(&task_id)
            .filter(|task| task.owner_id == owner_id)
            .cloned())
    }

    async fn update_task(
        &self,
        task_id: Uuid,
        owner_id: Uuid,
        changes: TaskUpdate,
    ) -> Result<Option<Task>, AppError> {
        self.modify_task(task_id, owner_id, |task| {
            task.apply_update(&changes, Utc::now())
        })
    }

    async fn delete_task(&self, task_id: Uuid, owner_id: Uuid) -> Result<bool, AppError> {
        let mut tasks = self.tasks_mut()?;
        let owned = tasks
            .get(&task_id)
            .map_or(false, |task| task.owner_id == owner_id);
        if owned {
            tasks.remove(&task_id);
        }
        Ok(owned)
    }

    async fn toggle_completion(
        &self,
        task_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Task>, AppError> {
        self.modify_task(task_id, owner_id, |task| task.toggle_completion(Utc::now()))
    }

    async fn add_focus_minutes(
        &self,
        task_id: Uuid,
        owner_id: Uuid,
        minutes: i32,
    ) -> Result<Option<Task>, AppError> {
        self.modify_task(task_id, owner_id, |task| task.add_focus(minutes, Utc::now()))
    }

    async fn tasks_overview(&self, owner_id: Uuid) -> Result<TaskOverview, AppError> {
        let now = Utc::now();
        let tasks = self.tasks()?;
        let owned: Vec<&Task> = tasks
            .values()
            .filter(|task| task.owner_id == owner_id)
            .collect();

        let count = |pred: &dyn Fn(&Task) -> bool| owned.iter().filter(|t| pred(t)).count() as i64;

        Ok(TaskOverview::new(
            owned.len() as i64,
            count(&|t| t.status == TaskStatus::Done),
            count(&|t| t.status == TaskStatus::InProgress),
            count(&|t| t.is_overdue(now)),
            owned.iter().map(|t| t.focus_minutes as i64).sum(),
        ))
    }
}
