use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::{TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{NewUser, Task, TaskCreate, TaskOverview, TaskUpdate, User};

const TASK_COLUMNS: &str = "id, title, description, is_completed, priority, status, due_date, \
     focus_minutes, created_at, updated_at, owner_id";

const USER_COLUMNS: &str = "id, email, hashed_password, created_at, updated_at";

/// PostgreSQL-backed store. Every task statement filters on `owner_id`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and applies pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                log::error!("failed to run migrations: {}", e);
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, input: NewUser) -> Result<User, AppError> {
        let user = User::new(input);
        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, hashed_password, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::EmailAlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn list_tasks(
        &self,
        owner_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Task>, AppError> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE owner_id = $1
             ORDER BY created_at DESC
             OFFSET $2 LIMIT $3",
            TASK_COLUMNS
        ))
        .bind(owner_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    async fn create_task(&self, owner_id: Uuid, input: TaskCreate) -> Result<Task, AppError> {
        let task = Task::new(input, owner_id);
        let created = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks ({cols})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {cols}",
            cols = TASK_COLUMNS
        ))
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.is_completed)
        .bind(task.priority)
        .bind(task.status)
        .bind(task.due_date)
        .bind(task.focus_minutes)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_task(&self, task_id: Uuid, owner_id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND owner_id = $2",
            TASK_COLUMNS
        ))
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn update_task(
        &self,
        task_id: Uuid,
        owner_id: Uuid,
        changes: TaskUpdate,
    ) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET
                 title = COALESCE($3, title),
                 description = COALESCE($4, description),
                 priority = COALESCE($5, priority),
                 due_date = COALESCE($6, due_date),
                 status = COALESCE($7, status),
                 is_completed = CASE WHEN $7::task_status IS NULL THEN is_completed
                                     ELSE $7::task_status = 'DONE' END,
                 updated_at = NOW()
             WHERE id = $1 AND owner_id = $2
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(task_id)
        .bind(owner_id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.priority)
        .bind(changes.due_date)
        .bind(changes.status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn delete_task(&self, task_id: Uuid, owner_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(task_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_completion(
        &self,
        task_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Task>, AppError> {
        // The right-hand sides see the row as it was before the update.
        let task = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET
                 is_completed = NOT is_completed,
                 status = CASE WHEN is_completed THEN 'TODO'::task_status
                               ELSE 'DONE'::task_status END,
                 updated_at = NOW()
             WHERE id = $1 AND owner_id = $2
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn add_focus_minutes(
        &self,
        task_id: Uuid,
        owner_id: Uuid,
        minutes: i32,
    ) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET
                 focus_minutes = LEAST(focus_minutes::BIGINT + $3, 2147483647)::INTEGER,
                 status = CASE WHEN status = 'TODO' THEN 'IN_PROGRESS'::task_status
                               ELSE status END,
                 updated_at = NOW()
             WHERE id = $1 AND owner_id = $2
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(task_id)
        .bind(owner_id)
        .bind(minutes)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn tasks_overview(&self, owner_id: Uuid) -> Result<TaskOverview, AppError> {
        let (total, completed, in_progress, overdue, focus): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT
                     COUNT(*),
                     COUNT(*) FILTER (WHERE status = 'DONE'),
                     COUNT(*) FILTER (WHERE status = 'IN_PROGRESS'),
                     COUNT(*) FILTER (WHERE due_date < NOW() AND status <> 'DONE'),
                     COALESCE(SUM(focus_minutes), 0)::BIGINT
                 FROM tasks WHERE owner_id = $1",
            )
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(TaskOverview::new(total, completed, in_progress, overdue, focus))
    }
}
