//! Per-request authorization for user-scoped resources.
//!
//! Routes of the form `/api/{user_id}/tasks/...` pass two checks. The path must name the
//! caller, which is decided before any storage access. The task is then looked up by
//! `(task_id, owner_id)` in one query, so a task that belongs to someone else is reported
//! exactly like one that does not exist.

use uuid::Uuid;

use super::guard::Principal;
use crate::error::AppError;
use crate::models::Task;
use crate::store::TaskStore;

/// Checks that the `{user_id}` path segment is the caller and returns it parsed.
///
/// A segment that is not a UUID cannot name the caller and is also `Forbidden`.
pub fn enforce_path_owner(path_user_id: &str, principal: &Principal) -> Result<Uuid, AppError> {
    match Uuid::parse_str(path_user_id) {
        Ok(id) if id == principal.id => Ok(id),
        _ => {
            log::debug!(
                "user {} denied access to path owned by {:?}",
                principal.id,
                path_user_id
            );
            Err(AppError::Forbidden)
        }
    }
}

/// Parses the `{task_id}` path segment. A malformed id is a request error, not a lookup miss.
pub fn parse_task_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::ValidationError("Invalid task id.".into()))
}

/// Layer 1 for `/api/{user_id}/tasks/{task_id}` routes. Returns `(owner_id, task_id)`.
pub fn authorize_task_path(
    principal: &Principal,
    path_user_id: &str,
    raw_task_id: &str,
) -> Result<(Uuid, Uuid), AppError> {
    let owner_id = enforce_path_owner(path_user_id, principal)?;
    let task_id = parse_task_id(raw_task_id)?;
    Ok((owner_id, task_id))
}

/// Maps an owner-scoped lookup result to `TaskNotFound` when empty.
pub fn require_owned(task: Option<Task>) -> Result<Task, AppError> {
    task.ok_or(AppError::TaskNotFound)
}

/// Runs both layers and returns the task.
pub async fn fetch_owned_task(
    tasks: &dyn TaskStore,
    principal: &Principal,
    path_user_id: &str,
    raw_task_id: &str,
) -> Result<Task, AppError> {
    let (owner_id, task_id) = authorize_task_path(principal, path_user_id, raw_task_id)?;
    require_owned(tasks.find_task(task_id, owner_id).await?)
}
