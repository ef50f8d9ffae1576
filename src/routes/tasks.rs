use crate::{
    auth::{
        authorize_task_path, enforce_path_owner, fetch_owned_task, parse_task_id,
        require_owned, AuthenticatedUser,
    },
    error::AppError,
    models::{FocusSessionRequest, TaskCreate, TaskListQuery, TaskUpdate},
    response::Envelope,
    state::AppState,
};
use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use validator::Validate;

/// Lists the caller's tasks, newest first.
///
/// ## Query Parameters:
/// - `skip` (optional, default 0): Number of tasks to skip. Must be at least 0.
/// - `limit` (optional, default 20): Page size, between 1 and 100.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `Task` objects.
/// - `401 Unauthorized`: If the request lacks a valid session.
/// - `403 Forbidden`: If `{user_id}` is not the caller.
/// - `422 Unprocessable Entity`: If `skip` or `limit` is out of range.
#[get("")]
pub async fn list_tasks(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    user_id: web::Path<String>,
    query: web::Query<TaskListQuery>,
) -> Result<HttpResponse, AppError> {
    let owner_id = enforce_path_owner(&user_id, &user.0)?;
    query.validate()?;

    let tasks = state
        .tasks
        .list_tasks(owner_id, query.skip, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(Envelope::ok(tasks)))
}

/// Creates a new task for the caller.
///
/// ## Request Body:
/// A JSON object matching `TaskCreate`:
/// - `title`: 1 to 255 characters after trimming (required).
/// - `description` (optional): 1 to 5000 characters after trimming.
/// - `priority` (optional): `LOW`, `MEDIUM` (default) or `HIGH`.
/// - `status` (optional): `TODO` (default), `IN_PROGRESS` or `DONE`.
/// - `due_date` (optional): RFC 3339 timestamp, not in the past.
///
/// ## Responses:
/// - `201 Created`: Returns the newly created `Task`.
/// - `403 Forbidden`: If `{user_id}` is not the caller.
/// - `422 Unprocessable Entity`: If the payload is malformed or fails validation.
#[post("")]
pub async fn create_task(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    user_id: web::Path<String>,
    task_data: web::Json<TaskCreate>,
) -> Result<HttpResponse, AppError> {
    let owner_id = enforce_path_owner(&user_id, &user.0)?;

    let input = task_data.into_inner().trimmed();
    input.validate()?;

    let task = state.tasks.create_task(owner_id, input).await?;
    log::debug!("user {} created task {}", owner_id, task.id);

    Ok(HttpResponse::Created().json(Envelope::ok(task)))
}

/// Retrieves a specific task.
///
/// ## Responses:
/// - `200 OK`: Returns the `Task`.
/// - `403 Forbidden`: If `{user_id}` is not the caller.
/// - `404 Not Found`: If the task does not exist or belongs to another user.
/// - `422 Unprocessable Entity`: If `{task_id}` is not a UUID.
#[get("/{task_id}")]
pub async fn get_task(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (user_id, task_id) = path.into_inner();
    let task = fetch_owned_task(state.tasks.as_ref(), &user.0, &user_id, &task_id).await?;

    Ok(HttpResponse::Ok().json(Envelope::ok(task)))
}

/// Partially updates a task. Fields left out of the body keep their values.
///
/// Setting `status` also keeps `is_completed` in step with it.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task`.
/// - `403 Forbidden`, `404 Not Found`, `422 Unprocessable Entity`: As for `get_task`.
#[put("/{task_id}")]
pub async fn update_task(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    task_data: web::Json<TaskUpdate>,
) -> Result<HttpResponse, AppError> {
    let (user_id, task_id) = path.into_inner();
    let (owner_id, task_id) = authorize_task_path(&user.0, &user_id, &task_id)?;

    let changes = task_data.into_inner().trimmed();
    changes.validate()?;

    let task = require_owned(state.tasks.update_task(task_id, owner_id, changes).await?)?;

    Ok(HttpResponse::Ok().json(Envelope::ok(task)))
}

/// Deletes a task.
///
/// ## Responses:
/// - `204 No Content`: The task was deleted.
/// - `403 Forbidden`, `404 Not Found`, `422 Unprocessable Entity`: As for `get_task`.
#[delete("/{task_id}")]
pub async fn delete_task(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (user_id, task_id) = path.into_inner();
    let (owner_id, task_id) = authorize_task_path(&user.0, &user_id, &task_id)?;

    if !state.tasks.delete_task(task_id, owner_id).await? {
        return Err(AppError::TaskNotFound);
    }
    log::debug!("user {} deleted task {}", owner_id, task_id);

    Ok(HttpResponse::NoContent().finish())
}

/// Toggles completion: a `DONE` task returns to `TODO`, anything else becomes `DONE`.
#[patch("/{task_id}/complete")]
pub async fn toggle_completion(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (user_id, task_id) = path.into_inner();
    let (owner_id, task_id) = authorize_task_path(&user.0, &user_id, &task_id)?;

    let task = require_owned(state.tasks.toggle_completion(task_id, owner_id).await?)?;

    Ok(HttpResponse::Ok().json(Envelope::ok(task)))
}

/// Aggregate metrics over the caller's tasks.
#[get("/overview")]
pub async fn overview(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let overview = state.tasks.tasks_overview(user.0.id).await?;
    Ok(HttpResponse::Ok().json(Envelope::ok(overview)))
}

/// Logs a focus session against one of the caller's tasks.
///
/// ## Request Body:
/// - `minutes`: Between 1 and 480.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task`; a `TODO` task moves to `IN_PROGRESS`.
/// - `404 Not Found`: If the task does not exist or belongs to another user.
/// - `422 Unprocessable Entity`: If `minutes` is out of range or `{task_id}` is not a UUID.
#[post("/{task_id}/focus")]
pub async fn log_focus_session(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    task_id: web::Path<String>,
    focus: web::Json<FocusSessionRequest>,
) -> Result<HttpResponse, AppError> {
    let task_id = parse_task_id(&task_id)?;
    focus.validate()?;

    let task = require_owned(
        state
            .tasks
            .add_focus_minutes(task_id, user.0.id, focus.minutes)
            .await?,
    )?;

    Ok(HttpResponse::Ok().json(Envelope::ok(task)))
}
