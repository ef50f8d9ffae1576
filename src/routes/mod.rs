pub mod auth;
pub mod health;
pub mod tasks;

use actix_web::{error, web, HttpRequest, HttpResponse};

use crate::error::AppError;

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::ValidationError(format!("Invalid request body: {}", err)).into()
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::ValidationError(format!("Invalid path parameter: {}", err)).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::ValidationError(format!("Invalid query parameters: {}", err)).into()
}

/// Registers every route plus the extractor configs that turn malformed input into
/// `422 VALIDATION_ERROR` envelopes.
///
/// Static scopes are registered before `/{user_id}/tasks`, since a matched scope does not
/// fall through to later ones.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .service(health::health)
        .service(health::root)
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .service(auth::register)
                        .service(auth::login)
                        .service(auth::logout)
                        .service(auth::me),
                )
                .service(
                    web::scope("/tasks")
                        .service(tasks::overview)
                        .service(tasks::log_focus_session),
                )
                .service(
                    web::scope("/{user_id}/tasks")
                        .service(tasks::list_tasks)
                        .service(tasks::create_task)
                        .service(tasks::get_task)
                        .service(tasks::update_task)
                        .service(tasks::delete_task)
                        .service(tasks::toggle_completion),
                ),
        );
}

/// Fallback for unmatched routes.
pub async fn not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound)
}
