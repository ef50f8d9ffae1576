use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{http::header, web, App, HttpServer};
use env_logger::Env;

use focentra::config::Config;
use focentra::rate_limit::RateLimitMiddleware;
use focentra::{routes, AppState};

fn startup_error(err: focentra::AppError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(startup_error)?;
    let state = web::Data::new(AppState::build(&config).await.map_err(startup_error)?);

    let policy = *state.rate_limiter.policy();
    log::info!(
        "rate limits: {} authenticated / {} anonymous per {}s window, fail_open={}",
        policy.authenticated_limit,
        policy.unauthenticated_limit,
        policy.window_seconds,
        policy.fail_open
    );
    log::info!("Starting Focentra server at {}", config.server_url());

    let cors_origin = config.cors_origin.clone();
    let server_state = state.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(server_state.clone())
            .wrap(RateLimitMiddleware::new(server_state.rate_limiter.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(routes::config)
            .default_service(web::to(routes::not_found))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await?;

    log::info!("Server stopped, releasing resources");
    state.shutdown().await;
    Ok(())
}
