use actix_web::{get, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::response::Envelope;

/// Health check endpoint
///
/// Returns the current status of the API and timestamp.
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(Envelope::ok(json!({
        "status": "healthy",
        "timestamp": Utc::now()
    })))
}

/// Service banner at the root path.
#[get("/")]
pub async fn root() -> impl Responder {
    HttpResponse::Ok().json(Envelope::ok(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    })))
}
