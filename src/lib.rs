#![doc = "The `focentra` library crate."]
#![doc = ""]
#![doc = "Domain models, persistence, session authentication, per-request authorization,"]
#![doc = "rate limiting, routing and error handling for the Focentra task API."]
#![doc = "The binary (`main.rs`) only loads configuration and runs the server."]

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;

pub use error::AppError;
pub use state::AppState;
