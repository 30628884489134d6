//! # rental-api: HTTP Server for the Rental Back Office
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Rental API Server                                │
//! │                                                                         │
//! │  Frontend ───► HTTP (8080) ───► routes ───► rental-db ───► SQLite       │
//! │                    │                            │                       │
//! │               TraceLayer                   rental-core                  │
//! │               CorsLayer                  (stock rules, FSMs)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The router is built here rather than in `main` so integration tests can
//! drive it in-process.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{ConfigError, RentalConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::categories::router())
        .merge(routes::items::router())
        .merge(routes::units::router())
        .merge(routes::loans::router())
        .merge(routes::reports::router())
        .merge(routes::users::router())
        .merge(routes::notifications::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
