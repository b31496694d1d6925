//! StudyDesk Server - research form data collection API
//!
//! HTTP surface over the StudyDesk database layer: hospitals, users,
//! studies, forms, submissions with unique key enforcement, completion
//! profiles and admin export.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use config::Settings;
pub use error::*;
pub use server::StudyDeskServer;

use axum::{middleware::from_fn, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Create the main application router with all routes and middleware
pub fn create_app(server: StudyDeskServer) -> Router {
    let timeout = Duration::from_secs(server.config.server.request_timeout);

    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::create_cors_layer(&server.config.cors))
                .layer(TimeoutLayer::new(timeout))
                .layer(from_fn(middleware::request_timing_middleware))
                .layer(from_fn(middleware::audit_logging_middleware)),
        )
        .with_state(server)
}
