//! Middleware modules for request processing

pub mod auth_context;
pub mod request;

// Re-export for convenience
pub use auth_context::{AuthContext, Claims};
pub use request::{audit_logging_middleware, create_cors_layer, request_timing_middleware};
