//! Common error types and error codes for StudyDesk
//!
//! [`StudyDeskError`] covers failures at the process level (startup,
//! configuration, serving, maintenance jobs). Request-level errors live in
//! the server crate and reuse the codes from [`codes`].
//!
//! # Example
//!
//! ```rust
//! use error_common::{StudyDeskError, Result};
//!
//! fn port_from(raw: &str) -> Result<u16> {
//!     raw.parse()
//!         .map_err(|e| StudyDeskError::ConfigError(format!("invalid port '{}': {}", raw, e)))
//! }
//!
//! assert!(port_from("8080").is_ok());
//! assert!(port_from("http").is_err());
//! ```

pub mod codes;
pub mod types;

pub use types::*;
