//! Structured logging with PII redaction
//!
//! Installs the process-wide `tracing` subscriber (compact coloured output
//! for local development, JSON with RFC 3339 timestamps everywhere else) and
//! provides [`PiiRedactor`] for values that must not reach the logs in clear
//! text: email addresses, phone numbers and submitted unique key values.
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::{PiiRedactor, RedactionConfig};
//!
//! let redactor = PiiRedactor::new(RedactionConfig::default());
//! let line = redactor.redact("Submission by coordinator@example.org");
//! assert!(line.starts_with("Submission by EMAIL["));
//!
//! // Unique key values are replaced by a stable hash so duplicates can
//! // still be matched across log lines
//! assert_eq!(redactor.redact_key_value("0042"), redactor.redact_key_value("0042"));
//! ```
//!
//! # Configuration
//!
//! ```yaml
//! logging:
//!   log_level: info
//!   format: auto        # auto | pretty | json
//!   redaction_enabled: true
//!   hash_for_correlation: true
//! ```

pub mod config;
pub mod error;
pub mod redactor;
pub mod subscriber;

pub use config::*;
pub use error::*;
pub use redactor::*;
pub use subscriber::*;
