//! Submission integrity for StudyDesk research forms
//!
//! This crate holds the domain rules that sit between a form definition and
//! the submissions collected against it:
//!
//! - **Schema model**: lenient parsing of the stored `{"fields": [...]}` JSON
//!   into typed field descriptors, plus the checks applied when a form is saved
//! - **Unique keys**: deriving the single-field or composite key a submission
//!   must own, and checking it against a [`UniqueKeyIndex`]
//! - **Completion profiling**: per-field fill rates, choice histograms and the
//!   per-form completion rate
//! - **Backfill**: rebuilding the whole key index from existing submissions and
//!   picking a key field for legacy forms that never had one
//!
//! Storage is abstracted behind [`UniqueKeyIndex`]; the in-memory
//! implementation here backs tests and local development while the Postgres
//! implementation lives in `database-layer`.
//!
//! # Example
//!
//! ```rust
//! use form_integrity::{derive_unique_key_entries, parse_payload, FormSchema};
//! use serde_json::json;
//!
//! let schema = FormSchema::from_value(&json!({
//!     "fields": [
//!         {"name": "mrn", "label": "MRN", "type": "text", "unique_key": true},
//!         {"name": "site", "label": "Site", "type": "text", "unique_key": true}
//!     ]
//! }));
//! let payload = parse_payload(r#"{"mrn": " 0042 ", "site": "North"}"#);
//!
//! let entries = derive_unique_key_entries(&schema, &payload).unwrap();
//! assert_eq!(entries[0].key_name, "__composite__:mrn|site");
//! assert_eq!(entries[0].key_value, r#"["0042","North"]"#);
//! assert_eq!(entries[0].display_value, "0042 + North");
//! ```

pub mod backfill;
pub mod error;
pub mod index;
pub mod payload;
pub mod profile;
pub mod schema;
pub mod unique_keys;

pub use backfill::*;
pub use error::*;
pub use index::*;
pub use payload::*;
pub use profile::*;
pub use schema::*;
pub use unique_keys::*;
