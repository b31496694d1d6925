//! PostgreSQL persistence for StudyDesk
//!
//! Owns the schema migrations, the connection pool, one repository per
//! entity and the PostgreSQL implementation of the unique key index.
//!
//! Submission writes follow one transaction per request:
//!
//! 1. read the form `FOR SHARE`, so no schema change runs alongside
//! 2. write the submission row
//! 3. derive the unique key entries from that schema and the payload
//! 4. reject values already owned by another submission
//! 5. replace the submission's key rows and commit
//!
//! Steps 3 to 5 are `form_integrity::recompute_on_write` over a
//! [`PgUniqueKeyIndex`] bound to the transaction. A concurrent writer that
//! slipped past step 4 fails at step 5 on the `uq_submission_unique_keys_key`
//! constraint and gets the concurrent duplicate error.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use database_layer::{DatabasePool, StudyRepository};
//!
//! # async fn run() -> database_layer::DatabaseResult<()> {
//! let db = DatabasePool::new("postgresql://localhost/studydesk").await?;
//! db.migrate().await?;
//!
//! let studies = StudyRepository::new(db.pool().clone());
//! for study in studies.list(false).await? {
//!     println!("{} ({})", study.name, study.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod export_repository;
pub mod form_repository;
pub mod hospital_repository;
pub mod models;
pub mod study_repository;
pub mod submission_repository;
pub mod unique_key_index;
pub mod user_repository;

pub use connection::*;
pub use error::*;
pub use export_repository::ExportRepository;
pub use form_repository::{stored_submissions, FormRepository};
pub use hospital_repository::HospitalRepository;
pub use models::*;
pub use study_repository::StudyRepository;
pub use submission_repository::SubmissionRepository;
pub use unique_key_index::*;
pub use user_repository::UserRepository;
