//! Narrow read-only contracts for the external Request and Office
//! collaborators.
//!
//! The mutation engine consumes these lookups; it never owns or mutates the
//! underlying records. In-memory implementations live here for tests/dev;
//! the Postgres-backed ones live in `stockroom-infra`.

pub mod office;
pub mod request;

use thiserror::Error;

pub use office::{InMemoryOfficeDirectory, Office, OfficeDirectory};
pub use request::{InMemoryRequestDirectory, RequestDirectory};

/// Directory lookup failure.
///
/// Lookups are reads against collaborator-owned data; a miss is `Ok(None)`,
/// not an error. These variants cover the storage layer misbehaving.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory storage error: {0}")]
    Storage(String),

    /// A stored record could not be interpreted (e.g. an unknown status
    /// string). Surfaced as an opaque server error at the boundary.
    #[error("corrupt directory record: {0}")]
    Corrupt(String),
}
