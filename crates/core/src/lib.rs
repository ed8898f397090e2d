//! Shared kernel: strongly-typed identifiers and the domain error taxonomy.
//!
//! Everything in here is deterministic and IO-free; storage and transport
//! concerns live in `stockroom-infra` and `stockroom-api`.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{ActorId, IssueId, ItemId, OfficeId, RequestId, ReturnId};
