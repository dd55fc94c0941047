//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps and the error vocabulary shared by
//! every other module.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{SessionId, UserId};
pub use timestamp::Timestamp;
