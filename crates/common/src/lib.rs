//! Common types, protocol definitions, and errors shared across vault crates.

pub mod error;
pub mod kind;
pub mod protocol;

pub use error::ServiceError;
pub use kind::RecordKind;
