//! Record kinds, their sensitive-field table, and the transcoder that seals
//! and opens those fields.
//!
//! # Module invariants
//!
//! - **No store or HTTP dependencies.** Callers read from or write to the
//!   store and pass records through here on the way.
//! - Records always carry an explicit [`common::RecordKind`]; nothing here
//!   infers a kind from the fields present.

pub mod model;
pub mod schema;
pub mod transcoder;

pub use model::{PlainRecord, StorageRecord};
pub use schema::{schema_for, OrderBy};
pub use transcoder::{RecordTranscoder, TranscodeError};
