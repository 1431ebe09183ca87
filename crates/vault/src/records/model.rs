//! Plaintext and at-rest record representations.
//!
//! The two are distinct types so that a stored record cannot be handed to the
//! export formatter, or a plaintext one to the store, by mistake. Both carry
//! their [`RecordKind`] explicitly.

use common::RecordKind;
use serde_json::{Map, Value};

/// A record with every sensitive field in plaintext.
///
/// Produced from accepted API input or by
/// [`RecordTranscoder::to_plain_form`](super::RecordTranscoder::to_plain_form).
#[derive(Debug, Clone, PartialEq)]
pub struct PlainRecord {
    kind: RecordKind,
    fields: Map<String, Value>,
}

impl PlainRecord {
    /// Wrap fields received at the API boundary.
    pub fn from_input(kind: RecordKind, fields: Map<String, Value>) -> Self {
        Self { kind, fields }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

/// A record as the store holds it: sensitive fields sealed, or legacy plaintext.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageRecord {
    kind: RecordKind,
    fields: Map<String, Value>,
}

impl StorageRecord {
    /// Wrap fields as they exist at rest.
    pub fn new(kind: RecordKind, fields: Map<String, Value>) -> Self {
        Self { kind, fields }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    #[cfg(test)]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The store-assigned id, once the record has been created.
    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}
