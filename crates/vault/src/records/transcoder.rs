//! [`RecordTranscoder`]: moves one kind of record between plaintext and
//! storage form by applying the envelope codec to its protected fields.

use common::RecordKind;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::model::{PlainRecord, StorageRecord};
use super::schema::{is_secret_like, schema_for, FieldShape, KindSchema, Protection};
use crate::crypto::{EnvelopeCodec, EnvelopeError, FallbackReason, Opened};

/// Errors from [`RecordTranscoder::to_storage_form`]. Any of them aborts the write.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// A protected field could not be sealed.
    #[error("failed to seal {kind} field {field}: {source}")]
    Seal {
        kind: RecordKind,
        field: String,
        #[source]
        source: EnvelopeError,
    },

    /// The record's kind does not match the transcoder's.
    #[error("{found} record given to the {expected} transcoder")]
    KindMismatch {
        expected: RecordKind,
        found: RecordKind,
    },
}

/// Applies the envelope codec to exactly the protected fields of one kind.
///
/// Holds no mutable state; one instance may transcode any number of records
/// concurrently.
#[derive(Clone, Copy)]
pub struct RecordTranscoder<'c> {
    schema: &'static KindSchema,
    codec: &'c EnvelopeCodec,
}

impl<'c> RecordTranscoder<'c> {
    pub fn new(kind: RecordKind, codec: &'c EnvelopeCodec) -> Self {
        Self {
            schema: schema_for(kind),
            codec,
        }
    }

    /// Seal every protected field present on `record`; copy the rest.
    ///
    /// Absent optional fields stay absent. Server custom fields are sealed as
    /// one JSON blob; credential custom fields have only their secret-looking
    /// entries sealed.
    ///
    /// # Errors
    ///
    /// Returns [`TranscodeError`] on a kind mismatch or if any field fails to
    /// seal. No partially sealed record is ever returned.
    pub fn to_storage_form(&self, record: PlainRecord) -> Result<StorageRecord, TranscodeError> {
        let kind = record.kind();
        if kind != self.schema.kind {
            return Err(TranscodeError::KindMismatch {
                expected: self.schema.kind,
                found: kind,
            });
        }

        let mut fields = record.into_fields();
        for spec in self.schema.protected_fields() {
            let Some(value) = fields.get_mut(spec.name) else {
                continue;
            };
            match spec.protection {
                Protection::Sealed => *value = self.seal(spec.name, value)?,
                Protection::SecretEntries => {
                    if let Value::Object(entries) = value {
                        for (key, entry) in entries.iter_mut() {
                            if is_secret_like(key) {
                                *entry = self.seal(spec.name, entry)?;
                            }
                        }
                    }
                }
                Protection::Plain => {}
            }
        }
        Ok(StorageRecord::new(kind, fields))
    }

    /// Open every protected field of `record`; copy the rest.
    ///
    /// Never fails. A field that does not open keeps its stored value, and a
    /// custom-fields map that does not open to a JSON object becomes `{}`; the
    /// remaining fields are still recovered.
    pub fn to_plain_form(&self, record: StorageRecord) -> PlainRecord {
        let kind = record.kind();
        let schema = if kind == self.schema.kind {
            self.schema
        } else {
            warn!(expected = %self.schema.kind, found = %kind, "transcoding record under its own kind");
            schema_for(kind)
        };
        let id = record.id().map(str::to_owned).unwrap_or_default();
        let mut fields = record.into_fields();

        for spec in schema.protected_fields() {
            match (spec.protection, spec.shape) {
                (Protection::Sealed, FieldShape::Map) => {
                    let opened = fields
                        .get(spec.name)
                        .map(|v| note_fallback(kind, &id, spec.name, self.codec.open(v)));
                    let map = coerce_map(kind, &id, spec.name, opened);
                    fields.insert(spec.name.to_owned(), Value::Object(map));
                }
                (Protection::Sealed, _) => {
                    if let Some(value) = fields.get_mut(spec.name) {
                        let opened = self.codec.open_text(value);
                        *value = note_fallback(kind, &id, spec.name, opened);
                    }
                }
                (Protection::SecretEntries, _) => {
                    let mut map = coerce_map(kind, &id, spec.name, fields.remove(spec.name));
                    for (key, entry) in map.iter_mut() {
                        if is_secret_like(key) {
                            let opened = self.codec.open_text(entry);
                            *entry = note_fallback(kind, &id, spec.name, opened);
                        }
                    }
                    fields.insert(spec.name.to_owned(), Value::Object(map));
                }
                (Protection::Plain, _) => {}
            }
        }
        PlainRecord::from_input(kind, fields)
    }

    /// [`to_plain_form`](Self::to_plain_form) over a list, preserving order.
    pub fn to_plain_forms(&self, records: Vec<StorageRecord>) -> Vec<PlainRecord> {
        records
            .into_iter()
            .map(|r| self.to_plain_form(r))
            .collect()
    }

    fn seal(&self, field: &str, value: &Value) -> Result<Value, TranscodeError> {
        self.codec
            .seal(value)
            .map_err(|source| TranscodeError::Seal {
                kind: self.schema.kind,
                field: field.to_owned(),
                source,
            })
    }
}

/// Log a fallback without the value itself and return what the caller sees.
fn note_fallback(kind: RecordKind, id: &str, field: &str, opened: Opened) -> Value {
    match opened.fallback_reason() {
        Some(reason @ FallbackReason::Unauthentic) => {
            warn!(%kind, id, field, ?reason, "sealed field failed to open; returning stored text")
        }
        Some(reason) => {
            debug!(%kind, id, field, ?reason, "field not sealed; treating as legacy plaintext")
        }
        None => {}
    }
    opened.into_value()
}

/// Turn whatever a custom-fields column yielded into a map.
///
/// Legacy rows hold the map as unsealed JSON text; anything unusable
/// degrades to an empty map.
fn coerce_map(kind: RecordKind, id: &str, field: &str, value: Option<Value>) -> Map<String, Value> {
    match value {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(Value::String(text)) if text.is_empty() => Map::new(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            _ => {
                warn!(%kind, id, field, "custom fields did not parse as an object; using empty map");
                Map::new()
            }
        },
        Some(_) => {
            warn!(%kind, id, field, "custom fields are not an object; using empty map");
            Map::new()
        }
    }
}
