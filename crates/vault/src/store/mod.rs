//! [`MemoryStore`]: in-process record store, partitioned by kind.
//!
//! Holds records in storage form only and never looks inside sensitive
//! fields. It owns the `id`, `createdAt` and `updatedAt` keys of every row.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use common::RecordKind;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::records::{OrderBy, StorageRecord};

/// Errors produced by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} record {id} not found")]
    NotFound { kind: RecordKind, id: String },
}

#[derive(Debug, Clone)]
struct Row {
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    /// Insertion order, for ties on `created`.
    created_seq: u64,
    /// Write order, for ties on `updated`.
    updated_seq: u64,
    record: StorageRecord,
}

#[derive(Debug, Default)]
struct Inner {
    next_seq: u64,
    rows: HashMap<RecordKind, HashMap<String, Row>>,
}

impl Row {
    fn created_key(&self) -> (DateTime<Utc>, u64) {
        (self.created, self.created_seq)
    }

    fn updated_key(&self) -> (DateTime<Utc>, u64) {
        (self.updated, self.updated_seq)
    }

    fn flag(&self, name: &str) -> bool {
        self.record.get(name).and_then(Value::as_bool).unwrap_or(false)
    }
}

impl Inner {
    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Cheaply cloneable handle to the shared record table.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

fn timestamp(ts: DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record, assigning its id and timestamps.
    ///
    /// Any `id`, `createdAt` or `updatedAt` already on `record` is replaced.
    pub async fn create(&self, mut record: StorageRecord) -> StorageRecord {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let fields = record.fields_mut();
        fields.insert("id".into(), Value::String(id.clone()));
        fields.insert("createdAt".into(), timestamp(now));
        fields.insert("updatedAt".into(), timestamp(now));

        let mut inner = self.inner.write().await;
        let seq = inner.bump();
        inner.rows.entry(record.kind()).or_default().insert(
            id,
            Row {
                created: now,
                updated: now,
                created_seq: seq,
                updated_seq: seq,
                record: record.clone(),
            },
        );
        record
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no `kind` record has `id`.
    pub async fn find(&self, kind: RecordKind, id: &str) -> Result<StorageRecord, StoreError> {
        let inner = self.inner.read().await;
        inner
            .rows
            .get(&kind)
            .and_then(|rows| rows.get(id))
            .map(|row| row.record.clone())
            .ok_or_else(|| not_found(kind, id))
    }

    /// Every record of `kind`, sorted by `order`.
    pub async fn find_many(&self, kind: RecordKind, order: OrderBy) -> Vec<StorageRecord> {
        let inner = self.inner.read().await;
        let Some(rows) = inner.rows.get(&kind) else {
            return Vec::new();
        };
        let mut rows: Vec<&Row> = rows.values().collect();
        match order {
            OrderBy::CreatedDesc => rows.sort_by(|a, b| b.created_key().cmp(&a.created_key())),
            OrderBy::CreatedAsc => rows.sort_by_key(|row| row.created_key()),
            OrderBy::UpdatedDesc => rows.sort_by(|a, b| b.updated_key().cmp(&a.updated_key())),
            OrderBy::PinnedFirst { flag } => rows.sort_by(|a, b| {
                (b.flag(flag), b.updated_key()).cmp(&(a.flag(flag), a.updated_key()))
            }),
        }
        rows.into_iter().map(|row| row.record.clone()).collect()
    }

    /// Replace the fields of an existing record. Last write wins.
    ///
    /// `id` and `createdAt` are kept from the stored row; `updatedAt` is
    /// refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no `kind` record has `id`.
    pub async fn update(
        &self,
        id: &str,
        mut record: StorageRecord,
    ) -> Result<StorageRecord, StoreError> {
        let kind = record.kind();
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let seq = inner.bump();
        let row = inner
            .rows
            .get_mut(&kind)
            .and_then(|rows| rows.get_mut(id))
            .ok_or_else(|| not_found(kind, id))?;

        // Clocks can step backwards; keep updatedAt >= createdAt.
        let updated = now.max(row.created);
        let fields = record.fields_mut();
        fields.insert("id".into(), Value::String(id.to_owned()));
        fields.insert("createdAt".into(), timestamp(row.created));
        fields.insert("updatedAt".into(), timestamp(updated));

        row.updated = updated;
        row.updated_seq = seq;
        row.record = record.clone();
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no `kind` record has `id`.
    pub async fn delete(&self, kind: RecordKind, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .rows
            .get_mut(&kind)
            .and_then(|rows| rows.remove(id))
            .map(|_| ())
            .ok_or_else(|| not_found(kind, id))
    }

    /// Remove every record of `kind`, returning how many there were.
    pub async fn delete_all(&self, kind: RecordKind) -> usize {
        let mut inner = self.inner.write().await;
        inner.rows.remove(&kind).map_or(0, |rows| rows.len())
    }

    /// Total number of records across all kinds.
    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.values().map(HashMap::len).sum()
    }
}

fn not_found(kind: RecordKind, id: &str) -> StoreError {
    StoreError::NotFound {
        kind,
        id: id.to_owned(),
    }
}
