//! Keyed storage behind the participant registry and the message log.
//!
//! Both shared collections go through this trait so the concurrency
//! discipline (atomic compare-and-insert, update-if-present) stays
//! independent of the storage technology.

mod mem;
mod sqlite;

pub use mem::MemStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde_json::Value;

/// Namespace for participant records, keyed by name.
pub const PARTICIPANTS: &str = "participants";
/// Namespace for message records, keyed by message id.
pub const MESSAGES: &str = "messages";

pub type StoreResult<T> = Result<T, StoreError>;

/// Transient backing-store failure, kept apart from the semantic error
/// kinds so callers can treat it as retryable.
#[derive(Debug, thiserror::Error)]
#[error("store backend: {0}")]
pub struct StoreError(pub String);

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert `value` under `key` unless the key is already present, and
    /// report whether the insert happened. Check and insert are a single
    /// atomic step: of two concurrent same-key inserts exactly one wins.
    async fn insert_unique(&self, ns: &str, key: &str, value: Value) -> StoreResult<bool>;

    async fn get(&self, ns: &str, key: &str) -> StoreResult<Option<Value>>;

    /// Replace the value under an existing key, keeping its position in
    /// [`Store::list`] order. Returns false if the key is absent; an
    /// update never creates a record.
    async fn update(&self, ns: &str, key: &str, value: Value) -> StoreResult<bool>;

    /// Remove a key. Idempotent; reports whether anything was removed.
    async fn remove(&self, ns: &str, key: &str) -> StoreResult<bool>;

    /// Snapshot of every value in a namespace, in insertion order.
    async fn list(&self, ns: &str) -> StoreResult<Vec<Value>>;
}
