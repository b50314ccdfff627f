use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::{Store, StoreError, StoreResult};

type Namespaces = HashMap<String, Vec<(String, Value)>>;

/// In-memory store. One mutex guards everything and every trait method is
/// a single critical section, so each operation is atomic on its own.
/// Entries stay in insertion order; updates overwrite in place.
#[derive(Default)]
pub struct MemStore {
    namespaces: Mutex<Namespaces>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> StoreResult<MutexGuard<'_, Namespaces>> {
        self.namespaces
            .lock()
            .map_err(|_| StoreError("mem store mutex poisoned".to_owned()))
    }
}

#[async_trait]
impl Store for MemStore {
    async fn insert_unique(&self, ns: &str, key: &str, value: Value) -> StoreResult<bool> {
        let mut namespaces = self.locked()?;
        let entries = namespaces.entry(ns.to_owned()).or_default();
        if entries.iter().any(|(k, _)| k == key) {
            return Ok(false);
        }
        entries.push((key.to_owned(), value));
        Ok(true)
    }

    async fn get(&self, ns: &str, key: &str) -> StoreResult<Option<Value>> {
        Ok(self
            .locked()?
            .get(ns)
            .and_then(|entries| entries.iter().find(|(k, _)| k == key))
            .map(|(_, v)| v.clone()))
    }

    async fn update(&self, ns: &str, key: &str, value: Value) -> StoreResult<bool> {
        let mut namespaces = self.locked()?;
        let Some(entry) = namespaces
            .get_mut(ns)
            .and_then(|entries| entries.iter_mut().find(|(k, _)| k == key))
        else {
            return Ok(false);
        };
        entry.1 = value;
        Ok(true)
    }

    async fn remove(&self, ns: &str, key: &str) -> StoreResult<bool> {
        let mut namespaces = self.locked()?;
        let Some(entries) = namespaces.get_mut(ns) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|(k, _)| k != key);
        Ok(entries.len() != before)
    }

    async fn list(&self, ns: &str) -> StoreResult<Vec<Value>> {
        Ok(self
            .locked()?
            .get(ns)
            .map(|entries| entries.iter().map(|(_, v)| v.clone()).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_unique_admits_one_writer_per_key() {
        let store = MemStore::new();
        assert!(store.insert_unique("ns", "a", json!(1)).await.unwrap());
        assert!(!store.insert_unique("ns", "a", json!(2)).await.unwrap());
        assert_eq!(store.get("ns", "a").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn update_requires_an_existing_key() {
        let store = MemStore::new();
        assert!(!store.update("ns", "ghost", json!(1)).await.unwrap());
        assert_eq!(store.get("ns", "ghost").await.unwrap(), None);

        store.insert_unique("ns", "a", json!(1)).await.unwrap();
        assert!(store.update("ns", "a", json!(2)).await.unwrap());
        assert_eq!(store.get("ns", "a").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn list_keeps_insertion_order_across_updates() {
        let store = MemStore::new();
        for (key, value) in [("a", json!(1)), ("b", json!(2)), ("c", json!(3))] {
            store.insert_unique("ns", key, value).await.unwrap();
        }
        store.update("ns", "a", json!(10)).await.unwrap();

        let values = store.list("ns").await.unwrap();
        assert_eq!(values, vec![json!(10), json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = MemStore::new();
        store.insert_unique("ns", "a", json!(1)).await.unwrap();
        assert!(store.remove("ns", "a").await.unwrap());
        assert!(!store.remove("ns", "a").await.unwrap());
        assert_eq!(store.list("ns").await.unwrap(), Vec::<Value>::new());
    }

    #[tokio::test]
    async fn namespaces_do_not_bleed_into_each_other() {
        let store = MemStore::new();
        store.insert_unique("left", "a", json!(1)).await.unwrap();
        store.insert_unique("right", "a", json!(2)).await.unwrap();
        assert_eq!(store.get("left", "a").await.unwrap(), Some(json!(1)));
        assert_eq!(store.get("right", "a").await.unwrap(), Some(json!(2)));
    }
}
