use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::Error;
use crate::clock::Clock;
use crate::store::{self, Store, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen_at: OffsetDateTime,
}

/// The set of active participants: name uniqueness, liveness bookkeeping
/// and eviction. Every operation is one store call, so heartbeats and
/// evictions for the same name serialize cleanly.
pub struct Registry {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl Registry {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn join(&self, name: &str) -> Result<Participant, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidName);
        }
        let participant = Participant {
            name: name.to_owned(),
            last_seen_at: self.clock.now(),
        };
        let value = serde_json::to_value(&participant).map_err(StoreError::from)?;
        // uniqueness check and insert are one atomic store call: of two
        // concurrent same-name joins exactly one wins
        if !self
            .store
            .insert_unique(store::PARTICIPANTS, name, value)
            .await?
        {
            return Err(Error::DuplicateName);
        }
        Ok(participant)
    }

    pub async fn heartbeat(&self, name: &str) -> Result<Participant, Error> {
        let participant = Participant {
            name: name.to_owned(),
            last_seen_at: self.clock.now(),
        };
        let value = serde_json::to_value(&participant).map_err(StoreError::from)?;
        // update-if-present: a heartbeat racing an eviction can never
        // resurrect the name
        if !self.store.update(store::PARTICIPANTS, name, value).await? {
            return Err(Error::NotFound);
        }
        Ok(participant)
    }

    pub async fn find(&self, name: &str) -> Result<Option<Participant>, Error> {
        let Some(value) = self.store.get(store::PARTICIPANTS, name).await? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::Store(e.into()))
    }

    pub async fn list(&self) -> Result<Vec<Participant>, Error> {
        let values = self.store.list(store::PARTICIPANTS).await?;
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(|e| Error::Store(e.into())))
            .collect()
    }

    /// Unconditional removal. Idempotent, so a sweeper retry is harmless.
    pub async fn evict(&self, name: &str) -> Result<(), Error> {
        self.store.remove(store::PARTICIPANTS, name).await?;
        Ok(())
    }

    /// Participants whose `lastSeenAt` is at least `threshold` old, judged
    /// against one snapshot of the registry so a heartbeat that lands
    /// before the scan is never missed.
    pub async fn expired_since(&self, threshold: Duration) -> Result<Vec<Participant>, Error> {
        let now = self.clock.now();
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|p| now - p.last_seen_at >= threshold)
            .collect())
    }
}
