use std::sync::Arc;

use time::Duration;
use tokio::sync::watch;

use crate::chat::{EVERYONE, MessageKind, MessageLog};
use crate::presence::registry::{Participant, Registry};
use crate::Error;

/// Periodic eviction task: every `interval` it scans the registry once,
/// evicts everything past `threshold` and announces each departure with a
/// `status` message.
pub struct Sweeper {
    registry: Arc<Registry>,
    log: Arc<MessageLog>,
    threshold: Duration,
    interval: std::time::Duration,
}

impl Sweeper {
    pub fn new(
        registry: Arc<Registry>,
        log: Arc<MessageLog>,
        threshold: Duration,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            registry,
            log,
            threshold,
            interval,
        }
    }

    /// Run until `shutdown` flips. The in-flight tick always finishes;
    /// shutdown only stops the next one from being scheduled.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = timer.tick() => self.tick().await,
                _ = shutdown.changed() => break,
            }
        }
        tracing::debug!("sweeper stopped");
    }

    /// One sweep over a single registry snapshot. Per-participant failures
    /// are logged and skipped; whoever is still expired gets picked up by
    /// the next tick.
    pub async fn tick(&self) {
        let expired = match self.registry.expired_since(self.threshold).await {
            Ok(expired) => expired,
            Err(err) => {
                tracing::warn!(%err, "presence scan failed");
                return;
            }
        };
        for participant in expired {
            if let Err(err) = self.expire(&participant).await {
                tracing::warn!(name = %participant.name, %err, "eviction incomplete");
            }
        }
    }

    async fn expire(&self, participant: &Participant) -> Result<(), Error> {
        self.registry.evict(&participant.name).await?;
        // eviction first: it stands even if the announcement can't be stored
        self.log
            .post(&participant.name, EVERYONE, "left", MessageKind::Status)
            .await?;
        Ok(())
    }
}
