use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::Error;
use crate::clock::Clock;
use crate::store::{self, Store, StoreError};

/// Broadcast audience sentinel.
pub const EVERYONE: &str = "everyone";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Broadcast,
    Private,
    /// Join/leave notice. System-generated only; the gateway refuses it
    /// on user posts and edits.
    Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub text: String,
    pub kind: MessageKind,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
}

/// Replacement fields for an edit. `id`, `from` and `sentAt` stay as they
/// were.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageFields {
    pub to: String,
    pub text: String,
    pub kind: MessageKind,
}

/// Append-only ordered log of messages, author-owned for edit/delete.
pub struct MessageLog {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl MessageLog {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Stamp and append a message. `id` and `sentAt` are assigned here,
    /// never caller-supplied.
    pub async fn post(
        &self,
        from: &str,
        to: &str,
        text: &str,
        kind: MessageKind,
    ) -> Result<Message, Error> {
        validate(to, text)?;
        let message = Message {
            id: Uuid::now_v7(),
            from: from.to_owned(),
            to: to.to_owned(),
            text: text.to_owned(),
            kind,
            sent_at: self.clock.now(),
        };
        let value = serde_json::to_value(&message).map_err(StoreError::from)?;
        if !self
            .store
            .insert_unique(store::MESSAGES, &message.id.to_string(), value)
            .await?
        {
            // fresh v7 ids don't collide; a duplicate means the backing
            // rows are not ours
            return Err(StoreError("duplicate message id".to_owned()).into());
        }
        Ok(message)
    }

    /// Replace `to`/`text`/`kind` of a message owned by `requester`.
    pub async fn edit(
        &self,
        id: Uuid,
        requester: &str,
        fields: MessageFields,
    ) -> Result<Message, Error> {
        let mut message = self.find(id).await?;
        authorize(&message, requester)?;
        validate(&fields.to, &fields.text)?;

        message.to = fields.to;
        message.text = fields.text;
        message.kind = fields.kind;
        let value = serde_json::to_value(&message).map_err(StoreError::from)?;
        if !self.store.update(store::MESSAGES, &id.to_string(), value).await? {
            // lost a race with a delete
            return Err(Error::NotFound);
        }
        Ok(message)
    }

    pub async fn delete(&self, id: Uuid, requester: &str) -> Result<(), Error> {
        let message = self.find(id).await?;
        authorize(&message, requester)?;
        if !self.store.remove(store::MESSAGES, &id.to_string()).await? {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    /// Full log in insertion order, oldest first. Audience filtering and
    /// limit slicing happen at the boundary, not here.
    pub async fn all(&self) -> Result<Vec<Message>, Error> {
        let values = self.store.list(store::MESSAGES).await?;
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(|e| Error::Store(e.into())))
            .collect()
    }

    async fn find(&self, id: Uuid) -> Result<Message, Error> {
        let value = self
            .store
            .get(store::MESSAGES, &id.to_string())
            .await?
            .ok_or(Error::NotFound)?;
        serde_json::from_value(value).map_err(|e| Error::Store(e.into()))
    }
}

fn validate(to: &str, text: &str) -> Result<(), Error> {
    if to.is_empty() {
        return Err(Error::InvalidMessage("`to` must be non-empty"));
    }
    if text.is_empty() {
        return Err(Error::InvalidMessage("`text` must be non-empty"));
    }
    Ok(())
}

fn authorize(message: &Message, requester: &str) -> Result<(), Error> {
    // status notices have no owner; nobody edits or deletes them
    if message.kind == MessageKind::Status || message.from != requester {
        return Err(Error::Unauthorized);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemStore;
    use time::Duration;
    use time::macros::datetime;

    fn log() -> (MessageLog, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(datetime!(2024-05-01 12:00 UTC)));
        (
            MessageLog::new(Arc::new(MemStore::new()), clock.clone()),
            clock,
        )
    }

    fn fields(to: &str, text: &str, kind: MessageKind) -> MessageFields {
        MessageFields {
            to: to.to_owned(),
            text: text.to_owned(),
            kind,
        }
    }

    #[tokio::test]
    async fn post_assigns_id_and_stamp() {
        let (log, clock) = log();
        let message = log
            .post("alice", EVERYONE, "hello", MessageKind::Broadcast)
            .await
            .unwrap();
        assert_eq!(message.sent_at, clock.now());
        assert_eq!(log.all().await.unwrap(), vec![message]);
    }

    #[tokio::test]
    async fn post_rejects_empty_fields() {
        let (log, _) = log();
        for (to, text) in [("", "hi"), ("bob", "")] {
            assert!(matches!(
                log.post("alice", to, text, MessageKind::Private).await,
                Err(Error::InvalidMessage(_))
            ));
        }
        assert!(log.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn all_returns_insertion_order() {
        let (log, _) = log();
        for text in ["one", "two", "three"] {
            log.post("alice", EVERYONE, text, MessageKind::Broadcast)
                .await
                .unwrap();
        }
        let texts: Vec<_> = log.all().await.unwrap().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn edit_is_author_only_and_keeps_identity() {
        let (log, clock) = log();
        let posted = log
            .post("alice", "bob", "psst", MessageKind::Private)
            .await
            .unwrap();

        let denied = log
            .edit(posted.id, "mallory", fields("bob", "hacked", MessageKind::Private))
            .await;
        assert!(matches!(denied, Err(Error::Unauthorized)));
        assert_eq!(log.all().await.unwrap(), vec![posted.clone()]);

        clock.advance(Duration::seconds(5));
        let edited = log
            .edit(posted.id, "alice", fields(EVERYONE, "hi all", MessageKind::Broadcast))
            .await
            .unwrap();
        assert_eq!(edited.id, posted.id);
        assert_eq!(edited.from, "alice");
        assert_eq!(edited.sent_at, posted.sent_at);
        assert_eq!(edited.to, EVERYONE);
        assert_eq!(edited.text, "hi all");
        assert_eq!(edited.kind, MessageKind::Broadcast);
        assert_eq!(log.all().await.unwrap(), vec![edited]);
    }

    #[tokio::test]
    async fn edit_validates_replacement_fields() {
        let (log, _) = log();
        let posted = log
            .post("alice", "bob", "psst", MessageKind::Private)
            .await
            .unwrap();
        let result = log
            .edit(posted.id, "alice", fields("bob", "", MessageKind::Private))
            .await;
        assert!(matches!(result, Err(Error::InvalidMessage(_))));
        assert_eq!(log.all().await.unwrap(), vec![posted]);
    }

    #[tokio::test]
    async fn edit_and_delete_miss_unknown_ids() {
        let (log, _) = log();
        let ghost = Uuid::now_v7();
        assert!(matches!(
            log.edit(ghost, "alice", fields("bob", "hi", MessageKind::Private)).await,
            Err(Error::NotFound)
        ));
        assert!(matches!(log.delete(ghost, "alice").await, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn delete_is_author_only() {
        let (log, _) = log();
        let posted = log
            .post("alice", EVERYONE, "hello", MessageKind::Broadcast)
            .await
            .unwrap();

        assert!(matches!(
            log.delete(posted.id, "mallory").await,
            Err(Error::Unauthorized)
        ));
        log.delete(posted.id, "alice").await.unwrap();
        assert!(log.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_notices_are_not_user_mutable() {
        let (log, _) = log();
        let notice = log
            .post("alice", EVERYONE, "left", MessageKind::Status)
            .await
            .unwrap();

        // even the named participant can't touch a system notice
        assert!(matches!(
            log.edit(notice.id, "alice", fields(EVERYONE, "nope", MessageKind::Broadcast)).await,
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            log.delete(notice.id, "alice").await,
            Err(Error::Unauthorized)
        ));
    }
}
