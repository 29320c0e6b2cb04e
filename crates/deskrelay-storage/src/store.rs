// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`SupportStore`] implementation backed by SQLite.

use async_trait::async_trait;
use deskrelay_config::StorageConfig;
use deskrelay_core::{
    BanRecord, MessageId, MessageLink, RelayError, SupportStore, Ticket, TicketId, TopicId, UserId,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store. Cheap to share behind an `Arc`.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Opens the store at the configured path, creating the database
    /// and running migrations as needed.
    pub async fn open(config: &StorageConfig) -> Result<Self, RelayError> {
        let db = Database::open_with_options(&config.database_path, config.wal_mode).await?;
        Ok(Self { db })
    }

    /// Opens an in-memory-like store at an explicit path. Test helper.
    pub async fn open_at(path: &str) -> Result<Self, RelayError> {
        let db = Database::open(path).await?;
        Ok(Self { db })
    }

    /// Checkpoints and closes the database.
    pub async fn close(&self) -> Result<(), RelayError> {
        self.db.close().await
    }
}

#[async_trait]
impl SupportStore for SqliteStore {
    async fn create_ticket(
        &self,
        user_id: UserId,
        username: Option<&str>,
        topic_id: TopicId,
    ) -> Result<TicketId, RelayError> {
        queries::tickets::create_ticket(&self.db, user_id, username, topic_id).await
    }

    async fn close_ticket_by_topic(&self, topic_id: TopicId) -> Result<(), RelayError> {
        queries::tickets::close_ticket_by_topic(&self.db, topic_id).await?;
        Ok(())
    }

    async fn ticket_by_topic(&self, topic_id: TopicId) -> Result<Option<Ticket>, RelayError> {
        queries::tickets::ticket_by_topic(&self.db, topic_id).await
    }

    async fn open_ticket_by_user(&self, user_id: UserId) -> Result<Option<Ticket>, RelayError> {
        queries::tickets::open_ticket_by_user(&self.db, user_id).await
    }

    async fn last_ticket_by_user(&self, user_id: UserId) -> Result<Option<Ticket>, RelayError> {
        queries::tickets::last_ticket_by_user(&self.db, user_id).await
    }

    async fn open_tickets(&self) -> Result<Vec<Ticket>, RelayError> {
        queries::tickets::open_tickets(&self.db).await
    }

    async fn insert_ban(&self, ban: &BanRecord) -> Result<(), RelayError> {
        queries::bans::insert_ban(&self.db, ban.user_id, &ban.reason, ban.admin_id).await
    }

    async fn remove_ban(&self, user_id: UserId) -> Result<(), RelayError> {
        queries::bans::remove_ban(&self.db, user_id).await?;
        Ok(())
    }

    async fn ban_for(&self, user_id: UserId) -> Result<Option<BanRecord>, RelayError> {
        queries::bans::ban_for(&self.db, user_id).await
    }

    async fn insert_link(&self, link: &MessageLink) -> Result<(), RelayError> {
        queries::links::insert_link(&self.db, *link).await
    }

    async fn link_by_topic_msg(
        &self,
        topic_msg_id: MessageId,
    ) -> Result<Option<MessageLink>, RelayError> {
        queries::links::link_by_topic_msg(&self.db, topic_msg_id).await
    }

    async fn link_by_user_msg(
        &self,
        user_id: UserId,
        user_msg_id: MessageId,
    ) -> Result<Option<MessageLink>, RelayError> {
        queries::links::link_by_user_msg(&self.db, user_id, user_msg_id).await
    }

    async fn setting(&self, key: &str) -> Result<Option<String>, RelayError> {
        queries::settings::setting(&self.db, key).await
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), RelayError> {
        queries::settings::set_setting(&self.db, key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskrelay_core::TicketStatus;
    use tempfile::tempdir;

    #[tokio::test]
    async fn store_implements_full_ticket_lifecycle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let store = SqliteStore::open_at(path.to_str().unwrap()).await.unwrap();

        let id = store
            .create_ticket(UserId(7), Some("bob"), TopicId(3))
            .await
            .unwrap();

        let open = store.open_ticket_by_user(UserId(7)).await.unwrap().unwrap();
        assert_eq!(open.id, id);
        assert_eq!(open.status, TicketStatus::Open);

        store.close_ticket_by_topic(TopicId(3)).await.unwrap();
        assert!(store.open_ticket_by_user(UserId(7)).await.unwrap().is_none());

        let last = store.last_ticket_by_user(UserId(7)).await.unwrap().unwrap();
        assert_eq!(last.status, TicketStatus::Closed);

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn store_persists_bans_and_links() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let store = SqliteStore::open_at(path.to_str().unwrap()).await.unwrap();

        let ban = BanRecord {
            user_id: UserId(50),
            reason: "abuse".into(),
            admin_id: UserId(1),
            banned_at: String::new(),
        };
        store.insert_ban(&ban).await.unwrap();
        let found = store.ban_for(UserId(50)).await.unwrap().unwrap();
        assert_eq!(found.reason, "abuse");
        assert!(!found.banned_at.is_empty());

        let link = MessageLink {
            topic_msg_id: MessageId(9),
            user_id: UserId(50),
            user_msg_id: MessageId(2),
        };
        store.insert_link(&link).await.unwrap();
        assert_eq!(store.link_by_topic_msg(MessageId(9)).await.unwrap(), Some(link));

        store.close().await.unwrap();
    }
}
