// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`SupportStore`] for tests.
//!
//! Mirrors the SQLite store's observable semantics: monotonic ticket
//! ids, at most one open ticket surfaced per user, insert-or-ignore
//! link rows, absent rows as `Ok(None)`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use deskrelay_core::{
    BanRecord, MessageId, MessageLink, RelayError, SupportStore, Ticket, TicketId, TicketStatus,
    TopicId, UserId,
};

#[derive(Default)]
struct Inner {
    tickets: Vec<Ticket>,
    next_ticket_id: i64,
    bans: HashMap<i64, BanRecord>,
    links_by_topic: HashMap<i32, MessageLink>,
    links_by_user: HashMap<(i64, i32), MessageLink>,
    settings: HashMap<String, String>,
}

/// HashMap-backed store double.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_ticket_id: 1,
                ..Inner::default()
            }),
        }
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SupportStore for MemoryStore {
    async fn create_ticket(
        &self,
        user_id: UserId,
        username: Option<&str>,
        topic_id: TopicId,
    ) -> Result<TicketId, RelayError> {
        let mut inner = self.inner.lock().await;
        let id = TicketId(inner.next_ticket_id);
        inner.next_ticket_id += 1;
        inner.tickets.push(Ticket {
            id,
            user_id,
            username: username.map(|s| s.to_string()),
            topic_id,
            status: TicketStatus::Open,
            created_at: Self::now(),
            closed_at: None,
        });
        Ok(id)
    }

    async fn close_ticket_by_topic(&self, topic_id: TopicId) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().await;
        if let Some(ticket) = inner
            .tickets
            .iter_mut()
            .find(|t| t.topic_id == topic_id && t.status == TicketStatus::Open)
        {
            ticket.status = TicketStatus::Closed;
            ticket.closed_at = Some(Self::now());
        }
        Ok(())
    }

    async fn ticket_by_topic(&self, topic_id: TopicId) -> Result<Option<Ticket>, RelayError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .iter()
            .rev()
            .find(|t| t.topic_id == topic_id)
            .cloned())
    }

    async fn open_ticket_by_user(&self, user_id: UserId) -> Result<Option<Ticket>, RelayError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .iter()
            .rev()
            .find(|t| t.user_id == user_id && t.status == TicketStatus::Open)
            .cloned())
    }

    async fn last_ticket_by_user(&self, user_id: UserId) -> Result<Option<Ticket>, RelayError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .iter()
            .rev()
            .find(|t| t.user_id == user_id)
            .cloned())
    }

    async fn open_tickets(&self) -> Result<Vec<Ticket>, RelayError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Open)
            .cloned()
            .collect())
    }

    async fn insert_ban(&self, ban: &BanRecord) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().await;
        let mut ban = ban.clone();
        if ban.banned_at.is_empty() {
            ban.banned_at = Self::now();
        }
        inner.bans.insert(ban.user_id.0, ban);
        Ok(())
    }

    async fn remove_ban(&self, user_id: UserId) -> Result<(), RelayError> {
        self.inner.lock().await.bans.remove(&user_id.0);
        Ok(())
    }

    async fn ban_for(&self, user_id: UserId) -> Result<Option<BanRecord>, RelayError> {
        Ok(self.inner.lock().await.bans.get(&user_id.0).cloned())
    }

    async fn insert_link(&self, link: &MessageLink) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().await;
        let topic_key = link.topic_msg_id.0;
        let user_key = (link.user_id.0, link.user_msg_id.0);
        if inner.links_by_topic.contains_key(&topic_key)
            || inner.links_by_user.contains_key(&user_key)
        {
            return Ok(());
        }
        inner.links_by_topic.insert(topic_key, *link);
        inner.links_by_user.insert(user_key, *link);
        Ok(())
    }

    async fn link_by_topic_msg(
        &self,
        topic_msg_id: MessageId,
    ) -> Result<Option<MessageLink>, RelayError> {
        Ok(self
            .inner
            .lock()
            .await
            .links_by_topic
            .get(&topic_msg_id.0)
            .copied())
    }

    async fn link_by_user_msg(
        &self,
        user_id: UserId,
        user_msg_id: MessageId,
    ) -> Result<Option<MessageLink>, RelayError> {
        Ok(self
            .inner
            .lock()
            .await
            .links_by_user
            .get(&(user_id.0, user_msg_id.0))
            .copied())
    }

    async fn setting(&self, key: &str) -> Result<Option<String>, RelayError> {
        Ok(self.inner.lock().await.settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), RelayError> {
        self.inner
            .lock()
            .await
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
