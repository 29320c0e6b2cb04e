// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable-store trait for tickets, bans, message links, and settings.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::{BanRecord, MessageId, MessageLink, Ticket, TicketId, TopicId, UserId};

/// Durable storage consumed by the relay engine.
///
/// Absent rows are `Ok(None)`, never errors; callers must branch on the
/// option. Single-statement atomicity is the only transactional guarantee
/// the engine relies on.
#[async_trait]
pub trait SupportStore: Send + Sync + 'static {
    /// Inserts a new open ticket and returns its durable id.
    async fn create_ticket(
        &self,
        user_id: UserId,
        username: Option<&str>,
        topic_id: TopicId,
    ) -> Result<TicketId, RelayError>;

    /// Marks the open ticket bound to `topic_id` as closed, recording the
    /// closure timestamp. A no-op when no open ticket exists for the topic.
    async fn close_ticket_by_topic(&self, topic_id: TopicId) -> Result<(), RelayError>;

    /// Latest ticket bound to the given topic, open or closed.
    async fn ticket_by_topic(&self, topic_id: TopicId) -> Result<Option<Ticket>, RelayError>;

    /// The user's open ticket, if any. At most one exists per user.
    async fn open_ticket_by_user(&self, user_id: UserId) -> Result<Option<Ticket>, RelayError>;

    /// The user's most recent ticket regardless of status.
    async fn last_ticket_by_user(&self, user_id: UserId) -> Result<Option<Ticket>, RelayError>;

    /// All open tickets, used for startup recovery.
    async fn open_tickets(&self) -> Result<Vec<Ticket>, RelayError>;

    /// Inserts or replaces a ban record.
    async fn insert_ban(&self, ban: &BanRecord) -> Result<(), RelayError>;

    /// Removes a ban record. A no-op when none exists.
    async fn remove_ban(&self, user_id: UserId) -> Result<(), RelayError>;

    /// Point lookup of the ban record for one user.
    async fn ban_for(&self, user_id: UserId) -> Result<Option<BanRecord>, RelayError>;

    /// Records a message-identity link. Insert-or-ignore: replaying the
    /// same topic-side id is harmless.
    async fn insert_link(&self, link: &MessageLink) -> Result<(), RelayError>;

    /// Resolves a topic-side message id to its link row.
    async fn link_by_topic_msg(
        &self,
        topic_msg_id: MessageId,
    ) -> Result<Option<MessageLink>, RelayError>;

    /// Resolves a user-side message id to its link row.
    async fn link_by_user_msg(
        &self,
        user_id: UserId,
        user_msg_id: MessageId,
    ) -> Result<Option<MessageLink>, RelayError>;

    /// Reads an opaque setting value by key.
    async fn setting(&self, key: &str) -> Result<Option<String>, RelayError>;

    /// Writes an opaque setting value by key.
    async fn set_setting(&self, key: &str, value: &str) -> Result<(), RelayError>;
}
