// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bidirectional message-identity map.
//!
//! Write-through: `record` inserts durably before caching, so a crash
//! between mirror and record loses at most the reply threading of that
//! one message. The cache is not authoritative after a restart; lookups
//! fall back to the store and seed lazily.

use dashmap::DashMap;
use deskrelay_core::{MessageId, MessageLink, RelayError, SupportStore, UserId};

pub struct IdentityMap {
    by_topic: DashMap<i32, MessageLink>,
    by_user: DashMap<(i64, i32), MessageLink>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self {
            by_topic: DashMap::new(),
            by_user: DashMap::new(),
        }
    }

    /// Records a link durably, then caches both directions.
    pub async fn record(
        &self,
        store: &dyn SupportStore,
        link: MessageLink,
    ) -> Result<(), RelayError> {
        store.insert_link(&link).await?;
        self.cache(link);
        Ok(())
    }

    /// Resolves a topic-side message id, cache first.
    pub async fn resolve_from_topic(
        &self,
        store: &dyn SupportStore,
        topic_msg_id: MessageId,
    ) -> Result<Option<MessageLink>, RelayError> {
        if let Some(link) = self.by_topic.get(&topic_msg_id.0) {
            return Ok(Some(*link));
        }
        let link = store.link_by_topic_msg(topic_msg_id).await?;
        if let Some(link) = link {
            self.cache(link);
        }
        Ok(link)
    }

    /// Resolves a user-side message id, cache first.
    pub async fn resolve_from_user(
        &self,
        store: &dyn SupportStore,
        user: UserId,
        user_msg_id: MessageId,
    ) -> Result<Option<MessageLink>, RelayError> {
        if let Some(link) = self.by_user.get(&(user.0, user_msg_id.0)) {
            return Ok(Some(*link));
        }
        let link = store.link_by_user_msg(user, user_msg_id).await?;
        if let Some(link) = link {
            self.cache(link);
        }
        Ok(link)
    }

    fn cache(&self, link: MessageLink) {
        self.by_topic.insert(link.topic_msg_id.0, link);
        self.by_user
            .insert((link.user_id.0, link.user_msg_id.0), link);
    }
}

impl Default for IdentityMap {
    fn default() -> Self {
        Self::new()
    }
}
