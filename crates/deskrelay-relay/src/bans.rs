// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ban set reconciled against the store on every access.
//!
//! The cache only exists to answer "was this user banned a moment ago"
//! cheaply in logs and assertions; admission decisions always consult
//! the store, so an unban takes effect with no stale window.

use dashmap::DashSet;
use deskrelay_core::{BanRecord, RelayError, SupportStore, UserId};

pub struct BanCache {
    banned: DashSet<UserId>,
}

impl BanCache {
    pub fn new() -> Self {
        Self {
            banned: DashSet::new(),
        }
    }

    /// Point lookup in the store, reconciling the cached set either way.
    /// Returns the ban record when the user is banned.
    pub async fn check(
        &self,
        store: &dyn SupportStore,
        user: UserId,
    ) -> Result<Option<BanRecord>, RelayError> {
        match store.ban_for(user).await? {
            Some(ban) => {
                self.banned.insert(user);
                Ok(Some(ban))
            }
            None => {
                self.banned.remove(&user);
                Ok(None)
            }
        }
    }

    /// Marks a user banned in the cache after a durable insert.
    pub fn insert(&self, user: UserId) {
        self.banned.insert(user);
    }

    /// Clears a user from the cache after a durable remove.
    pub fn remove(&self, user: UserId) {
        self.banned.remove(&user);
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.banned.contains(&user)
    }
}

impl Default for BanCache {
    fn default() -> Self {
        Self::new()
    }
}
