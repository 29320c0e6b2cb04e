// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user message rate limiting.
//!
//! One entry per user holding the last accepted time and the group key
//! of the last accepted album part. Uses `tokio::time::Instant` so the
//! cool-down is testable under a paused clock.

use std::time::Duration;

use dashmap::DashMap;
use deskrelay_core::UserId;
use tokio::time::Instant;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodDecision {
    Admit,
    Reject,
}

struct FloodEntry {
    last_accepted: Instant,
    last_group: Option<String>,
}

/// Per-user cool-down gate.
pub struct RateLimiter {
    cooldown: Duration,
    entries: DashMap<UserId, FloodEntry>,
}

impl RateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            entries: DashMap::new(),
        }
    }

    /// Admits or rejects a message. Parts of the same album as the last
    /// accepted message are always admitted and refresh recency, so a
    /// burst of album parts counts as one message.
    pub fn check(&self, user: UserId, media_group: Option<&str>) -> FloodDecision {
        let now = Instant::now();
        match self.entries.entry(user) {
            dashmap::Entry::Vacant(vacant) => {
                vacant.insert(FloodEntry {
                    last_accepted: now,
                    last_group: media_group.map(|s| s.to_string()),
                });
                FloodDecision::Admit
            }
            dashmap::Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let same_group = match (media_group, entry.last_group.as_deref()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                };
                if same_group || now.duration_since(entry.last_accepted) >= self.cooldown {
                    entry.last_accepted = now;
                    entry.last_group = media_group.map(|s| s.to_string());
                    FloodDecision::Admit
                } else {
                    FloodDecision::Reject
                }
            }
        }
    }

    /// Stamps the clock without gating. Used for messages admitted
    /// through a bypass so the cool-down still starts from them.
    pub fn record_bypass(&self, user: UserId, media_group: Option<&str>) {
        self.entries.insert(
            user,
            FloodEntry {
                last_accepted: Instant::now(),
                last_group: media_group.map(|s| s.to_string()),
            },
        );
    }

    /// Forgets the user's entry, e.g. when a fresh prompt begins.
    pub fn reset(&self, user: UserId) {
        self.entries.remove(&user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    const COOLDOWN: Duration = Duration::from_secs(4);

    #[tokio::test(start_paused = true)]
    async fn first_message_is_admitted() {
        let limiter = RateLimiter::new(COOLDOWN);
        assert_eq!(limiter.check(UserId(1), None), FloodDecision::Admit);
    }

    #[tokio::test(start_paused = true)]
    async fn messages_inside_cooldown_are_rejected() {
        let limiter = RateLimiter::new(COOLDOWN);
        assert_eq!(limiter.check(UserId(1), None), FloodDecision::Admit);

        advance(Duration::from_secs(1)).await;
        assert_eq!(limiter.check(UserId(1), None), FloodDecision::Reject);

        advance(Duration::from_secs(4)).await;
        assert_eq!(limiter.check(UserId(1), None), FloodDecision::Admit);
    }

    #[tokio::test(start_paused = true)]
    async fn album_parts_share_one_admission() {
        let limiter = RateLimiter::new(COOLDOWN);
        assert_eq!(limiter.check(UserId(1), Some("g1")), FloodDecision::Admit);

        // Same group a moment later: admitted, recency refreshed.
        advance(Duration::from_millis(500)).await;
        assert_eq!(limiter.check(UserId(1), Some("g1")), FloodDecision::Admit);

        // Different group inside the cool-down: rejected.
        advance(Duration::from_millis(500)).await;
        assert_eq!(limiter.check(UserId(1), Some("g2")), FloodDecision::Reject);
        assert_eq!(limiter.check(UserId(1), None), FloodDecision::Reject);
    }

    #[tokio::test(start_paused = true)]
    async fn users_are_independent() {
        let limiter = RateLimiter::new(COOLDOWN);
        assert_eq!(limiter.check(UserId(1), None), FloodDecision::Admit);
        assert_eq!(limiter.check(UserId(2), None), FloodDecision::Admit);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_the_gate() {
        let limiter = RateLimiter::new(COOLDOWN);
        assert_eq!(limiter.check(UserId(1), None), FloodDecision::Admit);
        limiter.reset(UserId(1));
        assert_eq!(limiter.check(UserId(1), None), FloodDecision::Admit);
    }

    #[tokio::test(start_paused = true)]
    async fn bypass_still_starts_the_cooldown() {
        let limiter = RateLimiter::new(COOLDOWN);
        limiter.record_bypass(UserId(1), None);
        assert_eq!(limiter.check(UserId(1), None), FloodDecision::Reject);

        advance(Duration::from_secs(5)).await;
        assert_eq!(limiter.check(UserId(1), None), FloodDecision::Admit);
    }
}
