// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user conversation phase and the topic-to-user index.
//!
//! The table is a cache over the durable ticket rows: `reconcile` heals
//! any divergence at the top of a user-event handler, and startup
//! recovery repopulates it from the open-ticket scan.

use dashmap::DashMap;

use deskrelay_core::{MessageId, RelayError, SupportStore, TopicId, UserId};

/// Where a user currently is in the ticket flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No open ticket, no pending prompt.
    Idle,
    /// Prompted for a problem description; the next message opens a ticket.
    AwaitingProblem,
    /// A ticket open is in flight. Transient; held only while the topic
    /// is being created.
    Processing,
    /// Bound to an open ticket's topic.
    Active { topic: TopicId },
}

#[derive(Debug, Clone)]
struct Session {
    phase: Phase,
    /// The prompt message whose buttons get swapped once the ticket opens.
    prompt_msg: Option<MessageId>,
}

/// Concurrent session table. Entry-level locking only; each method holds
/// at most one shard lock at a time.
pub struct SessionTable {
    sessions: DashMap<UserId, Session>,
    topic_index: DashMap<TopicId, UserId>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            topic_index: DashMap::new(),
        }
    }

    /// Current phase; users without an entry are `Idle`.
    pub fn phase(&self, user: UserId) -> Phase {
        self.sessions
            .get(&user)
            .map(|s| s.phase)
            .unwrap_or(Phase::Idle)
    }

    /// Puts the user into `AwaitingProblem`, remembering which message
    /// carries the prompt buttons.
    pub fn await_problem(&self, user: UserId, prompt_msg: Option<MessageId>) {
        self.sessions.insert(
            user,
            Session {
                phase: Phase::AwaitingProblem,
                prompt_msg,
            },
        );
    }

    /// Compare-and-set from `AwaitingProblem` to `Processing`. Returns
    /// whether this caller won; a concurrent duplicate loses and must
    /// deliver into the topic the winner creates.
    pub fn begin_processing(&self, user: UserId) -> bool {
        match self.sessions.get_mut(&user) {
            Some(mut entry) if entry.phase == Phase::AwaitingProblem => {
                entry.phase = Phase::Processing;
                true
            }
            _ => false,
        }
    }

    /// The prompt message recorded when entering `AwaitingProblem`.
    pub fn prompt_msg(&self, user: UserId) -> Option<MessageId> {
        self.sessions.get(&user).and_then(|s| s.prompt_msg)
    }

    /// Binds the user to an open topic and indexes the reverse direction.
    pub fn activate(&self, user: UserId, topic: TopicId) {
        self.sessions.insert(
            user,
            Session {
                phase: Phase::Active { topic },
                prompt_msg: None,
            },
        );
        self.topic_index.insert(topic, user);
    }

    /// Drops the user's session and, when bound, the topic index entry.
    pub fn clear(&self, user: UserId) {
        if let Some((_, session)) = self.sessions.remove(&user)
            && let Phase::Active { topic } = session.phase
        {
            self.topic_index.remove(&topic);
        }
    }

    /// Reverts a failed `Processing` entry back to `Idle`.
    pub fn abort_processing(&self, user: UserId) {
        self.sessions.remove(&user);
    }

    pub fn user_for_topic(&self, topic: TopicId) -> Option<UserId> {
        self.topic_index.get(&topic).map(|u| *u)
    }

    /// Heals the in-memory entry against the durable tickets and returns
    /// the trusted phase.
    ///
    /// `Active` with no open ticket in the store collapses to `Idle`;
    /// `Idle` with an open ticket rebinds to `Active`. The transient
    /// phases are left alone, the winner of the open flow settles them.
    pub async fn reconcile(
        &self,
        store: &dyn SupportStore,
        user: UserId,
    ) -> Result<Phase, RelayError> {
        let phase = self.phase(user);
        match phase {
            Phase::AwaitingProblem | Phase::Processing => Ok(phase),
            Phase::Active { topic } => {
                match store.open_ticket_by_user(user).await? {
                    Some(ticket) if ticket.topic_id == topic => Ok(phase),
                    Some(ticket) => {
                        // Bound to a stale topic; follow the store.
                        self.clear(user);
                        self.activate(user, ticket.topic_id);
                        Ok(Phase::Active {
                            topic: ticket.topic_id,
                        })
                    }
                    None => {
                        self.clear(user);
                        Ok(Phase::Idle)
                    }
                }
            }
            Phase::Idle => match store.open_ticket_by_user(user).await? {
                Some(ticket) => {
                    self.activate(user, ticket.topic_id);
                    Ok(Phase::Active {
                        topic: ticket.topic_id,
                    })
                }
                None => Ok(Phase::Idle),
            },
        }
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}
