// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket lifecycle flows: open, close, ban, unban, startup recovery.
//!
//! The open flow is the only multi-step transition. A topic-creation
//! failure reverts the session to `Idle` before the user is notified,
//! so the machine is never left in `Processing` without a winner in
//! flight. Close is idempotent; the second closer gets
//! [`CloseOutcome::AlreadyClosed`] and no duplicate rename or notice.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, warn};

use deskrelay_core::{
    BanRecord, Button, Destination, MessageId, RelayError, Ticket, TicketStatus, TopicId, UserId,
    UserProfile,
};

use crate::dispatch::Relay;
use crate::retry::send_with_retry;
use crate::text;

/// Who closed a ticket; picks the user-facing wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedBy {
    User,
    Operator,
    Admin,
}

/// Outcome of a close attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    Closed(Ticket),
    AlreadyClosed,
    NotFound,
}

impl Relay {
    /// Opens a ticket for a user in `Processing`: creates the topic,
    /// inserts the row, renames with the assigned id, posts the pinned
    /// notice, swaps the prompt button, and confirms to the user.
    ///
    /// Returns the bound topic, or `None` when topic creation failed
    /// and the session was reverted.
    pub(crate) async fn open_ticket(
        self: &Arc<Self>,
        profile: &UserProfile,
    ) -> Result<Option<TopicId>, RelayError> {
        let user = profile.id;
        let username = profile.username.as_deref();

        let provisional = text::provisional_title(username, user);
        let topic = match send_with_retry(&self.retry, || self.gateway.create_topic(&provisional))
            .await
        {
            Ok(Some(topic)) => topic,
            Ok(None) => return self.revert_open(user).await,
            Err(err) => {
                warn!(%user, %err, "topic creation failed");
                return self.revert_open(user).await;
            }
        };

        let ticket_id = match self.store.create_ticket(user, username, topic).await {
            Ok(id) => id,
            Err(err) => {
                // Orphaned topic; close it so operators don't adopt it.
                let _ = self.gateway.close_topic(topic).await;
                self.revert_open(user).await?;
                return Err(err);
            }
        };

        let title = text::open_title(ticket_id, username, user);
        let _ = send_with_retry(&self.retry, || self.gateway.rename_topic(topic, &title)).await;

        // Capture the prompt before activation drops it.
        let prompt = self.sessions.prompt_msg(user);
        self.sessions.activate(user, topic);

        let mut rows = Vec::new();
        if let Some(base) = self.store.setting(text::SETTING_PANEL_URL).await?
            && !base.is_empty()
        {
            rows.push(vec![Button::url(
                text::BTN_PROFILE,
                text::profile_url(&base, user),
            )]);
        }
        rows.push(vec![Button::callback(
            text::BTN_CLOSE,
            text::topic_close_data(ticket_id),
        )]);

        let notice = text::ticket_notice(ticket_id, username, user);
        if let Ok(Some(notice_id)) = send_with_retry(&self.retry, || {
            self.gateway
                .send_text(Destination::Topic(topic), &notice, None, &rows)
        })
        .await
        {
            // Pinning is cosmetic; one attempt, failure ignored.
            let _ = self.gateway.pin_topic_message(notice_id).await;
        }

        if let Some(prompt_id) = prompt {
            let close = vec![vec![Button::callback(text::BTN_CLOSE, text::CB_CLOSE)]];
            let _ = self
                .gateway
                .set_buttons(Destination::User(user), prompt_id, &close)
                .await;
        }

        let confirmation = text::ticket_confirmation(ticket_id);
        let close = vec![vec![Button::callback(text::BTN_CLOSE, text::CB_CLOSE)]];
        let _ = send_with_retry(&self.retry, || {
            self.gateway
                .send_text(Destination::User(user), &confirmation, None, &close)
        })
        .await;

        counter!("deskrelay_tickets_opened_total").increment(1);
        info!(%user, ticket = %ticket_id, %topic, "ticket opened");
        Ok(Some(topic))
    }

    async fn revert_open(&self, user: UserId) -> Result<Option<TopicId>, RelayError> {
        self.sessions.abort_processing(user);
        let _ = send_with_retry(&self.retry, || {
            self.gateway
                .send_text(Destination::User(user), text::OPEN_FAILED_TEXT, None, &[])
        })
        .await;
        Ok(None)
    }

    /// Closes the ticket bound to `topic`. Safe to call twice; only the
    /// first closer renames, archives, and notifies.
    pub async fn close_ticket(
        &self,
        topic: TopicId,
        closed_by: ClosedBy,
    ) -> Result<CloseOutcome, RelayError> {
        let Some(ticket) = self.store.ticket_by_topic(topic).await? else {
            return Ok(CloseOutcome::NotFound);
        };
        if ticket.status == TicketStatus::Closed {
            return Ok(CloseOutcome::AlreadyClosed);
        }

        self.store.close_ticket_by_topic(topic).await?;
        self.sessions.clear(ticket.user_id);

        let title = text::closed_title(ticket.id, ticket.user_id);
        let _ = send_with_retry(&self.retry, || self.gateway.rename_topic(topic, &title)).await;
        let _ = self.gateway.close_topic(topic).await;

        let _ = send_with_retry(&self.retry, || {
            self.gateway.send_text(
                Destination::User(ticket.user_id),
                text::close_notice(closed_by),
                None,
                &[],
            )
        })
        .await;
        self.show_main_menu(ticket.user_id).await?;

        counter!("deskrelay_tickets_closed_total").increment(1);
        info!(ticket = %ticket.id, %topic, ?closed_by, "ticket closed");
        Ok(CloseOutcome::Closed(ticket))
    }

    /// `/close` inside a topic. Same flow as [`Relay::close_ticket`],
    /// but a close with nothing left to close answers into the topic so
    /// the command never goes silently unacknowledged.
    pub async fn close_from_command(
        &self,
        topic: TopicId,
        closed_by: ClosedBy,
    ) -> Result<CloseOutcome, RelayError> {
        let outcome = self.close_ticket(topic, closed_by).await?;
        if !matches!(outcome, CloseOutcome::Closed(_)) {
            self.send_topic_warning(topic, MessageId(0), text::ALREADY_CLOSED_NOTICE)
                .await;
        }
        Ok(outcome)
    }

    /// `/ban [reason]` inside a topic: bans the ticket's user, closes
    /// the ticket, marks the topic, and notifies the user.
    pub async fn ban_user(
        &self,
        topic: TopicId,
        admin: UserId,
        reason: Option<&str>,
    ) -> Result<Option<Ticket>, RelayError> {
        let Some(ticket) = self.store.ticket_by_topic(topic).await? else {
            return Ok(None);
        };
        let user = ticket.user_id;

        let ban = BanRecord {
            user_id: user,
            reason: reason.unwrap_or("no reason given").to_string(),
            admin_id: admin,
            banned_at: String::new(),
        };
        self.store.insert_ban(&ban).await?;
        self.bans.insert(user);

        if ticket.status == TicketStatus::Open {
            self.store.close_ticket_by_topic(topic).await?;
        }
        self.sessions.clear(user);

        let title = text::banned_title(ticket.id, user);
        let _ = send_with_retry(&self.retry, || self.gateway.rename_topic(topic, &title)).await;
        let _ = self.gateway.close_topic(topic).await;

        self.send_ban_notice(user).await?;

        counter!("deskrelay_users_banned_total").increment(1);
        info!(%user, %admin, ticket = %ticket.id, "user banned");
        Ok(Some(ticket))
    }

    /// `/unban <id>`: lifts the ban, tells the user, and nudges the
    /// user's last topic (reopen, rename, close) so the list reflects
    /// the change.
    pub async fn unban_user(&self, admin: UserId, target: UserId) -> Result<bool, RelayError> {
        if self.store.ban_for(target).await?.is_none() {
            return Ok(false);
        }
        self.store.remove_ban(target).await?;
        self.bans.remove(target);

        let _ = send_with_retry(&self.retry, || {
            self.gateway
                .send_text(Destination::User(target), text::unban_notice(), None, &[])
        })
        .await;

        if let Some(ticket) = self.store.last_ticket_by_user(target).await? {
            let title = text::closed_title(ticket.id, target);
            let _ = self.gateway.reopen_topic(ticket.topic_id).await;
            let _ = send_with_retry(&self.retry, || {
                self.gateway.rename_topic(ticket.topic_id, &title)
            })
            .await;
            let _ = self.gateway.close_topic(ticket.topic_id).await;
        }

        info!(%target, %admin, "user unbanned");
        Ok(true)
    }

    /// Rebuilds the session table and topic index from the open tickets.
    pub async fn startup_recover(&self) -> Result<usize, RelayError> {
        let open = self.store.open_tickets().await?;
        for ticket in &open {
            self.sessions.activate(ticket.user_id, ticket.topic_id);
        }
        info!(count = open.len(), "recovered open tickets");
        Ok(open.len())
    }
}
