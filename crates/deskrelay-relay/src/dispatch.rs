// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event dispatcher: composes the session table, identity map, album
//! assembler, rate limiter, ban cache, and retry wrapper into the three
//! inbound handlers (user message, operator message, callback press).
//!
//! Handlers return `Err` only for store failures. Gateway failures
//! degrade to a notice on the other side and a metrics increment, never
//! a crash.

use std::collections::HashSet;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use deskrelay_core::{
    Button, CallbackEvent, Destination, GatewayError, MessageId, MessageLink, RelayError,
    SupportGateway, SupportStore, TopicMessage, UserId, UserMessage, UserProfile,
};

use crate::album::{AlbumAssembler, AlbumOrigin, AlbumPart, Ingest, into_chunks};
use crate::bans::BanCache;
use crate::flood::{FloodDecision, RateLimiter};
use crate::identity::IdentityMap;
use crate::retry::{RetryPolicy, send_with_retry};
use crate::session::{Phase, SessionTable};
use crate::text;
use crate::ticket::CloseOutcome;
use std::time::Duration;

/// Timer and pause knobs, mapped from configuration by the binary.
#[derive(Debug, Clone)]
pub struct Tuning {
    pub flood_cooldown: Duration,
    pub warning_ttl: Duration,
    pub album_settle: Duration,
    pub album_chunk_pause: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            flood_cooldown: Duration::from_secs(4),
            warning_ttl: Duration::from_secs(3),
            album_settle: Duration::from_secs(1),
            album_chunk_pause: Duration::from_millis(300),
        }
    }
}

/// The relay engine. Shared behind an `Arc`; all state is interior.
pub struct Relay {
    pub(crate) gateway: Arc<dyn SupportGateway>,
    pub(crate) store: Arc<dyn SupportStore>,
    pub(crate) sessions: SessionTable,
    pub(crate) identity: IdentityMap,
    pub(crate) bans: BanCache,
    pub(crate) flood: RateLimiter,
    pub(crate) albums: AlbumAssembler,
    pub(crate) retry: RetryPolicy,
    pub(crate) admins: HashSet<UserId>,
    pub(crate) tuning: Tuning,
}

impl Relay {
    pub fn new(
        gateway: Arc<dyn SupportGateway>,
        store: Arc<dyn SupportStore>,
        admins: impl IntoIterator<Item = UserId>,
        retry: RetryPolicy,
        tuning: Tuning,
    ) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            store,
            sessions: SessionTable::new(),
            identity: IdentityMap::new(),
            bans: BanCache::new(),
            flood: RateLimiter::new(tuning.flood_cooldown),
            albums: AlbumAssembler::new(),
            retry,
            admins: admins.into_iter().collect(),
            tuning,
        })
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user)
    }

    /// A message arrived in a user's private chat.
    pub async fn handle_user_message(self: &Arc<Self>, msg: UserMessage) -> Result<(), RelayError> {
        let user = msg.from.id;

        if let Some(_ban) = self.bans.check(self.store.as_ref(), user).await? {
            self.send_ban_notice(user).await?;
            return Ok(());
        }

        let phase = self.sessions.reconcile(self.store.as_ref(), user).await?;

        // Admins and the first problem description skip the gate but
        // still stamp the clock.
        if self.is_admin(user) || phase == Phase::AwaitingProblem {
            self.flood.record_bypass(user, msg.media_group_id.as_deref());
        } else if self.flood.check(user, msg.media_group_id.as_deref()) == FloodDecision::Reject {
            counter!("deskrelay_flood_rejected_total").increment(1);
            self.send_transient_warning(user).await;
            return Ok(());
        }

        if let (Some(group), Some(media)) = (&msg.media_group_id, &msg.media) {
            // First album part while awaiting opens the ticket; the
            // parts themselves are delivered by the flush.
            if phase == Phase::AwaitingProblem
                && self.sessions.begin_processing(user)
                && self.open_ticket(&msg.from).await?.is_none()
            {
                return Ok(());
            }
            let part = AlbumPart {
                seq: msg.message_id,
                item: media.clone(),
            };
            let origin = AlbumOrigin::User {
                profile: msg.from.clone(),
                reply_to: msg.reply_to,
            };
            self.ingest_album_part(group, origin, part);
            return Ok(());
        }

        match phase {
            Phase::Idle => self.show_main_menu(user).await,
            Phase::AwaitingProblem => {
                if self.sessions.begin_processing(user) {
                    match self.open_ticket(&msg.from).await? {
                        Some(topic) => self.mirror_user_single(topic, &msg).await,
                        None => Ok(()),
                    }
                } else {
                    self.deliver_into_known_topic(&msg).await
                }
            }
            Phase::Processing => self.deliver_into_known_topic(&msg).await,
            Phase::Active { topic } => self.mirror_user_single(topic, &msg).await,
        }
    }

    /// A non-command message arrived inside a support topic.
    pub async fn handle_operator_message(
        self: &Arc<Self>,
        msg: TopicMessage,
    ) -> Result<(), RelayError> {
        let topic = msg.topic_id;
        let user = match self.sessions.user_for_topic(topic) {
            Some(user) => user,
            None => match self.store.ticket_by_topic(topic).await? {
                Some(ticket) if ticket.status == deskrelay_core::TicketStatus::Open => {
                    self.sessions.activate(ticket.user_id, topic);
                    ticket.user_id
                }
                Some(_) => {
                    self.send_topic_warning(topic, msg.message_id, text::CLOSED_TOPIC_WARNING)
                        .await;
                    return Ok(());
                }
                None => {
                    debug!(%topic, "message in a topic with no ticket, ignoring");
                    return Ok(());
                }
            },
        };

        if let (Some(group), Some(media)) = (&msg.media_group_id, &msg.media) {
            let part = AlbumPart {
                seq: msg.message_id,
                item: media.clone(),
            };
            let origin = AlbumOrigin::Operator {
                topic,
                sender: msg.sender,
                reply_to: msg.reply_to,
            };
            self.ingest_album_part(group, origin, part);
            return Ok(());
        }

        self.mirror_operator_single(topic, user, &msg).await
    }

    /// A user pressed an inline button.
    pub async fn handle_callback(self: &Arc<Self>, ev: CallbackEvent) -> Result<(), RelayError> {
        let user = ev.from.id;

        if self.bans.check(self.store.as_ref(), user).await?.is_some() {
            let contact = self.store.setting(text::SETTING_BAN_CONTACT).await?;
            let notice = text::ban_notice(contact.as_deref());
            let _ = self
                .gateway
                .ack_callback(&ev.callback_id, Some(&notice), true)
                .await;
            return Ok(());
        }

        match ev.data.as_str() {
            text::CB_CONTACT => self.on_contact_pressed(&ev).await,
            text::CB_CANCEL => self.on_cancel_pressed(&ev).await,
            text::CB_CLOSE => self.on_self_close_pressed(&ev).await,
            data => {
                if let Some(ticket_id) = text::parse_topic_close(data) {
                    self.on_topic_close_pressed(&ev, ticket_id).await
                } else {
                    let _ = self.gateway.ack_callback(&ev.callback_id, None, false).await;
                    Ok(())
                }
            }
        }
    }

    /// `/start` in a private chat.
    pub async fn handle_start(self: &Arc<Self>, profile: &UserProfile) -> Result<(), RelayError> {
        let user = profile.id;
        if self.bans.check(self.store.as_ref(), user).await?.is_some() {
            self.send_ban_notice(user).await?;
            return Ok(());
        }
        match self.sessions.reconcile(self.store.as_ref(), user).await? {
            Phase::Active { .. } => {
                let buttons = vec![vec![Button::callback(text::BTN_CLOSE, text::CB_CLOSE)]];
                let _ = send_with_retry(&self.retry, || {
                    self.gateway.send_text(
                        Destination::User(user),
                        text::ACTIVE_TICKET_TEXT,
                        None,
                        &buttons,
                    )
                })
                .await;
                Ok(())
            }
            _ => self.show_main_menu(user).await,
        }
    }

    /// Sends the main menu: configurable greeting plus the contact button.
    pub async fn show_main_menu(&self, user: UserId) -> Result<(), RelayError> {
        let custom = self.store.setting(text::SETTING_MAIN_MENU).await?;
        let menu = text::main_menu_text(custom.as_deref());
        let buttons = vec![vec![Button::callback(text::BTN_CONTACT, text::CB_CONTACT)]];
        let _ = send_with_retry(&self.retry, || {
            self.gateway
                .send_text(Destination::User(user), &menu, None, &buttons)
        })
        .await;
        Ok(())
    }

    async fn on_contact_pressed(self: &Arc<Self>, ev: &CallbackEvent) -> Result<(), RelayError> {
        let user = ev.from.id;
        match self.sessions.reconcile(self.store.as_ref(), user).await? {
            Phase::Active { .. } => {
                let _ = self
                    .gateway
                    .ack_callback(&ev.callback_id, Some(text::ACTIVE_TICKET_TEXT), true)
                    .await;
            }
            _ => {
                self.flood.reset(user);
                self.sessions.await_problem(user, Some(ev.message_id));
                let _ = self
                    .gateway
                    .edit_text(Destination::User(user), ev.message_id, text::PROMPT_TEXT)
                    .await;
                let cancel = vec![vec![Button::callback(text::BTN_CANCEL, text::CB_CANCEL)]];
                let _ = self
                    .gateway
                    .set_buttons(Destination::User(user), ev.message_id, &cancel)
                    .await;
                let _ = self.gateway.ack_callback(&ev.callback_id, None, false).await;
            }
        }
        Ok(())
    }

    async fn on_cancel_pressed(self: &Arc<Self>, ev: &CallbackEvent) -> Result<(), RelayError> {
        let user = ev.from.id;
        if self.sessions.phase(user) == Phase::AwaitingProblem {
            self.sessions.abort_processing(user);
            let custom = self.store.setting(text::SETTING_MAIN_MENU).await?;
            let menu = text::main_menu_text(custom.as_deref());
            let _ = self
                .gateway
                .edit_text(Destination::User(user), ev.message_id, &menu)
                .await;
            let contact = vec![vec![Button::callback(text::BTN_CONTACT, text::CB_CONTACT)]];
            let _ = self
                .gateway
                .set_buttons(Destination::User(user), ev.message_id, &contact)
                .await;
        }
        let _ = self.gateway.ack_callback(&ev.callback_id, None, false).await;
        Ok(())
    }

    async fn on_self_close_pressed(self: &Arc<Self>, ev: &CallbackEvent) -> Result<(), RelayError> {
        let user = ev.from.id;
        match self.sessions.reconcile(self.store.as_ref(), user).await? {
            Phase::Active { topic } => {
                self.close_ticket(topic, crate::ticket::ClosedBy::User).await?;
                let _ = self.gateway.ack_callback(&ev.callback_id, None, false).await;
            }
            _ => {
                let _ = self
                    .gateway
                    .ack_callback(&ev.callback_id, Some(text::ALREADY_CLOSED_NOTICE), false)
                    .await;
            }
        }
        Ok(())
    }

    async fn on_topic_close_pressed(
        self: &Arc<Self>,
        ev: &CallbackEvent,
        ticket_id: deskrelay_core::TicketId,
    ) -> Result<(), RelayError> {
        let open = self.store.open_tickets().await?;
        match open.into_iter().find(|t| t.id == ticket_id) {
            Some(ticket) => {
                let outcome = self
                    .close_ticket(ticket.topic_id, crate::ticket::ClosedBy::Operator)
                    .await?;
                let toast = match outcome {
                    CloseOutcome::Closed(_) => None,
                    _ => Some(text::ALREADY_CLOSED_NOTICE),
                };
                let _ = self.gateway.ack_callback(&ev.callback_id, toast, false).await;
            }
            None => {
                let _ = self
                    .gateway
                    .ack_callback(&ev.callback_id, Some(text::ALREADY_CLOSED_NOTICE), false)
                    .await;
            }
        }
        Ok(())
    }

    pub(crate) async fn mirror_user_single(
        &self,
        topic: deskrelay_core::TopicId,
        msg: &UserMessage,
    ) -> Result<(), RelayError> {
        let user = msg.from.id;
        let reply = match msg.reply_to {
            Some(r) => self
                .identity
                .resolve_from_user(self.store.as_ref(), user, r)
                .await?
                .map(|l| l.topic_msg_id),
            None => None,
        };

        let result = send_with_retry(&self.retry, || {
            self.gateway.copy_message(
                Destination::User(user),
                msg.message_id,
                Destination::Topic(topic),
                reply,
            )
        })
        .await;

        match result {
            Ok(Some(topic_msg_id)) => {
                self.identity
                    .record(
                        self.store.as_ref(),
                        MessageLink {
                            topic_msg_id,
                            user_id: user,
                            user_msg_id: msg.message_id,
                        },
                    )
                    .await?;
                counter!("deskrelay_relayed_total", "direction" => "user_to_topic").increment(1);
                Ok(())
            }
            Ok(None) | Err(_) => {
                counter!("deskrelay_delivery_failures_total", "direction" => "user_to_topic")
                    .increment(1);
                let _ = send_with_retry(&self.retry, || {
                    self.gateway.send_text(
                        Destination::User(user),
                        text::DELIVERY_FAILED_TO_USER,
                        None,
                        &[],
                    )
                })
                .await;
                Ok(())
            }
        }
    }

    async fn mirror_operator_single(
        &self,
        topic: deskrelay_core::TopicId,
        user: UserId,
        msg: &TopicMessage,
    ) -> Result<(), RelayError> {
        let reply = match msg.reply_to {
            Some(r) => self
                .identity
                .resolve_from_topic(self.store.as_ref(), r)
                .await?
                .map(|l| l.user_msg_id),
            None => None,
        };

        let result = send_with_retry(&self.retry, || {
            self.gateway.copy_message(
                Destination::Topic(topic),
                msg.message_id,
                Destination::User(user),
                reply,
            )
        })
        .await;

        match result {
            Ok(Some(user_msg_id)) => {
                self.identity
                    .record(
                        self.store.as_ref(),
                        MessageLink {
                            topic_msg_id: msg.message_id,
                            user_id: user,
                            user_msg_id,
                        },
                    )
                    .await?;
                counter!("deskrelay_relayed_total", "direction" => "topic_to_user").increment(1);
                Ok(())
            }
            Err(GatewayError::Unreachable(reason)) => {
                debug!(%user, %reason, "user unreachable");
                counter!("deskrelay_delivery_failures_total", "direction" => "topic_to_user")
                    .increment(1);
                self.send_topic_warning(topic, msg.message_id, text::USER_UNREACHABLE_WARNING)
                    .await;
                Ok(())
            }
            Ok(None) | Err(_) => {
                counter!("deskrelay_delivery_failures_total", "direction" => "topic_to_user")
                    .increment(1);
                self.send_topic_warning(topic, msg.message_id, text::DELIVERY_FAILED_TO_TOPIC)
                    .await;
                Ok(())
            }
        }
    }

    /// Delivery path for a duplicate that lost the open race or landed
    /// while the topic was still being created.
    async fn deliver_into_known_topic(&self, msg: &UserMessage) -> Result<(), RelayError> {
        match self.store.open_ticket_by_user(msg.from.id).await? {
            Some(ticket) => self.mirror_user_single(ticket.topic_id, msg).await,
            None => {
                debug!(user = %msg.from.id, "no topic yet for duplicate message, dropping");
                Ok(())
            }
        }
    }

    fn ingest_album_part(self: &Arc<Self>, group: &str, origin: AlbumOrigin, part: AlbumPart) {
        if self.albums.ingest(group, origin, part) == Ingest::Armed {
            let relay = Arc::clone(self);
            let key = group.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(relay.tuning.album_settle).await;
                relay.flush_album(&key).await;
            });
        }
    }

    /// Takes a settled album and delivers it chunk by chunk.
    pub(crate) async fn flush_album(self: &Arc<Self>, key: &str) {
        let Some((origin, parts)) = self.albums.flush(key) else {
            return;
        };

        let result = match origin {
            AlbumOrigin::User { profile, reply_to } => {
                let user = profile.id;
                match self.sessions.reconcile(self.store.as_ref(), user).await {
                    Ok(Phase::Active { topic }) => {
                        self.flush_user_album(user, topic, reply_to, into_chunks(parts))
                            .await
                    }
                    Ok(Phase::Processing) => {
                        // The winning open call is still in flight; put
                        // the group back and wait another settle window
                        // so it is delivered whole.
                        for part in parts {
                            let origin = AlbumOrigin::User {
                                profile: profile.clone(),
                                reply_to,
                            };
                            self.ingest_album_part(key, origin, part);
                        }
                        return;
                    }
                    Ok(_) => {
                        // No ticket materialized for this group; drop it
                        // whole and show the menu exactly once.
                        debug!(%user, "album with no ticket, discarding");
                        self.show_main_menu(user).await
                    }
                    Err(err) => Err(err),
                }
            }
            AlbumOrigin::Operator {
                topic, reply_to, ..
            } => {
                self.flush_operator_album(topic, reply_to, into_chunks(parts))
                    .await
            }
        };
        if let Err(err) = result {
            warn!(%err, key, "album flush failed");
        }
    }

    async fn flush_user_album(
        &self,
        user: UserId,
        topic: deskrelay_core::TopicId,
        reply_to: Option<MessageId>,
        chunks: Vec<Vec<AlbumPart>>,
    ) -> Result<(), RelayError> {
        let reply = match reply_to {
            Some(r) => self
                .identity
                .resolve_from_user(self.store.as_ref(), user, r)
                .await?
                .map(|l| l.topic_msg_id),
            None => None,
        };

        for (index, chunk) in chunks.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.tuning.album_chunk_pause).await;
            }
            let items: Vec<_> = chunk.iter().map(|p| p.item.clone()).collect();
            let chunk_reply = if index == 0 { reply } else { None };
            let sent = send_with_retry(&self.retry, || {
                self.gateway
                    .send_media_group(Destination::Topic(topic), &items, chunk_reply)
            })
            .await;

            match sent {
                Ok(Some(ids)) => {
                    for (part, topic_msg_id) in chunk.iter().zip(ids) {
                        self.identity
                            .record(
                                self.store.as_ref(),
                                MessageLink {
                                    topic_msg_id,
                                    user_id: user,
                                    user_msg_id: part.seq,
                                },
                            )
                            .await?;
                    }
                    counter!("deskrelay_relayed_total", "direction" => "user_to_topic")
                        .increment(chunk.len() as u64);
                }
                Ok(None) | Err(_) => {
                    counter!("deskrelay_delivery_failures_total", "direction" => "user_to_topic")
                        .increment(1);
                    let _ = send_with_retry(&self.retry, || {
                        self.gateway.send_text(
                            Destination::User(user),
                            text::DELIVERY_FAILED_TO_USER,
                            None,
                            &[],
                        )
                    })
                    .await;
                    break;
                }
            }
        }
        Ok(())
    }

    async fn flush_operator_album(
        &self,
        topic: deskrelay_core::TopicId,
        reply_to: Option<MessageId>,
        chunks: Vec<Vec<AlbumPart>>,
    ) -> Result<(), RelayError> {
        let user = match self.sessions.user_for_topic(topic) {
            Some(user) => user,
            None => match self.store.ticket_by_topic(topic).await? {
                Some(ticket) if ticket.status == deskrelay_core::TicketStatus::Open => {
                    ticket.user_id
                }
                _ => {
                    self.send_topic_warning(topic, MessageId(0), text::CLOSED_TOPIC_WARNING)
                        .await;
                    return Ok(());
                }
            },
        };

        let reply = match reply_to {
            Some(r) => self
                .identity
                .resolve_from_topic(self.store.as_ref(), r)
                .await?
                .map(|l| l.user_msg_id),
            None => None,
        };

        for (index, chunk) in chunks.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.tuning.album_chunk_pause).await;
            }
            let items: Vec<_> = chunk.iter().map(|p| p.item.clone()).collect();
            let chunk_reply = if index == 0 { reply } else { None };
            let sent = send_with_retry(&self.retry, || {
                self.gateway
                    .send_media_group(Destination::User(user), &items, chunk_reply)
            })
            .await;

            match sent {
                Ok(Some(ids)) => {
                    for (part, user_msg_id) in chunk.iter().zip(ids) {
                        self.identity
                            .record(
                                self.store.as_ref(),
                                MessageLink {
                                    topic_msg_id: part.seq,
                                    user_id: user,
                                    user_msg_id,
                                },
                            )
                            .await?;
                    }
                    counter!("deskrelay_relayed_total", "direction" => "topic_to_user")
                        .increment(chunk.len() as u64);
                }
                Err(GatewayError::Unreachable(reason)) => {
                    debug!(%user, %reason, "user unreachable during album delivery");
                    self.send_topic_warning(topic, MessageId(0), text::USER_UNREACHABLE_WARNING)
                        .await;
                    break;
                }
                Ok(None) | Err(_) => {
                    counter!("deskrelay_delivery_failures_total", "direction" => "topic_to_user")
                        .increment(1);
                    self.send_topic_warning(topic, MessageId(0), text::DELIVERY_FAILED_TO_TOPIC)
                        .await;
                    break;
                }
            }
        }
        Ok(())
    }

    pub(crate) async fn send_ban_notice(&self, user: UserId) -> Result<(), RelayError> {
        let contact = self.store.setting(text::SETTING_BAN_CONTACT).await?;
        let notice = text::ban_notice(contact.as_deref());
        let _ = send_with_retry(&self.retry, || {
            self.gateway
                .send_text(Destination::User(user), &notice, None, &[])
        })
        .await;
        Ok(())
    }

    /// Flood warning that deletes itself shortly after.
    async fn send_transient_warning(self: &Arc<Self>, user: UserId) {
        let sent = self
            .gateway
            .send_text(Destination::User(user), text::FLOOD_WARNING, None, &[])
            .await;
        if let Ok(warning_id) = sent {
            let relay = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(relay.tuning.warning_ttl).await;
                let _ = relay
                    .gateway
                    .delete_message(Destination::User(user), warning_id)
                    .await;
            });
        }
    }

    /// Best-effort operator-facing warning, as a reply when the trigger
    /// message id is known.
    pub(crate) async fn send_topic_warning(
        &self,
        topic: deskrelay_core::TopicId,
        reply_to: MessageId,
        warning: &str,
    ) {
        let reply = (reply_to.0 != 0).then_some(reply_to);
        let _ = send_with_retry(&self.retry, || {
            self.gateway
                .send_text(Destination::Topic(topic), warning, reply, &[])
        })
        .await;
    }
}
