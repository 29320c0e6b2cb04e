// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Deskrelay workspace.
//!
//! Ids are thin newtypes over the platform's integer ids so that user,
//! topic, message, and ticket ids cannot be confused at call sites.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Platform user id. Doubles as the id of the user's private chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Forum topic (message thread) id inside the support group chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicId(pub i32);

/// Platform message id, unique within one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i32);

/// Durable, monotonic ticket id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ticket lifecycle status. Tickets are never deleted, only closed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

/// One support case: a user bound to exactly one forum topic while open.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: TicketId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub topic_id: TopicId,
    pub status: TicketStatus,
    pub created_at: String,
    pub closed_at: Option<String>,
}

/// A ban issued by an admin against a user.
#[derive(Debug, Clone, PartialEq)]
pub struct BanRecord {
    pub user_id: UserId,
    pub reason: String,
    pub admin_id: UserId,
    pub banned_at: String,
}

/// Durable association between a topic-side message and its user-side
/// counterpart. One row per mirrored message, in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLink {
    pub topic_msg_id: MessageId,
    pub user_id: UserId,
    pub user_msg_id: MessageId,
}

/// Media kinds the relay can re-send as part of a grouped-media call.
/// Anything else in an album is dropped silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Document,
    Audio,
}

/// One item of a grouped-media burst.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub file_id: String,
    pub caption: Option<String>,
}

/// Where an outbound gateway call lands: a user's private chat or a
/// forum topic inside the support group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    User(UserId),
    Topic(TopicId),
}

/// Action bound to an inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// Fires a callback event with this data string.
    Callback(String),
    /// Opens an external URL.
    Url(String),
}

/// A single inline button. Rows of buttons form a keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// Minimal sender identity attached to user-side events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Option<String>,
}

/// A message received in a user's private chat.
#[derive(Debug, Clone)]
pub struct UserMessage {
    pub from: UserProfile,
    pub message_id: MessageId,
    /// Id of the message this one replies to, in the user's chat.
    pub reply_to: Option<MessageId>,
    /// Shared group key when the message is part of an album.
    pub media_group_id: Option<String>,
    /// Extracted media, present for album parts.
    pub media: Option<MediaItem>,
}

/// A non-command message posted by an operator inside a support topic.
#[derive(Debug, Clone)]
pub struct TopicMessage {
    pub topic_id: TopicId,
    pub message_id: MessageId,
    pub sender: UserId,
    /// Id of the message this one replies to, in the support chat.
    pub reply_to: Option<MessageId>,
    pub media_group_id: Option<String>,
    pub media: Option<MediaItem>,
}

/// An inline-button press on the user side.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    pub from: UserProfile,
    /// Platform callback-query id, needed to acknowledge the press.
    pub callback_id: String,
    /// The message carrying the pressed button.
    pub message_id: MessageId,
    pub data: String,
}
