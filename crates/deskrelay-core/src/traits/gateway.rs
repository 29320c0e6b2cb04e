// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging-gateway trait: the outbound surface of the platform.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{Button, Destination, MediaItem, MessageId, TopicId};

/// Outbound operations against the messaging platform.
///
/// Every method may fail with the full [`GatewayError`] taxonomy; the
/// relay engine decides per call site whether to retry (via its retry
/// wrapper), ignore the failure (best-effort calls like pinning), or
/// surface a notice to the other party.
#[async_trait]
pub trait SupportGateway: Send + Sync + 'static {
    /// Sends a text message, optionally as a reply and with inline buttons.
    /// `buttons` is a list of rows; an empty list means no keyboard.
    async fn send_text(
        &self,
        dest: Destination,
        text: &str,
        reply_to: Option<MessageId>,
        buttons: &[Vec<Button>],
    ) -> Result<MessageId, GatewayError>;

    /// Replaces the text of an existing message.
    async fn edit_text(
        &self,
        dest: Destination,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), GatewayError>;

    /// Replaces the inline keyboard of an existing message.
    /// An empty `buttons` list removes the keyboard.
    async fn set_buttons(
        &self,
        dest: Destination,
        message_id: MessageId,
        buttons: &[Vec<Button>],
    ) -> Result<(), GatewayError>;

    /// Deletes a message.
    async fn delete_message(
        &self,
        dest: Destination,
        message_id: MessageId,
    ) -> Result<(), GatewayError>;

    /// Mirrors a message of any content type from one side to the other,
    /// without a forwarding header. Returns the id of the new copy.
    async fn copy_message(
        &self,
        from: Destination,
        message_id: MessageId,
        to: Destination,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, GatewayError>;

    /// Sends up to the platform cap of media items as one grouped album.
    /// Returns the ids of the sent items in request order.
    async fn send_media_group(
        &self,
        dest: Destination,
        items: &[MediaItem],
        reply_to: Option<MessageId>,
    ) -> Result<Vec<MessageId>, GatewayError>;

    /// Creates a new forum topic in the support chat. Returns its id.
    async fn create_topic(&self, title: &str) -> Result<TopicId, GatewayError>;

    /// Renames an existing forum topic.
    async fn rename_topic(&self, topic: TopicId, title: &str) -> Result<(), GatewayError>;

    /// Closes (archives) a forum topic.
    async fn close_topic(&self, topic: TopicId) -> Result<(), GatewayError>;

    /// Reopens a previously closed forum topic.
    async fn reopen_topic(&self, topic: TopicId) -> Result<(), GatewayError>;

    /// Pins a message in the support chat. Callers treat failure as
    /// non-fatal.
    async fn pin_topic_message(&self, message_id: MessageId) -> Result<(), GatewayError>;

    /// Acknowledges a callback-button press, optionally with a toast or
    /// alert shown to the user.
    async fn ack_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), GatewayError>;
}
