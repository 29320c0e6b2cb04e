// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock gateway for deterministic testing.
//!
//! `MockGateway` implements `SupportGateway` with captured outbound
//! calls for assertion in tests, deterministic id assignment, and
//! scriptable per-method failures.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use deskrelay_core::{
    Button, Destination, GatewayError, MediaItem, MessageId, SupportGateway, TopicId,
};

/// One captured outbound call, with owned copies of every argument.
#[derive(Debug, Clone)]
pub enum GatewayCall {
    SendText {
        dest: Destination,
        text: String,
        reply_to: Option<MessageId>,
        buttons: Vec<Vec<Button>>,
    },
    EditText {
        dest: Destination,
        message_id: MessageId,
        text: String,
    },
    SetButtons {
        dest: Destination,
        message_id: MessageId,
        buttons: Vec<Vec<Button>>,
    },
    DeleteMessage {
        dest: Destination,
        message_id: MessageId,
    },
    CopyMessage {
        from: Destination,
        message_id: MessageId,
        to: Destination,
        reply_to: Option<MessageId>,
    },
    SendMediaGroup {
        dest: Destination,
        items: Vec<MediaItem>,
        reply_to: Option<MessageId>,
    },
    CreateTopic {
        title: String,
    },
    RenameTopic {
        topic: TopicId,
        title: String,
    },
    CloseTopic {
        topic: TopicId,
    },
    ReopenTopic {
        topic: TopicId,
    },
    PinTopicMessage {
        message_id: MessageId,
    },
    AckCallback {
        callback_id: String,
        text: Option<String>,
        show_alert: bool,
    },
}

/// A mock messaging gateway for testing.
///
/// Every call is appended to an internal log retrievable via
/// [`MockGateway::calls`]. Message ids count up from 1000 and topic ids
/// from 100, so tests can assert on concrete values. Failures queued
/// with [`MockGateway::queue_failure`] are consumed one per matching
/// call, in queue order.
pub struct MockGateway {
    calls: Arc<Mutex<Vec<GatewayCall>>>,
    failures: Arc<Mutex<VecDeque<(&'static str, GatewayError)>>>,
    next_message_id: AtomicI32,
    next_topic_id: AtomicI32,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(VecDeque::new())),
            next_message_id: AtomicI32::new(1000),
            next_topic_id: AtomicI32::new(100),
        }
    }

    /// Queue a failure for the next call to the named method
    /// (`"send_text"`, `"create_topic"`, ...). Later calls to the same
    /// method succeed again once the queue entry is consumed.
    pub async fn queue_failure(&self, method: &'static str, err: GatewayError) {
        self.failures.lock().await.push_back((method, err));
    }

    /// All captured calls, in order.
    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().await.clone()
    }

    /// Count of captured calls.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Drop the captured call log.
    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Texts of all `send_text` calls to the given destination.
    pub async fn texts_sent_to(&self, dest: Destination) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                GatewayCall::SendText { dest: d, text, .. } if *d == dest => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Titles of all topics created so far, in creation order.
    pub async fn created_topics(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                GatewayCall::CreateTopic { title } => Some(title.clone()),
                _ => None,
            })
            .collect()
    }

    async fn take_failure(&self, method: &'static str) -> Result<(), GatewayError> {
        let mut failures = self.failures.lock().await;
        if let Some(pos) = failures.iter().position(|(m, _)| *m == method) {
            let (_, err) = failures.remove(pos).unwrap();
            return Err(err);
        }
        Ok(())
    }

    async fn record(&self, call: GatewayCall) {
        self.calls.lock().await.push(call);
    }

    fn next_message(&self) -> MessageId {
        MessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SupportGateway for MockGateway {
    async fn send_text(
        &self,
        dest: Destination,
        text: &str,
        reply_to: Option<MessageId>,
        buttons: &[Vec<Button>],
    ) -> Result<MessageId, GatewayError> {
        self.take_failure("send_text").await?;
        self.record(GatewayCall::SendText {
            dest,
            text: text.to_string(),
            reply_to,
            buttons: buttons.to_vec(),
        })
        .await;
        Ok(self.next_message())
    }

    async fn edit_text(
        &self,
        dest: Destination,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), GatewayError> {
        self.take_failure("edit_text").await?;
        self.record(GatewayCall::EditText {
            dest,
            message_id,
            text: text.to_string(),
        })
        .await;
        Ok(())
    }

    async fn set_buttons(
        &self,
        dest: Destination,
        message_id: MessageId,
        buttons: &[Vec<Button>],
    ) -> Result<(), GatewayError> {
        self.take_failure("set_buttons").await?;
        self.record(GatewayCall::SetButtons {
            dest,
            message_id,
            buttons: buttons.to_vec(),
        })
        .await;
        Ok(())
    }

    async fn delete_message(
        &self,
        dest: Destination,
        message_id: MessageId,
    ) -> Result<(), GatewayError> {
        self.take_failure("delete_message").await?;
        self.record(GatewayCall::DeleteMessage { dest, message_id }).await;
        Ok(())
    }

    async fn copy_message(
        &self,
        from: Destination,
        message_id: MessageId,
        to: Destination,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, GatewayError> {
        self.take_failure("copy_message").await?;
        self.record(GatewayCall::CopyMessage {
            from,
            message_id,
            to,
            reply_to,
        })
        .await;
        Ok(self.next_message())
    }

    async fn send_media_group(
        &self,
        dest: Destination,
        items: &[MediaItem],
        reply_to: Option<MessageId>,
    ) -> Result<Vec<MessageId>, GatewayError> {
        self.take_failure("send_media_group").await?;
        let count = items.len();
        self.record(GatewayCall::SendMediaGroup {
            dest,
            items: items.to_vec(),
            reply_to,
        })
        .await;
        Ok((0..count).map(|_| self.next_message()).collect())
    }

    async fn create_topic(&self, title: &str) -> Result<TopicId, GatewayError> {
        self.take_failure("create_topic").await?;
        self.record(GatewayCall::CreateTopic {
            title: title.to_string(),
        })
        .await;
        Ok(TopicId(self.next_topic_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn rename_topic(&self, topic: TopicId, title: &str) -> Result<(), GatewayError> {
        self.take_failure("rename_topic").await?;
        self.record(GatewayCall::RenameTopic {
            topic,
            title: title.to_string(),
        })
        .await;
        Ok(())
    }

    async fn close_topic(&self, topic: TopicId) -> Result<(), GatewayError> {
        self.take_failure("close_topic").await?;
        self.record(GatewayCall::CloseTopic { topic }).await;
        Ok(())
    }

    async fn reopen_topic(&self, topic: TopicId) -> Result<(), GatewayError> {
        self.take_failure("reopen_topic").await?;
        self.record(GatewayCall::ReopenTopic { topic }).await;
        Ok(())
    }

    async fn pin_topic_message(&self, message_id: MessageId) -> Result<(), GatewayError> {
        self.take_failure("pin_topic_message").await?;
        self.record(GatewayCall::PinTopicMessage { message_id }).await;
        Ok(())
    }

    async fn ack_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), GatewayError> {
        self.take_failure("ack_callback").await?;
        self.record(GatewayCall::AckCallback {
            callback_id: callback_id.to_string(),
            text: text.map(|s| s.to_string()),
            show_alert,
        })
        .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskrelay_core::UserId;

    #[tokio::test]
    async fn message_ids_are_deterministic() {
        let gw = MockGateway::new();
        let dest = Destination::User(UserId(1));

        let a = gw.send_text(dest, "one", None, &[]).await.unwrap();
        let b = gw.send_text(dest, "two", None, &[]).await.unwrap();
        assert_eq!(a, MessageId(1000));
        assert_eq!(b, MessageId(1001));

        let texts = gw.texts_sent_to(dest).await;
        assert_eq!(texts, vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test]
    async fn media_group_returns_one_id_per_item() {
        let gw = MockGateway::new();
        let items = vec![
            MediaItem {
                kind: deskrelay_core::MediaKind::Photo,
                file_id: "f1".into(),
                caption: None,
            },
            MediaItem {
                kind: deskrelay_core::MediaKind::Photo,
                file_id: "f2".into(),
                caption: None,
            },
        ];
        let ids = gw
            .send_media_group(Destination::User(UserId(1)), &items, None)
            .await
            .unwrap();
        assert_eq!(ids, vec![MessageId(1000), MessageId(1001)]);
    }

    #[tokio::test]
    async fn queued_failure_fires_once() {
        let gw = MockGateway::new();
        gw.queue_failure("create_topic", GatewayError::Unreachable("down".into()))
            .await;

        assert!(gw.create_topic("t").await.is_err());
        // Consumed; next call succeeds.
        let topic = gw.create_topic("t").await.unwrap();
        assert_eq!(topic, TopicId(100));
        assert_eq!(gw.created_topics().await, vec!["t".to_string()]);
    }

    #[tokio::test]
    async fn failure_targets_only_the_named_method() {
        let gw = MockGateway::new();
        gw.queue_failure("pin_topic_message", GatewayError::Unreachable("x".into()))
            .await;

        // Unrelated call is unaffected.
        gw.send_text(Destination::User(UserId(1)), "hi", None, &[])
            .await
            .unwrap();
        assert!(gw.pin_topic_message(MessageId(1)).await.is_err());
    }
}
