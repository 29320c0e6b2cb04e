// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound update classification.
//!
//! Turns raw Telegram updates into relay events: private-chat traffic
//! becomes user events, support-group traffic becomes operator events or
//! commands. Messages outside a forum topic and unsupported media kinds
//! are dropped here, before the relay sees them.

use teloxide::prelude::*;
use teloxide::types::ChatId;

use deskrelay_core::{
    CallbackEvent, MediaItem, MediaKind, MessageId, TopicId, TopicMessage, UserId, UserMessage,
    UserProfile,
};

/// One classified inbound event.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// `/start` in a private chat.
    Start(UserProfile),
    /// Any other private-chat message.
    FromUser(UserMessage),
    /// Non-command message inside a support topic.
    FromTopic(TopicMessage),
    /// `/ban [reason]` inside a support topic.
    Ban {
        topic: TopicId,
        admin: UserId,
        reason: Option<String>,
    },
    /// `/unban <user id>` anywhere in the support chat.
    Unban {
        admin: UserId,
        target: Option<UserId>,
    },
    /// `/close` inside a support topic.
    Close { topic: TopicId, sender: UserId },
}

/// Classifies one message. Returns `None` for traffic the relay does
/// not handle: other group chats, support-chat messages outside a
/// topic, senderless service messages.
pub fn classify_message(msg: &Message, support_chat: ChatId) -> Option<InboundEvent> {
    let sender = msg.from.as_ref()?;
    if sender.is_bot {
        return None;
    }

    if msg.chat.id == support_chat {
        return classify_support_message(msg, UserId(sender.id.0 as i64));
    }
    if !msg.chat.is_private() {
        return None;
    }

    let profile = UserProfile {
        id: UserId(sender.id.0 as i64),
        username: sender.username.clone(),
    };

    if let Some(text) = msg.text()
        && command_name(text) == Some("start")
    {
        return Some(InboundEvent::Start(profile));
    }

    Some(InboundEvent::FromUser(UserMessage {
        from: profile,
        message_id: MessageId(msg.id.0),
        reply_to: msg.reply_to_message().map(|m| MessageId(m.id.0)),
        media_group_id: msg.media_group_id().map(|g| g.to_string()),
        media: media_item(msg),
    }))
}

fn classify_support_message(msg: &Message, sender: UserId) -> Option<InboundEvent> {
    let topic = msg.thread_id.map(|t| TopicId(t.0.0));

    if let Some(text) = msg.text() {
        match command_name(text) {
            Some("ban") => {
                let reason = command_args(text);
                return Some(InboundEvent::Ban {
                    topic: topic?,
                    admin: sender,
                    reason,
                });
            }
            Some("unban") => {
                let target = command_args(text)
                    .and_then(|args| args.split_whitespace().next()?.parse::<i64>().ok())
                    .map(UserId);
                return Some(InboundEvent::Unban {
                    admin: sender,
                    target,
                });
            }
            Some("close") => {
                return Some(InboundEvent::Close {
                    topic: topic?,
                    sender,
                });
            }
            Some(_) => return None,
            None => {}
        }
    }

    let topic = topic?;
    // The thread root is the topic-creation service message; replying
    // to it is Telegram's way of saying "no reply".
    let reply_to = msg
        .reply_to_message()
        .map(|m| MessageId(m.id.0))
        .filter(|r| r.0 != topic.0);

    Some(InboundEvent::FromTopic(TopicMessage {
        topic_id: topic,
        message_id: MessageId(msg.id.0),
        sender,
        reply_to,
        media_group_id: msg.media_group_id().map(|g| g.to_string()),
        media: media_item(msg),
    }))
}

/// Classifies a callback-button press from the user side or a topic.
pub fn classify_callback(q: &CallbackQuery) -> Option<CallbackEvent> {
    let data = q.data.clone()?;
    let message = q.message.as_ref()?;
    Some(CallbackEvent {
        from: UserProfile {
            id: UserId(q.from.id.0 as i64),
            username: q.from.username.clone(),
        },
        callback_id: q.id.to_string(),
        message_id: MessageId(message.id().0),
        data,
    })
}

/// `/name` or `/name@bot` at the start of the text.
fn command_name(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    Some(name.split('@').next().unwrap_or(name))
}

/// Everything after the command token, trimmed; `None` when empty.
fn command_args(text: &str) -> Option<String> {
    let rest = text.split_once(char::is_whitespace)?.1.trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

/// Extracts the relay-transportable media from a message, largest photo
/// variant preferred. Stickers, locations, and the rest yield `None`.
fn media_item(msg: &Message) -> Option<MediaItem> {
    let caption = msg.caption().map(|c| c.to_string());

    if let Some(photos) = msg.photo() {
        let largest = photos.last()?;
        return Some(MediaItem {
            kind: MediaKind::Photo,
            file_id: largest.file.id.to_string(),
            caption,
        });
    }
    if let Some(video) = msg.video() {
        return Some(MediaItem {
            kind: MediaKind::Video,
            file_id: video.file.id.to_string(),
            caption,
        });
    }
    if let Some(doc) = msg.document() {
        return Some(MediaItem {
            kind: MediaKind::Document,
            file_id: doc.file.id.to_string(),
            caption,
        });
    }
    if let Some(audio) = msg.audio() {
        return Some(MediaItem {
            kind: MediaKind::Audio,
            file_id: audio.file.id.to_string(),
            caption,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPPORT: ChatId = ChatId(-100123);

    /// Build a mock private chat message from JSON, matching Telegram
    /// Bot API structure.
    fn make_private_message(user_id: u64, username: Option<&str>, text: &str) -> Message {
        let mut from = serde_json::json!({
            "id": user_id,
            "is_bot": false,
            "first_name": "Test",
        });
        if let Some(uname) = username {
            from["username"] = serde_json::json!(uname);
        }
        let json = serde_json::json!({
            "message_id": 10,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": from,
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    /// Build a mock message inside a support-chat forum topic.
    fn make_topic_message(user_id: u64, thread_id: i32, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 50,
            "date": 1700000000i64,
            "message_thread_id": thread_id,
            "is_topic_message": true,
            "chat": {
                "id": SUPPORT.0,
                "type": "supergroup",
                "title": "Support",
                "is_forum": true,
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Op",
            },
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock topic message")
    }

    fn make_private_photo(user_id: u64, group_id: &str, caption: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 11,
            "date": 1700000000i64,
            "media_group_id": group_id,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "photo": [
                {
                    "file_id": "small-id",
                    "file_unique_id": "u1",
                    "width": 90,
                    "height": 90,
                    "file_size": 1000,
                },
                {
                    "file_id": "large-id",
                    "file_unique_id": "u2",
                    "width": 800,
                    "height": 800,
                    "file_size": 50000,
                }
            ],
            "caption": caption,
        });
        serde_json::from_value(json).expect("failed to deserialize mock photo message")
    }

    #[test]
    fn private_start_is_a_start_event() {
        let msg = make_private_message(42, Some("alice"), "/start");
        match classify_message(&msg, SUPPORT) {
            Some(InboundEvent::Start(profile)) => {
                assert_eq!(profile.id, UserId(42));
                assert_eq!(profile.username.as_deref(), Some("alice"));
            }
            other => panic!("expected Start, got {other:?}"),
        }
    }

    #[test]
    fn private_text_is_a_user_message() {
        let msg = make_private_message(42, None, "my printer is on fire");
        match classify_message(&msg, SUPPORT) {
            Some(InboundEvent::FromUser(user_msg)) => {
                assert_eq!(user_msg.from.id, UserId(42));
                assert_eq!(user_msg.message_id, MessageId(10));
                assert!(user_msg.media.is_none());
                assert!(user_msg.media_group_id.is_none());
            }
            other => panic!("expected FromUser, got {other:?}"),
        }
    }

    #[test]
    fn private_photo_extracts_largest_variant() {
        let msg = make_private_photo(42, "album-7", "look");
        match classify_message(&msg, SUPPORT) {
            Some(InboundEvent::FromUser(user_msg)) => {
                assert_eq!(user_msg.media_group_id.as_deref(), Some("album-7"));
                let media = user_msg.media.expect("photo should be extracted");
                assert_eq!(media.kind, MediaKind::Photo);
                assert_eq!(media.file_id, "large-id");
                assert_eq!(media.caption.as_deref(), Some("look"));
            }
            other => panic!("expected FromUser, got {other:?}"),
        }
    }

    #[test]
    fn topic_text_is_an_operator_message() {
        let msg = make_topic_message(900, 55, "have you tried turning it off");
        match classify_message(&msg, SUPPORT) {
            Some(InboundEvent::FromTopic(topic_msg)) => {
                assert_eq!(topic_msg.topic_id, TopicId(55));
                assert_eq!(topic_msg.sender, UserId(900));
                assert_eq!(topic_msg.message_id, MessageId(50));
            }
            other => panic!("expected FromTopic, got {other:?}"),
        }
    }

    #[test]
    fn ban_command_carries_the_reason() {
        let msg = make_topic_message(900, 55, "/ban spamming the desk");
        match classify_message(&msg, SUPPORT) {
            Some(InboundEvent::Ban {
                topic,
                admin,
                reason,
            }) => {
                assert_eq!(topic, TopicId(55));
                assert_eq!(admin, UserId(900));
                assert_eq!(reason.as_deref(), Some("spamming the desk"));
            }
            other => panic!("expected Ban, got {other:?}"),
        }
    }

    #[test]
    fn bare_ban_has_no_reason() {
        let msg = make_topic_message(900, 55, "/ban");
        match classify_message(&msg, SUPPORT) {
            Some(InboundEvent::Ban { reason, .. }) => assert!(reason.is_none()),
            other => panic!("expected Ban, got {other:?}"),
        }
    }

    #[test]
    fn unban_parses_the_target_id() {
        let msg = make_topic_message(900, 55, "/unban 4242");
        match classify_message(&msg, SUPPORT) {
            Some(InboundEvent::Unban { admin, target }) => {
                assert_eq!(admin, UserId(900));
                assert_eq!(target, Some(UserId(4242)));
            }
            other => panic!("expected Unban, got {other:?}"),
        }

        let msg = make_topic_message(900, 55, "/unban nonsense");
        match classify_message(&msg, SUPPORT) {
            Some(InboundEvent::Unban { target, .. }) => assert!(target.is_none()),
            other => panic!("expected Unban, got {other:?}"),
        }
    }

    #[test]
    fn close_command_is_classified() {
        let msg = make_topic_message(900, 55, "/close@deskrelay_bot");
        match classify_message(&msg, SUPPORT) {
            Some(InboundEvent::Close { topic, sender }) => {
                assert_eq!(topic, TopicId(55));
                assert_eq!(sender, UserId(900));
            }
            other => panic!("expected Close, got {other:?}"),
        }
    }

    #[test]
    fn other_group_chats_are_ignored() {
        let mut msg = make_topic_message(900, 55, "hello");
        // Same shape, different chat.
        msg.chat.id = ChatId(-100999);
        assert!(classify_message(&msg, SUPPORT).is_none());
    }

    #[test]
    fn unknown_commands_in_support_chat_are_ignored() {
        let msg = make_topic_message(900, 55, "/stats");
        assert!(classify_message(&msg, SUPPORT).is_none());
    }

    #[test]
    fn command_parsing_helpers() {
        assert_eq!(command_name("/ban spam"), Some("ban"));
        assert_eq!(command_name("/ban@bot spam"), Some("ban"));
        assert_eq!(command_name("hello"), None);
        assert_eq!(command_args("/ban  two words "), Some("two words".into()));
        assert_eq!(command_args("/ban"), None);
    }
}
