// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end relay behavior against the mock gateway and the in-memory
//! store. Timers run under a paused tokio clock.

use std::sync::Arc;
use std::time::Duration;

use deskrelay_core::{
    BanRecord, CallbackEvent, Destination, GatewayError, MediaItem, MediaKind, MessageId,
    SupportStore, TopicId, TopicMessage, UserId, UserMessage, UserProfile,
};
use deskrelay_relay::ticket::{CloseOutcome, ClosedBy};
use deskrelay_relay::{Relay, RetryPolicy, Tuning};
use deskrelay_test_utils::{GatewayCall, MemoryStore, MockGateway};

const OPERATOR: UserId = UserId(900);

struct Harness {
    relay: Arc<Relay>,
    gateway: Arc<MockGateway>,
    store: Arc<MemoryStore>,
}

fn harness() -> Harness {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    let relay = Relay::new(
        gateway.clone(),
        store.clone(),
        [UserId(1)],
        RetryPolicy::default(),
        Tuning::default(),
    );
    Harness {
        relay,
        gateway,
        store,
    }
}

fn profile(id: i64) -> UserProfile {
    UserProfile {
        id: UserId(id),
        username: Some(format!("user{id}")),
    }
}

fn user_text(id: i64, message_id: i32) -> UserMessage {
    UserMessage {
        from: profile(id),
        message_id: MessageId(message_id),
        reply_to: None,
        media_group_id: None,
        media: None,
    }
}

fn user_album_part(id: i64, message_id: i32, group: &str) -> UserMessage {
    UserMessage {
        from: profile(id),
        message_id: MessageId(message_id),
        reply_to: None,
        media_group_id: Some(group.to_string()),
        media: Some(MediaItem {
            kind: MediaKind::Photo,
            file_id: format!("file-{message_id}"),
            caption: None,
        }),
    }
}

fn contact_press(id: i64, message_id: i32) -> CallbackEvent {
    CallbackEvent {
        from: profile(id),
        callback_id: format!("cb-{id}-{message_id}"),
        message_id: MessageId(message_id),
        data: "ticket:start".to_string(),
    }
}

/// Runs a user through menu, prompt, and first message; returns the
/// bound topic.
async fn open_ticket(h: &Harness, user: i64, first_msg: i32) -> TopicId {
    h.relay.handle_start(&profile(user)).await.unwrap();
    // The menu message carries the contact button.
    h.relay
        .handle_callback(contact_press(user, 1000))
        .await
        .unwrap();
    h.relay
        .handle_user_message(user_text(user, first_msg))
        .await
        .unwrap();

    h.store
        .open_ticket_by_user(UserId(user))
        .await
        .unwrap()
        .expect("ticket should be open")
        .topic_id
}

#[tokio::test(start_paused = true)]
async fn one_open_ticket_per_user() {
    let h = harness();
    let topic = open_ticket(&h, 5, 10).await;

    // A second contact press does not open another ticket.
    h.relay
        .handle_callback(contact_press(5, 1000))
        .await
        .unwrap();
    // Nor does another plain message.
    tokio::time::advance(Duration::from_secs(5)).await;
    h.relay.handle_user_message(user_text(5, 11)).await.unwrap();

    assert_eq!(h.gateway.created_topics().await.len(), 1);
    let open = h.store.open_tickets().await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].topic_id, topic);
}

#[tokio::test(start_paused = true)]
async fn topic_title_carries_open_marker_and_identity() {
    let h = harness();
    open_ticket(&h, 5, 10).await;

    let renames: Vec<String> = h
        .gateway
        .calls()
        .await
        .into_iter()
        .filter_map(|c| match c {
            GatewayCall::RenameTopic { title, .. } => Some(title),
            _ => None,
        })
        .collect();
    assert_eq!(renames, vec!["🔴 #ID1 — @user5 — 5".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn reply_threading_round_trips() {
    let h = harness();
    let topic = open_ticket(&h, 5, 10).await;

    // The first message was mirrored into the topic; find its copy id.
    let mirrored = h
        .store
        .link_by_user_msg(UserId(5), MessageId(10))
        .await
        .unwrap()
        .expect("mirror should be linked");

    // Operator replies to the mirrored copy.
    h.relay
        .handle_operator_message(TopicMessage {
            topic_id: topic,
            message_id: MessageId(50),
            sender: OPERATOR,
            reply_to: Some(mirrored.topic_msg_id),
            media_group_id: None,
            media: None,
        })
        .await
        .unwrap();

    // The user-side copy replies to the user's original message.
    let calls = h.gateway.calls().await;
    let op_copy = calls
        .iter()
        .find_map(|c| match c {
            GatewayCall::CopyMessage {
                to: Destination::User(u),
                reply_to,
                ..
            } if *u == UserId(5) => Some(*reply_to),
            _ => None,
        })
        .expect("operator message should be copied to the user");
    assert_eq!(op_copy, Some(MessageId(10)));

    // The user replies to the operator's copy; the topic-side mirror
    // threads back to the operator's original message.
    let op_link = h
        .store
        .link_by_topic_msg(MessageId(50))
        .await
        .unwrap()
        .expect("operator message should be linked");

    tokio::time::advance(Duration::from_secs(5)).await;
    h.relay
        .handle_user_message(UserMessage {
            from: profile(5),
            message_id: MessageId(11),
            reply_to: Some(op_link.user_msg_id),
            media_group_id: None,
            media: None,
        })
        .await
        .unwrap();

    let calls = h.gateway.calls().await;
    let user_reply_copy = calls
        .iter()
        .rev()
        .find_map(|c| match c {
            GatewayCall::CopyMessage {
                to: Destination::Topic(t),
                reply_to,
                message_id,
                ..
            } if *t == topic && *message_id == MessageId(11) => Some(*reply_to),
            _ => None,
        })
        .expect("user reply should be mirrored");
    assert_eq!(user_reply_copy, Some(MessageId(50)));
}

#[tokio::test(start_paused = true)]
async fn double_close_is_idempotent() {
    let h = harness();
    let topic = open_ticket(&h, 5, 10).await;

    let first = h.relay.close_ticket(topic, ClosedBy::Operator).await.unwrap();
    assert!(matches!(first, CloseOutcome::Closed(_)));

    let second = h.relay.close_ticket(topic, ClosedBy::Operator).await.unwrap();
    assert_eq!(second, CloseOutcome::AlreadyClosed);

    // One closed-marker rename, not two.
    let closed_renames = h
        .gateway
        .calls()
        .await
        .into_iter()
        .filter(|c| {
            matches!(c, GatewayCall::RenameTopic { title, .. } if title.contains("CLOSED"))
        })
        .count();
    assert_eq!(closed_renames, 1);
}

#[tokio::test(start_paused = true)]
async fn cooldown_rejects_then_admits() {
    let h = harness();
    let topic = open_ticket(&h, 5, 10).await;

    // The opening message started the cool-down; step past it.
    tokio::time::advance(Duration::from_secs(5)).await;
    h.relay.handle_user_message(user_text(5, 20)).await.unwrap();

    // One second later: rejected with a transient warning, no mirror.
    tokio::time::advance(Duration::from_secs(1)).await;
    h.relay.handle_user_message(user_text(5, 21)).await.unwrap();

    let warnings = h
        .gateway
        .texts_sent_to(Destination::User(UserId(5)))
        .await
        .into_iter()
        .filter(|t| t.contains("slow down"))
        .count();
    assert_eq!(warnings, 1);
    let mirrored_21 = h.gateway.calls().await.into_iter().any(|c| {
        matches!(c, GatewayCall::CopyMessage { message_id, .. } if message_id == MessageId(21))
    });
    assert!(!mirrored_21);

    // Five seconds apart: admitted.
    tokio::time::advance(Duration::from_secs(5)).await;
    h.relay.handle_user_message(user_text(5, 22)).await.unwrap();
    let mirrored_22 = h.gateway.calls().await.into_iter().any(|c| {
        matches!(c, GatewayCall::CopyMessage { message_id, to: Destination::Topic(t), .. }
            if message_id == MessageId(22) && t == topic)
    });
    assert!(mirrored_22);
}

#[tokio::test(start_paused = true)]
async fn twelve_item_album_lands_as_two_ordered_chunks() {
    let h = harness();
    let topic = open_ticket(&h, 5, 10).await;
    tokio::time::advance(Duration::from_secs(5)).await;

    // Out-of-order arrival.
    for msg_id in [24, 21, 30, 32, 25, 22, 27, 31, 23, 28, 29, 26] {
        h.relay
            .handle_user_message(user_album_part(5, msg_id, "album-1"))
            .await
            .unwrap();
    }

    // Let the quiescence timer fire.
    tokio::time::sleep(Duration::from_secs(2)).await;

    let groups: Vec<(TopicId, Vec<String>)> = h
        .gateway
        .calls()
        .await
        .into_iter()
        .filter_map(|c| match c {
            GatewayCall::SendMediaGroup {
                dest: Destination::Topic(t),
                items,
                ..
            } => Some((t, items.into_iter().map(|i| i.file_id).collect())),
            _ => None,
        })
        .collect();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].0, topic);
    assert_eq!(groups[0].1.len(), 10);
    assert_eq!(groups[1].1.len(), 2);

    let expected_first: Vec<String> = (21..=30).map(|i| format!("file-{i}")).collect();
    assert_eq!(groups[0].1, expected_first);
    assert_eq!(groups[1].1, vec!["file-31".to_string(), "file-32".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn album_waits_for_slow_ticket_open() {
    let h = harness();
    h.relay.handle_start(&profile(5)).await.unwrap();
    h.relay
        .handle_callback(contact_press(5, 1000))
        .await
        .unwrap();

    // Topic creation hits a rate limit, so the open outlives the album
    // settle window.
    h.gateway
        .queue_failure(
            "create_topic",
            GatewayError::RateLimited {
                retry_after: Duration::from_secs(2),
            },
        )
        .await;

    let relay = h.relay.clone();
    let opener =
        tokio::spawn(async move { relay.handle_user_message(user_album_part(5, 10, "g")).await });
    tokio::task::yield_now().await;
    h.relay
        .handle_user_message(user_album_part(5, 11, "g"))
        .await
        .unwrap();
    opener.await.unwrap().unwrap();

    // Let the re-armed flush timer fire after the ticket settles.
    tokio::time::sleep(Duration::from_secs(5)).await;

    // The group arrives whole, in order, as one grouped send.
    let albums: Vec<Vec<String>> = h
        .gateway
        .calls()
        .await
        .into_iter()
        .filter_map(|c| match c {
            GatewayCall::SendMediaGroup { items, .. } => {
                Some(items.into_iter().map(|i| i.file_id).collect())
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        albums,
        vec![vec!["file-10".to_string(), "file-11".to_string()]]
    );

    // The menu was shown at /start and never again.
    let menus = h
        .gateway
        .texts_sent_to(Destination::User(UserId(5)))
        .await
        .into_iter()
        .filter(|t| t.contains("contact support"))
        .count();
    assert_eq!(menus, 1);
}

#[tokio::test(start_paused = true)]
async fn close_rename_survives_a_transient_failure() {
    let h = harness();
    let topic = open_ticket(&h, 5, 10).await;

    h.gateway
        .queue_failure("rename_topic", GatewayError::other("flaky"))
        .await;
    h.relay.close_ticket(topic, ClosedBy::Operator).await.unwrap();

    // The retried attempt still carries the closed-marker title.
    let renames: Vec<String> = h
        .gateway
        .calls()
        .await
        .into_iter()
        .filter_map(|c| match c {
            GatewayCall::RenameTopic { title, .. } if title.contains("CLOSED") => Some(title),
            _ => None,
        })
        .collect();
    assert_eq!(renames, vec!["🟢 #ID1 — CLOSED — 5".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn close_command_answers_when_nothing_is_open() {
    let h = harness();
    let topic = open_ticket(&h, 5, 10).await;
    h.relay
        .close_from_command(topic, ClosedBy::Operator)
        .await
        .unwrap();
    h.gateway.clear_calls().await;

    let outcome = h
        .relay
        .close_from_command(topic, ClosedBy::Operator)
        .await
        .unwrap();
    assert_eq!(outcome, CloseOutcome::AlreadyClosed);

    // The topic hears about it; nothing is renamed or re-notified.
    let calls = h.gateway.calls().await;
    assert!(calls.iter().any(|c| matches!(
        c,
        GatewayCall::SendText { dest: Destination::Topic(t), text, .. }
            if *t == topic && text.contains("already closed")
    )));
    assert!(!calls
        .iter()
        .any(|c| matches!(c, GatewayCall::RenameTopic { .. })));
}

#[tokio::test(start_paused = true)]
async fn store_ban_is_enforced_on_next_access() {
    let h = harness();
    open_ticket(&h, 5, 10).await;

    // The ban lands in the store behind the relay's back.
    h.store
        .insert_ban(&BanRecord {
            user_id: UserId(5),
            reason: "abuse".into(),
            admin_id: UserId(1),
            banned_at: String::new(),
        })
        .await
        .unwrap();

    h.gateway.clear_calls().await;
    tokio::time::advance(Duration::from_secs(5)).await;
    h.relay.handle_user_message(user_text(5, 20)).await.unwrap();

    // Ban notice, no mirror.
    let calls = h.gateway.calls().await;
    assert!(calls.iter().any(|c| matches!(
        c,
        GatewayCall::SendText { text, .. } if text.contains("banned")
    )));
    assert!(!calls
        .iter()
        .any(|c| matches!(c, GatewayCall::CopyMessage { .. })));
}

#[tokio::test(start_paused = true)]
async fn unban_lifts_the_ban_and_notifies() {
    let h = harness();
    h.relay
        .ban_user(open_ticket(&h, 5, 10).await, UserId(1), Some("abuse"))
        .await
        .unwrap();
    assert!(h.store.ban_for(UserId(5)).await.unwrap().is_some());

    assert!(h.relay.unban_user(UserId(1), UserId(5)).await.unwrap());
    assert!(h.store.ban_for(UserId(5)).await.unwrap().is_none());
    // Unbanning twice reports nothing to do.
    assert!(!h.relay.unban_user(UserId(1), UserId(5)).await.unwrap());

    let texts = h.gateway.texts_sent_to(Destination::User(UserId(5))).await;
    assert!(texts.iter().any(|t| t.contains("lifted")));
}

#[tokio::test(start_paused = true)]
async fn startup_recovery_rebinds_open_tickets() {
    let store = Arc::new(MemoryStore::new());
    store
        .create_ticket(UserId(5), Some("user5"), TopicId(40))
        .await
        .unwrap();

    let gateway = Arc::new(MockGateway::new());
    let relay = Relay::new(
        gateway.clone(),
        store.clone(),
        [],
        RetryPolicy::default(),
        Tuning::default(),
    );
    assert_eq!(relay.startup_recover().await.unwrap(), 1);

    // Operator messages route without touching create_topic.
    relay
        .handle_operator_message(TopicMessage {
            topic_id: TopicId(40),
            message_id: MessageId(50),
            sender: OPERATOR,
            reply_to: None,
            media_group_id: None,
            media: None,
        })
        .await
        .unwrap();

    let copied = gateway.calls().await.into_iter().any(|c| {
        matches!(c, GatewayCall::CopyMessage { to: Destination::User(u), .. } if u == UserId(5))
    });
    assert!(copied);
}

#[tokio::test(start_paused = true)]
async fn closed_topic_messages_warn_the_operator() {
    let h = harness();
    let topic = open_ticket(&h, 5, 10).await;
    h.relay.close_ticket(topic, ClosedBy::Operator).await.unwrap();
    h.gateway.clear_calls().await;

    h.relay
        .handle_operator_message(TopicMessage {
            topic_id: topic,
            message_id: MessageId(60),
            sender: OPERATOR,
            reply_to: None,
            media_group_id: None,
            media: None,
        })
        .await
        .unwrap();

    let calls = h.gateway.calls().await;
    assert!(calls.iter().any(|c| matches!(
        c,
        GatewayCall::SendText { dest: Destination::Topic(t), text, .. }
            if *t == topic && text.contains("closed")
    )));
    assert!(!calls
        .iter()
        .any(|c| matches!(c, GatewayCall::CopyMessage { .. })));
}

#[tokio::test(start_paused = true)]
async fn full_ticket_scenario() {
    let h = harness();

    // Menu, prompt, first message.
    h.relay.handle_start(&profile(7)).await.unwrap();
    let menu_texts = h.gateway.texts_sent_to(Destination::User(UserId(7))).await;
    assert!(menu_texts[0].contains("contact support"));

    h.relay
        .handle_callback(contact_press(7, 1000))
        .await
        .unwrap();
    h.relay.handle_user_message(user_text(7, 10)).await.unwrap();

    // Ticket exists, topic titled with the open marker, message mirrored.
    let ticket = h
        .store
        .open_ticket_by_user(UserId(7))
        .await
        .unwrap()
        .unwrap();
    let topic = ticket.topic_id;
    let renamed_open = h.gateway.calls().await.into_iter().any(|c| {
        matches!(c, GatewayCall::RenameTopic { title, .. } if title.starts_with("🔴 #ID"))
    });
    assert!(renamed_open);
    let link = h
        .store
        .link_by_user_msg(UserId(7), MessageId(10))
        .await
        .unwrap()
        .unwrap();

    // Operator replies; the user sees it threaded under the original.
    h.relay
        .handle_operator_message(TopicMessage {
            topic_id: topic,
            message_id: MessageId(50),
            sender: OPERATOR,
            reply_to: Some(link.topic_msg_id),
            media_group_id: None,
            media: None,
        })
        .await
        .unwrap();

    // Operator closes.
    let outcome = h.relay.close_ticket(topic, ClosedBy::Operator).await.unwrap();
    assert!(matches!(outcome, CloseOutcome::Closed(_)));

    // Closed marker, user notified, menu offered again.
    let renamed_closed = h.gateway.calls().await.into_iter().any(|c| {
        matches!(c, GatewayCall::RenameTopic { title, .. } if title.contains("CLOSED"))
    });
    assert!(renamed_closed);
    let texts = h.gateway.texts_sent_to(Destination::User(UserId(7))).await;
    assert!(texts.iter().any(|t| t.contains("Support closed your ticket")));
    assert!(texts.iter().filter(|t| t.contains("contact support")).count() >= 2);
    assert!(h.store.open_ticket_by_user(UserId(7)).await.unwrap().is_none());
}
