// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The serve loop: wires storage, the Telegram gateway, and the relay
//! engine together, then long-polls updates until ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use tracing::{debug, error, info};

use deskrelay_config::{DeskrelayConfig, RelayConfig};
use deskrelay_core::{RelayError, UserId};
use deskrelay_relay::{CloseOutcome, ClosedBy, Relay, RetryPolicy, Tuning};
use deskrelay_storage::SqliteStore;
use deskrelay_telegram::TelegramGateway;
use deskrelay_telegram::handler::{self, InboundEvent};

pub async fn run(config: DeskrelayConfig) -> Result<(), RelayError> {
    let store = Arc::new(SqliteStore::open(&config.storage).await?);
    let gateway = Arc::new(TelegramGateway::new(&config.telegram)?);
    let bot = gateway.bot().clone();
    let support_chat = gateway.support_chat();

    let relay = Relay::new(
        gateway,
        Arc::clone(&store) as Arc<dyn deskrelay_core::SupportStore>,
        config.telegram.admin_ids.iter().copied().map(UserId),
        retry_from(&config.relay),
        tuning_from(&config.relay),
    );

    let recovered = relay.startup_recover().await?;
    info!(
        recovered,
        admins = config.telegram.admin_ids.len(),
        support_chat = support_chat.0,
        "relay ready"
    );

    let message_relay = Arc::clone(&relay);
    let messages = Update::filter_message().endpoint(move |msg: Message| {
        let relay = Arc::clone(&message_relay);
        async move {
            if let Some(event) = handler::classify_message(&msg, support_chat)
                && let Err(err) = route(&relay, event).await
            {
                error!(%err, "inbound message handling failed");
            }
            respond(())
        }
    });

    let callback_relay = Arc::clone(&relay);
    let callbacks = Update::filter_callback_query().endpoint(move |q: CallbackQuery| {
        let relay = Arc::clone(&callback_relay);
        async move {
            if let Some(ev) = handler::classify_callback(&q)
                && let Err(err) = relay.handle_callback(ev).await
            {
                error!(%err, "callback handling failed");
            }
            respond(())
        }
    });

    Dispatcher::builder(bot, dptree::entry().branch(messages).branch(callbacks))
        .default_handler(|_| async {}) // Silently ignore other update kinds
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    store.close().await?;
    info!("shutdown complete");
    Ok(())
}

async fn route(relay: &Arc<Relay>, event: InboundEvent) -> Result<(), RelayError> {
    match event {
        InboundEvent::Start(profile) => relay.handle_start(&profile).await,
        InboundEvent::FromUser(msg) => relay.handle_user_message(msg).await,
        InboundEvent::FromTopic(msg) => relay.handle_operator_message(msg).await,
        InboundEvent::Ban {
            topic,
            admin,
            reason,
        } => {
            if !relay.is_admin(admin) {
                debug!(%admin, "ignoring /ban from non-admin");
                return Ok(());
            }
            relay
                .ban_user(topic, admin, reason.as_deref())
                .await
                .map(|_| ())
        }
        InboundEvent::Unban { admin, target } => {
            if !relay.is_admin(admin) {
                debug!(%admin, "ignoring /unban from non-admin");
                return Ok(());
            }
            let Some(target) = target else {
                debug!(%admin, "ignoring /unban without a user id");
                return Ok(());
            };
            if !relay.unban_user(admin, target).await? {
                debug!(%target, "no ban on record");
            }
            Ok(())
        }
        InboundEvent::Close { topic, sender } => {
            let closed_by = if relay.is_admin(sender) {
                ClosedBy::Admin
            } else {
                ClosedBy::Operator
            };
            if let CloseOutcome::Closed(ticket) = relay.close_from_command(topic, closed_by).await?
            {
                info!(ticket = %ticket.id, %sender, "ticket closed via command");
            }
            Ok(())
        }
    }
}

fn tuning_from(relay: &RelayConfig) -> Tuning {
    Tuning {
        flood_cooldown: Duration::from_secs(relay.flood_cooldown_secs),
        warning_ttl: Duration::from_secs(relay.warning_ttl_secs),
        album_settle: Duration::from_millis(relay.album_settle_ms),
        album_chunk_pause: Duration::from_millis(relay.album_chunk_pause_ms),
    }
}

fn retry_from(relay: &RelayConfig) -> RetryPolicy {
    RetryPolicy {
        max_attempts: relay.retry_attempts,
        transient_delay: Duration::from_millis(relay.retry_transient_delay_ms),
        rate_limit_margin: Duration::from_millis(relay.retry_rate_limit_margin_ms),
    }
}
