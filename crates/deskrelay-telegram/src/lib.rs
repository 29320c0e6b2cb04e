// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram gateway for the Deskrelay support bridge.
//!
//! Implements [`SupportGateway`] via teloxide: private-chat sends, forum
//! topic management inside the support group, any-content copies, and
//! grouped-media delivery. Platform errors are mapped onto the gateway
//! taxonomy so the relay's retry wrapper can tell pushback from a dead
//! peer.

pub mod handler;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, ChatId, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile,
    InputMedia, InputMediaAudio, InputMediaDocument, InputMediaPhoto, InputMediaVideo,
    MessageId as TgMessageId, ReplyParameters, ThreadId,
};
use url::Url;
use tracing::warn;

use deskrelay_config::TelegramConfig;
use deskrelay_core::{
    Button, ButtonAction, Destination, GatewayError, MediaItem, MediaKind, MessageId, RelayError,
    SupportGateway, TopicId,
};

/// Telegram-backed [`SupportGateway`].
///
/// Topic destinations resolve to the configured support group with the
/// topic id as the message thread; user destinations are the private
/// chat whose id equals the user id.
pub struct TelegramGateway {
    bot: Bot,
    support_chat: ChatId,
}

impl TelegramGateway {
    /// Requires `config.bot_token` and a non-zero `support_chat_id`.
    pub fn new(config: &TelegramConfig) -> Result<Self, RelayError> {
        let token = config
            .bot_token
            .as_deref()
            .ok_or_else(|| RelayError::Config("telegram.bot_token is required".into()))?;
        if token.is_empty() {
            return Err(RelayError::Config("telegram.bot_token cannot be empty".into()));
        }
        if config.support_chat_id == 0 {
            return Err(RelayError::Config(
                "telegram.support_chat_id is required".into(),
            ));
        }
        Ok(Self {
            bot: Bot::new(token),
            support_chat: ChatId(config.support_chat_id),
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn support_chat(&self) -> ChatId {
        self.support_chat
    }

    fn chat_for(&self, dest: Destination) -> ChatId {
        match dest {
            Destination::User(user) => ChatId(user.0),
            Destination::Topic(_) => self.support_chat,
        }
    }
}

fn thread(topic: TopicId) -> ThreadId {
    ThreadId(TgMessageId(topic.0))
}

fn reply_params(reply_to: MessageId) -> ReplyParameters {
    ReplyParameters::new(TgMessageId(reply_to.0))
}

/// Converts relay button rows into an inline keyboard. Returns `None`
/// for an empty layout so callers can omit the markup entirely.
fn keyboard(buttons: &[Vec<Button>]) -> Option<InlineKeyboardMarkup> {
    if buttons.is_empty() {
        return None;
    }
    let rows: Vec<Vec<InlineKeyboardButton>> = buttons
        .iter()
        .map(|row| {
            row.iter()
                .filter_map(|b| match &b.action {
                    ButtonAction::Callback(data) => {
                        Some(InlineKeyboardButton::callback(&b.label, data))
                    }
                    ButtonAction::Url(raw) => match Url::parse(raw) {
                        Ok(url) => Some(InlineKeyboardButton::url(&b.label, url)),
                        Err(err) => {
                            warn!(%raw, %err, "dropping button with invalid url");
                            None
                        }
                    },
                })
                .collect()
        })
        .collect();
    Some(InlineKeyboardMarkup::new(rows))
}

fn input_media(item: &MediaItem) -> InputMedia {
    let file = InputFile::file_id(FileId(item.file_id.clone()));
    match item.kind {
        MediaKind::Photo => {
            let mut media = InputMediaPhoto::new(file);
            if let Some(caption) = &item.caption {
                media = media.caption(caption);
            }
            InputMedia::Photo(media)
        }
        MediaKind::Video => {
            let mut media = InputMediaVideo::new(file);
            if let Some(caption) = &item.caption {
                media = media.caption(caption);
            }
            InputMedia::Video(media)
        }
        MediaKind::Document => {
            let mut media = InputMediaDocument::new(file);
            if let Some(caption) = &item.caption {
                media = media.caption(caption);
            }
            InputMedia::Document(media)
        }
        MediaKind::Audio => {
            let mut media = InputMediaAudio::new(file);
            if let Some(caption) = &item.caption {
                media = media.caption(caption);
            }
            InputMedia::Audio(media)
        }
    }
}

/// Maps a teloxide request error onto the gateway taxonomy.
///
/// Rate-limit pushback keeps the server-provided interval; a blocked
/// bot, deactivated account, or missing chat means the peer is gone.
fn map_request_error(err: teloxide::RequestError) -> GatewayError {
    use teloxide::{ApiError, RequestError};
    match err {
        RequestError::RetryAfter(secs) => GatewayError::RateLimited {
            retry_after: std::time::Duration::from_secs(u64::from(secs.seconds())),
        },
        RequestError::Api(
            api @ (ApiError::BotBlocked | ApiError::UserDeactivated | ApiError::ChatNotFound),
        ) => GatewayError::Unreachable(api.to_string()),
        other => {
            let message = other.to_string();
            GatewayError::Other {
                message,
                source: Some(Box::new(other)),
            }
        }
    }
}

#[async_trait]
impl SupportGateway for TelegramGateway {
    async fn send_text(
        &self,
        dest: Destination,
        text: &str,
        reply_to: Option<MessageId>,
        buttons: &[Vec<Button>],
    ) -> Result<MessageId, GatewayError> {
        let mut req = self.bot.send_message(self.chat_for(dest), text);
        if let Destination::Topic(topic) = dest {
            req = req.message_thread_id(thread(topic));
        }
        if let Some(reply) = reply_to {
            req = req.reply_parameters(reply_params(reply));
        }
        if let Some(markup) = keyboard(buttons) {
            req = req.reply_markup(markup);
        }
        let sent = req.await.map_err(map_request_error)?;
        Ok(MessageId(sent.id.0))
    }

    async fn edit_text(
        &self,
        dest: Destination,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), GatewayError> {
        let result = self
            .bot
            .edit_message_text(self.chat_for(dest), TgMessageId(message_id.0), text)
            .await;
        match result {
            Ok(_) => Ok(()),
            // Repeating the same text is not an error worth surfacing.
            Err(e) if e.to_string().contains("message is not modified") => Ok(()),
            Err(e) => Err(map_request_error(e)),
        }
    }

    async fn set_buttons(
        &self,
        dest: Destination,
        message_id: MessageId,
        buttons: &[Vec<Button>],
    ) -> Result<(), GatewayError> {
        let mut req = self
            .bot
            .edit_message_reply_markup(self.chat_for(dest), TgMessageId(message_id.0));
        if let Some(markup) = keyboard(buttons) {
            req = req.reply_markup(markup);
        }
        req.await.map_err(map_request_error)?;
        Ok(())
    }

    async fn delete_message(
        &self,
        dest: Destination,
        message_id: MessageId,
    ) -> Result<(), GatewayError> {
        self.bot
            .delete_message(self.chat_for(dest), TgMessageId(message_id.0))
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn copy_message(
        &self,
        from: Destination,
        message_id: MessageId,
        to: Destination,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, GatewayError> {
        let mut req = self.bot.copy_message(
            self.chat_for(to),
            self.chat_for(from),
            TgMessageId(message_id.0),
        );
        if let Destination::Topic(topic) = to {
            req = req.message_thread_id(thread(topic));
        }
        if let Some(reply) = reply_to {
            req = req.reply_parameters(reply_params(reply));
        }
        let copied = req.await.map_err(map_request_error)?;
        Ok(MessageId(copied.0))
    }

    async fn send_media_group(
        &self,
        dest: Destination,
        items: &[MediaItem],
        reply_to: Option<MessageId>,
    ) -> Result<Vec<MessageId>, GatewayError> {
        let media: Vec<InputMedia> = items.iter().map(input_media).collect();
        let mut req = self.bot.send_media_group(self.chat_for(dest), media);
        if let Destination::Topic(topic) = dest {
            req = req.message_thread_id(thread(topic));
        }
        if let Some(reply) = reply_to {
            req = req.reply_parameters(reply_params(reply));
        }
        let sent = req.await.map_err(map_request_error)?;
        Ok(sent.into_iter().map(|m| MessageId(m.id.0)).collect())
    }

    async fn create_topic(&self, title: &str) -> Result<TopicId, GatewayError> {
        let topic = self
            .bot
            .create_forum_topic(self.support_chat, title)
            .await
            .map_err(map_request_error)?;
        Ok(TopicId(topic.thread_id.0.0))
    }

    async fn rename_topic(&self, topic: TopicId, title: &str) -> Result<(), GatewayError> {
        self.bot
            .edit_forum_topic(self.support_chat, thread(topic))
            .name(title)
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn close_topic(&self, topic: TopicId) -> Result<(), GatewayError> {
        self.bot
            .close_forum_topic(self.support_chat, thread(topic))
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn reopen_topic(&self, topic: TopicId) -> Result<(), GatewayError> {
        self.bot
            .reopen_forum_topic(self.support_chat, thread(topic))
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn pin_topic_message(&self, message_id: MessageId) -> Result<(), GatewayError> {
        self.bot
            .pin_chat_message(self.support_chat, TgMessageId(message_id.0))
            .disable_notification(true)
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn ack_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), GatewayError> {
        let mut req = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_owned()));
        if let Some(text) = text {
            req = req.text(text);
        }
        if show_alert {
            req = req.show_alert(true);
        }
        req.await.map_err(map_request_error)?;
        Ok(())
    }
}
