//! [`Notifier`] backed by the Bot API

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::{ApiError, RequestError};

use crate::notify::{DeliveryError, Notifier};

/// Sends plain-text messages to a user's private chat.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Maps a Bot API failure; chats that can no longer be reached are told apart.
pub fn delivery_error(recipient: i64, err: RequestError) -> DeliveryError {
    match err {
        RequestError::Api(
            ApiError::BotBlocked | ApiError::UserDeactivated | ApiError::ChatNotFound | ApiError::BotKicked,
        ) => DeliveryError::Unreachable(recipient),
        other => DeliveryError::Transport(other.to_string()),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, recipient: i64, text: &str) -> Result<(), DeliveryError> {
        self.bot
            .send_message(ChatId(recipient), text)
            .await
            .map(|_| ())
            .map_err(|e| delivery_error(recipient, e))
    }
}
