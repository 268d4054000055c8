//! Telegram bot handler tree configuration
//!
//! Updates are translated into [`Shop`] calls and the resulting replies back
//! into Bot API requests. Only private chats are served.

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Message, User};

use crate::dispatch::{Reply, Sender, Shop};
use crate::telegram::keyboards::to_markup;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub shop: Arc<Shop>,
}

impl HandlerDeps {
    pub fn new(shop: Arc<Shop>) -> Self {
        Self { shop }
    }
}

/// Telegram user ids fit i64; anything else is not a real account.
pub fn sender_from(user: &User) -> Option<Sender> {
    let id = i64::try_from(user.id.0).ok()?;
    Some(Sender {
        id,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
    })
}

/// Creates the dispatcher schema for the bot.
///
/// The same schema is used in production and can be used in integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callback))
}

async fn send_reply(bot: &Bot, chat_id: ChatId, reply: Reply) -> Result<(), teloxide::RequestError> {
    let request = bot.send_message(chat_id, reply.text);
    match reply.keyboard {
        Some(keyboard) => request.reply_markup(to_markup(&keyboard)).await?,
        None => request.await?,
    };
    Ok(())
}

/// Handler for text messages in private chats
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private() && msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let (Some(text), Some(sender)) = (msg.text(), msg.from.as_ref().and_then(sender_from)) else {
                    return Ok(());
                };

                let reply = deps.shop.handle_text(&sender, text).await;
                if let Err(e) = send_reply(&bot, msg.chat.id, reply).await {
                    log::error!("Failed to send reply to {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}

/// Handler for inline keyboard presses
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            let Some(sender) = sender_from(&q.from) else {
                return Ok(());
            };
            let data = q.data.clone().unwrap_or_default();
            let response = deps.shop.handle_callback(&sender, &data).await;

            // Telegram keeps the button spinner until the query is answered
            let mut answer = bot.answer_callback_query(q.id.clone());
            if let Some(toast) = response.toast {
                answer = answer.text(toast);
            }
            if let Err(e) = answer.await {
                log::warn!("Failed to answer callback query: {}", e);
            }

            let chat_id = ChatId(sender.id);
            if let Some(edit) = response.edit {
                match &q.message {
                    Some(message) => {
                        let mut request = bot.edit_message_text(message.chat().id, message.id(), edit.text.clone());
                        if let Some(keyboard) = &edit.keyboard {
                            request = request.reply_markup(to_markup(keyboard));
                        }
                        if let Err(e) = request.await {
                            // Too old to edit or unchanged: post it instead
                            log::debug!("Edit failed, sending a new message: {}", e);
                            if let Err(e) = send_reply(&bot, chat_id, edit).await {
                                log::error!("Failed to send menu to {}: {}", chat_id, e);
                            }
                        }
                    }
                    None => {
                        if let Err(e) = send_reply(&bot, chat_id, edit).await {
                            log::error!("Failed to send menu to {}: {}", chat_id, e);
                        }
                    }
                }
            }
            if let Some(reply) = response.send {
                if let Err(e) = send_reply(&bot, chat_id, reply).await {
                    log::error!("Failed to send reply to {}: {}", chat_id, e);
                }
            }
            Ok(())
        }
    })
}
