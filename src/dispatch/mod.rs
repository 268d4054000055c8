//! Transport-agnostic dispatch front.
//!
//! [`Shop`] receives "user X sent text T" and "user X pressed button D" and
//! answers with plain data ([`Reply`], [`CallbackResponse`]). The Telegram
//! adapter only translates updates in and replies out, so the whole chat
//! behaviour can be driven from tests.

pub mod broadcast;
pub mod callbacks;
pub mod commands;
pub mod menus;
pub mod screens;

use dashmap::DashMap;
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::core::error::GENERIC_FAILURE_REPLY;
use crate::core::throttle::SendThrottle;
use crate::core::{AppError, AppResult};
use crate::flows::{self, FlowContext, FlowEffect, FlowOutcome, Notice, Recipient};
use crate::notify::{send_best_effort, Notifier};
use crate::storage::{catalog, get_connection, pending, settings, users, DbPool};

pub use callbacks::CallbackResponse;
pub use commands::Command;
pub use menus::{Button, ButtonKind, Keyboard, MenuAction};

/// Identity of whoever sent an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl Sender {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            username: None,
            first_name: None,
        }
    }
}

/// A message to send back, optionally with an inline keyboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

pub const BANNED_REPLY: &str = "🚫 You are banned from using this bot.";
pub const CANCELLED_REPLY: &str = "✅ Cancelled.";
pub const FALLBACK_REPLY: &str = "Use the buttons to navigate or send /help.";
pub const UNKNOWN_COMMAND_REPLY: &str = "❓ Unknown command. Send /help for the list.";

/// What a synchronous routing step produced.
enum Step {
    Reply(Reply),
    /// A flow committed; its notices and effects still have to be delivered
    Flow(FlowOutcome),
}

/// Dependencies of the dispatch front
pub struct ShopConfig {
    pub operator_id: Option<i64>,
    pub currency: String,
    /// Used to accept `/command@bot_username`
    pub bot_username: String,
    pub broadcast_interval: Duration,
}

/// The storefront: routes chat events to commands, flows and menus.
pub struct Shop {
    pool: DbPool,
    ctx: FlowContext,
    bot_username: String,
    notifier: Arc<dyn Notifier>,
    throttle: SendThrottle,
    /// One lock per user; an event holds it while it is processed
    user_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl Shop {
    pub fn new(pool: DbPool, notifier: Arc<dyn Notifier>, config: ShopConfig) -> Self {
        Self {
            pool,
            ctx: FlowContext {
                operator_id: config.operator_id,
                currency: config.currency,
            },
            bot_username: config.bot_username,
            notifier,
            throttle: SendThrottle::new(config.broadcast_interval),
            user_locks: DashMap::new(),
        }
    }

    pub fn is_operator(&self, user_id: i64) -> bool {
        self.ctx.is_operator(user_id)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn user_lock(&self, user_id: i64) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the user's entry once nobody else holds or waits for it.
    fn release_lock(&self, user_id: i64, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.user_locks.remove_if(&user_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Handles a free-text message (command, pending-flow input or chatter).
    ///
    /// Never fails: any error becomes a reply, unexpected ones are logged.
    pub async fn handle_text(&self, sender: &Sender, text: &str) -> Reply {
        let lock = self.user_lock(sender.id);
        let reply = {
            let _guard = lock.lock().await;
            match self.process_text(sender, text).await {
                Ok(reply) => reply,
                Err(e) => Reply::text(self.describe_error(sender.id, &e)),
            }
        };
        self.release_lock(sender.id, lock);
        reply
    }

    /// Handles an inline button press.
    pub async fn handle_callback(&self, sender: &Sender, data: &str) -> CallbackResponse {
        let lock = self.user_lock(sender.id);
        let response = {
            let _guard = lock.lock().await;
            match self.process_callback(sender, data).await {
                Ok(response) => response,
                Err(e) => CallbackResponse::toast(self.describe_error(sender.id, &e)),
            }
        };
        self.release_lock(sender.id, lock);
        response
    }

    /// Logs an error at a level matching its kind and renders it.
    fn describe_error(&self, user_id: i64, err: &AppError) -> String {
        if err.is_expected() {
            log::info!("Rejected input from user {}: {}", user_id, err);
        } else {
            log::error!("❌ Failed to handle update from user {}: {}", user_id, err);
        }
        err.user_message()
    }

    /// Records the contact and tells whether the sender may use the bot.
    fn admit(&self, conn: &Connection, sender: &Sender) -> AppResult<bool> {
        users::ensure_user(conn, sender.id, sender.username.as_deref(), sender.first_name.as_deref())?;
        if self.is_operator(sender.id) {
            return Ok(true);
        }
        Ok(!users::is_banned(conn, sender.id)?)
    }

    async fn process_text(&self, sender: &Sender, text: &str) -> AppResult<Reply> {
        // The connection is released before anything is sent
        let step = {
            let mut conn = get_connection(&self.pool)?;
            self.route_text(&mut conn, sender, text)?
        };
        match step {
            Step::Reply(reply) => Ok(reply),
            Step::Flow(outcome) => Ok(self.complete(outcome).await),
        }
    }

    /// Command first, then the pending flow, then the default menu.
    fn route_text(&self, conn: &mut Connection, sender: &Sender, text: &str) -> AppResult<Step> {
        if !self.admit(conn, sender)? {
            log::info!("Ignoring message from banned user {}", sender.id);
            return Ok(Step::Reply(Reply::text(BANNED_REPLY)));
        }

        if text.trim_start().starts_with('/') {
            return match Command::from_text(text, &self.bot_username) {
                Some(command) => self.run_command(conn, sender, command),
                None => Ok(Step::Reply(Reply::text(UNKNOWN_COMMAND_REPLY))),
            };
        }

        let action = match pending::get_pending(conn, sender.id) {
            Ok(action) => action,
            Err(AppError::StalePending(raw)) => {
                log::warn!("Clearing stale pending action of user {}: {}", sender.id, raw);
                pending::clear_pending(conn, sender.id)?;
                return Ok(Step::Reply(Reply::text(GENERIC_FAILURE_REPLY)));
            }
            Err(e) => return Err(e),
        };

        match action {
            Some(action) => {
                let result = flows::submit(conn, &self.ctx, sender.id, &action, text);
                // One attempt per flow: the user restarts it from the menu
                pending::clear_pending(conn, sender.id)?;
                result.map(Step::Flow)
            }
            None => self.main_menu(conn, sender, false).map(Step::Reply),
        }
    }

    /// Delivers side effects of a finished flow and builds the reply.
    async fn complete(&self, outcome: FlowOutcome) -> Reply {
        self.deliver(&outcome.notices).await;
        if let Some(FlowEffect::Broadcast(text)) = outcome.effect {
            // The tally reaches the operator as a message
            drop(broadcast::spawn_broadcast(
                self.pool.clone(),
                Arc::clone(&self.notifier),
                self.throttle.clone(),
                self.ctx.operator_id,
                text,
            ));
        }

        Reply::with_keyboard(outcome.reply, menus::back_keyboard())
    }

    /// Sends notices one by one; failures are logged and dropped.
    async fn deliver(&self, notices: &[Notice]) {
        for notice in notices {
            let recipient = match notice.recipient {
                Recipient::User(id) => id,
                Recipient::Operator => match self.ctx.operator_id {
                    Some(id) => id,
                    None => {
                        log::warn!("No operator configured, dropping notice: {}", notice.text);
                        continue;
                    }
                },
            };
            send_best_effort(self.notifier.as_ref(), recipient, &notice.text).await;
        }
    }

    /// Welcome screen: operator panel for the operator, store menu for everyone else.
    fn main_menu(&self, conn: &Connection, sender: &Sender, with_welcome: bool) -> AppResult<Reply> {
        if self.is_operator(sender.id) {
            let text = if with_welcome {
                let welcome = settings::welcome_message(conn)?;
                format!(
                    "Hello operator 👋\n\n{}",
                    menus::render_welcome(&welcome, sender.first_name.as_deref())
                )
            } else {
                "🛠 Operator panel:".to_string()
            };
            return Ok(Reply::with_keyboard(text, menus::admin_main_keyboard()));
        }

        let text = if with_welcome {
            menus::render_welcome(&settings::welcome_message(conn)?, sender.first_name.as_deref())
        } else {
            FALLBACK_REPLY.to_string()
        };
        let buttons = catalog::buttons_for(conn, catalog::ParentKind::Global, 0)?;
        Ok(Reply::with_keyboard(text, menus::user_main_keyboard(&buttons)))
    }
}
