//! Bot instance creation and command menu registration

use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::types::BotCommand;

use crate::core::config;
use crate::dispatch::commands::PUBLIC_COMMANDS;

/// Creates a Bot instance from the configured token
///
/// # Returns
/// * `Ok(Bot)` - Bot instance ready for requests
/// * `Err(anyhow::Error)` - BOT_TOKEN/TELOXIDE_TOKEN missing or BOT_API_URL invalid
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = config::BOT_TOKEN
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("BOT_TOKEN (or TELOXIDE_TOKEN) is not set"))?;
    let bot = Bot::new(token.expose_secret());

    // Check if local Bot API server is configured
    let bot = match std::env::var("BOT_API_URL") {
        Ok(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            bot.set_api_url(url)
        }
        Err(_) => bot,
    };

    Ok(bot)
}

/// The command list shown in the Telegram UI (user-facing commands only)
pub fn public_commands() -> Vec<BotCommand> {
    PUBLIC_COMMANDS
        .iter()
        .map(|(command, description)| BotCommand::new(*command, *description))
        .collect()
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(public_commands()).await?;
    Ok(())
}
