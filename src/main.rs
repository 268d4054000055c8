use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::{Duration, Instant};
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use tokio::time::sleep;

use storebot::cli::{Cli, Commands};
use storebot::core::{config, init_logger, log_startup_configuration};
use storebot::dispatch::screens::stats_text;
use storebot::dispatch::{Shop, ShopConfig};
use storebot::storage::{create_pool, get_connection, ledger, DbPool};
use storebot::telegram::{create_bot, schema, setup_bot_commands, Bot, HandlerDeps, TelegramNotifier};

/// Main entry point for the store bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present (before the logger reads RUST_LOG)
    let _ = dotenv();

    init_logger()?;

    match cli.command {
        Some(Commands::Migrate) => run_migrate(),
        Some(Commands::Stats) => run_stats(),
        Some(Commands::Run) => run_bot().await,
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot().await
        }
    }
}

fn open_pool() -> Result<DbPool> {
    create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))
}

/// Applies migrations (done by the pool on open) and exits
fn run_migrate() -> Result<()> {
    open_pool()?;
    log::info!("✅ Database {} is up to date", config::DATABASE_PATH.as_str());
    Ok(())
}

fn run_stats() -> Result<()> {
    let pool = open_pool()?;
    let conn = get_connection(&pool)?;
    let totals = ledger::ledger_totals(&conn)?;
    println!("{}", stats_text(&totals));
    Ok(())
}

/// Fetches the bot's username, waiting for a Bot API that is still starting
async fn fetch_bot_username(bot: &Bot) -> Result<String> {
    const STARTUP_MAX_RETRIES: u32 = 12;

    let mut attempt = 0;
    loop {
        match bot.get_me().await {
            Ok(me) => return Ok(me.user.username.clone().unwrap_or_default()),
            Err(e) => {
                attempt += 1;
                if attempt >= STARTUP_MAX_RETRIES {
                    return Err(anyhow::anyhow!(
                        "Failed to connect to Bot API after {} retries: {}",
                        attempt,
                        e
                    ));
                }
                log::warn!(
                    "Bot API not ready (attempt {}/{}): {}. Retrying in 5 seconds...",
                    attempt,
                    STARTUP_MAX_RETRIES,
                    e
                );
                sleep(Duration::from_secs(5)).await;
            }
        }
    }
}

async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");
    log_startup_configuration();

    if config::admin::ADMIN_ID.is_none() {
        log::warn!("ADMIN_ID is not set: every operator action will be refused");
    }

    let bot = create_bot()?;
    let bot_username = fetch_bot_username(&bot).await?;
    log::info!("Bot username: @{}", bot_username);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let pool = open_pool()?;
    let shop = Arc::new(Shop::new(
        pool,
        Arc::new(TelegramNotifier::new(bot.clone())),
        ShopConfig {
            operator_id: *config::admin::ADMIN_ID,
            currency: config::CURRENCY.clone(),
            bot_username,
            broadcast_interval: config::broadcast::send_delay(),
        },
    ));
    let handler = schema(HandlerDeps::new(shop));

    log::info!("📡 Ready to receive updates (long polling)");

    let mut attempt: u32 = 0;

    // The dispatcher is restarted whatever ends it; only Ctrl-C stops the bot
    loop {
        let mut dispatcher = Dispatcher::builder(bot.clone(), handler.clone())
            .dependencies(DependencyMap::new())
            .build();
        let shutdown = dispatcher.shutdown_token();
        let listener = Polling::builder(bot.clone()).drop_pending_updates().build();
        let started = Instant::now();

        // A panic inside the dispatcher surfaces through the JoinHandle
        let mut handle = tokio::spawn(async move {
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        let finished = tokio::select! {
            outcome = &mut handle => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(outcome) = finished else {
            log::info!("Ctrl-C received, stopping the dispatcher");
            match shutdown.shutdown() {
                Ok(stopped) => stopped.await,
                Err(_) => handle.abort(),
            }
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    log::warn!("Dispatcher ended badly during shutdown: {}", e);
                }
            }
            break;
        };

        match outcome {
            Ok(()) => log::warn!("Dispatcher stopped on its own"),
            Err(join_err) if join_err.is_panic() => log::error!("Dispatcher panicked: {}", join_err),
            Err(join_err) => log::warn!("Dispatcher task was cancelled: {}", join_err),
        }

        attempt = config::retry::next_attempt(attempt, started.elapsed());
        let delay = config::retry::dispatcher_backoff(attempt);
        log::info!("Restarting dispatcher in {:?} (attempt {})...", delay, attempt);
        tokio::select! {
            _ = sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("Ctrl-C received while waiting to restart");
                break;
            }
        }
    }

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
