//! Bans, the welcome text and broadcasts

use rusqlite::Connection;

use crate::core::AppResult;
use crate::flows::parse::{invalid, parse_id, split_words, usage};
use crate::flows::{audit, FlowContext, FlowEffect, FlowOutcome, Recipient};
use crate::storage::{settings, users};

/// `ban <id>` or `unban <id>`. Repeating either is harmless.
pub fn ban_toggle(conn: &mut Connection, ctx: &FlowContext, user_id: i64, text: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let words = split_words(text);
    if words.len() != 2 {
        return invalid(usage::BAN_TOGGLE);
    }
    let target = parse_id(words[1], usage::BAN_TOGGLE)?;

    match words[0].to_lowercase().as_str() {
        "ban" => {
            users::set_banned(conn, target, true)?;
            audit(conn, user_id, &format!("ban {}", target));
            log::info!("🚫 User {} banned", target);
            Ok(FlowOutcome::reply(format!("✅ User {} is banned.", target))
                .notify(Recipient::User(target), "🚫 You have been banned from this bot."))
        }
        "unban" => {
            users::set_banned(conn, target, false)?;
            audit(conn, user_id, &format!("unban {}", target));
            log::info!("User {} unbanned", target);
            Ok(FlowOutcome::reply(format!("✅ User {} is no longer banned.", target)))
        }
        _ => invalid(usage::BAN_TOGGLE),
    }
}

/// Replaces the welcome text verbatim.
pub fn edit_welcome(conn: &mut Connection, ctx: &FlowContext, user_id: i64, text: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    if text.trim().is_empty() {
        return invalid("The welcome message cannot be empty.");
    }
    settings::set_welcome_message(conn, text)?;
    audit(conn, user_id, "update_welcome");
    Ok(FlowOutcome::reply("✅ Welcome message updated."))
}

/// Hands the text to the dispatch front, which fans it out in the background.
pub fn broadcast(conn: &mut Connection, ctx: &FlowContext, user_id: i64, text: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    if text.trim().is_empty() {
        return invalid("The broadcast message cannot be empty.");
    }
    audit(conn, user_id, "broadcast_started");
    Ok(
        FlowOutcome::reply("📣 Sending the broadcast... you will get a report when it is done.")
            .with_effect(FlowEffect::Broadcast(text.to_string())),
    )
}
