//! Cash-to-credit deposits: user submission, operator review, rate settings

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::core::money::{credits_for, format_cash, format_decimal};
use crate::core::{AppError, AppResult};
use crate::flows::parse::{invalid, parse_cash_amount, parse_id, parse_positive_amount, usage};
use crate::flows::{audit, FlowContext, FlowOutcome, Recipient};
use crate::storage::ledger::{self, RejectOutcome};
use crate::storage::settings;

/// A bare cash amount from a user. Below the minimum nothing is stored.
pub fn submit_deposit(conn: &mut Connection, ctx: &FlowContext, user_id: i64, text: &str) -> AppResult<FlowOutcome> {
    let cash = parse_cash_amount(text, usage::DEPOSIT)?;
    let rate = settings::exchange_rate(conn)?;
    let min_credits = settings::min_deposit(conn)?;

    let credits = credits_for(cash, rate).ok_or_else(|| AppError::Validation(usage::DEPOSIT.to_string()))?;
    // Zero credits is refused even when the stored minimum is 0
    let min_credits = min_credits.max(1);
    if credits < min_credits {
        let message = match rate.checked_mul(Decimal::from(min_credits)) {
            Some(min_cash) => format!(
                "The minimum deposit is {} credit(s) ({}).",
                min_credits,
                format_cash(min_cash, &ctx.currency)
            ),
            None => format!("The minimum deposit is {} credit(s).", min_credits),
        };
        return Err(AppError::Validation(message));
    }

    let deposit = ledger::create_deposit(conn, user_id, cash, credits)?;
    log::info!(
        "Deposit request #{} from user {}: {} for {} credits",
        deposit.id,
        user_id,
        cash,
        credits
    );

    let cash_text = format_cash(deposit.cash_amount, &ctx.currency);
    Ok(FlowOutcome::reply(format!(
        "✅ Deposit request #{} registered: {} credits for {}. The operator will verify it.",
        deposit.id, credits, cash_text
    ))
    .notify(
        Recipient::Operator,
        format!(
            "📥 New deposit request #{}\nUser: {}\n{} credits for {}\nConfirm: /confirm_deposit {}\nReject: /reject_deposit {}",
            deposit.id, user_id, credits, cash_text, deposit.id, deposit.id
        ),
    ))
}

/// `/confirm_deposit <id>`
pub fn confirm(conn: &mut Connection, ctx: &FlowContext, user_id: i64, arg: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let id = parse_id(arg, usage::CONFIRM_DEPOSIT)?;

    let deposit = ledger::confirm_deposit(conn, id)?;
    audit(conn, user_id, &format!("confirm_deposit {}", id));

    Ok(FlowOutcome::reply(format!(
        "✅ Deposit #{} confirmed: {} credits added to user {}.",
        id, deposit.credits, deposit.user_id
    ))
    .notify(
        Recipient::User(deposit.user_id),
        format!(
            "✅ Your deposit #{} is confirmed. {} credits were added to your balance.",
            id, deposit.credits
        ),
    ))
}

/// `/reject_deposit <id>`; only a pending request can be rejected.
pub fn reject(conn: &mut Connection, ctx: &FlowContext, user_id: i64, arg: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let id = parse_id(arg, usage::REJECT_DEPOSIT)?;

    match ledger::reject_deposit(conn, id)? {
        RejectOutcome::Rejected(deposit) => {
            audit(conn, user_id, &format!("reject_deposit {}", id));
            Ok(FlowOutcome::reply(format!("✅ Deposit #{} rejected.", id)).notify(
                Recipient::User(deposit.user_id),
                format!("❌ Your deposit request #{} was rejected.", id),
            ))
        }
        RejectOutcome::NotPending(deposit) => Ok(FlowOutcome::reply(format!(
            "ℹ️ Deposit #{} is already {}; nothing changed.",
            id, deposit.status
        ))),
    }
}

/// `/setrate <cash per credit>`
pub fn set_rate(conn: &mut Connection, ctx: &FlowContext, user_id: i64, arg: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let rate = parse_positive_amount(arg, usage::SET_RATE)?;
    settings::set_exchange_rate(conn, rate)?;
    audit(conn, user_id, &format!("setrate {}", format_decimal(rate)));
    Ok(FlowOutcome::reply(format!(
        "✅ Exchange rate set: 1 credit = {}",
        format_cash(rate, &ctx.currency)
    )))
}

/// `/setmin <credits>`
pub fn set_min(conn: &mut Connection, ctx: &FlowContext, user_id: i64, arg: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let credits = match arg.trim().parse::<i64>() {
        Ok(value) if value >= 1 => value,
        _ => return invalid(usage::SET_MIN),
    };
    settings::set_min_deposit(conn, credits)?;
    audit(conn, user_id, &format!("setmin {}", credits));
    Ok(FlowOutcome::reply(format!("✅ Minimum deposit set to {} credit(s).", credits)))
}
