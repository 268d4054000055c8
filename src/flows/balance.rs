//! Credit movements: operator adjustments, balance lookups and purchases

use rusqlite::Connection;

use crate::core::money::{format_credits, format_decimal};
use crate::core::{AppError, AppResult};
use crate::flows::parse::{invalid, parse_id, parse_positive_amount, split_fields, usage};
use crate::flows::{audit, AdjustDirection, FlowContext, FlowOutcome, Recipient};
use crate::storage::{ledger, users};

/// `userId | amount`; the amount is added or deducted depending on `direction`.
///
/// The target is told about the change after the balance has been written;
/// whether that message arrives has no effect on the ledger.
pub fn adjust(
    conn: &mut Connection,
    ctx: &FlowContext,
    user_id: i64,
    direction: AdjustDirection,
    text: &str,
) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let fields = split_fields(text);
    if fields.len() != 2 {
        return invalid(usage::BALANCE_ADJUST);
    }
    let target = parse_id(fields[0], usage::BALANCE_ADJUST)?;
    let amount = parse_positive_amount(fields[1], usage::BALANCE_ADJUST)?;

    let delta = match direction {
        AdjustDirection::Add => amount,
        AdjustDirection::Deduct => -amount,
    };
    let balance = ledger::adjust_balance(conn, target, delta)?;

    let (reply, notice, action) = match direction {
        AdjustDirection::Add => (
            format!("✅ Added {} to user {}.", format_credits(amount), target),
            format!("💰 {} were added to your balance.", format_credits(amount)),
            "add_balance",
        ),
        AdjustDirection::Deduct => (
            format!("✅ Deducted {} from user {}.", format_credits(amount), target),
            format!("⚠️ {} were deducted from your balance.", format_credits(amount)),
            "deduct_balance",
        ),
    };
    audit(conn, user_id, &format!("{} {} {}", action, target, format_decimal(amount)));

    Ok(FlowOutcome::reply(format!("{}\nNew balance: {}", reply, format_credits(balance)))
        .notify(Recipient::User(target), notice))
}

/// `userId`; reports balance and ban state.
pub fn show_balance(conn: &mut Connection, ctx: &FlowContext, user_id: i64, text: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let target = parse_id(text, usage::SHOW_BALANCE)?;
    let user = users::get_user(conn, target)?.ok_or_else(|| AppError::NotFound(format!("User {}", target)))?;

    Ok(FlowOutcome::reply(format!(
        "👤 {} ({})\nBalance: {}\nBanned: {}",
        user.display_name(),
        user.id,
        format_credits(user.balance),
        if user.banned { "yes" } else { "no" }
    )))
}

/// Buys a product for `user_id`; the operator hears about every new order.
pub fn buy(conn: &mut Connection, user_id: i64, product_id: i64) -> AppResult<FlowOutcome> {
    let receipt = ledger::purchase(conn, user_id, product_id)?;
    let buyer = users::get_user(conn, user_id)?
        .map(|user| user.display_name())
        .unwrap_or_else(|| user_id.to_string());

    Ok(FlowOutcome::reply(format!(
        "✅ Order #{} created for {}. {} were deducted from your balance.\nRemaining balance: {}",
        receipt.order.id,
        receipt.product.name,
        format_credits(receipt.product.price),
        format_credits(receipt.balance)
    ))
    .notify(
        Recipient::Operator,
        format!(
            "📥 New order #{} from {} — {} — {}",
            receipt.order.id,
            buyer,
            receipt.product.name,
            format_credits(receipt.product.price)
        ),
    ))
}
