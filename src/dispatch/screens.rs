//! Plain-text listings shown by commands and menu screens

use crate::core::config::messages::MAX_MESSAGE_LENGTH;
use crate::core::money::{format_cash, format_credits};
use crate::storage::audit::AuditEntry;
use crate::storage::catalog::CustomButton;
use crate::storage::ledger::{DepositRequest, LedgerTotals, Order};
use crate::storage::users::User;

/// Cuts `text` to at most `max` characters, marking the cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

pub fn orders_text(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "📦 You have no orders yet.".to_string();
    }
    let mut text = String::from("📦 Your orders:\n");
    for order in orders {
        let name = order
            .product_name
            .clone()
            .unwrap_or_else(|| format!("deleted product #{}", order.product_id));
        text.push_str(&format!(
            "\n#{} — {} — {} — {} ({})",
            order.id,
            name,
            format_credits(order.price),
            order.status,
            order.created_at.format("%Y-%m-%d %H:%M")
        ));
    }
    truncate(&text, MAX_MESSAGE_LENGTH)
}

pub fn users_text(users: &[User]) -> String {
    if users.is_empty() {
        return "👥 No users yet.".to_string();
    }
    let mut text = format!("👥 Users ({}):\n", users.len());
    for user in users {
        text.push_str(&format!(
            "\n{} — {} — {}{}",
            user.id,
            user.display_name(),
            format_credits(user.balance),
            if user.banned { " — 🚫 banned" } else { "" }
        ));
    }
    truncate(&text, MAX_MESSAGE_LENGTH)
}

pub fn deposits_text(deposits: &[DepositRequest], currency: &str) -> String {
    if deposits.is_empty() {
        return "💵 No deposit requests.".to_string();
    }
    let mut text = String::from("💵 Deposit requests:\n");
    for deposit in deposits {
        text.push_str(&format!(
            "\n#{} — user {} — {} → {} credits — {} ({})",
            deposit.id,
            deposit.user_id,
            format_cash(deposit.cash_amount, currency),
            deposit.credits,
            deposit.status,
            deposit.created_at.format("%Y-%m-%d %H:%M")
        ));
    }
    truncate(&text, MAX_MESSAGE_LENGTH)
}

pub fn stats_text(totals: &LedgerTotals) -> String {
    format!(
        "📊 Store statistics\n\n\
         Users: {} ({} banned)\n\
         Orders: {}\n\
         Revenue: {}\n\
         Balances held by users: {}\n\
         Pending deposits: {}\n\
         Credits sold through deposits: {}",
        totals.users,
        totals.banned_users,
        totals.orders,
        format_credits(totals.revenue),
        format_credits(totals.outstanding_balance),
        totals.pending_deposits,
        totals.confirmed_credits
    )
}

pub fn audit_text(entries: &[AuditEntry]) -> String {
    if entries.is_empty() {
        return "🧾 No operator actions recorded.".to_string();
    }
    let mut text = String::from("🧾 Recent operator actions:\n");
    for entry in entries {
        text.push_str(&format!(
            "\n{} — {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.action
        ));
    }
    truncate(&text, MAX_MESSAGE_LENGTH)
}

pub fn buttons_text(buttons: &[CustomButton]) -> String {
    if buttons.is_empty() {
        return "🔘 No custom buttons.".to_string();
    }
    let mut text = String::from("🔘 Custom buttons:\n");
    for button in buttons {
        text.push_str(&format!(
            "\n#{} — {} {} — \"{}\" — {} {}",
            button.id, button.parent_kind, button.parent_id, button.label, button.action, button.payload
        ));
    }
    truncate(&text, MAX_MESSAGE_LENGTH)
}
