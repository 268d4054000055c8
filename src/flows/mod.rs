//! Multi-step chat flows.
//!
//! A flow starts when a menu button stores a [`PendingAction`] for the user;
//! the user's next text message is handed to [`submit`] together with that
//! action. Every handler validates its whole input before touching the store,
//! so a rejected message changes nothing.

pub mod balance;
pub mod catalog;
pub mod deposit;
pub mod moderation;
pub mod parse;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::core::{AppError, AppResult};
use crate::storage::audit;

/// Sign of an operator balance adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustDirection {
    Add,
    Deduct,
}

/// What the user's next text message means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PendingAction {
    NewCategory,
    EditCategory,
    NewProduct,
    EditProduct,
    DeleteItem,
    Reorder,
    NewButton,
    BalanceAdjust { direction: AdjustDirection },
    ShowBalance,
    BanToggle,
    /// The only flow open to regular users
    Deposit,
    WelcomeEdit,
    Broadcast,
}

impl PendingAction {
    pub fn requires_operator(&self) -> bool {
        !matches!(self, PendingAction::Deposit)
    }

    /// Instruction sent when the flow starts.
    pub fn prompt(&self, currency: &str) -> String {
        let text = match self {
            PendingAction::NewCategory => "📂 Send the name of the new category.",
            PendingAction::EditCategory => "✏️ Send: categoryId | new name",
            PendingAction::NewProduct => "🧾 Send: categoryId | name | price | description (optional)",
            PendingAction::EditProduct => {
                "✏️ Send: productId | name | price | description\nLeave a field empty to keep it."
            }
            PendingAction::DeleteItem => "🗑 Send: category <id> or product <id>",
            PendingAction::Reorder => "↕️ Send: category <id> <position> or product <id> <position>",
            PendingAction::NewButton => {
                "🔘 Send: parentType | parentId | label | action | payload\n\
                 parentType: category, product or global\n\
                 action: open_url (payload = link) or buy (payload = product id)"
            }
            PendingAction::BalanceAdjust {
                direction: AdjustDirection::Add,
            } => "➕ Send: userId | amount",
            PendingAction::BalanceAdjust {
                direction: AdjustDirection::Deduct,
            } => "➖ Send: userId | amount",
            PendingAction::ShowBalance => "🔍 Send the user id.",
            PendingAction::BanToggle => "🚫 Send: ban <id> or unban <id>",
            PendingAction::Deposit => {
                return format!(
                    "💵 Send the amount in {} now (example: 5000). Send /cancel to abort.",
                    currency
                )
            }
            PendingAction::WelcomeEdit => {
                "✍️ Send the new welcome message. {user} is replaced by the reader's first name."
            }
            PendingAction::Broadcast => "📢 Send the message to broadcast. Send /cancel to abort.",
        };
        text.to_string()
    }
}

/// Who a side notification goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Operator,
    User(i64),
}

/// Best-effort message delivered after the flow's changes are committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub recipient: Recipient,
    pub text: String,
}

/// Work the dispatch front starts on behalf of a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEffect {
    Broadcast(String),
}

/// Result of a completed flow step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOutcome {
    /// Reply to the person who sent the input
    pub reply: String,
    pub notices: Vec<Notice>,
    pub effect: Option<FlowEffect>,
}

impl FlowOutcome {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: text.into(),
            notices: Vec::new(),
            effect: None,
        }
    }

    pub fn notify(mut self, recipient: Recipient, text: impl Into<String>) -> Self {
        self.notices.push(Notice {
            recipient,
            text: text.into(),
        });
        self
    }

    pub fn with_effect(mut self, effect: FlowEffect) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// Process-wide facts every flow needs.
#[derive(Debug, Clone)]
pub struct FlowContext {
    /// `None` when no operator is configured; then every operator path is refused
    pub operator_id: Option<i64>,
    pub currency: String,
}

impl FlowContext {
    pub fn is_operator(&self, user_id: i64) -> bool {
        self.operator_id == Some(user_id)
    }

    pub fn require_operator(&self, user_id: i64) -> AppResult<()> {
        if self.is_operator(user_id) {
            Ok(())
        } else {
            log::warn!("User {} tried an operator-only action", user_id);
            Err(AppError::Unauthorized)
        }
    }
}

/// Appends to the operator audit log. A failed write is logged, never raised:
/// the mutation it describes has already been committed.
pub(crate) fn audit(conn: &Connection, operator_id: i64, action: &str) {
    if let Err(e) = audit::record(conn, operator_id, action) {
        log::warn!("Failed to write audit entry {:?}: {}", action, e);
    }
}

/// Runs the flow behind `action` on the user's text.
pub fn submit(
    conn: &mut Connection,
    ctx: &FlowContext,
    user_id: i64,
    action: &PendingAction,
    text: &str,
) -> AppResult<FlowOutcome> {
    if action.requires_operator() {
        ctx.require_operator(user_id)?;
    }

    match action {
        PendingAction::NewCategory => catalog::new_category(conn, ctx, user_id, text),
        PendingAction::EditCategory => catalog::edit_category(conn, ctx, user_id, text),
        PendingAction::NewProduct => catalog::new_product(conn, ctx, user_id, text),
        PendingAction::EditProduct => catalog::edit_product(conn, ctx, user_id, text),
        PendingAction::DeleteItem => catalog::delete_item(conn, ctx, user_id, text),
        PendingAction::Reorder => catalog::reorder(conn, ctx, user_id, text),
        PendingAction::NewButton => catalog::new_button(conn, ctx, user_id, text),
        PendingAction::BalanceAdjust { direction } => balance::adjust(conn, ctx, user_id, *direction, text),
        PendingAction::ShowBalance => balance::show_balance(conn, ctx, user_id, text),
        PendingAction::BanToggle => moderation::ban_toggle(conn, ctx, user_id, text),
        PendingAction::Deposit => deposit::submit_deposit(conn, ctx, user_id, text),
        PendingAction::WelcomeEdit => moderation::edit_welcome(conn, ctx, user_id, text),
        PendingAction::Broadcast => moderation::broadcast(conn, ctx, user_id, text),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::FlowContext;

    pub const OPERATOR: i64 = 1000;
    pub const CUSTOMER: i64 = 2000;

    pub fn ctx() -> FlowContext {
        FlowContext {
            operator_id: Some(OPERATOR),
            currency: "SYP".to_string(),
        }
    }
}
