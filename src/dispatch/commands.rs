use indoc::indoc;
use rusqlite::Connection;
use teloxide::utils::command::BotCommands;

use super::{menus, screens, Reply, Sender, Shop, Step, CANCELLED_REPLY};
use crate::core::config::messages::{AUDIT_LIST_LIMIT, DEPOSIT_LIST_LIMIT};
use crate::core::money::format_credits;
use crate::core::AppResult;
use crate::flows::parse::{invalid, usage};
use crate::flows::{catalog as catalog_flows, deposit};
use crate::storage::ledger::{self, DepositFilter};
use crate::storage::{audit, pending, users};

/// Bot commands enum with descriptions
///
/// Commands with an argument receive the rest of the message verbatim (possibly
/// empty); the flow behind each command validates it.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    #[command(description = "open the store")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
    #[command(description = "operator panel")]
    Admin,
    #[command(description = "abort the current step")]
    Cancel,
    #[command(description = "show your balance")]
    Balance,
    #[command(description = "list your orders")]
    Orders,
    #[command(description = "confirm a deposit (operator)")]
    ConfirmDeposit(String),
    #[command(description = "reject a deposit (operator)")]
    RejectDeposit(String),
    #[command(description = "list deposits: pending or all (operator)")]
    Deposits(String),
    #[command(description = "list users (operator)")]
    Users,
    #[command(description = "set cash per credit (operator)")]
    Setrate(String),
    #[command(description = "set the minimum deposit in credits (operator)")]
    Setmin(String),
    #[command(description = "add a category (operator)", aliases = ["addcategory"])]
    Addcat(String),
    #[command(description = "add a product (operator)", aliases = ["addproduct"])]
    Addprod(String),
    #[command(description = "store statistics (operator)")]
    Stats,
    #[command(description = "recent operator actions (operator)")]
    Audit,
}

impl Command {
    /// Parses a message; `None` when it is not one of our commands.
    pub fn from_text(text: &str, bot_username: &str) -> Option<Self> {
        Self::parse(text.trim(), bot_username).ok()
    }

    pub fn requires_operator(&self) -> bool {
        !matches!(
            self,
            Command::Start | Command::Help | Command::Cancel | Command::Balance | Command::Orders
        )
    }
}

impl Shop {
    pub(super) fn run_command(&self, conn: &mut Connection, sender: &Sender, command: Command) -> AppResult<Step> {
        log::debug!("Command {:?} from user {}", command, sender.id);
        if command.requires_operator() {
            self.ctx.require_operator(sender.id)?;
        }

        let reply = match command {
            Command::Start => self.main_menu(conn, sender, true)?,
            Command::Help => {
                let mut text = USER_HELP.to_string();
                if self.is_operator(sender.id) {
                    text.push('\n');
                    text.push_str(OPERATOR_HELP);
                }
                Reply::with_keyboard(text, menus::back_keyboard())
            }
            Command::Admin => self.main_menu(conn, sender, false)?,
            Command::Cancel => {
                pending::clear_pending(conn, sender.id)?;
                Reply::with_keyboard(CANCELLED_REPLY, menus::back_keyboard())
            }
            Command::Balance => {
                let balance = ledger::balance_of(conn, sender.id)?;
                Reply::with_keyboard(
                    format!("💰 Your balance: {}", format_credits(balance)),
                    menus::balance_keyboard(),
                )
            }
            Command::Orders => {
                let orders = ledger::list_orders_for_user(conn, sender.id)?;
                Reply::with_keyboard(screens::orders_text(&orders), menus::back_keyboard())
            }
            Command::ConfirmDeposit(arg) => return deposit::confirm(conn, &self.ctx, sender.id, &arg).map(Step::Flow),
            Command::RejectDeposit(arg) => return deposit::reject(conn, &self.ctx, sender.id, &arg).map(Step::Flow),
            Command::Setrate(arg) => return deposit::set_rate(conn, &self.ctx, sender.id, &arg).map(Step::Flow),
            Command::Setmin(arg) => return deposit::set_min(conn, &self.ctx, sender.id, &arg).map(Step::Flow),
            Command::Deposits(arg) => {
                let filter = match arg.trim().to_lowercase().as_str() {
                    "" | "pending" => DepositFilter::Pending,
                    "all" => DepositFilter::All,
                    _ => return invalid(usage::DEPOSITS),
                };
                let deposits = ledger::list_deposits(conn, filter, DEPOSIT_LIST_LIMIT)?;
                Reply::text(screens::deposits_text(&deposits, &self.ctx.currency))
            }
            Command::Users => Reply::text(screens::users_text(&users::list_users(conn)?)),
            Command::Addcat(arg) => {
                if arg.trim().is_empty() {
                    return invalid(usage::ADD_CATEGORY);
                }
                return catalog_flows::new_category(conn, &self.ctx, sender.id, &arg).map(Step::Flow);
            }
            Command::Addprod(arg) => {
                if arg.trim().is_empty() {
                    return invalid(usage::ADD_PRODUCT);
                }
                return catalog_flows::new_product(conn, &self.ctx, sender.id, &arg).map(Step::Flow);
            }
            Command::Stats => Reply::with_keyboard(
                screens::stats_text(&ledger::ledger_totals(conn)?),
                menus::back_keyboard(),
            ),
            Command::Audit => Reply::text(screens::audit_text(&audit::recent(conn, AUDIT_LIST_LIMIT)?)),
        };
        Ok(Step::Reply(reply))
    }
}

/// Commands shown in the Telegram command menu (user-facing only)
pub const PUBLIC_COMMANDS: &[(&str, &str)] = &[
    ("start", "open the store"),
    ("help", "how to use the bot"),
    ("balance", "show your balance"),
    ("orders", "list your orders"),
    ("cancel", "abort the current step"),
];

pub const USER_HELP: &str = indoc! {"
    📌 How to use the store:
    • Press 🛒 Categories to browse products.
    • Press 💰 My balance to see your credits.
    • To top up, press ➕ Deposit and send the cash amount, or contact the operator.
    • /orders lists your purchases, /cancel aborts the current step.
"};

pub const OPERATOR_HELP: &str = indoc! {"
    🛠 Operator commands:
    /admin - operator panel
    /confirm_deposit <id> - credit a pending deposit
    /reject_deposit <id> - reject a pending deposit
    /deposits [pending|all] - list deposit requests
    /users - list users
    /setrate <cash per credit> - set the exchange rate
    /setmin <credits> - set the minimum deposit
    /addcat <name> - add a category
    /addprod categoryId|name|price|description - add a product
    /stats - store statistics
    /audit - recent operator actions
"};
