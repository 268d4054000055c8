//! Inline button presses

use rusqlite::Connection;

use super::{menus, screens, Reply, Sender, Shop, BANNED_REPLY};
use crate::core::money::{format_cash, format_credits};
use crate::core::{AppError, AppResult};
use crate::dispatch::commands::{OPERATOR_HELP, USER_HELP};
use crate::dispatch::menus::MenuAction;
use crate::flows::{balance, FlowOutcome, PendingAction};
use crate::storage::catalog::{self, ParentKind};
use crate::storage::{get_connection, ledger, pending, settings, users};

pub const TOP_UP_HINT: &str = "To top up, press ➕ Deposit or contact the operator.";

/// How the transport should answer a button press.
///
/// `toast` is shown as the callback answer, `edit` replaces the message the
/// button belongs to and `send` posts a new message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackResponse {
    pub toast: Option<String>,
    pub edit: Option<Reply>,
    pub send: Option<Reply>,
}

impl CallbackResponse {
    pub fn toast(text: impl Into<String>) -> Self {
        Self {
            toast: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn edit(reply: Reply) -> Self {
        Self {
            edit: Some(reply),
            ..Default::default()
        }
    }

    pub fn send(reply: Reply) -> Self {
        Self {
            send: Some(reply),
            ..Default::default()
        }
    }
}

enum CallbackStep {
    Done(CallbackResponse),
    Purchase(FlowOutcome),
}

impl Shop {
    pub(super) async fn process_callback(&self, sender: &Sender, data: &str) -> AppResult<CallbackResponse> {
        let step = {
            let mut conn = get_connection(&self.pool)?;
            self.route_callback(&mut conn, sender, data)?
        };
        match step {
            CallbackStep::Done(response) => Ok(response),
            CallbackStep::Purchase(outcome) => {
                let reply = self.complete(outcome).await;
                Ok(CallbackResponse {
                    toast: Some("✅ Order placed".to_string()),
                    edit: None,
                    send: Some(reply),
                })
            }
        }
    }

    fn route_callback(&self, conn: &mut Connection, sender: &Sender, data: &str) -> AppResult<CallbackStep> {
        if !self.admit(conn, sender)? {
            log::info!("Ignoring button press from banned user {}", sender.id);
            return Ok(CallbackStep::Done(CallbackResponse::toast(BANNED_REPLY)));
        }

        let Some(action) = MenuAction::parse(data) else {
            log::warn!("Unknown callback data from user {}: {:?}", sender.id, data);
            return Ok(CallbackStep::Done(CallbackResponse::toast("This button is no longer available.")));
        };
        if action.requires_operator() {
            self.ctx.require_operator(sender.id)?;
        }

        let response = match action {
            MenuAction::BackMain => CallbackResponse::edit(self.main_menu(conn, sender, true)?),
            MenuAction::Sections => {
                let categories = catalog::list_categories(conn)?;
                if categories.is_empty() {
                    CallbackResponse::edit(Reply::with_keyboard(
                        "🛒 The store has no categories yet.",
                        menus::back_keyboard(),
                    ))
                } else {
                    CallbackResponse::edit(Reply::with_keyboard(
                        "🛒 Choose a category:",
                        menus::categories_keyboard(&categories),
                    ))
                }
            }
            MenuAction::Category(id) => {
                let category =
                    catalog::get_category(conn, id)?.ok_or_else(|| AppError::NotFound(format!("Category #{}", id)))?;
                let products = catalog::list_products(conn, id)?;
                let buttons = catalog::buttons_for(conn, ParentKind::Category, id)?;
                CallbackResponse::edit(Reply::with_keyboard(
                    format!("📂 {}", category.name),
                    menus::products_keyboard(&products, &buttons),
                ))
            }
            MenuAction::Product(id) => {
                let product =
                    catalog::get_product(conn, id)?.ok_or_else(|| AppError::NotFound(format!("Product #{}", id)))?;
                let buttons = catalog::buttons_for(conn, ParentKind::Product, id)?;
                CallbackResponse::edit(Reply::with_keyboard(
                    menus::product_text(&product),
                    menus::product_keyboard(&product, &buttons),
                ))
            }
            MenuAction::Buy(id) => match balance::buy(conn, sender.id, id) {
                Ok(outcome) => return Ok(CallbackStep::Purchase(outcome)),
                Err(e @ AppError::InsufficientFunds { .. }) => {
                    log::info!("Purchase of product {} by user {} refused: {}", id, sender.id, e);
                    let message = e.user_message();
                    CallbackResponse {
                        toast: Some(message.clone()),
                        edit: None,
                        send: Some(Reply::with_keyboard(
                            format!("{}\n\n{}", message, TOP_UP_HINT),
                            menus::balance_keyboard(),
                        )),
                    }
                }
                Err(e) => return Err(e),
            },
            MenuAction::Balance => {
                let balance = ledger::balance_of(conn, sender.id)?;
                CallbackResponse::edit(Reply::with_keyboard(
                    format!("💰 Your balance: {}", format_credits(balance)),
                    menus::balance_keyboard(),
                ))
            }
            MenuAction::Deposit => {
                pending::set_pending(conn, sender.id, &PendingAction::Deposit)?;
                let rate = settings::exchange_rate(conn)?;
                let min = settings::min_deposit(conn)?.max(1);
                CallbackResponse::send(Reply::text(format!(
                    "{}\nRate: 1 credit = {}. Minimum: {} credit(s).",
                    PendingAction::Deposit.prompt(&self.ctx.currency),
                    format_cash(rate, &self.ctx.currency),
                    min
                )))
            }
            MenuAction::Orders => {
                let orders = ledger::list_orders_for_user(conn, sender.id)?;
                CallbackResponse::edit(Reply::with_keyboard(screens::orders_text(&orders), menus::back_keyboard()))
            }
            MenuAction::Help => {
                let mut text = USER_HELP.to_string();
                if self.is_operator(sender.id) {
                    text.push('\n');
                    text.push_str(OPERATOR_HELP);
                }
                CallbackResponse::edit(Reply::with_keyboard(text, menus::back_keyboard()))
            }
            MenuAction::EmptyCategory => CallbackResponse::toast("This category has no products yet."),
            MenuAction::AdminStore => {
                CallbackResponse::edit(Reply::with_keyboard("🛠 Store management:", menus::admin_store_keyboard()))
            }
            MenuAction::AdminBalance => {
                CallbackResponse::edit(Reply::with_keyboard("💳 Balances:", menus::admin_balance_keyboard()))
            }
            MenuAction::AdminBans => {
                CallbackResponse::edit(Reply::with_keyboard("🚫 Bans:", menus::admin_bans_keyboard()))
            }
            MenuAction::AdminButtons => {
                CallbackResponse::edit(Reply::with_keyboard("🔘 Custom buttons:", menus::admin_buttons_keyboard()))
            }
            MenuAction::AdminStats => CallbackResponse::edit(Reply::with_keyboard(
                screens::stats_text(&ledger::ledger_totals(conn)?),
                menus::back_keyboard(),
            )),
            MenuAction::AdminListUsers => CallbackResponse::edit(Reply::with_keyboard(
                screens::users_text(&users::list_users(conn)?),
                menus::back_keyboard(),
            )),
            MenuAction::AdminListButtons => CallbackResponse::edit(Reply::with_keyboard(
                screens::buttons_text(&catalog::list_buttons(conn)?),
                menus::back_keyboard(),
            )),
            MenuAction::AdminFlow(flow) => {
                pending::set_pending(conn, sender.id, &flow)?;
                CallbackResponse::send(Reply::text(flow.prompt(&self.ctx.currency)))
            }
        };
        Ok(CallbackStep::Done(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ShopConfig;
    use crate::storage::create_pool;
    use crate::testing::RecordingNotifier;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::time::Duration;

    const OPERATOR: i64 = 1;
    const CUSTOMER: i64 = 2;

    fn shop() -> (Shop, RecordingNotifier, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("callbacks.sqlite");
        let pool = create_pool(path.to_str().unwrap()).unwrap();
        let notifier = RecordingNotifier::default();
        let shop = Shop::new(
            pool,
            Arc::new(notifier.clone()),
            ShopConfig {
                operator_id: Some(OPERATOR),
                currency: "SYP".to_string(),
                bot_username: "store_bot".to_string(),
                broadcast_interval: Duration::from_millis(1),
            },
        );
        (shop, notifier, dir)
    }

    #[tokio::test]
    async fn test_admin_screen_refused_for_customer() {
        let (shop, _, _dir) = shop();
        let response = shop.handle_callback(&Sender::new(CUSTOMER), "adm_store").await;
        assert_eq!(response.toast.as_deref(), Some("⛔ This action is for the operator only."));
        assert_eq!(response.edit, None);
    }

    #[tokio::test]
    async fn test_admin_flow_button_sets_pending() {
        let (shop, _, _dir) = shop();
        let response = shop.handle_callback(&Sender::new(OPERATOR), "adm_add_category").await;

        assert_eq!(
            response.send.unwrap().text,
            PendingAction::NewCategory.prompt("SYP")
        );
        let conn = get_connection(shop.pool()).unwrap();
        assert_eq!(pending::get_pending(&conn, OPERATOR).unwrap(), Some(PendingAction::NewCategory));
    }

    #[tokio::test]
    async fn test_buy_without_funds_suggests_top_up() {
        let (shop, notifier, _dir) = shop();
        let product_id = {
            let conn = get_connection(shop.pool()).unwrap();
            let category = catalog::add_category(&conn, "Games").unwrap();
            catalog::add_product(&conn, category.id, "gold", Decimal::from(5000), "").unwrap().id
        };

        let response = shop
            .handle_callback(&Sender::new(CUSTOMER), &format!("buy:{}", product_id))
            .await;

        assert!(response.toast.unwrap().contains("5000 vs 0"));
        assert!(response.send.unwrap().text.ends_with(TOP_UP_HINT));
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_button() {
        let (shop, _, _dir) = shop();
        let response = shop.handle_callback(&Sender::new(CUSTOMER), "gone:1").await;
        assert_eq!(response.toast.as_deref(), Some("This button is no longer available."));
    }

    #[tokio::test]
    async fn test_missing_category_is_reported() {
        let (shop, _, _dir) = shop();
        let response = shop.handle_callback(&Sender::new(CUSTOMER), "cat:99").await;
        assert_eq!(response.toast.as_deref(), Some("❌ Category #99 not found."));
    }
}
