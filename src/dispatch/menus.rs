//! Inline menus as plain data.
//!
//! Screens are built here without any transport types; the Telegram adapter
//! turns a [`Keyboard`] into an inline markup. Callback data strings are
//! produced and parsed only through [`MenuAction`].

use crate::core::money::format_credits;
use crate::flows::{AdjustDirection, PendingAction};
use crate::storage::catalog::{ButtonAction, Category, CustomButton, Product};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonKind {
    Callback(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub kind: ButtonKind,
}

impl Button {
    pub fn action(label: impl Into<String>, action: MenuAction) -> Self {
        Self {
            label: label.into(),
            kind: ButtonKind::Callback(action.callback_data()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ButtonKind::Url(url.into()),
        }
    }

    /// Renders an operator-defined button.
    pub fn custom(button: &CustomButton) -> Self {
        match button.action {
            ButtonAction::OpenUrl => Self::url(button.label.clone(), button.payload.clone()),
            ButtonAction::Buy => Self {
                label: button.label.clone(),
                kind: ButtonKind::Callback(format!("buy:{}", button.payload)),
            },
        }
    }
}

/// Rows of inline buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.rows.push(buttons);
        }
        self
    }

    /// One row per custom button.
    pub fn custom_rows(mut self, buttons: &[CustomButton]) -> Self {
        for button in buttons {
            self.rows.push(vec![Button::custom(button)]);
        }
        self
    }

    /// Every callback payload on the keyboard, in order.
    pub fn callback_data(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                ButtonKind::Callback(data) => Some(data.as_str()),
                ButtonKind::Url(_) => None,
            })
            .collect()
    }
}

/// Everything an inline button can ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    BackMain,
    Sections,
    Category(i64),
    Product(i64),
    Buy(i64),
    Balance,
    Deposit,
    Orders,
    Help,
    EmptyCategory,
    AdminStore,
    AdminBalance,
    AdminBans,
    AdminButtons,
    AdminStats,
    AdminListUsers,
    AdminListButtons,
    /// Operator button that starts a text flow
    AdminFlow(PendingAction),
}

const ADMIN_FLOWS: &[(&str, PendingAction)] = &[
    ("adm_add_category", PendingAction::NewCategory),
    ("adm_edit_category", PendingAction::EditCategory),
    ("adm_add_product", PendingAction::NewProduct),
    ("adm_edit_product", PendingAction::EditProduct),
    ("adm_delete", PendingAction::DeleteItem),
    ("adm_reorder", PendingAction::Reorder),
    ("adm_add_button", PendingAction::NewButton),
    (
        "adm_add_balance",
        PendingAction::BalanceAdjust {
            direction: AdjustDirection::Add,
        },
    ),
    (
        "adm_deduct_balance",
        PendingAction::BalanceAdjust {
            direction: AdjustDirection::Deduct,
        },
    ),
    ("adm_show_balance", PendingAction::ShowBalance),
    ("adm_ban_user", PendingAction::BanToggle),
    ("adm_unban_user", PendingAction::BanToggle),
    ("adm_welcome", PendingAction::WelcomeEdit),
    ("adm_broadcast", PendingAction::Broadcast),
];

impl MenuAction {
    pub fn parse(data: &str) -> Option<Self> {
        let simple = match data {
            "back_main" => Some(Self::BackMain),
            "menu_sections" => Some(Self::Sections),
            "menu_balance" => Some(Self::Balance),
            "menu_deposit" => Some(Self::Deposit),
            "menu_orders" => Some(Self::Orders),
            "menu_help" => Some(Self::Help),
            "no_products" => Some(Self::EmptyCategory),
            "adm_store" => Some(Self::AdminStore),
            "adm_balance" => Some(Self::AdminBalance),
            "adm_bans" => Some(Self::AdminBans),
            "adm_buttons" => Some(Self::AdminButtons),
            "adm_stats" => Some(Self::AdminStats),
            "adm_list_users" => Some(Self::AdminListUsers),
            "adm_list_buttons" => Some(Self::AdminListButtons),
            _ => None,
        };
        if simple.is_some() {
            return simple;
        }

        if let Some((_, action)) = ADMIN_FLOWS.iter().find(|(key, _)| *key == data) {
            return Some(Self::AdminFlow(action.clone()));
        }

        let (prefix, id) = data.split_once(':')?;
        let id = id.trim().parse::<i64>().ok()?;
        match prefix {
            "cat" => Some(Self::Category(id)),
            "prod" => Some(Self::Product(id)),
            "buy" => Some(Self::Buy(id)),
            _ => None,
        }
    }

    pub fn callback_data(&self) -> String {
        let fixed = match self {
            Self::BackMain => "back_main",
            Self::Sections => "menu_sections",
            Self::Balance => "menu_balance",
            Self::Deposit => "menu_deposit",
            Self::Orders => "menu_orders",
            Self::Help => "menu_help",
            Self::EmptyCategory => "no_products",
            Self::AdminStore => "adm_store",
            Self::AdminBalance => "adm_balance",
            Self::AdminBans => "adm_bans",
            Self::AdminButtons => "adm_buttons",
            Self::AdminStats => "adm_stats",
            Self::AdminListUsers => "adm_list_users",
            Self::AdminListButtons => "adm_list_buttons",
            Self::Category(id) => return format!("cat:{}", id),
            Self::Product(id) => return format!("prod:{}", id),
            Self::Buy(id) => return format!("buy:{}", id),
            Self::AdminFlow(action) => ADMIN_FLOWS
                .iter()
                .find(|(_, candidate)| candidate == action)
                .map(|(key, _)| *key)
                .unwrap_or("adm_store"),
        };
        fixed.to_string()
    }

    pub fn requires_operator(&self) -> bool {
        matches!(
            self,
            Self::AdminStore
                | Self::AdminBalance
                | Self::AdminBans
                | Self::AdminButtons
                | Self::AdminStats
                | Self::AdminListUsers
                | Self::AdminListButtons
                | Self::AdminFlow(_)
        )
    }
}

/// Replaces `{user}` with the reader's first name.
pub fn render_welcome(template: &str, first_name: Option<&str>) -> String {
    template.replace("{user}", first_name.unwrap_or("there"))
}

fn flow_button(label: &str, key: &str) -> Button {
    Button {
        label: label.to_string(),
        kind: ButtonKind::Callback(key.to_string()),
    }
}

fn back_main() -> Button {
    Button::action("🔙 Back", MenuAction::BackMain)
}

/// A single "back to the main menu" button.
pub fn back_keyboard() -> Keyboard {
    Keyboard::default().row(vec![back_main()])
}

pub fn balance_keyboard() -> Keyboard {
    Keyboard::default()
        .row(vec![Button::action("➕ Deposit", MenuAction::Deposit)])
        .row(vec![back_main()])
}

pub fn user_main_keyboard(global_buttons: &[CustomButton]) -> Keyboard {
    Keyboard::default()
        .row(vec![Button::action("🛒 Categories", MenuAction::Sections)])
        .row(vec![
            Button::action("💰 My balance", MenuAction::Balance),
            Button::action("➕ Deposit", MenuAction::Deposit),
        ])
        .row(vec![
            Button::action("📦 My orders", MenuAction::Orders),
            Button::action("❓ Help", MenuAction::Help),
        ])
        .custom_rows(global_buttons)
}

pub fn admin_main_keyboard() -> Keyboard {
    Keyboard::default()
        .row(vec![
            Button::action("🛠 Store", MenuAction::AdminStore),
            Button::action("💳 Balances", MenuAction::AdminBalance),
        ])
        .row(vec![
            flow_button("✍️ Welcome text", "adm_welcome"),
            flow_button("📢 Broadcast", "adm_broadcast"),
        ])
        .row(vec![
            Button::action("🚫 Bans", MenuAction::AdminBans),
            Button::action("📊 Statistics", MenuAction::AdminStats),
        ])
        .row(vec![
            Button::action("🔘 Buttons", MenuAction::AdminButtons),
            Button::action("🛒 Browse store", MenuAction::Sections),
        ])
}

pub fn admin_store_keyboard() -> Keyboard {
    Keyboard::default()
        .row(vec![
            flow_button("➕ Add category", "adm_add_category"),
            flow_button("✏️ Edit category", "adm_edit_category"),
        ])
        .row(vec![
            flow_button("➕ Add product", "adm_add_product"),
            flow_button("✏️ Edit product", "adm_edit_product"),
        ])
        .row(vec![
            flow_button("🗑 Delete category/product", "adm_delete"),
            flow_button("↕️ Reorder", "adm_reorder"),
        ])
        .row(vec![back_main()])
}

pub fn admin_balance_keyboard() -> Keyboard {
    Keyboard::default()
        .row(vec![
            flow_button("➕ Add balance", "adm_add_balance"),
            flow_button("➖ Deduct balance", "adm_deduct_balance"),
        ])
        .row(vec![flow_button("🔍 Show user balance", "adm_show_balance"), back_main()])
}

pub fn admin_bans_keyboard() -> Keyboard {
    Keyboard::default()
        .row(vec![
            flow_button("🚫 Ban user", "adm_ban_user"),
            flow_button("✅ Unban user", "adm_unban_user"),
        ])
        .row(vec![Button::action("👥 List users", MenuAction::AdminListUsers), back_main()])
}

pub fn admin_buttons_keyboard() -> Keyboard {
    Keyboard::default()
        .row(vec![
            flow_button("➕ Add button", "adm_add_button"),
            Button::action("📋 List buttons", MenuAction::AdminListButtons),
        ])
        .row(vec![back_main()])
}

pub fn categories_keyboard(categories: &[Category]) -> Keyboard {
    let mut keyboard = Keyboard::default();
    for category in categories {
        keyboard = keyboard.row(vec![Button::action(
            category.name.clone(),
            MenuAction::Category(category.id),
        )]);
    }
    keyboard.row(vec![back_main()])
}

pub fn products_keyboard(products: &[Product], category_buttons: &[CustomButton]) -> Keyboard {
    let mut keyboard = Keyboard::default();
    if products.is_empty() {
        keyboard = keyboard.row(vec![Button::action("This category is empty", MenuAction::EmptyCategory)]);
    }
    for product in products {
        keyboard = keyboard.row(vec![Button::action(
            format!("{} — {}", product.name, format_credits(product.price)),
            MenuAction::Product(product.id),
        )]);
    }
    keyboard
        .custom_rows(category_buttons)
        .row(vec![Button::action("🔙 Categories", MenuAction::Sections)])
}

pub fn product_keyboard(product: &Product, product_buttons: &[CustomButton]) -> Keyboard {
    Keyboard::default()
        .row(vec![
            Button::action("🛒 Buy now", MenuAction::Buy(product.id)),
            Button::action("🔙 Back", MenuAction::Category(product.category_id)),
        ])
        .custom_rows(product_buttons)
}

pub fn product_text(product: &Product) -> String {
    let mut text = format!("🔹 {}\nPrice: {}", product.name, format_credits(product.price));
    if !product.description.is_empty() {
        text.push_str("\n\n");
        text.push_str(&product.description);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::catalog::ParentKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_callback_data_round_trips() {
        let actions = [
            MenuAction::BackMain,
            MenuAction::Category(3),
            MenuAction::Product(4),
            MenuAction::Buy(5),
            MenuAction::AdminStats,
            MenuAction::AdminFlow(PendingAction::BalanceAdjust {
                direction: AdjustDirection::Deduct,
            }),
            MenuAction::AdminFlow(PendingAction::Broadcast),
        ];
        for action in actions {
            assert_eq!(MenuAction::parse(&action.callback_data()), Some(action));
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(MenuAction::parse("cat:abc"), None);
        assert_eq!(MenuAction::parse("shop:1"), None);
        assert_eq!(MenuAction::parse(""), None);
    }

    #[test]
    fn test_both_ban_buttons_start_same_flow() {
        assert_eq!(
            MenuAction::parse("adm_unban_user"),
            Some(MenuAction::AdminFlow(PendingAction::BanToggle))
        );
        assert!(MenuAction::parse("adm_ban_user").unwrap().requires_operator());
        assert!(!MenuAction::Buy(1).requires_operator());
    }

    #[test]
    fn test_custom_buttons_render() {
        let buttons = vec![
            CustomButton {
                id: 1,
                parent_kind: ParentKind::Global,
                parent_id: 0,
                label: "Rules".to_string(),
                action: ButtonAction::OpenUrl,
                payload: "https://example.com".to_string(),
            },
            CustomButton {
                id: 2,
                parent_kind: ParentKind::Global,
                parent_id: 0,
                label: "Gold".to_string(),
                action: ButtonAction::Buy,
                payload: "7".to_string(),
            },
        ];
        let keyboard = user_main_keyboard(&buttons);
        assert_eq!(keyboard.rows.len(), 5);
        assert!(keyboard.callback_data().contains(&"buy:7"));
        assert_eq!(
            keyboard.rows[3][0].kind,
            ButtonKind::Url("https://example.com".to_string())
        );
    }

    #[test]
    fn test_render_welcome() {
        assert_eq!(render_welcome("Hi {user}!", Some("Ann")), "Hi Ann!");
        assert_eq!(render_welcome("Hi {user}!", None), "Hi there!");
        assert_eq!(render_welcome("Plain", Some("Ann")), "Plain");
    }

    #[test]
    fn test_empty_category_placeholder() {
        let keyboard = products_keyboard(&[], &[]);
        assert_eq!(keyboard.callback_data(), vec!["no_products", "menu_sections"]);
    }
}
