//! Dispatch front behaviour: bans, cancellation, authorization, broadcasts
//!
//! Run with: cargo test --test dispatch_test

mod common;

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use storebot::dispatch::{BANNED_REPLY, CANCELLED_REPLY, FALLBACK_REPLY};
use storebot::flows::PendingAction;
use storebot::storage::ledger::{self, DepositFilter, DepositStatus};
use storebot::storage::{catalog, pending};
use storebot::testing::FailingNotifier;
use storebot::Sender;

use common::{customer, operator, wait_for_message, TestEnvironment, CUSTOMER, OPERATOR, OTHER_CUSTOMER};

const UNAUTHORIZED: &str = "⛔ This action is for the operator only.";

#[tokio::test]
async fn test_start_renders_welcome_with_first_name() {
    let env = TestEnvironment::new();
    env.shop.handle_callback(&operator(), "adm_welcome").await;
    let updated = env.shop.handle_text(&operator(), "Hello {user}!").await;
    assert_eq!(updated.text, "✅ Welcome message updated.");

    let user_view = env.shop.handle_text(&customer(), "/start").await;
    let operator_view = env.shop.handle_text(&operator(), "/start").await;

    assert_eq!(user_view.text, "Hello Ann!");
    assert!(user_view.keyboard.unwrap().callback_data().contains(&"menu_sections"));
    assert_eq!(operator_view.text, "Hello operator 👋\n\nHello Boss!");
    assert!(operator_view.keyboard.unwrap().callback_data().contains(&"adm_store"));
}

#[tokio::test]
async fn test_banned_user_is_turned_away() {
    let env = TestEnvironment::new();
    env.shop.handle_text(&customer(), "/start").await;

    env.shop.handle_callback(&operator(), "adm_ban_user").await;
    let banned = env.shop.handle_text(&operator(), &format!("ban {}", CUSTOMER)).await;
    assert_eq!(banned.text, format!("✅ User {} is banned.", CUSTOMER));

    assert_eq!(env.shop.handle_text(&customer(), "/balance").await.text, BANNED_REPLY);
    assert_eq!(
        env.shop.handle_callback(&customer(), "menu_sections").await.toast.as_deref(),
        Some(BANNED_REPLY)
    );
    assert_eq!(
        env.notifier.sent_to(CUSTOMER),
        vec!["🚫 You have been banned from this bot.".to_string()]
    );

    env.shop.handle_callback(&operator(), "adm_unban_user").await;
    env.shop.handle_text(&operator(), &format!("unban {}", CUSTOMER)).await;
    let balance = env.shop.handle_text(&customer(), "/balance").await;
    assert_eq!(balance.text, "💰 Your balance: 0 credits");
}

#[tokio::test]
async fn test_cancel_drops_pending_deposit() {
    let env = TestEnvironment::new();
    env.shop.handle_callback(&customer(), "menu_deposit").await;

    let cancelled = env.shop.handle_text(&customer(), "/cancel").await;
    let after = env.shop.handle_text(&customer(), "3000").await;

    assert_eq!(cancelled.text, CANCELLED_REPLY);
    assert_eq!(after.text, FALLBACK_REPLY);
    assert!(ledger::list_deposits(&env.conn(), DepositFilter::All, 10).unwrap().is_empty());
}

#[tokio::test]
async fn test_commands_take_priority_over_pending_flow() {
    let env = TestEnvironment::new();
    env.shop.handle_callback(&customer(), "menu_deposit").await;

    let balance = env.shop.handle_text(&customer(), "/balance").await;
    assert_eq!(balance.text, "💰 Your balance: 0 credits");
    assert_eq!(
        pending::get_pending(&env.conn(), CUSTOMER).unwrap(),
        Some(PendingAction::Deposit)
    );

    let reply = env.shop.handle_text(&customer(), "2500").await;
    assert!(reply.text.starts_with("✅ Deposit request #1"));
}

#[tokio::test]
async fn test_invalid_deposit_ends_the_flow() {
    let env = TestEnvironment::new();
    env.shop.handle_callback(&customer(), "menu_deposit").await;

    let rejected = env.shop.handle_text(&customer(), "lots").await;
    let next = env.shop.handle_text(&customer(), "5000").await;

    assert_eq!(rejected.text, "❌ Please send a valid amount, for example 5000.");
    assert_eq!(next.text, FALLBACK_REPLY);
}

#[tokio::test]
async fn test_operator_paths_refuse_customers() {
    let env = TestEnvironment::new();
    let deposit = {
        let conn = env.conn();
        ledger::create_deposit(&conn, CUSTOMER, Decimal::from(5000), 2).unwrap()
    };

    let confirm = env.shop.handle_text(&customer(), &format!("/confirm_deposit {}", deposit.id)).await;
    assert_eq!(confirm.text, UNAUTHORIZED);
    assert_eq!(env.shop.handle_text(&customer(), "/addcat Games").await.text, UNAUTHORIZED);

    let button = env.shop.handle_callback(&customer(), "adm_broadcast").await;
    assert_eq!(button.toast.as_deref(), Some(UNAUTHORIZED));

    let conn = env.conn();
    assert_eq!(
        ledger::get_deposit(&conn, deposit.id).unwrap().unwrap().status,
        DepositStatus::Pending
    );
    assert_eq!(ledger::balance_of(&conn, CUSTOMER).unwrap(), Decimal::ZERO);
    assert_eq!(pending::get_pending(&conn, CUSTOMER).unwrap(), None);
    assert!(catalog::list_categories(&conn).unwrap().is_empty());
}

#[tokio::test]
async fn test_operator_flow_left_on_customer_is_refused() {
    let env = TestEnvironment::new();
    {
        let conn = env.conn();
        pending::set_pending(&conn, CUSTOMER, &PendingAction::NewCategory).unwrap();
    }

    let reply = env.shop.handle_text(&customer(), "Games").await;

    assert_eq!(reply.text, UNAUTHORIZED);
    let conn = env.conn();
    assert!(catalog::list_categories(&conn).unwrap().is_empty());
    assert_eq!(pending::get_pending(&conn, CUSTOMER).unwrap(), None);
}

#[tokio::test]
async fn test_failed_notification_keeps_balance_change() {
    let failing = FailingNotifier::always();
    let env = TestEnvironment::with_notifier(failing.delivered().clone(), failing);

    env.shop.handle_callback(&operator(), "adm_add_balance").await;
    let reply = env.shop.handle_text(&operator(), &format!("{} | 50", CUSTOMER)).await;

    assert!(reply.text.starts_with("✅ Added 50 credits"));
    assert_eq!(ledger::balance_of(&env.conn(), CUSTOMER).unwrap(), Decimal::from(50));
    assert!(env.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_broadcast_reports_tally_with_failures() {
    let failing = FailingNotifier::for_recipients([OTHER_CUSTOMER]);
    let env = TestEnvironment::with_notifier(failing.delivered().clone(), failing);
    env.shop.handle_text(&customer(), "/start").await;
    env.shop.handle_text(&Sender::new(OTHER_CUSTOMER), "/start").await;

    env.shop.handle_callback(&operator(), "adm_broadcast").await;
    let started = env.shop.handle_text(&operator(), "Sale today").await;
    assert!(started.text.starts_with("📣 Sending the broadcast"));

    let report = wait_for_message(&env.notifier, OPERATOR, "Broadcast finished")
        .await
        .expect("operator never received the broadcast report");

    // Operator and customer received it; the other customer blocked the bot
    assert_eq!(report, "✅ Broadcast finished. Delivered: 2, failed: 1");
    assert_eq!(
        env.notifier.sent_to(CUSTOMER),
        vec!["📣 Message from the operator:\n\nSale today".to_string()]
    );
    assert!(env.notifier.sent_to(OTHER_CUSTOMER).is_empty());
}

#[tokio::test]
async fn test_deposit_listing_filters() {
    let env = TestEnvironment::new();
    {
        let mut conn = env.conn();
        ledger::create_deposit(&conn, CUSTOMER, Decimal::from(2500), 1).unwrap();
        let second = ledger::create_deposit(&conn, CUSTOMER, Decimal::from(5000), 2).unwrap();
        ledger::confirm_deposit(&mut conn, second.id).unwrap();
    }

    let pending_only = env.shop.handle_text(&operator(), "/deposits").await;
    let all = env.shop.handle_text(&operator(), "/deposits all").await;
    let bad = env.shop.handle_text(&operator(), "/deposits someday").await;

    assert!(pending_only.text.contains("#1 —"));
    assert!(!pending_only.text.contains("#2 —"));
    assert!(all.text.contains("#2 —") && all.text.contains("confirmed"));
    assert_eq!(bad.text, "❌ Use: /deposits [pending|all]");
}

#[tokio::test]
async fn test_audit_lists_operator_actions() {
    let env = TestEnvironment::new();
    env.shop.handle_text(&operator(), "/addcat Games").await;
    env.shop.handle_text(&operator(), "/setrate 3000").await;

    let audit = env.shop.handle_text(&operator(), "/audit").await;

    assert!(audit.text.contains("setrate 3000"));
    assert!(audit.text.contains("add_category Games"));
    assert!(audit.text.find("setrate").unwrap() < audit.text.find("add_category").unwrap());
}

#[tokio::test]
async fn test_credit_beyond_range_is_refused_and_flow_ends() {
    let env = TestEnvironment::new();
    let huge = Decimal::MAX.to_string();

    env.shop.handle_callback(&operator(), "adm_add_balance").await;
    let first = env.shop.handle_text(&operator(), &format!("{} | {}", CUSTOMER, huge)).await;
    env.shop.handle_callback(&operator(), "adm_add_balance").await;
    let second = env.shop.handle_text(&operator(), &format!("{} | 1", CUSTOMER)).await;
    let after = env.shop.handle_text(&operator(), "hello").await;

    assert!(first.text.starts_with("✅ Added"));
    assert_eq!(second.text, format!("❌ The balance of user {} would be out of range.", CUSTOMER));
    assert_eq!(after.text, "🛠 Operator panel:");
    let conn = env.conn();
    assert_eq!(ledger::balance_of(&conn, CUSTOMER).unwrap(), Decimal::MAX);
    assert_eq!(pending::get_pending(&conn, OPERATOR).unwrap(), None);
}

#[tokio::test]
async fn test_stats_with_extreme_balances_reports_instead_of_crashing() {
    let env = TestEnvironment::new();
    {
        let mut conn = env.conn();
        ledger::adjust_balance(&mut conn, CUSTOMER, Decimal::MAX).unwrap();
        ledger::adjust_balance(&mut conn, OTHER_CUSTOMER, Decimal::ONE).unwrap();
    }

    let stats = env.shop.handle_text(&operator(), "/stats").await;

    assert_eq!(stats.text, "❌ The totals are too large to add up.");
}

#[tokio::test]
async fn test_huge_rate_keeps_deposits_answering() {
    let env = TestEnvironment::new();
    env.shop.handle_text(&operator(), &format!("/setrate {}", Decimal::MAX)).await;
    env.shop.handle_text(&operator(), "/setmin 2").await;

    env.shop.handle_callback(&customer(), "menu_deposit").await;
    let reply = env.shop.handle_text(&customer(), "1").await;

    assert_eq!(reply.text, "❌ The minimum deposit is 2 credit(s).");
    let conn = env.conn();
    assert!(ledger::list_deposits(&conn, DepositFilter::All, 10).unwrap().is_empty());
    assert_eq!(pending::get_pending(&conn, CUSTOMER).unwrap(), None);
}
