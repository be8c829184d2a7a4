//! Built-in plugin integration tests
//! Run with: cargo test --test plugins_test

mod common;

use std::sync::Arc;

use common::{ensure_init, Harness, ME};
use userbot::domain::entities::{LogLevel, User};
use userbot::domain::traits::{EventGateway, Store};
use userbot::infrastructure::adapters::{ConsoleGateway, OutboundAction};
use userbot::infrastructure::config::Config;
use userbot::infrastructure::database::Database;
use userbot::plugins::{builtin, PluginManager};

fn permit_config(limit: u32) -> Config {
    let mut config = Config::default();
    config.pm_permit.limit = limit;
    config.pm_permit.message = "Not approved".to_string();
    config
}

#[tokio::test]
async fn test_builtin_modules_all_load() {
    let harness = Harness::start(Config::default()).await;

    assert_eq!(
        harness.manager.loaded_names(),
        vec!["alive", "info", "ping", "pm_permit", "stats", "utils"]
    );
    assert_eq!(harness.gateway.handler_count(), harness.manager.total_handlers());
}

#[tokio::test]
async fn test_pm_permit_warns_then_blocks() {
    let mut config = permit_config(2);
    config.bot.log_chat_id = Some(-100);
    let harness = Harness::start(config).await;

    harness.send("@42 hi").await;
    assert_eq!(harness.last_text().unwrap(), "Not approved\n\nWarning 1/2");

    harness.send("@42 hello?").await;
    assert_eq!(
        harness.last_text().unwrap(),
        "Not approved\n\nWarning 2/2\nNext message will result in a block!"
    );
    assert!(!harness.gateway.is_blocked(42));

    harness.send("@42 answer me").await;
    assert!(harness.gateway.is_blocked(42));
    assert!(harness.gateway.outbox().contains(&OutboundAction::Block(42)));

    let notice = harness.gateway.outbox().into_iter().find_map(|action| match action {
        OutboundAction::Send { chat_id: -100, text, .. } => Some(text),
        _ => None,
    });
    assert!(notice.unwrap().contains("Exceeded PM permit limit (3 warnings)"));

    let approval = harness.store.approval(42).await.unwrap().unwrap();
    assert_eq!(approval.warnings, 3);
    assert!(!approval.approved);

    let logs = harness.store.recent_logs(5).await.unwrap();
    assert!(logs
        .iter()
        .any(|entry| entry.level == LogLevel::Info && entry.message.contains("Blocked user")));
}

#[tokio::test]
async fn test_approved_user_is_counted_not_warned() {
    let harness = Harness::start(permit_config(3)).await;

    harness.send(".approve 42").await;
    assert!(harness.last_text().unwrap().starts_with("User Approved"));

    let approval = harness.store.approval(42).await.unwrap().unwrap();
    assert!(approval.approved);
    assert_eq!(approval.approved_by, Some(ME));

    let before = harness.gateway.outbox().len();
    harness.send("@42 hi again").await;
    assert_eq!(harness.gateway.outbox().len(), before);

    let stats = harness.store.user_stats(42).await.unwrap().unwrap();
    assert_eq!(stats.total_messages, 1);
}

#[tokio::test]
async fn test_disapprove_restores_guard() {
    let harness = Harness::start(permit_config(3)).await;

    harness.send(".approve 42").await;
    harness.send(".disapprove 42").await;
    harness.send("@42 hi").await;

    assert_eq!(harness.last_text().unwrap(), "Not approved\n\nWarning 1/3");
}

#[tokio::test]
async fn test_pmguard_off_lets_messages_through() {
    let harness = Harness::start(permit_config(1)).await;

    harness.send(".pmguard off").await;
    assert!(harness.last_text().unwrap().starts_with("PM Guard Disabled"));

    let before = harness.gateway.outbox().len();
    harness.send("@42 hi").await;
    harness.send("@42 hi").await;
    assert_eq!(harness.gateway.outbox().len(), before);
    assert!(harness.store.approval(42).await.unwrap().is_none());

    harness.send(".pmguard").await;
    assert!(harness.last_text().unwrap().starts_with("PM Guard Enabled"));
}

#[tokio::test]
async fn test_block_and_unblock_commands() {
    let harness = Harness::start(Config::default()).await;

    harness.send(".block 77").await;
    assert!(harness.gateway.is_blocked(77));

    harness.send(".unblock 77").await;
    assert!(!harness.gateway.is_blocked(77));

    harness.send(".block").await;
    assert_eq!(harness.last_text().unwrap(), "Usage: .block <user_id> or reply to a message");
}

#[tokio::test]
async fn test_ping_replies_and_counts_command() {
    let harness = Harness::start(Config::default()).await;

    assert_eq!(harness.send(".ping").await, 1);
    assert!(harness.last_text().unwrap().starts_with("Pong!"));

    let stats = harness.store.user_stats(ME).await.unwrap().unwrap();
    assert_eq!(stats.commands_used, 1);
    assert_eq!(stats.total_messages, 1);

    harness.send(".pings 3").await;
    assert!(harness.last_text().unwrap().contains("Test 3:"));

    harness.send(".pings 50").await;
    assert_eq!(harness.last_text().unwrap(), "Usage: .pings [1-10]");
}

#[tokio::test]
async fn test_alive_uses_template() {
    let mut config = Config::default();
    config.bot.alive_message = "Up for {uptime}, v{version}".to_string();
    let harness = Harness::start(config).await;

    harness.send(".alive").await;

    assert_eq!(
        harness.last_text().unwrap(),
        format!("Up for 0s, v{}", env!("CARGO_PKG_VERSION"))
    );
}

#[tokio::test]
async fn test_reload_command_replaces_handlers() {
    let harness = Harness::start(Config::default()).await;
    let total = harness.gateway.handler_count();

    harness.send(".reload ping").await;

    assert_eq!(harness.last_text().unwrap(), "Reloaded plugin: ping (2 handlers)");
    assert!(harness.manager.is_loaded("ping"));
    assert_eq!(harness.gateway.handler_count(), total);
}

#[tokio::test]
async fn test_unload_command_silences_module() {
    let harness = Harness::start(Config::default()).await;

    harness.send(".unload ping").await;
    assert_eq!(harness.last_text().unwrap(), "Unloaded plugin: ping (0 handlers)");
    assert_eq!(harness.send(".ping").await, 0);

    harness.send(".unload ping").await;
    assert_eq!(harness.last_text().unwrap(), "Failed to unload ping: Plugin 'ping' not found");

    harness.send(".load ping").await;
    assert_eq!(harness.send(".ping").await, 1);
}

#[tokio::test]
async fn test_help_and_plugins_listing() {
    let harness = Harness::start(Config::default()).await;

    harness.send(".help").await;
    let help = harness.last_text().unwrap();
    assert!(help.contains("Ping: .ping, .pings"));
    assert!(help.contains("PM Permit: .approve"));

    harness.send(".plugins").await;
    let listing = harness.last_text().unwrap();
    assert!(listing.contains("[loaded] pm_permit (6 handlers)"));
    assert!(listing.contains("Total: 6/6 loaded"));
}

#[tokio::test]
async fn test_logs_command_shows_recent_entries() {
    let harness = Harness::start(Config::default()).await;
    harness
        .store
        .add_log(LogLevel::Warning, "disk almost full", None, None)
        .await
        .unwrap();

    harness.send(".logs 5").await;

    let text = harness.last_text().unwrap();
    assert!(text.starts_with("Recent Logs (Last 5)"));
    assert!(text.contains("WARNING"));
    assert!(text.contains("disk almost full"));
}

#[tokio::test]
async fn test_id_and_mystats() {
    let harness = Harness::start(Config::default()).await;

    harness.send(".id").await;
    let ids = harness.last_text().unwrap();
    assert!(ids.contains(&format!("Chat ID: {}", ME)));

    harness.send(".mystats").await;
    let stats = harness.last_text().unwrap();
    assert!(stats.starts_with("Your Statistics"));
    assert!(stats.contains("Commands Used: 1"));
    assert!(stats.contains("Messages Sent: 1"));
    assert!(stats.contains("Command Usage Rate: 100.0%"));
}

#[tokio::test]
async fn test_others_cannot_run_commands() {
    let harness = Harness::start(permit_config(5)).await;

    harness.send("@42 .unload ping").await;

    assert!(harness.manager.is_loaded("ping"));
}

#[tokio::test]
async fn test_pm_permit_on_sqlite_store() {
    ensure_init();
    let gateway = Arc::new(ConsoleGateway::new(User::new(ME)).quiet());
    let store = Arc::new(Database::open_in_memory().unwrap());
    let manager = PluginManager::new(builtin::catalog(), gateway.clone(), store.clone(), Arc::new(permit_config(1)));
    manager.load("pm_permit").await.unwrap();

    for _ in 0..2 {
        let event = gateway.event_from_line("@9 spam").unwrap();
        gateway.dispatch(event).await;
    }

    assert!(gateway.is_blocked(9));
    assert_eq!(store.approval(9).await.unwrap().unwrap().warnings, 2);

    let report = manager.unload_all().await;
    assert!(report.is_clean());
    assert_eq!(gateway.handler_count(), 0);
}
