use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use userbot::application::errors::BotError;
use userbot::domain::entities::User;
use userbot::domain::traits::{EventGateway, Store};
use userbot::infrastructure::adapters::ConsoleGateway;
use userbot::infrastructure::config::Config;
use userbot::infrastructure::database::Database;
use userbot::plugins::{builtin, PluginManager};

#[derive(Parser)]
#[command(name = "userbot")]
#[command(about = "Plugin-driven automation for a personal chat account", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path; environment overrides apply on top
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot with the console gateway
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
    /// List discovered plugins
    Plugins {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run_bot(&cli.config),
        Commands::Version => {
            println!("userbot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(),
        Commands::Plugins { json } => list_plugins(&cli.config, json),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(config_path: &str) -> Result<Config, BotError> {
    let mut config = if Path::new(config_path).exists() {
        Config::load(config_path)?
    } else {
        tracing::info!("No config at {}, using defaults", config_path);
        Config::default()
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

fn console_account() -> User {
    User::new(1)
        .with_username("console")
        .with_name("UserBot", None::<String>)
}

fn runtime() -> Result<tokio::runtime::Runtime, BotError> {
    tokio::runtime::Runtime::new().map_err(|e| BotError::Internal(format!("Failed to start runtime: {}", e)))
}

fn run_bot(config_path: &str) -> Result<(), BotError> {
    let config = load_config(config_path)?;
    runtime()?.block_on(run(config))
}

async fn run(config: Config) -> Result<(), BotError> {
    tracing::info!("Starting {}", config.bot.name);

    let db_path = config.db_path();
    let store: Arc<dyn Store> = Arc::new(Database::open(&db_path)?);
    tracing::info!("Database initialized: {}", db_path.display());

    let gateway = Arc::new(ConsoleGateway::new(console_account()));
    let log_chat_id = config.bot.log_chat_id;
    let manager = PluginManager::new(builtin::catalog(), gateway.clone(), store, Arc::new(config));

    let report = manager.load_all().await;
    for (name, e) in &report.failures {
        tracing::warn!("Plugin {} not loaded: {}", name, e);
    }
    tracing::info!(
        "Bot started with {} plugins and {} handlers",
        report.succeeded,
        gateway.handler_count()
    );

    if let Some(chat_id) = log_chat_id {
        let notice = format!(
            "UserBot started\n\nPlugins loaded: {}/{}",
            report.succeeded, report.attempted
        );
        if let Err(e) = gateway.send_message(chat_id, &notice).await {
            tracing::warn!("Failed to send startup message: {}", e);
        }
    }

    println!("Type messages as yourself, or `@<user_id> text` to receive a private message. Ctrl-C quits.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(event) = gateway.event_from_line(&line) {
                        gateway.dispatch(event).await;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Failed to read input: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    let report = manager.unload_all().await;
    for (name, e) in report.failures.iter().chain(report.warnings.iter()) {
        tracing::warn!("Plugin {}: {}", name, e);
    }
    tracing::info!("Shut down, {} handlers left", gateway.handler_count());
    Ok(())
}

fn init_config() -> Result<(), BotError> {
    let yaml = Config::default().to_yaml()?;
    println!("{}", yaml);
    println!("\nSave this to config.yaml and adjust as needed.");
    Ok(())
}

fn list_plugins(config_path: &str, json: bool) -> Result<(), BotError> {
    let config = load_config(config_path)?;
    let gateway = Arc::new(ConsoleGateway::new(console_account()).quiet());
    let store: Arc<dyn Store> = Arc::new(userbot::infrastructure::storage::MemoryStore::new());
    let manager = PluginManager::new(builtin::catalog(), gateway, store, Arc::new(config));
    let catalog = manager.catalog();

    if json {
        let out = serde_json::to_string_pretty(&catalog)
            .map_err(|e| BotError::Internal(format!("Failed to serialize plugins: {}", e)))?;
        println!("{}", out);
        return Ok(());
    }

    for status in &catalog {
        let state = if status.disabled { "disabled" } else { "enabled" };
        println!(
            "{:<12} {:<9} {}",
            status.name,
            state,
            status.info.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
