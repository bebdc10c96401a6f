//! Gemini FX Bot
//!
//! Simulated forex trading driven by an LLM: every cycle the bot draws a
//! synthetic market snapshot, asks Gemini for a decision and applies it to
//! an in-memory mock account.

mod api;
mod bot;
mod broker;
mod config;
mod db;
mod market;
mod metrics;
mod models;
mod trading;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::GeminiTransport;
use crate::bot::{BotConfig, DashboardState, TradingBot};
use crate::broker::{BrokerConnector, SimulatedMt5Connector};
use crate::config::Credentials;
use crate::db::ConfigStore;
use crate::market::MarketSimulator;
use crate::models::{TradeSide, EMPTY_ANALYSIS_PLACEHOLDER};
use crate::trading::{LedgerConfig, TradingConfig};

/// AI-driven simulated forex trading bot CLI.
#[derive(Parser)]
#[command(name = "fxbot")]
#[command(about = "Simulated forex trading with decisions from Gemini", long_about = None)]
struct Cli {
    /// Settings database URL
    #[arg(short, long, default_value = "sqlite:./fxbot.db?mode=rwc")]
    database: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage stored credentials
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print one synthetic market snapshot
    Snapshot,

    /// Run a fixed number of trading cycles and print the resulting state
    Cycle {
        /// Number of cycles to run
        #[arg(short, long, default_value = "1")]
        count: u32,

        /// Starting balance of the mock account
        #[arg(short, long, default_value = "10000")]
        balance: f64,

        /// Seconds to wait for each decision
        #[arg(short, long, default_value = "8")]
        timeout: u64,

        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the trading bot until Ctrl+C
    Run {
        /// Seconds between cycles
        #[arg(short, long, default_value = "5")]
        interval: u64,

        /// Starting balance of the mock account
        #[arg(short, long, default_value = "10000")]
        balance: f64,

        /// Seconds to wait for each decision
        #[arg(short, long, default_value = "8")]
        timeout: u64,
    },

    /// Exercise the simulated MT5 connector
    Broker {
        /// Symbol to quote and trade
        #[arg(short, long, default_value = "EUR/USD")]
        symbol: String,

        /// Side of the test order (BUY or SELL)
        #[arg(long, default_value = "BUY")]
        side: String,

        /// Lot size of the test order
        #[arg(short, long, default_value = "0.1")]
        volume: f64,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store credentials; omitted fields keep their stored value
    Set {
        #[arg(long)]
        gemini_api_key: Option<String>,

        #[arg(long)]
        mt5_server: Option<String>,

        #[arg(long)]
        mt5_login: Option<String>,

        #[arg(long)]
        mt5_password: Option<String>,
    },

    /// Show stored credentials with secrets masked
    Show,

    /// Delete stored credentials
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store = ConfigStore::new(&cli.database).await?;

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Set {
                gemini_api_key,
                mt5_server,
                mt5_login,
                mt5_password,
            } => {
                let stored = store.load_credentials().await?;
                let updated = Credentials {
                    gemini_api_key: gemini_api_key.unwrap_or_default(),
                    mt5_server: mt5_server.unwrap_or_default(),
                    mt5_login: mt5_login.unwrap_or_default(),
                    mt5_password: mt5_password.unwrap_or_default(),
                }
                .merged_with(&stored);

                store.save_credentials(&updated).await?;
                info!("Credentials saved");
                println!("Configuration saved.\n\n{}", updated);
            }

            ConfigAction::Show => {
                let stored = store.load_credentials().await?;
                let effective = stored.clone().with_env_overrides();

                println!("\n=== Stored Configuration ===\n");
                print!("{}", stored);
                match store.get_setting(db::CREDENTIALS_KEY).await? {
                    Some(setting) => println!("\n{} last saved {} UTC", setting.key, setting.updated_at),
                    None => println!("\nNothing stored yet."),
                }
                if effective != stored {
                    println!("\n=== Effective (with environment overrides) ===\n");
                    print!("{}", effective);
                }
            }

            ConfigAction::Clear => {
                if store.delete(db::CREDENTIALS_KEY).await? {
                    println!("Stored configuration deleted.");
                } else {
                    println!("Nothing stored.");
                }
            }
        },

        Commands::Snapshot => {
            let quotes = MarketSimulator::default().generate_snapshot();

            println!("\n{:<10} {:>10} {:>10} {:>11} {:>8}", "PAIR", "PRICE", "CHANGE", "VOLATILITY", "TREND");
            println!("{}", "-".repeat(53));
            for q in quotes {
                println!(
                    "{:<10} {:>10} {:>9.2}% {:>10.2}% {:>8}",
                    q.pair,
                    q.price,
                    q.change_24h * 100.0,
                    q.volatility * 100.0,
                    q.trend.as_str()
                );
            }
        }

        Commands::Cycle {
            count,
            balance,
            timeout,
            json,
        } => {
            let credentials = load_credentials(&store).await?;
            let bot = build_bot(credentials, BotConfig::default().cycle_interval_secs, balance, timeout)?;

            for _ in 0..count {
                let report = bot.run_cycle().await.context("Trading cycle failed")?;
                println!("{}", report);
                if !json {
                    println!("    {}", truncate(&report.analysis, 100));
                }
            }

            let state = bot.snapshot().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print_dashboard(&state);
                println!("\n{}", bot.stats().await);
            }
        }

        Commands::Run {
            interval,
            balance,
            timeout,
        } => {
            let credentials = load_credentials(&store).await?;
            let bot = Arc::new(build_bot(credentials, interval, balance, timeout)?);

            let config = bot.config();
            println!("\n=== Gemini FX Bot ===");
            println!("Model:            {}", bot.transport().model());
            println!("Starting balance: ${}", config.ledger_config.initial_balance);
            println!("Cycle interval:   {}s", config.cycle_interval_secs);
            println!("Decision timeout: {}s", config.decision_timeout.as_secs());
            println!("Mode:             SIMULATED (no real orders)");
            println!("\nPress Ctrl+C to stop.\n");

            bot.start();

            let mut status_ticker = tokio::time::interval(Duration::from_secs(bot.config().cycle_interval_secs.max(1)));
            let mut last_printed = 0;
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown signal received");
                        break;
                    }
                    _ = status_ticker.tick() => {
                        let state = bot.snapshot().await;
                        if state.cycles_completed > last_printed {
                            last_printed = state.cycles_completed;
                            print_status_line(&state);
                        }
                    }
                }
            }

            bot.stop();
            while bot.cycle_in_flight() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }

            print_dashboard(&bot.snapshot().await);
            println!("\n{}", bot.stats().await);
        }

        Commands::Broker {
            symbol,
            side,
            volume,
        } => {
            let Some(side) = TradeSide::parse(&side) else {
                bail!("Side must be BUY or SELL, got {}", side);
            };
            let volume = Decimal::try_from(volume).context("Invalid volume")?;

            let credentials = load_credentials(&store).await?;
            let mut mt5 = SimulatedMt5Connector::new(credentials.mt5_config());

            mt5.connect().await?;
            println!("Connected to {} as {}", mt5.config().server, mt5.config().login);
            println!("Balance: ${:.2}", mt5.get_balance().await?);

            let quote = mt5.get_price(&symbol).await?;
            println!("{} bid {} / ask {} (spread {})", symbol, quote.bid, quote.ask, quote.spread());

            match mt5.open_trade(&symbol, side, volume, None, None).await? {
                Some(trade) => {
                    println!(
                        "Opened ticket {}: {} {} {} @ {}",
                        trade.ticket, trade.side.as_str(), trade.volume, trade.symbol, trade.open_price
                    );
                    println!("Open trades: {}", mt5.get_open_trades().await?.len());
                    let closed = mt5.close_trade(trade.ticket).await?;
                    println!("Closed ticket {}: {}", trade.ticket, closed);
                }
                None => println!("Order declined"),
            }

            mt5.disconnect().await?;
        }
    }

    Ok(())
}

/// Stored credentials with environment overrides applied.
async fn load_credentials(store: &ConfigStore) -> Result<Credentials> {
    let credentials = store.load_credentials().await?.with_env_overrides();
    if !credentials.has_api_key() {
        bail!("No Gemini API key configured. Use 'fxbot config set --gemini-api-key <KEY>' or set GEMINI_API_KEY.");
    }
    Ok(credentials)
}

fn build_bot(
    credentials: Credentials,
    interval: u64,
    balance: f64,
    timeout: u64,
) -> Result<TradingBot<GeminiTransport>> {
    let config = BotConfig {
        cycle_interval_secs: interval,
        decision_timeout: Duration::from_secs(timeout),
        ledger_config: LedgerConfig {
            initial_balance: Decimal::try_from(balance).context("Invalid balance")?,
            ..LedgerConfig::default()
        },
        trading_config: TradingConfig::default(),
    };
    let transport = GeminiTransport::new()?;

    Ok(TradingBot::new(config, transport, credentials))
}

fn print_status_line(state: &DashboardState) {
    let analysis = state.last_analysis.as_deref().unwrap_or(EMPTY_ANALYSIS_PLACEHOLDER);
    println!(
        "[{}] equity ${:.2} | balance ${:.2} | P&L ${:.2} | open {} | {}",
        state
            .last_update
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string()),
        state.equity,
        state.balance,
        state.total_profit,
        state.open_trades.len(),
        truncate(analysis, 60)
    );
}

fn print_dashboard(state: &DashboardState) {
    if !state.open_trades.is_empty() {
        println!("\n=== Open Trades ===");
        for t in &state.open_trades {
            println!(
                "  {} {} {} {} @ {} -> {} (P&L: ${:.2})",
                truncate(&t.id, 8),
                t.side.as_str(),
                t.volume,
                t.pair,
                t.entry_price,
                t.current_price,
                t.profit
            );
        }
    }

    if !state.closed_trades.is_empty() {
        println!("\n=== Closed Trades ===");
        for t in &state.closed_trades {
            println!(
                "  {} {} {} {} @ {} -> {} (P&L: ${:.2})",
                truncate(&t.id, 8),
                t.side.as_str(),
                t.volume,
                t.pair,
                t.entry_price,
                t.current_price,
                t.profit
            );
        }
    }

    if let Some(analysis) = &state.last_analysis {
        println!("\n=== Latest Analysis ===\n{}", analysis);
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
