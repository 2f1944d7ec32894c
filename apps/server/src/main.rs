//! tickarb - headless server
//!
//! Cross-exchange arbitrage detection with simulated or live execution,
//! controlled over a small HTTP API.

mod api;
mod config;

use clap::Parser;
use config::AppConfig;
use std::sync::Arc;
use std::time::Duration;
use tickarb_alerts::{Notifier, TelegramTransport};
use tickarb_core::Exchange;
use tickarb_executor::{ConfigHandle, ExecutionEngine};
use tickarb_feeds::RestProvider;
use tickarb_journal::{OpportunityLog, TradeLog};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// How long Ctrl+C waits for the loop to finish its current symbol.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// tickarb CLI
#[derive(Parser, Debug)]
#[command(name = "tickarb")]
#[command(about = "Cross-exchange crypto arbitrage bot", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Log level: trace, debug, info, warn, error (overrides the config file)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Control API port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Place real orders instead of simulating trades
    #[arg(long, default_value_t = false)]
    live: bool,

    /// Start the engine immediately instead of waiting for /api/start
    #[arg(long, default_value_t = false)]
    autostart: bool,
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

fn exchange_list(exchanges: &[Exchange]) -> String {
    exchanges
        .iter()
        .map(|ex| ex.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_notifier(config: &AppConfig) -> Notifier {
    match config.telegram() {
        Some(telegram) => {
            info!("Telegram alerts enabled");
            Notifier::new(Arc::new(TelegramTransport::new(telegram)))
        }
        None => {
            info!("Telegram not configured, alerts go to the log");
            Notifier::log_only()
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let mut config = match AppConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.live {
        config.bot.simulation_mode = false;
    }

    init_logging(&config.log_level);

    info!("tickarb starting");
    info!("  Config: {}", args.config);
    info!("  Simulation: {}", config.bot.simulation_mode);
    info!("  Exchanges: {}", exchange_list(&config.bot.exchanges));
    info!("  Symbols: {}", config.bot.symbols.len());
    info!("  Interval: {}s", config.bot.check_interval_seconds);
    if !config.bot.simulation_mode {
        warn!("LIVE mode: real market orders will be placed");
    }

    let provider = match RestProvider::from_env(config.gateway_timeout()) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let engine = ExecutionEngine::new(
        Arc::new(provider),
        ConfigHandle::new(config.bot.clone()),
        Arc::new(OpportunityLog::new(&config.opportunities_path)),
        Arc::new(TradeLog::new(&config.trades_path)),
        build_notifier(&config),
    );
    info!("  Opportunity log: {}", engine.opportunities().path().display());
    info!("  Trade log: {}", engine.trades().path().display());

    let server = match api::start_api_server(engine.clone(), config.port).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to bind control API on port {}: {}", config.port, e);
            std::process::exit(1);
        }
    };

    if args.autostart {
        if let Err(e) = engine.start().await {
            warn!("Autostart skipped: {}", e);
        }
    }

    info!("Press Ctrl+C to stop...");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }

    warn!("Shutdown signal received");
    engine.shutdown(SHUTDOWN_GRACE).await;
    server.abort();

    let status = engine.status().snapshot().await;
    info!("Final stats:");
    info!("  Trades: {}", status.total_trades);
    info!("  Profit: {:.8}", status.total_profit);
    info!("  Warnings: {}", status.warnings);
    info!("  Errors: {}", status.errors.len());
    info!("tickarb stopped");
}
