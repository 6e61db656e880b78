use clap::Parser;
use fxbot::agent::Agent;
use fxbot::config::AgentConfig;
use fxbot::gateway::sim::{PaperGateway, SimFeed};
use fxbot::gateway::LogSink;

/// Momentum/trust trading agent (paper mode)
#[derive(Parser, Debug)]
#[command(name = "fxbot", about = "Momentum/trust trading agent")]
struct Cli {
    /// Comma-separated symbols (overrides AGENT_SYMBOLS)
    #[arg(long, default_value = "")]
    symbols: String,

    /// Run continuously instead of a single cycle
    #[arg(long)]
    r#loop: bool,

    /// Run exactly one cycle (the default)
    #[arg(long, conflicts_with = "loop")]
    once: bool,

    /// Seconds between cycles in continuous mode (overrides CYCLE_INTERVAL_SEC)
    #[arg(long)]
    interval: Option<u64>,

    /// Seed for the paper-trading price feed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fxbot=info".into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    let mut cfg = AgentConfig::from_env()?;
    if !cli.symbols.is_empty() {
        let symbols = cli
            .symbols
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        cfg.set_symbols(symbols)?;
    }
    if let Some(secs) = cli.interval {
        cfg.cycle_interval_secs = secs;
    }
    if cfg.symbols.is_empty() {
        anyhow::bail!("no symbols configured; set AGENT_SYMBOLS or pass --symbols");
    }

    tracing::info!("fxbot starting (paper mode)");
    tracing::info!("  Symbols          : {}", cfg.symbols.join(", "));
    tracing::info!("  Timeframe        : {} x {} bars", cfg.timeframe, cfg.history_bars);
    tracing::info!("  Min Confidence   : {:.2}", cfg.min_confidence);
    tracing::info!("  Trust Weight     : {:.2}", cfg.trust_weight);
    tracing::info!("  Trust Half-Life  : {} min", cfg.trust_half_life_mins);
    tracing::info!("  Lots             : {:.2} - {:.2}", cfg.min_lots, cfg.max_lots);
    tracing::info!("  Max Open         : {} ({} per symbol)", cfg.max_open, cfg.max_per_symbol);
    tracing::info!("  Cooldown         : {}s", cfg.cooldown_secs);
    tracing::info!("  Block Same Dir   : {}", cfg.block_same_direction);
    tracing::info!("  Cycle Interval   : {}s", cfg.cycle_interval_secs);

    let feed = SimFeed::new(cli.seed);
    let mut gateway = PaperGateway::new();
    for symbol in &cfg.symbols {
        // Paper quotes around the feed's base price with a one-pip spread
        gateway.set_tick(symbol, 1.0999, 1.1000);
    }

    let mut agent = Agent::new(cfg.clone(), feed, gateway, LogSink);

    let continuous = cli.r#loop && !cli.once;
    if continuous {
        tracing::info!("continuous mode, ctrl-c to stop");
        tokio::select! {
            _ = agent.run_forever() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, shutting down");
            }
        }
    } else {
        agent.run_once().await;
    }

    tracing::info!("fxbot stopped");
    Ok(())
}
