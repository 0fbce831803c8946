//! Butters Pairs - Statistical Arbitrage Pair Trading Engine
//!
//! Screens a sector-partitioned universe for mean-reverting pairs and
//! trades their spreads against replayed prices with paper execution.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use butters_pairs::adapters::cli::{CheckConfigCmd, CliApp, Command, OutputFormat, RunCmd, ScreenCmd, SimulateCmd};
use butters_pairs::adapters::{PaperBroker, PriceFile, ReplayPriceFeed, SyntheticUniverse};
use butters_pairs::application::{PairTradingSession, ReplayOrchestrator};
use butters_pairs::config::{load_config, Config};
use butters_pairs::domain::PortfolioSnapshot;
use butters_pairs::strategy::PairTradingParams;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (RUST_LOG may be set there)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let level = config_path(&app.command)
        .and_then(|path| load_config(expand(path)).ok())
        .map(|config| config.logging.level);
    init_logging(app.verbose, app.debug, level.as_deref())?;

    match app.command {
        Command::Screen(cmd) => screen_command(cmd),
        Command::Run(cmd) => run_command(cmd).await,
        Command::Simulate(cmd) => simulate_command(cmd),
        Command::CheckConfig(cmd) => check_config_command(cmd),
    }
}

fn init_logging(verbose: bool, debug: bool, config_level: Option<&str>) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else {
        EnvFilter::new(config_level.unwrap_or("warn"))
    };

    fmt().with_env_filter(filter).init();
    Ok(())
}

fn config_path(command: &Command) -> Option<&Path> {
    match command {
        Command::Screen(cmd) => Some(cmd.config.as_path()),
        Command::Run(cmd) => Some(cmd.config.as_path()),
        Command::CheckConfig(cmd) => Some(cmd.config.as_path()),
        Command::Simulate(_) => None,
    }
}

/// Expand `~` in a user-supplied path
fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string())
}

fn load(config: &Path, prices: &Path) -> Result<(Config, PriceFile)> {
    let config = load_config(expand(config)).context("Failed to load configuration")?;
    let prices = PriceFile::load(expand(prices)).context("Failed to load price file")?;
    Ok((config, prices))
}

fn screen_command(cmd: ScreenCmd) -> Result<()> {
    let (config, prices) = load(&cmd.config, &cmd.prices)?;
    let feed = ReplayPriceFeed::new(prices);

    let mut session =
        PairTradingSession::new(PairTradingParams::from(&config)).context("Failed to create session")?;
    let portfolio = PortfolioSnapshot::new(config.portfolio.initial_cash);
    let report = session
        .on_screening_trigger(feed.universe(), &feed, &portfolio)
        .context("Screening did not run")?;

    match cmd.format {
        OutputFormat::Text => println!("{}", report),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        ),
    }
    Ok(())
}

async fn run_command(cmd: RunCmd) -> Result<()> {
    tracing::info!("Starting paper replay...");

    let (config, prices) = load(&cmd.config, &cmd.prices)?;
    let params = PairTradingParams::from(&config);
    let universe = prices.sectors.clone();
    let periods = prices.periods();

    let feed = Arc::new(ReplayPriceFeed::new(prices));
    let broker = Arc::new(PaperBroker::new(
        Arc::clone(&feed),
        config.portfolio.initial_cash,
        config.portfolio.commission_per_share,
    ));

    let start = cmd
        .start
        .unwrap_or_else(|| ReplayOrchestrator::<ReplayPriceFeed, PaperBroker<ReplayPriceFeed>>::warmup_periods(&params));
    if start > periods {
        tracing::warn!("Start period {} is past the end of the price file ({} periods)", start, periods);
    }

    let orchestrator = ReplayOrchestrator::new(params, feed, broker, universe)
        .context("Failed to create orchestrator")?;

    // Setup Ctrl+C handler
    let orch = orchestrator.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        orch.stop().await;
    });

    let summary = orchestrator.run(start).await?;
    println!("{}", summary);

    let initial = config.portfolio.initial_cash;
    println!(
        "Return:            {:+.2}%",
        (summary.final_value - initial) / initial * 100.0
    );
    Ok(())
}

fn simulate_command(cmd: SimulateCmd) -> Result<()> {
    let universe = SyntheticUniverse {
        sectors: cmd.sectors,
        assets_per_sector: cmd.assets_per_sector,
        periods: cmd.periods,
        seed: cmd.seed,
        spread_half_life: cmd.half_life,
        ..Default::default()
    };
    let out = expand(&cmd.out);
    universe
        .generate()
        .save(&out)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!("Wrote {} periods for {} assets to {}", cmd.periods, cmd.sectors * cmd.assets_per_sector, out.display());
    for pair in universe.embedded_pairs() {
        println!("  embedded pair: {}", pair);
    }
    Ok(())
}

fn check_config_command(cmd: CheckConfigCmd) -> Result<()> {
    let config = load_config(expand(&cmd.config)).context("Configuration is invalid")?;
    let params = PairTradingParams::from(&config);

    println!("Configuration OK");
    println!(
        "  screening: lookback {}, {} pairs by {}, gates {:?}",
        params.screening.lookback,
        params.screening.desired_pairs,
        params.screening.ranking_metric,
        params.screening.enabled_gates()
    );
    println!(
        "  trading: entry {} / exit {}, z window {}, hedge lookback {}",
        params.trading.entry_threshold,
        params.trading.exit_threshold,
        params.trading.z_window,
        params.trading.hedge_lookback
    );
    println!(
        "  portfolio: cap {}, commission {}/share, rebalance every {} triggers",
        params.allocation.gross_exposure_cap,
        params.allocation.commission_per_share,
        params.rebalance_interval
    );
    Ok(())
}
