use book_divergence::analytics::{DivergenceEngine, EngineSettings, InstrumentTarget};
use book_divergence::collector::{BooksClient, RocksEventStore};
use book_divergence::config::AnalyticsConfig;
use book_divergence::report;
use book_divergence::DivergenceError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How often stored events are checked against the retention period
const RETENTION_INTERVAL: Duration = Duration::from_secs(3600);

/// Command-line options
struct CliArgs {
    once: bool,
    interval: Option<Duration>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args);

    // Reports go to the log on stderr
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = AnalyticsConfig::from_env()?;
    let interval = cli.interval.unwrap_or(config.poll_interval);

    tracing::info!(
        instruments = config.instruments.len(),
        workers = config.workers,
        interval_secs = interval.as_secs(),
        store = %config.event_store_path.display(),
        "Starting book divergence service"
    );

    let store = Arc::new(RocksEventStore::new(&config.event_store_path)?);
    let client = BooksClient::new(&config.remote_books_url, config.requests_per_second)?;
    let engine = DivergenceEngine::new(
        Arc::clone(&store),
        Arc::new(client),
        EngineSettings::from(&config),
    );
    let targets: Vec<InstrumentTarget> = config
        .instruments
        .iter()
        .map(InstrumentTarget::new)
        .collect();

    // Cancel the in-flight cycle on Ctrl+C
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received shutdown signal (Ctrl+C)");
                signal_token.cancel();
            }
            Err(err) => {
                tracing::error!("Failed to listen for shutdown signal: {}", err);
            }
        }
    });

    // Hourly retention pass over the event store
    let retention_store = Arc::clone(&store);
    let retention_token = shutdown.clone();
    let retention = config.retention;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RETENTION_INTERVAL);
        loop {
            tokio::select! {
                _ = retention_token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
            let cutoff = chrono::Utc::now().timestamp_millis().saturating_sub(retention_ms);
            match retention_store.prune_before(cutoff).await {
                Ok(deleted) => tracing::info!(deleted, cutoff, "Pruned expired events"),
                Err(e) => tracing::warn!("Event retention pass failed: {:#}", e),
            }
        }
    });

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match engine.run_cycle(&targets, &shutdown).await {
            Ok(cycle) => {
                tracing::info!("\n{}", report::render_markdown(&cycle));
                match report::render_json(&cycle) {
                    Ok(json) => tracing::debug!(cycle_id = %cycle.cycle_id, "{}", json),
                    Err(e) => tracing::warn!("Failed to serialize cycle report: {}", e),
                }
            }
            Err(DivergenceError::Cancelled) => break,
            Err(e) => tracing::error!("Divergence cycle failed: {}", e),
        }

        if cli.once {
            break;
        }
    }

    tracing::info!("Book divergence service stopped");
    Ok(())
}

/// Parse command-line arguments
fn parse_args(args: &[String]) -> CliArgs {
    let mut cli = CliArgs {
        once: false,
        interval: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--once" => cli.once = true,
            "--interval" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse::<u64>() {
                        Ok(secs) if secs > 0 => cli.interval = Some(Duration::from_secs(secs)),
                        _ => {
                            eprintln!("Invalid interval: {}", args[i + 1]);
                            print_usage();
                            std::process::exit(1);
                        }
                    }
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Print usage information
fn print_usage() {
    println!("Book Divergence - replays recorded order book events and scores them against remote books");
    println!();
    println!("USAGE:");
    println!("    book-divergence [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --once                Run a single cycle and exit");
    println!("    --interval <SECS>     Seconds between cycles (default: DIVERGENCE_POLL_INTERVAL_SECS)");
    println!("    --help, -h            Print this help message");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    DIVERGENCE_INSTRUMENTS          Comma-separated instrument ids (required)");
    println!("    DIVERGENCE_WINDOW_BEFORE_MS     Window start before the target time (default: 1000)");
    println!("    DIVERGENCE_WINDOW_AFTER_MS      Window end after the target time (default: 1000)");
    println!("    DIVERGENCE_POLL_INTERVAL_SECS   Seconds between cycles (default: 4)");
    println!("    DIVERGENCE_SETTLE_MS            Wait past the window before reading events (default: 500)");
    println!("    DIVERGENCE_WORKERS              Instruments evaluated concurrently (default: cores)");
    println!("    DIVERGENCE_METRIC               attenuated or plain (default: attenuated)");
    println!("    DIVERGENCE_PERCENTILES          canonical or extended (default: canonical)");
    println!("    EVENT_STORE_PATH                RocksDB event store (default: ./data/events)");
    println!("    EVENT_RETENTION_SECS            Stored event retention (default: 604800)");
    println!("    REMOTE_BOOKS_URL                Remote books API (default: https://clob.polymarket.com)");
    println!("    REMOTE_REQUESTS_PER_SECOND      Remote request rate (default: 5)");
    println!("    RUST_LOG                        Logging level (default: info)");
    println!();
    println!("EXAMPLES:");
    println!("    # Score two instruments once");
    println!("    DIVERGENCE_INSTRUMENTS=123,456 book-divergence --once");
}
