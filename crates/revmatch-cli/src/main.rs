//! RevMatch - live gear and rev-match logger
//!
//! Polls an ELM327 adapter (or the demo simulator, or a recorded log),
//! estimates the engaged gear and the rev-match target for a downshift, and
//! logs one row per sample.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use revmatch_core::datalog::{ConsoleSink, DataLogger, LogFormat, LogPlayer, TelemetrySink};
use revmatch_core::demo::{DemoSimulator, DEFAULT_SAMPLE_INTERVAL_MS};
use revmatch_core::estimator::{GearEstimator, GearProfile};
use revmatch_core::protocol::{list_ports, Elm327, DEFAULT_BAUD_RATE};
use revmatch_core::runner::{run, RunOptions};
use revmatch_core::source::{Elm327Source, MonotonicClock, TelemetrySource};

#[cfg(windows)]
const DEFAULT_PORT: &str = "COM9";
#[cfg(not(windows))]
const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Output path meaning "console only"
const CONSOLE_OUTPUT: &str = "-";

#[derive(Parser, Debug)]
#[command(name = "revmatch")]
#[command(about = "Live gear and rev-match estimation from an ELM327 OBD-II adapter")]
#[command(version)]
struct CliArgs {
    /// Gear profile file
    #[arg(short, long, value_name = "FILE", default_value = "config.txt")]
    config: PathBuf,

    /// Log file (.csv, .jsonl); "-" logs to the console only
    /// Default: logs/<date>_<time>.csv
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Serial port of the adapter
    #[arg(short, long, env = "REVMATCH_PORT", default_value = DEFAULT_PORT)]
    port: String,

    /// Serial baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Use the simulated drive cycle instead of an adapter; rows are echoed
    /// to the console
    #[arg(short, long, conflicts_with = "replay")]
    test: bool,

    /// Re-estimate a previously recorded CSV log
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Seed for the simulated drive cycle (reproducible runs)
    #[arg(long, requires = "test")]
    seed: Option<u64>,

    /// Stop after this many logged rows
    #[arg(short = 'n', long)]
    samples: Option<u64>,

    /// Enable debug output (overrides RUST_LOG)
    #[arg(short, long)]
    debug: bool,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found");
        return;
    }
    for port in ports {
        let marker = if port.is_likely_adapter() { "*" } else { " " };
        match &port.product {
            Some(product) => println!("{} {}  ({})", marker, port.name, product),
            None => println!("{} {}", marker, port.name),
        }
    }
}

type BoxedSource = Box<dyn TelemetrySource + Send>;
type BoxedSink = Box<dyn TelemetrySink + Send>;

/// Pick the sample source and the pause between cycles
fn open_source(args: &CliArgs, profile: Arc<GearProfile>) -> Result<(BoxedSource, Option<Duration>)> {
    if args.test {
        info!("Input: simulated drive cycle");
        let sim = match args.seed {
            Some(seed) => DemoSimulator::with_seed(profile, seed),
            None => DemoSimulator::new(profile),
        };
        let pace = Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS.unsigned_abs());
        return Ok((Box::new(sim), Some(pace)));
    }

    if let Some(path) = &args.replay {
        info!("Input: replay of {}", path.display());
        let player = LogPlayer::load_csv(path)
            .with_context(|| format!("Failed to read log {}", path.display()))?;
        if player.is_empty() {
            warn!("{} contains no samples", path.display());
        }
        return Ok((Box::new(player), None));
    }

    info!("Input: ELM327 on {} at {} baud", args.port, args.baud);
    let adapter = Elm327::open(&args.port, args.baud)
        .with_context(|| format!("Failed to initialise ELM327 on {}", args.port))?;
    Ok((Box::new(Elm327Source::new(adapter, MonotonicClock::new())), None))
}

fn default_output_path() -> PathBuf {
    Path::new("logs").join(format!("{}.csv", Local::now().format("%Y-%m-%d_%H-%M-%S")))
}

fn open_file_sink(path: &Path) -> Result<DataLogger<std::fs::File>> {
    let format = LogFormat::from_extension(path).unwrap_or_else(|| {
        warn!("Unrecognised log extension for {}, writing CSV", path.display());
        LogFormat::Csv
    });
    DataLogger::create(path, format)
        .with_context(|| format!("Failed to create log file {}", path.display()))
}

/// Pick where rows go
fn open_sink(args: &CliArgs) -> Result<BoxedSink> {
    let path = match &args.output {
        Some(path) if path.as_os_str() == CONSOLE_OUTPUT => {
            return Ok(Box::new(ConsoleSink::new()));
        }
        Some(path) => path.clone(),
        None => default_output_path(),
    };

    let logger = open_file_sink(&path)?;
    if args.test {
        Ok(Box::new((logger, ConsoleSink::new())))
    } else {
        Ok(Box::new(logger))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.debug);

    if args.list_ports {
        print_ports();
        return Ok(());
    }

    let profile = revmatch_core::config::load_gear_profile(&args.config)
        .with_context(|| format!("Failed to load gear profile {}", args.config.display()))?;
    profile.log_summary();
    let profile = Arc::new(profile);

    let (source, poll_interval) = open_source(&args, profile.clone())?;
    let sink = open_sink(&args)?;

    // Graceful shutdown via Ctrl+C
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, stopping");
        shutdown.cancel();
    });

    let options = RunOptions {
        max_samples: args.samples,
        poll_interval,
    };

    let summary = tokio::task::spawn_blocking(move || {
        let mut source = source;
        let mut sink = sink;
        let mut estimator = GearEstimator::new(profile);
        run(&mut source, &mut estimator, &mut sink, &cancel, &options)
    })
    .await
    .context("Acquisition task panicked")??;

    info!(
        "Logged {} rows ({} skipped, {} decode faults)",
        summary.rows_logged, summary.samples_skipped, summary.decode_faults
    );
    Ok(())
}
