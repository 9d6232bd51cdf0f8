use clap::Parser;
use color_eyre::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use courier::config::{self, OutputFormat};
use courier::report;
use courier::{Callback, CommandBackend, Courier, Outcome};

/// Query media metadata for one or more URLs
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Query media metadata through an external extractor on a cancellable worker"
)]
struct Args {
    /// URLs to query, processed in order
    #[arg(required = true)]
    urls: Vec<String>,

    /// Extractor executable (overrides the configured command)
    #[arg(long, value_name = "CMD")]
    backend: Option<String>,

    /// Argument passed to the extractor before the URL; replaces configured arguments
    #[arg(long = "backend-arg", value_name = "ARG", allow_hyphen_values = true)]
    backend_args: Vec<String>,

    /// Kill the extractor after this many seconds (0 disables the limit)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Cancel all pending requests after this many milliseconds
    #[arg(long, value_name = "MS")]
    cancel_after: Option<u64>,

    /// Append debug logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.log_file.as_deref())?;
    color_eyre::install()?;

    let config_result = config::load_config();
    if let Some(warning) = &config_result.warning {
        eprintln!("{}", warning);
    }
    let mut config = config_result.config;

    if let Some(command) = args.backend {
        config.backend.command = command;
    }
    if !args.backend_args.is_empty() {
        config.backend.args = args.backend_args;
    }
    if let Some(timeout_secs) = args.timeout {
        config.backend.timeout_secs = timeout_secs;
    }
    let format = args.format.unwrap_or(config.output.format);

    let backend = CommandBackend::from_config(&config.backend);
    let resolved = backend.ensure_available()?;
    log::debug!("Using backend {}", resolved.display());

    let courier = Arc::new(Courier::with_thread_name(
        backend,
        &config.worker.thread_name,
    )?);

    let mut pending = Vec::with_capacity(args.urls.len());
    for url in args.urls {
        let (callback, rx) = Callback::channel();
        courier.submit(url.as_str(), Some(callback))?;
        pending.push((url, rx));
    }

    if let Some(delay) = args.cancel_after {
        spawn_canceller(Arc::downgrade(&courier), Duration::from_millis(delay));
    }

    let outcomes = collect(pending);
    courier.shutdown();

    print_outcomes(&outcomes, format)?;

    if outcomes
        .iter()
        .any(|(_, outcome)| outcome.as_ref().is_some_and(Outcome::is_errored))
    {
        std::process::exit(1);
    }
    Ok(())
}

/// Stderr at `RUST_LOG` (default warn), or a log file at debug level
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let mut builder = env_logger::Builder::new();
            builder
                .filter_level(log::LevelFilter::Debug)
                .target(env_logger::Target::Pipe(Box::new(file)));
            builder
        }
        None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")),
    };

    builder
        .format(|buf, record| {
            let datetime = chrono::Local::now();
            writeln!(
                buf,
                "[{}] [{}] {}",
                datetime.format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .init();

    log::debug!("=== COURIER SESSION STARTED ===");
    Ok(())
}

fn spawn_canceller(courier: Weak<Courier>, delay: Duration) {
    thread::spawn(move || {
        thread::sleep(delay);
        if let Some(courier) = courier.upgrade() {
            let aborted = courier.cancel_all();
            log::debug!("--cancel-after fired, {} request(s) aborted", aborted);
        }
    });
}

/// Wait for every request; a disconnected channel means it was cancelled
fn collect(pending: Vec<(String, Receiver<Outcome>)>) -> Vec<(String, Option<Outcome>)> {
    pending
        .into_iter()
        .map(|(url, rx)| {
            let outcome = rx.recv().ok();
            (url, outcome)
        })
        .collect()
}

fn print_outcomes(outcomes: &[(String, Option<Outcome>)], format: OutputFormat) -> Result<()> {
    for (url, outcome) in outcomes {
        if outcome.is_none() {
            eprintln!("cancelled: {}", url);
        }
    }

    let mut stdout = std::io::stdout().lock();
    match format {
        OutputFormat::Text => {
            for (url, outcome) in outcomes.iter().filter(|(_, o)| o.is_some()) {
                write!(stdout, "{}", report::render_text(url, outcome.as_ref()))?;
            }
        }
        OutputFormat::Json => {
            let rendered: Vec<_> = outcomes
                .iter()
                .map(|(url, outcome)| report::render_json(url, outcome.as_ref()))
                .collect();
            writeln!(stdout, "{}", serde_json::to_string_pretty(&rendered)?)?;
        }
    }
    stdout.flush()?;
    Ok(())
}
