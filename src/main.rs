use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pageload_watch::probe::parse_url;
use pageload_watch::{
    HttpProbe, Monitor, RecordStore, RedisStore, RetentionManager, Sampler, Settings,
};

#[derive(Parser, Debug)]
#[command(name = "pageload-watch")]
#[command(about = "Record median page-load times per endpoint with a rolling history")]
struct Args {
    /// TOML settings file (overridden by PAGELOAD_* variables and flags)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Redis URL holding the collection
    #[arg(long, global = true)]
    redis_url: Option<String>,

    /// Collection name
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Days of history to keep
    #[arg(long, global = true)]
    retention_days: Option<u32>,

    /// Log filter, e.g. "info" or "pageload_watch=debug" (RUST_LOG wins)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Measure every endpoint once and update its history (default)
    Run,
    /// Start monitoring a URL
    Add { url: String },
    /// Print each endpoint's summary for its newest day as JSON
    Report,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(&args);

    let settings = load_settings(&args)?;
    let store = RedisStore::open(&settings.redis_url, &settings.collection)
        .await
        .with_context(|| format!("cannot connect to Redis at {}", settings.redis_url))?;

    match args.command.clone().unwrap_or(Command::Run) {
        Command::Run => run(store, &settings).await,
        Command::Add { url } => {
            parse_url(&url)?;
            store.add_partition(&url).await?;
            info!(endpoint = %url, collection = %settings.collection, "endpoint added");
            Ok(ExitCode::SUCCESS)
        }
        Command::Report => report(store, &settings).await,
    }
}

fn init_logging(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let fmt = tracing_subscriber::fmt().with_env_filter(filter);
    match args.log_format {
        LogFormat::Json => fmt.json().init(),
        LogFormat::Text => fmt.init(),
    }
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref())?;

    if let Some(url) = &args.redis_url {
        settings.redis_url = url.clone();
    }
    if let Some(name) = &args.collection {
        settings.collection = name.clone();
    }
    if let Some(days) = args.retention_days {
        settings.retention_days = days;
    }

    settings.validate()?;
    Ok(settings)
}

async fn run(store: RedisStore, settings: &Settings) -> Result<ExitCode> {
    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   ⏱   PAGE LOAD WATCH                            ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    let history = RetentionManager::new(store, settings.retention());
    let probe = HttpProbe::new(settings.probe_timeout(), settings.reachability_timeout());
    let sampler = Sampler::new(probe, settings.sample_count);
    let mut monitor = Monitor::new(history, sampler, &settings.summary_sheet);

    let report = monitor.run().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn report(store: RedisStore, settings: &Settings) -> Result<ExitCode> {
    let history = RetentionManager::new(store, settings.retention());
    let mut summaries = BTreeMap::new();

    for endpoint in history.store().titles().await? {
        if endpoint == settings.summary_sheet {
            continue;
        }
        let summary = history.summary(&endpoint).await?;
        summaries.insert(endpoint, summary);
    }

    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(ExitCode::SUCCESS)
}
