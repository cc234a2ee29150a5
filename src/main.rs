use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dd_backup::api::ApiClient;
use dd_backup::config::{Config, Overrides, Settings};
use dd_backup::engine::{KindReport, Orchestrator, Outcome, SnapshotFormat};
use dd_backup::resource::{get_kind, ResourceAdapter, RestAdapter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Back up, diff and restore Datadog configuration
#[derive(Parser, Debug)]
#[command(name = "dd-backup", version = dd_backup::VERSION, about, long_about = None)]
struct Args {
    /// What to do
    #[arg(value_enum)]
    action: Action,

    /// Resource kinds to operate on (comma separated; default: all)
    #[arg(short, long, value_delimiter = ',')]
    resources: Vec<String>,

    /// Directory holding one sub-directory per resource kind
    #[arg(short, long)]
    backup_dir: Option<PathBuf>,

    /// Maximum concurrent fetches during backup
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Snapshot file format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Restore or diff a single resource id
    #[arg(long)]
    id: Option<String>,

    /// API base URL or site domain (e.g. datadoghq.eu)
    #[arg(long)]
    site: Option<String>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Action {
    Backup,
    Restore,
    Diffs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

impl From<Format> for SnapshotFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => SnapshotFormat::Json,
            Format::Yaml => SnapshotFormat::Yaml,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&PathBuf>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let (non_blocking, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(log_file.is_none())
        .with_target(false)
        .init();

    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = setup_logging(args.log_level, args.log_file.as_ref())?;

    tokio::select! {
        result = run(args) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; in-flight snapshot writes are atomic");
            std::process::exit(130);
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load();
    let overrides = Overrides {
        site: args.site.clone(),
        backup_dir: args.backup_dir.clone(),
        concurrency: args.concurrency,
        format: args.format.map(SnapshotFormat::from),
        resources: args.resources.clone(),
    };
    let settings = Settings::resolve(&config, overrides, |key| std::env::var(key).ok())?;
    tracing::info!(
        "{:?} of [{}] in {}",
        args.action,
        settings.kinds.join(", "),
        settings.backup_dir.display()
    );

    let client = ApiClient::new(&settings.site, settings.keys.clone())?;
    let orchestrator = Orchestrator::new(&settings.backup_dir, settings.concurrency, settings.format);

    let mut failed = Vec::new();
    let mut matched_id = false;
    for name in &settings.kinds {
        let kind = get_kind(name).with_context(|| format!("Unknown resource kind '{name}'"))?;
        let adapter: Arc<dyn ResourceAdapter> = Arc::new(RestAdapter::new(client.clone(), kind.clone()));

        let report = match args.action {
            Action::Backup => orchestrator.backup(adapter).await,
            Action::Restore => orchestrator.restore(adapter.as_ref(), args.id.as_deref()).await,
            Action::Diffs => orchestrator.diff_all(adapter.as_ref(), args.id.as_deref()).await,
        };

        print_report(&report);
        matched_id |= !report.statuses.is_empty();
        if !report.is_success() {
            failed.push(report.kind.clone());
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("failed resource kinds: {}", failed.join(", "));
    }
    if let (Some(id), false, Action::Restore | Action::Diffs) = (&args.id, matched_id, args.action) {
        anyhow::bail!("no snapshot named '{}' in {}", id, settings.kinds.join(", "));
    }
    Ok(())
}

fn print_report(report: &KindReport) {
    for status in &report.statuses {
        match &status.outcome {
            Outcome::Differs { diff } => println!("---- {} {}\n{}", report.kind, status.id, diff),
            Outcome::Created { new_id } if *new_id != status.id => {
                println!("{} {} created as {}", report.kind, status.id, new_id)
            }
            Outcome::Skipped { reason } | Outcome::Failed { reason } => {
                println!("{} {}: {}", report.kind, status.id, reason)
            }
            _ => {}
        }
    }
    println!("{report}");
}
