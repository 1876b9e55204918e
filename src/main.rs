use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use taskd::{config::ServerConfig, rest, storage::TaskStore, AppContext};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "taskd",
    about = "Tasks REST API — small CRUD service over SQLite",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port
    #[arg(long, env = "TASKD_PORT")]
    port: Option<u16>,

    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "TASKD_BIND")]
    bind_address: Option<String>,

    /// Database connection string, e.g. sqlite:///var/lib/taskd/tasks.db?mode=rwc
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKD_LOG")]
    log: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TASKD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,

    /// Log format: text or json
    #[arg(long, env = "TASKD_LOG_FORMAT", default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default when no subcommand given).
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log.clone().unwrap_or_else(|| "info".to_string());
    let _guard = init_logging(&log_level, args.log_file.as_deref(), &args.log_format);

    match args.command {
        Some(Command::Serve) | None => serve(args).await,
    }
}

async fn serve(args: Args) -> Result<()> {
    let config = Arc::new(ServerConfig::new(
        args.port,
        args.bind_address,
        args.database_url,
    ));

    info!("opening database at {}", config.database_url);
    let store = TaskStore::connect(&config.database_url).await?;

    let ctx = Arc::new(AppContext {
        config,
        store: Arc::new(store),
        started_at: std::time::Instant::now(),
    });

    rest::start_rest_server(ctx).await
}

/// Initialise tracing: env-filtered, compact or JSON, optionally teed to a
/// daily-rotated log file. Returns the appender guard that must stay alive
/// for the file writer to flush.
fn init_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    let Some(path) = log_file else {
        if use_json {
            tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        } else {
            tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        }
        return None;
    };

    let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let filename = path
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("taskd.log"));

    // The directory must exist before tracing-appender tries to open it.
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!(
            "warn: could not create log directory '{}': {e}; falling back to stdout",
            dir.display()
        );
        if use_json {
            tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        } else {
            tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        }
        return None;
    }

    let appender = tracing_appender::rolling::daily(dir, filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    if use_json {
        tracing_subscriber::registry()
            .with(EnvFilter::new(log_level))
            .with(fmt::layer().json())
            .with(fmt::layer().json().with_writer(non_blocking))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(EnvFilter::new(log_level))
            .with(fmt::layer().compact())
            .with(fmt::layer().with_writer(non_blocking))
            .init();
    }

    Some(guard)
}
