use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use ticketbridge::hooks::StatusHook;
use ticketbridge::queue::{wait_for_drain, HttpWebhookDelivery, JobQueue, JobWorker, RetryPolicy};
use ticketbridge::server::config::ServerConfig;
use ticketbridge::sessions::{start_all_sessions, SessionContext, SessionRegistry, SessionStarters};
use ticketbridge::version::VERSION;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Manually check for --version before full parsing to keep the simple output.
    if std::env::args().any(|arg| arg == "--version") {
        println!("Server version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    // Logging needs log_dir, so configuration errors before this point go to stderr.
    let server_config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&server_config.log_dir);
    info!(environment = %server_config.environment, "Starting server, version: {}", VERSION);

    // --- Database Pool Setup ---
    let mut opt = ConnectOptions::new(server_config.database_url.clone());
    opt.max_connections(10)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db: Arc<DatabaseConnection> = match Database::connect(opt).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to create database connection: {}", e);
            return Err(e.into());
        }
    };

    // --- Webhook Job Queue ---
    let (job_queue, job_receiver) = JobQueue::new(server_config.queue_capacity);
    let retry = RetryPolicy {
        max_attempts: server_config.webhook_max_attempts,
        ..RetryPolicy::default()
    };
    let worker_handle =
        JobWorker::new(job_receiver, Arc::new(HttpWebhookDelivery::new()), retry).spawn();

    // --- Session Bootstrap ---
    let status_hook = StatusHook::new(db.clone(), job_queue, server_config.status_locale.clone());
    let ctx = Arc::new(SessionContext::new(
        db.clone(),
        SessionRegistry::new(),
        status_hook,
        server_config.webhook_settings(),
    ));
    let starters = SessionStarters::standard(ctx.clone(), &server_config.provider_endpoints());

    let session_starts = match start_all_sessions(db.as_ref(), &starters).await {
        Ok(report) => {
            info!(
                dispatched = report.dispatched_total(),
                skipped = report.skipped.len(),
                "Channel sessions are starting in the background."
            );
            report.handles
        }
        Err(e) => {
            error!("Failed to load channels for session bootstrap: {}", e);
            Vec::new()
        }
    };

    tokio::signal::ctrl_c().await?;
    info!(live_sessions = ctx.registry.len(), "Shutdown signal received.");

    // Dropping the last queue handles lets the worker drain and exit.
    // Unfinished starts hold them too.
    for handle in &session_starts {
        handle.abort();
    }
    drop(session_starts);
    drop(starters);
    drop(ctx);
    wait_for_drain(worker_handle, Duration::from_secs(5)).await;

    Ok(())
}
