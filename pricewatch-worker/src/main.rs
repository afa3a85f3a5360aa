//! Pricewatch Worker
//!
//! Consumes alert references from the notification queue and delivers
//! price alert notifications by email or chat message.

mod config;
mod shutdown;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{ConfigLoader, LoadedConfig, get_database_url};
use pricewatch_core::dispatcher::{EmailChannel, MessagingChannel, NotificationDispatcher};
use pricewatch_core::framework::DatabaseProcessor;
use pricewatch_core::processors::AlertConsumer;
use pricewatch_core::queue::RedisAlertQueue;
use pricewatch_sdk::{AlertMethod, AlertRef};
use pricewatch_sdk::client::AlertProducer;
use shutdown::shutdown_signal;
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Pricewatch - price alert notification worker
#[derive(Parser, Debug)]
#[command(name = "pricewatch-worker")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        env = "PRICEWATCH_CONFIG",
        default_value = "./pricewatch.toml"
    )]
    config: PathBuf,

    /// Override the number of consumers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the consumers until SIGINT or SIGTERM (default)
    Run,
    /// Push alert references onto the queue
    Enqueue {
        /// Alert identifiers
        #[arg(required = true)]
        refs: Vec<String>,
    },
    /// Move dead-lettered references back to the queue
    Redrive,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.log_json);

    tracing::info!("Starting pricewatch-worker v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(&args.config, args.workers);
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(loaded_config).await,
        Command::Enqueue { refs } => enqueue(&loaded_config, refs).await,
        Command::Redrive => redrive(&loaded_config).await,
    }
}

/// Run the consumers until a shutdown signal arrives.
async fn run(config: LoadedConfig) -> anyhow::Result<()> {
    // Get database URL from environment
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(u32::try_from(config.workers).unwrap_or(u32::MAX).max(10))
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    let dispatcher = Arc::new(build_dispatcher(&config)?);
    let repository = DatabaseProcessor::new(db_pool.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // One queue connection per consumer: a blocking pop holds its connection.
    let mut handles = Vec::with_capacity(config.workers);
    for worker in 0..config.workers {
        let queue = RedisAlertQueue::connect(&config.queue)
            .await
            .context("failed to connect to the alert queue")?;
        if worker == 0 {
            log_backlog(&queue).await;
        }
        let consumer = AlertConsumer::new(
            queue,
            repository.clone(),
            dispatcher.clone(),
            config.consumer.clone(),
        )
        .with_worker_id(worker);
        handles.push(tokio::spawn(consumer.run(shutdown_rx.clone())));
    }
    tracing::info!(workers = config.workers, queue = %config.queue.name, "Consumers started");

    if let Err(e) = shutdown_signal().await {
        tracing::error!(error = %e, "Failed to install signal handlers, shutting down");
    }
    let _ = shutdown_tx.send(true);

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Consumer task failed");
        }
    }

    // Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Worker shutdown complete");

    Ok(())
}

/// Wire every configured channel. Unconfigured ones report unsupported.
fn build_dispatcher(config: &LoadedConfig) -> anyhow::Result<NotificationDispatcher> {
    let email = EmailChannel::new(&config.smtp).context("failed to set up the email channel")?;
    let mut dispatcher = NotificationDispatcher::new(config.smtp.send_timeout)
        .with_channel(AlertMethod::Email, Arc::new(email));

    match &config.messaging {
        Some(messaging) => {
            let channel = MessagingChannel::new(messaging)
                .context("failed to set up the messaging channel")?;
            dispatcher = dispatcher.with_channel(AlertMethod::Messaging, Arc::new(channel));
            tracing::info!("Messaging channel configured");
        }
        None => tracing::warn!("No [messaging] section, chat alerts will be dropped"),
    }

    Ok(dispatcher)
}

async fn log_backlog(queue: &RedisAlertQueue) {
    match (queue.len().await, queue.dead_letter_len().await) {
        (Ok(pending), Ok(failed)) => {
            tracing::info!(queue = queue.queue_key(), pending, failed, "Queue backlog");
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Failed to read queue backlog");
        }
    }
}

/// Push references the way the web application does.
async fn enqueue(config: &LoadedConfig, refs: Vec<String>) -> anyhow::Result<()> {
    let producer = AlertProducer::connect(config.queue.redis_url.as_str())
        .await
        .context("failed to connect to the alert queue")?
        .with_queue(config.queue.name.clone())
        .with_timeout(config.queue.op_timeout);

    for raw in refs {
        let alert_ref =
            AlertRef::normalize(&raw).with_context(|| format!("invalid alert reference {raw:?}"))?;
        producer.enqueue(&alert_ref).await?;
        tracing::info!(alert_ref = %alert_ref, queue = producer.queue(), "Alert enqueued");
    }
    Ok(())
}

async fn redrive(config: &LoadedConfig) -> anyhow::Result<()> {
    if config.queue.dead_letter.is_none() {
        anyhow::bail!("dead-lettering is disabled for queue {}", config.queue.name);
    }
    let queue = RedisAlertQueue::connect(&config.queue)
        .await
        .context("failed to connect to the alert queue")?;
    let moved = queue.redrive_dead_letters().await?;
    tracing::info!(moved, queue = queue.queue_key(), "Dead letters redriven");
    println!("{moved}");
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
