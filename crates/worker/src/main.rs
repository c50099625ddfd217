use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use leadflow_engine::AutomationEngine;
use leadflow_queue::JobWorker;
use leadflow_timeline::InMemoryTimeline;

mod config;
mod factory;
mod telemetry;

use config::WorkerFileConfig;

/// Leadflow automation worker.
#[derive(Parser, Debug)]
#[command(name = "leadflow-worker", about = "Standalone automation worker for Leadflow")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "leadflow.toml")]
    config: String,

    /// Override the number of concurrent consumers.
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from the TOML file, or use defaults if the
    // file does not exist.
    let config: WorkerFileConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        WorkerFileConfig::default()
    };

    telemetry::init();

    if !Path::new(&cli.config).exists() {
        info!(path = %cli.config, "config file not found, using defaults");
    }

    // Connect every backend up front; the engine takes explicit
    // handles and never lazily initializes connections.
    let stores = factory::create_stores(&config.store).await?;
    let queue = factory::create_queue(&config.queue)?;
    let messenger = factory::create_messenger(config.smtp.as_ref())?;
    // The timeline is owned by the CRM application; the worker keeps a
    // process-local sink until one is wired in.
    let timeline = Arc::new(InMemoryTimeline::new());

    let engine = AutomationEngine::builder()
        .definitions(stores.definitions)
        .enrollments(stores.enrollments)
        .leads(stores.leads)
        .templates(stores.templates)
        .timeline(timeline)
        .messenger(messenger)
        .queue(Arc::clone(&queue))
        .build()?;

    let mut worker_config = config.worker.resolve();
    if let Some(concurrency) = cli.concurrency {
        worker_config.concurrency = concurrency;
    }

    info!(
        concurrency = worker_config.concurrency,
        "automation worker starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = JobWorker::new(queue, Arc::new(engine), worker_config);
    let worker_task = tokio::spawn(async move { worker.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining consumers");
    shutdown_tx.send(true)?;
    worker_task.await?;

    info!("automation worker stopped");
    Ok(())
}
