//! Preheat - Warmup controller entry point
//!
//! Owns the service lifecycle: configuration, database, and the four
//! periodic drivers (daily scheduling, job execution, interaction sweeps,
//! health monitoring). The drivers run on independent cadences and share
//! no in-process state beyond the service itself.

use anyhow::Result;
use chrono::Utc;
use preheat_common::config::Config;
use preheat_core::{NoopNotifier, Notifier, SmtpTransport, UnmeteredQuota, WarmupService, WebhookNotifier};
use preheat_storage::db::DatabasePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting Preheat warmup controller...");

    // Initialize database
    let db_pool = DatabasePool::new(&config.database).await?;

    // Run migrations
    db_pool.migrate().await?;

    // Wire up the external contracts
    let transport = Arc::new(SmtpTransport::new(config.smtp.clone()));
    let quota = Arc::new(UnmeteredQuota);

    let notifier: Arc<dyn Notifier> = match WebhookNotifier::from_config(&config.notify) {
        Some(webhook) => {
            info!("Webhook notifier configured");
            Arc::new(webhook)
        }
        None => {
            info!("No notification webhook configured");
            Arc::new(NoopNotifier)
        }
    };

    // Construct the warmup service
    let service = Arc::new(WarmupService::new(
        &db_pool,
        transport,
        quota,
        notifier,
        &config.warmup,
    ));

    info!(
        schedule_secs = config.warmup.schedule_interval_secs,
        execute_secs = config.warmup.execute_interval_secs,
        sweep_secs = config.warmup.sweep_interval_secs,
        monitor_secs = config.warmup.monitor_interval_secs,
        "Starting warmup drivers"
    );

    // Daily job scheduling
    let schedule_handle = {
        let service = service.clone();
        let mut ticker = interval(Duration::from_secs(config.warmup.schedule_interval_secs));
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                if let Err(e) = service.schedule_daily_jobs(Utc::now()).await {
                    error!("Daily scheduling error: {}", e);
                }
            }
        })
    };

    // Job execution
    let execute_handle = {
        let service = service.clone();
        let mut ticker = interval(Duration::from_secs(config.warmup.execute_interval_secs));
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                if let Err(e) = service.execute_due_jobs(Utc::now()).await {
                    error!("Job execution error: {}", e);
                }
            }
        })
    };

    // Interaction simulation sweeps
    let sweep_handle = {
        let service = service.clone();
        let mut ticker = interval(Duration::from_secs(config.warmup.sweep_interval_secs));
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                if let Err(e) = service.sweep_interactions(Utc::now()).await {
                    error!("Interaction sweep error: {}", e);
                }
            }
        })
    };

    // Health monitoring
    let monitor_handle = {
        let service = service.clone();
        let mut ticker = interval(Duration::from_secs(config.warmup.monitor_interval_secs));
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                if let Err(e) = service.run_health_checks(Utc::now()).await {
                    error!("Health monitor error: {}", e);
                }
            }
        })
    };

    info!("Preheat started successfully");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    schedule_handle.abort();
    execute_handle.abort();
    sweep_handle.abort();
    monitor_handle.abort();

    info!("Preheat shutdown complete");

    Ok(())
}

fn init_logging(config: &preheat_common::config::LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    if config.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(filter)
            .init();
    }
}
