//! Worker module for managing the scheduler lifecycle.
//!
//! Handles startup logging, job registration, and graceful shutdown.

use tokio::signal;

use crate::config::{Environment, Settings};
use crate::jobs;
use crate::state::AppContext;

/// Background worker manager
pub struct Worker {
    settings: Settings,
}

impl Worker {
    /// Create a new worker with the given settings
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Start the worker and run until a shutdown signal arrives.
    ///
    /// This method:
    /// 1. Logs startup information
    /// 2. Initializes the database pool and application context
    /// 3. Registers and starts the scheduled jobs
    /// 4. Waits for Ctrl+C or SIGTERM, then drains in-flight runs
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!(
            app_name = %self.settings.application.name,
            app_version = %self.settings.application.version,
            environment = %Environment::from_env().as_str(),
            "Worker starting"
        );

        tracing::info!(
            max_connections = %self.settings.database.max_connections,
            min_connections = %self.settings.database.min_connections,
            connection_timeout = %self.settings.database.connection_timeout,
            auto_migrate = %self.settings.database.auto_migrate,
            "Database configuration loaded"
        );

        tracing::info!(
            jobs_enabled = %self.settings.jobs.enabled,
            cleanup_enabled = %self.settings.jobs.cleanup.enabled,
            generation_enabled = %self.settings.jobs.generation.enabled,
            shutdown_timeout = %self.settings.jobs.shutdown_timeout,
            "Job configuration loaded"
        );

        let context = AppContext::initialize(&self.settings).await?;
        tracing::info!("Application context created");

        let scheduler = jobs::setup(&self.settings.jobs, &context).await?;
        scheduler.start().await?;

        shutdown_signal().await;

        scheduler.stop().await?;
        tracing::info!("Worker shutdown complete");

        Ok(())
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
///
/// This function returns when either signal is received, allowing
/// the worker to perform graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
