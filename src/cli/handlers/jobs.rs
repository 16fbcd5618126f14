//! Jobs command handler
//!
//! Composes the scheduler from configuration and prints the registered jobs
//! without starting the clock or opening database connections.

use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};
use crate::jobs::{self, JobInfo};
use crate::state::AppContext;

/// Handler for the jobs command
pub struct JobsCommandHandler {
    config: Settings,
}

impl JobsCommandHandler {
    /// Create a new jobs command handler
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Execute the jobs command
    ///
    /// # Arguments
    /// * `json` - If true, prints the job list as JSON instead of a table
    ///
    /// # Errors
    /// - Scheduler construction errors
    /// - Serialization errors (JSON output)
    pub async fn execute(&self, json: bool) -> AppResult<()> {
        let context = AppContext::detached(&self.config)?;
        let scheduler = jobs::setup(&self.config.jobs, &context).await?;
        let jobs = scheduler.jobs().await;

        if json {
            let rendered =
                serde_json::to_string_pretty(&jobs).map_err(|e| AppError::Internal {
                    source: anyhow::Error::from(e),
                })?;
            println!("{}", rendered);
        } else {
            print!("{}", render_table(&jobs));
        }

        Ok(())
    }

    /// Get the configuration
    pub fn config(&self) -> &Settings {
        &self.config
    }
}

/// Render the job list as a fixed-width table
fn render_table(jobs: &[JobInfo]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<22} {:<8} {:<16} {}\n",
        "NAME", "ENABLED", "SCHEDULE", "NEXT RUN (UTC)"
    ));

    for job in jobs {
        let enabled = if job.enabled { "yes" } else { "no" };
        let next_run = job
            .next_run_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<22} {:<8} {:<16} {}\n",
            job.name, enabled, job.schedule, next_run
        ));
    }

    out
}
