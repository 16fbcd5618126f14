//! Run-job command handler
//!
//! Triggers a single job immediately, independent of its schedule, and
//! reports the outcome.

use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};
use crate::jobs::{self, JobError, ManualRunOutcome};
use crate::state::AppContext;

/// Handler for the run-job command
pub struct RunJobCommandHandler {
    config: Settings,
}

impl RunJobCommandHandler {
    /// Create a new run-job command handler
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Execute the named job once and report the outcome
    ///
    /// An unknown name is reported without failing the command. A failed run
    /// is printed and then returned as an error so the process exits
    /// non-zero.
    ///
    /// # Errors
    /// - Database connection errors
    /// - Scheduler construction errors
    /// - The job's own execution error
    pub async fn execute(&self, name: &str) -> AppResult<()> {
        let context = AppContext::initialize(&self.config).await?;
        let scheduler = jobs::setup(&self.config.jobs, &context).await?;

        let outcome = scheduler.run_job_now(name).await.map_err(AppError::from)?;
        println!("{}", describe_outcome(name, &outcome));

        match outcome {
            ManualRunOutcome::Failed { error, .. } => {
                Err(AppError::from(JobError::ExecutionFailed(error)))
            }
            _ => Ok(()),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Settings {
        &self.config
    }
}

/// Render a human-readable line for a manual run outcome
fn describe_outcome(name: &str, outcome: &ManualRunOutcome) -> String {
    match outcome {
        ManualRunOutcome::Completed {
            run_id,
            duration_ms,
        } => format!(
            "✓ Job '{}' completed in {} ms (run {})",
            name, duration_ms, run_id
        ),
        ManualRunOutcome::Failed {
            run_id,
            duration_ms,
            error,
        } => format!(
            "✗ Job '{}' failed after {} ms (run {}): {}",
            name, duration_ms, run_id, error
        ),
        ManualRunOutcome::NotFound => format!("Job '{}' is not registered", name),
    }
}
