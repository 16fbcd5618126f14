//! Run command handler
//!
//! Handles the run command including dry-run validation and worker startup.

use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};
use crate::jobs::parse_schedule;
use crate::worker::Worker;

/// Handler for the run command
pub struct RunCommandHandler {
    config: Settings,
}

impl RunCommandHandler {
    /// Create a new run command handler
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Execute the run command with optional dry-run support
    ///
    /// # Arguments
    /// * `dry_run` - If true, validates configuration and exits without starting the worker
    ///
    /// # Errors
    /// - Configuration validation errors
    /// - Worker startup errors (if not dry-run)
    pub async fn execute(self, dry_run: bool) -> AppResult<()> {
        if dry_run {
            self.validate_only()
        } else {
            Worker::new(self.config).run().await.map_err(AppError::from)
        }
    }

    /// Validate configuration without starting the worker
    fn validate_only(&self) -> AppResult<()> {
        self.config.validate()?;

        println!("✓ Configuration is valid");
        println!("✓ Database URL is configured");
        self.validate_schedules()?;

        println!("Dry run completed successfully - configuration is ready for deployment");
        Ok(())
    }

    /// Check the cron expressions of enabled jobs
    ///
    /// Disabled jobs are skipped, matching registration behavior: a disabled
    /// job never reaches the clock, so its expression is not parsed.
    fn validate_schedules(&self) -> AppResult<()> {
        let jobs = &self.config.jobs;
        let entries = [
            (
                "cleanup",
                jobs.cleanup.enabled,
                jobs.cleanup.schedule.as_str(),
            ),
            (
                "generation",
                jobs.generation.enabled,
                jobs.generation.schedule.as_str(),
            ),
        ];

        for (name, enabled, schedule) in entries {
            if !enabled {
                println!("- Job '{}' is disabled", name);
                continue;
            }

            parse_schedule(schedule).map_err(AppError::from)?;
            println!("✓ Job '{}' schedule is valid: {}", name, schedule);
        }

        Ok(())
    }

    /// Get the configuration
    pub fn config(&self) -> &Settings {
        &self.config
    }
}
