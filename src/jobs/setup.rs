use std::sync::Arc;

use tracing::error;

use crate::config::JobsConfig;
use crate::error::AppResult;
use crate::jobs::scheduler::Scheduler;
use crate::jobs::tasks::{auto_generate, retention_cleanup};
use crate::state::AppContext;

/// Builds the scheduler and registers every configured job.
///
/// A job that fails to register (for example a bad cron expression in the
/// config) is logged and skipped; the remaining jobs still run.
pub async fn setup(config: &JobsConfig, context: &AppContext) -> AppResult<Scheduler> {
    let scheduler = Scheduler::new(config).await?;

    let definitions = vec![
        retention_cleanup::job(&config.cleanup, Arc::clone(&context.play_events)),
        auto_generate::job(
            &config.generation,
            Arc::clone(&context.tasks),
            Arc::clone(&context.ai),
        ),
    ];

    for definition in definitions {
        let name = definition.name().to_string();
        if let Err(e) = scheduler.add_job(definition).await {
            error!(job = %name, error = %e, "Failed to register job");
        }
    }

    Ok(scheduler)
}
