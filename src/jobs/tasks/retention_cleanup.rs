use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use crate::config::CleanupJobConfig;
use crate::error::AppResult;
use crate::jobs::error::JobError;
use crate::jobs::job::JobDefinition;
use crate::jobs::types::JobContext;
use crate::repositories::PlayEventStore;

pub const JOB_NAME: &str = "retention-cleanup";

/// Builds the job that deletes play events past the retention window.
///
/// Deletion happens in bounded batches so a large backlog cannot hold one
/// long transaction open; the cancellation signal is checked between batches.
pub fn job(config: &CleanupJobConfig, events: Arc<dyn PlayEventStore>) -> JobDefinition {
    let retention_days = config.retention_days;
    let batch_size = config.delete_batch_size;

    JobDefinition::new(JOB_NAME, &config.schedule, config.enabled, move |ctx| {
        let events = Arc::clone(&events);
        run(ctx, events, retention_days, batch_size)
    })
    .with_description("Deletes play events older than the retention window")
}

async fn run(
    ctx: JobContext,
    events: Arc<dyn PlayEventStore>,
    retention_days: u32,
    batch_size: u32,
) -> AppResult<()> {
    let cutoff = (Utc::now() - Duration::days(i64::from(retention_days))).naive_utc();
    let mut total: u64 = 0;

    loop {
        if ctx.is_cancelled() {
            info!(deleted = total, "cleanup interrupted by shutdown");
            return Err(JobError::Cancelled.into());
        }

        let deleted = events
            .delete_events_before(cutoff, i64::from(batch_size))
            .await?;
        total += deleted;

        if deleted < u64::from(batch_size) {
            break;
        }
    }

    info!(deleted = total, retention_days, "play event cleanup finished");
    Ok(())
}
