use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// What caused a run: the cron clock or an operator request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Scheduled => write!(f, "scheduled"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

/// Terminal state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
    Cancelled,
    Panicked,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
            RunStatus::Panicked => write!(f, "panicked"),
        }
    }
}

/// Job execution context passed to job bodies, one per run.
#[derive(Clone)]
pub struct JobContext {
    pub run_id: Uuid,
    pub job_name: Arc<str>,
    pub trigger: Trigger,
    cancellation: CancellationToken,
}

impl JobContext {
    pub(crate) fn new(
        run_id: Uuid,
        job_name: Arc<str>,
        trigger: Trigger,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            run_id,
            job_name,
            trigger,
            cancellation,
        }
    }

    /// True once worker shutdown has begun. Long-running bodies should check
    /// this between batches and bail out with `JobError::Cancelled`.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves when worker shutdown begins. Usable inside `tokio::select!`
    /// to abort a blocking wait.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }
}

/// Summary of the most recent completed run of a job.
#[derive(Debug, Clone, Serialize)]
pub struct LastRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub error: Option<String>,
}

/// Snapshot of one registered job, as returned by `Scheduler::jobs`.
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub name: String,
    pub description: Option<String>,
    pub schedule: String,
    pub enabled: bool,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_run: Option<LastRun>,
}

/// What happened to a manual `run_job_now` request.
///
/// An unknown name is an outcome rather than an error: triggering by hand is
/// an operator convenience and should not fail hard.
#[derive(Debug)]
pub enum ManualRunOutcome {
    Completed {
        run_id: Uuid,
        duration_ms: u64,
    },
    Failed {
        run_id: Uuid,
        duration_ms: u64,
        error: String,
    },
    NotFound,
}
