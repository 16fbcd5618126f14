use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{Notify, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::jobs::job::JobWork;
use crate::jobs::types::{JobContext, LastRun, RunStatus, Trigger};

/// Tracks in-flight runs per job name and remembers each job's most recent
/// completed run.
///
/// At most one run per job is admitted at a time; a fire that arrives while
/// the previous run is still going is rejected by `try_begin`.
pub struct RunTracker {
    running: RwLock<HashMap<String, Uuid>>,
    last_runs: RwLock<HashMap<String, LastRun>>,
    in_flight: AtomicUsize,
    drained: Notify,
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            running: RwLock::new(HashMap::new()),
            last_runs: RwLock::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    /// Claims the run slot for `job_name`. Returns false if a run is already
    /// in flight for that job.
    async fn try_begin(&self, job_name: &str, run_id: Uuid) -> bool {
        let mut running = self.running.write().await;
        if running.contains_key(job_name) {
            return false;
        }
        running.insert(job_name.to_string(), run_id);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        true
    }

    async fn finish(&self, job_name: &str, last_run: LastRun) {
        self.running.write().await.remove(job_name);
        self.last_runs
            .write()
            .await
            .insert(job_name.to_string(), last_run);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.drained.notify_waiters();
    }

    pub async fn is_running(&self, job_name: &str) -> bool {
        self.running.read().await.contains_key(job_name)
    }

    pub async fn last_run(&self, job_name: &str) -> Option<LastRun> {
        self.last_runs.read().await.get(job_name).cloned()
    }

    pub fn active_runs(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Waits until no runs are in flight, up to `timeout`. Returns true if
    /// everything drained in time.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register the waiter before reading the count so a run finishing
            // in between cannot be missed.
            notified.as_mut().enable();
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.in_flight.load(Ordering::SeqCst) == 0;
            }
        }
    }
}

/// What the executor did with one fire.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// The job body ran to completion (successfully or not).
    Ran(LastRun),
    /// A previous run of the same job was still active; this fire was dropped.
    Skipped,
}

/// Runs job bodies with panic containment, overlap rejection, and structured
/// outcome logging. Shared by the cron clock and the manual trigger path.
#[derive(Clone)]
pub struct JobExecutor {
    tracker: Arc<RunTracker>,
    cancellation: CancellationToken,
}

impl JobExecutor {
    pub fn new(cancellation: CancellationToken) -> Self {
        Self {
            tracker: Arc::new(RunTracker::new()),
            cancellation,
        }
    }

    pub fn tracker(&self) -> &RunTracker {
        &self.tracker
    }

    /// Executes one run of a job body.
    ///
    /// A panic inside the body is caught here and recorded as a failed run;
    /// it must never take down the clock loop. A body error that surfaces
    /// after shutdown began is classified as cancelled rather than failed.
    pub async fn execute(&self, job_name: &str, work: JobWork, trigger: Trigger) -> ExecutionOutcome {
        let run_id = Uuid::new_v4();

        if !self.tracker.try_begin(job_name, run_id).await {
            warn!(
                job = job_name,
                trigger = %trigger,
                "previous run still active, skipping this fire"
            );
            return ExecutionOutcome::Skipped;
        }

        let started_at = Utc::now();
        let start = Instant::now();

        info!(job = job_name, run = %run_id, trigger = %trigger, "job run started");

        let ctx = JobContext::new(
            run_id,
            Arc::from(job_name),
            trigger,
            self.cancellation.clone(),
        );
        let result = AssertUnwindSafe(work(ctx)).catch_unwind().await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let finished_at = Utc::now();

        // Render the whole error chain; the top-level variant alone
        // ("Internal error") says nothing useful in a log line.
        let (status, error_msg) = match result {
            Ok(Ok(())) => (RunStatus::Success, None),
            Ok(Err(e)) if self.cancellation.is_cancelled() => (
                RunStatus::Cancelled,
                Some(format!("{:#}", anyhow::Error::new(e))),
            ),
            Ok(Err(e)) => (
                RunStatus::Failed,
                Some(format!("{:#}", anyhow::Error::new(e))),
            ),
            Err(panic) => (RunStatus::Panicked, Some(panic_message(panic))),
        };

        match status {
            RunStatus::Success => {
                info!(
                    job = job_name,
                    run = %run_id,
                    trigger = %trigger,
                    duration_ms,
                    "job run succeeded"
                );
            }
            RunStatus::Cancelled => {
                warn!(
                    job = job_name,
                    run = %run_id,
                    trigger = %trigger,
                    duration_ms,
                    "job run cancelled during shutdown"
                );
            }
            RunStatus::Failed | RunStatus::Panicked => {
                error!(
                    job = job_name,
                    run = %run_id,
                    trigger = %trigger,
                    duration_ms,
                    error = error_msg.as_deref().unwrap_or_default(),
                    "job run failed"
                );
            }
        }

        let last_run = LastRun {
            run_id,
            started_at,
            finished_at,
            status,
            error: error_msg,
        };
        self.tracker.finish(job_name, last_run.clone()).await;

        ExecutionOutcome::Ran(last_run)
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::jobs::job::JobDefinition;

    fn work_of(definition: &JobDefinition) -> JobWork {
        definition.work()
    }

    fn counting_job(counter: Arc<AtomicUsize>) -> JobDefinition {
        JobDefinition::new("counting", "* * * * *", true, move |_ctx| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_successful_run_is_recorded() {
        let executor = JobExecutor::new(CancellationToken::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let job = counting_job(counter.clone());

        let outcome = executor
            .execute(job.name(), work_of(&job), Trigger::Scheduled)
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        match outcome {
            ExecutionOutcome::Ran(run) => {
                assert_eq!(run.status, RunStatus::Success);
                assert!(run.error.is_none());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let last = executor.tracker().last_run("counting").await.unwrap();
        assert_eq!(last.status, RunStatus::Success);
        assert_eq!(executor.tracker().active_runs(), 0);
    }

    #[tokio::test]
    async fn test_body_error_is_recorded_as_failed() {
        let executor = JobExecutor::new(CancellationToken::new());
        let job = JobDefinition::new("failing", "* * * * *", true, |_ctx| async {
            Err(AppError::Internal {
                source: anyhow::anyhow!("boom"),
            })
        });

        let outcome = executor
            .execute(job.name(), work_of(&job), Trigger::Scheduled)
            .await;

        match outcome {
            ExecutionOutcome::Ran(run) => {
                assert_eq!(run.status, RunStatus::Failed);
                assert!(run.error.unwrap().contains("boom"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_body_is_contained() {
        let executor = JobExecutor::new(CancellationToken::new());
        let job = JobDefinition::new("panicking", "* * * * *", true, |_ctx| async {
            panic!("job body exploded");
        });

        let outcome = executor
            .execute(job.name(), work_of(&job), Trigger::Scheduled)
            .await;

        match outcome {
            ExecutionOutcome::Ran(run) => {
                assert_eq!(run.status, RunStatus::Panicked);
                assert!(run.error.unwrap().contains("job body exploded"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        // The executor itself must stay usable after a panic.
        let counter = Arc::new(AtomicUsize::new(0));
        let job = counting_job(counter.clone());
        executor
            .execute(job.name(), work_of(&job), Trigger::Scheduled)
            .await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_overlapping_fire_is_skipped() {
        let executor = JobExecutor::new(CancellationToken::new());
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let job = {
            let started = started.clone();
            let release = release.clone();
            JobDefinition::new("slow", "* * * * *", true, move |_ctx| {
                let started = started.clone();
                let release = release.clone();
                async move {
                    started.notify_one();
                    release.notified().await;
                    Ok(())
                }
            })
        };

        let work = work_of(&job);
        let first = tokio::spawn({
            let executor = executor.clone();
            let work = work.clone();
            async move { executor.execute("slow", work, Trigger::Scheduled).await }
        });

        started.notified().await;
        assert!(executor.tracker().is_running("slow").await);

        let second = executor.execute("slow", work, Trigger::Scheduled).await;
        assert!(matches!(second, ExecutionOutcome::Skipped));

        release.notify_one();
        let first = first.await.unwrap();
        assert!(matches!(
            first,
            ExecutionOutcome::Ran(LastRun {
                status: RunStatus::Success,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_error_after_cancellation_is_classified_cancelled() {
        let token = CancellationToken::new();
        let executor = JobExecutor::new(token.clone());
        token.cancel();

        let job = JobDefinition::new("interruptible", "* * * * *", true, |ctx| async move {
            if ctx.is_cancelled() {
                return Err(AppError::Internal {
                    source: anyhow::anyhow!("interrupted by shutdown"),
                });
            }
            Ok(())
        });

        let outcome = executor
            .execute(job.name(), work_of(&job), Trigger::Scheduled)
            .await;

        match outcome {
            ExecutionOutcome::Ran(run) => assert_eq!(run.status, RunStatus::Cancelled),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wait_idle_returns_once_runs_finish() {
        let executor = JobExecutor::new(CancellationToken::new());
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let job = {
            let started = started.clone();
            let release = release.clone();
            JobDefinition::new("draining", "* * * * *", true, move |_ctx| {
                let started = started.clone();
                let release = release.clone();
                async move {
                    started.notify_one();
                    release.notified().await;
                    Ok(())
                }
            })
        };

        let handle = tokio::spawn({
            let executor = executor.clone();
            let work = work_of(&job);
            async move { executor.execute("draining", work, Trigger::Scheduled).await }
        });

        started.notified().await;
        assert_eq!(executor.tracker().active_runs(), 1);

        release.notify_one();
        assert!(executor.tracker().wait_idle(Duration::from_secs(5)).await);
        assert_eq!(executor.tracker().active_runs(), 0);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_idle_gives_up_after_timeout() {
        let executor = JobExecutor::new(CancellationToken::new());
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let job = {
            let started = started.clone();
            let release = release.clone();
            JobDefinition::new("stuck", "* * * * *", true, move |_ctx| {
                let started = started.clone();
                let release = release.clone();
                async move {
                    started.notify_one();
                    release.notified().await;
                    Ok(())
                }
            })
        };

        let handle = tokio::spawn({
            let executor = executor.clone();
            let work = work_of(&job);
            async move { executor.execute("stuck", work, Trigger::Scheduled).await }
        });

        started.notified().await;
        assert!(!executor.tracker().wait_idle(Duration::from_millis(50)).await);
        assert_eq!(executor.tracker().active_runs(), 1);

        release.notify_one();
        handle.await.unwrap();
    }
}
