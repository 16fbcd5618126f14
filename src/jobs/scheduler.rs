use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler as CronClock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::JobsConfig;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::executor::{ExecutionOutcome, JobExecutor};
use crate::jobs::job::JobDefinition;
use crate::jobs::schedule::{clock_expression, next_fire, parse_schedule};
use crate::jobs::types::{JobInfo, ManualRunOutcome, RunStatus, Trigger};

struct RegisteredJob {
    definition: JobDefinition,
    /// Parsed schedule, kept for next-fire computation. None for disabled jobs.
    schedule: Option<cron::Schedule>,
    /// Handle of the entry registered with the clock. None for disabled jobs.
    clock_id: Option<Uuid>,
}

/// Cron-driven scheduler around tokio-cron-scheduler.
///
/// Owns the background clock, the registry of job definitions, and the shared
/// cancellation token that job bodies observe during shutdown. Lifecycle is
/// one-way: construct, register jobs, `start`, and finally `stop`; a stopped
/// scheduler is not restarted.
pub struct Scheduler {
    clock: Arc<Mutex<CronClock>>,
    jobs: Arc<RwLock<Vec<RegisteredJob>>>,
    executor: Arc<JobExecutor>,
    cancellation: CancellationToken,
    enabled: bool,
    shutdown_timeout: Duration,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl Scheduler {
    pub async fn new(config: &JobsConfig) -> JobResult<Self> {
        let clock = CronClock::new()
            .await
            .map_err(|e| JobError::Scheduler(e.to_string()))?;
        let cancellation = CancellationToken::new();

        Ok(Self {
            clock: Arc::new(Mutex::new(clock)),
            jobs: Arc::new(RwLock::new(Vec::new())),
            executor: Arc::new(JobExecutor::new(cancellation.clone())),
            cancellation,
            enabled: config.enabled,
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    /// Registers a job definition.
    ///
    /// Enabled jobs must carry a valid 5-field cron expression and are handed
    /// to the clock. Disabled jobs are kept in the registry (visible in
    /// `jobs`, runnable via `run_job_now`) but never scheduled. Names must be
    /// unique; a duplicate is rejected rather than silently shadowed.
    pub async fn add_job(&self, definition: JobDefinition) -> JobResult<()> {
        if definition.name().trim().is_empty() {
            return Err(JobError::InvalidDefinition(
                "job name must not be empty".to_string(),
            ));
        }
        if definition.schedule().trim().is_empty() {
            return Err(JobError::InvalidDefinition(format!(
                "job {:?} has an empty schedule",
                definition.name()
            )));
        }

        let mut jobs = self.jobs.write().await;
        if jobs.iter().any(|j| j.definition.name() == definition.name()) {
            return Err(JobError::AlreadyExists(definition.name().to_string()));
        }

        if !definition.enabled() {
            info!(job = definition.name(), "job disabled, registered without schedule");
            jobs.push(RegisteredJob {
                definition,
                schedule: None,
                clock_id: None,
            });
            return Ok(());
        }

        let schedule = parse_schedule(definition.schedule())?;

        let executor = Arc::clone(&self.executor);
        let job_name = definition.name().to_string();
        let work = definition.work();

        let clock_job = Job::new_async(
            clock_expression(definition.schedule()).as_str(),
            move |_uuid, _lock| {
                let executor = Arc::clone(&executor);
                let job_name = job_name.clone();
                let work = Arc::clone(&work);

                Box::pin(async move {
                    executor.execute(&job_name, work, Trigger::Scheduled).await;
                })
            },
        )
        .map_err(|e| JobError::InvalidCronExpression {
            expression: definition.schedule().to_string(),
            reason: e.to_string(),
        })?;

        let clock_id = self
            .clock
            .lock()
            .await
            .add(clock_job)
            .await
            .map_err(|e| JobError::Scheduler(e.to_string()))?;

        info!(
            job = definition.name(),
            schedule = definition.schedule(),
            "job registered"
        );

        jobs.push(RegisteredJob {
            definition,
            schedule: Some(schedule),
            clock_id: Some(clock_id),
        });

        Ok(())
    }

    /// Starts the clock. A no-op (with a log line) when background jobs are
    /// globally disabled.
    pub async fn start(&self) -> JobResult<()> {
        if !self.enabled {
            info!("background jobs disabled, scheduler clock not started");
            return Ok(());
        }

        self.clock
            .lock()
            .await
            .start()
            .await
            .map_err(|e| JobError::Scheduler(e.to_string()))?;
        self.started.store(true, Ordering::SeqCst);

        let scheduled = self
            .jobs
            .read()
            .await
            .iter()
            .filter(|j| j.clock_id.is_some())
            .count();
        info!(jobs = scheduled, "scheduler started");

        Ok(())
    }

    /// Stops the clock, cancels the shared token, and waits for in-flight
    /// runs to drain, bounded by the configured shutdown timeout. Idempotent;
    /// there is no restart path.
    pub async fn stop(&self) -> JobResult<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!("scheduler stopping, cancelling in-flight runs");
        self.cancellation.cancel();

        if self.started.load(Ordering::SeqCst) {
            self.clock
                .lock()
                .await
                .shutdown()
                .await
                .map_err(|e| JobError::Scheduler(e.to_string()))?;
        }

        let active = self.executor.tracker().active_runs();
        if active > 0 {
            info!(
                active,
                timeout_secs = self.shutdown_timeout.as_secs(),
                "waiting for in-flight runs to finish"
            );
        }

        if self.executor.tracker().wait_idle(self.shutdown_timeout).await {
            info!("scheduler stopped");
        } else {
            warn!(
                abandoned = self.executor.tracker().active_runs(),
                "shutdown timeout elapsed, abandoning in-flight runs"
            );
        }

        Ok(())
    }

    /// Runs a job immediately by name, bypassing the clock and the `enabled`
    /// flag, and waits for it to finish.
    ///
    /// An unknown name is a benign `NotFound` outcome. A job whose previous
    /// run is still active is an `AlreadyRunning` error.
    pub async fn run_job_now(&self, name: &str) -> JobResult<ManualRunOutcome> {
        let work = {
            let jobs = self.jobs.read().await;
            match jobs.iter().find(|j| j.definition.name() == name) {
                Some(job) => job.definition.work(),
                None => {
                    warn!(job = name, "manual run requested for unknown job");
                    return Ok(ManualRunOutcome::NotFound);
                }
            }
        };

        info!(job = name, "manual run requested");

        match self.executor.execute(name, work, Trigger::Manual).await {
            ExecutionOutcome::Ran(run) => {
                let duration_ms = (run.finished_at - run.started_at).num_milliseconds().max(0) as u64;
                match run.status {
                    RunStatus::Success => Ok(ManualRunOutcome::Completed {
                        run_id: run.run_id,
                        duration_ms,
                    }),
                    _ => Ok(ManualRunOutcome::Failed {
                        run_id: run.run_id,
                        duration_ms,
                        error: run.error.unwrap_or_else(|| run.status.to_string()),
                    }),
                }
            }
            ExecutionOutcome::Skipped => Err(JobError::AlreadyRunning(name.to_string())),
        }
    }

    /// Snapshot of every registered job. Safe to call concurrently with
    /// ticking.
    pub async fn jobs(&self) -> Vec<JobInfo> {
        let now = Utc::now();
        let active = self.enabled && !self.stopped.load(Ordering::SeqCst);
        let jobs = self.jobs.read().await;
        let mut infos = Vec::with_capacity(jobs.len());

        for job in jobs.iter() {
            let last_run = self.executor.tracker().last_run(job.definition.name()).await;
            let next_run_at = if active {
                job.schedule.as_ref().and_then(|s| next_fire(s, &now))
            } else {
                None
            };

            infos.push(JobInfo {
                name: job.definition.name().to_string(),
                description: job.definition.description().map(str::to_string),
                schedule: job.definition.schedule().to_string(),
                enabled: job.definition.enabled(),
                next_run_at,
                last_run,
            });
        }

        infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use tokio::sync::Notify;

    use crate::error::AppError;

    fn test_config() -> JobsConfig {
        JobsConfig {
            shutdown_timeout: 5,
            ..JobsConfig::default()
        }
    }

    fn counting_job(name: &str, schedule: &str, enabled: bool, counter: Arc<AtomicUsize>) -> JobDefinition {
        JobDefinition::new(name, schedule, enabled, move |_ctx| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_add_job_appears_with_future_next_fire() {
        let scheduler = Scheduler::new(&test_config()).await.unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler
            .add_job(
                counting_job("nightly", "30 4 * * *", true, counter)
                    .with_description("nightly maintenance"),
            )
            .await
            .unwrap();

        let jobs = scheduler.jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "nightly");
        assert_eq!(jobs[0].schedule, "30 4 * * *");
        assert!(jobs[0].enabled);
        assert_eq!(jobs[0].description.as_deref(), Some("nightly maintenance"));
        assert!(jobs[0].next_run_at.unwrap() > Utc::now());
        assert!(jobs[0].last_run.is_none());
    }

    #[tokio::test]
    async fn test_add_job_rejects_invalid_cron() {
        let scheduler = Scheduler::new(&test_config()).await.unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let err = scheduler
            .add_job(counting_job("bogus", "bogus", true, counter))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidCronExpression { .. }));

        assert!(scheduler.jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_job_rejects_duplicate_names() {
        let scheduler = Scheduler::new(&test_config()).await.unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler
            .add_job(counting_job("twin", "0 2 * * *", true, counter.clone()))
            .await
            .unwrap();
        let err = scheduler
            .add_job(counting_job("twin", "0 3 * * *", true, counter))
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::AlreadyExists(name) if name == "twin"));
        assert_eq!(scheduler.jobs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_job_rejects_blank_name_and_schedule() {
        let scheduler = Scheduler::new(&test_config()).await.unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let err = scheduler
            .add_job(counting_job("  ", "0 2 * * *", true, counter.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidDefinition(_)));

        let err = scheduler
            .add_job(counting_job("named", "", true, counter))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidDefinition(_)));
    }

    #[tokio::test]
    async fn test_disabled_job_is_registered_but_not_scheduled() {
        let scheduler = Scheduler::new(&test_config()).await.unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler
            .add_job(counting_job("dormant", "* * * * *", false, counter.clone()))
            .await
            .unwrap();

        let jobs = scheduler.jobs().await;
        assert_eq!(jobs.len(), 1);
        assert!(!jobs[0].enabled);
        assert!(jobs[0].next_run_at.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disabled_job_skips_cron_validation() {
        let scheduler = Scheduler::new(&test_config()).await.unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        // A disabled job's schedule is not parsed; it only has to be present.
        scheduler
            .add_job(counting_job("dormant", "not a cron", false, counter))
            .await
            .unwrap();
        assert_eq!(scheduler.jobs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_run_job_now_executes_once() {
        let scheduler = Scheduler::new(&test_config()).await.unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler
            .add_job(counting_job("on-demand", "0 4 * * *", true, counter.clone()))
            .await
            .unwrap();

        let outcome = scheduler.run_job_now("on-demand").await.unwrap();
        assert!(matches!(outcome, ManualRunOutcome::Completed { .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let jobs = scheduler.jobs().await;
        let last = jobs[0].last_run.as_ref().unwrap();
        assert_eq!(last.status, RunStatus::Success);
    }

    #[tokio::test]
    async fn test_run_job_now_unknown_name_is_benign() {
        let scheduler = Scheduler::new(&test_config()).await.unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler
            .add_job(counting_job("present", "0 4 * * *", true, counter.clone()))
            .await
            .unwrap();

        let outcome = scheduler.run_job_now("absent").await.unwrap();
        assert!(matches!(outcome, ManualRunOutcome::NotFound));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_job_now_reports_body_error() {
        let scheduler = Scheduler::new(&test_config()).await.unwrap();

        scheduler
            .add_job(JobDefinition::new("failing", "0 4 * * *", true, |_ctx| async {
                Err(AppError::Internal {
                    source: anyhow::anyhow!("storage unavailable"),
                })
            }))
            .await
            .unwrap();

        let outcome = scheduler.run_job_now("failing").await.unwrap();
        match outcome {
            ManualRunOutcome::Failed { error, .. } => {
                assert!(error.contains("storage unavailable"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let jobs = scheduler.jobs().await;
        assert_eq!(jobs[0].last_run.as_ref().unwrap().status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_run_job_now_contains_panics() {
        let scheduler = Scheduler::new(&test_config()).await.unwrap();

        scheduler
            .add_job(JobDefinition::new("panicking", "0 4 * * *", true, |_ctx| async {
                panic!("unexpected state");
            }))
            .await
            .unwrap();

        let outcome = scheduler.run_job_now("panicking").await.unwrap();
        match outcome {
            ManualRunOutcome::Failed { error, .. } => assert!(error.contains("unexpected state")),
            other => panic!("unexpected outcome: {other:?}"),
        }

        // The scheduler must keep working after a panic.
        let counter = Arc::new(AtomicUsize::new(0));
        scheduler
            .add_job(counting_job("survivor", "0 4 * * *", true, counter.clone()))
            .await
            .unwrap();
        scheduler.run_job_now("survivor").await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_job_now_bypasses_enabled_flag() {
        let scheduler = Scheduler::new(&test_config()).await.unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler
            .add_job(counting_job("dormant", "0 4 * * *", false, counter.clone()))
            .await
            .unwrap();

        let outcome = scheduler.run_job_now("dormant").await.unwrap();
        assert!(matches!(outcome, ManualRunOutcome::Completed { .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_job_now_rejects_overlapping_run() {
        let scheduler = Scheduler::new(&test_config()).await.unwrap();
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        scheduler
            .add_job({
                let started = started.clone();
                let release = release.clone();
                JobDefinition::new("slow", "0 4 * * *", true, move |_ctx| {
                    let started = started.clone();
                    let release = release.clone();
                    async move {
                        started.notify_one();
                        release.notified().await;
                        Ok(())
                    }
                })
            })
            .await
            .unwrap();

        let scheduler = Arc::new(scheduler);
        let first = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run_job_now("slow").await }
        });

        started.notified().await;
        let err = scheduler.run_job_now("slow").await.unwrap_err();
        assert!(matches!(err, JobError::AlreadyRunning(name) if name == "slow"));

        release.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(outcome, ManualRunOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn test_stop_cancels_in_flight_runs() {
        let scheduler = Arc::new(Scheduler::new(&test_config()).await.unwrap());
        let started = Arc::new(Notify::new());

        scheduler
            .add_job({
                let started = started.clone();
                JobDefinition::new("waiting", "0 4 * * *", true, move |ctx| {
                    let started = started.clone();
                    async move {
                        started.notify_one();
                        ctx.cancelled().await;
                        Err(AppError::Internal {
                            source: anyhow::anyhow!("interrupted by shutdown"),
                        })
                    }
                })
            })
            .await
            .unwrap();

        let run = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run_job_now("waiting").await }
        });

        started.notified().await;
        scheduler.stop().await.unwrap();

        let outcome = run.await.unwrap().unwrap();
        assert!(matches!(outcome, ManualRunOutcome::Failed { .. }));

        let jobs = scheduler.jobs().await;
        let last = jobs[0].last_run.as_ref().unwrap();
        assert_eq!(last.status, RunStatus::Cancelled);
        assert!(jobs[0].next_run_at.is_none());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let scheduler = Scheduler::new(&test_config()).await.unwrap();
        scheduler.start().await.unwrap();
        scheduler.stop().await.unwrap();
        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_abandons_runs_that_ignore_cancellation() {
        let config = JobsConfig {
            shutdown_timeout: 1,
            ..JobsConfig::default()
        };
        let scheduler = Arc::new(Scheduler::new(&config).await.unwrap());
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        scheduler
            .add_job({
                let started = started.clone();
                let release = release.clone();
                JobDefinition::new("stubborn", "0 4 * * *", true, move |_ctx| {
                    let started = started.clone();
                    let release = release.clone();
                    async move {
                        started.notify_one();
                        release.notified().await;
                        Ok(())
                    }
                })
            })
            .await
            .unwrap();

        let run = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run_job_now("stubborn").await }
        });

        started.notified().await;
        // Returns after the bounded drain despite the hung run.
        scheduler.stop().await.unwrap();
        assert_eq!(scheduler.executor.tracker().active_runs(), 1);

        release.notify_one();
        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_start_is_a_noop_when_globally_disabled() {
        let config = JobsConfig {
            enabled: false,
            ..JobsConfig::default()
        };
        let scheduler = Scheduler::new(&config).await.unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler
            .add_job(counting_job("idle", "* * * * *", true, counter))
            .await
            .unwrap();

        scheduler.start().await.unwrap();
        let jobs = scheduler.jobs().await;
        assert!(jobs[0].next_run_at.is_none());

        scheduler.stop().await.unwrap();
    }
}
