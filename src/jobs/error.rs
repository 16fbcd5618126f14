use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Job run cancelled during shutdown")]
    Cancelled,

    #[error("Invalid cron expression {expression:?}: {reason}")]
    InvalidCronExpression { expression: String, reason: String },

    #[error("Invalid job definition: {0}")]
    InvalidDefinition(String),

    #[error("Job already exists: {0}")]
    AlreadyExists(String),

    #[error("Job already running: {0}")]
    AlreadyRunning(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

pub type JobResult<T> = Result<T, JobError>;

impl From<JobError> for crate::error::AppError {
    fn from(err: JobError) -> Self {
        crate::error::AppError::Internal {
            source: anyhow::Error::new(err),
        }
    }
}
