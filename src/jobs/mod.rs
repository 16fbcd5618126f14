pub mod error;
pub mod executor;
pub mod job;
pub mod schedule;
pub mod scheduler;
pub mod setup;
pub mod tasks;
pub mod types;

pub use error::{JobError, JobResult};
pub use executor::{ExecutionOutcome, JobExecutor, RunTracker};
pub use job::{JobDefinition, JobWork};
pub use schedule::parse_schedule;
pub use scheduler::Scheduler;
pub use setup::setup;
pub use types::{JobContext, JobInfo, LastRun, ManualRunOutcome, RunStatus, Trigger};
