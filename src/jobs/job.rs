use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::AppResult;
use crate::jobs::types::JobContext;

/// Type-erased job body: an async function of the run context.
pub type JobWork = Arc<dyn Fn(JobContext) -> BoxFuture<'static, AppResult<()>> + Send + Sync>;

/// A named unit of scheduled work.
///
/// The body is stored type-erased so a definition can be cloned into the
/// scheduler clock's callback; everything else is plain metadata.
#[derive(Clone)]
pub struct JobDefinition {
    name: String,
    description: Option<String>,
    schedule: String,
    enabled: bool,
    work: JobWork,
}

impl JobDefinition {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        schedule: impl Into<String>,
        enabled: bool,
        work: F,
    ) -> Self
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: None,
            schedule: schedule.into(),
            enabled,
            work: Arc::new(move |ctx| Box::pin(work(ctx))),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn work(&self) -> JobWork {
        Arc::clone(&self.work)
    }
}

impl fmt::Debug for JobDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schedule", &self.schedule)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
