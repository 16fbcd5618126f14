//! Shared application context for the worker.
//!
//! Holds the database pool and the collaborators that job bodies close over.

use std::sync::Arc;

use crate::config::Settings;
use crate::db::{self, AsyncDbPool};
use crate::error::AppResult;
use crate::external::{CompletionClient, OpenAiClient};
use crate::repositories::{PlayEventRepository, PlayEventStore, TaskRepository, TaskStore};

/// Shared resources handed to job constructors.
///
/// Cloning is cheap: the pool is Arc-backed and the stores are Arc trait
/// objects.
#[derive(Clone)]
pub struct AppContext {
    /// Direct access to the database connection pool
    pub db_pool: AsyncDbPool,
    /// Task catalog store used by the generation job
    pub tasks: Arc<dyn TaskStore>,
    /// Play event store used by the cleanup job
    pub play_events: Arc<dyn PlayEventStore>,
    /// Completion API client used by the generation job
    pub ai: Arc<dyn CompletionClient>,
}

impl AppContext {
    /// Runs pending migrations when configured, connects the pool, and wires
    /// the repositories and the AI client.
    pub async fn initialize(settings: &Settings) -> AppResult<Self> {
        if settings.database.auto_migrate {
            tracing::info!("Running pending database migrations");
            db::run_pending_migrations(&settings.database.url).await?;
        }

        let pool = db::establish_async_connection_pool(&settings.database).await?;
        Self::assemble(pool, settings)
    }

    /// Wires the production collaborators without opening any database
    /// connection.
    ///
    /// Used by CLI introspection commands that compose the scheduler but
    /// never execute a job body.
    pub fn detached(settings: &Settings) -> AppResult<Self> {
        Self::assemble(db::lazy_connection_pool(&settings.database), settings)
    }

    fn assemble(pool: AsyncDbPool, settings: &Settings) -> AppResult<Self> {
        Ok(Self {
            tasks: Arc::new(TaskRepository::new(pool.clone())),
            play_events: Arc::new(PlayEventRepository::new(pool.clone())),
            ai: Arc::new(OpenAiClient::new(&settings.ai)?),
            db_pool: pool,
        })
    }
}
