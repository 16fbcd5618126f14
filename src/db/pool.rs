//! Async database connection pool implementation.
//!
//! Uses bb8 connection pool manager with diesel_async for PostgreSQL connections.

use std::time::Duration;

use diesel::Connection;
use diesel_async::AsyncPgConnection;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::Pool;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

/// Embedded database migrations, applied at startup when `auto_migrate` is set.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Async connection pool type alias.
///
/// bb8::Pool internally uses Arc, so Clone is cheap (just reference count increment).
/// Structures holding AsyncDbPool can derive Clone without additional Arc wrapping.
pub type AsyncDbPool = Pool<AsyncPgConnection>;

/// Creates an async database connection pool from the database configuration.
///
/// # Errors
///
/// Returns `AppError::ConnectionPool` if the pool cannot be built.
///
/// # Example
///
/// ```ignore
/// let pool = establish_async_connection_pool(&settings.database).await?;
/// let mut conn = pool.get().await?;
/// ```
pub async fn establish_async_connection_pool(config: &DatabaseConfig) -> AppResult<AsyncDbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.url);
    let pool = Pool::builder()
        .max_size(config.max_connections)
        .min_idle(Some(config.min_connections))
        .connection_timeout(Duration::from_secs(config.connection_timeout))
        .build(manager)
        .await
        .map_err(|e| AppError::ConnectionPool {
            source: anyhow::Error::from(e),
        })?;
    Ok(pool)
}

/// Creates a connection pool without opening any connection.
///
/// Connections are established on first checkout. Used where a pool handle
/// is required but no query will run, such as CLI introspection. Skips
/// `min_idle` so the pool does not replenish itself in the background.
pub fn lazy_connection_pool(config: &DatabaseConfig) -> AsyncDbPool {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.url);
    Pool::builder()
        .max_size(config.max_connections)
        .connection_timeout(Duration::from_secs(config.connection_timeout))
        .build_unchecked(manager)
}

/// Runs all pending embedded migrations against the configured database.
///
/// Migrations run on a blocking thread through a synchronous connection
/// wrapper, since the migration harness is not async.
pub async fn run_pending_migrations(database_url: &str) -> AppResult<()> {
    let url = database_url.to_owned();

    tokio::task::spawn_blocking(move || -> AppResult<()> {
        let mut conn =
            AsyncConnectionWrapper::<AsyncPgConnection>::establish(&url).map_err(|e| {
                AppError::Database {
                    operation: "connect".to_string(),
                    source: anyhow::Error::from(e),
                }
            })?;

        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| AppError::Database {
                operation: "migration".to_string(),
                source: anyhow::anyhow!(e),
            })?;

        Ok(())
    })
    .await
    .map_err(|e| AppError::Internal {
        source: anyhow::Error::from(e),
    })?
}
