use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::schema::play_events;

/// Gameplay event access as needed by the background jobs.
#[async_trait]
pub trait PlayEventStore: Send + Sync {
    /// Deletes up to `limit` events that occurred before `cutoff` and returns
    /// how many rows were removed.
    async fn delete_events_before(&self, cutoff: NaiveDateTime, limit: i64) -> AppResult<u64>;
}

#[derive(Clone)]
pub struct PlayEventRepository {
    pool: AsyncDbPool,
}

impl PlayEventRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlayEventStore for PlayEventRepository {
    async fn delete_events_before(&self, cutoff: NaiveDateTime, limit: i64) -> AppResult<u64> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        // Postgres has no DELETE ... LIMIT, so pick the batch by id first.
        let ids: Vec<i64> = play_events::table
            .filter(play_events::occurred_at.lt(cutoff))
            .order(play_events::occurred_at.asc())
            .limit(limit)
            .select(play_events::id)
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        if ids.is_empty() {
            return Ok(0);
        }

        let deleted = diesel::delete(play_events::table.filter(play_events::id.eq_any(&ids)))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;

        Ok(deleted as u64)
    }
}
