use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{NewTask, Task, TaskKind};
use crate::schema::tasks;

/// Task catalog access as needed by the background jobs.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a batch of tasks and returns the stored rows.
    async fn insert_tasks(&self, rows: &[NewTask]) -> AppResult<Vec<Task>>;

    /// Returns the text of the most recently created tasks for one
    /// category/kind pair, newest first.
    async fn recent_texts(
        &self,
        category: &str,
        kind: TaskKind,
        limit: i64,
    ) -> AppResult<Vec<String>>;
}

#[derive(Clone)]
pub struct TaskRepository {
    pool: AsyncDbPool,
}

impl TaskRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for TaskRepository {
    async fn insert_tasks(&self, rows: &[NewTask]) -> AppResult<Vec<Task>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        diesel::insert_into(tasks::table)
            .values(rows)
            .get_results(&mut conn)
            .await
            .map_err(AppError::from)
    }

    async fn recent_texts(
        &self,
        category: &str,
        kind: TaskKind,
        limit: i64,
    ) -> AppResult<Vec<String>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        tasks::table
            .filter(tasks::category.eq(category))
            .filter(tasks::kind.eq(kind))
            .order(tasks::created_at.desc())
            .limit(limit)
            .select(tasks::text)
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }
}
