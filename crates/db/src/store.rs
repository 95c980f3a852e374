//! [`TaskStore`] implementation over PostgreSQL.

use async_trait::async_trait;
use imagegen_core::store::{StoreError, TaskFilter, TaskStore};
use imagegen_core::task::{NewTask, Task, TaskState, TaskStatus};
use imagegen_core::types::TaskId;

use crate::models::task::TaskRow;
use crate::repositories::TaskRepo;
use crate::DbPool;

/// Task store backed by the `tasks` table.
#[derive(Clone)]
pub struct PgTaskStore {
    pool: DbPool,
}

impl PgTaskStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

fn to_task(row: TaskRow) -> Result<Task, StoreError> {
    row.into_task().map_err(|e| {
        tracing::error!(error = %e, "Corrupt task row");
        StoreError::Corrupt(e)
    })
}

fn to_tasks(rows: Vec<TaskRow>) -> Result<Vec<Task>, StoreError> {
    rows.into_iter().map(to_task).collect()
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create(&self, input: &NewTask) -> Result<Task, StoreError> {
        let row = TaskRepo::create(&self.pool, input).await.map_err(db_err)?;
        to_task(row)
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        TaskRepo::find_by_id(&self.pool, id)
            .await
            .map_err(db_err)?
            .map(to_task)
            .transpose()
    }

    async fn transition(
        &self,
        id: TaskId,
        expected: &[TaskStatus],
        next: TaskState,
    ) -> Result<Option<Task>, StoreError> {
        TaskRepo::transition(&self.pool, id, expected, &next)
            .await
            .map_err(db_err)?
            .map(to_task)
            .transpose()
    }

    async fn list_not_yet_submitted(&self, limit: usize) -> Result<Vec<Task>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = TaskRepo::list_not_yet_submitted(&self.pool, limit)
            .await
            .map_err(db_err)?;
        to_tasks(rows)
    }

    async fn list_in_progress(&self) -> Result<Vec<Task>, StoreError> {
        let rows = TaskRepo::list_in_progress(&self.pool)
            .await
            .map_err(db_err)?;
        to_tasks(rows)
    }

    async fn count_generating(&self) -> Result<i64, StoreError> {
        TaskRepo::count_generating(&self.pool).await.map_err(db_err)
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let rows = TaskRepo::list(&self.pool, filter).await.map_err(db_err)?;
        to_tasks(rows)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await.map_err(db_err)
    }
}
