//! Repository for the `tasks` table.
//!
//! Uses `TaskStatusId` from `models::status` for every status literal.

use imagegen_core::store::TaskFilter;
use imagegen_core::task::{NewTask, TaskState, TaskStatus};
use imagegen_core::types::TaskId;
use sqlx::PgPool;

use crate::models::status::{StatusId, TaskStatusId};
use crate::models::task::{StateColumns, TaskRow};

/// Column list for `tasks` queries.
const COLUMNS: &str = "\
    id, status_id, request_id, result_url, comment, \
    prompt, image_size, user_id, app_bundle, source_image_url, \
    created_at, updated_at";

/// Provides CRUD and lifecycle operations for tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a new task in `not_submitted` status.
    pub async fn create(pool: &PgPool, input: &NewTask) -> Result<TaskRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks \
                 (id, status_id, prompt, image_size, user_id, app_bundle, source_image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(TaskId::now_v7())
            .bind(TaskStatusId::NotSubmitted.id())
            .bind(&input.prompt)
            .bind(input.image_size.as_str())
            .bind(&input.user_id)
            .bind(&input.app_bundle)
            .bind(&input.source_image_url)
            .fetch_one(pool)
            .await
    }

    /// Find a task by its ID.
    pub async fn find_by_id(pool: &PgPool, id: TaskId) -> Result<Option<TaskRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Write a new state if the row's current status is one of `expected`.
    ///
    /// Single conditional `UPDATE`, so concurrent writers cannot both apply.
    /// `request_id` is coalesced with the stored value and is never cleared.
    pub async fn transition(
        pool: &PgPool,
        id: TaskId,
        expected: &[TaskStatus],
        next: &TaskState,
    ) -> Result<Option<TaskRow>, sqlx::Error> {
        let cols = StateColumns::from(next);
        let expected_ids: Vec<StatusId> = expected
            .iter()
            .map(|s| TaskStatusId::from(*s).id())
            .collect();

        let query = format!(
            "UPDATE tasks \
             SET status_id = $2, request_id = COALESCE($3, request_id), \
                 result_url = $4, comment = $5, updated_at = NOW() \
             WHERE id = $1 AND status_id = ANY($6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .bind(cols.status_id)
            .bind(cols.request_id)
            .bind(cols.result_url)
            .bind(cols.comment)
            .bind(&expected_ids)
            .fetch_optional(pool)
            .await
    }

    /// Oldest `not_submitted` tasks, up to `limit`.
    pub async fn list_not_yet_submitted(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<TaskRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks \
             WHERE status_id = $1 \
             ORDER BY created_at ASC, id ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(TaskStatusId::NotSubmitted.id())
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// All `submitted` tasks awaiting a provider result.
    pub async fn list_in_progress(pool: &PgPool) -> Result<Vec<TaskRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks \
             WHERE status_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(TaskStatusId::Submitted.id())
            .fetch_all(pool)
            .await
    }

    /// Count tasks currently generating at the provider.
    pub async fn count_generating(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE status_id = $1")
            .bind(TaskStatusId::Submitted.id())
            .fetch_one(pool)
            .await
    }

    /// Filtered listing, newest first, with pagination.
    pub async fn list(pool: &PgPool, filter: &TaskFilter) -> Result<Vec<TaskRow>, sqlx::Error> {
        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if filter.status.is_some() {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.user_id.is_some() {
            conditions.push(format!("user_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.app_bundle.is_some() {
            conditions.push(format!("app_bundle = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM tasks \
             {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, TaskRow>(&query);

        if let Some(status) = filter.status {
            q = q.bind(TaskStatusId::from(status).id());
        }
        if let Some(user_id) = &filter.user_id {
            q = q.bind(user_id);
        }
        if let Some(app_bundle) = &filter.app_bundle {
            q = q.bind(app_bundle);
        }

        q = q
            .bind(filter.effective_limit())
            .bind(filter.effective_offset());

        q.fetch_all(pool).await
    }
}
