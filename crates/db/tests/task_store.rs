//! Integration tests for `PgTaskStore` against a real PostgreSQL database.
//!
//! Run with `DATABASE_URL` set and `cargo test -p imagegen-db -- --ignored`.

use imagegen_core::store::{TaskFilter, TaskStore};
use imagegen_core::task::{ImageSize, NewTask, TaskState, TaskStatus};
use imagegen_db::PgTaskStore;
use sqlx::PgPool;

fn input(prompt: &str) -> NewTask {
    NewTask {
        prompt: prompt.to_string(),
        image_size: ImageSize::Portrait16x9,
        user_id: "user-1".to_string(),
        app_bundle: "com.example.app".to_string(),
        source_image_url: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn create_and_get_round_trip(pool: PgPool) {
    let store = PgTaskStore::new(pool);
    let created = store.create(&input("a harbor at dawn")).await.unwrap();

    assert_eq!(created.state, TaskState::NotSubmitted);
    let loaded = store.get(created.id).await.unwrap().unwrap();
    assert_eq!(loaded.prompt, "a harbor at dawn");
    assert_eq!(loaded.image_size, ImageSize::Portrait16x9);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn guarded_transition_applies_once(pool: PgPool) {
    let store = PgTaskStore::new(pool);
    let task = store.create(&input("a")).await.unwrap();

    let submitted = store
        .transition(
            task.id,
            &[TaskStatus::NotSubmitted],
            TaskState::Submitted {
                request_id: "req-1".into(),
            },
        )
        .await
        .unwrap();
    assert!(submitted.is_some());

    let again = store
        .transition(
            task.id,
            &[TaskStatus::NotSubmitted],
            TaskState::Submitted {
                request_id: "req-2".into(),
            },
        )
        .await
        .unwrap();
    assert!(again.is_none());

    assert_eq!(store.count_generating().await.unwrap(), 1);
    let in_progress = store.list_in_progress().await.unwrap();
    assert_eq!(in_progress.len(), 1);
    assert_eq!(in_progress[0].request_id(), Some("req-1"));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn error_after_submission_keeps_request_id(pool: PgPool) {
    let store = PgTaskStore::new(pool);
    let task = store.create(&input("a")).await.unwrap();
    store
        .transition(
            task.id,
            &[TaskStatus::NotSubmitted],
            TaskState::Submitted {
                request_id: "req-1".into(),
            },
        )
        .await
        .unwrap();

    let failed = store
        .transition(
            task.id,
            &[TaskStatus::Submitted],
            TaskState::Error {
                request_id: None,
                comment: "NSFW content detected".into(),
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(failed.request_id(), Some("req-1"));
    assert_eq!(failed.state.comment(), Some("NSFW content detected"));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn not_yet_submitted_is_oldest_first(pool: PgPool) {
    let store = PgTaskStore::new(pool);
    let first = store.create(&input("1")).await.unwrap();
    let second = store.create(&input("2")).await.unwrap();
    store.create(&input("3")).await.unwrap();

    let listed = store.list_not_yet_submitted(2).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn list_filters_by_status(pool: PgPool) {
    let store = PgTaskStore::new(pool);
    let task = store.create(&input("a")).await.unwrap();
    store.create(&input("b")).await.unwrap();
    store
        .transition(
            task.id,
            &[TaskStatus::NotSubmitted],
            TaskState::Error {
                request_id: None,
                comment: "Timeout".into(),
            },
        )
        .await
        .unwrap();

    let filter = TaskFilter {
        status: Some(TaskStatus::Error),
        ..Default::default()
    };
    let listed = store.list(&filter).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, task.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn check_constraint_rejects_inconsistent_row(pool: PgPool) {
    // Finished without a result URL violates ck_tasks_state_columns.
    let result = sqlx::query(
        "INSERT INTO tasks (id, status_id, request_id, prompt, image_size, user_id, app_bundle) \
         VALUES ($1, 3, 'req', 'p', 'square', 'u', 'b')",
    )
    .bind(uuid::Uuid::now_v7())
    .execute(&pool)
    .await;

    assert!(result.is_err());
}
