use gastown_town::adapters::sqlite::{create_test_pool, Migrator};
use sqlx::SqlitePool;

/// Create an in-memory SQLite database with embedded migrations applied.
#[allow(dead_code)]
pub async fn setup_test_db() -> SqlitePool {
    let pool = create_test_pool().await.expect("failed to create test database");

    Migrator::new(pool.clone())
        .run_embedded_migrations()
        .await
        .expect("failed to run migrations");

    pool
}

#[allow(dead_code)]
pub async fn teardown_test_db(pool: SqlitePool) {
    pool.close().await;
}
