pub mod models;
pub mod repository;

pub use models::*;
pub use repository::*;

/// In-memory SQLite pool with migrations applied, for repository and service
/// tests. A single connection keeps every query on the same `:memory:` store.
#[cfg(test)]
pub(crate) async fn memory_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    pool
}
