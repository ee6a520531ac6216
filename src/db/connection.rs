use crate::db::migration::run_migrations;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{migrate::MigrateDatabase, Pool, Sqlite, SqlitePool};
use tracing::info;

pub async fn establish_connection(database_url: &str) -> Result<Pool<Sqlite>, sqlx::Error> {
    // Create database if it doesn't exist
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        Sqlite::create_database(database_url).await?;
    }

    let pool = SqlitePool::connect(database_url).await?;

    // Enable WAL mode so readers don't block the writer
    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;

    run_migrations(&pool).await?;
    info!("Database ready at {}", database_url);

    Ok(pool)
}

/// In-memory database on a single connection that never gets recycled,
/// since every new `:memory:` connection would see an empty database.
pub async fn connect_in_memory() -> Result<Pool<Sqlite>, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}
