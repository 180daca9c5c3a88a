use std::str::FromStr;

use anyhow::{Context, Result};
use log::info;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

/// Connect to the SQLite database at `database_url`, creating the file when
/// it does not exist yet.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid DATABASE_URL: {}", database_url))?
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options)
        .await
        .context("Failed to connect to the database")?;
    info!("Connected to database");
    Ok(pool)
}

/// Creates the 'ruta1' table if it doesn't exist.
pub async fn create_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ruta1 (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        latitude TEXT NOT NULL,
        longitude TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        ip TEXT NOT NULL,
        user_agent TEXT NOT NULL,
        maps_url TEXT NOT NULL
    )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
