//! Database module
//!
//! This module provides:
//! - Recipe and profile models and their document mapping
//! - Schema and migrations for the SQLite document store
//! - `SqliteGateway`, a durable `RemoteCollectionGateway`

pub mod models;
pub mod repository;
pub mod schema;

pub use models::*;
pub use repository::SqliteGateway;
pub use schema::initialize_database;

use crate::config::StoreConfig;
use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Build connection options shared by migration and application connections.
fn connect_options(
    db_path: &Path,
    config: &StoreConfig,
) -> std::result::Result<SqliteConnectOptions, sqlx::Error> {
    SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display())).map(
        |opts| {
            opts.create_if_missing(true)
                .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
                .journal_mode(SqliteJournalMode::Wal)
        },
    )
}

/// Create and initialize a database connection pool.
///
/// Migrations run on a dedicated single-connection pool that is closed
/// before the application pool is created, so no pooled connection can
/// hold a pre-migration view of the schema.
pub async fn create_pool(db_path: &Path, config: &StoreConfig) -> Result<SqlitePool> {
    tracing::info!("Creating database connection pool at: {:?}", db_path);

    // The data directory may not exist on first launch
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Schema first, on one connection, so every statement sees the same
    // database state
    let migration_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options(db_path, config)?)
        .await?;

    initialize_database(&migration_pool).await?;
    migration_pool.close().await;

    // Application pool, sized from the store config
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connect_options(db_path, config)?)
        .await?;

    tracing::info!("Database pool created successfully");

    Ok(pool)
}
