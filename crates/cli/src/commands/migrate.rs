//! Database migration command.
//!
//! # Environment Variables
//!
//! - `ATELIER_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Shop migrations live in `crates/api/migrations/` and are embedded at
//! compile time.

use atelier_api::db;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run shop database migrations.
///
/// # Errors
///
/// Returns an error if the URL is missing, the database is unreachable, or
/// a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = super::database_url().map_err(|_| {
        MigrationError::MissingEnvVar("ATELIER_DATABASE_URL")
    })?;

    info!("Connecting to shop database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running shop migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    info!("Shop migrations complete!");
    Ok(())
}
