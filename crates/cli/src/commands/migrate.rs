//! Database migration command.
//!
//! Migrations live in `crates/server/migrations/` and are embedded at
//! compile time; the server never runs them on startup, so this command
//! is the one place schema changes happen.

use super::{CommandError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or a migration
/// fails.
pub async fn run() -> Result<(), CommandError> {
    tracing::info!("Connecting to database...");
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
