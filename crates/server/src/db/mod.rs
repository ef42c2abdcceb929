//! Database operations for the Droplink `PostgreSQL` database.
//!
//! # Tables
//!
//! - `profiles` - Creator profiles (root entity, keyed by `edit_token` /
//!   `slug` externally, internal UUID primary key)
//! - `products` - Keyed product collection per profile; stock mutations
//!   are single-row conditional updates
//! - `subscribers` - Email captures, unique per `(edit_token, email)`
//! - `events` - Append-only analytics log
//! - `webhook_receipts` - Payment provider redelivery dedupe
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p droplink-cli -- migrate
//! ```
//!
//! Queries use the runtime sqlx API (not the compile-time checked
//! macros) so the workspace builds without a live database; every row is
//! mapped field-by-field into domain types at the storage boundary.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod events;
pub mod products;
pub mod profiles;
pub mod subscribers;
pub mod webhooks;

pub use events::EventRepository;
pub use products::ProductRepository;
pub use profiles::ProfileRepository;
pub use subscribers::SubscriberRepository;
pub use webhooks::WebhookReceiptRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique-key conflict (slug or token already taken).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be decoded into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Outcome of a guarded conditional update.
///
/// The engine contract reports matched and modified counts distinctly
/// because a conditional update may match without modifying (idempotent
/// retry at the target value). The Postgres rendition of a guarded
/// `UPDATE` reports a single rows-affected number, so both fields are set
/// from it; callers must still handle `matched > modified` if another
/// store backs this trait someday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

impl UpdateOutcome {
    /// Outcome reporting `n` rows both matched and modified.
    #[must_use]
    pub const fn rows(n: u64) -> Self {
        Self {
            matched: n,
            modified: n,
        }
    }

    /// Whether the update changed anything.
    #[must_use]
    pub const fn modified_any(&self) -> bool {
        self.modified > 0
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// Built once at startup and handed to every handler through the shared
/// application state; no global connection, no lazy init on first use.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
