//! Subscriber repository.
//!
//! One row per `(edit_token, email)` pair: the first submission creates
//! it, repeats refresh `updated_at` instead of duplicating.

use sqlx::PgPool;

use super::RepositoryError;

/// Repository for subscriber database operations.
pub struct SubscriberRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriberRepository<'a> {
    /// Create a new subscriber repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Upsert a subscriber for a creator.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, edit_token: &str, email: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO subscribers (edit_token, email) VALUES ($1, $2) \
             ON CONFLICT (edit_token, email) DO UPDATE SET updated_at = now()",
        )
        .bind(edit_token)
        .bind(email)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
