//! Webhook receipt repository: provider redelivery dedupe.
//!
//! The payment provider does not guarantee single delivery, and a
//! redelivered settled event must not decrement stock twice. Each event
//! id is claimed with an insert-if-absent before the reservation runs.

use sqlx::PgPool;

use super::RepositoryError;

/// Repository for webhook receipt operations.
pub struct WebhookReceiptRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WebhookReceiptRepository<'a> {
    /// Create a new webhook receipt repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Claim an event id. Returns `true` exactly once per distinct id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn claim(&self, event_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO webhook_receipts (event_id) VALUES ($1) \
             ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(event_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
