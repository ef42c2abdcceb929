//! Event repository: append-only analytics log.
//!
//! Events are best-effort. Writers go through [`record_detached`] so a
//! failed insert is logged and dropped instead of surfacing on the
//! request that produced it; there is no update or delete path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use droplink_core::EventType;

use super::RepositoryError;

/// A new analytics event, ready to insert.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: EventType,
    pub product_id: Option<String>,
    pub edit_token: String,
    pub slug: String,
    pub ts: DateTime<Utc>,
    pub referrer: Option<String>,
    pub ua: Option<String>,
    /// Already anonymized by the caller; raw addresses never reach here.
    pub ip: Option<String>,
}

/// One row of the per-product event rollup.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventStat {
    pub product_id: Option<String>,
    pub event_type: String,
    pub count: i64,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Repository for event database operations.
pub struct EventRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EventRepository<'a> {
    /// Create a new event repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert one event.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, event: &NewEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO events (event_type, product_id, edit_token, slug, ts, referrer, ua, ip) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event.event_type.as_str())
        .bind(&event.product_id)
        .bind(&event.edit_token)
        .bind(&event.slug)
        .bind(event.ts)
        .bind(&event.referrer)
        .bind(&event.ua)
        .bind(&event.ip)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Aggregate a profile's events by product and type.
    ///
    /// Ordered by count descending, then recency descending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn aggregate(&self, edit_token: &str) -> Result<Vec<EventStat>, RepositoryError> {
        let rows = sqlx::query_as::<_, EventStat>(
            "SELECT product_id, event_type, COUNT(*) AS count, MAX(ts) AS last_seen \
             FROM events \
             WHERE edit_token = $1 \
             GROUP BY product_id, event_type \
             ORDER BY count DESC, last_seen DESC",
        )
        .bind(edit_token)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

/// Record an event on a detached task.
///
/// Spawned fire-and-forget: the originating request never waits on or
/// fails because of this write. Failures land in the log sink only.
pub fn record_detached(pool: PgPool, event: NewEvent) {
    tokio::spawn(async move {
        let repo = EventRepository::new(&pool);
        if let Err(e) = repo.insert(&event).await {
            tracing::warn!(
                error = %e,
                event_type = %event.event_type,
                slug = %event.slug,
                "Dropped analytics event"
            );
        }
    });
}
