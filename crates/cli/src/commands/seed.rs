//! Database seeding command.
//!
//! Creates a demo profile with one stock-limited drop so a fresh
//! environment has something to render. Safe to re-run: an existing slug
//! aborts instead of overwriting.

use chrono::{Duration, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use sqlx::types::Json;

use super::{CommandError, connect};

/// Seed a demo profile under `slug`.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or the insert
/// fails (including an already-taken slug).
pub async fn run(slug: &str) -> Result<(), CommandError> {
    let pool = connect().await?;

    let random: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    let edit_token = format!("tok_{random}");

    let links = serde_json::json!([
        { "label": "My shop", "url": "https://example.com/shop" },
        { "label": "Newsletter", "url": "https://example.com/news" }
    ]);
    let social = serde_json::json!({
        "instagram": "https://instagram.com/droplink-demo"
    });

    let profile_id: (uuid::Uuid,) = sqlx::query_as(
        "INSERT INTO profiles (edit_token, slug, plan, display_name, bio, theme, social, links) \
         VALUES ($1, $2, 'starter', 'Demo Creator', 'Limited drops, every week.', 'classic', $3, $4) \
         RETURNING id",
    )
    .bind(&edit_token)
    .bind(slug)
    .bind(Json(&social))
    .bind(Json(&links))
    .fetch_one(&pool)
    .await?;

    let ends_at = (Utc::now() + Duration::days(3)).to_rfc3339();
    sqlx::query(
        "INSERT INTO products (profile_id, product_id, position, title, price_url, image_url, \
         images, drop_ends_at, units_total, units_left, published) \
         VALUES ($1, 'drop-001', 0, 'First Drop Tee', 'https://checkout.example.com/drop-001', \
         'https://cdn.example.com/drop-001.png', $2, $3, 25, 25, TRUE)",
    )
    .bind(profile_id.0)
    .bind(Json(serde_json::json!(["https://cdn.example.com/drop-001.png"])))
    .bind(&ends_at)
    .execute(&pool)
    .await?;

    tracing::info!(slug = %slug, edit_token = %edit_token, "Seeded demo profile");
    Ok(())
}
