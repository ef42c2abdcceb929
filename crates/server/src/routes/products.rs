//! Product route handlers: batch replace and stock restore.
//!
//! Products are written wholesale: the submitted list substitutes the
//! stored one as a unit, after quota validation and sanitization. Stock
//! corrections go through the explicit restore operation; the only other
//! mutation of `units_left` is the webhook-driven reservation.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use droplink_core::Product;
use droplink_core::sanitize::{
    MAX_TITLE_LEN, clamp_text, sanitize_href_price, sanitize_image_src,
};
use droplink_core::validate::validate_profile_payload;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::require_profile;

/// Restore payload: the explicit stock value to set.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorePayload {
    pub units_left: serde_json::Value,
}

/// PUT /v1/profiles/me/products - replace the product list wholesale.
#[instrument(skip(state, headers, products))]
pub async fn replace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut products): Json<Vec<Product>>,
) -> Result<Json<serde_json::Value>> {
    let profile = require_profile(&state, &headers).await?;

    for product in &products {
        let id = product.id.trim();
        if id.is_empty() {
            return Err(AppError::Validation("every product needs an id".to_owned()));
        }
    }
    let mut seen = std::collections::HashSet::new();
    for product in &products {
        if !seen.insert(product.id.trim()) {
            return Err(AppError::Validation(format!(
                "duplicate product id: {}",
                product.id.trim()
            )));
        }
    }

    // Quotas check the raw payload; collect_email is out of scope here.
    validate_profile_payload(&[], &products, false, profile.plan)?;

    for product in &mut products {
        sanitize_product(product);
    }

    ProductRepository::new(state.pool())
        .replace_all(&profile.edit_token, &products)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::Conflict(_) => AppError::NotFound("profile".to_owned()),
            other => AppError::Database(other),
        })?;

    tracing::info!(slug = %profile.slug, count = products.len(), "Product list replaced");
    Ok(Json(json!({ "products": products })))
}

/// POST /v1/profiles/me/products/{id}/restore - set stock explicitly.
///
/// Compensating operation for failed fulfillment or manual stock entry.
/// The value must be a non-negative integer; it is clamped to the stock
/// ceiling on write. Setting the same value twice is a no-op the second
/// time.
#[instrument(skip(state, headers, payload), fields(product_id = %product_id))]
pub async fn restore(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<RestorePayload>,
) -> Result<Json<serde_json::Value>> {
    let profile = require_profile(&state, &headers).await?;

    let units_left = parse_units_left(&payload.units_left)?;

    let outcome = ProductRepository::new(state.pool())
        .restore_unit(&profile.edit_token, &product_id, units_left)
        .await?;

    if outcome.matched == 0 {
        return Err(AppError::NotFound("product".to_owned()));
    }

    tracing::info!(
        slug = %profile.slug,
        units_left,
        "Stock restored"
    );
    Ok(Json(json!({ "ok": true, "unitsLeft": units_left })))
}

/// Decode a restore value: a non-negative integer or a rejection.
///
/// Accepted as a JSON number only; strings, floats and negatives are
/// validation failures, never coerced.
fn parse_units_left(value: &serde_json::Value) -> Result<i32> {
    let n = value
        .as_i64()
        .ok_or_else(|| AppError::Validation("unitsLeft must be a non-negative integer".to_owned()))?;
    if n < 0 {
        return Err(AppError::Validation(
            "unitsLeft must be a non-negative integer".to_owned(),
        ));
    }
    i32::try_from(n)
        .map_err(|_| AppError::Validation("unitsLeft is out of range".to_owned()))
}

/// Sanitize a product for storage and re-establish the stock invariant.
fn sanitize_product(product: &mut Product) {
    product.id = product.id.trim().to_owned();
    product.title = clamp_text(&product.title, MAX_TITLE_LEN);
    product.price_url = sanitize_href_price(&product.price_url);
    product.image_url = sanitize_image_src(&product.image_url);
    product.images = product
        .images
        .iter()
        .map(|i| sanitize_image_src(i))
        .filter(|i| !i.is_empty())
        .collect();
    product.drop_starts_at = product
        .drop_starts_at
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned);
    product.drop_ends_at = product
        .drop_ends_at
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned);
    product.clamp_units();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_units_left() {
        assert_eq!(parse_units_left(&json!(0)).expect("zero"), 0);
        assert_eq!(parse_units_left(&json!(12)).expect("twelve"), 12);

        assert!(parse_units_left(&json!(-1)).is_err());
        assert!(parse_units_left(&json!(2.5)).is_err());
        assert!(parse_units_left(&json!("7")).is_err());
        assert!(parse_units_left(&json!(null)).is_err());
    }

    #[test]
    fn test_sanitize_product_clamps_and_cleans() {
        let mut product = Product {
            id: "  p1  ".to_owned(),
            title: "Drop <1>".to_owned(),
            price_url: "buy.example.com/p1".to_owned(),
            image_url: "javascript:alert(1)".to_owned(),
            images: vec![
                "https://cdn.example.com/a.png".to_owned(),
                "ftp://bad/b.png".to_owned(),
            ],
            drop_ends_at: Some("  ".to_owned()),
            units_total: Some(5),
            units_left: Some(9),
            ..Product::default()
        };

        sanitize_product(&mut product);

        assert_eq!(product.id, "p1");
        assert_eq!(product.title, "Drop 1");
        assert_eq!(product.price_url, "https://buy.example.com/p1");
        assert_eq!(product.image_url, "");
        assert_eq!(product.images.len(), 1);
        assert_eq!(product.drop_ends_at, None);
        assert_eq!(product.units_left, Some(5));
    }
}
