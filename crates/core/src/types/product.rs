//! Drop products.
//!
//! A product is a time-boxed, optionally stock-limited listing on a
//! creator page. Stock and timer state is always derived at read time
//! (see [`crate::inventory`]); nothing here caches availability.

use serde::{Deserialize, Serialize};

/// A product listed on a creator page.
///
/// `drop_starts_at` / `drop_ends_at` hold raw ISO-8601 strings exactly as
/// stored. Older documents carry malformed values in these fields; parsing
/// happens on every read so a bad timestamp degrades one product's
/// countdown instead of failing the whole page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    /// Stable identifier, unique within the owning profile.
    pub id: String,
    pub title: String,
    /// Hosted-checkout URL for this item; empty means not purchasable.
    pub price_url: String,
    /// Primary image URL; empty means no image.
    pub image_url: String,
    /// Gallery image URLs (subject to per-plan count quotas).
    pub images: Vec<String>,
    /// Drop window start, raw ISO-8601.
    pub drop_starts_at: Option<String>,
    /// Drop window end, raw ISO-8601.
    pub drop_ends_at: Option<String>,
    /// Stock ceiling. `None` means the product is not stock-limited.
    pub units_total: Option<i32>,
    /// Remaining stock. `None` means unlimited: no stock label is shown
    /// and the reservation path never matches (nothing to deplete).
    pub units_left: Option<i32>,
    /// Public visibility gate. `None` on legacy documents defaults to
    /// visible.
    pub published: Option<bool>,
}

impl Product {
    /// Whether anonymous visitors may see this product.
    ///
    /// Only an explicit `published: false` hides a product; documents
    /// written before the flag existed stay visible.
    #[must_use]
    pub fn is_publicly_visible(&self) -> bool {
        self.published != Some(false)
    }

    /// Re-establish the stock invariant `units_left <= units_total`.
    ///
    /// Called on every write path. `units_left` is clamped down to the
    /// ceiling when both are set; negative values (which only arrive from
    /// unchecked payloads) clamp to zero.
    pub fn clamp_units(&mut self) {
        if let Some(left) = self.units_left.as_mut() {
            if *left < 0 {
                *left = 0;
            }
            if let Some(total) = self.units_total
                && *left > total.max(0)
            {
                *left = total.max(0);
            }
        }
    }
}
