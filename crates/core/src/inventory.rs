//! Derived product availability and drop timers.
//!
//! Availability is never stored: it is a pure function of the product's
//! stock counters, its drop window, and the current time, recomputed on
//! every read. Callers must not cache the result across polls.

use chrono::{DateTime, Utc};

use crate::types::Product;

/// Visitor-facing availability state of a product.
///
/// Precedence: sold-out wins over an elapsed drop window, which wins over
/// active. A product with `units_left = 0` reports `SoldOut` even when
/// its countdown has also expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    SoldOut,
    Ended,
    Active,
}

/// Compute the availability state of a product at `now`.
pub fn product_status(product: &Product, now: DateTime<Utc>) -> ProductStatus {
    if product.units_left.is_some_and(|left| left <= 0) {
        return ProductStatus::SoldOut;
    }
    if remaining_ms(product, now) == Some(0) {
        return ProductStatus::Ended;
    }
    ProductStatus::Active
}

/// Milliseconds until the drop window closes, floored at zero.
///
/// `None` when the product has no end timestamp or the stored value does
/// not parse; a malformed timestamp degrades to "no countdown" rather
/// than failing the read.
pub fn remaining_ms(product: &Product, now: DateTime<Utc>) -> Option<i64> {
    let ends_at = parse_drop_instant(product.drop_ends_at.as_deref()?)?;
    Some((ends_at - now).num_milliseconds().max(0))
}

/// Parse a stored drop timestamp. Accepts RFC 3339 / ISO-8601 with offset.
pub fn parse_drop_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whether the purchase link should be rendered at `now`.
///
/// Only active products with a checkout URL are purchasable; sold-out and
/// ended products never render the link.
pub fn is_purchasable(product: &Product, now: DateTime<Utc>) -> bool {
    product_status(product, now) == ProductStatus::Active && !product.price_url.is_empty()
}

/// Compose the human availability label for a product at `now`.
///
/// Shows `"{left}/{total} left"` whenever both counters are known and
/// appends `"Ends in {countdown}"` while a countdown is running, joined
/// with an em dash. `None` when there is nothing to say.
pub fn availability_label(product: &Product, now: DateTime<Utc>) -> Option<String> {
    let mut parts = Vec::new();

    if let (Some(left), Some(total)) = (product.units_left, product.units_total) {
        parts.push(format!("{left}/{total} left"));
    }

    if let Some(ms) = remaining_ms(product, now) {
        if ms > 0 {
            parts.push(format!("Ends in {}", format_countdown(ms)));
        } else if parts.is_empty() {
            parts.push("ended".to_owned());
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" — "))
    }
}

/// Render a millisecond countdown as `"Xd Yh Zm Ws"`.
///
/// Starts at the largest non-zero unit, keeps the smaller units from
/// there down, and always shows seconds. Zero or negative remaining time
/// renders the literal word `"ended"`.
#[must_use]
pub fn format_countdown(ms: i64) -> String {
    if ms <= 0 {
        return "ended".to_owned();
    }

    let total_secs = ms / 1000;
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if days > 0 || hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if days > 0 || hours > 0 || minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{seconds}s"));

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs_from_epoch: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs_from_epoch, 0).single().expect("valid time")
    }

    fn iso(dt: DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }

    #[test]
    fn test_sold_out_beats_ended() {
        let now = at(1_750_000_000);
        let product = Product {
            units_left: Some(0),
            units_total: Some(5),
            drop_ends_at: Some(iso(now - chrono::Duration::hours(1))),
            ..Product::default()
        };
        assert_eq!(product_status(&product, now), ProductStatus::SoldOut);
    }

    #[test]
    fn test_ended_when_window_passed_and_stock_unlimited() {
        let now = at(1_750_000_000);
        let product = Product {
            units_left: None,
            drop_ends_at: Some(iso(now - chrono::Duration::minutes(5))),
            ..Product::default()
        };
        assert_eq!(product_status(&product, now), ProductStatus::Ended);
    }

    #[test]
    fn test_active_with_stock_and_future_end() {
        let now = at(1_750_000_000);
        let product = Product {
            units_left: Some(1),
            units_total: Some(5),
            drop_ends_at: Some(iso(now + chrono::Duration::hours(2))),
            ..Product::default()
        };
        assert_eq!(product_status(&product, now), ProductStatus::Active);

        let label = availability_label(&product, now).expect("label");
        assert!(label.contains("1/5 left"), "label was: {label}");
        assert!(label.contains("Ends in"), "label was: {label}");
    }

    #[test]
    fn test_malformed_end_timestamp_degrades_to_active() {
        let now = at(1_750_000_000);
        let product = Product {
            units_left: Some(3),
            drop_ends_at: Some("not-a-timestamp".to_owned()),
            ..Product::default()
        };
        assert_eq!(product_status(&product, now), ProductStatus::Active);
        assert_eq!(remaining_ms(&product, now), None);
    }

    #[test]
    fn test_no_end_means_no_countdown() {
        let now = at(1_750_000_000);
        let product = Product {
            units_left: Some(3),
            units_total: Some(10),
            ..Product::default()
        };
        assert_eq!(product_status(&product, now), ProductStatus::Active);
        assert_eq!(availability_label(&product, now).as_deref(), Some("3/10 left"));
    }

    #[test]
    fn test_purchasable_requires_checkout_url() {
        let now = at(1_750_000_000);
        let mut product = Product {
            units_left: Some(3),
            ..Product::default()
        };
        assert!(!is_purchasable(&product, now));

        product.price_url = "https://buy.example.com/p1".to_owned();
        assert!(is_purchasable(&product, now));

        product.units_left = Some(0);
        assert!(!is_purchasable(&product, now));
    }

    #[test]
    fn test_format_countdown_units() {
        assert_eq!(format_countdown(0), "ended");
        assert_eq!(format_countdown(-5), "ended");
        assert_eq!(format_countdown(42_000), "42s");
        assert_eq!(format_countdown(61_000), "1m 1s");
        assert_eq!(format_countdown(3_600_000), "1h 0m 0s");
        assert_eq!(format_countdown(90_061_000), "1d 1h 1m 1s");
    }

    #[test]
    fn test_elapsed_window_renders_ended_standalone() {
        let now = at(1_750_000_000);
        let product = Product {
            drop_ends_at: Some(iso(now - chrono::Duration::seconds(1))),
            ..Product::default()
        };
        // No stock counters: the zero countdown is all there is to show.
        assert_eq!(availability_label(&product, now).as_deref(), Some("ended"));
    }

    #[test]
    fn test_parse_drop_instant_accepts_offsets() {
        assert!(parse_drop_instant("2026-01-01T00:00:00Z").is_some());
        assert!(parse_drop_instant("2026-01-01T00:00:00+02:00").is_some());
        assert!(parse_drop_instant("January 1st").is_none());
        assert!(parse_drop_instant("").is_none());
    }
}
