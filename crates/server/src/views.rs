//! Public view assembly.
//!
//! Builds the anonymous-visitor representation of a profile and its
//! products. Output is an explicit allow-list: the edit token, the raw
//! Klaviyo configuration and plan internals never appear; every field is
//! re-sanitized here even though write paths sanitize too, because
//! stored documents may predate the current write rules.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use droplink_core::inventory::{
    ProductStatus, availability_label, is_purchasable, product_status, remaining_ms,
};
use droplink_core::sanitize::{
    MAX_BIO_LEN, MAX_DISPLAY_NAME_LEN, MAX_TITLE_LEN, clamp_text, clean_links,
    sanitize_href_price, sanitize_image_src,
};
use droplink_core::{Link, Product, Profile, Theme};

/// Anonymous-visitor view of a profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub slug: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: String,
    pub theme: Theme,
    pub social: BTreeMap<String, String>,
    pub links: Vec<Link>,
    /// Whether the page must render service branding (plan-gated).
    pub show_branding: bool,
    /// Whether the email capture form should render.
    pub email_capture: bool,
    /// Klaviyo list id, present only while capture resolves to active
    /// and forwarding is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub klaviyo_list_id: Option<String>,
    pub products: Vec<PublicProduct>,
}

/// Anonymous-visitor view of one product.
///
/// `status` and the label are a snapshot at assembly time; clients must
/// recompute from the timer fields on every poll rather than trusting a
/// cached status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProduct {
    pub id: String,
    pub title: String,
    /// Checkout URL; omitted entirely unless the product is purchasable
    /// right now, so sold-out and ended products never render a link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_url: Option<String>,
    pub image_url: String,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_starts_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_ends_at: Option<String>,
    pub units_left: Option<i32>,
    pub units_total: Option<i32>,
    pub status: ProductStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<i64>,
}

/// Assemble the public view of a profile and its products at `now`.
///
/// Products explicitly unpublished are excluded; legacy products without
/// the flag stay visible.
#[must_use]
pub fn assemble_public_profile(
    profile: &Profile,
    products: &[Product],
    now: DateTime<Utc>,
) -> PublicProfile {
    let klaviyo_list_id = profile.active_klaviyo_list().map(ToOwned::to_owned);

    PublicProfile {
        slug: profile.slug.clone(),
        display_name: clamp_text(&profile.display_name, MAX_DISPLAY_NAME_LEN),
        bio: clamp_text(&profile.bio, MAX_BIO_LEN),
        avatar_url: sanitize_image_src(&profile.avatar_url),
        theme: profile.theme,
        social: profile.social.clone(),
        links: clean_links(&profile.links),
        show_branding: profile.plan.limits().branding_required,
        email_capture: profile.email_capture_active(),
        klaviyo_list_id,
        products: products
            .iter()
            .filter(|p| p.is_publicly_visible())
            .map(|p| assemble_public_product(p, now))
            .collect(),
    }
}

fn assemble_public_product(product: &Product, now: DateTime<Utc>) -> PublicProduct {
    let status = product_status(product, now);
    let price_url = if is_purchasable(product, now) {
        let href = sanitize_href_price(&product.price_url);
        (!href.is_empty()).then_some(href)
    } else {
        None
    };

    PublicProduct {
        id: product.id.clone(),
        title: clamp_text(&product.title, MAX_TITLE_LEN),
        price_url,
        image_url: sanitize_image_src(&product.image_url),
        images: product
            .images
            .iter()
            .map(|i| sanitize_image_src(i))
            .filter(|i| !i.is_empty())
            .collect(),
        drop_starts_at: product.drop_starts_at.clone(),
        drop_ends_at: product.drop_ends_at.clone(),
        units_left: product.units_left,
        units_total: product.units_total,
        status,
        label: availability_label(product, now),
        remaining_ms: remaining_ms(product, now),
    }
}
