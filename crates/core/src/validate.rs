//! Plan-quota validation for profile payloads.
//!
//! Runs before sanitization on every profile write. Each rejection names
//! the offending field and limit so the creator-facing UI can surface a
//! specific reason instead of a generic failure.

use crate::sanitize::sanitize_image_src;
use crate::types::{Link, Plan, Product};

/// File extensions accepted for product image URLs.
const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// A profile payload rejection with a quota-specific reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaError {
    #[error("your plan allows up to {max} links (got {got})")]
    TooManyLinks { max: usize, got: usize },

    #[error("your plan allows up to {max} products (got {got})")]
    TooManyProducts { max: usize, got: usize },

    #[error("product {product_id} has {got} images; your plan allows {max} per product")]
    TooManyImages {
        product_id: String,
        max: usize,
        got: usize,
    },

    #[error("product {product_id} has an image without a URL")]
    MissingImageUrl { product_id: String },

    #[error("product {product_id} image is not an allowed format (jpg, jpeg, png, webp, gif): {url}")]
    BadImageExtension { product_id: String, url: String },

    #[error("email capture is not available on your plan")]
    EmailCaptureNotAllowed,
}

/// Validate a profile payload against the caller's plan quotas.
///
/// Checks, in order: link count, product count, per-product image count,
/// image URL presence, image URL format, and the email-capture flag.
///
/// # Errors
///
/// Returns the first [`QuotaError`] encountered.
pub fn validate_profile_payload(
    links: &[Link],
    products: &[Product],
    collect_email: bool,
    plan: Plan,
) -> Result<(), QuotaError> {
    let limits = plan.limits();

    if links.len() > limits.max_links {
        return Err(QuotaError::TooManyLinks {
            max: limits.max_links,
            got: links.len(),
        });
    }

    if products.len() > limits.max_products {
        return Err(QuotaError::TooManyProducts {
            max: limits.max_products,
            got: products.len(),
        });
    }

    for product in products {
        if product.images.len() > limits.max_images_per_product {
            return Err(QuotaError::TooManyImages {
                product_id: product.id.clone(),
                max: limits.max_images_per_product,
                got: product.images.len(),
            });
        }

        for image in &product.images {
            if image.trim().is_empty() {
                return Err(QuotaError::MissingImageUrl {
                    product_id: product.id.clone(),
                });
            }
            if !image_url_allowed(image) {
                return Err(QuotaError::BadImageExtension {
                    product_id: product.id.clone(),
                    url: image.clone(),
                });
            }
        }
    }

    if collect_email && !limits.email_capture {
        return Err(QuotaError::EmailCaptureNotAllowed);
    }

    Ok(())
}

/// Whether an image URL survives sanitization and carries an allowed
/// extension (data URIs are already subtype-checked by the sanitizer).
#[must_use]
pub fn image_url_allowed(url: &str) -> bool {
    let sanitized = sanitize_image_src(url);
    if sanitized.is_empty() {
        return false;
    }
    if sanitized.to_ascii_lowercase().starts_with("data:image/") {
        return true;
    }

    // Extension check on the path, ignoring query string and fragment.
    let path = sanitized
        .split(['?', '#'])
        .next()
        .unwrap_or(&sanitized)
        .to_ascii_lowercase();
    path.rsplit('.')
        .next()
        .is_some_and(|ext| ALLOWED_IMAGE_EXTENSIONS.contains(&ext))
}
