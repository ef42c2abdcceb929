//! Public-boundary sanitization.
//!
//! Every value served to an anonymous visitor, or accepted from an
//! anonymous caller, passes through this module. All functions are pure
//! and synchronous; none of them perform I/O or allocate beyond the
//! returned value.
//!
//! The guiding rule: stored text must never come back out as executable
//! content. Free text loses control characters and angle brackets, image
//! sources are restricted to a scheme allow-list, and hrefs either carry a
//! recognized scheme or get one.

use std::collections::BTreeMap;

/// Maximum length of a profile display name.
pub const MAX_DISPLAY_NAME_LEN: usize = 80;
/// Maximum length of a profile bio.
pub const MAX_BIO_LEN: usize = 500;
/// Maximum length of a product title.
pub const MAX_TITLE_LEN: usize = 120;
/// Maximum length of a link label.
pub const MAX_LABEL_LEN: usize = 60;

/// Platform keys allowed in a profile's social map.
pub const SOCIAL_PLATFORMS: &[&str] = &[
    "facebook",
    "github",
    "instagram",
    "linkedin",
    "tiktok",
    "twitch",
    "twitter",
    "website",
    "x",
    "youtube",
];

/// Image data-URI subtypes allowed by [`sanitize_image_src`].
const DATA_IMAGE_SUBTYPES: &[&str] = &["jpeg", "jpg", "png", "webp", "gif"];

/// Clean a free-text value for public rendering.
///
/// Strips ASCII control characters (0x00-0x1F and 0x7F) and angle
/// brackets, trims surrounding whitespace, and truncates to `max_len`
/// characters. Applied to every free-text field a visitor can see.
#[must_use]
pub fn clamp_text(value: &str, max_len: usize) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_ascii_control() && *c != '<' && *c != '>')
        .collect();
    cleaned.trim().chars().take(max_len).collect()
}

/// Validate an image source for public rendering.
///
/// Accepts exactly three shapes:
/// - an absolute `http://` or `https://` URL,
/// - a root-relative path (`/...` but not `//...`),
/// - a `data:image/...` URI whose declared subtype is on the allow-list.
///
/// Everything else (other schemes, `javascript:`, malformed data URIs,
/// protocol-relative URLs) is rejected to the empty string. Idempotent:
/// sanitizing an already-sanitized value returns it unchanged.
#[must_use]
pub fn sanitize_image_src(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return trimmed.to_owned();
    }
    if trimmed.starts_with('/') && !trimmed.starts_with("//") {
        return trimmed.to_owned();
    }
    if let Some(rest) = lower.strip_prefix("data:image/") {
        let subtype_end = rest.find([';', ',']).unwrap_or(rest.len());
        let subtype = rest.get(..subtype_end).unwrap_or("");
        if DATA_IMAGE_SUBTYPES.contains(&subtype) {
            return trimmed.to_owned();
        }
    }

    String::new()
}

/// Normalize an href for a profile link.
///
/// Pass-through for `http(s)://`, `mailto:` and `tel:`. A schemeless value
/// that looks like a bare domain (contains a dot, no whitespace) gets an
/// `https://` prefix; a value with a colon keeps the prefix treatment when
/// the part before the colon itself contains a dot (a host with a port,
/// not a scheme). Anything else, including values with internal
/// whitespace, is rejected to the empty string.
#[must_use]
pub fn sanitize_href_link(value: &str) -> String {
    sanitize_href(value)
}

/// Normalize an href for a product checkout URL.
///
/// Same policy as [`sanitize_href_link`]; kept as a distinct entry point
/// because the two fields cross the boundary at different call sites.
#[must_use]
pub fn sanitize_href_price(value: &str) -> String {
    sanitize_href(value)
}

fn sanitize_href(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return String::new();
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
    {
        return trimmed.to_owned();
    }

    match trimmed.find(':') {
        // A colon whose prefix contains a dot is a host:port, not a scheme.
        Some(pos) => {
            let prefix = trimmed.get(..pos).unwrap_or("");
            if prefix.contains('.') {
                format!("https://{trimmed}")
            } else {
                String::new()
            }
        }
        None => {
            if trimmed.contains('.') {
                format!("https://{trimmed}")
            } else {
                String::new()
            }
        }
    }
}

/// Reduce a social map to allow-listed platforms with usable URLs.
///
/// Non-string and empty values are dropped; surviving values pass through
/// [`sanitize_href_link`] and are dropped if rejected there.
#[must_use]
pub fn sanitize_social(value: &serde_json::Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let Some(map) = value.as_object() else {
        return out;
    };

    for (key, raw) in map {
        if !SOCIAL_PLATFORMS.contains(&key.as_str()) {
            continue;
        }
        let Some(s) = raw.as_str() else { continue };
        let href = sanitize_href_link(s);
        if !href.is_empty() {
            out.insert(key.clone(), href);
        }
    }

    out
}

/// Whether a value is a well-formed public slug.
///
/// Slugs are 3-40 characters of lowercase ASCII letters, digits and
/// hyphens, with no leading or trailing hyphen. Anything else is a
/// validation failure, never a lookup.
#[must_use]
pub fn valid_slug(value: &str) -> bool {
    let len = value.len();
    if !(3..=40).contains(&len) {
        return false;
    }
    if value.starts_with('-') || value.ends_with('-') {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Clean a link list for storage: labels clamped, hrefs normalized,
/// entries without a usable URL dropped.
#[must_use]
pub fn clean_links(links: &[crate::types::Link]) -> Vec<crate::types::Link> {
    links
        .iter()
        .filter_map(|link| {
            let url = sanitize_href_link(&link.url);
            if url.is_empty() {
                return None;
            }
            Some(crate::types::Link {
                label: clamp_text(&link.label, MAX_LABEL_LEN),
                url,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Link;
    use serde_json::json;

    #[test]
    fn test_clamp_text_strips_markup_and_control_chars() {
        assert_eq!(clamp_text("<script>hi</script>", 100), "scripthi/script");
        assert_eq!(clamp_text("a\u{0}b\u{1f}c\u{7f}d", 100), "abcd");
        assert_eq!(clamp_text("  padded  ", 100), "padded");
    }

    #[test]
    fn test_clamp_text_truncates() {
        assert_eq!(clamp_text("abcdef", 3), "abc");
        // Truncation counts characters, not bytes.
        assert_eq!(clamp_text("héllo", 2), "hé");
    }

    #[test]
    fn test_sanitize_image_src_accepts_allowed_shapes() {
        assert_eq!(
            sanitize_image_src("https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
        assert_eq!(sanitize_image_src("/uploads/a.jpg"), "/uploads/a.jpg");
        assert_eq!(
            sanitize_image_src("data:image/png;base64,AAAA"),
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn test_sanitize_image_src_rejects_everything_else() {
        assert_eq!(sanitize_image_src("javascript:alert(1)"), "");
        assert_eq!(sanitize_image_src("//evil.example.com/a.png"), "");
        assert_eq!(sanitize_image_src("data:image/svg+xml;base64,AAAA"), "");
        assert_eq!(sanitize_image_src("data:text/html,hi"), "");
        assert_eq!(sanitize_image_src("ftp://example.com/a.png"), "");
        assert_eq!(sanitize_image_src(""), "");
    }

    #[test]
    fn test_sanitize_image_src_is_idempotent() {
        for input in [
            "https://cdn.example.com/a.png",
            "/uploads/a.jpg",
            "data:image/webp;base64,AAAA",
            "javascript:alert(1)",
            "  https://cdn.example.com/b.gif  ",
        ] {
            let once = sanitize_image_src(input);
            assert_eq!(sanitize_image_src(&once), once, "not idempotent: {input}");
        }
    }

    #[test]
    fn test_sanitize_href_prefixes_bare_domains() {
        assert_eq!(sanitize_href_link("example.com"), "https://example.com");
        assert_eq!(
            sanitize_href_link("shop.example.com/item"),
            "https://shop.example.com/item"
        );
    }

    #[test]
    fn test_sanitize_href_passes_known_schemes() {
        assert_eq!(
            sanitize_href_link("https://example.com"),
            "https://example.com"
        );
        assert_eq!(sanitize_href_link("http://example.com"), "http://example.com");
        assert_eq!(sanitize_href_link("mailto:a@b.com"), "mailto:a@b.com");
        assert_eq!(sanitize_href_link("tel:+15551234"), "tel:+15551234");
    }

    #[test]
    fn test_sanitize_href_rejects_bad_values() {
        assert_eq!(sanitize_href_link("javascript:alert(1)"), "");
        assert_eq!(sanitize_href_link("data:text/html,hi"), "");
        assert_eq!(sanitize_href_link("has space.com"), "");
        assert_eq!(sanitize_href_link("nodot"), "");
        assert_eq!(sanitize_href_link(""), "");
    }

    #[test]
    fn test_sanitize_href_dotted_prefix_is_a_host_port() {
        assert_eq!(
            sanitize_href_link("example.com:8080/x"),
            "https://example.com:8080/x"
        );
        // No dot before the colon reads as an unrecognized scheme.
        assert_eq!(sanitize_href_link("custom:payload"), "");
    }

    #[test]
    fn test_sanitize_href_price_matches_link_policy() {
        assert_eq!(
            sanitize_href_price("buy.example.com/p1"),
            "https://buy.example.com/p1"
        );
        assert_eq!(sanitize_href_price("javascript:alert(1)"), "");
    }

    #[test]
    fn test_sanitize_social_keeps_only_allowlisted_platforms() {
        let input = json!({
            "instagram": "instagram.com/jane",
            "myspace": "myspace.com/jane",
            "github": "",
            "tiktok": 42,
            "x": "https://x.com/jane",
        });
        let social = sanitize_social(&input);
        assert_eq!(
            social.get("instagram").map(String::as_str),
            Some("https://instagram.com/jane")
        );
        assert_eq!(social.get("x").map(String::as_str), Some("https://x.com/jane"));
        assert!(!social.contains_key("myspace"));
        assert!(!social.contains_key("github"));
        assert!(!social.contains_key("tiktok"));
    }

    #[test]
    fn test_sanitize_social_non_object_is_empty() {
        assert!(sanitize_social(&json!("instagram.com/jane")).is_empty());
        assert!(sanitize_social(&json!(null)).is_empty());
    }

    #[test]
    fn test_valid_slug() {
        assert!(valid_slug("jane"));
        assert!(valid_slug("jane-doe-2"));
        assert!(!valid_slug("ab"));
        assert!(!valid_slug("-jane"));
        assert!(!valid_slug("jane-"));
        assert!(!valid_slug("Jane"));
        assert!(!valid_slug("jane doe"));
        assert!(!valid_slug(&"a".repeat(41)));
    }

    #[test]
    fn test_clean_links_drops_entries_without_url() {
        let links = vec![
            Link {
                label: "Shop".to_owned(),
                url: "example.com/shop".to_owned(),
            },
            Link {
                label: "Broken".to_owned(),
                url: String::new(),
            },
            Link {
                label: "Evil".to_owned(),
                url: "javascript:alert(1)".to_owned(),
            },
        ];
        let cleaned = clean_links(&links);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.first().map(|l| l.url.as_str()), Some("https://example.com/shop"));
    }
}
