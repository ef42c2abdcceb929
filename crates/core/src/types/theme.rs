//! Page themes and legacy theme-value normalization.
//!
//! Stored documents carry theme values in several historical shapes: a
//! plain name, the retired `"dark"` preset, or an object wrapping the name
//! under `key`, `preset` or `theme`. Decoding happens once at the storage
//! boundary: every shape is mapped into the closed [`Theme`] set here, and
//! the rest of the codebase only ever sees the canonical enum.

use serde::{Deserialize, Serialize};

/// Visual theme for a public page.
///
/// Closed set; anything unrecognized normalizes to [`Theme::BASELINE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Classic,
    Midnight,
    Ocean,
    Sunset,
    Mono,
}

/// Every stored shape a theme value has ever been written in.
///
/// Decoded with untagged serde so legacy documents load without a
/// migration; [`normalize_theme_value`] collapses all variants into a
/// [`Theme`].
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ThemeValue {
    Name(String),
    Legacy(LegacyTheme),
    Other(serde_json::Value),
}

/// Object-shaped legacy theme wrapper (`{key}`, `{preset}` or `{theme}`).
#[derive(Debug, Deserialize)]
struct LegacyTheme {
    key: Option<String>,
    preset: Option<String>,
    theme: Option<String>,
}

impl Theme {
    /// The baseline theme every unrecognized value falls back to.
    pub const BASELINE: Self = Self::Classic;

    /// Wire/storage identifier for this theme.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Midnight => "midnight",
            Self::Ocean => "ocean",
            Self::Sunset => "sunset",
            Self::Mono => "mono",
        }
    }

    /// Parse a theme name, case-insensitively.
    ///
    /// The retired `"dark"` preset maps to the baseline. Returns `None`
    /// for anything outside the closed set.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "classic" | "dark" => Some(Self::Classic),
            "midnight" => Some(Self::Midnight),
            "ocean" => Some(Self::Ocean),
            "sunset" => Some(Self::Sunset),
            "mono" => Some(Self::Mono),
            _ => None,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize any stored or submitted theme value into the closed set.
///
/// Accepts every historical shape and never fails: unrecognized values
/// (including non-string, non-object JSON) normalize to
/// [`Theme::BASELINE`].
#[must_use]
pub fn normalize_theme_value(value: &serde_json::Value) -> Theme {
    let decoded: ThemeValue = match serde_json::from_value(value.clone()) {
        Ok(v) => v,
        Err(_) => return Theme::BASELINE,
    };

    match decoded {
        ThemeValue::Name(name) => Theme::parse(&name).unwrap_or(Theme::BASELINE),
        ThemeValue::Legacy(legacy) => {
            let name = legacy.key.or(legacy.preset).or(legacy.theme);
            name.and_then(|n| Theme::parse(&n)).unwrap_or(Theme::BASELINE)
        }
        ThemeValue::Other(_) => Theme::BASELINE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_names() {
        assert_eq!(Theme::parse("classic"), Some(Theme::Classic));
        assert_eq!(Theme::parse("MIDNIGHT"), Some(Theme::Midnight));
        assert_eq!(Theme::parse(" ocean "), Some(Theme::Ocean));
        assert_eq!(Theme::parse("bogus"), None);
    }

    #[test]
    fn test_legacy_dark_maps_to_baseline() {
        assert_eq!(Theme::parse("dark"), Some(Theme::BASELINE));
        assert_eq!(normalize_theme_value(&json!("dark")), Theme::BASELINE);
    }

    #[test]
    fn test_normalize_plain_name() {
        assert_eq!(normalize_theme_value(&json!("sunset")), Theme::Sunset);
        assert_eq!(normalize_theme_value(&json!("Mono")), Theme::Mono);
    }

    #[test]
    fn test_normalize_legacy_object_shapes() {
        assert_eq!(
            normalize_theme_value(&json!({"theme": "dark"})),
            Theme::BASELINE
        );
        assert_eq!(
            normalize_theme_value(&json!({"key": "midnight"})),
            Theme::Midnight
        );
        assert_eq!(
            normalize_theme_value(&json!({"preset": "ocean"})),
            Theme::Ocean
        );
    }

    #[test]
    fn test_normalize_unrecognized_is_baseline() {
        assert_eq!(normalize_theme_value(&json!("bogus")), Theme::BASELINE);
        assert_eq!(normalize_theme_value(&json!(42)), Theme::BASELINE);
        assert_eq!(normalize_theme_value(&json!(null)), Theme::BASELINE);
        assert_eq!(
            normalize_theme_value(&json!({"unrelated": true})),
            Theme::BASELINE
        );
    }

    #[test]
    fn test_serde_uses_snake_case_names() {
        let json = serde_json::to_string(&Theme::Midnight).expect("serialize");
        assert_eq!(json, "\"midnight\"");
    }
}
