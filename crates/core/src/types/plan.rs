//! Subscription tiers and their quotas.
//!
//! Each profile carries exactly one plan. Plans are a closed set; quota
//! numbers and capability flags live here so every consumer (write API,
//! public view assembly, validation) reads from one table.

use serde::{Deserialize, Serialize};

/// Subscription tier for a creator profile.
///
/// `Pro` is the hidden promotional tier: it is never offered through the
/// public upgrade path, only granted with an expiry. Expired plans step
/// down one tier at a time on the next authenticated read
/// (`Pro` -> `Starter` -> `Free`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[default]
    Free,
    Starter,
    Pro,
}

/// Numeric quotas and capability flags for a [`Plan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    /// Maximum number of links on the profile.
    pub max_links: usize,
    /// Maximum number of products on the profile.
    pub max_products: usize,
    /// Maximum number of images per product.
    pub max_images_per_product: usize,
    /// Whether the email-capture form may be enabled.
    pub email_capture: bool,
    /// Whether the public page must show service branding.
    pub branding_required: bool,
    /// Whether a custom domain may be attached.
    pub custom_domain: bool,
    /// Whether the analytics dashboard is available.
    pub analytics: bool,
}

impl Plan {
    /// Quotas and capability flags for this tier.
    #[must_use]
    pub const fn limits(self) -> PlanLimits {
        match self {
            Self::Free => PlanLimits {
                max_links: 5,
                max_products: 1,
                max_images_per_product: 1,
                email_capture: false,
                branding_required: true,
                custom_domain: false,
                analytics: false,
            },
            Self::Starter => PlanLimits {
                max_links: 15,
                max_products: 5,
                max_images_per_product: 3,
                email_capture: true,
                branding_required: false,
                custom_domain: false,
                analytics: true,
            },
            Self::Pro => PlanLimits {
                max_links: 50,
                max_products: 20,
                max_images_per_product: 6,
                email_capture: true,
                branding_required: false,
                custom_domain: true,
                analytics: true,
            },
        }
    }

    /// The tier one step below this one.
    ///
    /// Used by the lazy expiry transition: an expired plan steps down a
    /// single tier per authenticated read, never straight to `Free`.
    #[must_use]
    pub const fn downgraded(self) -> Self {
        match self {
            Self::Pro => Self::Starter,
            Self::Starter | Self::Free => Self::Free,
        }
    }

    /// Wire/storage identifier for this tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Pro => "pro",
        }
    }

    /// Parse a stored tier value, tolerating unknown historical values.
    ///
    /// Documents written by older code may carry tier names that no longer
    /// exist; those decode as `Free` rather than failing the whole read.
    #[must_use]
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "starter" => Self::Starter,
            "pro" => Self::Pro,
            _ => Self::Free,
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
