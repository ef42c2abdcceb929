//! Creator profiles and links.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plan::Plan;
use super::theme::Theme;

/// A single entry in the ordered link list of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Link {
    pub label: String,
    pub url: String,
}

/// A creator profile, the root entity for all other state.
///
/// `edit_token` is the sole write credential: opaque, immutable once
/// minted, never served to anonymous callers. `slug` is the public lookup
/// key. Products live in their own keyed collection and are composed with
/// the profile at the API layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub edit_token: String,
    pub slug: String,
    pub plan: Plan,
    /// When set, the plan steps down one tier on the first authenticated
    /// read at or past this instant (lazy transition, no background job).
    pub plan_expires_at: Option<DateTime<Utc>>,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: String,
    pub theme: Theme,
    /// Allow-listed platform name -> profile URL.
    pub social: BTreeMap<String, String>,
    pub links: Vec<Link>,
    pub collect_email: bool,
    pub klaviyo_list_id: Option<String>,
    pub klaviyo_enabled: bool,
    /// Informational lifecycle flag; does not gate visibility on its own.
    pub status: String,
    /// Connected payment sub-account, set once onboarding completes.
    pub stripe_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Whether the plan expiry has passed and a step-down is due.
    #[must_use]
    pub fn downgrade_due(&self, now: DateTime<Utc>) -> bool {
        self.plan_expires_at.is_some_and(|expires| now >= expires)
    }

    /// Whether email capture is live for this profile.
    ///
    /// Requires both the creator opt-in and a plan whose quota table
    /// allows capture; the Klaviyo toggle/list only control forwarding.
    #[must_use]
    pub fn email_capture_active(&self) -> bool {
        self.collect_email && self.plan.limits().email_capture
    }

    /// The Klaviyo list to forward captures to, when forwarding is on.
    #[must_use]
    pub fn active_klaviyo_list(&self) -> Option<&str> {
        if !self.email_capture_active() || !self.klaviyo_enabled {
            return None;
        }
        self.klaviyo_list_id.as_deref().filter(|id| !id.is_empty())
    }
}
