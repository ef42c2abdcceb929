//! Email capture route handler.
//!
//! Captures a visitor email for a creator, stores the subscriber pair
//! locally, and forwards to the creator's Klaviyo list when forwarding
//! is configured. The provider call carries a hard timeout and a non-2xx
//! answer is terminal for the request; the stored capture is never lost
//! either way.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Json;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use droplink_core::sanitize::valid_slug;

use crate::db::{ProfileRepository, SubscriberRepository};
use crate::error::{AppError, Result};
use crate::net::client_ip;
use crate::rate_limit::{Decision, WindowRule};
use crate::state::AppState;

/// Per-IP burst window for subscription attempts.
const IP_BURST: WindowRule = WindowRule {
    limit: 5,
    window: Duration::from_secs(60),
};

/// Per-IP sustained window for subscription attempts.
const IP_SUSTAINED: WindowRule = WindowRule {
    limit: 30,
    window: Duration::from_secs(3600),
};

/// Subscription form payload.
#[derive(Debug, Deserialize)]
pub struct SubscribePayload {
    pub email: String,
}

/// POST /v1/pages/{slug}/subscribe - capture a visitor email.
#[instrument(skip(state, headers, payload), fields(slug = %slug))]
pub async fn subscribe(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<SubscribePayload>,
) -> Result<Json<serde_json::Value>> {
    let slug = slug.trim().to_ascii_lowercase();
    if !valid_slug(&slug) {
        return Err(AppError::Validation(format!("invalid slug: {slug}")));
    }

    let ip_key = client_ip(&headers, Some(peer))
        .map_or_else(|| "unknown".to_owned(), |addr| addr.to_string());
    let checks = vec![
        (format!("sub-burst:{ip_key}"), IP_BURST),
        (format!("sub-sustained:{ip_key}"), IP_SUSTAINED),
    ];
    if let Decision::Limited { retry_after_secs } = state.limiter().check_all(&checks) {
        return Err(AppError::RateLimited {
            retry_after: retry_after_secs,
        });
    }

    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::Validation(
            "please enter a valid email address".to_owned(),
        ));
    }

    let profile = ProfileRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("page".to_owned()))?;

    // Lazily step down an expired plan before gating on it; capture must
    // not keep working on a tier the creator no longer has.
    let profile = if profile.downgrade_due(Utc::now()) {
        ProfileRepository::new(state.pool())
            .authenticated(&profile.edit_token, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound("page".to_owned()))?
    } else {
        profile
    };

    if !profile.email_capture_active() {
        return Err(AppError::Validation(
            "email capture is not enabled for this page".to_owned(),
        ));
    }

    SubscriberRepository::new(state.pool())
        .upsert(&profile.edit_token, &email)
        .await?;

    if let (Some(client), Some(list_id)) = (state.klaviyo(), profile.active_klaviyo_list()) {
        client.subscribe_email(&email, list_id).await?;
        tracing::info!(slug = %profile.slug, "Subscriber forwarded to list");
    }

    Ok(Json(json!({ "ok": true, "email": email })))
}

/// Basic email validation.
fn is_valid_email(email: &str) -> bool {
    // Simple validation: contains @, has content before and after @
    let mut parts = email.splitn(2, '@');
    let Some(local) = parts.next() else {
        return false;
    };
    let Some(domain) = parts.next() else {
        return false;
    };
    !local.is_empty() && !domain.is_empty() && domain.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("user.name+tag@domain.co.uk"));
        assert!(is_valid_email("a@b.c"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("@"));
        assert!(!is_valid_email("test@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("test@domain")); // no TLD
        assert!(!is_valid_email("test"));
    }
}
