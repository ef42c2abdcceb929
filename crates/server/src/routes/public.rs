//! Public page route handler.
//!
//! Serves the sanitized, plan-gated view of a profile to anonymous
//! visitors. Optionally records a page view: bot traffic never counts,
//! repeats from one IP collapse into a single stored event, and the
//! write itself runs on a detached task that can never fail the
//! response.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Json;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::HeaderMap;
use axum::http::header::{REFERER, USER_AGENT};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use droplink_core::EventType;
use droplink_core::sanitize::valid_slug;

use crate::db::events::{NewEvent, record_detached};
use crate::db::{ProductRepository, ProfileRepository};
use crate::error::{AppError, Result};
use crate::net::{anonymize_ip, client_ip, is_bot_user_agent};
use crate::state::AppState;
use crate::views::{PublicProfile, assemble_public_profile};

/// Window inside which repeat views from one IP collapse to one event.
const VIEW_DEDUPE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// `1`/`true` requests a view-count increment.
    pub track: Option<String>,
}

/// GET /v1/pages/{slug} - public page view.
#[instrument(skip(state, headers, query), fields(slug = %slug))]
pub async fn get_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<PublicProfile>> {
    let slug = slug.trim().to_ascii_lowercase();
    if !valid_slug(&slug) {
        return Err(AppError::Validation(format!("invalid slug: {slug}")));
    }

    let profile = ProfileRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("page".to_owned()))?;

    let products = ProductRepository::new(state.pool())
        .list_for_slug(&slug)
        .await?;

    let now = Utc::now();
    let view = assemble_public_profile(&profile, &products, now);

    if wants_tracking(&query) {
        maybe_record_view(&state, &profile.edit_token, &slug, &headers, peer);
    }

    Ok(Json(view))
}

fn wants_tracking(query: &PageQuery) -> bool {
    matches!(query.track.as_deref(), Some("1" | "true"))
}

/// Record a page view when the caller is not a bot and the (ip, slug)
/// pair has not been seen inside the dedupe window. Fire-and-forget.
fn maybe_record_view(
    state: &AppState,
    edit_token: &str,
    slug: &str,
    headers: &HeaderMap,
    peer: SocketAddr,
) {
    let ua = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);

    if ua.as_deref().is_some_and(is_bot_user_agent) {
        return;
    }

    let ip = client_ip(headers, Some(peer));
    let dedupe_key = format!(
        "view:{}:{slug}",
        ip.map_or_else(|| "unknown".to_owned(), |addr| addr.to_string())
    );
    if !state.limiter().dedupe_once(&dedupe_key, VIEW_DEDUPE_TTL) {
        return;
    }

    let referrer = headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);

    record_detached(
        state.pool().clone(),
        NewEvent {
            event_type: EventType::PageView,
            product_id: None,
            edit_token: edit_token.to_owned(),
            slug: slug.to_owned(),
            ts: Utc::now(),
            referrer,
            ua,
            ip: ip.map(anonymize_ip),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_tracking() {
        assert!(wants_tracking(&PageQuery {
            track: Some("1".to_owned())
        }));
        assert!(wants_tracking(&PageQuery {
            track: Some("true".to_owned())
        }));
        assert!(!wants_tracking(&PageQuery {
            track: Some("0".to_owned())
        }));
        assert!(!wants_tracking(&PageQuery { track: None }));
    }
}
