//! Event intake and aggregation route handlers.
//!
//! Intake is guarded by several simultaneous rate windows (per-IP burst,
//! per-IP sustained, per-identity-and-type); a request must pass all of
//! them. Accepted events persist best-effort on a detached task, so the
//! endpoint answers 202 whether or not the insert later succeeds.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::http::header::USER_AGENT;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use droplink_core::EventType;
use droplink_core::sanitize::{clamp_text, valid_slug};

use crate::db::events::{EventStat, NewEvent, record_detached};
use crate::db::{EventRepository, ProfileRepository};
use crate::error::{AppError, Result};
use crate::net::{anonymize_ip, client_ip};
use crate::rate_limit::{Decision, WindowRule};
use crate::state::AppState;

use super::require_profile;

/// Per-IP burst window.
const IP_BURST: WindowRule = WindowRule {
    limit: 10,
    window: Duration::from_secs(10),
};

/// Per-IP sustained window.
const IP_SUSTAINED: WindowRule = WindowRule {
    limit: 100,
    window: Duration::from_secs(600),
};

/// Per-profile-and-type window.
const IDENTITY_TYPE: WindowRule = WindowRule {
    limit: 300,
    window: Duration::from_secs(3600),
};

/// Window inside which identical page views from one IP collapse.
const EVENT_DEDUPE_TTL: Duration = Duration::from_secs(60);

/// Event intake payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub slug: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub product_id: Option<String>,
    #[serde(rename = "ref")]
    pub referrer: Option<String>,
}

/// POST /v1/events - record a visitor event.
#[instrument(skip(state, headers, payload))]
pub async fn record(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<EventPayload>,
) -> Result<StatusCode> {
    let slug = payload.slug.trim().to_ascii_lowercase();
    if !valid_slug(&slug) {
        return Err(AppError::Validation(format!("invalid slug: {slug}")));
    }
    let event_type: EventType = payload
        .event_type
        .parse()
        .map_err(AppError::Validation)?;

    let profile = ProfileRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("page".to_owned()))?;

    let ip = client_ip(&headers, Some(peer));
    let ip_key = ip.map_or_else(|| "unknown".to_owned(), |addr| addr.to_string());

    let checks = vec![
        (format!("evt-burst:{ip_key}"), IP_BURST),
        (format!("evt-sustained:{ip_key}"), IP_SUSTAINED),
        (
            format!("evt-ident:{}:{event_type}", profile.edit_token),
            IDENTITY_TYPE,
        ),
    ];
    if let Decision::Limited { retry_after_secs } = state.limiter().check_all(&checks) {
        return Err(AppError::RateLimited {
            retry_after: retry_after_secs,
        });
    }

    // Repeat page views from one IP collapse into a single stored event;
    // redundant hits are accepted but not persisted.
    if event_type == EventType::PageView {
        let product_key = payload.product_id.as_deref().unwrap_or("-");
        let dedupe_key = format!("evt-view:{ip_key}:{slug}:{product_key}");
        if !state.limiter().dedupe_once(&dedupe_key, EVENT_DEDUPE_TTL) {
            return Ok(StatusCode::ACCEPTED);
        }
    }

    let ua = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| clamp_text(v, 256));

    record_detached(
        state.pool().clone(),
        NewEvent {
            event_type,
            product_id: payload
                .product_id
                .as_deref()
                .map(|p| clamp_text(p, 64))
                .filter(|p| !p.is_empty()),
            edit_token: profile.edit_token,
            slug,
            ts: Utc::now(),
            referrer: payload
                .referrer
                .as_deref()
                .map(|r| clamp_text(r, 256))
                .filter(|r| !r.is_empty()),
            ua,
            ip: ip.map(anonymize_ip),
        },
    );

    Ok(StatusCode::ACCEPTED)
}

/// GET /v1/profiles/me/stats - per-product event rollup.
#[instrument(skip(state, headers))]
pub async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    let profile = require_profile(&state, &headers).await?;

    if !profile.plan.limits().analytics {
        return Err(AppError::Validation(
            "analytics is not available on your plan".to_owned(),
        ));
    }

    let stats: Vec<EventStat> = EventRepository::new(state.pool())
        .aggregate(&profile.edit_token)
        .await?;

    Ok(Json(json!({ "stats": stats })))
}
