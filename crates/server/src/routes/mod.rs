//! Route handlers and router composition.
//!
//! All mutating creator endpoints authenticate with the `X-Edit-Token`
//! header: the opaque token is the sole credential, and a missing,
//! unknown or mismatched token is always a 404 so the API never confirms
//! whether a token exists.

use axum::Router;
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use chrono::Utc;

use droplink_core::Profile;

use crate::db::ProfileRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

pub mod events;
pub mod products;
pub mod profiles;
pub mod public;
pub mod subscribe;
pub mod webhooks;

/// Header carrying the profile write credential.
pub const EDIT_TOKEN_HEADER: &str = "x-edit-token";

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/pages/{slug}", get(public::get_page))
        .route("/v1/pages/{slug}/subscribe", post(subscribe::subscribe))
        .route("/v1/events", post(events::record))
        .route("/v1/profiles", post(profiles::create_or_update))
        .route(
            "/v1/profiles/me",
            get(profiles::get_me).patch(profiles::update_me),
        )
        .route("/v1/profiles/me/products", put(products::replace))
        .route(
            "/v1/profiles/me/products/{id}/restore",
            post(products::restore),
        )
        .route("/v1/profiles/me/stats", get(events::stats))
        .route("/v1/webhooks/payments", post(webhooks::payments))
}

/// Extract the edit token from request headers.
///
/// # Errors
///
/// Returns `AppError::NotFound` when the header is missing or empty; the
/// response is indistinguishable from an unknown token.
pub fn edit_token_from(headers: &HeaderMap) -> Result<&str> {
    headers
        .get(EDIT_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::NotFound("profile".to_owned()))
}

/// Authenticated profile lookup, applying the lazy plan expiry.
///
/// Every creator endpoint funnels through here, so an expired plan steps
/// down on whichever authenticated read happens first.
///
/// # Errors
///
/// Returns `AppError::NotFound` for a missing or unknown token.
pub async fn require_profile(state: &AppState, headers: &HeaderMap) -> Result<Profile> {
    let token = edit_token_from(headers)?;
    let repo = ProfileRepository::new(state.pool());
    repo.authenticated(token, Utc::now())
        .await?
        .ok_or_else(|| AppError::NotFound("profile".to_owned()))
}
