//! Creator profile route handlers.
//!
//! Onboarding mints the edit token; every later write presents it. All
//! free text, URLs, themes and socials pass the sanitization layer on
//! the way in, and plan quotas are checked before anything persists.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Json, response::IntoResponse};
use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use droplink_core::sanitize::{
    MAX_BIO_LEN, MAX_DISPLAY_NAME_LEN, clamp_text, clean_links, sanitize_image_src,
    sanitize_social, valid_slug,
};
use droplink_core::theme::normalize_theme_value;
use droplink_core::validate::validate_profile_payload;
use droplink_core::{Link, Plan, Product, Profile, Theme};

use crate::db::{ProductRepository, ProfileRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::{edit_token_from, require_profile};

/// Length of the random part of a minted edit token.
const EDIT_TOKEN_LENGTH: usize = 32;

/// Profile write payload. All fields optional; omitted fields keep their
/// stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfilePayload {
    pub slug: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    /// Accepted in any historical shape; normalized on apply.
    pub theme: Option<serde_json::Value>,
    pub social: Option<serde_json::Value>,
    pub links: Option<Vec<Link>>,
    pub collect_email: Option<bool>,
    pub klaviyo_list_id: Option<String>,
    pub klaviyo_enabled: Option<bool>,
    pub status: Option<String>,
    pub stripe_account_id: Option<String>,
}

/// Own-profile response: the full document plus products.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnProfileResponse {
    pub profile: Profile,
    pub products: Vec<Product>,
}

/// POST /v1/profiles - onboarding upsert.
///
/// Without a token header this mints a fresh profile (the token is
/// returned exactly once, in the response body); with one it behaves
/// like PATCH /v1/profiles/me.
#[instrument(skip(state, headers, payload))]
pub async fn create_or_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ProfilePayload>,
) -> Result<impl IntoResponse> {
    if edit_token_from(&headers).is_ok() {
        let response = apply_update(&state, &headers, payload).await?;
        return Ok((StatusCode::OK, Json(response)));
    }

    let slug = payload
        .slug
        .as_deref()
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| AppError::Validation("slug is required".to_owned()))?;
    if !valid_slug(&slug) {
        return Err(AppError::Validation(format!("invalid slug: {slug}")));
    }

    let mut profile = blank_profile(mint_edit_token(), slug);
    apply_payload(&mut profile, &payload)?;

    let repo = ProfileRepository::new(state.pool());
    let stored = repo.create(&profile).await.map_err(|e| match e {
        crate::db::RepositoryError::Conflict(msg) => AppError::Validation(msg),
        other => AppError::Database(other),
    })?;

    tracing::info!(slug = %stored.slug, "Profile created");
    Ok((
        StatusCode::CREATED,
        Json(OwnProfileResponse {
            profile: stored,
            products: Vec::new(),
        }),
    ))
}

/// GET /v1/profiles/me - authenticated read.
///
/// This read (like every authenticated read) applies the lazy plan
/// expiry before returning.
#[instrument(skip(state, headers))]
pub async fn get_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<OwnProfileResponse>> {
    let profile = require_profile(&state, &headers).await?;
    let products = ProductRepository::new(state.pool())
        .list_for_token(&profile.edit_token)
        .await?;

    Ok(Json(OwnProfileResponse { profile, products }))
}

/// PATCH /v1/profiles/me - partial update.
#[instrument(skip(state, headers, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ProfilePayload>,
) -> Result<Json<OwnProfileResponse>> {
    let response = apply_update(&state, &headers, payload).await?;
    Ok(Json(response))
}

async fn apply_update(
    state: &AppState,
    headers: &HeaderMap,
    payload: ProfilePayload,
) -> Result<OwnProfileResponse> {
    let mut profile = require_profile(state, headers).await?;
    apply_payload(&mut profile, &payload)?;

    let repo = ProfileRepository::new(state.pool());
    repo.update(&profile).await?;

    let products = ProductRepository::new(state.pool())
        .list_for_token(&profile.edit_token)
        .await?;

    Ok(OwnProfileResponse { profile, products })
}

/// Apply a payload onto a profile, sanitizing and quota-checking.
///
/// Quotas are validated against the raw submitted values (a 6-link
/// payload on a 5-link plan is rejected, not silently truncated);
/// sanitization then shapes what gets stored.
fn apply_payload(profile: &mut Profile, payload: &ProfilePayload) -> Result<()> {
    let candidate_links = payload.links.as_deref().unwrap_or(&profile.links);
    let candidate_collect_email = payload.collect_email.unwrap_or(profile.collect_email);
    validate_profile_payload(candidate_links, &[], candidate_collect_email, profile.plan)?;

    if let Some(display_name) = &payload.display_name {
        profile.display_name = clamp_text(display_name, MAX_DISPLAY_NAME_LEN);
    }
    if let Some(bio) = &payload.bio {
        profile.bio = clamp_text(bio, MAX_BIO_LEN);
    }
    if let Some(avatar_url) = &payload.avatar_url {
        profile.avatar_url = sanitize_image_src(avatar_url);
    }
    if let Some(theme) = &payload.theme {
        profile.theme = normalize_theme_value(theme);
    }
    if let Some(social) = &payload.social {
        profile.social = sanitize_social(social);
    }
    if let Some(links) = &payload.links {
        profile.links = clean_links(links);
    }
    if let Some(collect_email) = payload.collect_email {
        profile.collect_email = collect_email;
    }
    if let Some(list_id) = &payload.klaviyo_list_id {
        let trimmed = list_id.trim();
        profile.klaviyo_list_id = (!trimmed.is_empty()).then(|| trimmed.to_owned());
    }
    if let Some(enabled) = payload.klaviyo_enabled {
        profile.klaviyo_enabled = enabled;
    }
    if let Some(status) = &payload.status {
        profile.status = clamp_text(status, 32);
    }
    if let Some(account_id) = &payload.stripe_account_id {
        let trimmed = account_id.trim();
        profile.stripe_account_id = (!trimmed.is_empty()).then(|| trimmed.to_owned());
    }

    Ok(())
}

/// Mint a fresh edit token.
fn mint_edit_token() -> String {
    let random: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(EDIT_TOKEN_LENGTH)
        .map(char::from)
        .collect();
    format!("tok_{random}")
}

/// A new profile with defaults, before the payload is applied.
fn blank_profile(edit_token: String, slug: String) -> Profile {
    let now = Utc::now();
    Profile {
        edit_token,
        slug,
        plan: Plan::Free,
        plan_expires_at: None,
        display_name: String::new(),
        bio: String::new(),
        avatar_url: String::new(),
        theme: Theme::BASELINE,
        social: std::collections::BTreeMap::new(),
        links: Vec::new(),
        collect_email: false,
        klaviyo_list_id: None,
        klaviyo_enabled: false,
        status: "active".to_owned(),
        stripe_account_id: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn starter_profile() -> Profile {
        let mut profile = blank_profile("tok_test".to_owned(), "jane".to_owned());
        profile.plan = Plan::Starter;
        profile
    }

    #[test]
    fn test_mint_edit_token_shape() {
        let token = mint_edit_token();
        assert!(token.starts_with("tok_"));
        assert_eq!(token.len(), 4 + EDIT_TOKEN_LENGTH);
        assert_ne!(token, mint_edit_token());
    }

    #[test]
    fn test_apply_payload_sanitizes_fields() {
        let mut profile = starter_profile();
        let payload = ProfilePayload {
            display_name: Some("Jane <b>Doe</b>".to_owned()),
            avatar_url: Some("javascript:alert(1)".to_owned()),
            theme: Some(json!({"theme": "dark"})),
            links: Some(vec![
                Link {
                    label: "Shop".to_owned(),
                    url: "example.com".to_owned(),
                },
                Link {
                    label: "Dead".to_owned(),
                    url: String::new(),
                },
            ]),
            ..ProfilePayload::default()
        };

        apply_payload(&mut profile, &payload).expect("apply");
        assert_eq!(profile.display_name, "Jane bDoe/b");
        assert_eq!(profile.avatar_url, "");
        assert_eq!(profile.theme, Theme::BASELINE);
        assert_eq!(profile.links.len(), 1);
    }

    #[test]
    fn test_link_quota_rejected_on_free_accepted_on_starter() {
        let six_links: Vec<Link> = (0..6)
            .map(|i| Link {
                label: format!("l{i}"),
                url: format!("https://example.com/{i}"),
            })
            .collect();

        let mut free = blank_profile("tok_free".to_owned(), "free".to_owned());
        let payload = ProfilePayload {
            links: Some(six_links.clone()),
            ..ProfilePayload::default()
        };
        let err = apply_payload(&mut free, &payload).expect_err("free caps at 5");
        assert!(matches!(err, AppError::Quota(_)));

        let mut starter = starter_profile();
        let payload = ProfilePayload {
            links: Some(six_links),
            ..ProfilePayload::default()
        };
        apply_payload(&mut starter, &payload).expect("starter allows 15");
        assert_eq!(starter.links.len(), 6);
    }

    #[test]
    fn test_email_capture_rejected_on_free_plan() {
        let mut free = blank_profile("tok_free".to_owned(), "free".to_owned());
        let payload = ProfilePayload {
            collect_email: Some(true),
            ..ProfilePayload::default()
        };
        let err = apply_payload(&mut free, &payload).expect_err("free plan has no capture");
        assert!(matches!(err, AppError::Quota(_)));
    }

    #[test]
    fn test_empty_list_id_clears_stored_value() {
        let mut profile = starter_profile();
        profile.klaviyo_list_id = Some("LIST1".to_owned());
        let payload = ProfilePayload {
            klaviyo_list_id: Some("   ".to_owned()),
            ..ProfilePayload::default()
        };
        apply_payload(&mut profile, &payload).expect("apply");
        assert_eq!(profile.klaviyo_list_id, None);
    }
}
