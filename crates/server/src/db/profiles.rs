//! Profile repository.
//!
//! Profiles are looked up externally by `edit_token` (authenticated
//! paths) or `slug` (anonymous paths); the internal UUID never leaves the
//! database layer. Stored documents may predate the current shape, so
//! theme, plan, links and social decode tolerantly at this boundary and
//! the rest of the codebase only sees canonical domain types.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use droplink_core::theme::normalize_theme_value;
use droplink_core::{Link, Plan, Profile};

use super::{RepositoryError, UpdateOutcome};

const PROFILE_COLUMNS: &str = "edit_token, slug, plan, plan_expires_at, display_name, bio, \
     avatar_url, theme, social, links, collect_email, klaviyo_list_id, klaviyo_enabled, \
     status, stripe_account_id, created_at, updated_at";

/// Raw profile row; decoded into [`Profile`] with legacy tolerance.
#[derive(sqlx::FromRow)]
struct ProfileRow {
    edit_token: String,
    slug: String,
    plan: String,
    plan_expires_at: Option<DateTime<Utc>>,
    display_name: String,
    bio: String,
    avatar_url: String,
    theme: String,
    social: Json<serde_json::Value>,
    links: Json<serde_json::Value>,
    collect_email: bool,
    klaviyo_list_id: Option<String>,
    klaviyo_enabled: bool,
    status: String,
    stripe_account_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        // Versioned decode: legacy theme shapes and unknown plan names
        // normalize here, once, instead of at every read site.
        let theme = normalize_theme_value(&serde_json::Value::String(row.theme));
        let plan = Plan::parse_lossy(&row.plan);
        let links: Vec<Link> = serde_json::from_value(row.links.0).unwrap_or_default();
        let social = droplink_core::sanitize::sanitize_social(&row.social.0);

        Self {
            edit_token: row.edit_token,
            slug: row.slug,
            plan,
            plan_expires_at: row.plan_expires_at,
            display_name: row.display_name,
            bio: row.bio,
            avatar_url: row.avatar_url,
            theme,
            social,
            links,
            collect_email: row.collect_email,
            klaviyo_list_id: row.klaviyo_list_id,
            klaviyo_enabled: row.klaviyo_enabled,
            status: row.status,
            stripe_account_id: row.stripe_account_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for profile database operations.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a profile by its edit token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_token(&self, edit_token: &str) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE edit_token = $1"
        ))
        .bind(edit_token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Profile::from))
    }

    /// Get a profile by its public slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Profile::from))
    }

    /// Authenticated lookup by edit token, applying the lazy plan expiry.
    ///
    /// If the plan expiry has passed, the plan steps down one tier and
    /// the expiry is cleared before the profile is returned. This is the
    /// only place the transition happens; there is no background job.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn authenticated(
        &self,
        edit_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Profile>, RepositoryError> {
        let Some(mut profile) = self.get_by_token(edit_token).await? else {
            return Ok(None);
        };

        if profile.downgrade_due(now) {
            let next = profile.plan.downgraded();
            sqlx::query(
                "UPDATE profiles SET plan = $1, plan_expires_at = NULL, updated_at = now() \
                 WHERE edit_token = $2",
            )
            .bind(next.as_str())
            .bind(edit_token)
            .execute(self.pool)
            .await?;

            tracing::info!(
                slug = %profile.slug,
                from = %profile.plan,
                to = %next,
                "Plan expired, stepped down one tier"
            );

            profile.plan = next;
            profile.plan_expires_at = None;
        }

        Ok(Some(profile))
    }

    /// Insert a new profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug (or token) is
    /// already taken, `RepositoryError::Database` for other failures.
    pub async fn create(&self, profile: &Profile) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "INSERT INTO profiles (edit_token, slug, plan, plan_expires_at, display_name, bio, \
             avatar_url, theme, social, links, collect_email, klaviyo_list_id, klaviyo_enabled, \
             status, stripe_account_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(&profile.edit_token)
        .bind(&profile.slug)
        .bind(profile.plan.as_str())
        .bind(profile.plan_expires_at)
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(&profile.avatar_url)
        .bind(profile.theme.as_str())
        .bind(Json(&profile.social))
        .bind(Json(&profile.links))
        .bind(profile.collect_email)
        .bind(&profile.klaviyo_list_id)
        .bind(profile.klaviyo_enabled)
        .bind(&profile.status)
        .bind(&profile.stripe_account_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("slug already taken".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(Profile::from(row))
    }

    /// Overwrite the mutable fields of a profile, keyed by edit token.
    ///
    /// The token itself, the slug and the timestamps are not touched;
    /// the token is immutable by contract and slug changes are not a
    /// supported operation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(&self, profile: &Profile) -> Result<UpdateOutcome, RepositoryError> {
        let result = sqlx::query(
            "UPDATE profiles SET plan = $1, plan_expires_at = $2, display_name = $3, bio = $4, \
             avatar_url = $5, theme = $6, social = $7, links = $8, collect_email = $9, \
             klaviyo_list_id = $10, klaviyo_enabled = $11, status = $12, \
             stripe_account_id = $13, updated_at = now() \
             WHERE edit_token = $14",
        )
        .bind(profile.plan.as_str())
        .bind(profile.plan_expires_at)
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(&profile.avatar_url)
        .bind(profile.theme.as_str())
        .bind(Json(&profile.social))
        .bind(Json(&profile.links))
        .bind(profile.collect_email)
        .bind(&profile.klaviyo_list_id)
        .bind(profile.klaviyo_enabled)
        .bind(&profile.status)
        .bind(&profile.stripe_account_id)
        .bind(&profile.edit_token)
        .execute(self.pool)
        .await?;

        Ok(UpdateOutcome::rows(result.rows_affected()))
    }
}
