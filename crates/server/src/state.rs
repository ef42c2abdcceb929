//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;
use crate::services::klaviyo::KlaviyoClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; constructed once at startup and injected
/// into every handler, so there is no process-global connection state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    klaviyo: Option<KlaviyoClient>,
    limiter: RateLimiter,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The Klaviyo client is only built when an API key is configured;
    /// without one, email captures are stored locally and forwarding is
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the Klaviyo client fails to build.
    pub fn new(
        config: ServerConfig,
        pool: PgPool,
    ) -> Result<Self, crate::services::klaviyo::KlaviyoError> {
        let klaviyo = config
            .klaviyo_api_key
            .as_ref()
            .map(KlaviyoClient::new)
            .transpose()?;
        let limiter = RateLimiter::in_process(config.rate_limit_enabled);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                klaviyo,
                limiter,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the Klaviyo client, if forwarding is configured.
    #[must_use]
    pub fn klaviyo(&self) -> Option<&KlaviyoClient> {
        self.inner.klaviyo.as_ref()
    }

    /// Get a reference to the abuse limiter.
    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }
}
