//! Klaviyo API client for subscription management.
//!
//! Forwards captured emails to a creator's Klaviyo list. Multi-tenant:
//! one client, the list id is a per-call parameter from the creator's
//! profile. Every request carries a hard 7-second timeout; a slow
//! provider surfaces as a typed failure instead of hanging the request.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Klaviyo API version.
const API_REVISION: &str = "2024-10-15";

/// Klaviyo API base URL.
const BASE_URL: &str = "https://a.klaviyo.com/api";

/// Hard boundary on any single provider call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(7);

/// Errors that can occur when interacting with Klaviyo API.
#[derive(Debug, Error)]
pub enum KlaviyoError {
    /// HTTP request failed (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build the client or a request.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Klaviyo API client for subscription management.
#[derive(Clone)]
pub struct KlaviyoClient {
    client: reqwest::Client,
}

impl KlaviyoClient {
    /// Create a new Klaviyo API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(api_key: &SecretString) -> Result<Self, KlaviyoError> {
        let mut headers = HeaderMap::new();

        // Authorization header
        let auth_value = format!("Klaviyo-API-Key {}", api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| KlaviyoError::Parse(format!("Invalid API key format: {e}")))?,
        );

        // Revision header for API versioning
        headers.insert("revision", HeaderValue::from_static(API_REVISION));

        // Content-Type for JSON:API
        headers.insert(
            "Content-Type",
            HeaderValue::from_static("application/vnd.api+json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }

    /// Subscribe an email to a creator's list.
    ///
    /// Creates or updates a profile and subscribes it to `list_id`. Any
    /// non-2xx response (202 Accepted is the expected bulk-job status)
    /// is terminal for this request; there is no in-request retry.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the provider rejects it.
    pub async fn subscribe_email(&self, email: &str, list_id: &str) -> Result<(), KlaviyoError> {
        let url = format!("{BASE_URL}/profile-subscription-bulk-create-jobs");

        let body = serde_json::json!({
            "data": {
                "type": "profile-subscription-bulk-create-job",
                "attributes": {
                    "custom_source": "Droplink Page",
                    "profiles": {
                        "data": [{
                            "type": "profile",
                            "attributes": {
                                "email": email,
                                "subscriptions": {
                                    "email": {
                                        "marketing": {
                                            "consent": "SUBSCRIBED"
                                        }
                                    }
                                }
                            }
                        }]
                    }
                },
                "relationships": {
                    "list": {
                        "data": {
                            "type": "list",
                            "id": list_id
                        }
                    }
                }
            }
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        // 202 Accepted is the expected response for bulk jobs
        if !status.is_success() && status.as_u16() != 202 {
            let message = response.text().await.unwrap_or_default();
            return Err(KlaviyoError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
