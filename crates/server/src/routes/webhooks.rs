//! Payment provider webhook handler.
//!
//! The single external trigger that mutates committed inventory. The
//! provider's signature authenticates the request; caller-supplied
//! identifiers never do. Once the signature checks out, the answer is
//! 200 regardless of reservation outcome: the payment already settled,
//! so a reservation that cannot be applied is an inventory bookkeeping
//! problem to reconcile manually, never a reason to make the provider
//! retry a settled charge.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::instrument;

use crate::db::{ProductRepository, WebhookReceiptRepository};
use crate::error::{AppError, Result};
use crate::services::payments::{CHECKOUT_COMPLETED, parse_event, verify_signature};
use crate::state::AppState;

/// Header carrying the provider signature.
pub const SIGNATURE_HEADER: &str = "payment-signature";

/// POST /v1/webhooks/payments - settle inventory for a completed
/// checkout.
#[instrument(skip(state, headers, body))]
pub async fn payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Validation("missing webhook signature".to_owned()))?;

    verify_signature(
        &body,
        signature,
        state.config().payment_webhook_secret.expose_secret(),
    )
    .map_err(|e| AppError::Validation(e.to_string()))?;

    let event = parse_event(&body).map_err(|e| AppError::Validation(e.to_string()))?;

    if event.event_type != CHECKOUT_COMPLETED {
        tracing::debug!(event_type = %event.event_type, "Ignoring webhook event type");
        return Ok(Json(json!({ "received": true })));
    }

    let metadata = &event.data.object.metadata;
    let (Some(edit_token), Some(product_id)) =
        (metadata.edit_token.as_deref(), metadata.product_id.as_deref())
    else {
        tracing::error!(
            event_id = %event.id,
            "Settled checkout without resolvable metadata; inventory not decremented"
        );
        return Ok(Json(json!({ "received": true })));
    };

    // Redelivery dedupe: each distinct event id decrements at most once.
    // A failure here happens before any decrement, so a provider retry
    // is safe; let it surface.
    let first_delivery = WebhookReceiptRepository::new(state.pool())
        .claim(&event.id)
        .await?;
    if !first_delivery {
        tracing::info!(event_id = %event.id, "Duplicate webhook delivery ignored");
        return Ok(Json(json!({ "received": true })));
    }

    match ProductRepository::new(state.pool())
        .reserve_unit(edit_token, product_id)
        .await
    {
        Ok(outcome) if outcome.modified_any() => {
            tracing::info!(
                event_id = %event.id,
                product_id,
                "Reserved one unit for settled checkout"
            );
        }
        Ok(_) => {
            // Wrong token/product, stock untracked, or already exhausted.
            // The payment settled either way; flag for reconciliation.
            tracing::error!(
                event_id = %event.id,
                product_id,
                "Settled checkout did not match reservable stock; manual reconciliation needed"
            );
        }
        Err(e) => {
            // The receipt is already claimed, so a retry would be
            // deduped; log loudly instead of failing the provider.
            tracing::error!(
                event_id = %event.id,
                product_id,
                error = %e,
                "Reservation failed after settled checkout; manual reconciliation needed"
            );
        }
    }

    Ok(Json(json!({ "received": true })))
}
