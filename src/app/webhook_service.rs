//! Receiver for signed case-management webhooks.

use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::domain::{AppError, DatabaseClient, NewWebhookRecord, WebhookReceipt, WebhookRecord};

use super::signature::verify_signature;

/// Largest page served by the recent-webhooks listing
pub const MAX_RECENT_WEBHOOKS: i64 = 100;

/// Verifies and stores inbound webhooks.
///
/// Verification runs only when both a shared secret is configured and the
/// sender supplied a signature. Either one missing means the payload is
/// accepted unverified.
pub struct WebhookService {
    db_client: Arc<dyn DatabaseClient>,
    secret: Option<SecretString>,
}

impl WebhookService {
    #[must_use]
    pub fn new(db_client: Arc<dyn DatabaseClient>, secret: Option<SecretString>) -> Self {
        Self { db_client, secret }
    }

    /// Whether a shared secret is configured
    #[must_use]
    pub fn verifies_signatures(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify (when possible), persist, and acknowledge a webhook
    #[instrument(skip(self, payload, signature), fields(signed = signature.is_some()))]
    pub async fn receive(
        &self,
        payload: Map<String, Value>,
        signature: Option<&str>,
    ) -> Result<WebhookReceipt, AppError> {
        match (&self.secret, signature) {
            (Some(secret), Some(signature)) => {
                let body = Value::Object(payload.clone());
                if !verify_signature(secret.expose_secret().as_bytes(), &body, signature) {
                    warn!("Webhook signature mismatch");
                    return Err(AppError::Authentication("Invalid signature".to_string()));
                }
            }
            (None, Some(_)) => debug!("No webhook secret configured, signature not checked"),
            (Some(_), None) => warn!("Unsigned webhook accepted"),
            (None, None) => {}
        }

        let record =
            NewWebhookRecord::from_payload(payload, signature.map(str::to_string), Utc::now());
        let stored = self.db_client.insert_webhook(&record).await?;

        info!(id = %stored.id, event_type = %stored.event_type, "Webhook stored");

        Ok(WebhookReceipt {
            status: "received".to_string(),
            id: stored.id,
            timestamp: stored.received_at,
        })
    }

    /// Most recent webhooks first; `limit` is clamped to 1..=100
    #[instrument(skip(self))]
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<WebhookRecord>, AppError> {
        self.db_client
            .list_recent_webhooks(limit.clamp(1, MAX_RECENT_WEBHOOKS))
            .await
    }
}
