use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;

use crate::orders::{Order, OrderItem};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Verify a storefront webhook signature (X-Webhook-Signature header).
///
/// The signature is the base64-encoded HMAC-SHA256 of the raw request body.
fn verify_signature(secret: &str, signature_header: &str, payload: &[u8]) -> bool {
    let expected = match base64::engine::general_purpose::STANDARD.decode(signature_header) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(payload);

    // Use constant-time comparison
    mac.verify_slice(&expected).is_ok()
}

/// "Order created" event delivered by the storefront
#[derive(Debug, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: String,
    /// Full order record, when the storefront embeds it in the event
    #[serde(default)]
    pub order: Option<OrderPayload>,
}

#[derive(Debug, Deserialize)]
pub struct OrderPayload {
    pub number: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_total")]
    pub total: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub created_at: Option<String>,
}

fn default_status() -> String {
    "pending".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_total() -> String {
    "0.00".to_string()
}

impl OrderPayload {
    fn into_order(self, order_id: &str) -> Order {
        Order {
            id: order_id.to_string(),
            number: self.number,
            status: self.status,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            currency: self.currency,
            total: self.total,
            items: serde_json::to_string(&self.items).unwrap_or_else(|_| "[]".to_string()),
            created_at: self
                .created_at
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        }
    }
}

pub async fn order_created(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    // Verify signature if secret is configured
    if let Some(ref secret) = state.config.webhooks.secret {
        let signature = headers
            .get("X-Webhook-Signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::warn!("Order webhook missing X-Webhook-Signature header");
                StatusCode::UNAUTHORIZED
            })?;

        if !verify_signature(secret, signature, &body) {
            tracing::warn!("Order webhook signature verification failed");
            return Err(StatusCode::UNAUTHORIZED);
        }
        tracing::debug!("Order webhook signature verified");
    }

    // Parse the JSON payload
    let event: OrderCreatedEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!("Failed to parse order webhook payload: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    tracing::info!(order_id = %event.order_id, "Order webhook received");

    // Persist an embedded order so later lookups by id resolve
    let order = event.order.map(|payload| payload.into_order(&event.order_id));
    if let Some(ref order) = order {
        if let Err(e) = state.orders.insert(order).await {
            tracing::error!(order_id = %order.id, error = %e, "Failed to store order");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    // Acknowledge immediately; the email pipeline is best-effort and its
    // outcome is never reported back to the storefront
    let notifier = state.notifier.clone();
    let order_id = event.order_id;
    tokio::spawn(async move {
        notifier.on_order_created(&order_id, order).await;
    });

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_signature_valid() {
        let payload = br#"{"order_id":"o-7"}"#;
        let signature = sign("hunter2", payload);
        assert!(verify_signature("hunter2", &signature, payload));
    }

    #[test]
    fn test_verify_signature_wrong_secret() {
        let payload = br#"{"order_id":"o-7"}"#;
        let signature = sign("hunter2", payload);
        assert!(!verify_signature("other-secret", &signature, payload));
    }

    #[test]
    fn test_verify_signature_tampered_payload() {
        let signature = sign("hunter2", br#"{"order_id":"o-7"}"#);
        assert!(!verify_signature("hunter2", &signature, br#"{"order_id":"o-8"}"#));
    }

    #[test]
    fn test_verify_signature_invalid_base64() {
        assert!(!verify_signature("hunter2", "not base64!!!", b"{}"));
    }

    #[test]
    fn test_order_payload_into_order() {
        let payload: OrderPayload = serde_json::from_str(
            r#"{
                "number": "1007",
                "customer_name": "Jane Doe",
                "total": "59.00",
                "items": [{"name": "Widget", "quantity": 2, "line_total": "59.00"}],
                "created_at": "2024-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();

        let order = payload.into_order("o-7");
        assert_eq!(order.id, "o-7");
        assert_eq!(order.number, "1007");
        assert_eq!(order.status, "pending");
        assert_eq!(order.currency, "USD");
        assert_eq!(order.line_items().len(), 1);
    }
}
