// src/integrations/stripe.rs

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize};
use sha2::Sha256;

use crate::{common::error::AppError, config::settings::StripeSettings};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_id: String,
    pub price: String,
    pub mode: String,
    pub payment_method_types: Vec<String>,
    /// Echoed back in the webhook as `metadata.user_id`.
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
}

impl CheckoutSession {
    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get("user_id").map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct CustomerObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionList {
    data: Vec<CustomerObject>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

/// The payment processor operations the billing flows depend on.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_customer(&self, email: &str) -> Result<String, AppError>;

    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, AppError>;

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession, AppError>;

    async fn list_subscription_ids(&self, customer_id: &str) -> Result<Vec<String>, AppError>;

    async fn cancel_at_period_end(&self, subscription_id: &str) -> Result<(), AppError>;
}

pub struct StripeClient {
    http_client: reqwest::Client,
    api_base: String,
    secret_key: String,
    success_url: String,
    cancel_url: String,
}

impl StripeClient {
    pub fn new(settings: &StripeSettings) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            http_client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            secret_key: settings.secret_key.clone(),
            success_url: settings.success_url.clone(),
            cancel_url: settings.cancel_url.clone(),
        })
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, AppError> {
        let response = request
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::Payment(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(AppError::Payment(message));
        }

        response.json::<T>().await.map_err(|e| AppError::Payment(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_customer(&self, email: &str) -> Result<String, AppError> {
        let request = self
            .http_client
            .post(format!("{}/customers", self.api_base))
            .form(&[("email", email)]);
        let customer: CustomerObject = self.send(request).await?;
        tracing::info!(customer_id = %customer.id, "Created payment processor customer");
        Ok(customer.id)
    }

    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, AppError> {
        let mut form: Vec<(String, String)> = vec![
            ("customer".to_string(), request.customer_id.clone()),
            ("mode".to_string(), request.mode.clone()),
            ("line_items[0][price]".to_string(), request.price.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
            ("metadata[user_id]".to_string(), request.user_id.clone()),
        ];
        for (i, method) in request.payment_method_types.iter().enumerate() {
            form.push((format!("payment_method_types[{i}]"), method.clone()));
        }

        let http_request = self
            .http_client
            .post(format!("{}/checkout/sessions", self.api_base))
            .form(&form);
        self.send(http_request).await
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession, AppError> {
        let request = self
            .http_client
            .get(format!("{}/checkout/sessions/{}", self.api_base, session_id));
        self.send(request).await
    }

    async fn list_subscription_ids(&self, customer_id: &str) -> Result<Vec<String>, AppError> {
        let request = self
            .http_client
            .get(format!("{}/subscriptions", self.api_base))
            .query(&[("customer", customer_id), ("status", "all")]);
        let list: SubscriptionList = self.send(request).await?;
        Ok(list.data.into_iter().map(|s| s.id).collect())
    }

    async fn cancel_at_period_end(&self, subscription_id: &str) -> Result<(), AppError> {
        let request = self
            .http_client
            .post(format!("{}/subscriptions/{}", self.api_base, subscription_id))
            .form(&[("cancel_at_period_end", "true")]);
        let _: CustomerObject = self.send(request).await?;
        Ok(())
    }
}

// ---
// Webhook signatures
// ---

/// Verifies a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against
/// HMAC-SHA256 of `"{t}.{payload}"`, rejecting timestamps outside `tolerance_secs`.
pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), AppError> {
    let invalid = || AppError::InvalidRequest("Invalid webhook signature".to_string());

    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(invalid)?;
    if (now - timestamp).abs() > tolerance_secs {
        return Err(invalid());
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| invalid())?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(invalid())
}

#[cfg(test)]
pub(crate) fn sign_webhook_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"type":"checkout.session.completed"}"#;

    #[test]
    fn accepts_a_fresh_valid_signature() {
        let header = sign_webhook_payload(BODY, SECRET, 1_700_000_000);
        assert!(verify_webhook_signature(BODY, &header, SECRET, 300, 1_700_000_100).is_ok());
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let header = sign_webhook_payload(BODY, SECRET, 1_700_000_000);
        assert!(verify_webhook_signature(b"{}", &header, SECRET, 300, 1_700_000_000).is_err());
        assert!(verify_webhook_signature(BODY, &header, "other", 300, 1_700_000_000).is_err());
    }

    #[test]
    fn rejects_stale_timestamps() {
        let header = sign_webhook_payload(BODY, SECRET, 1_700_000_000);
        assert!(verify_webhook_signature(BODY, &header, SECRET, 300, 1_700_000_301).is_err());
    }

    #[test]
    fn any_matching_v1_entry_is_enough() {
        let valid = sign_webhook_payload(BODY, SECRET, 42);
        let v1 = valid.split("v1=").nth(1).unwrap();
        let header = format!("t=42,v1=deadbeef,v0=ignored,v1={v1}");
        assert!(verify_webhook_signature(BODY, &header, SECRET, 300, 42).is_ok());
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert!(verify_webhook_signature(BODY, "", SECRET, 300, 0).is_err());
        assert!(verify_webhook_signature(BODY, "t=abc,v1=00", SECRET, 300, 0).is_err());
    }

    #[test]
    fn session_exposes_user_metadata() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "url": null,
            "customer": "cus_1",
            "subscription": "sub_1",
            "payment_status": "paid",
            "metadata": {"user_id": "abc"}
        }))
        .unwrap();
        assert_eq!(session.user_id(), Some("abc"));
    }
}
