// src/services/payment_service.rs

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::settings::StripeSettings,
    db::{SubscriptionRepository, UserRepository},
    integrations::stripe::{verify_webhook_signature, CheckoutRequest, PaymentGateway},
    models::{
        auth::{AuthResponse, CurrentUser},
        billing::{CheckoutResponse, DeletionResponse, SubscriptionStatus, WebhookAck},
    },
    services::auth::AuthService,
};

/// Processor events this service reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    CheckoutCompleted {
        user_id: Option<Uuid>,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    },
    SubscriptionUpdated {
        subscription_id: String,
        status: SubscriptionStatus,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    },
    SubscriptionDeleted {
        subscription_id: String,
    },
    Ignored(String),
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

fn string_at(object: &Value, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

impl PaymentEvent {
    pub fn parse(event: &Value) -> Result<Self, AppError> {
        let kind = event
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::InvalidRequest("Webhook event has no type".to_string()))?;
        let object = event.pointer("/data/object").cloned().unwrap_or(Value::Null);

        let parsed = match kind {
            "checkout.session.completed" => PaymentEvent::CheckoutCompleted {
                user_id: object
                    .pointer("/metadata/user_id")
                    .and_then(Value::as_str)
                    .and_then(|id| Uuid::parse_str(id).ok()),
                customer_id: string_at(&object, "customer"),
                subscription_id: string_at(&object, "subscription"),
            },
            "customer.subscription.updated" | "customer.subscription.deleted" => {
                let subscription_id = string_at(&object, "id").ok_or_else(|| {
                    AppError::InvalidRequest("Subscription event has no id".to_string())
                })?;
                if kind == "customer.subscription.deleted" {
                    PaymentEvent::SubscriptionDeleted { subscription_id }
                } else {
                    PaymentEvent::SubscriptionUpdated {
                        subscription_id,
                        status: SubscriptionStatus::from_processor(
                            object.get("status").and_then(Value::as_str).unwrap_or_default(),
                        ),
                        period_start: object.get("current_period_start").and_then(timestamp),
                        period_end: object.get("current_period_end").and_then(timestamp),
                    }
                }
            }
            other => PaymentEvent::Ignored(other.to_string()),
        };
        Ok(parsed)
    }
}

#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
    user_repo: UserRepository,
    subscription_repo: SubscriptionRepository,
    auth_service: AuthService,
    payments: Arc<dyn PaymentGateway>,
    stripe: StripeSettings,
}

impl PaymentService {
    pub fn new(
        pool: PgPool,
        user_repo: UserRepository,
        subscription_repo: SubscriptionRepository,
        auth_service: AuthService,
        payments: Arc<dyn PaymentGateway>,
        stripe: StripeSettings,
    ) -> Self {
        Self { pool, user_repo, subscription_repo, auth_service, payments, stripe }
    }

    pub async fn create_checkout_session(
        &self,
        current: &CurrentUser,
        user_id: Uuid,
        price: String,
        mode: String,
        payment_type: String,
    ) -> Result<CheckoutResponse, AppError> {
        if current.id != user_id {
            return Err(AppError::InvalidCustomer);
        }
        let user = self.user_repo.find_by_id(user_id).await?.ok_or(AppError::UserNotFound)?;
        let customer_id = user.stripe_customer_id.clone().ok_or(AppError::InvalidCustomer)?;

        let session = self
            .payments
            .create_checkout_session(&CheckoutRequest {
                customer_id,
                price,
                mode,
                payment_method_types: vec![payment_type],
                user_id: user.id.to_string(),
            })
            .await?;

        let url = session
            .url
            .ok_or_else(|| AppError::Payment("checkout session has no url".to_string()))?;
        Ok(CheckoutResponse { url })
    }

    /// Confirms a completed checkout by session id and signs the user in.
    pub async fn confirm_checkout(&self, session_id: &str) -> Result<AuthResponse, AppError> {
        let session = self.payments.retrieve_checkout_session(session_id).await?;
        if !matches!(session.payment_status.as_deref(), Some("paid") | Some("no_payment_required")) {
            return Err(AppError::InvalidRequest("Payment has not been completed".to_string()));
        }
        let user_id = session
            .user_id()
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or(AppError::InvalidCustomer)?;

        self.mark_paid(user_id, session.subscription.as_deref()).await
    }

    async fn mark_paid(&self, user_id: Uuid, subscription_id: Option<&str>) -> Result<AuthResponse, AppError> {
        let mut tx = self.pool.begin().await?;
        let user = self
            .user_repo
            .set_paid(&mut *tx, user_id, true)
            .await?
            .ok_or(AppError::UserNotFound)?;
        self.subscription_repo.activate(&mut *tx, user_id, subscription_id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, "Payment confirmed");
        self.auth_service.auth_response(&user)
    }

    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookAck, AppError> {
        verify_webhook_signature(
            payload,
            signature,
            &self.stripe.webhook_secret,
            self.stripe.webhook_tolerance_secs,
            Utc::now().timestamp(),
        )?;

        let event: Value = serde_json::from_slice(payload)
            .map_err(|e| AppError::InvalidRequest(format!("Webhook body is not JSON: {e}")))?;

        match PaymentEvent::parse(&event)? {
            PaymentEvent::CheckoutCompleted { user_id, customer_id, subscription_id } => {
                // Sessions created outside signup carry no metadata; fall back to the customer
                let user_id = match (user_id, customer_id) {
                    (Some(id), _) => id,
                    (None, Some(customer)) => {
                        self.user_repo
                            .find_by_stripe_customer(&self.pool, &customer)
                            .await?
                            .ok_or(AppError::InvalidCustomer)?
                            .id
                    }
                    (None, None) => return Err(AppError::InvalidCustomer),
                };
                let auth = self.mark_paid(user_id, subscription_id.as_deref()).await?;
                Ok(WebhookAck { received: true, token: Some(auth.token) })
            }
            PaymentEvent::SubscriptionUpdated { subscription_id, status, period_start, period_end } => {
                let updated = self
                    .subscription_repo
                    .sync_from_processor(&self.pool, &subscription_id, status, period_start, period_end)
                    .await?;
                tracing::info!(subscription_id = %subscription_id, updated, "Subscription synced");
                Ok(WebhookAck::ignored())
            }
            PaymentEvent::SubscriptionDeleted { subscription_id } => {
                self.subscription_repo
                    .sync_from_processor(&self.pool, &subscription_id, SubscriptionStatus::Canceled, None, None)
                    .await?;
                tracing::info!(subscription_id = %subscription_id, "Subscription deleted by processor");
                Ok(WebhookAck::ignored())
            }
            PaymentEvent::Ignored(kind) => {
                tracing::debug!(event = %kind, "Ignoring webhook event");
                Ok(WebhookAck::ignored())
            }
        }
    }

    pub async fn cancel_subscription(&self, current: &CurrentUser) -> Result<DeletionResponse, AppError> {
        let user = self.user_repo.find_by_id(current.id).await?.ok_or(AppError::UserNotFound)?;
        let customer_id = user
            .stripe_customer_id
            .ok_or_else(|| AppError::DeletionIssue("user has no processor customer".to_string()))?;

        let subscription_ids = self
            .payments
            .list_subscription_ids(&customer_id)
            .await
            .map_err(|e| AppError::DeletionIssue(e.to_string()))?;
        for subscription_id in &subscription_ids {
            self.payments
                .cancel_at_period_end(subscription_id)
                .await
                .map_err(|e| AppError::DeletionIssue(e.to_string()))?;
        }

        self.subscription_repo
            .set_status(&self.pool, user.id, SubscriptionStatus::Canceled)
            .await?;

        tracing::info!(user_id = %user.id, canceled = subscription_ids.len(), "Subscription canceled");
        Ok(DeletionResponse { deletion_status: 200 })
    }
}
