// src/models/billing.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingPlanType {
    Yearly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    PastDue,
    Active,
    Canceled,
}

impl SubscriptionStatus {
    /// Maps a processor subscription status onto the local lifecycle.
    pub fn from_processor(status: &str) -> Self {
        match status {
            "active" | "trialing" => SubscriptionStatus::Active,
            "canceled" | "incomplete_expired" => SubscriptionStatus::Canceled,
            _ => SubscriptionStatus::PastDue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: SubscriptionStatus,
    pub stripe_subscription_id: Option<String>,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    /// Pending, addressed to `email`, and not yet expired.
    pub fn is_redeemable_by(&self, email: &str, now: DateTime<Utc>) -> bool {
        self.status == InvitationStatus::Pending
            && self.email.eq_ignore_ascii_case(email.trim())
            && self.expires_at > now
    }
}

// GET /v1/customers/{id}/retrieve-subscription-information
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionInformation {
    pub status: SubscriptionStatus,
    pub subscription_id: Option<String>,
    pub subscription_end: Option<DateTime<Utc>>,
}

impl From<Subscription> for SubscriptionInformation {
    fn from(subscription: Subscription) -> Self {
        Self {
            status: subscription.status,
            subscription_id: subscription.stripe_subscription_id,
            subscription_end: subscription.period_end,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    #[validate(required(message = "The userId field is required."))]
    pub user_id: Option<Uuid>,
    #[validate(
        required(message = "The price field is required."),
        length(min = 1, message = "The price field cannot be empty.")
    )]
    pub price: Option<String>,
    #[validate(
        required(message = "The mode field is required."),
        length(min = 1, message = "The mode field cannot be empty.")
    )]
    pub mode: Option<String>,
    #[validate(
        required(message = "The paymentType field is required."),
        length(min = 1, message = "The paymentType field cannot be empty.")
    )]
    pub payment_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub url: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusPayload {
    #[validate(
        required(message = "The sessionId field is required."),
        length(min = 1, message = "The sessionId field cannot be empty.")
    )]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletionResponse {
    pub deletion_status: u16,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    /// Present after `checkout.session.completed`, for the paying user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl WebhookAck {
    pub fn ignored() -> Self {
        Self { received: true, token: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invitation(status: InvitationStatus, expires_in: Duration) -> Invitation {
        let now = Utc::now();
        Invitation {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            email: "Invitee@Example.com".to_string(),
            status,
            expires_at: now + expires_in,
            created_at: now,
        }
    }

    #[test]
    fn invitation_redemption_rules() {
        let now = Utc::now();
        let pending = invitation(InvitationStatus::Pending, Duration::days(1));
        assert!(pending.is_redeemable_by("invitee@example.com", now));
        assert!(!pending.is_redeemable_by("someone@example.com", now));

        let expired = invitation(InvitationStatus::Pending, Duration::days(-1));
        assert!(!expired.is_redeemable_by("invitee@example.com", now));

        let used = invitation(InvitationStatus::Accepted, Duration::days(1));
        assert!(!used.is_redeemable_by("invitee@example.com", now));
    }

    #[test]
    fn processor_statuses_collapse_to_local_lifecycle() {
        assert_eq!(SubscriptionStatus::from_processor("active"), SubscriptionStatus::Active);
        assert_eq!(SubscriptionStatus::from_processor("canceled"), SubscriptionStatus::Canceled);
        assert_eq!(SubscriptionStatus::from_processor("unpaid"), SubscriptionStatus::PastDue);
    }
}
