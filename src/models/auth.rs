// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::{validate_email_shape, validate_password_strength};
use crate::models::billing::BillingPlanType;

// A user row from the database
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,

    #[serde(skip_serializing)]
    pub hashed_password: String,

    pub stripe_customer_id: Option<String>,
    pub is_paid: bool,
    pub company_id: Option<Uuid>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Signup payload
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupPayload {
    #[validate(
        required(message = "The email field is required."),
        custom(function = "validate_email_shape")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "The password field is required."),
        custom(function = "validate_password_strength")
    )]
    pub password: Option<String>,

    pub billing_plan_type: Option<BillingPlanType>,

    /// Company invitation for licensed seats; skips checkout.
    pub invitation_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[validate(
        required(message = "The email field is required."),
        custom(function = "validate_email_shape")
    )]
    pub email: Option<String>,

    #[validate(required(message = "The password field is required."))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdatePayload {
    #[validate(length(max = 100, message = "firstName must be at most 100 characters."))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "lastName must be at most 100 characters."))]
    pub last_name: Option<String>,
    pub billing_plan_type: Option<BillingPlanType>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    pub id: Uuid,
    pub email: String,
    pub stripe_customer_id: Option<String>,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for CreatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            stripe_customer_id: user.stripe_customer_id.clone(),
            is_paid: user.is_paid,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub insert_record_status: u16,
    pub insert_record_response: CreatedUser,
    pub checkout_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
}

// Login (and payment confirmation) response
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateResponse {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_id: Uuid,
    pub put_record_status: u16,
    pub token: String,
}

// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

/// The caller identity the auth guard places in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self { id: claims.user_id, email: claims.email }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_signup_round_trips_fields() {
        let payload: SignupPayload =
            serde_json::from_value(json!({"email": "a@b.com", "password": "HelloWorld123"}))
                .unwrap();
        assert!(payload.validate().is_ok());
        assert_eq!(payload.email.as_deref(), Some("a@b.com"));
        assert_eq!(payload.password.as_deref(), Some("HelloWorld123"));
        assert!(payload.billing_plan_type.is_none());
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let payload: SignupPayload = serde_json::from_value(json!({})).unwrap();
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn weak_password_and_bad_email_fail_together() {
        let payload: SignupPayload =
            serde_json::from_value(json!({"email": "ab.com", "password": "short"})).unwrap();
        let errors = payload.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 2);
    }

    #[test]
    fn billing_plan_must_be_known() {
        let result: Result<ProfileUpdatePayload, _> =
            serde_json::from_value(json!({"billingPlanType": "WEEKLY"}));
        assert!(result.is_err());

        let payload: ProfileUpdatePayload =
            serde_json::from_value(json!({"billingPlanType": "YEARLY", "firstName": "Ada"}))
                .unwrap();
        assert_eq!(payload.billing_plan_type, Some(BillingPlanType::Yearly));
    }
}
