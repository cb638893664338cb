// src/services/customer_service.rs

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::settings::StripeSettings,
    db::{InvitationRepository, SubscriptionRepository, UserRepository},
    integrations::stripe::{CheckoutRequest, PaymentGateway},
    models::{
        auth::{CreatedUser, CurrentUser, ProfileUpdatePayload, ProfileUpdateResponse, SignupResponse},
        billing::{BillingPlanType, SubscriptionInformation, SubscriptionStatus},
    },
    services::auth::AuthService,
};

/// A signup that already passed request validation.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub email: String,
    pub password: String,
    pub billing_plan_type: BillingPlanType,
    pub invitation_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct CustomerService {
    pool: PgPool,
    user_repo: UserRepository,
    subscription_repo: SubscriptionRepository,
    invitation_repo: InvitationRepository,
    auth_service: AuthService,
    payments: Arc<dyn PaymentGateway>,
    stripe: StripeSettings,
}

pub fn price_id_for(stripe: &StripeSettings, plan: BillingPlanType) -> &str {
    match plan {
        BillingPlanType::Monthly => &stripe.monthly_price_id,
        BillingPlanType::Yearly => &stripe.yearly_price_id,
    }
}

impl CustomerService {
    pub fn new(
        pool: PgPool,
        user_repo: UserRepository,
        subscription_repo: SubscriptionRepository,
        invitation_repo: InvitationRepository,
        auth_service: AuthService,
        payments: Arc<dyn PaymentGateway>,
        stripe: StripeSettings,
    ) -> Self {
        Self { pool, user_repo, subscription_repo, invitation_repo, auth_service, payments, stripe }
    }

    pub async fn signup(&self, customer: NewCustomer) -> Result<SignupResponse, AppError> {
        let email = customer.email.trim().to_string();

        // Fail before any processor call for a known address
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let hashed_password = self.auth_service.hash_password(&customer.password).await?;

        match customer.invitation_id {
            Some(invitation_id) => self.signup_invited(&email, &hashed_password, invitation_id).await,
            None => self.signup_paying(&email, &hashed_password, customer.billing_plan_type).await,
        }
    }

    async fn signup_invited(
        &self,
        email: &str,
        hashed_password: &str,
        invitation_id: Uuid,
    ) -> Result<SignupResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. The invitation must be pending, addressed to this email and unexpired
        let invitation = self
            .invitation_repo
            .find_for_redemption(&mut *tx, invitation_id)
            .await?
            .ok_or(AppError::InvalidInvitation)?;
        if !invitation.is_redeemable_by(email, Utc::now()) {
            return Err(AppError::InvalidInvitation);
        }

        // 2. Licensed seat: paid from the start, no checkout
        let user = self
            .user_repo
            .create_user(&mut *tx, email, hashed_password, None, true, Some(invitation.company_id))
            .await?;
        self.subscription_repo
            .create(&mut *tx, user.id, SubscriptionStatus::Active)
            .await?;
        self.invitation_repo.mark_accepted(&mut *tx, invitation.id).await?;

        tx.commit().await?;

        tracing::info!(user_id = %user.id, company_id = %invitation.company_id, "Invited user signed up");
        Ok(SignupResponse {
            insert_record_status: 201,
            insert_record_response: CreatedUser::from(&user),
            checkout_url: None,
        })
    }

    async fn signup_paying(
        &self,
        email: &str,
        hashed_password: &str,
        plan: BillingPlanType,
    ) -> Result<SignupResponse, AppError> {
        // 1. Processor customer first, so the row can reference it
        let customer_id = self.payments.create_customer(email).await?;

        // 2. User + past_due subscription together
        let mut tx = self.pool.begin().await?;
        let user = self
            .user_repo
            .create_user(&mut *tx, email, hashed_password, Some(&customer_id), false, None)
            .await?;
        self.subscription_repo
            .create(&mut *tx, user.id, SubscriptionStatus::PastDue)
            .await?;
        tx.commit().await?;

        // 3. Hosted checkout, correlated back through metadata.user_id
        let session = self
            .payments
            .create_checkout_session(&CheckoutRequest {
                customer_id,
                price: price_id_for(&self.stripe, plan).to_string(),
                mode: "subscription".to_string(),
                payment_method_types: self.stripe.payment_method_types.clone(),
                user_id: user.id.to_string(),
            })
            .await?;
        let checkout_url = session
            .url
            .ok_or_else(|| AppError::Payment("checkout session has no url".to_string()))?;

        tracing::info!(user_id = %user.id, "User signed up, awaiting checkout");
        Ok(SignupResponse {
            insert_record_status: 201,
            insert_record_response: CreatedUser::from(&user),
            checkout_url: Some(checkout_url),
        })
    }

    pub async fn update_profile(
        &self,
        current: &CurrentUser,
        payload: ProfileUpdatePayload,
    ) -> Result<ProfileUpdateResponse, AppError> {
        if let Some(plan) = payload.billing_plan_type {
            // Plan switches happen through a new checkout session
            tracing::info!(user_id = %current.id, plan = ?plan, "Billing plan preference received");
        }

        let user = self
            .user_repo
            .update_names(
                &self.pool,
                current.id,
                payload.first_name.as_deref().map(str::trim),
                payload.last_name.as_deref().map(str::trim),
            )
            .await?
            .ok_or(AppError::UserNotFound)?;

        Ok(ProfileUpdateResponse {
            token: self.auth_service.issue_token(&user)?,
            first_name: user.first_name,
            last_name: user.last_name,
            user_id: user.id,
            put_record_status: 200,
        })
    }

    pub async fn subscription_information(
        &self,
        current: &CurrentUser,
        user_id: Uuid,
    ) -> Result<SubscriptionInformation, AppError> {
        if current.id != user_id {
            return Err(AppError::InvalidCustomer);
        }
        let subscription = self
            .subscription_repo
            .find_by_user(user_id)
            .await?
            .ok_or(AppError::InvalidCustomer)?;
        Ok(subscription.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_map_to_configured_prices() {
        let stripe = StripeSettings {
            monthly_price_id: "price_m".to_string(),
            yearly_price_id: "price_y".to_string(),
            ..StripeSettings::default()
        };
        assert_eq!(price_id_for(&stripe, BillingPlanType::Monthly), "price_m");
        assert_eq!(price_id_for(&stripe, BillingPlanType::Yearly), "price_y");
    }
}
