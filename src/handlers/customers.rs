// src/handlers/customers.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, extract::ApiJson},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        auth::{
            AuthResponse, LoginPayload, ProfileUpdatePayload, ProfileUpdateResponse, SignupPayload,
            SignupResponse,
        },
        billing::{BillingPlanType, SubscriptionInformation},
    },
    services::customer_service::NewCustomer,
};

#[utoipa::path(
    post,
    path = "/v1/customers",
    tag = "Customers",
    request_body = SignupPayload,
    responses(
        (status = 201, description = "User created", body = SignupResponse),
        (status = 400, description = "Invalid payload, duplicate email or invitation")
    )
)]
pub async fn signup(
    State(app_state): State<AppState>,
    ApiJson(payload): ApiJson<SignupPayload>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    payload.validate()?;

    let customer = NewCustomer {
        email: payload.email.unwrap_or_default(),
        password: payload.password.unwrap_or_default(),
        billing_plan_type: payload.billing_plan_type.unwrap_or(BillingPlanType::Monthly),
        invitation_id: payload.invitation_id,
    };
    let response = app_state.customer_service.signup(customer).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/v1/customers/login",
    tag = "Customers",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Unknown email or wrong password")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    ApiJson(payload): ApiJson<LoginPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    let response = app_state.auth_service.login(&email, &password).await?;

    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/v1/customers/profile",
    tag = "Customers",
    request_body = ProfileUpdatePayload,
    responses((status = 200, description = "Profile updated", body = ProfileUpdateResponse)),
    security(("api_jwt" = []))
)]
pub async fn update_profile(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<ProfileUpdatePayload>,
) -> Result<Json<ProfileUpdateResponse>, AppError> {
    payload.validate()?;
    let response = app_state.customer_service.update_profile(&user, payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/v1/customers/{user_id}/retrieve-subscription-information",
    tag = "Customers",
    params(("user_id" = Uuid, Path, description = "The caller's user id")),
    responses(
        (status = 200, description = "Current subscription", body = SubscriptionInformation),
        (status = 400, description = "No subscription for this customer")
    ),
    security(("api_jwt" = []))
)]
pub async fn subscription_information(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<SubscriptionInformation>, AppError> {
    let info = app_state.customer_service.subscription_information(&user, user_id).await?;
    Ok(Json(info))
}
