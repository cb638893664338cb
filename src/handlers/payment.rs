// src/handlers/payment.rs

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use validator::Validate;

use crate::{
    common::{error::AppError, extract::ApiJson},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        auth::AuthResponse,
        billing::{CheckoutPayload, CheckoutResponse, DeletionResponse, PaymentStatusPayload, WebhookAck},
    },
};

const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[utoipa::path(
    post,
    path = "/v1/payment/create-checkout-session",
    tag = "Payment",
    request_body = CheckoutPayload,
    responses(
        (status = 200, description = "Hosted checkout url", body = CheckoutResponse),
        (status = 400, description = "Unknown customer or session for another user")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_checkout_session(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<CheckoutPayload>,
) -> Result<Json<CheckoutResponse>, AppError> {
    payload.validate()?;

    let (Some(user_id), Some(price), Some(mode), Some(payment_type)) =
        (payload.user_id, payload.price, payload.mode, payload.payment_type)
    else {
        return Err(AppError::InvalidRequest("The checkout payload is incomplete".to_string()));
    };

    let response = app_state
        .payment_service
        .create_checkout_session(&user, user_id, price, mode, payment_type)
        .await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/v1/payment/update-payment-status",
    tag = "Payment",
    request_body = PaymentStatusPayload,
    responses(
        (status = 200, description = "Payment confirmed, user signed in", body = AuthResponse),
        (status = 400, description = "Session is not paid")
    )
)]
pub async fn update_payment_status(
    State(app_state): State<AppState>,
    ApiJson(payload): ApiJson<PaymentStatusPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;
    let session_id = payload.session_id.unwrap_or_default();
    let response = app_state.payment_service.confirm_checkout(session_id.trim()).await?;
    Ok(Json(response))
}

/// Raw body: the signature covers the exact bytes received.
#[utoipa::path(
    post,
    path = "/v1/payment/webhook",
    tag = "Payment",
    request_body(content = String, description = "Processor event payload"),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Missing or invalid signature")
    )
)]
pub async fn webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidRequest("The Stripe-Signature header is missing".to_string()))?;

    let ack = app_state.payment_service.handle_webhook(&body, signature).await?;
    Ok(Json(ack))
}

#[utoipa::path(
    delete,
    path = "/v1/payment/cancel-subscription",
    tag = "Payment",
    responses(
        (status = 200, description = "Subscription canceled at period end", body = DeletionResponse),
        (status = 500, description = "The processor could not cancel")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_subscription(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<DeletionResponse>, AppError> {
    let response = app_state.payment_service.cancel_subscription(&user).await?;
    Ok(Json(response))
}
