// tests/billing_flows.rs
//
// Signup and payment flows against a real database with the payment processor
// faked. `#[sqlx::test]` creates a fresh database per test and applies
// ./migrations, so these need DATABASE_URL pointing at a Postgres server:
//
//     DATABASE_URL=postgres://... cargo test --test billing_flows -- --ignored

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sha2::Sha256;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use home_pulse_backend::{
    common::error::AppError,
    config::{settings::Settings, AppState},
    integrations::stripe::{CheckoutRequest, CheckoutSession, PaymentGateway},
    routes::create_router,
    services::scraping::ScrapingWorker,
};

const WEBHOOK_SECRET: &str = "whsec_flow";
const CUSTOMER_ID: &str = "cus_flow";
const SESSION_ID: &str = "cs_flow";

/// Hands out fixed ids and remembers the user of the last checkout.
#[derive(Default)]
struct FakeGateway {
    checkout_user: Mutex<Option<String>>,
}

impl FakeGateway {
    fn session(&self, payment_status: &str) -> CheckoutSession {
        let metadata = self
            .checkout_user
            .lock()
            .unwrap()
            .iter()
            .map(|id| ("user_id".to_string(), id.clone()))
            .collect();
        CheckoutSession {
            id: SESSION_ID.to_string(),
            url: Some(format!("https://checkout.test/{SESSION_ID}")),
            customer: Some(CUSTOMER_ID.to_string()),
            subscription: Some("sub_flow".to_string()),
            payment_status: Some(payment_status.to_string()),
            metadata,
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_customer(&self, _email: &str) -> Result<String, AppError> {
        Ok(CUSTOMER_ID.to_string())
    }

    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, AppError> {
        *self.checkout_user.lock().unwrap() = Some(request.user_id.clone());
        Ok(self.session("unpaid"))
    }

    async fn retrieve_checkout_session(&self, _session_id: &str) -> Result<CheckoutSession, AppError> {
        Ok(self.session("paid"))
    }

    async fn list_subscription_ids(&self, _customer_id: &str) -> Result<Vec<String>, AppError> {
        Ok(vec!["sub_flow".to_string()])
    }

    async fn cancel_at_period_end(&self, _subscription_id: &str) -> Result<(), AppError> {
        Ok(())
    }
}

fn app(pool: PgPool) -> (Router, AppState, ScrapingWorker) {
    let mut settings = Settings::with_secrets("postgres://unused", "flow-secret");
    settings.stripe.webhook_secret = WEBHOOK_SECRET.to_string();
    let (state, worker) =
        AppState::with_payment_gateway(settings, pool, Arc::new(FakeGateway::default())).unwrap();
    (create_router(state.clone()), state, worker)
}

fn signature(payload: &[u8]) -> String {
    let timestamp = Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn sign_up(app: &Router, email: &str) -> Value {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/customers")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"email": email, "password": "HelloWorld123"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn subscription_status(pool: &PgPool, user_id: Uuid) -> String {
    sqlx::query_scalar("SELECT status::text FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL pointing at Postgres"]
async fn signup_stores_a_hashed_password_and_a_past_due_subscription(pool: PgPool) {
    let (app, _, _worker) = app(pool.clone());

    let body = sign_up(&app, "a@b.com").await;

    assert_eq!(body["checkoutUrl"], format!("https://checkout.test/{SESSION_ID}"));
    let user = &body["insertRecordResponse"];
    assert_eq!(user["email"], "a@b.com");
    assert_eq!(user["stripeCustomerId"], CUSTOMER_ID);
    assert_eq!(user["isPaid"], false);

    let user_id: Uuid = user["id"].as_str().unwrap().parse().unwrap();
    let hashed: String = sqlx::query_scalar("SELECT hashed_password FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_ne!(hashed, "HelloWorld123");
    assert!(bcrypt::verify("HelloWorld123", &hashed).unwrap());
    assert_eq!(subscription_status(&pool, user_id).await, "past_due");
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL pointing at Postgres"]
async fn duplicate_email_is_rejected(pool: PgPool) {
    let (app, _, _worker) = app(pool);
    sign_up(&app, "a@b.com").await;

    let request = Request::builder()
        .method("POST")
        .uri("/v1/customers")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"email": "a@b.com", "password": "HelloWorld123"}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL pointing at Postgres"]
async fn completed_checkout_webhook_marks_the_user_paid(pool: PgPool) {
    let (app, state, _worker) = app(pool.clone());
    let signup = sign_up(&app, "a@b.com").await;
    let user_id = signup["insertRecordResponse"]["id"].as_str().unwrap().to_string();

    let event = json!({
        "type": "checkout.session.completed",
        "data": {"object": {
            "id": SESSION_ID,
            "customer": CUSTOMER_ID,
            "subscription": "sub_flow",
            "metadata": {"user_id": user_id}
        }}
    })
    .to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/payment/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("Stripe-Signature", signature(event.as_bytes()))
        .body(Body::from(event))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let ack = body_json(response).await;
    assert_eq!(ack["received"], true);

    let claims = state.auth_service.validate_token(ack["token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.user_id.to_string(), user_id);
    assert_eq!(claims.email, "a@b.com");

    let user_id: Uuid = user_id.parse().unwrap();
    let is_paid: bool = sqlx::query_scalar("SELECT is_paid FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(is_paid);
    assert_eq!(subscription_status(&pool, user_id).await, "active");
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL pointing at Postgres"]
async fn tampered_webhook_changes_nothing(pool: PgPool) {
    let (app, _, _worker) = app(pool.clone());
    let signup = sign_up(&app, "a@b.com").await;
    let user_id: Uuid = signup["insertRecordResponse"]["id"].as_str().unwrap().parse().unwrap();

    let signed = json!({"type": "customer.subscription.deleted", "data": {"object": {"id": "sub_flow"}}}).to_string();
    let sent = json!({
        "type": "checkout.session.completed",
        "data": {"object": {"metadata": {"user_id": user_id.to_string()}}}
    })
    .to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/payment/webhook")
        .header("Stripe-Signature", signature(signed.as_bytes()))
        .body(Body::from(sent))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(subscription_status(&pool, user_id).await, "past_due");
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL pointing at Postgres"]
async fn confirming_a_paid_session_signs_the_user_in(pool: PgPool) {
    let (app, _, _worker) = app(pool.clone());
    let signup = sign_up(&app, "a@b.com").await;

    let request = Request::builder()
        .method("POST")
        .uri("/v1/payment/update-payment-status")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"sessionId": SESSION_ID}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let auth = body_json(response).await;
    assert_eq!(auth["user"]["id"], signup["insertRecordResponse"]["id"]);
    assert!(auth["token"].is_string());
}
