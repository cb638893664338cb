// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::{auth::auth_guard, correlation::correlation_id},
};

pub fn create_router(app_state: AppState) -> Router {
    // Public
    let customer_routes = Router::new()
        .route("/", post(handlers::customers::signup))
        .route("/login", post(handlers::customers::login));

    let payment_routes = Router::new()
        .route("/update-payment-status", post(handlers::payment::update_payment_status))
        .route("/webhook", post(handlers::payment::webhook));

    // Behind the bearer token
    let account_routes = Router::new()
        .route("/v1/customers/profile", put(handlers::customers::update_profile))
        .route(
            "/v1/customers/{user_id}/retrieve-subscription-information",
            get(handlers::customers::subscription_information),
        )
        .route(
            "/v1/payment/create-checkout-session",
            post(handlers::payment::create_checkout_session),
        )
        .route(
            "/v1/payment/cancel-subscription",
            delete(handlers::payment::cancel_subscription),
        );

    let property_routes = Router::new()
        .route(
            "/"
            ,post(handlers::properties::create_property)
            .get(handlers::properties::list_properties)
        )
        .route("/bulk", post(handlers::properties::bulk_upload))
        .route("/needs-attention", get(handlers::properties::needs_attention))
        .route("/{id}", get(handlers::properties::get_property))
        .route(
            "/{id}/appliances"
            ,get(handlers::properties::get_appliances)
            .put(handlers::properties::update_appliances)
        )
        .route(
            "/{id}/structures"
            ,get(handlers::properties::get_structures)
            .put(handlers::properties::update_structures)
        )
        .route(
            "/{id}/forecasted-replacement-date",
            put(handlers::properties::update_forecast),
        )
        .route("/{id}/units", get(handlers::properties::list_units))
        .route(
            "/{id}/tenants"
            ,post(handlers::tenants::create_tenant)
            .get(handlers::tenants::list_tenants)
        )
        .route(
            "/{id}/images"
            ,post(handlers::media::create_image_upload)
            .get(handlers::media::latest_image)
        )
        .route(
            "/{id}/notes"
            ,post(handlers::media::create_note_upload)
            .get(handlers::media::list_notes)
        );

    let protected_routes = Router::new()
        .merge(account_routes)
        .nest("/v1/properties", property_routes)
        .route("/v1/units/{unit_id}/appliances", get(handlers::properties::unit_appliances))
        .route("/v1/tenants/{tenant_id}", put(handlers::tenants::update_tenant))
        .route(
            "/v1/home-bot/ask-lifecycle-question",
            post(handlers::home_bot::ask_lifecycle_question),
        )
        .route("/v1/appliances/update-prices", put(handlers::scraping::update_prices))
        .route("/v1/fetch_houses", post(handlers::scraping::fetch_houses))
        .route("/v1/jobs/{job_id}", get(handlers::scraping::get_job))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/healthcheck", get(handlers::health::healthcheck))
        .nest("/v1/customers", customer_routes)
        .nest("/v1/payment", payment_routes)
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(axum_middleware::from_fn(correlation_id))
}
