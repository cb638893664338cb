// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::healthcheck,

        // --- Customers ---
        handlers::customers::signup,
        handlers::customers::login,
        handlers::customers::update_profile,
        handlers::customers::subscription_information,

        // --- Payment ---
        handlers::payment::create_checkout_session,
        handlers::payment::update_payment_status,
        handlers::payment::webhook,
        handlers::payment::cancel_subscription,

        // --- Properties ---
        handlers::properties::create_property,
        handlers::properties::bulk_upload,
        handlers::properties::list_properties,
        handlers::properties::needs_attention,
        handlers::properties::get_property,
        handlers::properties::get_appliances,
        handlers::properties::get_structures,
        handlers::properties::list_units,
        handlers::properties::unit_appliances,
        handlers::properties::update_appliances,
        handlers::properties::update_structures,
        handlers::properties::update_forecast,

        // --- Tenants ---
        handlers::tenants::create_tenant,
        handlers::tenants::list_tenants,
        handlers::tenants::update_tenant,

        // --- Media ---
        handlers::media::create_image_upload,
        handlers::media::latest_image,
        handlers::media::create_note_upload,
        handlers::media::list_notes,

        // --- Home Bot ---
        handlers::home_bot::ask_lifecycle_question,

        // --- Scraping ---
        handlers::scraping::update_prices,
        handlers::scraping::fetch_houses,
        handlers::scraping::get_job,
    ),
    components(
        schemas(
            handlers::health::HealthStatus,

            // --- CUSTOMERS ---
            models::auth::SignupPayload,
            models::auth::LoginPayload,
            models::auth::ProfileUpdatePayload,
            models::auth::SignupResponse,
            models::auth::CreatedUser,
            models::auth::AuthResponse,
            models::auth::UserSummary,
            models::auth::ProfileUpdateResponse,
            models::billing::BillingPlanType,
            models::billing::SubscriptionStatus,
            models::billing::SubscriptionInformation,

            // --- PAYMENT ---
            models::billing::CheckoutPayload,
            models::billing::CheckoutResponse,
            models::billing::PaymentStatusPayload,
            models::billing::DeletionResponse,
            models::billing::WebhookAck,

            // --- PROPERTIES ---
            models::property::ApplianceType,
            models::property::StructureType,
            models::property::Property,
            models::property::PropertyAddress,
            models::property::Unit,
            models::property::Appliance,
            models::property::Structure,
            models::property::UnitApplianceView,
            models::property::CreatePropertyPayload,
            models::property::PropertyCreationResponse,
            models::property::BulkInsertionResponse,
            models::property::RetrievalType,
            models::property::NeedsAttentionResponse,
            models::property::ManagementItem,
            models::property::ComponentSummary,
            models::property::AttentionStatus,
            models::maintenance::ApplianceUpdatesPayload,
            models::maintenance::ApplianceUpdate,
            models::maintenance::StructureUpdatesPayload,
            models::maintenance::StructureUpdate,
            models::maintenance::ForecastUpdatePayload,
            models::maintenance::PutRecordResponse,

            // --- TENANTS ---
            models::tenant::ContractStatus,
            models::tenant::CreateTenantPayload,
            models::tenant::UpdateTenantPayload,
            models::tenant::TenantView,
            models::tenant::TenantUpdateResponse,

            // --- MEDIA ---
            models::media::ImageUploadPayload,
            models::media::ImageUploadResponse,
            models::media::ImageDownloadResponse,
            models::media::NoteUploadPayload,
            models::media::NoteUploadResponse,
            models::media::NoteView,

            // --- HOME BOT ---
            models::home_bot::AskLifecyclePayload,
            models::home_bot::LifecycleAnswer,

            // --- SCRAPING ---
            models::scraping::FetchHousesPayload,
            models::scraping::JobAccepted,
            models::scraping::JobKind,
            models::scraping::JobStatus,
            models::scraping::ScrapeJob,
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Customers", description = "Signup, login and profile"),
        (name = "Payment", description = "Checkout, webhooks and cancellation"),
        (name = "Properties", description = "Properties, units, appliances and structures"),
        (name = "Tenants", description = "Tenant contracts"),
        (name = "Media", description = "Property images and notes in object storage"),
        (name = "Home Bot", description = "Appliance lifecycle questions"),
        (name = "Scraping", description = "Background price and housing scrapes")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented_with_bearer_auth() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/v1/properties/{id}/tenants"));
        assert!(doc.paths.paths.contains_key("/v1/payment/webhook"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
