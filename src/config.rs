// src/config.rs

pub mod settings;

use std::{path::Path, sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        ApplianceRepository, InvitationRepository, MediaRepository, PriceRepository, PropertyRepository,
        StructureRepository, SubscriptionRepository, TenantRepository, UnitRepository, UserRepository,
    },
    integrations::{
        embedding::{HashingEmbedder, LifespanIndex, TextEmbedder},
        lowes::LowesClient,
        redfin::RedfinClient,
        storage::S3Storage,
        stripe::{PaymentGateway, StripeClient},
    },
    services::{
        auth::AuthService,
        bulk_ingestion::BulkIngestionService,
        customer_service::CustomerService,
        home_bot::HomeBotService,
        maintenance_service::MaintenanceService,
        media_service::MediaService,
        payment_service::PaymentService,
        property_service::PropertyService,
        scraping::{JobRunner, ScrapingService, ScrapingWorker},
        tenant_service::TenantService,
    },
};
use settings::Settings;

pub const SCRAPE_QUEUE_CAPACITY: usize = 16;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub auth_service: AuthService,
    pub customer_service: CustomerService,
    pub payment_service: PaymentService,
    pub property_service: PropertyService,
    pub bulk_ingestion_service: BulkIngestionService,
    pub maintenance_service: MaintenanceService,
    pub tenant_service: TenantService,
    pub media_service: MediaService,
    pub home_bot_service: HomeBotService,
    pub scraping_service: ScrapingService,
}

impl AppState {
    /// Connects to the database and wires every service. The worker still has to be spawned.
    pub async fn new(settings: Settings) -> anyhow::Result<(Self, ScrapingWorker)> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.database.max_connections)
            .acquire_timeout(settings.database.acquire_timeout())
            .connect(&settings.database.url)
            .await?;

        tracing::info!("Database connection established");

        Self::with_pool(settings, db_pool)
    }

    /// Builds the dependency graph on an existing pool.
    pub fn with_pool(settings: Settings, db_pool: PgPool) -> anyhow::Result<(Self, ScrapingWorker)> {
        let payments = Arc::new(StripeClient::new(&settings.stripe)?);
        Self::with_payment_gateway(settings, db_pool, payments)
    }

    /// Same as [`AppState::with_pool`] with the payment processor supplied by the caller.
    pub fn with_payment_gateway(
        settings: Settings,
        db_pool: PgPool,
        payments: Arc<dyn PaymentGateway>,
    ) -> anyhow::Result<(Self, ScrapingWorker)> {
        // Repositories
        let user_repo = UserRepository::new(db_pool.clone());
        let subscription_repo = SubscriptionRepository::new(db_pool.clone());
        let invitation_repo = InvitationRepository::new();
        let property_repo = PropertyRepository::new(db_pool.clone());
        let unit_repo = UnitRepository::new(db_pool.clone());
        let appliance_repo = ApplianceRepository::new(db_pool.clone());
        let structure_repo = StructureRepository::new(db_pool.clone());
        let price_repo = PriceRepository::new();
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let media_repo = MediaRepository::new(db_pool.clone());

        // Outside world
        let storage = Arc::new(S3Storage::new(&settings.storage)?);
        let prices = Arc::new(LowesClient::new(&settings.lowes)?);
        let housing = Arc::new(RedfinClient::new(&settings.redfin)?);
        let embedder: Arc<dyn TextEmbedder> = Arc::new(HashingEmbedder::new(settings.home_bot.embedding_dims));
        let index = Arc::new(load_lifespan_index(&settings.home_bot.index_path, embedder.as_ref()));

        // Services
        let auth_service = AuthService::new(user_repo.clone(), settings.jwt_secret.clone());
        let customer_service = CustomerService::new(
            db_pool.clone(),
            user_repo.clone(),
            subscription_repo.clone(),
            invitation_repo,
            auth_service.clone(),
            payments.clone(),
            settings.stripe.clone(),
        );
        let payment_service = PaymentService::new(
            db_pool.clone(),
            user_repo,
            subscription_repo,
            auth_service.clone(),
            payments,
            settings.stripe.clone(),
        );
        let property_service = PropertyService::new(
            db_pool.clone(),
            property_repo.clone(),
            unit_repo,
            appliance_repo.clone(),
            structure_repo.clone(),
            price_repo.clone(),
        );
        let bulk_ingestion_service = BulkIngestionService::new(property_service.clone());
        let maintenance_service = MaintenanceService::new(
            db_pool.clone(),
            property_repo.clone(),
            appliance_repo.clone(),
            structure_repo,
        );
        let tenant_service = TenantService::new(db_pool.clone(), property_repo.clone(), tenant_repo);
        let media_service = MediaService::new(
            property_repo,
            media_repo,
            storage,
            Duration::from_secs(settings.storage.presign_ttl_secs),
        );
        let home_bot_service = HomeBotService::new(embedder, index, settings.home_bot.nearest_neighbors);

        let (scraping_service, receiver) = ScrapingService::new(SCRAPE_QUEUE_CAPACITY);
        let runner = JobRunner::new(db_pool.clone(), price_repo, appliance_repo, prices, housing);
        let worker = ScrapingWorker::new(receiver, &scraping_service, runner);

        let state = Self {
            db_pool,
            settings: Arc::new(settings),
            auth_service,
            customer_service,
            payment_service,
            property_service,
            bulk_ingestion_service,
            maintenance_service,
            tenant_service,
            media_service,
            home_bot_service,
            scraping_service,
        };
        Ok((state, worker))
    }
}

// A missing index only disables the home bot
fn load_lifespan_index(path: &str, embedder: &dyn TextEmbedder) -> LifespanIndex {
    if !Path::new(path).exists() {
        tracing::warn!(path, "Lifespan index not found, home bot answers are disabled");
        return LifespanIndex::build(Vec::new(), embedder);
    }
    match LifespanIndex::load(path, embedder) {
        Ok(index) => {
            tracing::info!(path, records = index.len(), "Lifespan index loaded");
            index
        }
        Err(e) => {
            tracing::error!(path, error = %e, "Lifespan index could not be loaded");
            LifespanIndex::build(Vec::new(), embedder)
        }
    }
}
