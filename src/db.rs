// src/db.rs

pub mod user_repo;
pub use user_repo::UserRepository;
pub mod subscription_repo;
pub use subscription_repo::SubscriptionRepository;
pub mod invitation_repo;
pub use invitation_repo::InvitationRepository;
pub mod property_repo;
pub use property_repo::PropertyRepository;
pub mod unit_repo;
pub use unit_repo::UnitRepository;
pub mod appliance_repo;
pub use appliance_repo::ApplianceRepository;
pub mod structure_repo;
pub use structure_repo::StructureRepository;
pub mod price_repo;
pub use price_repo::PriceRepository;
pub mod tenant_repo;
pub use tenant_repo::TenantRepository;
pub mod media_repo;
pub use media_repo::MediaRepository;
