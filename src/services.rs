// src/services.rs

pub mod auth;
pub mod bulk_ingestion;
pub mod customer_service;
pub mod home_bot;
pub mod maintenance_service;
pub mod media_service;
pub mod payment_service;
pub mod property_service;
pub mod scraping;
pub mod tenant_service;
