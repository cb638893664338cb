// src/handlers.rs

pub mod customers;
pub mod health;
pub mod home_bot;
pub mod media;
pub mod payment;
pub mod properties;
pub mod scraping;
pub mod tenants;
