// src/models.rs

pub mod auth;
pub mod billing;
pub mod home_bot;
pub mod maintenance;
pub mod media;
pub mod property;
pub mod scraping;
pub mod tenant;
