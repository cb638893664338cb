// src/integrations.rs

pub mod embedding;
pub mod lowes;
pub mod redfin;
pub mod scraper;
pub mod storage;
pub mod stripe;
