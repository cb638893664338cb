// src/integrations/redfin.rs

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    common::error::AppError,
    config::settings::ScraperSettings,
    integrations::scraper::ScraperHttp,
};

#[async_trait]
pub trait HousingSource: Send + Sync {
    /// The best matching region for a postal code, if the site knows it.
    async fn region_for(&self, postal_code: &str) -> Result<Option<Value>, AppError>;
}

pub struct RedfinClient {
    http: ScraperHttp,
    base_url: String,
}

impl RedfinClient {
    pub fn new(settings: &ScraperSettings) -> Result<Self, AppError> {
        let base_url = if settings.base_url.is_empty() {
            "https://www.redfin.com".to_string()
        } else {
            settings.base_url.trim_end_matches('/').to_string()
        };
        Ok(Self { http: ScraperHttp::new(settings)?, base_url })
    }
}

/// Autocomplete answers are JSON behind a `{}&&` guard prefix.
pub fn parse_autocomplete(body: &str) -> Result<Option<Value>, AppError> {
    let json = body.trim_start().trim_start_matches("{}&&");
    let parsed: Value = serde_json::from_str(json).map_err(|e| AppError::Scraping(e.to_string()))?;

    let first_row = parsed
        .pointer("/payload/exactMatch")
        .filter(|v| !v.is_null())
        .or_else(|| parsed.pointer("/payload/sections/0/rows/0"))
        .cloned();
    Ok(first_row)
}

#[async_trait]
impl HousingSource for RedfinClient {
    async fn region_for(&self, postal_code: &str) -> Result<Option<Value>, AppError> {
        let url = format!(
            "{}/stingray/do/location-autocomplete?location={}&v=2",
            self.base_url, postal_code
        );
        let body = self.http.get_text(&url).await?;
        parse_autocomplete(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_guard_and_prefers_exact_match() {
        let body = r#"{}&&{"payload":{"exactMatch":{"id":"2_62701","name":"62701"},"sections":[]}}"#;
        assert_eq!(parse_autocomplete(body).unwrap(), Some(json!({"id":"2_62701","name":"62701"})));
    }

    #[test]
    fn falls_back_to_first_section_row() {
        let body = r#"{}&&{"payload":{"sections":[{"rows":[{"id":"a"},{"id":"b"}]}]}}"#;
        assert_eq!(parse_autocomplete(body).unwrap(), Some(json!({"id":"a"})));
        assert_eq!(parse_autocomplete(r#"{}&&{"payload":{}}"#).unwrap(), None);
    }

    #[test]
    fn garbage_is_a_scraping_error() {
        assert!(parse_autocomplete("<html>").is_err());
    }
}
