// src/integrations/lowes.rs

use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    config::settings::ScraperSettings,
    integrations::scraper::ScraperHttp,
    models::property::ApplianceType,
};

/// Where current appliance prices come from.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn prices_for(&self, appliance_type: ApplianceType) -> Result<Vec<Decimal>, AppError>;
}

pub struct LowesClient {
    http: ScraperHttp,
    base_url: String,
}

impl LowesClient {
    pub fn new(settings: &ScraperSettings) -> Result<Self, AppError> {
        let base_url = if settings.base_url.is_empty() {
            "https://www.lowes.com".to_string()
        } else {
            settings.base_url.trim_end_matches('/').to_string()
        };
        Ok(Self { http: ScraperHttp::new(settings)?, base_url })
    }
}

pub fn search_term(appliance_type: ApplianceType) -> &'static str {
    match appliance_type {
        ApplianceType::Stove => "stove",
        ApplianceType::Dishwasher => "dishwasher",
        ApplianceType::Dryer => "dryer",
        ApplianceType::Refrigerator => "refrigerator",
        ApplianceType::Washer => "washer",
        ApplianceType::AcUnit => "air+conditioner",
        ApplianceType::WaterHeater => "water+heater",
    }
}

/// Every positive number following a `"price":` key in a page or JSON blob.
pub fn extract_prices(body: &str) -> Vec<Decimal> {
    const KEY: &str = "\"price\":";
    let mut prices = Vec::new();
    let mut rest = body;
    while let Some(pos) = rest.find(KEY) {
        rest = &rest[pos + KEY.len()..];
        let value = rest.trim_start().trim_start_matches('"');
        let end = value
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(value.len());
        if let Ok(price) = Decimal::from_str(&value[..end]) {
            if price > Decimal::ZERO {
                prices.push(price);
            }
        }
    }
    prices
}

pub fn average_price(prices: &[Decimal]) -> Option<Decimal> {
    if prices.is_empty() {
        return None;
    }
    let total: Decimal = prices.iter().sum();
    Some((total / Decimal::from(prices.len())).round_dp(2))
}

#[async_trait]
impl PriceSource for LowesClient {
    async fn prices_for(&self, appliance_type: ApplianceType) -> Result<Vec<Decimal>, AppError> {
        let url = format!("{}/search?searchTerm={}", self.base_url, search_term(appliance_type));
        let body = self.http.get_text(&url).await?;
        let prices = extract_prices(&body);
        tracing::info!(appliance = appliance_type.as_str(), found = prices.len(), "Scraped retail prices");
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_positive_prices_only() {
        let body = r#"{"items":[{"price":499.99},{"price": "649.00"},{"price":0},{"price":null}]}"#;
        let prices = extract_prices(body);
        assert_eq!(prices, vec![Decimal::new(49999, 2), Decimal::new(64900, 2)]);
    }

    #[test]
    fn average_is_rounded_to_cents() {
        let prices = vec![Decimal::new(100, 0), Decimal::new(200, 0), Decimal::new(200, 0)];
        assert_eq!(average_price(&prices), Some(Decimal::new(16667, 2)));
        assert_eq!(average_price(&[]), None);
    }
}
