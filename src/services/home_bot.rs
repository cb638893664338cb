// src/services/home_bot.rs

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use crate::{
    common::error::AppError,
    integrations::embedding::{LifespanIndex, TextEmbedder},
    models::home_bot::{LifecycleAnswer, LifespanRecord},
};

/// `today` once the appliance has outlived the average, otherwise the
/// remaining years counted as 52-week years.
pub fn forecast_replacement(avg_lifespan_years: i64, appliance_age: i64, today: NaiveDate) -> NaiveDate {
    let remaining = avg_lifespan_years - appliance_age;
    if remaining <= 0 {
        return today;
    }
    today
        .checked_add_signed(Duration::weeks(remaining * 52))
        .unwrap_or(NaiveDate::MAX)
}

pub fn compose_answer(record: &LifespanRecord, appliance_age: i64, forecast: NaiveDate) -> String {
    let remaining = record.avg_lifespan_years - appliance_age;
    let outlook = if remaining <= 0 {
        "it has already reached the end of its expected life, so plan to replace it now".to_string()
    } else {
        format!("you can expect roughly {remaining} more year(s) of service")
    };
    format!(
        "The closest match is the {} {}, which lasts about {} years on average. \
         At {} year(s) old, {}. Forecasted replacement date: {}.",
        record.brand,
        record.model,
        record.avg_lifespan_years,
        appliance_age,
        outlook,
        forecast.format("%Y-%m-%d"),
    )
}

#[derive(Clone)]
pub struct HomeBotService {
    embedder: Arc<dyn TextEmbedder>,
    index: Arc<LifespanIndex>,
    nearest_neighbors: usize,
}

impl HomeBotService {
    pub fn new(embedder: Arc<dyn TextEmbedder>, index: Arc<LifespanIndex>, nearest_neighbors: usize) -> Self {
        Self { embedder, index, nearest_neighbors: nearest_neighbors.max(1) }
    }

    pub fn ask(&self, question: &str, appliance_age: i64) -> Result<LifecycleAnswer, AppError> {
        self.ask_on(question, appliance_age, Utc::now().date_naive())
    }

    pub fn ask_on(&self, question: &str, appliance_age: i64, today: NaiveDate) -> Result<LifecycleAnswer, AppError> {
        if self.index.is_empty() {
            return Err(AppError::HomeBot("the lifespan index is empty".to_string()));
        }

        let query = self.embedder.embed(question);
        let hits = self.index.nearest(&query, self.nearest_neighbors);
        let (record, score) = hits
            .first()
            .copied()
            .ok_or_else(|| AppError::HomeBot("no lifespan record matched".to_string()))?;

        tracing::debug!(
            brand = %record.brand,
            model = %record.model,
            score,
            candidates = hits.len(),
            "Lifespan record matched"
        );

        let forecasted_replacement_date = forecast_replacement(record.avg_lifespan_years, appliance_age, today);
        Ok(LifecycleAnswer {
            answer: compose_answer(record, appliance_age, forecasted_replacement_date),
            forecasted_replacement_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::embedding::HashingEmbedder;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn record(brand: &str, model: &str, years: i64, description: &str) -> LifespanRecord {
        LifespanRecord {
            brand: brand.to_string(),
            model: model.to_string(),
            avg_lifespan_years: years,
            description: description.to_string(),
        }
    }

    fn service(records: Vec<LifespanRecord>) -> HomeBotService {
        let embedder = Arc::new(HashingEmbedder::new(256));
        let index = Arc::new(LifespanIndex::build(records, embedder.as_ref()));
        HomeBotService::new(embedder, index, 3)
    }

    #[test]
    fn outlived_appliances_are_due_today() {
        assert_eq!(forecast_replacement(10, 10, today()), today());
        assert_eq!(forecast_replacement(10, 14, today()), today());
    }

    #[test]
    fn remaining_years_count_as_52_weeks() {
        assert_eq!(
            forecast_replacement(12, 10, today()),
            today() + Duration::weeks(104)
        );
    }

    #[test]
    fn answers_come_from_the_closest_record() {
        let bot = service(vec![
            record("Whirlpool", "WRF555SDFZ", 13, "french door refrigerator"),
            record("Rheem", "XE50M06ST45U1", 10, "electric water heater"),
        ]);
        let answer = bot.ask_on("How long will my Rheem water heater last?", 4, today()).unwrap();

        assert!(answer.answer.contains("Rheem XE50M06ST45U1"));
        assert!(answer.answer.contains("10 years"));
        assert_eq!(answer.forecasted_replacement_date, today() + Duration::weeks(6 * 52));
    }

    #[test]
    fn empty_index_is_a_home_bot_error() {
        let err = service(Vec::new()).ask_on("anything", 1, today()).unwrap_err();
        assert!(matches!(err, AppError::HomeBot(_)));
    }
}
