// src/db/price_repo.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};

use crate::common::error::AppError;

/// Reference replacement prices keyed by uppercased appliance type (`STOVE`, `AC_UNIT`).
#[derive(Clone, Default)]
pub struct PriceRepository;

impl PriceRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn reference_prices<'e, E>(&self, executor: E) -> Result<HashMap<String, Decimal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows: Vec<(String, Decimal)> =
            sqlx::query_as("SELECT appliance_type, average_price FROM appliance_reference_prices")
                .fetch_all(executor)
                .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn upsert<'e, E>(&self, executor: E, reference_key: &str, average_price: Decimal) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO appliance_reference_prices (appliance_type, average_price)
            VALUES ($1, $2)
            ON CONFLICT (appliance_type)
            DO UPDATE SET average_price = EXCLUDED.average_price, updated_at = NOW()
            "#,
        )
            .bind(reference_key)
            .bind(average_price)
            .execute(executor)
            .await?;
        Ok(())
    }
}
