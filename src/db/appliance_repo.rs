// src/db/appliance_repo.rs

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        maintenance::ApplianceChange,
        property::{Appliance, ApplianceInsert, ApplianceType},
    },
};

const APPLIANCE_COLUMNS: &str = "id, property_id, unit_id, appliance_type, appliance_brand, appliance_model, \
                                 age_in_years, estimated_replacement_cost, forecasted_replacement_date, created_at";

#[derive(Clone)]
pub struct ApplianceRepository {
    pool: PgPool,
}

impl ApplianceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // One round trip for the whole batch
    pub async fn insert_many<'e, E>(&self, executor: E, rows: &[ApplianceInsert]) -> Result<Vec<Appliance>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let property_ids: Vec<Uuid> = rows.iter().map(|r| r.property_id).collect();
        let unit_ids: Vec<Option<Uuid>> = rows.iter().map(|r| r.unit_id).collect();
        let types: Vec<&str> = rows.iter().map(|r| r.appliance_type.as_str()).collect();
        let brands: Vec<Option<&str>> = rows.iter().map(|r| r.brand.as_deref()).collect();
        let models: Vec<Option<&str>> = rows.iter().map(|r| r.model.as_deref()).collect();
        let ages: Vec<Option<i32>> = rows.iter().map(|r| r.age_in_years).collect();
        let costs: Vec<Option<rust_decimal::Decimal>> =
            rows.iter().map(|r| r.estimated_replacement_cost).collect();

        let appliances = sqlx::query_as::<_, Appliance>(&format!(
            r#"
            INSERT INTO appliances
                (property_id, unit_id, appliance_type, appliance_brand, appliance_model, age_in_years, estimated_replacement_cost)
            SELECT p, u, t::appliance_type, b, m, a, c
            FROM UNNEST($1::uuid[], $2::uuid[], $3::text[], $4::text[], $5::text[], $6::int4[], $7::numeric[])
                AS batch(p, u, t, b, m, a, c)
            RETURNING {APPLIANCE_COLUMNS}
            "#
        ))
            .bind(property_ids)
            .bind(unit_ids)
            .bind(types)
            .bind(brands)
            .bind(models)
            .bind(ages)
            .bind(costs)
            .fetch_all(executor)
            .await?;
        Ok(appliances)
    }

    /// Property-level and unit-level appliances of a property.
    pub async fn list_for_property(&self, property_id: Uuid) -> Result<Vec<Appliance>, AppError> {
        let appliances = sqlx::query_as::<_, Appliance>(&format!(
            "SELECT {APPLIANCE_COLUMNS} FROM appliances WHERE property_id = $1 ORDER BY unit_id NULLS FIRST, appliance_type"
        ))
            .bind(property_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(appliances)
    }

    // Empty when the unit's property is not the caller's
    pub async fn list_for_unit_owned(&self, user_id: Uuid, unit_id: Uuid) -> Result<Vec<Appliance>, AppError> {
        let appliances = sqlx::query_as::<_, Appliance>(
            r#"
            SELECT a.id, a.property_id, a.unit_id, a.appliance_type, a.appliance_brand, a.appliance_model,
                   a.age_in_years, a.estimated_replacement_cost, a.forecasted_replacement_date, a.created_at
            FROM appliances a
            JOIN properties p ON p.id = a.property_id
            WHERE a.unit_id = $1 AND p.user_id = $2
            ORDER BY a.appliance_type
            "#,
        )
            .bind(unit_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(appliances)
    }

    pub async fn apply_change<'e, E>(&self, executor: E, property_id: Uuid, change: &ApplianceChange) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE appliances
            SET age_in_years = $3,
                estimated_replacement_cost = $4,
                forecasted_replacement_date = $5,
                appliance_brand = COALESCE($6, appliance_brand),
                appliance_model = COALESCE($7, appliance_model)
            WHERE property_id = $1
              AND appliance_type = $2
              AND ($8::uuid IS NULL OR unit_id = $8)
            "#,
        )
            .bind(property_id)
            .bind(change.appliance_type)
            .bind(change.age_in_years)
            .bind(change.estimated_replacement_cost)
            .bind(change.forecasted_replacement_date)
            .bind(change.appliance_brand.as_deref())
            .bind(change.appliance_model.as_deref())
            .bind(change.unit_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_forecast<'e, E>(
        &self,
        executor: E,
        property_id: Uuid,
        appliance_type: ApplianceType,
        date: NaiveDate,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let forecast: NaiveDateTime = date.and_time(chrono::NaiveTime::MIN);
        let result = sqlx::query(
            "UPDATE appliances SET forecasted_replacement_date = $3 WHERE property_id = $1 AND appliance_type = $2",
        )
            .bind(property_id)
            .bind(appliance_type)
            .bind(forecast)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn refresh_cost<'e, E>(
        &self,
        executor: E,
        appliance_type: ApplianceType,
        cost: rust_decimal::Decimal,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE appliances SET estimated_replacement_cost = $2 WHERE appliance_type = $1")
            .bind(appliance_type)
            .bind(cost)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
