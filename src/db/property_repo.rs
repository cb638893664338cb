// src/db/property_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::property::{AttentionRow, NewProperty, Property, PropertyAddress},
};

const PROPERTY_COLUMNS: &str = "id, user_id, street, city, state, postal_code, age_in_years, \
                                address, is_multifamily, created_at, updated_at";

#[derive(Clone)]
pub struct PropertyRepository {
    pool: PgPool,
}

impl PropertyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        property: &NewProperty,
    ) -> Result<Property, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Property>(&format!(
            r#"
            INSERT INTO properties (user_id, street, city, state, postal_code, age_in_years, address, is_multifamily)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PROPERTY_COLUMNS}
            "#
        ))
            .bind(user_id)
            .bind(&property.street)
            .bind(&property.city)
            .bind(&property.state)
            .bind(&property.postal_code)
            .bind(property.age_in_years)
            .bind(&property.home_address)
            .bind(property.is_multifamily)
            .fetch_one(executor)
            .await?;
        Ok(row)
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Property>, AppError> {
        let rows = sqlx::query_as::<_, Property>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE user_id = $1 ORDER BY created_at, id"
        ))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<PropertyAddress>, AppError> {
        let rows = sqlx::query_as::<_, PropertyAddress>(
            "SELECT id, address FROM properties WHERE user_id = $1 ORDER BY created_at, id",
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// `None` when the property does not exist or belongs to someone else.
    pub async fn find_owned(&self, user_id: Uuid, property_id: Uuid) -> Result<Option<Property>, AppError> {
        let row = sqlx::query_as::<_, Property>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1 AND user_id = $2"
        ))
            .bind(property_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    // Appliances and structures with a forecast, across all of the user's properties
    pub async fn forecasted_components(&self, user_id: Uuid) -> Result<Vec<AttentionRow>, AppError> {
        let rows = sqlx::query_as::<_, AttentionRow>(
            r#"
            SELECT a.id,
                   a.appliance_type::text AS name,
                   p.id AS property_id,
                   p.address AS property_address,
                   a.age_in_years,
                   a.estimated_replacement_cost,
                   a.forecasted_replacement_date::date AS forecasted_replacement_date
            FROM appliances a
            JOIN properties p ON p.id = a.property_id
            WHERE p.user_id = $1 AND a.forecasted_replacement_date IS NOT NULL
            UNION ALL
            SELECT s.id,
                   s.structure_type::text AS name,
                   p.id AS property_id,
                   p.address AS property_address,
                   s.age_in_years,
                   s.estimated_replacement_cost,
                   s.forecasted_replacement_date
            FROM structures s
            JOIN properties p ON p.id = s.property_id
            WHERE p.user_id = $1 AND s.forecasted_replacement_date IS NOT NULL
            ORDER BY forecasted_replacement_date, id
            "#,
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
