// src/db/unit_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::property::Unit};

#[derive(Clone)]
pub struct UnitRepository {
    pool: PgPool,
}

impl UnitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, property_id: Uuid, unit_number: &str) -> Result<Unit, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let unit = sqlx::query_as::<_, Unit>(
            r#"
            INSERT INTO units (property_id, unit_number)
            VALUES ($1, $2)
            RETURNING id, unit_number, property_id, created_at, updated_at
            "#,
        )
            .bind(property_id)
            .bind(unit_number)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::InvalidRequest(format!(
                            "Unit number '{unit_number}' already exists for this property"
                        ));
                    }
                }
                e.into()
            })?;
        Ok(unit)
    }

    // Empty when the property is not the caller's
    pub async fn list_owned(&self, user_id: Uuid, property_id: Uuid) -> Result<Vec<Unit>, AppError> {
        let units = sqlx::query_as::<_, Unit>(
            r#"
            SELECT u.id, u.unit_number, u.property_id, u.created_at, u.updated_at
            FROM units u
            JOIN properties p ON p.id = u.property_id
            WHERE u.property_id = $1 AND p.user_id = $2
            ORDER BY u.unit_number
            "#,
        )
            .bind(property_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(units)
    }
}
