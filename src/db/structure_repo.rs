// src/db/structure_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        maintenance::StructureChange,
        property::{Structure, StructureInsert},
    },
};

const STRUCTURE_COLUMNS: &str = "id, property_id, structure_type, age_in_years, estimated_replacement_cost, \
                                 forecasted_replacement_date, created_at";

#[derive(Clone)]
pub struct StructureRepository {
    pool: PgPool,
}

impl StructureRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_many<'e, E>(&self, executor: E, rows: &[StructureInsert]) -> Result<Vec<Structure>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let property_ids: Vec<Uuid> = rows.iter().map(|r| r.property_id).collect();
        let types: Vec<&str> = rows.iter().map(|r| r.structure_type.as_str()).collect();
        let ages: Vec<i32> = rows.iter().map(|r| r.age_in_years).collect();

        let structures = sqlx::query_as::<_, Structure>(&format!(
            r#"
            INSERT INTO structures (property_id, structure_type, age_in_years)
            SELECT p, t::structure_type, a
            FROM UNNEST($1::uuid[], $2::text[], $3::int4[]) AS batch(p, t, a)
            RETURNING {STRUCTURE_COLUMNS}
            "#
        ))
            .bind(property_ids)
            .bind(types)
            .bind(ages)
            .fetch_all(executor)
            .await?;
        Ok(structures)
    }

    pub async fn list_for_property(&self, property_id: Uuid) -> Result<Vec<Structure>, AppError> {
        let structures = sqlx::query_as::<_, Structure>(&format!(
            "SELECT {STRUCTURE_COLUMNS} FROM structures WHERE property_id = $1 ORDER BY structure_type"
        ))
            .bind(property_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(structures)
    }

    pub async fn apply_change<'e, E>(&self, executor: E, property_id: Uuid, change: &StructureChange) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE structures
            SET age_in_years = $3,
                estimated_replacement_cost = $4,
                forecasted_replacement_date = $5
            WHERE property_id = $1 AND structure_type = $2
            "#,
        )
            .bind(property_id)
            .bind(change.structure_type)
            .bind(change.age_in_years)
            .bind(change.estimated_replacement_cost)
            .bind(change.forecasted_replacement_date)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
