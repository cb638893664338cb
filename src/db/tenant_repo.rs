// src/db/tenant_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::tenant::{NewTenant, Tenant, TenantField},
};

const TENANT_COLUMNS: &str = "id, property_id, first_name, last_name, phone_number, contract_start_date, \
                              contract_end_date, contract_status, recommended_replacement_date, monthly_rent, \
                              created_at, updated_at";

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, property_id: Uuid, tenant: &NewTenant) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Tenant>(&format!(
            r#"
            INSERT INTO tenants
                (property_id, first_name, last_name, phone_number, contract_start_date, contract_end_date, monthly_rent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TENANT_COLUMNS}
            "#
        ))
            .bind(property_id)
            .bind(&tenant.first_name)
            .bind(&tenant.last_name)
            .bind(&tenant.phone_number)
            .bind(tenant.contract_start_date)
            .bind(tenant.contract_end_date)
            .bind(tenant.monthly_rent)
            .fetch_one(executor)
            .await?;
        Ok(row)
    }

    pub async fn list_for_property(&self, property_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        let rows = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE property_id = $1 ORDER BY contract_start_date, id"
        ))
            .bind(property_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Locks the caller's tenant row for the rest of the transaction.
    pub async fn find_owned_for_update<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Tenant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Tenant>(&format!(
            r#"
            SELECT {TENANT_COLUMNS} FROM tenants
            WHERE id = $1 AND property_id IN (SELECT id FROM properties WHERE user_id = $2)
            FOR UPDATE
            "#
        ))
            .bind(tenant_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    /// Sets only the given columns. Returns 0 when the tenant is not the caller's.
    pub async fn update_fields<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
        fields: &[TenantField],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE tenants SET ");
        {
            let mut set = builder.separated(", ");
            for field in fields {
                set.push(format!("{} = ", field.column()));
                match field {
                    TenantField::FirstName(v) | TenantField::LastName(v) | TenantField::PhoneNumber(v) => {
                        set.push_bind_unseparated(v.clone());
                    }
                    TenantField::ContractStartDate(d)
                    | TenantField::ContractEndDate(d)
                    | TenantField::RecommendedReplacementDate(d) => {
                        set.push_bind_unseparated(*d);
                    }
                    TenantField::ContractStatus(status) => {
                        set.push_bind_unseparated(*status);
                    }
                    TenantField::MonthlyRent(rent) => {
                        set.push_bind_unseparated(*rent);
                    }
                }
            }
            set.push("updated_at = NOW()");
        }
        builder.push(" WHERE id = ");
        builder.push_bind(tenant_id);
        builder.push(" AND property_id IN (SELECT id FROM properties WHERE user_id = ");
        builder.push_bind(user_id);
        builder.push(")");

        let result = builder.build().execute(executor).await?;
        Ok(result.rows_affected())
    }
}
