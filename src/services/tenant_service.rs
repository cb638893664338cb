// src/services/tenant_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{PropertyRepository, TenantRepository},
    models::tenant::{check_merged_contract_dates, NewTenant, TenantField, TenantUpdateResponse, TenantView},
};

#[derive(Clone)]
pub struct TenantService {
    pool: PgPool,
    property_repo: PropertyRepository,
    tenant_repo: TenantRepository,
}

impl TenantService {
    pub fn new(pool: PgPool, property_repo: PropertyRepository, tenant_repo: TenantRepository) -> Self {
        Self { pool, property_repo, tenant_repo }
    }

    /// Adds a tenant and returns the property's full tenant list.
    pub async fn create_tenant(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        tenant: NewTenant,
    ) -> Result<Vec<TenantView>, AppError> {
        let property = self
            .property_repo
            .find_owned(user_id, property_id)
            .await?
            .ok_or(AppError::NotFound("property"))?;

        let created = self.tenant_repo.insert(&self.pool, property.id, &tenant).await?;
        tracing::info!(tenant_id = %created.id, property_id = %property.id, "Tenant created");

        self.list_for(property.id).await
    }

    pub async fn list_tenants(&self, user_id: Uuid, property_id: Uuid) -> Result<Vec<TenantView>, AppError> {
        let property = self
            .property_repo
            .find_owned(user_id, property_id)
            .await?
            .ok_or(AppError::NotFound("property"))?;
        self.list_for(property.id).await
    }

    async fn list_for(&self, property_id: Uuid) -> Result<Vec<TenantView>, AppError> {
        let tenants = self.tenant_repo.list_for_property(property_id).await?;
        Ok(tenants.into_iter().map(TenantView::from).collect())
    }

    pub async fn update_tenant(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        fields: Vec<TenantField>,
    ) -> Result<TenantUpdateResponse, AppError> {
        let mut tx = self.pool.begin().await?;
        let current = self
            .tenant_repo
            .find_owned_for_update(&mut *tx, user_id, tenant_id)
            .await?
            .ok_or(AppError::NotFound("tenant"))?;
        check_merged_contract_dates(&current, &fields)?;

        let updated = self.tenant_repo.update_fields(&mut *tx, user_id, tenant_id, &fields).await?;
        if updated == 0 {
            return Err(AppError::NotFound("tenant"));
        }
        tx.commit().await?;

        let columns: Vec<&str> = fields.iter().map(TenantField::column).collect();
        tracing::info!(tenant_id = %tenant_id, columns = ?columns, "Tenant updated");
        Ok(TenantUpdateResponse { put_record_status: 200 })
    }
}
