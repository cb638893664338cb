// src/services/maintenance_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ApplianceRepository, PropertyRepository, StructureRepository},
    models::maintenance::{ApplianceChange, ForecastChange, PutRecordResponse, StructureChange},
};

#[derive(Clone)]
pub struct MaintenanceService {
    pool: PgPool,
    property_repo: PropertyRepository,
    appliance_repo: ApplianceRepository,
    structure_repo: StructureRepository,
}

impl MaintenanceService {
    pub fn new(
        pool: PgPool,
        property_repo: PropertyRepository,
        appliance_repo: ApplianceRepository,
        structure_repo: StructureRepository,
    ) -> Self {
        Self { pool, property_repo, appliance_repo, structure_repo }
    }

    async fn ensure_owned(&self, user_id: Uuid, property_id: Uuid) -> Result<(), AppError> {
        match self.property_repo.find_owned(user_id, property_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("property")),
        }
    }

    /// Every change must hit at least one row, otherwise nothing is written.
    pub async fn update_appliances(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        changes: Vec<ApplianceChange>,
    ) -> Result<PutRecordResponse, AppError> {
        self.ensure_owned(user_id, property_id).await?;

        let mut tx = self.pool.begin().await?;
        for change in &changes {
            let updated = self.appliance_repo.apply_change(&mut *tx, property_id, change).await?;
            if updated == 0 {
                return Err(AppError::NotFound("appliance"));
            }
        }
        tx.commit().await?;

        tracing::info!(property_id = %property_id, updates = changes.len(), "Appliances updated");
        Ok(PutRecordResponse::ok())
    }

    pub async fn update_structures(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        changes: Vec<StructureChange>,
    ) -> Result<PutRecordResponse, AppError> {
        self.ensure_owned(user_id, property_id).await?;

        let mut tx = self.pool.begin().await?;
        for change in &changes {
            let updated = self.structure_repo.apply_change(&mut *tx, property_id, change).await?;
            if updated == 0 {
                return Err(AppError::NotFound("structure"));
            }
        }
        tx.commit().await?;

        tracing::info!(property_id = %property_id, updates = changes.len(), "Structures updated");
        Ok(PutRecordResponse::ok())
    }

    pub async fn update_forecast(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        change: ForecastChange,
    ) -> Result<PutRecordResponse, AppError> {
        self.ensure_owned(user_id, property_id).await?;

        let updated = self
            .appliance_repo
            .set_forecast(&self.pool, property_id, change.appliance_type, change.forecasted_replacement_date)
            .await?;
        if updated == 0 {
            return Err(AppError::NotFound("appliance"));
        }

        tracing::info!(
            property_id = %property_id,
            appliance_type = change.appliance_type.as_str(),
            date = %change.forecasted_replacement_date,
            "Forecast updated"
        );
        Ok(PutRecordResponse::ok())
    }
}
