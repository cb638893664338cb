// src/models/scraping.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::validate_digits;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    UpdateAppliancePrices,
    FetchHousingData {
        #[serde(rename = "postalCode")]
        postal_code: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeJob {
    pub id: Uuid,
    /// Only the submitting user can read the job.
    #[serde(skip)]
    pub user_id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    #[schema(value_type = Option<Object>)]
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScrapeJob {
    pub fn queued(user_id: Uuid, kind: JobKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            status: JobStatus::Queued,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub job_id: Uuid,
    pub status: JobStatus,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchHousesPayload {
    #[validate(
        required(message = "The postalCode field is required."),
        custom(function = "validate_digits")
    )]
    pub postal_code: Option<String>,
}

// Job results
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdateResult {
    pub put_record_status: u16,
    pub prices: BTreeMap<String, Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HousingDataResult {
    pub fetch_housing_data_status: u16,
    pub postal_code: String,
    pub region: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn postal_code_must_be_digits() {
        let payload: FetchHousesPayload =
            serde_json::from_value(json!({"postalCode": "62-701"})).unwrap();
        assert!(payload.validate().is_err());

        let payload: FetchHousesPayload =
            serde_json::from_value(json!({"postalCode": "62701"})).unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn job_kind_is_tagged() {
        let kind = JobKind::FetchHousingData { postal_code: "62701".to_string() };
        assert_eq!(
            serde_json::to_value(&kind).unwrap(),
            json!({"type": "FETCH_HOUSING_DATA", "postalCode": "62701"})
        );
    }
}
