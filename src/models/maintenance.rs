// src/models/maintenance.rs

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::common::validation::{
    into_result, parse_date, parse_date_time, validate_brand_or_model, validate_date_time,
    validate_iso_date, validate_non_negative_amount, violation,
};
use crate::models::property::{ApplianceType, StructureType};

fn validate_appliance_key(key: &str) -> Result<(), ValidationError> {
    match ApplianceType::from_request_key(key) {
        Some(_) => Ok(()),
        None => Err(violation("unknown_appliance", format!("'{key}' is not a supported appliance."))),
    }
}

fn validate_structure_key(key: &str) -> Result<(), ValidationError> {
    // Deck is a valid stored structure even though creation never accepts it.
    let known = StructureType::from_request_key(key).is_some() || key.trim().eq_ignore_ascii_case("deck");
    if known {
        Ok(())
    } else {
        Err(violation("unknown_structure", format!("'{key}' is not a supported structure.")))
    }
}

fn structure_type_of(key: &str) -> Option<StructureType> {
    if key.trim().eq_ignore_ascii_case("deck") {
        return Some(StructureType::Deck);
    }
    StructureType::from_request_key(key)
}

// ---
// PUT /v1/properties/{id}/appliances
// ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ApplianceUpdate {
    #[validate(custom(function = "validate_appliance_key"))]
    pub appliance_type: String,

    #[validate(range(min = 0, message = "age_in_years cannot be negative."))]
    pub age_in_years: i32,

    #[validate(custom(function = "validate_non_negative_amount"))]
    pub estimated_replacement_cost: Decimal,

    #[validate(custom(function = "validate_date_time"))]
    pub forecasted_replacement_date: String,

    #[serde(rename = "applianceBrand")]
    #[validate(custom(function = "validate_brand_or_model"))]
    pub appliance_brand: Option<String>,

    #[serde(rename = "applianceModel")]
    #[validate(custom(function = "validate_brand_or_model"))]
    pub appliance_model: Option<String>,

    /// Restricts the update to one unit of a multifamily property.
    #[serde(rename = "unitId")]
    pub unit_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceUpdatesPayload {
    #[validate(
        required(message = "The applianceUpdates field is required."),
        length(min = 1, message = "applianceUpdates must contain at least one update."),
        nested
    )]
    pub appliance_updates: Option<Vec<ApplianceUpdate>>,
}

/// One validated appliance update.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplianceChange {
    pub appliance_type: ApplianceType,
    pub age_in_years: i32,
    pub estimated_replacement_cost: Decimal,
    pub forecasted_replacement_date: NaiveDateTime,
    pub appliance_brand: Option<String>,
    pub appliance_model: Option<String>,
    pub unit_id: Option<Uuid>,
}

impl ApplianceUpdatesPayload {
    pub fn into_changes(self) -> Result<Vec<ApplianceChange>, ValidationErrors> {
        self.validate()?;

        let mut errors = ValidationErrors::new();
        let mut changes = Vec::new();
        for update in self.appliance_updates.unwrap_or_default() {
            let parsed = (
                ApplianceType::from_request_key(&update.appliance_type),
                parse_date_time(&update.forecasted_replacement_date),
            );
            let (Some(appliance_type), Some(forecasted_replacement_date)) = parsed else {
                errors.add("appliance_updates", violation("invalid_update", "An appliance update could not be parsed."));
                continue;
            };
            changes.push(ApplianceChange {
                appliance_type,
                age_in_years: update.age_in_years,
                estimated_replacement_cost: update.estimated_replacement_cost,
                forecasted_replacement_date,
                appliance_brand: update.appliance_brand.map(|b| b.trim().to_string()),
                appliance_model: update.appliance_model.map(|m| m.trim().to_string()),
                unit_id: update.unit_id,
            });
        }
        into_result(errors)?;
        Ok(changes)
    }
}

// ---
// PUT /v1/properties/{id}/structures
// ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct StructureUpdate {
    #[validate(custom(function = "validate_structure_key"))]
    pub structure_type: String,

    #[validate(range(min = 0, message = "age_in_years cannot be negative."))]
    pub age_in_years: i32,

    #[validate(custom(function = "validate_non_negative_amount"))]
    pub estimated_replacement_cost: Decimal,

    #[validate(custom(function = "validate_iso_date"))]
    pub forecasted_replacement_date: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StructureUpdatesPayload {
    #[validate(
        required(message = "The structureUpdates field is required."),
        length(min = 1, message = "structureUpdates must contain at least one update."),
        nested
    )]
    pub structure_updates: Option<Vec<StructureUpdate>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructureChange {
    pub structure_type: StructureType,
    pub age_in_years: i32,
    pub estimated_replacement_cost: Decimal,
    pub forecasted_replacement_date: NaiveDate,
}

impl StructureUpdatesPayload {
    pub fn into_changes(self) -> Result<Vec<StructureChange>, ValidationErrors> {
        self.validate()?;

        let mut errors = ValidationErrors::new();
        let mut changes = Vec::new();
        for update in self.structure_updates.unwrap_or_default() {
            let parsed = (
                structure_type_of(&update.structure_type),
                parse_date(&update.forecasted_replacement_date),
            );
            let (Some(structure_type), Some(forecasted_replacement_date)) = parsed else {
                errors.add("structure_updates", violation("invalid_update", "A structure update could not be parsed."));
                continue;
            };
            changes.push(StructureChange {
                structure_type,
                age_in_years: update.age_in_years,
                estimated_replacement_cost: update.estimated_replacement_cost,
                forecasted_replacement_date,
            });
        }
        into_result(errors)?;
        Ok(changes)
    }
}

// ---
// PUT /v1/properties/{id}/forecasted-replacement-date
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForecastUpdatePayload {
    #[validate(
        required(message = "The applianceType field is required."),
        custom(function = "validate_appliance_key")
    )]
    pub appliance_type: Option<String>,

    #[validate(
        required(message = "The forecastedReplacementDate field is required."),
        custom(function = "validate_iso_date")
    )]
    pub forecasted_replacement_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastChange {
    pub appliance_type: ApplianceType,
    pub forecasted_replacement_date: NaiveDate,
}

impl ForecastUpdatePayload {
    pub fn into_change(self) -> Result<ForecastChange, ValidationErrors> {
        self.validate()?;

        let appliance_type = self.appliance_type.as_deref().and_then(ApplianceType::from_request_key);
        let date = self.forecasted_replacement_date.as_deref().and_then(parse_date);
        match (appliance_type, date) {
            (Some(appliance_type), Some(forecasted_replacement_date)) => Ok(ForecastChange {
                appliance_type,
                forecasted_replacement_date,
            }),
            _ => {
                let mut errors = ValidationErrors::new();
                errors.add("forecasted_replacement_date", violation("invalid_update", "The forecast could not be parsed."));
                Err(errors)
            }
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PutRecordResponse {
    pub put_record_status: u16,
}

impl PutRecordResponse {
    pub fn ok() -> Self {
        Self { put_record_status: 200 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn forecast_date_parses_iso_only() {
        let payload: ForecastUpdatePayload = serde_json::from_value(json!({
            "applianceType": "stove",
            "forecastedReplacementDate": "2025-06-15"
        }))
        .unwrap();
        let change = payload.into_change().unwrap();
        assert_eq!(change.forecasted_replacement_date, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());

        let payload: ForecastUpdatePayload = serde_json::from_value(json!({
            "applianceType": "stove",
            "forecastedReplacementDate": "06/15/2025"
        }))
        .unwrap();
        let errors = payload.into_change().unwrap_err();
        assert!(errors.field_errors().contains_key("forecasted_replacement_date"));
    }

    #[test]
    fn appliance_updates_require_at_least_one_entry() {
        let payload: ApplianceUpdatesPayload =
            serde_json::from_value(json!({"applianceUpdates": []})).unwrap();
        assert!(payload.into_changes().is_err());

        let payload: ApplianceUpdatesPayload = serde_json::from_value(json!({})).unwrap();
        assert!(payload.into_changes().is_err());
    }

    #[test]
    fn empty_update_lists_report_a_length_violation() {
        let payload: ApplianceUpdatesPayload =
            serde_json::from_value(json!({"applianceUpdates": []})).unwrap();
        let errors = payload.into_changes().unwrap_err();
        assert_eq!(errors.field_errors()["appliance_updates"][0].code, "length");

        let payload: StructureUpdatesPayload =
            serde_json::from_value(json!({"structureUpdates": []})).unwrap();
        let errors = payload.into_changes().unwrap_err();
        assert_eq!(errors.field_errors()["structure_updates"][0].code, "length");
    }

    #[test]
    fn appliance_update_keeps_optional_brand_absent() {
        let payload: ApplianceUpdatesPayload = serde_json::from_value(json!({
            "applianceUpdates": [{
                "appliance_type": "a/c unit",
                "age_in_years": 4,
                "estimated_replacement_cost": 1200.5,
                "forecasted_replacement_date": "2030-01-01 00:00:00",
                "applianceModel": "X-100"
            }]
        }))
        .unwrap();
        let changes = payload.into_changes().unwrap();
        assert_eq!(changes[0].appliance_type, ApplianceType::AcUnit);
        assert_eq!(changes[0].appliance_brand, None);
        assert_eq!(changes[0].appliance_model.as_deref(), Some("X-100"));
    }

    #[test]
    fn nested_violations_are_reported() {
        let payload: ApplianceUpdatesPayload = serde_json::from_value(json!({
            "applianceUpdates": [{
                "appliance_type": "toaster",
                "age_in_years": -1,
                "estimated_replacement_cost": 10,
                "forecasted_replacement_date": "2030-01-01"
            }]
        }))
        .unwrap();
        let errors = payload.into_changes().unwrap_err();
        assert!(errors.errors().contains_key("appliance_updates"));
    }

    #[test]
    fn structure_updates_accept_deck() {
        let payload: StructureUpdatesPayload = serde_json::from_value(json!({
            "structureUpdates": [{
                "structure_type": "deck",
                "age_in_years": 9,
                "estimated_replacement_cost": 3000,
                "forecasted_replacement_date": "2031-05-01"
            }]
        }))
        .unwrap();
        let changes = payload.into_changes().unwrap();
        assert_eq!(changes[0].structure_type, StructureType::Deck);
    }
}
