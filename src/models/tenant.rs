// src/models/tenant.rs

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::common::validation::{
    into_result, parse_date, validate_iso_date, validate_non_negative_amount, validate_not_blank,
    violation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "contract_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub property_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub contract_start_date: NaiveDate,
    pub contract_end_date: NaiveDate,
    pub contract_status: ContractStatus,
    pub recommended_replacement_date: Option<NaiveDate>,
    pub monthly_rent: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whole months from `start` to `end`; a partial trailing month is not counted.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if months > 0 && end.day() < start.day() {
        months -= 1;
    } else if months < 0 && end.day() > start.day() {
        months += 1;
    }
    months
}

// Wire shape of GET /v1/properties/{id}/tenants
#[derive(Debug, Serialize, ToSchema)]
pub struct TenantView {
    pub id: Uuid,
    pub property_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub contract_start_date: NaiveDate,
    pub contract_end_date: NaiveDate,
    pub is_current: bool,
    pub current_rent: Decimal,
    pub recommended_replacement_dates: Option<NaiveDate>,
    pub contract_duration_months: i32,
    pub phone_number: String,
}

impl From<Tenant> for TenantView {
    fn from(tenant: Tenant) -> Self {
        Self {
            contract_duration_months: months_between(tenant.contract_start_date, tenant.contract_end_date),
            id: tenant.id,
            property_id: tenant.property_id,
            first_name: tenant.first_name,
            last_name: tenant.last_name,
            contract_start_date: tenant.contract_start_date,
            contract_end_date: tenant.contract_end_date,
            is_current: tenant.contract_status == ContractStatus::Active,
            current_rent: tenant.monthly_rent,
            recommended_replacement_dates: tenant.recommended_replacement_date,
            phone_number: tenant.phone_number,
        }
    }
}

// ---
// Create
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTenantPayload {
    #[validate(
        required(message = "The first_name field is required."),
        custom(function = "validate_not_blank")
    )]
    pub first_name: Option<String>,

    #[validate(
        required(message = "The last_name field is required."),
        custom(function = "validate_not_blank")
    )]
    pub last_name: Option<String>,

    #[validate(
        required(message = "The contract_start_date field is required."),
        custom(function = "validate_iso_date")
    )]
    pub contract_start_date: Option<String>,

    #[validate(
        required(message = "The contract_end_date field is required."),
        custom(function = "validate_iso_date")
    )]
    pub contract_end_date: Option<String>,

    #[validate(
        required(message = "The current_rent field is required."),
        custom(function = "validate_non_negative_amount")
    )]
    pub current_rent: Option<Decimal>,

    #[validate(
        required(message = "The phone_number field is required."),
        custom(function = "validate_not_blank")
    )]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTenant {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub contract_start_date: NaiveDate,
    pub contract_end_date: NaiveDate,
    pub monthly_rent: Decimal,
}

impl CreateTenantPayload {
    pub fn into_new_tenant(self) -> Result<NewTenant, ValidationErrors> {
        self.validate()?;

        let start = self.contract_start_date.as_deref().and_then(parse_date);
        let end = self.contract_end_date.as_deref().and_then(parse_date);
        let (Some(contract_start_date), Some(contract_end_date)) = (start, end) else {
            let mut errors = ValidationErrors::new();
            errors.add("contract_start_date", violation("date_format", "Contract dates must be YYYY-MM-DD."));
            return Err(errors);
        };

        let mut errors = ValidationErrors::new();
        if contract_end_date < contract_start_date {
            errors.add(
                "contract_end_date",
                violation("date_order", "contract_end_date cannot precede contract_start_date."),
            );
        }
        into_result(errors)?;

        Ok(NewTenant {
            first_name: self.first_name.unwrap_or_default().trim().to_string(),
            last_name: self.last_name.unwrap_or_default().trim().to_string(),
            phone_number: self.phone_number.unwrap_or_default().trim().to_string(),
            contract_start_date,
            contract_end_date,
            monthly_rent: self.current_rent.unwrap_or_default(),
        })
    }
}

// ---
// Update
// ---

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTenantPayload {
    #[validate(custom(function = "validate_not_blank"))]
    pub first_name: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub last_name: Option<String>,
    #[validate(custom(function = "validate_iso_date"))]
    pub contract_start_date: Option<String>,
    #[validate(custom(function = "validate_iso_date"))]
    pub contract_end_date: Option<String>,
    pub contract_status: Option<ContractStatus>,
    #[validate(custom(function = "validate_iso_date"))]
    pub recommended_replacement_date: Option<String>,
    #[validate(custom(function = "validate_non_negative_amount"))]
    pub monthly_rent: Option<Decimal>,
    #[validate(custom(function = "validate_not_blank"))]
    pub phone_number: Option<String>,
}

/// A single column assignment of a partial tenant update.
#[derive(Debug, Clone, PartialEq)]
pub enum TenantField {
    FirstName(String),
    LastName(String),
    ContractStartDate(NaiveDate),
    ContractEndDate(NaiveDate),
    ContractStatus(ContractStatus),
    RecommendedReplacementDate(NaiveDate),
    MonthlyRent(Decimal),
    PhoneNumber(String),
}

impl TenantField {
    pub fn column(&self) -> &'static str {
        match self {
            TenantField::FirstName(_) => "first_name",
            TenantField::LastName(_) => "last_name",
            TenantField::ContractStartDate(_) => "contract_start_date",
            TenantField::ContractEndDate(_) => "contract_end_date",
            TenantField::ContractStatus(_) => "contract_status",
            TenantField::RecommendedReplacementDate(_) => "recommended_replacement_date",
            TenantField::MonthlyRent(_) => "monthly_rent",
            TenantField::PhoneNumber(_) => "phone_number",
        }
    }
}

impl UpdateTenantPayload {
    /// The columns to set, in a stable order. At least one is required.
    pub fn into_fields(self) -> Result<Vec<TenantField>, ValidationErrors> {
        self.validate()?;

        let mut fields = Vec::new();
        if let Some(v) = self.first_name {
            fields.push(TenantField::FirstName(v.trim().to_string()));
        }
        if let Some(v) = self.last_name {
            fields.push(TenantField::LastName(v.trim().to_string()));
        }
        if let Some(d) = self.contract_start_date.as_deref().and_then(parse_date) {
            fields.push(TenantField::ContractStartDate(d));
        }
        if let Some(d) = self.contract_end_date.as_deref().and_then(parse_date) {
            fields.push(TenantField::ContractEndDate(d));
        }
        if let Some(status) = self.contract_status {
            fields.push(TenantField::ContractStatus(status));
        }
        if let Some(d) = self.recommended_replacement_date.as_deref().and_then(parse_date) {
            fields.push(TenantField::RecommendedReplacementDate(d));
        }
        if let Some(rent) = self.monthly_rent {
            fields.push(TenantField::MonthlyRent(rent));
        }
        if let Some(v) = self.phone_number {
            fields.push(TenantField::PhoneNumber(v.trim().to_string()));
        }

        if fields.is_empty() {
            let mut errors = ValidationErrors::new();
            errors.add("tenant", violation("empty_update", "At least one tenant field must be provided."));
            return Err(errors);
        }
        if let (Some(start), Some(end)) = (assigned_start(&fields), assigned_end(&fields)) {
            check_contract_order(start, end)?;
        }
        Ok(fields)
    }
}

fn assigned_start(fields: &[TenantField]) -> Option<NaiveDate> {
    fields.iter().find_map(|f| match f {
        TenantField::ContractStartDate(d) => Some(*d),
        _ => None,
    })
}

fn assigned_end(fields: &[TenantField]) -> Option<NaiveDate> {
    fields.iter().find_map(|f| match f {
        TenantField::ContractEndDate(d) => Some(*d),
        _ => None,
    })
}

fn check_contract_order(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if end < start {
        errors.add(
            "contract_end_date",
            violation("date_order", "contract_end_date cannot precede contract_start_date."),
        );
    }
    into_result(errors)
}

/// Checks the contract dates the stored row would have once `fields` are applied.
pub fn check_merged_contract_dates(current: &Tenant, fields: &[TenantField]) -> Result<(), ValidationErrors> {
    let start = assigned_start(fields).unwrap_or(current.contract_start_date);
    let end = assigned_end(fields).unwrap_or(current.contract_end_date);
    check_contract_order(start, end)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantUpdateResponse {
    pub put_record_status: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn contract_duration_counts_whole_months() {
        assert_eq!(months_between(date(2024, 1, 1), date(2025, 1, 1)), 12);
        assert_eq!(months_between(date(2024, 1, 15), date(2024, 3, 14)), 1);
        assert_eq!(months_between(date(2024, 1, 31), date(2024, 2, 29)), 0);
        assert_eq!(months_between(date(2024, 3, 1), date(2024, 3, 20)), 0);
    }

    #[test]
    fn create_rejects_reversed_contract_dates() {
        let payload: CreateTenantPayload = serde_json::from_value(json!({
            "first_name": "Jane",
            "last_name": "Doe",
            "contract_start_date": "2025-06-01",
            "contract_end_date": "2025-01-01",
            "current_rent": 1500,
            "phone_number": "5551234567"
        }))
        .unwrap();
        let errors = payload.into_new_tenant().unwrap_err();
        assert!(errors.field_errors().contains_key("contract_end_date"));
    }

    #[test]
    fn create_reports_every_missing_field() {
        let payload: CreateTenantPayload = serde_json::from_value(json!({})).unwrap();
        let errors = payload.into_new_tenant().unwrap_err();
        assert_eq!(errors.field_errors().len(), 6);
    }

    #[test]
    fn update_collects_only_given_fields() {
        let payload: UpdateTenantPayload = serde_json::from_value(json!({
            "monthly_rent": 1750.25,
            "contract_status": "inactive"
        }))
        .unwrap();
        let fields = payload.into_fields().unwrap();
        let columns: Vec<_> = fields.iter().map(TenantField::column).collect();
        assert_eq!(columns, ["contract_status", "monthly_rent"]);
    }

    fn stored_tenant(start: NaiveDate, end: NaiveDate) -> Tenant {
        let now = Utc::now();
        Tenant {
            id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            phone_number: "5551234567".to_string(),
            contract_start_date: start,
            contract_end_date: end,
            contract_status: ContractStatus::Active,
            recommended_replacement_date: None,
            monthly_rent: Decimal::new(150000, 2),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn update_rejects_reversed_dates_in_one_payload() {
        let payload: UpdateTenantPayload = serde_json::from_value(json!({
            "contract_start_date": "2025-06-01",
            "contract_end_date": "2025-01-01"
        }))
        .unwrap();
        let errors = payload.into_fields().unwrap_err();
        assert!(errors.field_errors().contains_key("contract_end_date"));
    }

    #[test]
    fn single_date_updates_are_checked_against_the_stored_contract() {
        let current = stored_tenant(date(2025, 1, 1), date(2025, 12, 31));

        let early_end = [TenantField::ContractEndDate(date(2024, 6, 1))];
        assert!(check_merged_contract_dates(&current, &early_end).is_err());

        let late_start = [TenantField::ContractStartDate(date(2026, 2, 1))];
        assert!(check_merged_contract_dates(&current, &late_start).is_err());

        let extension = [TenantField::ContractEndDate(date(2026, 12, 31))];
        assert!(check_merged_contract_dates(&current, &extension).is_ok());

        let rent_only = [TenantField::MonthlyRent(Decimal::new(160000, 2))];
        assert!(check_merged_contract_dates(&current, &rent_only).is_ok());
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(UpdateTenantPayload::default().into_fields().is_err());
    }
}
