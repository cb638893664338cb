// src/models/property.rs

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::common::validation::{
    into_result, validate_brand_or_model, validate_not_blank, violation,
};

// ---
// Component kinds
// ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "appliance_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplianceType {
    Stove,
    Dishwasher,
    Dryer,
    Refrigerator,
    Washer,
    AcUnit,
    WaterHeater,
}

impl ApplianceType {
    pub const ALL: [ApplianceType; 7] = [
        ApplianceType::Stove,
        ApplianceType::Dishwasher,
        ApplianceType::Dryer,
        ApplianceType::Refrigerator,
        ApplianceType::Washer,
        ApplianceType::AcUnit,
        ApplianceType::WaterHeater,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplianceType::Stove => "stove",
            ApplianceType::Dishwasher => "dishwasher",
            ApplianceType::Dryer => "dryer",
            ApplianceType::Refrigerator => "refrigerator",
            ApplianceType::Washer => "washer",
            ApplianceType::AcUnit => "ac_unit",
            ApplianceType::WaterHeater => "water_heater",
        }
    }

    /// Key of the reference price table (`STOVE`, `AC_UNIT`, ...).
    pub fn reference_key(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }

    /// Accepts the keys clients send in property payloads.
    pub fn from_request_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "stove" => Some(ApplianceType::Stove),
            "dishwasher" => Some(ApplianceType::Dishwasher),
            "dryer" => Some(ApplianceType::Dryer),
            "refrigerator" => Some(ApplianceType::Refrigerator),
            "washer" => Some(ApplianceType::Washer),
            "a/c unit" | "ac_unit" | "air_conditioner" => Some(ApplianceType::AcUnit),
            "water_heater" | "water heater" => Some(ApplianceType::WaterHeater),
            _ => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "structure_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    Roof,
    Driveway,
    WaterHeater,
    Furnace,
    Deck,
}

impl StructureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructureType::Roof => "roof",
            StructureType::Driveway => "driveway",
            StructureType::WaterHeater => "water_heater",
            StructureType::Furnace => "furnace",
            StructureType::Deck => "deck",
        }
    }

    /// Deck only arrives through bulk upload.
    pub fn from_request_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "roof" => Some(StructureType::Roof),
            "driveway" => Some(StructureType::Driveway),
            "water heater" | "water_heater" => Some(StructureType::WaterHeater),
            "furnace" => Some(StructureType::Furnace),
            _ => None,
        }
    }
}

// ---
// Rows
// ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    pub user_id: Uuid,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub age_in_years: Option<i32>,
    pub address: String,
    pub is_multifamily: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PropertyAddress {
    pub id: Uuid,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Unit {
    #[serde(rename = "unit_id")]
    pub id: Uuid,
    pub unit_number: String,
    pub property_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appliance {
    pub id: Uuid,
    pub property_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub appliance_type: ApplianceType,
    pub appliance_brand: Option<String>,
    pub appliance_model: Option<String>,
    pub age_in_years: Option<i32>,
    pub estimated_replacement_cost: Option<Decimal>,
    pub forecasted_replacement_date: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    pub id: Uuid,
    pub property_id: Uuid,
    pub structure_type: StructureType,
    pub age_in_years: i32,
    pub estimated_replacement_cost: Option<Decimal>,
    pub forecasted_replacement_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

// Appliance as listed under a unit
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnitApplianceView {
    pub id: Uuid,
    pub property_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub appliance_type: ApplianceType,
    pub appliance_brand: Option<String>,
    pub appliance_model: Option<String>,
    pub age_in_years: Option<i32>,
    pub estimated_replacement_cost: Option<Decimal>,
    /// `YYYY-MM-DD HH:MM:SS`, or `TBD` when not forecasted yet.
    pub forecasted_replacement_date: String,
}

impl From<Appliance> for UnitApplianceView {
    fn from(appliance: Appliance) -> Self {
        Self {
            id: appliance.id,
            property_id: appliance.property_id,
            unit_id: appliance.unit_id,
            appliance_type: appliance.appliance_type,
            appliance_brand: appliance.appliance_brand,
            appliance_model: appliance.appliance_model,
            age_in_years: appliance.age_in_years,
            estimated_replacement_cost: appliance.estimated_replacement_cost,
            forecasted_replacement_date: appliance
                .forecasted_replacement_date
                .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "TBD".to_string()),
        }
    }
}

// ---
// Creation payload
// ---

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DetailedApplianceInput {
    pub age: i32,
    pub brand: Option<String>,
    pub model: Option<String>,
}

/// An appliance is either a bare age (legacy) or `{age, brand?, model?}`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ApplianceInput {
    Age(i32),
    Detailed(DetailedApplianceInput),
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnitPayload {
    pub unit_number: Option<String>,
    pub appliances: Option<BTreeMap<String, ApplianceInput>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyPayload {
    #[validate(
        required(message = "The street field is required."),
        length(min = 1, message = "The street field cannot be empty.")
    )]
    pub street: Option<String>,

    #[validate(
        required(message = "The city field is required."),
        length(min = 1, message = "The city field cannot be empty.")
    )]
    pub city: Option<String>,

    #[validate(
        required(message = "The state field is required."),
        length(min = 1, message = "The state field cannot be empty.")
    )]
    pub state: Option<String>,

    #[validate(
        required(message = "The zip field is required."),
        length(min = 1, message = "The zip field cannot be empty.")
    )]
    pub zip: Option<String>,

    #[validate(required(message = "The homeAge field is required."))]
    pub home_age: Option<i32>,

    #[serde(default)]
    pub is_multifamily: bool,

    pub appliances: Option<BTreeMap<String, ApplianceInput>>,
    pub structures: Option<BTreeMap<String, i32>>,
    pub units: Option<Vec<UnitPayload>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplianceSpec {
    pub age: Option<i32>,
    pub brand: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUnit {
    pub unit_number: String,
    pub appliances: BTreeMap<ApplianceType, ApplianceSpec>,
}

/// A validated property ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProperty {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub age_in_years: Option<i32>,
    pub home_address: String,
    pub is_multifamily: bool,
    pub appliances: BTreeMap<ApplianceType, ApplianceSpec>,
    pub structures: BTreeMap<StructureType, i32>,
    pub units: Vec<NewUnit>,
}

pub fn compose_address(street: &str, city: &str, state: &str) -> String {
    format!("{}, {}, {}", street.trim(), city.trim(), state.trim())
}

fn normalize_appliances(
    field: &'static str,
    input: Option<&BTreeMap<String, ApplianceInput>>,
    errors: &mut ValidationErrors,
) -> BTreeMap<ApplianceType, ApplianceSpec> {
    let mut appliances = BTreeMap::new();
    let Some(input) = input else {
        return appliances;
    };

    for (key, value) in input {
        let Some(appliance_type) = ApplianceType::from_request_key(key) else {
            errors.add(field, violation("unknown_appliance", format!("'{key}' is not a supported appliance.")));
            continue;
        };

        let spec = match value {
            ApplianceInput::Age(age) => ApplianceSpec { age: Some(*age), brand: None, model: None },
            ApplianceInput::Detailed(detail) => ApplianceSpec {
                age: Some(detail.age),
                brand: detail.brand.as_ref().map(|b| b.trim().to_string()),
                model: detail.model.as_ref().map(|m| m.trim().to_string()),
            },
        };

        if let ApplianceInput::Detailed(detail) = value {
            for (label, raw) in [("brand", &detail.brand), ("model", &detail.model)] {
                if let Some(raw) = raw {
                    if let Err(mut e) = validate_brand_or_model(raw) {
                        let reason = e.message.take().unwrap_or_default();
                        e.message = Some(format!("The {label} of '{key}' is invalid: {reason}").into());
                        errors.add(field, e);
                    }
                }
            }
        }

        appliances.insert(appliance_type, spec);
    }
    appliances
}

fn normalize_structures(
    input: Option<&BTreeMap<String, i32>>,
    errors: &mut ValidationErrors,
) -> BTreeMap<StructureType, i32> {
    let mut structures = BTreeMap::new();
    for (key, age) in input.into_iter().flatten() {
        match StructureType::from_request_key(key) {
            Some(structure_type) => {
                structures.insert(structure_type, *age);
            }
            None => errors.add(
                "structures",
                violation("unknown_structure", format!("'{key}' is not a supported structure.")),
            ),
        }
    }
    structures
}

impl CreatePropertyPayload {
    /// Validates every rule in one pass and normalizes the payload.
    pub fn into_new_property(self) -> Result<NewProperty, ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);

        let appliances = normalize_appliances("appliances", self.appliances.as_ref(), &mut errors);
        let structures = normalize_structures(self.structures.as_ref(), &mut errors);

        let mut units = Vec::new();
        let mut seen_unit_numbers = HashSet::new();
        for unit in self.units.iter().flatten() {
            let unit_number = unit.unit_number.as_deref().map(str::trim).unwrap_or_default();
            if validate_not_blank(unit_number).is_err() {
                errors.add("units", violation("unit_number", "Every unit needs a unitNumber."));
                continue;
            }
            if !seen_unit_numbers.insert(unit_number.to_string()) {
                errors.add(
                    "units",
                    violation("duplicate_unit", format!("Unit number '{unit_number}' appears more than once.")),
                );
                continue;
            }
            units.push(NewUnit {
                unit_number: unit_number.to_string(),
                appliances: normalize_appliances("units", unit.appliances.as_ref(), &mut errors),
            });
        }

        // Single-family and multifamily shapes are mutually exclusive.
        if self.is_multifamily {
            if self.units.as_ref().is_none_or(|u| u.is_empty()) {
                errors.add(
                    "units",
                    violation("units_required", "A multifamily property needs at least one unit."),
                );
            }
            if self.appliances.is_some() {
                errors.add(
                    "appliances",
                    violation(
                        "multifamily_appliances",
                        "A multifamily property keeps its appliances under its units.",
                    ),
                );
            }
        } else if self.units.is_some() {
            errors.add(
                "units",
                violation("single_family_units", "Only multifamily properties can have units."),
            );
        }

        into_result(errors)?;

        let street = self.street.unwrap_or_default().trim().to_string();
        let city = self.city.unwrap_or_default().trim().to_string();
        let state = self.state.unwrap_or_default().trim().to_string();
        let home_address = compose_address(&street, &city, &state);

        Ok(NewProperty {
            street,
            city,
            state,
            postal_code: self.zip.unwrap_or_default().trim().to_string(),
            age_in_years: self.home_age,
            home_address,
            is_multifamily: self.is_multifamily,
            appliances,
            structures,
            units,
        })
    }
}

/// `(property_id, unit_id, type, brand, model, age, cost)`
#[derive(Debug, Clone, PartialEq)]
pub struct ApplianceInsert {
    pub property_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub appliance_type: ApplianceType,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub age_in_years: Option<i32>,
    pub estimated_replacement_cost: Option<Decimal>,
}

/// `(property_id, type, age)`; structures never belong to a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureInsert {
    pub property_id: Uuid,
    pub structure_type: StructureType,
    pub age_in_years: i32,
}

// ---
// Creation responses
// ---

pub type ComponentAges = BTreeMap<Uuid, Vec<BTreeMap<String, Option<i32>>>>;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyCreationResponse {
    pub property_record_status: u16,
    pub units_record_status: u16,
    pub appliance_record_status: u16,
    pub appliance_structures_status: u16,
    pub property_id: Uuid,
    #[schema(value_type = Object)]
    pub appliances_table_response: ComponentAges,
    #[schema(value_type = Object)]
    pub structures_table_response: ComponentAges,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkInsertionResponse {
    pub insert_record_status: u16,
    pub properties_inserted: usize,
    pub property_record_status: u16,
    pub units_record_status: u16,
    pub appliance_record_status: u16,
    pub appliance_structures_status: u16,
    #[schema(value_type = Object)]
    pub appliances_table_response: ComponentAges,
    #[schema(value_type = Object)]
    pub structures_table_response: ComponentAges,
}

// ---
// Retrieval
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetrievalType {
    All,
    Single,
    Appliances,
    Structures,
    Addresses,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PropertyListQuery {
    /// `ALL` (default) or `ADDRESSES`
    pub retrieval_type: Option<RetrievalType>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PropertyRetrieval {
    Properties(Vec<Property>),
    Property(Box<Property>),
    Appliances(Vec<Appliance>),
    Structures(Vec<Structure>),
    Addresses(Vec<PropertyAddress>),
}

// ---
// Needs attention
// ---

#[derive(Debug, Clone, FromRow)]
pub struct AttentionRow {
    pub id: Uuid,
    pub name: String,
    pub property_id: Uuid,
    pub property_address: String,
    pub age_in_years: Option<i32>,
    pub estimated_replacement_cost: Option<Decimal>,
    pub forecasted_replacement_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttentionStatus {
    Overdue,
    ComingDue,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ManagementItem {
    pub id: Uuid,
    pub name: String,
    pub status: AttentionStatus,
    pub property_id: Uuid,
    pub property_address: String,
    pub forecasted_replacement_date: NaiveDate,
    pub days_difference: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentSummary {
    pub id: Uuid,
    pub name: String,
    pub age: Option<i32>,
    pub forecasted_replacement_date: NaiveDate,
    pub cost: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NeedsAttentionResponse {
    pub properties: Vec<PropertyAddress>,
    pub management_items: Vec<ManagementItem>,
    pub components: Vec<ComponentSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> CreatePropertyPayload {
        serde_json::from_value(value).unwrap()
    }

    fn base() -> serde_json::Value {
        json!({
            "street": "123 Main St",
            "city": "Springfield",
            "state": "IL",
            "zip": "62701",
            "homeAge": 30
        })
    }

    fn with(mut value: serde_json::Value, key: &str, extra: serde_json::Value) -> serde_json::Value {
        value[key] = extra;
        value
    }

    #[test]
    fn detailed_appliance_and_composed_address() {
        let request = with(base(), "appliances", json!({"stove": {"age": 5, "brand": "GE"}}));
        let property = payload(request).into_new_property().unwrap();

        assert_eq!(property.home_address, "123 Main St, Springfield, IL");
        let stove = &property.appliances[&ApplianceType::Stove];
        assert_eq!(stove.age, Some(5));
        assert_eq!(stove.brand.as_deref(), Some("GE"));
        assert_eq!(stove.model, None);
    }

    #[test]
    fn legacy_flat_ages_and_aliases() {
        let request = with(
            with(base(), "appliances", json!({"a/c unit": 4, "washer": 2})),
            "structures",
            json!({"water heater": 7, "roof": 12}),
        );
        let property = payload(request).into_new_property().unwrap();

        assert_eq!(property.appliances[&ApplianceType::AcUnit].age, Some(4));
        assert_eq!(property.structures[&StructureType::WaterHeater], 7);
        assert_eq!(property.structures[&StructureType::Roof], 12);
    }

    #[test]
    fn negative_and_zero_ages_are_accepted() {
        let mut request = with(base(), "appliances", json!({"stove": -1, "washer": {"age": 0, "brand": "LG"}}));
        request["homeAge"] = json!(-1);
        request["structures"] = json!({"roof": -3});
        let property = payload(request).into_new_property().unwrap();

        assert_eq!(property.age_in_years, Some(-1));
        assert_eq!(property.appliances[&ApplianceType::Stove].age, Some(-1));
        assert_eq!(property.appliances[&ApplianceType::Washer].age, Some(0));
        assert_eq!(property.structures[&StructureType::Roof], -3);
    }

    #[test]
    fn missing_required_fields_are_rejected_together() {
        let errors = payload(json!({"street": "1 Elm"})).into_new_property().unwrap_err();
        let fields = errors.field_errors();
        for field in ["city", "state", "zip", "home_age"] {
            assert!(fields.contains_key(field), "missing error for {field}");
        }
    }

    #[test]
    fn unknown_component_keys_are_rejected() {
        let request = with(
            with(base(), "appliances", json!({"toaster": 1})),
            "structures",
            json!({"pool": 3}),
        );
        let errors = payload(request).into_new_property().unwrap_err();
        assert!(errors.field_errors().contains_key("appliances"));
        assert!(errors.field_errors().contains_key("structures"));
    }

    #[test]
    fn blank_or_long_brand_is_rejected() {
        let long = "x".repeat(101);
        let request = with(
            base(),
            "appliances",
            json!({"stove": {"age": 5, "brand": "  "}, "dryer": {"age": 1, "model": long}}),
        );
        let errors = payload(request).into_new_property().unwrap_err();
        assert_eq!(errors.field_errors()["appliances"].len(), 2);
    }

    #[test]
    fn multifamily_with_units_succeeds_and_preserves_order() {
        let mut request = with(
            base(),
            "units",
            json!([
                {"unitNumber": "2B", "appliances": {"stove": 3}},
                {"unitNumber": "1A", "appliances": {"washer": {"age": 1, "brand": "LG"}}}
            ]),
        );
        request["isMultifamily"] = json!(true);
        let property = payload(request).into_new_property().unwrap();

        assert!(property.is_multifamily);
        let numbers: Vec<_> = property.units.iter().map(|u| u.unit_number.as_str()).collect();
        assert_eq!(numbers, ["2B", "1A"]);
        assert!(property.appliances.is_empty());
    }

    #[test]
    fn multifamily_without_units_fails() {
        let mut request = base();
        request["isMultifamily"] = json!(true);
        assert!(payload(request.clone()).into_new_property().is_err());

        request["units"] = json!([]);
        assert!(payload(request).into_new_property().is_err());
    }

    #[test]
    fn multifamily_with_property_level_appliances_fails() {
        let mut request = with(base(), "units", json!([{"unitNumber": "1"}]));
        request["isMultifamily"] = json!(true);
        request["appliances"] = json!({"stove": 1});
        let errors = payload(request).into_new_property().unwrap_err();
        assert!(errors.field_errors().contains_key("appliances"));
    }

    #[test]
    fn single_family_with_units_fails() {
        let request = with(base(), "units", json!([{"unitNumber": "1"}]));
        let errors = payload(request).into_new_property().unwrap_err();
        assert!(errors.field_errors().contains_key("units"));
    }

    #[test]
    fn duplicate_unit_numbers_fail() {
        let mut request = with(base(), "units", json!([{"unitNumber": "1"}, {"unitNumber": " 1 "}]));
        request["isMultifamily"] = json!(true);
        let errors = payload(request).into_new_property().unwrap_err();
        assert!(errors.field_errors().contains_key("units"));
    }

    #[test]
    fn unit_appliance_view_marks_missing_forecast() {
        let appliance = Appliance {
            id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            unit_id: Some(Uuid::new_v4()),
            appliance_type: ApplianceType::Dryer,
            appliance_brand: None,
            appliance_model: None,
            age_in_years: Some(3),
            estimated_replacement_cost: None,
            forecasted_replacement_date: None,
            created_at: Utc::now(),
        };
        assert_eq!(UnitApplianceView::from(appliance.clone()).forecasted_replacement_date, "TBD");

        let dated = Appliance {
            forecasted_replacement_date: NaiveDate::from_ymd_opt(2030, 1, 2)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            ..appliance
        };
        assert_eq!(
            UnitApplianceView::from(dated).forecasted_replacement_date,
            "2030-01-02 00:00:00"
        );
    }

    #[test]
    fn reference_keys_are_uppercased() {
        assert_eq!(ApplianceType::AcUnit.reference_key(), "AC_UNIT");
        assert_eq!(ApplianceType::WaterHeater.reference_key(), "WATER_HEATER");
    }
}
