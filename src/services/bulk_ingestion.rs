// src/services/bulk_ingestion.rs

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::{
    common::{error::AppError, validation::validate_brand_or_model},
    models::property::{
        compose_address, ApplianceSpec, ApplianceType, BulkInsertionResponse, NewProperty, NewUnit, StructureType,
    },
    services::property_service::{appliance_ages, structure_ages, PropertyService},
};

const SINGLE_FAMILY_UNIT: &str = "-1";

/// CSV column prefix for each appliance, in file order.
const APPLIANCE_COLUMNS: [(&str, ApplianceType); 7] = [
    ("stove", ApplianceType::Stove),
    ("washer", ApplianceType::Washer),
    ("air_conditioner", ApplianceType::AcUnit),
    ("water_heater", ApplianceType::WaterHeater),
    ("dryer", ApplianceType::Dryer),
    ("dishwasher", ApplianceType::Dishwasher),
    ("refrigerator", ApplianceType::Refrigerator),
];

const STRUCTURE_COLUMNS: [(&str, StructureType); 4] = [
    ("roof_age", StructureType::Roof),
    ("driveway_age", StructureType::Driveway),
    ("furnace_age", StructureType::Furnace),
    ("deck_age", StructureType::Deck),
];

const PROPERTY_COLUMNS: [&str; 6] = ["street", "city", "state", "postal_code", "property_age", "unit_number"];

pub fn required_columns() -> Vec<String> {
    let mut columns: Vec<String> = PROPERTY_COLUMNS.iter().map(|c| c.to_string()).collect();
    for (prefix, _) in APPLIANCE_COLUMNS {
        for suffix in ["brand", "model", "age"] {
            columns.push(format!("{prefix}_{suffix}"));
        }
    }
    columns.extend(STRUCTURE_COLUMNS.iter().map(|(c, _)| c.to_string()));
    columns
}

// Header name -> column index, for named access regardless of column order
struct Columns(HashMap<String, usize>);

impl Columns {
    fn text<'r>(&self, record: &'r csv::StringRecord, name: &str) -> Option<&'r str> {
        self.0
            .get(name)
            .and_then(|i| record.get(*i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn integer(&self, record: &csv::StringRecord, name: &str) -> Option<i32> {
        self.text(record, name).and_then(|v| v.parse().ok())
    }
}

/// Parses an uploaded CSV into one property per row.
///
/// Appliances need a brand to be kept; malformed or blank ages become `None`.
/// Structures are kept only with a parseable age. A `unit_number` other than
/// `-1` (blank counts as `-1`) puts the row's appliances under a unit.
pub fn parse_bulk_csv(bytes: &[u8]) -> Result<Vec<NewProperty>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let columns = Columns(
        headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
            .collect(),
    );

    let missing: Vec<String> = required_columns()
        .into_iter()
        .filter(|c| !columns.0.contains_key(c))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::InvalidBulkCsv(format!(
            "The CSV file is missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut properties = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        // Header is line 1
        let line = index + 2;

        let required = |name: &str| {
            columns
                .text(&record, name)
                .map(str::to_string)
                .ok_or_else(|| AppError::InvalidBulkCsv(format!("Row {line} has no {name}")))
        };
        let street = required("street")?;
        let city = required("city")?;
        let state = required("state")?;
        let postal_code = required("postal_code")?;

        let mut appliances = BTreeMap::new();
        for (prefix, appliance_type) in APPLIANCE_COLUMNS {
            let brand_column = format!("{prefix}_brand");
            let Some(brand) = columns.text(&record, &brand_column) else {
                continue;
            };
            let model_column = format!("{prefix}_model");
            let model = columns.text(&record, &model_column);

            // Same limits as the JSON path; the columns are VARCHAR(100)
            for (column, value) in [(&brand_column, Some(brand)), (&model_column, model)] {
                if let Some(Err(e)) = value.map(validate_brand_or_model) {
                    let reason = e.message.unwrap_or_default();
                    return Err(AppError::InvalidBulkCsv(format!("Row {line} has an invalid {column}: {reason}")));
                }
            }

            appliances.insert(
                appliance_type,
                ApplianceSpec {
                    age: columns.integer(&record, &format!("{prefix}_age")),
                    brand: Some(brand.to_string()),
                    model: model.map(str::to_string),
                },
            );
        }

        let structures: BTreeMap<StructureType, i32> = STRUCTURE_COLUMNS
            .iter()
            .filter_map(|(column, structure_type)| columns.integer(&record, column).map(|age| (*structure_type, age)))
            .collect();

        let unit_number = columns.text(&record, "unit_number").unwrap_or(SINGLE_FAMILY_UNIT);
        let is_multifamily = unit_number != SINGLE_FAMILY_UNIT;
        let (appliances, units) = if is_multifamily {
            (BTreeMap::new(), vec![NewUnit { unit_number: unit_number.to_string(), appliances }])
        } else {
            (appliances, Vec::new())
        };

        properties.push(NewProperty {
            home_address: compose_address(&street, &city, &state),
            street,
            city,
            state,
            postal_code,
            age_in_years: columns.integer(&record, "property_age"),
            is_multifamily,
            appliances,
            structures,
            units,
        });
    }

    if properties.is_empty() {
        return Err(AppError::InvalidBulkCsv("The CSV file has no rows".to_string()));
    }
    Ok(properties)
}

#[derive(Clone)]
pub struct BulkIngestionService {
    property_service: PropertyService,
}

impl BulkIngestionService {
    pub fn new(property_service: PropertyService) -> Self {
        Self { property_service }
    }

    pub async fn ingest(&self, user_id: Uuid, bytes: &[u8]) -> Result<BulkInsertionResponse, AppError> {
        let properties = parse_bulk_csv(bytes)?;

        // All rows or none
        let mut tx = self.property_service.pool().begin().await?;
        let prices = self.property_service.reference_prices(&mut *tx).await?;

        let mut appliances = Vec::new();
        let mut structures = Vec::new();
        for property in &properties {
            let inserted = self
                .property_service
                .insert_property_graph(&mut *tx, user_id, property, &prices)
                .await?;
            appliances.extend(inserted.appliances);
            structures.extend(inserted.structures);
        }
        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            properties = properties.len(),
            appliances = appliances.len(),
            structures = structures.len(),
            "Bulk upload inserted"
        );

        Ok(BulkInsertionResponse {
            insert_record_status: 200,
            properties_inserted: properties.len(),
            property_record_status: 201,
            units_record_status: 201,
            appliance_record_status: 201,
            appliance_structures_status: 201,
            appliances_table_response: appliance_ages(&appliances),
            structures_table_response: structure_ages(&structures),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> String {
        required_columns().join(",")
    }

    // Builds a data row from `column=value` overrides, blank elsewhere
    fn row(values: &[(&str, &str)]) -> String {
        required_columns()
            .iter()
            .map(|column| {
                values
                    .iter()
                    .find(|(name, _)| name == column)
                    .map(|(_, value)| value.to_string())
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    fn address() -> Vec<(&'static str, &'static str)> {
        vec![
            ("street", "123 Main St"),
            ("city", "Springfield"),
            ("state", "IL"),
            ("postal_code", "62701"),
        ]
    }

    fn parse(rows: &[String]) -> Result<Vec<NewProperty>, AppError> {
        let csv = std::iter::once(header()).chain(rows.iter().cloned()).collect::<Vec<_>>().join("\n");
        parse_bulk_csv(csv.as_bytes())
    }

    #[test]
    fn minus_one_unit_is_single_family() {
        let mut values = address();
        values.extend([("unit_number", "-1"), ("stove_brand", "GE"), ("stove_age", "5"), ("property_age", "30")]);
        let properties = parse(&[row(&values)]).unwrap();

        let property = &properties[0];
        assert!(!property.is_multifamily);
        assert!(property.units.is_empty());
        assert_eq!(property.home_address, "123 Main St, Springfield, IL");
        assert_eq!(property.age_in_years, Some(30));
        assert_eq!(property.appliances[&ApplianceType::Stove].age, Some(5));
    }

    #[test]
    fn any_other_unit_number_creates_a_unit_even_zero() {
        let mut values = address();
        values.extend([("unit_number", "0"), ("washer_brand", "LG"), ("washer_age", "2")]);
        let properties = parse(&[row(&values)]).unwrap();

        let property = &properties[0];
        assert!(property.is_multifamily);
        assert!(property.appliances.is_empty());
        assert_eq!(property.units.len(), 1);
        assert_eq!(property.units[0].unit_number, "0");
        assert!(property.units[0].appliances.contains_key(&ApplianceType::Washer));
    }

    #[test]
    fn blank_unit_number_counts_as_single_family() {
        let properties = parse(&[row(&address())]).unwrap();
        assert!(!properties[0].is_multifamily);
    }

    #[test]
    fn appliances_without_brand_are_dropped() {
        let mut values = address();
        values.extend([
            ("unit_number", "-1"),
            ("dryer_age", "4"),
            ("dishwasher_brand", "Bosch"),
            ("air_conditioner_brand", "Carrier"),
            ("air_conditioner_age", "old"),
        ]);
        let appliances = &parse(&[row(&values)]).unwrap()[0].appliances;

        assert!(!appliances.contains_key(&ApplianceType::Dryer));
        let dishwasher = &appliances[&ApplianceType::Dishwasher];
        assert_eq!(dishwasher.brand.as_deref(), Some("Bosch"));
        assert_eq!(dishwasher.model, None);
        assert_eq!(appliances[&ApplianceType::AcUnit].age, None);
    }

    #[test]
    fn overlong_brand_or_model_fails_the_upload() {
        let long = "x".repeat(101);
        let mut values = address();
        values.extend([("stove_brand", long.as_str()), ("stove_age", "3")]);
        match parse(&[row(&values)]) {
            Err(AppError::InvalidBulkCsv(message)) => {
                assert!(message.contains("Row 2"));
                assert!(message.contains("stove_brand"));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let mut values = address();
        values.extend([("washer_brand", "LG"), ("washer_model", long.as_str())]);
        assert!(matches!(parse(&[row(&values)]), Err(AppError::InvalidBulkCsv(m)) if m.contains("washer_model")));

        let exact = "y".repeat(100);
        let mut values = address();
        values.extend([("dryer_brand", exact.as_str())]);
        assert!(parse(&[row(&values)]).is_ok());
    }

    #[test]
    fn structures_need_a_numeric_age() {
        let mut values = address();
        values.extend([("roof_age", "12"), ("driveway_age", ""), ("furnace_age", "n/a"), ("deck_age", " 3 ")]);
        let structures = &parse(&[row(&values)]).unwrap()[0].structures;
        assert_eq!(
            structures,
            &BTreeMap::from([(StructureType::Roof, 12), (StructureType::Deck, 3)])
        );
    }

    #[test]
    fn malformed_property_age_is_none_and_negative_is_kept() {
        let mut first = address();
        first.push(("property_age", "unknown"));
        let mut second = address();
        second.push(("property_age", "-2"));
        let properties = parse(&[row(&first), row(&second)]).unwrap();
        assert_eq!(properties[0].age_in_years, None);
        assert_eq!(properties[1].age_in_years, Some(-2));
    }

    #[test]
    fn missing_columns_are_named() {
        let err = parse_bulk_csv(b"street,city\n1 Elm,Town").unwrap_err();
        match err {
            AppError::InvalidBulkCsv(message) => {
                assert!(message.contains("postal_code"));
                assert!(message.contains("deck_age"));
                assert!(!message.contains("street,"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_and_ragged_files_are_rejected() {
        assert!(matches!(parse(&[]), Err(AppError::InvalidBulkCsv(_))));
        assert!(matches!(parse_bulk_csv(b""), Err(AppError::InvalidBulkCsv(_))));

        let ragged = format!("{}\n1,2,3", header());
        assert!(matches!(parse_bulk_csv(ragged.as_bytes()), Err(AppError::Csv(_))));
    }
}
