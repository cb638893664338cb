// src/services/property_service.rs

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ApplianceRepository, PriceRepository, PropertyRepository, StructureRepository, UnitRepository},
    models::property::{
        Appliance, ApplianceInsert, ApplianceSpec, ApplianceType, AttentionRow, AttentionStatus,
        ComponentAges, ComponentSummary, ManagementItem, NeedsAttentionResponse, NewProperty,
        PropertyAddress, PropertyCreationResponse, PropertyRetrieval, RetrievalType, Structure,
        StructureInsert, StructureType, Unit, UnitApplianceView,
    },
};

/// Rows written for one property, in insertion order.
#[derive(Debug, Default)]
pub struct InsertedProperty {
    pub property_id: Uuid,
    pub units: Vec<Unit>,
    pub appliances: Vec<Appliance>,
    pub structures: Vec<Structure>,
}

// ---
// Row formatting
// ---

/// Appliance rows for one property (or one of its units), costed from the reference table.
pub fn format_appliances_for_insertion(
    property_id: Uuid,
    unit_id: Option<Uuid>,
    appliances: &BTreeMap<ApplianceType, ApplianceSpec>,
    reference_prices: &HashMap<String, Decimal>,
) -> Vec<ApplianceInsert> {
    appliances
        .iter()
        .map(|(appliance_type, spec)| ApplianceInsert {
            property_id,
            unit_id,
            appliance_type: *appliance_type,
            brand: spec.brand.clone(),
            model: spec.model.clone(),
            age_in_years: spec.age,
            estimated_replacement_cost: reference_prices.get(&appliance_type.reference_key()).copied(),
        })
        .collect()
}

pub fn format_structures_for_insertion(
    property_id: Uuid,
    structures: &BTreeMap<StructureType, i32>,
) -> Vec<StructureInsert> {
    structures
        .iter()
        .map(|(structure_type, age)| StructureInsert {
            property_id,
            structure_type: *structure_type,
            age_in_years: *age,
        })
        .collect()
}

/// `{property_id: [{type: age}, ...]}`
pub fn appliance_ages(appliances: &[Appliance]) -> ComponentAges {
    let mut ages = ComponentAges::new();
    for appliance in appliances {
        ages.entry(appliance.property_id)
            .or_default()
            .push(BTreeMap::from([(appliance.appliance_type.as_str().to_string(), appliance.age_in_years)]));
    }
    ages
}

pub fn structure_ages(structures: &[Structure]) -> ComponentAges {
    let mut ages = ComponentAges::new();
    for structure in structures {
        ages.entry(structure.property_id)
            .or_default()
            .push(BTreeMap::from([(structure.structure_type.as_str().to_string(), Some(structure.age_in_years))]));
    }
    ages
}

/// Splits forecasted components into overdue / coming due relative to `today`.
pub fn classify_attention(rows: Vec<AttentionRow>, today: NaiveDate) -> NeedsAttentionResponse {
    let mut seen_addresses = HashSet::new();
    let mut properties = Vec::new();
    let mut management_items = Vec::with_capacity(rows.len());
    let mut components = Vec::with_capacity(rows.len());

    for row in rows {
        if seen_addresses.insert(row.property_address.clone()) {
            properties.push(PropertyAddress { id: row.property_id, address: row.property_address.clone() });
        }

        let days_difference = (today - row.forecasted_replacement_date).num_days();
        let status = if days_difference >= 0 { AttentionStatus::Overdue } else { AttentionStatus::ComingDue };

        management_items.push(ManagementItem {
            id: row.id,
            name: row.name.clone(),
            status,
            property_id: row.property_id,
            property_address: row.property_address,
            forecasted_replacement_date: row.forecasted_replacement_date,
            days_difference,
        });
        components.push(ComponentSummary {
            id: row.id,
            name: row.name,
            age: row.age_in_years,
            forecasted_replacement_date: row.forecasted_replacement_date,
            cost: row.estimated_replacement_cost,
        });
    }

    NeedsAttentionResponse { properties, management_items, components }
}

// ---
// Service
// ---

#[derive(Clone)]
pub struct PropertyService {
    pool: PgPool,
    property_repo: PropertyRepository,
    unit_repo: UnitRepository,
    appliance_repo: ApplianceRepository,
    structure_repo: StructureRepository,
    price_repo: PriceRepository,
}

impl PropertyService {
    pub fn new(
        pool: PgPool,
        property_repo: PropertyRepository,
        unit_repo: UnitRepository,
        appliance_repo: ApplianceRepository,
        structure_repo: StructureRepository,
        price_repo: PriceRepository,
    ) -> Self {
        Self { pool, property_repo, unit_repo, appliance_repo, structure_repo, price_repo }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn reference_prices(&self, conn: &mut PgConnection) -> Result<HashMap<String, Decimal>, AppError> {
        self.price_repo.reference_prices(conn).await
    }

    /// Property -> units -> appliances -> structures on an open connection.
    /// The caller owns the transaction.
    pub async fn insert_property_graph(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        property: &NewProperty,
        reference_prices: &HashMap<String, Decimal>,
    ) -> Result<InsertedProperty, AppError> {
        let row = self.property_repo.insert(&mut *conn, user_id, property).await?;

        let mut appliance_rows =
            format_appliances_for_insertion(row.id, None, &property.appliances, reference_prices);

        let mut units = Vec::with_capacity(property.units.len());
        for unit in &property.units {
            let created = self.unit_repo.insert(&mut *conn, row.id, &unit.unit_number).await?;
            appliance_rows.extend(format_appliances_for_insertion(
                row.id,
                Some(created.id),
                &unit.appliances,
                reference_prices,
            ));
            units.push(created);
        }

        let appliances = self.appliance_repo.insert_many(&mut *conn, &appliance_rows).await?;

        let structure_rows = format_structures_for_insertion(row.id, &property.structures);
        let structures = self.structure_repo.insert_many(&mut *conn, &structure_rows).await?;

        Ok(InsertedProperty { property_id: row.id, units, appliances, structures })
    }

    pub async fn create_property(
        &self,
        user_id: Uuid,
        property: NewProperty,
    ) -> Result<PropertyCreationResponse, AppError> {
        let mut tx = self.pool.begin().await?;
        let prices = self.reference_prices(&mut *tx).await?;
        let inserted = self.insert_property_graph(&mut *tx, user_id, &property, &prices).await?;
        tx.commit().await?;

        tracing::info!(
            property_id = %inserted.property_id,
            units = inserted.units.len(),
            appliances = inserted.appliances.len(),
            structures = inserted.structures.len(),
            "Property created"
        );

        Ok(PropertyCreationResponse {
            property_record_status: 201,
            units_record_status: 201,
            appliance_record_status: 201,
            appliance_structures_status: 201,
            property_id: inserted.property_id,
            appliances_table_response: appliance_ages(&inserted.appliances),
            structures_table_response: structure_ages(&inserted.structures),
        })
    }

    /// `property_id` is required for every retrieval type except ALL and ADDRESSES.
    pub async fn retrieve(
        &self,
        user_id: Uuid,
        retrieval_type: RetrievalType,
        property_id: Option<Uuid>,
    ) -> Result<PropertyRetrieval, AppError> {
        match retrieval_type {
            RetrievalType::All => Ok(PropertyRetrieval::Properties(self.property_repo.list_by_user(user_id).await?)),
            RetrievalType::Addresses => Ok(PropertyRetrieval::Addresses(self.property_repo.list_addresses(user_id).await?)),
            RetrievalType::Single | RetrievalType::Appliances | RetrievalType::Structures => {
                let property_id = property_id
                    .ok_or_else(|| AppError::InvalidRequest("A property id is required".to_string()))?;
                let property = self
                    .property_repo
                    .find_owned(user_id, property_id)
                    .await?
                    .ok_or(AppError::NotFound("property"))?;

                Ok(match retrieval_type {
                    RetrievalType::Appliances => {
                        PropertyRetrieval::Appliances(self.appliance_repo.list_for_property(property.id).await?)
                    }
                    RetrievalType::Structures => {
                        PropertyRetrieval::Structures(self.structure_repo.list_for_property(property.id).await?)
                    }
                    _ => PropertyRetrieval::Property(Box::new(property)),
                })
            }
        }
    }

    pub async fn units(&self, user_id: Uuid, property_id: Uuid) -> Result<Vec<Unit>, AppError> {
        self.unit_repo.list_owned(user_id, property_id).await
    }

    pub async fn unit_appliances(&self, user_id: Uuid, unit_id: Uuid) -> Result<Vec<UnitApplianceView>, AppError> {
        let appliances = self.appliance_repo.list_for_unit_owned(user_id, unit_id).await?;
        Ok(appliances.into_iter().map(UnitApplianceView::from).collect())
    }

    pub async fn needs_attention(&self, user_id: Uuid) -> Result<NeedsAttentionResponse, AppError> {
        let rows = self.property_repo.forecasted_components(user_id).await?;
        Ok(classify_attention(rows, Utc::now().date_naive()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(age: Option<i32>, brand: Option<&str>) -> ApplianceSpec {
        ApplianceSpec { age, brand: brand.map(str::to_string), model: None }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn appliance_rows_carry_unit_and_reference_cost() {
        let property_id = Uuid::new_v4();
        let unit_id = Uuid::new_v4();
        let appliances = BTreeMap::from([
            (ApplianceType::Stove, spec(Some(5), Some("GE"))),
            (ApplianceType::Washer, spec(None, Some("LG"))),
        ]);
        let prices = HashMap::from([("STOVE".to_string(), Decimal::new(89_999, 2))]);

        let single = format_appliances_for_insertion(property_id, None, &appliances, &prices);
        assert_eq!(single.len(), 2);
        assert!(single.iter().all(|row| row.unit_id.is_none() && row.property_id == property_id));

        let stove = &single[0];
        assert_eq!(stove.appliance_type, ApplianceType::Stove);
        assert_eq!(stove.brand.as_deref(), Some("GE"));
        assert_eq!(stove.model, None);
        assert_eq!(stove.age_in_years, Some(5));
        assert_eq!(stove.estimated_replacement_cost, Some(Decimal::new(89_999, 2)));

        // No reference price, no cost
        assert_eq!(single[1].estimated_replacement_cost, None);

        let scoped = format_appliances_for_insertion(property_id, Some(unit_id), &appliances, &prices);
        assert!(scoped.iter().all(|row| row.unit_id == Some(unit_id)));
    }

    #[test]
    fn structure_rows_never_reference_units() {
        let property_id = Uuid::new_v4();
        let rows = format_structures_for_insertion(
            property_id,
            &BTreeMap::from([(StructureType::Roof, 12), (StructureType::Deck, 4)]),
        );
        assert_eq!(
            rows,
            vec![
                StructureInsert { property_id, structure_type: StructureType::Roof, age_in_years: 12 },
                StructureInsert { property_id, structure_type: StructureType::Deck, age_in_years: 4 },
            ]
        );
    }

    #[test]
    fn attention_splits_on_today_and_dedupes_addresses() {
        let property_id = Uuid::new_v4();
        let row = |name: &str, forecast: NaiveDate| AttentionRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            property_id,
            property_address: "123 Main St, Springfield, IL".to_string(),
            age_in_years: Some(10),
            estimated_replacement_cost: None,
            forecasted_replacement_date: forecast,
        };
        let today = date(2025, 6, 15);

        let response = classify_attention(
            vec![row("stove", date(2025, 6, 15)), row("roof", date(2025, 7, 15)), row("dryer", date(2025, 6, 1))],
            today,
        );

        assert_eq!(response.properties.len(), 1);
        let statuses: Vec<_> = response.management_items.iter().map(|i| (i.status, i.days_difference)).collect();
        assert_eq!(
            statuses,
            vec![(AttentionStatus::Overdue, 0), (AttentionStatus::ComingDue, -30), (AttentionStatus::Overdue, 14)]
        );
        assert_eq!(response.components.len(), 3);
        assert_eq!(response.components[1].name, "roof");
    }

    #[test]
    fn ages_are_grouped_by_property() {
        let property_id = Uuid::new_v4();
        let structure = Structure {
            id: Uuid::new_v4(),
            property_id,
            structure_type: StructureType::WaterHeater,
            age_in_years: 7,
            estimated_replacement_cost: None,
            forecasted_replacement_date: None,
            created_at: Utc::now(),
        };
        let ages = structure_ages(&[structure]);
        assert_eq!(ages[&property_id], vec![BTreeMap::from([("water_heater".to_string(), Some(7))])]);
    }
}
