// src/handlers/properties.rs

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{error::AppError, extract::ApiJson},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        maintenance::{ApplianceUpdatesPayload, ForecastUpdatePayload, PutRecordResponse, StructureUpdatesPayload},
        property::{
            Appliance, BulkInsertionResponse, CreatePropertyPayload, NeedsAttentionResponse, Property,
            PropertyCreationResponse, PropertyListQuery, PropertyRetrieval, RetrievalType, Structure, Unit,
            UnitApplianceView,
        },
    },
};

const BULK_FILE_FIELD: &str = "file";

// ---
// Creation
// ---

#[utoipa::path(
    post,
    path = "/v1/properties",
    tag = "Properties",
    request_body = CreatePropertyPayload,
    responses(
        (status = 201, description = "Property, units, appliances and structures created", body = PropertyCreationResponse),
        (status = 400, description = "Every rule the payload breaks")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_property(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<CreatePropertyPayload>,
) -> Result<(StatusCode, Json<PropertyCreationResponse>), AppError> {
    let property = payload.into_new_property()?;
    let response = app_state.property_service.create_property(user.id, property).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/v1/properties/bulk",
    tag = "Properties",
    request_body(content_type = "multipart/form-data", description = "CSV upload in the `file` field"),
    responses(
        (status = 200, description = "Every row inserted", body = BulkInsertionResponse),
        (status = 400, description = "The CSV is missing columns or has bad rows")
    ),
    security(("api_jwt" = []))
)]
pub async fn bulk_upload(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BulkInsertionResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(BULK_FILE_FIELD) {
            file = Some(field.bytes().await?);
            break;
        }
    }
    let bytes = file.ok_or_else(|| AppError::InvalidBulkCsv("No file was uploaded".to_string()))?;

    let response = app_state.bulk_ingestion_service.ingest(user.id, &bytes).await?;
    Ok(Json(response))
}

// ---
// Retrieval
// ---

#[utoipa::path(
    get,
    path = "/v1/properties",
    tag = "Properties",
    params(PropertyListQuery),
    responses((status = 200, description = "The caller's properties or their addresses", body = Vec<Property>)),
    security(("api_jwt" = []))
)]
pub async fn list_properties(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<PropertyListQuery>,
) -> Result<Json<PropertyRetrieval>, AppError> {
    let retrieval_type = match query.retrieval_type.unwrap_or(RetrievalType::All) {
        kind @ (RetrievalType::All | RetrievalType::Addresses) => kind,
        _ => {
            return Err(AppError::InvalidRequest(
                "retrievalType must be ALL or ADDRESSES".to_string(),
            ))
        }
    };
    let retrieval = app_state.property_service.retrieve(user.id, retrieval_type, None).await?;
    Ok(Json(retrieval))
}

#[utoipa::path(
    get,
    path = "/v1/properties/needs-attention",
    tag = "Properties",
    responses((status = 200, description = "Overdue and coming-due components", body = NeedsAttentionResponse)),
    security(("api_jwt" = []))
)]
pub async fn needs_attention(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<NeedsAttentionResponse>, AppError> {
    Ok(Json(app_state.property_service.needs_attention(user.id).await?))
}

#[utoipa::path(
    get,
    path = "/v1/properties/{id}",
    tag = "Properties",
    params(("id" = Uuid, Path, description = "Property id")),
    responses(
        (status = 200, description = "The property", body = Property),
        (status = 404, description = "Not one of the caller's properties")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_property(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PropertyRetrieval>, AppError> {
    let retrieval = app_state.property_service.retrieve(user.id, RetrievalType::Single, Some(id)).await?;
    Ok(Json(retrieval))
}

#[utoipa::path(
    get,
    path = "/v1/properties/{id}/appliances",
    tag = "Properties",
    params(("id" = Uuid, Path, description = "Property id")),
    responses((status = 200, description = "The property's appliances", body = Vec<Appliance>)),
    security(("api_jwt" = []))
)]
pub async fn get_appliances(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PropertyRetrieval>, AppError> {
    let retrieval = app_state.property_service.retrieve(user.id, RetrievalType::Appliances, Some(id)).await?;
    Ok(Json(retrieval))
}

#[utoipa::path(
    get,
    path = "/v1/properties/{id}/structures",
    tag = "Properties",
    params(("id" = Uuid, Path, description = "Property id")),
    responses((status = 200, description = "The property's structures", body = Vec<Structure>)),
    security(("api_jwt" = []))
)]
pub async fn get_structures(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PropertyRetrieval>, AppError> {
    let retrieval = app_state.property_service.retrieve(user.id, RetrievalType::Structures, Some(id)).await?;
    Ok(Json(retrieval))
}

#[utoipa::path(
    get,
    path = "/v1/properties/{id}/units",
    tag = "Properties",
    params(("id" = Uuid, Path, description = "Property id")),
    responses((status = 200, description = "Units, empty unless the caller owns the property", body = Vec<Unit>)),
    security(("api_jwt" = []))
)]
pub async fn list_units(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Unit>>, AppError> {
    Ok(Json(app_state.property_service.units(user.id, id).await?))
}

#[utoipa::path(
    get,
    path = "/v1/units/{unit_id}/appliances",
    tag = "Properties",
    params(("unit_id" = Uuid, Path, description = "Unit id")),
    responses((status = 200, description = "Appliances of the unit", body = Vec<UnitApplianceView>)),
    security(("api_jwt" = []))
)]
pub async fn unit_appliances(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(unit_id): Path<Uuid>,
) -> Result<Json<Vec<UnitApplianceView>>, AppError> {
    Ok(Json(app_state.property_service.unit_appliances(user.id, unit_id).await?))
}

// ---
// Maintenance updates
// ---

#[utoipa::path(
    put,
    path = "/v1/properties/{id}/appliances",
    tag = "Properties",
    params(("id" = Uuid, Path, description = "Property id")),
    request_body = ApplianceUpdatesPayload,
    responses(
        (status = 200, description = "Appliances updated", body = PutRecordResponse),
        (status = 404, description = "Unknown property or appliance")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_appliances(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ApplianceUpdatesPayload>,
) -> Result<Json<PutRecordResponse>, AppError> {
    let changes = payload.into_changes()?;
    let response = app_state.maintenance_service.update_appliances(user.id, id, changes).await?;
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/v1/properties/{id}/structures",
    tag = "Properties",
    params(("id" = Uuid, Path, description = "Property id")),
    request_body = StructureUpdatesPayload,
    responses(
        (status = 200, description = "Structures updated", body = PutRecordResponse),
        (status = 404, description = "Unknown property or structure")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_structures(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<StructureUpdatesPayload>,
) -> Result<Json<PutRecordResponse>, AppError> {
    let changes = payload.into_changes()?;
    let response = app_state.maintenance_service.update_structures(user.id, id, changes).await?;
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/v1/properties/{id}/forecasted-replacement-date",
    tag = "Properties",
    params(("id" = Uuid, Path, description = "Property id")),
    request_body = ForecastUpdatePayload,
    responses((status = 200, description = "Forecast updated", body = PutRecordResponse)),
    security(("api_jwt" = []))
)]
pub async fn update_forecast(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ForecastUpdatePayload>,
) -> Result<Json<PutRecordResponse>, AppError> {
    let change = payload.into_change()?;
    let response = app_state.maintenance_service.update_forecast(user.id, id, change).await?;
    Ok(Json(response))
}
