// src/handlers/tenants.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{error::AppError, extract::ApiJson},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::tenant::{CreateTenantPayload, TenantUpdateResponse, TenantView, UpdateTenantPayload},
};

#[utoipa::path(
    post,
    path = "/v1/properties/{id}/tenants",
    tag = "Tenants",
    params(("id" = Uuid, Path, description = "Property id")),
    request_body = CreateTenantPayload,
    responses(
        (status = 201, description = "Tenant added; the property's tenants", body = Vec<TenantView>),
        (status = 404, description = "Not one of the caller's properties")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tenant(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<CreateTenantPayload>,
) -> Result<(StatusCode, Json<Vec<TenantView>>), AppError> {
    let tenant = payload.into_new_tenant()?;
    let tenants = app_state.tenant_service.create_tenant(user.id, id, tenant).await?;
    Ok((StatusCode::CREATED, Json(tenants)))
}

#[utoipa::path(
    get,
    path = "/v1/properties/{id}/tenants",
    tag = "Tenants",
    params(("id" = Uuid, Path, description = "Property id")),
    responses((status = 200, description = "The property's tenants", body = Vec<TenantView>)),
    security(("api_jwt" = []))
)]
pub async fn list_tenants(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TenantView>>, AppError> {
    Ok(Json(app_state.tenant_service.list_tenants(user.id, id).await?))
}

#[utoipa::path(
    put,
    path = "/v1/tenants/{tenant_id}",
    tag = "Tenants",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    request_body = UpdateTenantPayload,
    responses(
        (status = 200, description = "Tenant updated", body = TenantUpdateResponse),
        (status = 404, description = "Unknown tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_tenant(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(tenant_id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateTenantPayload>,
) -> Result<Json<TenantUpdateResponse>, AppError> {
    let fields = payload.into_fields()?;
    Ok(Json(app_state.tenant_service.update_tenant(user.id, tenant_id, fields).await?))
}
