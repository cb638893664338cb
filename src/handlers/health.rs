// src/handlers/health.rs

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: &'static str,
}

#[utoipa::path(
    get,
    path = "/api/healthcheck",
    tag = "Health",
    responses((status = 200, description = "Service is up", body = HealthStatus))
)]
pub async fn healthcheck() -> Json<HealthStatus> {
    Json(HealthStatus { status: "UP" })
}
