// src/handlers/scraping.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, extract::ApiJson},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::scraping::{FetchHousesPayload, JobAccepted, JobKind, ScrapeJob},
};

#[utoipa::path(
    put,
    path = "/v1/appliances/update-prices",
    tag = "Scraping",
    responses(
        (status = 202, description = "Price scrape queued", body = JobAccepted),
        (status = 408, description = "The scraping queue is full")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_prices(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<(StatusCode, Json<JobAccepted>), AppError> {
    let accepted = app_state
        .scraping_service
        .enqueue(user.id, JobKind::UpdateAppliancePrices)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

#[utoipa::path(
    post,
    path = "/v1/fetch_houses",
    tag = "Scraping",
    request_body = FetchHousesPayload,
    responses(
        (status = 202, description = "Housing lookup queued", body = JobAccepted),
        (status = 400, description = "The postal code is not all digits")
    ),
    security(("api_jwt" = []))
)]
pub async fn fetch_houses(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<FetchHousesPayload>,
) -> Result<(StatusCode, Json<JobAccepted>), AppError> {
    payload.validate()?;

    let postal_code = payload.postal_code.unwrap_or_default();
    let accepted = app_state
        .scraping_service
        .enqueue(user.id, JobKind::FetchHousingData { postal_code })
        .await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

#[utoipa::path(
    get,
    path = "/v1/jobs/{job_id}",
    tag = "Scraping",
    params(("job_id" = Uuid, Path, description = "Job id returned on submission")),
    responses(
        (status = 200, description = "Job status and result", body = ScrapeJob),
        (status = 404, description = "Unknown job, or another user's")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_job(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ScrapeJob>, AppError> {
    let job = app_state
        .scraping_service
        .job(user.id, job_id)
        .await
        .ok_or(AppError::NotFound("job"))?;
    Ok(Json(job))
}
