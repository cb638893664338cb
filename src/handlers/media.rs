// src/handlers/media.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, extract::ApiJson},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::media::{
        ImageDownloadResponse, ImageUploadPayload, ImageUploadResponse, NoteFilter, NoteUploadPayload,
        NoteUploadResponse, NoteView,
    },
};

#[utoipa::path(
    post,
    path = "/v1/properties/{id}/images",
    tag = "Media",
    params(("id" = Uuid, Path, description = "Property id")),
    request_body = ImageUploadPayload,
    responses((status = 200, description = "Presigned upload url", body = ImageUploadResponse)),
    security(("api_jwt" = []))
)]
pub async fn create_image_upload(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ImageUploadPayload>,
) -> Result<Json<ImageUploadResponse>, AppError> {
    payload.validate()?;
    let file_name = payload.file_name.unwrap_or_default();
    let response = app_state.media_service.create_image_upload(user.id, id, file_name.trim()).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/v1/properties/{id}/images",
    tag = "Media",
    params(("id" = Uuid, Path, description = "Property id")),
    responses(
        (status = 200, description = "Presigned download url for the newest image", body = ImageDownloadResponse),
        (status = 404, description = "No image stored")
    ),
    security(("api_jwt" = []))
)]
pub async fn latest_image(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ImageDownloadResponse>, AppError> {
    Ok(Json(app_state.media_service.latest_image(user.id, id).await?))
}

#[utoipa::path(
    post,
    path = "/v1/properties/{id}/notes",
    tag = "Media",
    params(("id" = Uuid, Path, description = "Property id")),
    request_body = NoteUploadPayload,
    responses((status = 200, description = "Presigned upload url", body = NoteUploadResponse)),
    security(("api_jwt" = []))
)]
pub async fn create_note_upload(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<NoteUploadPayload>,
) -> Result<Json<NoteUploadResponse>, AppError> {
    payload.validate()?;
    let file_name = payload.file_name.unwrap_or_default();
    let response = app_state
        .media_service
        .create_note_upload(user.id, id, file_name.trim(), payload.entity_type.as_deref(), payload.entity_id)
        .await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/v1/properties/{id}/notes",
    tag = "Media",
    params(("id" = Uuid, Path, description = "Property id"), NoteFilter),
    responses((status = 200, description = "Notes, newest first, with their content", body = Vec<NoteView>)),
    security(("api_jwt" = []))
)]
pub async fn list_notes(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(filter): Query<NoteFilter>,
) -> Result<Json<Vec<NoteView>>, AppError> {
    Ok(Json(app_state.media_service.list_notes(user.id, id, &filter).await?))
}
