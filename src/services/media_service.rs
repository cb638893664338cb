// src/services/media_service.rs

use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{MediaRepository, PropertyRepository},
    integrations::storage::ObjectStorage,
    models::media::{
        image_key, note_key, ImageDownloadResponse, ImageUploadResponse, NoteFilter, NoteUploadResponse, NoteView,
    },
};

const IMAGE_CONTENT_TYPE: &str = "image/jpeg";
const NOTE_CONTENT_TYPE: &str = "text/plain";

#[derive(Clone)]
pub struct MediaService {
    property_repo: PropertyRepository,
    media_repo: MediaRepository,
    storage: Arc<dyn ObjectStorage>,
    presign_ttl: Duration,
}

impl MediaService {
    pub fn new(
        property_repo: PropertyRepository,
        media_repo: MediaRepository,
        storage: Arc<dyn ObjectStorage>,
        presign_ttl: Duration,
    ) -> Self {
        Self { property_repo, media_repo, storage, presign_ttl }
    }

    async fn ensure_owned(&self, user_id: Uuid, property_id: Uuid) -> Result<(), AppError> {
        match self.property_repo.find_owned(user_id, property_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("property")),
        }
    }

    /// Presigns a JPEG upload and records its key as the property's latest image.
    pub async fn create_image_upload(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        file_name: &str,
    ) -> Result<ImageUploadResponse, AppError> {
        self.ensure_owned(user_id, property_id).await?;

        let key = image_key(user_id, property_id, file_name);
        let image_url = self.storage.presign_put(&key, IMAGE_CONTENT_TYPE, self.presign_ttl)?;
        let image = self.media_repo.insert_image(user_id, property_id, &key).await?;

        tracing::info!(image_id = %image.id, property_id = %property_id, "Image upload presigned");
        Ok(ImageUploadResponse { image_url, image_key: image.image_key, put_record_status: 200 })
    }

    pub async fn latest_image(&self, user_id: Uuid, property_id: Uuid) -> Result<ImageDownloadResponse, AppError> {
        let image = self
            .media_repo
            .latest_image(user_id, property_id)
            .await?
            .ok_or(AppError::NotFound("image"))?;
        let signed_url = self.storage.presign_get(&image.image_key, self.presign_ttl)?;
        Ok(ImageDownloadResponse { signed_url })
    }

    pub async fn create_note_upload(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        file_name: &str,
        entity_type: Option<&str>,
        entity_id: Option<Uuid>,
    ) -> Result<NoteUploadResponse, AppError> {
        self.ensure_owned(user_id, property_id).await?;

        let key = note_key(user_id, property_id, file_name);
        let note_url = self.storage.presign_put(&key, NOTE_CONTENT_TYPE, self.presign_ttl)?;
        let note = self
            .media_repo
            .insert_note(user_id, property_id, &key, entity_type.map(str::trim), entity_id)
            .await?;

        tracing::info!(note_id = %note.id, property_id = %property_id, "Note upload presigned");
        Ok(NoteUploadResponse { note_url, note_key: note.note_key, put_record_status: 200 })
    }

    /// Notes newest first, each with its stored body.
    pub async fn list_notes(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        filter: &NoteFilter,
    ) -> Result<Vec<NoteView>, AppError> {
        self.ensure_owned(user_id, property_id).await?;

        let notes = self.media_repo.list_notes(user_id, property_id, filter).await?;
        let mut views = Vec::with_capacity(notes.len());
        for note in notes {
            let content = self.storage.read_text(&note.note_key).await?;
            if content.is_none() {
                tracing::warn!(note_id = %note.id, key = %note.note_key, "Note object is missing");
            }
            views.push(NoteView::new(note, content));
        }
        Ok(views)
    }
}
