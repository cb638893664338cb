// src/models/media.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::{validate_file_name, validate_not_blank};

#[derive(Debug, Clone, FromRow)]
pub struct PropertyImage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub property_id: Uuid,
    pub image_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PropertyNote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub property_id: Uuid,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub note_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn image_key(user_id: Uuid, property_id: Uuid, file_name: &str) -> String {
    format!("users/{user_id}/properties/{property_id}/{file_name}")
}

pub fn note_key(user_id: Uuid, property_id: Uuid, file_name: &str) -> String {
    format!("users/{user_id}/properties/{property_id}/notes/{file_name}")
}

// ---
// Images
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadPayload {
    #[validate(
        required(message = "The fileName field is required."),
        custom(function = "validate_file_name")
    )]
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub image_url: String,
    pub image_key: String,
    pub put_record_status: u16,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImageDownloadResponse {
    #[serde(rename = "signedURL")]
    pub signed_url: String,
}

// ---
// Notes
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteUploadPayload {
    #[validate(
        required(message = "The fileName field is required."),
        custom(function = "validate_file_name")
    )]
    pub file_name: Option<String>,

    #[validate(custom(function = "validate_not_blank"))]
    pub entity_type: Option<String>,

    pub entity_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteUploadResponse {
    pub note_url: String,
    pub note_key: String,
    pub put_record_status: u16,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct NoteFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: Uuid,
    pub note_key: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    /// `None` when the stored object is gone.
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteView {
    pub fn new(note: PropertyNote, content: Option<String>) -> Self {
        Self {
            id: note.id,
            note_key: note.note_key,
            entity_type: note.entity_type,
            entity_id: note.entity_id,
            content,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_scoped_to_user_and_property() {
        let user = Uuid::nil();
        let property = Uuid::from_u128(7);
        assert_eq!(
            image_key(user, property, "front.jpg"),
            format!("users/{user}/properties/{property}/front.jpg")
        );
        assert!(note_key(user, property, "a.txt").ends_with("/notes/a.txt"));
    }

    #[test]
    fn traversal_file_names_are_rejected() {
        let payload: NoteUploadPayload =
            serde_json::from_value(json!({"fileName": "../../etc/passwd"})).unwrap();
        assert!(payload.validate().is_err());

        let payload: ImageUploadPayload = serde_json::from_value(json!({})).unwrap();
        assert!(payload.validate().is_err());
    }
}
