// src/db/media_repo.rs

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::media::{NoteFilter, PropertyImage, PropertyNote},
};

#[derive(Clone)]
pub struct MediaRepository {
    pool: PgPool,
}

impl MediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_image(&self, user_id: Uuid, property_id: Uuid, image_key: &str) -> Result<PropertyImage, AppError> {
        let image = sqlx::query_as::<_, PropertyImage>(
            r#"
            INSERT INTO property_images (user_id, property_id, image_key)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, property_id, image_key, created_at
            "#,
        )
            .bind(user_id)
            .bind(property_id)
            .bind(image_key)
            .fetch_one(&self.pool)
            .await?;
        Ok(image)
    }

    pub async fn latest_image(&self, user_id: Uuid, property_id: Uuid) -> Result<Option<PropertyImage>, AppError> {
        let image = sqlx::query_as::<_, PropertyImage>(
            r#"
            SELECT id, user_id, property_id, image_key, created_at
            FROM property_images
            WHERE user_id = $1 AND property_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
            .bind(user_id)
            .bind(property_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(image)
    }

    pub async fn insert_note(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        note_key: &str,
        entity_type: Option<&str>,
        entity_id: Option<Uuid>,
    ) -> Result<PropertyNote, AppError> {
        let note = sqlx::query_as::<_, PropertyNote>(
            r#"
            INSERT INTO property_notes (user_id, property_id, entity_type, entity_id, note_key)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, property_id, entity_type, entity_id, note_key, created_at, updated_at
            "#,
        )
            .bind(user_id)
            .bind(property_id)
            .bind(entity_type)
            .bind(entity_id)
            .bind(note_key)
            .fetch_one(&self.pool)
            .await?;
        Ok(note)
    }

    // Newest first
    pub async fn list_notes(&self, user_id: Uuid, property_id: Uuid, filter: &NoteFilter) -> Result<Vec<PropertyNote>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, user_id, property_id, entity_type, entity_id, note_key, created_at, updated_at \
             FROM property_notes WHERE user_id = ",
        );
        builder.push_bind(user_id);
        builder.push(" AND property_id = ");
        builder.push_bind(property_id);
        if let Some(entity_type) = &filter.entity_type {
            builder.push(" AND entity_type = ");
            builder.push_bind(entity_type.clone());
        }
        if let Some(entity_id) = filter.entity_id {
            builder.push(" AND entity_id = ");
            builder.push_bind(entity_id);
        }
        builder.push(" ORDER BY created_at DESC");

        let notes = builder.build_query_as::<PropertyNote>().fetch_all(&self.pool).await?;
        Ok(notes)
    }
}
