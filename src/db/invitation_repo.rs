// src/db/invitation_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::billing::Invitation};

// Invitations are only read inside signup transactions, so no pool is held.
#[derive(Clone, Default)]
pub struct InvitationRepository;

impl InvitationRepository {
    pub fn new() -> Self {
        Self
    }

    // Locks the row so two signups cannot redeem the same invitation
    pub async fn find_for_redemption<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Invitation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, company_id, email, status, expires_at, created_at
            FROM invitations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(invitation)
    }

    pub async fn mark_accepted<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE invitations SET status = 'accepted' WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
