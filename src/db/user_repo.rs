// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::User};

const USER_COLUMNS: &str = "id, email, hashed_password, stripe_customer_id, is_paid, company_id, \
                            first_name, last_name, created_at, updated_at";

// Everything that touches the 'users' table
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_stripe_customer<'e, E>(
        &self,
        executor: E,
        stripe_customer_id: &str,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE stripe_customer_id = $1"
        ))
            .bind(stripe_customer_id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    // Duplicate emails surface as EmailAlreadyExists
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        email: &str,
        hashed_password: &str,
        stripe_customer_id: Option<&str>,
        is_paid: bool,
        company_id: Option<Uuid>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, hashed_password, stripe_customer_id, is_paid, company_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
            .bind(email)
            .bind(hashed_password)
            .bind(stripe_customer_id)
            .bind(is_paid)
            .bind(company_id)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
                        return AppError::EmailAlreadyExists;
                    }
                }
                e.into()
            })?;

        Ok(user)
    }

    /// Omitted names keep their stored value.
    pub async fn update_names<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(first_name)
            .bind(last_name)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn set_paid<'e, E>(&self, executor: E, id: Uuid, is_paid: bool) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_paid = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
            .bind(id)
            .bind(is_paid)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }
}
