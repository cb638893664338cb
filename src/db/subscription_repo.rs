// src/db/subscription_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::billing::{Subscription, SubscriptionStatus},
};

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, status, stripe_subscription_id, period_start, period_end, created_at, updated_at";

#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            INSERT INTO subscriptions (user_id, status)
            VALUES ($1, $2)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
            .bind(user_id)
            .bind(status)
            .fetch_one(executor)
            .await?;
        Ok(subscription)
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1"
        ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(subscription)
    }

    /// Checkout completed: the row becomes active and learns the processor id.
    pub async fn activate<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        stripe_subscription_id: Option<&str>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'active',
                stripe_subscription_id = COALESCE($2, stripe_subscription_id),
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
            .bind(user_id)
            .bind(stripe_subscription_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn sync_from_processor<'e, E>(
        &self,
        executor: E,
        stripe_subscription_id: &str,
        status: SubscriptionStatus,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $2,
                period_start = COALESCE($3, period_start),
                period_end = COALESCE($4, period_end),
                updated_at = NOW()
            WHERE stripe_subscription_id = $1
            "#,
        )
            .bind(stripe_subscription_id)
            .bind(status)
            .bind(period_start)
            .bind(period_end)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = $2, updated_at = NOW() WHERE user_id = $1",
        )
            .bind(user_id)
            .bind(status)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
