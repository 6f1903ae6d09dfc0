use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::user::User;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_tg_id(&self, tg_id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE tg_id = $1")
            .bind(tg_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by TG ID")
    }

    /// Links a Telegram account on /start; repeated starts refresh the
    /// username and activity timestamp without touching role or balances.
    pub async fn upsert(&self, tg_id: i64, username: Option<&str>) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (tg_id, username, last_active)
            VALUES ($1, $2, CURRENT_TIMESTAMP)
            ON CONFLICT (tg_id) DO UPDATE
            SET username = COALESCE(EXCLUDED.username, users.username),
                last_active = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *
            "#,
        )
        .bind(tg_id)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert user")
    }

    pub async fn touch_last_active(&self, tg_id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_active = CURRENT_TIMESTAMP WHERE tg_id = $1")
            .bind(tg_id)
            .execute(&self.pool)
            .await
            .context("Failed to update last_active")?;
        Ok(())
    }

    pub async fn get_all(&self, limit: i64) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch users")
    }

    pub async fn get_staff(&self) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE role IN ('admin', 'dev', 'owner')")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch staff users")
    }

    pub async fn add_credits(&self, tg_id: i64, amount: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET credits = credits + $2, updated_at = CURRENT_TIMESTAMP
            WHERE tg_id = $1
            RETURNING *
            "#,
        )
        .bind(tg_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to add credits")
    }

    /// Fraud rollback: credits never go below zero.
    pub async fn subtract_credits_clamped(&self, tg_id: i64, amount: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET credits = GREATEST(0, credits - $2), updated_at = CURRENT_TIMESTAMP
            WHERE tg_id = $1
            "#,
        )
        .bind(tg_id)
        .bind(amount)
        .execute(&self.pool)
        .await
        .context("Failed to subtract credits")?;
        Ok(())
    }

    /// Days-plan grant: an active plan is extended from its current expiry,
    /// an expired or missing one starts from now.
    pub async fn grant_days_plan(&self, tg_id: i64, plan_code: &str, days: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET plan_code = $2,
                plan_expires_at = GREATEST(COALESCE(plan_expires_at, CURRENT_TIMESTAMP), CURRENT_TIMESTAMP)
                                  + ($3 * interval '1 day'),
                updated_at = CURRENT_TIMESTAMP
            WHERE tg_id = $1
            "#,
        )
        .bind(tg_id)
        .bind(plan_code)
        .bind(days)
        .execute(&self.pool)
        .await
        .context("Failed to grant days plan")?;
        Ok(())
    }

    /// Fraud rollback: drop back to the free plan, expiring immediately.
    pub async fn reset_plan(&self, tg_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET plan_code = 'free', plan_expires_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE tg_id = $1
            "#,
        )
        .bind(tg_id)
        .execute(&self.pool)
        .await
        .context("Failed to reset plan")?;
        Ok(())
    }

    pub async fn set_plan(&self, tg_id: i64, plan_code: &str, days: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET plan_code = $2,
                plan_expires_at = CURRENT_TIMESTAMP + ($3 * interval '1 day'),
                updated_at = CURRENT_TIMESTAMP
            WHERE tg_id = $1
            RETURNING *
            "#,
        )
        .bind(tg_id)
        .bind(plan_code)
        .bind(days)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to set plan")
    }

    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")
    }
}
