use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::order::{NewOrder, OrderStatus, PurchaseOrder};

/// Every status mutation here is a conditional update (`WHERE status = ...
/// RETURNING *`), so concurrent writers race on the database row instead of
/// on a stale read: the first one wins, the rest get `None`.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, order: &NewOrder) -> Result<PurchaseOrder> {
        sqlx::query_as::<_, PurchaseOrder>(
            r#"
            INSERT INTO purchase_orders
                (client_id, client_username, plan_type, plan_code, plan_name,
                 price, currency, duration_days, credits_per_day, credits, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(order.client_id)
        .bind(&order.client_username)
        .bind(&order.plan_type)
        .bind(&order.plan_code)
        .bind(&order.plan_name)
        .bind(order.price)
        .bind(&order.currency)
        .bind(order.duration_days)
        .bind(order.credits_per_day)
        .bind(order.credits)
        .bind(order.expires_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create purchase order")
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>("SELECT * FROM purchase_orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch order by ID")
    }

    pub async fn get_by_client(&self, client_id: i64, limit: i64) -> Result<Vec<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>(
            "SELECT * FROM purchase_orders WHERE client_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(client_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch client orders")
    }

    pub async fn list_by_status(
        &self,
        status: OrderStatus,
        limit: i64,
    ) -> Result<Vec<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>(
            "SELECT * FROM purchase_orders WHERE status = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list orders by status")
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>(
            "SELECT * FROM purchase_orders ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list recent orders")
    }

    /// First staff member to accept wins; a second attempt sees `None`.
    pub async fn accept_if_pending(
        &self,
        id: i64,
        admin_id: i64,
        admin_username: &str,
    ) -> Result<Option<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders
            SET status = 'accepted', admin_id = $2, admin_username = $3,
                accepted_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(admin_id)
        .bind(admin_username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to accept order")
    }

    /// Lazy expiry for orders past their 24h window, applied when a stale
    /// order is touched. Only pending/accepted orders can expire.
    pub async fn expire(&self, id: i64) -> Result<Option<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders
            SET status = 'expired', awaiting_payment_proof = FALSE
            WHERE id = $1 AND status IN ('pending', 'accepted')
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to expire order")
    }

    /// Latest accepted order for a client, used by /capturapago.
    pub async fn latest_accepted_for_client(
        &self,
        client_id: i64,
    ) -> Result<Option<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>(
            r#"
            SELECT * FROM purchase_orders
            WHERE client_id = $1 AND status = 'accepted'
            ORDER BY accepted_at DESC LIMIT 1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch accepted order for client")
    }

    pub async fn set_awaiting_proof(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE purchase_orders SET awaiting_payment_proof = TRUE WHERE id = $1 AND status = 'accepted'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to flag order as awaiting payment proof")?;
        Ok(result.rows_affected() > 0)
    }

    /// Order a photo upload from this client should be attached to.
    pub async fn find_awaiting_proof(&self, client_id: i64) -> Result<Option<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>(
            r#"
            SELECT * FROM purchase_orders
            WHERE client_id = $1 AND status = 'accepted' AND awaiting_payment_proof = TRUE
            ORDER BY accepted_at DESC LIMIT 1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up order awaiting payment proof")
    }

    /// Claims the proof slot: a duplicate upload finds the flag already
    /// cleared and gets `None`.
    pub async fn attach_proof(
        &self,
        id: i64,
        proof_url: &str,
        proof_file_name: &str,
    ) -> Result<Option<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders
            SET status = 'payment_sent', awaiting_payment_proof = FALSE,
                proof_url = $2, proof_file_name = $3,
                proof_uploaded_at = CURRENT_TIMESTAMP,
                payment_sent_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'accepted' AND awaiting_payment_proof = TRUE
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(proof_url)
        .bind(proof_file_name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to attach payment proof")
    }

    /// Approval writes the commission split into the order in the same
    /// statement that flips the status, so it is recorded exactly once.
    pub async fn approve_if_payment_sent(
        &self,
        id: i64,
        commission_owner: i64,
        commission_devs: i64,
        commission_seller: i64,
    ) -> Result<Option<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders
            SET status = 'approved', approved_at = CURRENT_TIMESTAMP,
                commission_owner = $2, commission_devs = $3, commission_seller = $4
            WHERE id = $1 AND status = 'payment_sent'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(commission_owner)
        .bind(commission_devs)
        .bind(commission_seller)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to approve order")
    }

    pub async fn reject_if_payment_sent(
        &self,
        id: i64,
        reason: &str,
    ) -> Result<Option<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders
            SET status = 'rejected', rejection_reason = $2, rejected_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'payment_sent'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to reject order")
    }

    pub async fn complete_if_approved(
        &self,
        id: i64,
        auto_completed: bool,
    ) -> Result<Option<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders
            SET status = 'completed', client_confirmed = TRUE,
                auto_completed = $2, completed_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'approved'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(auto_completed)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to complete order")
    }

    pub async fn dispute_if_approved(
        &self,
        id: i64,
        fraud_detected: bool,
        fraud_reason: Option<&str>,
    ) -> Result<Option<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders
            SET status = 'disputed', client_confirmed = FALSE,
                fraud_detected = $2, fraud_reason = $3, disputed_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'approved'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(fraud_detected)
        .bind(fraud_reason)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to dispute order")
    }

    /// Approved orders the client has not confirmed or denied yet; the
    /// confirmation sweep runs over these.
    pub async fn approved_unconfirmed(&self) -> Result<Vec<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrder>(
            "SELECT * FROM purchase_orders WHERE status = 'approved' AND client_confirmed IS NULL",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch approved unconfirmed orders")
    }

    pub async fn record_reminder(&self, id: i64, sent: i32, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE purchase_orders SET reminders_sent = $2, last_reminder_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(sent)
        .bind(at)
        .execute(&self.pool)
        .await
        .context("Failed to record confirmation reminder")?;
        Ok(())
    }

    pub async fn count_by_status(&self) -> Result<Vec<(String, i64)>> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM purchase_orders GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to count orders by status")
    }
}
