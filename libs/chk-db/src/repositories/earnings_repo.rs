use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::earnings::{Earnings, MonthlyEarnings};

#[derive(Debug, Clone)]
pub struct EarningsRepository {
    pool: PgPool,
}

impl EarningsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies one commission entry to a recipient's ledger: cumulative
    /// totals plus the current month's bucket. `count_sale` is true only
    /// for the seller entry; owner and dev pass-through entries keep their
    /// sale count untouched.
    pub async fn record(
        &self,
        recipient_id: i64,
        month: &str,
        amount: i64,
        commission: i64,
        count_sale: bool,
    ) -> Result<()> {
        let sale = if count_sale { 1i64 } else { 0 };

        sqlx::query(
            r#"
            INSERT INTO earnings (recipient_id, total_sales, total_amount, total_commission, updated_at)
            VALUES ($1, $2, $3, $4, CURRENT_TIMESTAMP)
            ON CONFLICT (recipient_id) DO UPDATE
            SET total_sales = earnings.total_sales + EXCLUDED.total_sales,
                total_amount = earnings.total_amount + EXCLUDED.total_amount,
                total_commission = earnings.total_commission + EXCLUDED.total_commission,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(recipient_id)
        .bind(sale)
        .bind(amount)
        .bind(commission)
        .execute(&self.pool)
        .await
        .context("Failed to update earnings totals")?;

        sqlx::query(
            r#"
            INSERT INTO earnings_monthly (recipient_id, month, sales, amount, commission)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (recipient_id, month) DO UPDATE
            SET sales = earnings_monthly.sales + EXCLUDED.sales,
                amount = earnings_monthly.amount + EXCLUDED.amount,
                commission = earnings_monthly.commission + EXCLUDED.commission
            "#,
        )
        .bind(recipient_id)
        .bind(month)
        .bind(sale)
        .bind(amount)
        .bind(commission)
        .execute(&self.pool)
        .await
        .context("Failed to update monthly earnings")?;

        Ok(())
    }

    pub async fn get(&self, recipient_id: i64) -> Result<Option<Earnings>> {
        sqlx::query_as::<_, Earnings>("SELECT * FROM earnings WHERE recipient_id = $1")
            .bind(recipient_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch earnings")
    }

    pub async fn get_monthly(&self, recipient_id: i64, limit: i64) -> Result<Vec<MonthlyEarnings>> {
        sqlx::query_as::<_, MonthlyEarnings>(
            r#"
            SELECT * FROM earnings_monthly
            WHERE recipient_id = $1
            ORDER BY month DESC LIMIT $2
            "#,
        )
        .bind(recipient_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch monthly earnings")
    }
}
