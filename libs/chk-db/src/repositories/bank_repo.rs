use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::bank::BankConfig;

#[derive(Debug, Clone)]
pub struct BankRepository {
    pool: PgPool,
}

impl BankRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self) -> Result<Option<BankConfig>> {
        sqlx::query_as::<_, BankConfig>("SELECT * FROM bank_config WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch bank config")
    }

    pub async fn upsert(
        &self,
        bank: &str,
        account: &str,
        clabe: &str,
        holder: &str,
    ) -> Result<BankConfig> {
        sqlx::query_as::<_, BankConfig>(
            r#"
            INSERT INTO bank_config (id, bank, account, clabe, holder)
            VALUES (1, $1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET bank = EXCLUDED.bank, account = EXCLUDED.account,
                clabe = EXCLUDED.clabe, holder = EXCLUDED.holder,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *
            "#,
        )
        .bind(bank)
        .bind(account)
        .bind(clabe)
        .bind(holder)
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert bank config")
    }
}
