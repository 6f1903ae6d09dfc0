use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Singleton payment-details row shown to clients once their order is
/// accepted. Edited by the owner via /banca.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BankConfig {
    pub id: i32,
    pub bank: String,
    pub account: String,
    pub clabe: String,
    pub holder: String,
    pub updated_at: DateTime<Utc>,
}
