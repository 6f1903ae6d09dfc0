use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Cumulative totals per commission recipient (seller, dev or owner),
/// keyed by Telegram chat id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Earnings {
    pub recipient_id: i64,
    pub total_sales: i64,
    pub total_amount: i64,
    pub total_commission: i64,
    pub updated_at: DateTime<Utc>,
}

/// Per-month bucket, `month` formatted as `YYYY-MM`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MonthlyEarnings {
    pub recipient_id: i64,
    pub month: String,
    pub sales: i64,
    pub amount: i64,
    pub commission: i64,
}

pub fn month_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn month_key_is_zero_padded() {
        let march = Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap();
        assert_eq!(month_key(march), "2025-03");
        let december = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(month_key(december), "2025-12");
    }
}
