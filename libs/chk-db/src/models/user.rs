use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Admin,
    Dev,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
            Role::Dev => "dev",
            Role::Owner => "owner",
        }
    }

    pub fn parse(s: &str) -> Role {
        match s {
            "admin" => Role::Admin,
            "dev" => Role::Dev,
            "owner" => Role::Owner,
            _ => Role::Client,
        }
    }

    /// Staff may accept orders and review payments.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Dev | Role::Owner)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub tg_id: i64,
    pub username: Option<String>,
    pub role: String,
    pub credits: i64,
    pub plan_code: String,
    pub plan_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_active: Option<DateTime<Utc>>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }

    /// Days plan currently active (expiry in the future).
    pub fn has_active_plan(&self) -> bool {
        self.plan_expires_at
            .map(|exp| exp > Utc::now())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_gate_admits_admin_dev_and_owner_only() {
        assert!(Role::parse("admin").is_staff());
        assert!(Role::parse("dev").is_staff());
        assert!(Role::parse("owner").is_staff());
        assert!(!Role::parse("client").is_staff());
        // Unknown roles fall back to client.
        assert!(!Role::parse("superuser").is_staff());
    }
}
