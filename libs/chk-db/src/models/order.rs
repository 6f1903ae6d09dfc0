use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Accepted,
    PaymentSent,
    Approved,
    Rejected,
    Expired,
    Completed,
    Disputed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::PaymentSent => "payment_sent",
            OrderStatus::Approved => "approved",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Expired => "expired",
            OrderStatus::Completed => "completed",
            OrderStatus::Disputed => "disputed",
        }
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        Some(match s {
            "pending" => OrderStatus::Pending,
            "accepted" => OrderStatus::Accepted,
            "payment_sent" => OrderStatus::PaymentSent,
            "approved" => OrderStatus::Approved,
            "rejected" => OrderStatus::Rejected,
            "expired" => OrderStatus::Expired,
            "completed" => OrderStatus::Completed,
            "disputed" => OrderStatus::Disputed,
            _ => return None,
        })
    }

    /// Directed edges of the order state machine. Every repository mutation
    /// is a conditional update guarded by one of these edges.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Expired)
                | (Accepted, PaymentSent)
                | (Accepted, Expired)
                | (PaymentSent, Approved)
                | (PaymentSent, Rejected)
                | (Approved, Completed)
                | (Approved, Disputed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        use OrderStatus::*;
        matches!(self, Rejected | Expired | Completed | Disputed)
    }

    pub fn display_es(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "⏳ Pendiente",
            OrderStatus::Accepted => "✅ Aceptada",
            OrderStatus::PaymentSent => "📸 Pago Enviado",
            OrderStatus::Approved => "🎉 Aprobada",
            OrderStatus::Rejected => "❌ Rechazada",
            OrderStatus::Expired => "⏰ Expirada",
            OrderStatus::Completed => "🏁 Completada",
            OrderStatus::Disputed => "⚠️ Disputada",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PurchaseOrder {
    pub id: i64,
    pub client_id: i64,
    pub client_username: String,
    pub admin_id: Option<i64>,
    pub admin_username: Option<String>,

    pub plan_type: String,
    pub plan_code: String,
    pub plan_name: String,
    /// Centavos.
    pub price: i64,
    pub currency: String,
    pub duration_days: Option<i64>,
    pub credits_per_day: Option<i64>,
    pub credits: Option<i64>,

    pub status: String,
    pub awaiting_payment_proof: bool,

    pub proof_url: Option<String>,
    pub proof_file_name: Option<String>,
    pub proof_uploaded_at: Option<DateTime<Utc>>,

    pub rejection_reason: Option<String>,
    pub client_confirmed: Option<bool>,
    pub fraud_detected: bool,
    pub fraud_reason: Option<String>,
    pub auto_completed: bool,

    pub reminders_sent: i32,
    pub last_reminder_at: Option<DateTime<Utc>>,

    pub commission_owner: Option<i64>,
    pub commission_devs: Option<i64>,
    pub commission_seller: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub payment_sent_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub disputed_at: Option<DateTime<Utc>>,
}

impl PurchaseOrder {
    pub fn status(&self) -> OrderStatus {
        OrderStatus::parse(&self.status).unwrap_or(OrderStatus::Pending)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn price_display(&self) -> String {
        format!("${} {}", self.price / 100, self.currency)
    }
}

/// Plan descriptor snapshot stored on a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub client_id: i64,
    pub client_username: String,
    pub plan_type: String,
    pub plan_code: String,
    pub plan_name: String,
    pub price: i64,
    pub currency: String,
    pub duration_days: Option<i64>,
    pub credits_per_day: Option<i64>,
    pub credits: Option<i64>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_edges_are_admitted() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Accepted));
        assert!(Accepted.can_transition_to(PaymentSent));
        assert!(PaymentSent.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Completed));
    }

    #[test]
    fn branch_edges_are_admitted() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Expired));
        assert!(Accepted.can_transition_to(Expired));
        assert!(PaymentSent.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Disputed));
    }

    #[test]
    fn completed_is_only_reachable_from_approved() {
        use OrderStatus::*;
        let all = [
            Pending, Accepted, PaymentSent, Approved, Rejected, Expired, Completed, Disputed,
        ];
        for from in all {
            assert_eq!(
                from.can_transition_to(Completed),
                from == Approved,
                "{from:?} -> Completed"
            );
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        use OrderStatus::*;
        let all = [
            Pending, Accepted, PaymentSent, Approved, Rejected, Expired, Completed, Disputed,
        ];
        for from in all.iter().filter(|s| s.is_terminal()) {
            for to in all {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn status_round_trips_through_text() {
        use OrderStatus::*;
        for s in [
            Pending, Accepted, PaymentSent, Approved, Rejected, Expired, Completed, Disputed,
        ] {
            assert_eq!(OrderStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(OrderStatus::parse("bogus"), None);
    }

    #[test]
    fn plan_snapshot_survives_serialization() {
        let order = PurchaseOrder {
            id: 7,
            client_id: 100,
            client_username: "cliente".into(),
            admin_id: None,
            admin_username: None,
            plan_type: "days".into(),
            plan_code: "weekly".into(),
            plan_name: "Semanal".into(),
            price: 15_000,
            currency: "MXN".into(),
            duration_days: Some(7),
            credits_per_day: Some(15),
            credits: None,
            status: "pending".into(),
            awaiting_payment_proof: false,
            proof_url: None,
            proof_file_name: None,
            proof_uploaded_at: None,
            rejection_reason: None,
            client_confirmed: None,
            fraud_detected: false,
            fraud_reason: None,
            auto_completed: false,
            reminders_sent: 0,
            last_reminder_at: None,
            commission_owner: None,
            commission_devs: None,
            commission_seller: None,
            created_at: Utc::now(),
            expires_at: Utc::now(),
            accepted_at: None,
            payment_sent_at: None,
            approved_at: None,
            rejected_at: None,
            completed_at: None,
            disputed_at: None,
        };
        let json = serde_json::to_string(&order).unwrap();
        let back: PurchaseOrder = serde_json::from_str(&json).unwrap();
        assert_eq!(back.plan_code, "weekly");
        assert_eq!(back.price, 15_000);
        assert_eq!(back.currency, "MXN");
        assert_eq!(back.price_display(), "$150 MXN");
    }
}
