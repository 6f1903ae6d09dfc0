use chrono::{DateTime, Utc};

use chk_db::models::order::PurchaseOrder;
use chk_db::models::user::User;
use chk_shared::plans::PlanType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FraudVerdict {
    /// The claimed-missing grant is demonstrably active on the account.
    Fraud,
    /// The account state backs up the complaint.
    Legitimate,
}

/// Cross-checks a "not received" claim against the client's actual account
/// state.
///
/// Days plans: active iff the stored expiry is in the future AND the
/// current plan code matches the ordered one. Credit plans: active iff the
/// balance still covers the ordered amount - a weak signal, since it cannot
/// tell "never granted" from "granted then spent".
pub fn classify(order: &PurchaseOrder, user: &User, now: DateTime<Utc>) -> FraudVerdict {
    let active = match order.plan_type.as_str() {
        t if t == PlanType::Days.as_str() => {
            let expiry_in_future = user.plan_expires_at.map(|exp| exp > now).unwrap_or(false);
            expiry_in_future && user.plan_code == order.plan_code
        }
        t if t == PlanType::Credits.as_str() => match order.credits {
            Some(credits) => user.credits >= credits,
            None => false,
        },
        _ => false,
    };

    if active {
        FraudVerdict::Fraud
    } else {
        FraudVerdict::Legitimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn days_order(plan_code: &str) -> PurchaseOrder {
        let now = Utc::now();
        PurchaseOrder {
            id: 1,
            client_id: 100,
            client_username: "cliente".into(),
            admin_id: Some(200),
            admin_username: Some("vendedor".into()),
            plan_type: "days".into(),
            plan_code: plan_code.into(),
            plan_name: "Semanal".into(),
            price: 15_000,
            currency: "MXN".into(),
            duration_days: Some(7),
            credits_per_day: Some(15),
            credits: None,
            status: "approved".into(),
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
            commission_owner: Some(9_000),
            commission_devs: Some(3_000),
            commission_seller: Some(3_000),
            created_at: now,
            expires_at: now + Duration::hours(24),
            accepted_at: Some(now),
            payment_sent_at: Some(now),
            approved_at: Some(now),
            rejected_at: None,
            completed_at: None,
            disputed_at: None,
        }
    }

    fn credits_order(credits: i64) -> PurchaseOrder {
        let mut order = days_order("pack_100");
        order.plan_type = "credits".into();
        order.plan_code = "pack_100".into();
        order.duration_days = None;
        order.credits_per_day = None;
        order.credits = Some(credits);
        order
    }

    fn user(plan_code: &str, expires_in_hours: i64, credits: i64) -> User {
        let now = Utc::now();
        User {
            id: 1,
            tg_id: 100,
            username: Some("cliente".into()),
            role: "client".into(),
            credits,
            plan_code: plan_code.into(),
            plan_expires_at: Some(now + Duration::hours(expires_in_hours)),
            created_at: now,
            updated_at: now,
            last_active: None,
        }
    }

    #[test]
    fn active_matching_days_plan_is_fraud() {
        let order = days_order("weekly");
        let claimant = user("weekly", 48, 0);
        assert_eq!(classify(&order, &claimant, Utc::now()), FraudVerdict::Fraud);
    }

    #[test]
    fn expired_days_plan_is_legitimate() {
        let order = days_order("weekly");
        let claimant = user("weekly", -2, 0);
        assert_eq!(
            classify(&order, &claimant, Utc::now()),
            FraudVerdict::Legitimate
        );
    }

    #[test]
    fn different_plan_code_is_legitimate_even_if_active() {
        let order = days_order("weekly");
        let claimant = user("monthly", 48, 0);
        assert_eq!(
            classify(&order, &claimant, Utc::now()),
            FraudVerdict::Legitimate
        );
    }

    #[test]
    fn sufficient_credit_balance_is_fraud() {
        let order = credits_order(100);
        let claimant = user("free", -1, 150);
        assert_eq!(classify(&order, &claimant, Utc::now()), FraudVerdict::Fraud);
    }

    #[test]
    fn drained_credit_balance_is_legitimate() {
        let order = credits_order(100);
        let claimant = user("free", -1, 40);
        assert_eq!(
            classify(&order, &claimant, Utc::now()),
            FraudVerdict::Legitimate
        );
    }
}
