use serde::{Deserialize, Serialize};

/// Purchasable plan catalog. Prices are in centavos (MXN).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Days,
    Credits,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Days => "days",
            PlanType::Credits => "credits",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSpec {
    pub code: &'static str,
    pub name: &'static str,
    pub plan_type: PlanType,
    /// Price in centavos.
    pub price: i64,
    pub currency: &'static str,
    /// Days plans only.
    pub duration_days: Option<i64>,
    pub credits_per_day: Option<i64>,
    /// Credit plans only.
    pub credits: Option<i64>,
}

impl PlanSpec {
    pub fn price_display(&self) -> String {
        format!("${} {}", self.price / 100, self.currency)
    }
}

pub const PLANS: &[PlanSpec] = &[
    PlanSpec {
        code: "one_day",
        name: "1 Día",
        plan_type: PlanType::Days,
        price: 3_000,
        currency: "MXN",
        duration_days: Some(1),
        credits_per_day: Some(10),
        credits: None,
    },
    PlanSpec {
        code: "weekly",
        name: "Semanal",
        plan_type: PlanType::Days,
        price: 15_000,
        currency: "MXN",
        duration_days: Some(7),
        credits_per_day: Some(15),
        credits: None,
    },
    PlanSpec {
        code: "biweekly",
        name: "Quincenal",
        plan_type: PlanType::Days,
        price: 25_000,
        currency: "MXN",
        duration_days: Some(15),
        credits_per_day: Some(20),
        credits: None,
    },
    PlanSpec {
        code: "monthly",
        name: "Mensual",
        plan_type: PlanType::Days,
        price: 40_000,
        currency: "MXN",
        duration_days: Some(30),
        credits_per_day: Some(25),
        credits: None,
    },
    PlanSpec {
        code: "pack_100",
        name: "Paquete 100",
        plan_type: PlanType::Credits,
        price: 5_000,
        currency: "MXN",
        duration_days: None,
        credits_per_day: None,
        credits: Some(100),
    },
    PlanSpec {
        code: "pack_200",
        name: "Paquete 200",
        plan_type: PlanType::Credits,
        price: 9_000,
        currency: "MXN",
        duration_days: None,
        credits_per_day: None,
        credits: Some(200),
    },
    PlanSpec {
        code: "pack_500",
        name: "Paquete 500",
        plan_type: PlanType::Credits,
        price: 20_000,
        currency: "MXN",
        duration_days: None,
        credits_per_day: None,
        credits: Some(500),
    },
    PlanSpec {
        code: "pack_1000",
        name: "Paquete 1000",
        plan_type: PlanType::Credits,
        price: 35_000,
        currency: "MXN",
        duration_days: None,
        credits_per_day: None,
        credits: Some(1000),
    },
];

pub fn find(code: &str) -> Option<&'static PlanSpec> {
    PLANS.iter().find(|p| p.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_by_code() {
        let plan = find("weekly").expect("weekly plan exists");
        assert_eq!(plan.plan_type, PlanType::Days);
        assert_eq!(plan.price, 15_000);
        assert_eq!(plan.duration_days, Some(7));

        let pack = find("pack_500").expect("pack_500 exists");
        assert_eq!(pack.plan_type, PlanType::Credits);
        assert_eq!(pack.credits, Some(500));

        assert!(find("nonexistent").is_none());
    }

    #[test]
    fn every_plan_has_matching_fields() {
        for plan in PLANS {
            match plan.plan_type {
                PlanType::Days => {
                    assert!(plan.duration_days.is_some(), "{} missing duration", plan.code);
                    assert!(plan.credits.is_none());
                }
                PlanType::Credits => {
                    assert!(plan.credits.is_some(), "{} missing credits", plan.code);
                    assert!(plan.duration_days.is_none());
                }
            }
            assert!(plan.price > 0);
        }
    }
}
