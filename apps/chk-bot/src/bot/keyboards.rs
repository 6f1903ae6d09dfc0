use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use chk_shared::plans::{PlanType, PLANS};

/// Plan catalog, two buttons per row, days plans first.
pub fn plans_keyboard() -> InlineKeyboardMarkup {
    let mut grid = Vec::new();
    let mut row = Vec::new();

    let ordered = PLANS
        .iter()
        .filter(|p| p.plan_type == PlanType::Days)
        .chain(PLANS.iter().filter(|p| p.plan_type == PlanType::Credits));

    for plan in ordered {
        row.push(InlineKeyboardButton::callback(
            format!("{} — {}", plan.name, plan.price_display()),
            format!("buy_{}", plan.code),
        ));
        if row.len() == 2 {
            grid.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        grid.push(row);
    }

    InlineKeyboardMarkup::new(grid)
}

pub fn accept_order_keyboard(order_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "✅ Atender venta",
        format!("accept_purchase_{}", order_id),
    )]])
}

pub fn review_proof_keyboard(order_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Aprobar", format!("approve_payment_{}", order_id)),
        InlineKeyboardButton::callback("❌ Rechazar", format!("reject_payment_{}", order_id)),
    ]])
}

pub fn confirm_keyboard(order_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Sí, lo recibí", format!("confirm_received_{}", order_id)),
        InlineKeyboardButton::callback(
            "❌ No lo recibí",
            format!("confirm_not_received_{}", order_id),
        ),
    ]])
}
