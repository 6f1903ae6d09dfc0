use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, ParseMode};
use tracing::{info, warn};

use chk_db::models::user::User;

use crate::bot::handlers::service_error_text;
use crate::bot::utils::escape_html;
use crate::AppState;

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    info!("Received callback: {:?}", q.data);
    let callback_id = q.id.clone();
    let tg_id = q.from.id.0 as i64;
    let chat_id = ChatId(tg_id);

    let _ = bot.answer_callback_query(callback_id).await;

    let data = match q.data {
        Some(d) => d,
        None => return Ok(()),
    };

    if let Some(wait) = state.throttle.check_rate_limit(tg_id) {
        let _ = bot
            .send_message(
                chat_id,
                format!("⏳ Demasiadas solicitudes. Espera {} segundos.", wait),
            )
            .await;
        return Ok(());
    }

    let user = match resolve_user(&state, tg_id, q.from.username.as_deref()).await {
        Some(u) => u,
        None => {
            let _ = bot
                .send_message(chat_id, "❌ Error interno, intenta de nuevo.")
                .await;
            return Ok(());
        }
    };

    if let Some(plan_code) = data.strip_prefix("buy_") {
        match state.order_service.create_order(&user, plan_code).await {
            Ok(order) => {
                let _ = bot
                    .send_message(
                        chat_id,
                        format!(
                            "🛒 <b>Orden #{} creada</b>\n\n\
                             📦 {}\n\
                             💵 {}\n\n\
                             Un vendedor la aceptará pronto. La orden expira en 24 horas.",
                            order.id,
                            escape_html(&order.plan_name),
                            order.price_display(),
                        ),
                    )
                    .parse_mode(ParseMode::Html)
                    .await;
            }
            Err(e) => {
                let _ = bot.send_message(chat_id, service_error_text(&e)).await;
            }
        }
    } else if let Some(id) = parse_id(&data, "accept_purchase_") {
        match state.order_service.accept_order(id, &user).await {
            Ok(order) => {
                let _ = bot
                    .send_message(
                        chat_id,
                        format!(
                            "✅ Tomaste la orden #{} de @{}. El cliente recibió los datos de pago.",
                            order.id,
                            escape_html(&order.client_username),
                        ),
                    )
                    .parse_mode(ParseMode::Html)
                    .await;
            }
            Err(e) => {
                let _ = bot.send_message(chat_id, service_error_text(&e)).await;
            }
        }
    } else if let Some(id) = parse_id(&data, "approve_payment_") {
        match state.order_service.approve_payment(id, &user).await {
            Ok(order) => {
                state.auth.invalidate(order.client_id);
                let _ = bot
                    .send_message(
                        chat_id,
                        format!("🎉 Orden #{} aprobada y beneficios otorgados.", order.id),
                    )
                    .await;
            }
            Err(e) => {
                let _ = bot.send_message(chat_id, service_error_text(&e)).await;
            }
        }
    } else if let Some(id) = parse_id(&data, "reject_payment_") {
        match state
            .order_service
            .reject_payment(id, &user, "Comprobante inválido")
            .await
        {
            Ok(order) => {
                let _ = bot
                    .send_message(
                        chat_id,
                        format!(
                            "❌ Orden #{} rechazada. Usa /reject <id> <motivo> para dar un motivo específico.",
                            order.id
                        ),
                    )
                    .await;
            }
            Err(e) => {
                let _ = bot.send_message(chat_id, service_error_text(&e)).await;
            }
        }
    } else if let Some(id) = parse_id(&data, "confirm_received_") {
        match state.order_service.confirm_received(id, &user).await {
            Ok(order) => {
                let _ = bot
                    .send_message(
                        chat_id,
                        format!("🏁 Orden #{} completada. ¡Gracias por confirmar!", order.id),
                    )
                    .await;
            }
            Err(e) => {
                let _ = bot.send_message(chat_id, service_error_text(&e)).await;
            }
        }
    } else if let Some(id) = parse_id(&data, "confirm_not_received_") {
        match state.order_service.report_not_received(id, &user).await {
            Ok(order) => {
                state.auth.invalidate(order.client_id);
                let _ = bot
                    .send_message(
                        chat_id,
                        format!(
                            "⚠️ Orden #{} en disputa. El equipo revisará tu caso.",
                            order.id
                        ),
                    )
                    .await;
            }
            Err(e) => {
                let _ = bot.send_message(chat_id, service_error_text(&e)).await;
            }
        }
    } else {
        info!("Unhandled callback data: {}", data);
    }

    Ok(())
}

async fn resolve_user(state: &AppState, tg_id: i64, username: Option<&str>) -> Option<User> {
    match state.auth.get_user(tg_id).await {
        Ok(Some(user)) => Some(user),
        Ok(None) => match state.auth.link(tg_id, username).await {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Failed to register user {}: {:#}", tg_id, e);
                None
            }
        },
        Err(e) => {
            warn!("Failed to resolve user {}: {:#}", tg_id, e);
            None
        }
    }
}

fn parse_id(data: &str, prefix: &str) -> Option<i64> {
    data.strip_prefix(prefix)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_order_ids_from_callback_data() {
        assert_eq!(parse_id("accept_purchase_42", "accept_purchase_"), Some(42));
        assert_eq!(parse_id("accept_purchase_x", "accept_purchase_"), None);
        assert_eq!(parse_id("approve_payment_7", "accept_purchase_"), None);
    }
}
