use chrono::Utc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{info, warn};

use chk_db::models::user::User;
use chk_shared::plans;

use crate::bot::handlers::service_error_text;
use crate::bot::keyboards::plans_keyboard;
use crate::bot::utils::escape_html;
use crate::AppState;

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    let tg_id = msg.chat.id.0;

    if let Some(wait) = state.throttle.check_rate_limit(tg_id) {
        let _ = bot
            .send_message(
                msg.chat.id,
                format!("⏳ Demasiadas solicitudes. Espera {} segundos.", wait),
            )
            .await;
        return Ok(());
    }

    // A photo from a client who ran /capturapago is the payment proof.
    if msg.photo().is_some() {
        handle_payment_photo(&bot, &msg, &state).await;
        return Ok(());
    }

    let text = match msg.text() {
        Some(t) => t.trim(),
        None => return Ok(()),
    };

    let mut parts = text.split_whitespace();
    let command = match parts.next() {
        Some(c) if c.starts_with('/') => c.split('@').next().unwrap_or(c),
        _ => return Ok(()),
    };
    let args: Vec<&str> = parts.collect();

    if state.throttle.check_cooldown(tg_id, command).is_some() {
        return Ok(());
    }

    info!("Command {} from {}", command, tg_id);

    match command {
        "/start" => {
            let username = msg.from.as_ref().and_then(|u| u.username.as_deref());
            match state.auth.link(tg_id, username).await {
                Ok(_) => {
                    let text = "👋 <b>Bienvenido</b>\n\n\
                        Comandos disponibles:\n\
                        /comprar — ver planes y crear una orden\n\
                        /capturapago — enviar comprobante de pago\n\
                        /misordenes — tus órdenes recientes\n\
                        /creditos — tu saldo de créditos\n\
                        /plan — tu plan activo\n\
                        /help — ayuda";
                    let _ = bot
                        .send_message(msg.chat.id, text)
                        .parse_mode(ParseMode::Html)
                        .await;
                }
                Err(e) => {
                    warn!("Failed to link user {}: {:#}", tg_id, e);
                    let _ = bot
                        .send_message(msg.chat.id, "❌ Error al registrar tu cuenta.")
                        .await;
                }
            }
        }
        "/comprar" | "/buy" => {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "🛍 <b>Planes disponibles</b>\n\nElige uno para crear tu orden:",
                )
                .parse_mode(ParseMode::Html)
                .reply_markup(plans_keyboard())
                .await;
        }
        "/capturapago" => {
            let user = match require_user(&bot, &msg, &state).await {
                Some(u) => u,
                None => return Ok(()),
            };
            match state.order_service.request_payment_proof(&user).await {
                Ok(order) => {
                    let _ = bot
                        .send_message(
                            msg.chat.id,
                            format!(
                                "📸 Orden #{} lista. Envía ahora la foto del comprobante de pago.",
                                order.id
                            ),
                        )
                        .await;
                }
                Err(crate::services::order_service::ServiceError::NotFound) => {
                    let _ = bot
                        .send_message(
                            msg.chat.id,
                            "❌ No tienes ninguna orden aceptada esperando pago.",
                        )
                        .await;
                }
                Err(e) => {
                    let _ = bot.send_message(msg.chat.id, service_error_text(&e)).await;
                }
            }
        }
        "/misordenes" => {
            let _ = require_user(&bot, &msg, &state).await;
            match state.orders.get_by_client(tg_id, 10).await {
                Ok(orders) if orders.is_empty() => {
                    let _ = bot
                        .send_message(msg.chat.id, "📭 No tienes órdenes todavía. Usa /comprar.")
                        .await;
                }
                Ok(orders) => {
                    let mut text = String::from("📋 <b>Tus órdenes</b>\n\n");
                    for o in orders {
                        text.push_str(&format!(
                            "#{} — {} — {} — {}\n",
                            o.id,
                            escape_html(&o.plan_name),
                            o.price_display(),
                            o.status().display_es(),
                        ));
                    }
                    let _ = bot
                        .send_message(msg.chat.id, text)
                        .parse_mode(ParseMode::Html)
                        .await;
                }
                Err(e) => {
                    warn!("Failed to list orders for {}: {:#}", tg_id, e);
                    let _ = bot
                        .send_message(msg.chat.id, "❌ Error al consultar tus órdenes.")
                        .await;
                }
            }
        }
        "/creditos" => {
            if let Some(user) = require_user(&bot, &msg, &state).await {
                let _ = bot
                    .send_message(
                        msg.chat.id,
                        format!("💳 Tienes <b>{}</b> créditos.", user.credits),
                    )
                    .parse_mode(ParseMode::Html)
                    .await;
            }
        }
        "/plan" => {
            if let Some(user) = require_user(&bot, &msg, &state).await {
                let text = if user.has_active_plan() {
                    let expiry = user
                        .plan_expires_at
                        .map(|e| e.format("%Y-%m-%d %H:%M UTC").to_string())
                        .unwrap_or_default();
                    format!(
                        "📦 Plan activo: <b>{}</b>\n⏰ Expira: {}",
                        escape_html(&user.plan_code),
                        expiry
                    )
                } else {
                    "📦 No tienes un plan activo. Usa /comprar.".to_string()
                };
                let _ = bot
                    .send_message(msg.chat.id, text)
                    .parse_mode(ParseMode::Html)
                    .await;
            }
        }
        "/help" => {
            let staff = matches!(
                require_user(&bot, &msg, &state).await,
                Some(ref u) if u.role().is_staff()
            );
            let mut text = String::from(
                "ℹ️ <b>Ayuda</b>\n\n\
                 /comprar — planes y órdenes\n\
                 /capturapago — comprobante de pago\n\
                 /misordenes — tus órdenes\n\
                 /creditos — saldo\n\
                 /plan — plan activo\n",
            );
            if staff {
                text.push_str(
                    "\n👮 <b>Staff</b>\n\
                     /ordenes — órdenes recientes\n\
                     /approve &lt;id&gt; — aprobar pago\n\
                     /reject &lt;id&gt; &lt;motivo&gt; — rechazar pago\n\
                     /ganancias — tus comisiones\n\
                     /stats — resumen de órdenes\n\
                     /banca — datos bancarios (owner)\n\
                     /addcredits — abonar créditos (owner)\n\
                     /setplan — asignar plan (owner)\n\
                     /users — lista de usuarios (owner)\n",
                );
            }
            let _ = bot
                .send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .await;
        }
        "/ordenes" => staff_list_orders(&bot, &msg, &state, &args).await,
        "/approve" => staff_approve(&bot, &msg, &state, &args).await,
        "/reject" => staff_reject(&bot, &msg, &state, &args).await,
        "/ganancias" => staff_earnings(&bot, &msg, &state).await,
        "/stats" => staff_stats(&bot, &msg, &state).await,
        "/banca" => owner_set_bank(&bot, &msg, &state, text).await,
        "/addcredits" => owner_add_credits(&bot, &msg, &state, &args).await,
        "/setplan" => owner_set_plan(&bot, &msg, &state, &args).await,
        "/users" => owner_list_users(&bot, &msg, &state).await,
        _ => {
            let _ = bot
                .send_message(msg.chat.id, "❓ Comando desconocido. Usa /help.")
                .await;
        }
    }

    Ok(())
}

/// Resolves the caller's account, registering them on the fly if this is
/// their first interaction.
async fn require_user(bot: &Bot, msg: &Message, state: &AppState) -> Option<User> {
    let tg_id = msg.chat.id.0;
    match state.auth.get_user(tg_id).await {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            let username = msg.from.as_ref().and_then(|u| u.username.as_deref());
            match state.auth.link(tg_id, username).await {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Failed to register user {}: {:#}", tg_id, e);
                    None
                }
            }
        }
        Err(e) => {
            warn!("Failed to resolve user {}: {:#}", tg_id, e);
            let _ = bot
                .send_message(msg.chat.id, "❌ Error interno, intenta de nuevo.")
                .await;
            None
        }
    }
}

async fn require_staff(bot: &Bot, msg: &Message, state: &AppState) -> Option<User> {
    let user = require_user(bot, msg, state).await?;
    if user.role().is_staff() {
        Some(user)
    } else {
        let _ = bot
            .send_message(msg.chat.id, "⛔ Este comando es solo para staff.")
            .await;
        None
    }
}

async fn require_owner(bot: &Bot, msg: &Message, state: &AppState) -> Option<User> {
    let user = require_staff(bot, msg, state).await?;
    if user.tg_id == state.cfg.owner_chat_id {
        Some(user)
    } else {
        let _ = bot
            .send_message(msg.chat.id, "⛔ Este comando es solo para el owner.")
            .await;
        None
    }
}

async fn handle_payment_photo(bot: &Bot, msg: &Message, state: &AppState) {
    let tg_id = msg.chat.id.0;
    let user = match require_user(bot, msg, state).await {
        Some(u) => u,
        None => return,
    };

    // Largest size is last.
    let photo = match msg.photo().and_then(|sizes| sizes.last()) {
        Some(p) => p,
        None => return,
    };

    let file = match bot.get_file(photo.file.id.clone()).await {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to resolve photo from {}: {}", tg_id, e);
            let _ = bot
                .send_message(msg.chat.id, "❌ No pude leer la foto, intenta de nuevo.")
                .await;
            return;
        }
    };

    let mut buf: Vec<u8> = Vec::new();
    if let Err(e) = bot.download_file(&file.path, &mut buf).await {
        warn!("Failed to download photo from {}: {}", tg_id, e);
        let _ = bot
            .send_message(msg.chat.id, "❌ No pude descargar la foto, intenta de nuevo.")
            .await;
        return;
    }

    let file_name = format!("proof_{}_{}.jpg", tg_id, Utc::now().timestamp());
    match state
        .order_service
        .attach_payment_proof(&user, &file_name, buf)
        .await
    {
        Ok(order) => {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    format!(
                        "✅ Comprobante recibido para la orden #{}. El vendedor lo revisará pronto.",
                        order.id
                    ),
                )
                .await;
        }
        Err(crate::services::order_service::ServiceError::NotFound) => {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "⚠️ No hay ninguna orden esperando comprobante. Usa /capturapago primero.",
                )
                .await;
        }
        Err(e) => {
            let _ = bot.send_message(msg.chat.id, service_error_text(&e)).await;
        }
    }
}

/// /ordenes [estado] — recent orders, optionally filtered by status.
async fn staff_list_orders(bot: &Bot, msg: &Message, state: &AppState, args: &[&str]) {
    if require_staff(bot, msg, state).await.is_none() {
        return;
    }
    let listed = match args.first() {
        Some(raw) => match chk_db::models::order::OrderStatus::parse(raw) {
            Some(status) => state.orders.list_by_status(status, 15).await,
            None => {
                let _ = bot
                    .send_message(
                        msg.chat.id,
                        "Uso: /ordenes [pending|accepted|payment_sent|approved|rejected|expired|completed|disputed]",
                    )
                    .await;
                return;
            }
        },
        None => state.orders.list_recent(15).await,
    };
    match listed {
        Ok(orders) if orders.is_empty() => {
            let _ = bot.send_message(msg.chat.id, "📭 No hay órdenes.").await;
        }
        Ok(orders) => {
            let mut text = String::from("📋 <b>Órdenes recientes</b>\n\n");
            for o in orders {
                text.push_str(&format!(
                    "#{} — @{} — {} — {} — {}\n",
                    o.id,
                    escape_html(&o.client_username),
                    escape_html(&o.plan_name),
                    o.price_display(),
                    o.status().display_es(),
                ));
            }
            let _ = bot
                .send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .await;
        }
        Err(e) => {
            warn!("Failed to list recent orders: {:#}", e);
            let _ = bot
                .send_message(msg.chat.id, "❌ Error al consultar órdenes.")
                .await;
        }
    }
}

async fn staff_approve(bot: &Bot, msg: &Message, state: &AppState, args: &[&str]) {
    let staff = match require_staff(bot, msg, state).await {
        Some(u) => u,
        None => return,
    };
    let order_id = match args.first().and_then(|s| s.parse::<i64>().ok()) {
        Some(id) => id,
        None => {
            let _ = bot.send_message(msg.chat.id, "Uso: /approve <id>").await;
            return;
        }
    };
    match state.order_service.approve_payment(order_id, &staff).await {
        Ok(order) => {
            state.auth.invalidate(order.client_id);
            let _ = bot
                .send_message(
                    msg.chat.id,
                    format!("🎉 Orden #{} aprobada y beneficios otorgados.", order.id),
                )
                .await;
        }
        Err(e) => {
            let _ = bot.send_message(msg.chat.id, service_error_text(&e)).await;
        }
    }
}

async fn staff_reject(bot: &Bot, msg: &Message, state: &AppState, args: &[&str]) {
    let staff = match require_staff(bot, msg, state).await {
        Some(u) => u,
        None => return,
    };
    let order_id = match args.first().and_then(|s| s.parse::<i64>().ok()) {
        Some(id) => id,
        None => {
            let _ = bot
                .send_message(msg.chat.id, "Uso: /reject <id> <motivo>")
                .await;
            return;
        }
    };
    let reason = if args.len() > 1 {
        args[1..].join(" ")
    } else {
        "Comprobante inválido".to_string()
    };
    match state
        .order_service
        .reject_payment(order_id, &staff, &reason)
        .await
    {
        Ok(order) => {
            let _ = bot
                .send_message(msg.chat.id, format!("❌ Orden #{} rechazada.", order.id))
                .await;
        }
        Err(e) => {
            let _ = bot.send_message(msg.chat.id, service_error_text(&e)).await;
        }
    }
}

async fn staff_earnings(bot: &Bot, msg: &Message, state: &AppState) {
    let staff = match require_staff(bot, msg, state).await {
        Some(u) => u,
        None => return,
    };

    let totals = match state.earnings.get(staff.tg_id).await {
        Ok(t) => t,
        Err(e) => {
            warn!("Failed to fetch earnings for {}: {:#}", staff.tg_id, e);
            let _ = bot
                .send_message(msg.chat.id, "❌ Error al consultar ganancias.")
                .await;
            return;
        }
    };

    let mut text = match totals {
        Some(t) => format!(
            "💰 <b>Tus ganancias</b>\n\n\
             Ventas: {}\n\
             Monto vendido: ${:.2} MXN\n\
             Comisión acumulada: ${:.2} MXN\n",
            t.total_sales,
            t.total_amount as f64 / 100.0,
            t.total_commission as f64 / 100.0,
        ),
        None => "💰 Aún no tienes ganancias registradas.".to_string(),
    };

    if let Ok(monthly) = state.earnings.get_monthly(staff.tg_id, 6).await {
        if !monthly.is_empty() {
            text.push_str("\n📅 <b>Por mes</b>\n");
            for m in monthly {
                text.push_str(&format!(
                    "{} — {} ventas — ${:.2} MXN\n",
                    m.month,
                    m.sales,
                    m.commission as f64 / 100.0,
                ));
            }
        }
    }

    let _ = bot
        .send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await;
}

async fn staff_stats(bot: &Bot, msg: &Message, state: &AppState) {
    if require_staff(bot, msg, state).await.is_none() {
        return;
    }
    match state.orders.count_by_status().await {
        Ok(counts) => {
            let mut text = String::from("📊 <b>Órdenes por estado</b>\n\n");
            for (status, count) in counts {
                text.push_str(&format!("{}: {}\n", escape_html(&status), count));
            }
            let _ = bot
                .send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .await;
        }
        Err(e) => {
            warn!("Failed to count orders: {:#}", e);
            let _ = bot.send_message(msg.chat.id, "❌ Error al contar órdenes.").await;
        }
    }
}

/// /banca Banco|Cuenta|CLABE|Titular
async fn owner_set_bank(bot: &Bot, msg: &Message, state: &AppState, full_text: &str) {
    if require_owner(bot, msg, state).await.is_none() {
        return;
    }
    let rest = full_text
        .strip_prefix("/banca")
        .map(str::trim)
        .unwrap_or("");
    let fields: Vec<&str> = rest.split('|').map(str::trim).collect();
    if fields.len() != 4 || fields.iter().any(|f| f.is_empty()) {
        let current = state.bank.get().await.ok().flatten();
        let mut text = String::from("Uso: /banca Banco|Cuenta|CLABE|Titular\n");
        if let Some(b) = current {
            text.push_str(&format!(
                "\nActual: {} | {} | {} | {}",
                escape_html(&b.bank),
                escape_html(&b.account),
                escape_html(&b.clabe),
                escape_html(&b.holder),
            ));
        }
        let _ = bot
            .send_message(msg.chat.id, text)
            .parse_mode(ParseMode::Html)
            .await;
        return;
    }
    match state
        .bank
        .upsert(fields[0], fields[1], fields[2], fields[3])
        .await
    {
        Ok(_) => {
            let _ = bot
                .send_message(msg.chat.id, "🏦 Datos bancarios actualizados.")
                .await;
        }
        Err(e) => {
            warn!("Failed to update bank config: {:#}", e);
            let _ = bot
                .send_message(msg.chat.id, "❌ Error al guardar los datos bancarios.")
                .await;
        }
    }
}

async fn owner_add_credits(bot: &Bot, msg: &Message, state: &AppState, args: &[&str]) {
    if require_owner(bot, msg, state).await.is_none() {
        return;
    }
    let (target, amount) = match (
        args.first().and_then(|s| s.parse::<i64>().ok()),
        args.get(1).and_then(|s| s.parse::<i64>().ok()),
    ) {
        (Some(t), Some(a)) if a > 0 => (t, a),
        _ => {
            let _ = bot
                .send_message(msg.chat.id, "Uso: /addcredits <tg_id> <cantidad>")
                .await;
            return;
        }
    };
    match state.users.add_credits(target, amount).await {
        Ok(Some(user)) => {
            state.auth.invalidate(target);
            let _ = bot
                .send_message(
                    msg.chat.id,
                    format!("💳 Abonados {} créditos. Saldo: {}", amount, user.credits),
                )
                .await;
        }
        Ok(None) => {
            let _ = bot
                .send_message(msg.chat.id, "❌ Ese usuario no está registrado.")
                .await;
        }
        Err(e) => {
            warn!("Failed to add credits to {}: {:#}", target, e);
            let _ = bot.send_message(msg.chat.id, "❌ Error al abonar créditos.").await;
        }
    }
}

async fn owner_set_plan(bot: &Bot, msg: &Message, state: &AppState, args: &[&str]) {
    if require_owner(bot, msg, state).await.is_none() {
        return;
    }
    let (target, code) = match (args.first().and_then(|s| s.parse::<i64>().ok()), args.get(1)) {
        (Some(t), Some(c)) => (t, *c),
        _ => {
            let _ = bot
                .send_message(msg.chat.id, "Uso: /setplan <tg_id> <plan>")
                .await;
            return;
        }
    };
    let days = match plans::find(code).and_then(|p| p.duration_days) {
        Some(d) => d,
        None => {
            let _ = bot
                .send_message(msg.chat.id, "❌ Ese código no es un plan de días válido.")
                .await;
            return;
        }
    };
    match state.users.set_plan(target, code, days).await {
        Ok(Some(_)) => {
            state.auth.invalidate(target);
            let _ = bot
                .send_message(
                    msg.chat.id,
                    format!("📦 Plan {} asignado por {} días.", code, days),
                )
                .await;
        }
        Ok(None) => {
            let _ = bot
                .send_message(msg.chat.id, "❌ Ese usuario no está registrado.")
                .await;
        }
        Err(e) => {
            warn!("Failed to set plan for {}: {:#}", target, e);
            let _ = bot.send_message(msg.chat.id, "❌ Error al asignar el plan.").await;
        }
    }
}

/// /users — the 20 most recent accounts with role, credits and plan,
/// plus the grand total.
async fn owner_list_users(bot: &Bot, msg: &Message, state: &AppState) {
    if require_owner(bot, msg, state).await.is_none() {
        return;
    }
    let (users, total) = match (state.users.get_all(20).await, state.users.count().await) {
        (Ok(users), Ok(total)) => (users, total),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to list users: {:#}", e);
            let _ = bot
                .send_message(msg.chat.id, "❌ Error al consultar usuarios.")
                .await;
            return;
        }
    };
    if users.is_empty() {
        let _ = bot
            .send_message(msg.chat.id, "👥 No hay usuarios registrados.")
            .await;
        return;
    }
    let mut text = format!("👥 <b>Usuarios</b> ({} en total)\n\n", total);
    for u in &users {
        text.push_str(&user_line(u));
        text.push('\n');
    }
    let _ = bot
        .send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await;
}

fn user_line(u: &User) -> String {
    let name = u
        .username
        .as_deref()
        .map(|n| format!("@{}", escape_html(n)))
        .unwrap_or_else(|| u.tg_id.to_string());
    let plan = if u.has_active_plan() {
        u.plan_code.as_str()
    } else {
        "free"
    };
    format!(
        "{} — {} — {} créditos — plan {}",
        name,
        escape_html(&u.role),
        u.credits,
        escape_html(plan),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample_user(username: Option<&str>, plan_code: &str, expires_in_hours: i64) -> User {
        let now = Utc::now();
        User {
            id: 1,
            tg_id: 555,
            username: username.map(str::to_string),
            role: "client".into(),
            credits: 120,
            plan_code: plan_code.into(),
            plan_expires_at: Some(now + Duration::hours(expires_in_hours)),
            created_at: now,
            updated_at: now,
            last_active: None,
        }
    }

    #[test]
    fn user_line_shows_username_role_credits_and_plan() {
        let line = user_line(&sample_user(Some("cliente"), "weekly", 48));
        assert_eq!(line, "@cliente — client — 120 créditos — plan weekly");
    }

    #[test]
    fn user_line_falls_back_to_tg_id_and_free_plan() {
        let line = user_line(&sample_user(None, "weekly", -1));
        assert_eq!(line, "555 — client — 120 créditos — plan free");
    }
}
