use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};

use chk_db::models::bank::BankConfig;
use chk_db::models::order::PurchaseOrder;

use crate::bot::keyboards::{accept_order_keyboard, confirm_keyboard, review_proof_keyboard};
use crate::bot::utils::escape_html;
use crate::config::BotConfig;

/// Outbound Telegram messaging for the order workflow. Every lifecycle
/// transition has a counterpart here so handlers and the scheduler never
/// build message text themselves.
#[derive(Clone)]
pub struct Notifier {
    bot: Bot,
    cfg: Arc<BotConfig>,
}

impl Notifier {
    pub fn new(bot: Bot, cfg: Arc<BotConfig>) -> Self {
        Self { bot, cfg }
    }

    pub async fn notify_staff_new_order(
        &self,
        order: &PurchaseOrder,
        staff_ids: &[i64],
    ) -> Result<()> {
        let text = format!(
            "🛒 <b>Nueva orden de compra</b> #{}\n\n\
             👤 Cliente: @{}\n\
             📦 Plan: {}\n\
             💵 Precio: {}\n\n\
             El primero en aceptar atenderá la venta.",
            order.id,
            escape_html(&order.client_username),
            escape_html(&order.plan_name),
            order.price_display(),
        );

        for staff_id in staff_ids {
            let res = self
                .bot
                .send_message(ChatId(*staff_id), &text)
                .parse_mode(ParseMode::Html)
                .reply_markup(accept_order_keyboard(order.id))
                .await;
            if let Err(e) = res {
                tracing::warn!("Failed to notify staff {} of order {}: {}", staff_id, order.id, e);
            }
        }

        Ok(())
    }

    pub async fn send_bank_details(
        &self,
        order: &PurchaseOrder,
        bank: &BankConfig,
    ) -> Result<()> {
        let admin = order.admin_username.as_deref().unwrap_or("staff");
        let text = format!(
            "✅ <b>Tu orden #{} fue aceptada</b> por @{}\n\n\
             📦 {}\n\
             💵 {}\n\n\
             🏦 <b>Datos para transferencia</b>\n\
             Banco: {}\n\
             Titular: {}\n\
             Cuenta: <code>{}</code>\n\
             CLABE: <code>{}</code>\n\n\
             Cuando hayas pagado, envía /capturapago y adjunta la foto del comprobante.",
            order.id,
            escape_html(admin),
            escape_html(&order.plan_name),
            order.price_display(),
            escape_html(&bank.bank),
            escape_html(&bank.holder),
            escape_html(&bank.account),
            escape_html(&bank.clabe),
        );

        self.bot
            .send_message(ChatId(order.client_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .context("Failed to send bank details")?;
        Ok(())
    }

    pub async fn notify_admin_payment_proof(
        &self,
        order: &PurchaseOrder,
        proof_url: &str,
    ) -> Result<()> {
        let admin_id = order
            .admin_id
            .context("order has no accepting admin")?;
        let caption = format!(
            "💸 <b>Comprobante de pago</b> — orden #{}\n\n\
             👤 Cliente: @{}\n\
             📦 Plan: {}\n\
             💵 Precio: {}\n\n\
             Revisa el comprobante y aprueba o rechaza el pago.",
            order.id,
            escape_html(&order.client_username),
            escape_html(&order.plan_name),
            order.price_display(),
        );

        let url = reqwest::Url::parse(proof_url).context("Invalid proof URL")?;
        self.bot
            .send_photo(ChatId(admin_id), InputFile::url(url))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .reply_markup(review_proof_keyboard(order.id))
            .await
            .context("Failed to forward payment proof")?;
        Ok(())
    }

    pub async fn notify_client_approved(&self, order: &PurchaseOrder) -> Result<()> {
        let text = format!(
            "🎉 <b>Pago aprobado</b> — orden #{}\n\n\
             Tu plan <b>{}</b> ya está activo. ¡Gracias por tu compra!\n\n\
             Cuando lo hayas comprobado, confirma aquí que recibiste tu compra.",
            order.id,
            escape_html(&order.plan_name),
        );
        self.bot
            .send_message(ChatId(order.client_id), text)
            .parse_mode(ParseMode::Html)
            .reply_markup(confirm_keyboard(order.id))
            .await
            .context("Failed to notify approval")?;
        Ok(())
    }

    pub async fn notify_client_rejected(&self, order: &PurchaseOrder, reason: &str) -> Result<()> {
        let text = format!(
            "❌ <b>Pago rechazado</b> — orden #{}\n\n\
             Motivo: {}\n\n\
             Si crees que es un error, contacta al vendedor.",
            order.id,
            escape_html(reason),
        );
        self.bot
            .send_message(ChatId(order.client_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .context("Failed to notify rejection")?;
        Ok(())
    }

    /// `reminder_number` 0 is the initial prompt; 1.. are follow-ups.
    pub async fn send_confirmation_prompt(
        &self,
        order: &PurchaseOrder,
        reminder_number: i32,
    ) -> Result<()> {
        let header = if reminder_number == 0 {
            format!("📬 <b>¿Recibiste tu compra?</b> — orden #{}", order.id)
        } else {
            format!(
                "🔔 <b>Recordatorio {}/6</b> — orden #{}",
                reminder_number, order.id
            )
        };
        let text = format!(
            "{}\n\n\
             📦 {}\n\n\
             Confirma si recibiste tu plan. Si no respondes, la orden se \
             completará automáticamente.",
            header,
            escape_html(&order.plan_name),
        );
        self.bot
            .send_message(ChatId(order.client_id), text)
            .parse_mode(ParseMode::Html)
            .reply_markup(confirm_keyboard(order.id))
            .await
            .context("Failed to send confirmation prompt")?;
        Ok(())
    }

    pub async fn notify_auto_completed(&self, order: &PurchaseOrder) -> Result<()> {
        let text = format!(
            "✅ La orden #{} se completó automáticamente tras varios \
             recordatorios sin respuesta.",
            order.id,
        );
        let _ = self
            .bot
            .send_message(ChatId(order.client_id), &text)
            .await;
        if let Some(admin_id) = order.admin_id {
            let _ = self.bot.send_message(ChatId(admin_id), &text).await;
        }
        Ok(())
    }

    pub async fn notify_fraud(&self, order: &PurchaseOrder, reason: &str) -> Result<()> {
        let text = format!(
            "🚨 <b>Posible fraude</b> — orden #{}\n\n\
             👤 Cliente: @{}\n\
             📦 Plan: {}\n\
             📋 {}\n\n\
             Los beneficios otorgados fueron revertidos y la orden quedó en disputa.",
            order.id,
            escape_html(&order.client_username),
            escape_html(&order.plan_name),
            escape_html(reason),
        );
        let mut targets = vec![self.cfg.owner_chat_id];
        if let Some(admin_id) = order.admin_id {
            if admin_id != self.cfg.owner_chat_id {
                targets.push(admin_id);
            }
        }
        for target in targets {
            let _ = self
                .bot
                .send_message(ChatId(target), &text)
                .parse_mode(ParseMode::Html)
                .await;
        }
        Ok(())
    }

    pub async fn notify_complaint(&self, order: &PurchaseOrder) -> Result<()> {
        let text = format!(
            "⚠️ <b>Reclamo de entrega</b> — orden #{}\n\n\
             👤 Cliente: @{}\n\
             📦 Plan: {}\n\n\
             El cliente reporta que NO recibió su compra. La orden quedó en \
             disputa, revisa el caso.",
            order.id,
            escape_html(&order.client_username),
            escape_html(&order.plan_name),
        );
        let mut targets = vec![self.cfg.owner_chat_id];
        if let Some(admin_id) = order.admin_id {
            if admin_id != self.cfg.owner_chat_id {
                targets.push(admin_id);
            }
        }
        for target in targets {
            let _ = self
                .bot
                .send_message(ChatId(target), &text)
                .parse_mode(ParseMode::Html)
                .await;
        }
        Ok(())
    }
}
