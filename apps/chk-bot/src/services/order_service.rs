use std::sync::Arc;

use chrono::{Duration, Utc};
use thiserror::Error;

use chk_db::models::order::{NewOrder, OrderStatus, PurchaseOrder};
use chk_db::models::user::User;
use chk_db::repositories::bank_repo::BankRepository;
use chk_db::repositories::order_repo::OrderRepository;
use chk_db::repositories::user_repo::UserRepository;
use chk_shared::commission::split;
use chk_shared::plans::{self, PlanType};

use crate::config::BotConfig;
use crate::services::earnings_service::EarningsService;
use crate::services::fraud::{classify, FraudVerdict};
use crate::services::notify_service::Notifier;
use crate::services::storage_service::ProofStorage;

/// Hours a new order stays open before it expires unaccepted or unpaid.
const ORDER_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("order not found")]
    NotFound,
    #[error("order is in state '{0}'")]
    InvalidState(String),
    #[error("not allowed")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Drives the purchase-order lifecycle. Every transition goes through a
/// conditional update in the repository, so concurrent taps on the same
/// button resolve to one winner and the rest surface `InvalidState`.
#[derive(Clone)]
pub struct OrderService {
    cfg: Arc<BotConfig>,
    orders: OrderRepository,
    users: UserRepository,
    bank: BankRepository,
    earnings: EarningsService,
    notifier: Notifier,
    storage: ProofStorage,
}

impl OrderService {
    pub fn new(
        cfg: Arc<BotConfig>,
        orders: OrderRepository,
        users: UserRepository,
        bank: BankRepository,
        earnings: EarningsService,
        notifier: Notifier,
        storage: ProofStorage,
    ) -> Self {
        Self {
            cfg,
            orders,
            users,
            bank,
            earnings,
            notifier,
            storage,
        }
    }

    pub async fn create_order(
        &self,
        client: &User,
        plan_code: &str,
    ) -> ServiceResult<PurchaseOrder> {
        let plan = plans::find(plan_code)
            .ok_or_else(|| ServiceError::Validation("Ese plan no existe.".into()))?;

        let recent = self.orders.get_by_client(client.tg_id, 5).await?;
        let open = recent.iter().any(|o| {
            matches!(
                o.status(),
                OrderStatus::Pending | OrderStatus::Accepted | OrderStatus::PaymentSent
            ) && !o.is_expired(Utc::now())
        });
        if open {
            return Err(ServiceError::Validation(
                "Ya tienes una orden abierta. Termínala antes de crear otra.".into(),
            ));
        }

        let username = client
            .username
            .clone()
            .unwrap_or_else(|| client.tg_id.to_string());
        let order = self
            .orders
            .create(&NewOrder {
                client_id: client.tg_id,
                client_username: username,
                plan_type: plan.plan_type.as_str().to_string(),
                plan_code: plan.code.to_string(),
                plan_name: plan.name.to_string(),
                price: plan.price,
                currency: plan.currency.to_string(),
                duration_days: plan.duration_days,
                credits_per_day: plan.credits_per_day,
                credits: plan.credits,
                expires_at: Utc::now() + Duration::hours(ORDER_TTL_HOURS),
            })
            .await?;

        tracing::info!(
            "Order {} created: client={} plan={}",
            order.id,
            order.client_id,
            order.plan_code
        );

        let staff = self.users.get_staff().await?;
        let mut staff_ids: Vec<i64> = staff.iter().map(|u| u.tg_id).collect();
        if !staff_ids.contains(&self.cfg.owner_chat_id) {
            staff_ids.push(self.cfg.owner_chat_id);
        }
        if let Err(e) = self.notifier.notify_staff_new_order(&order, &staff_ids).await {
            tracing::warn!("Failed to announce order {}: {}", order.id, e);
        }

        Ok(order)
    }

    /// First staff member to tap "accept" wins the sale.
    pub async fn accept_order(&self, order_id: i64, staff: &User) -> ServiceResult<PurchaseOrder> {
        if !staff.role().is_staff() {
            return Err(ServiceError::Forbidden);
        }

        let order = self
            .orders
            .get_by_id(order_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if order.client_id == staff.tg_id {
            return Err(ServiceError::Validation(
                "No puedes atender tu propia orden.".into(),
            ));
        }

        if let Some(expired) = self.expire_if_stale(&order).await? {
            return Err(ServiceError::InvalidState(expired.status));
        }

        let username = staff
            .username
            .clone()
            .unwrap_or_else(|| staff.tg_id.to_string());
        let accepted = self
            .orders
            .accept_if_pending(order_id, staff.tg_id, &username)
            .await?
            .ok_or_else(|| ServiceError::InvalidState(order.status.clone()))?;

        tracing::info!("Order {} accepted by {}", accepted.id, staff.tg_id);

        match self.bank.get().await? {
            Some(bank) => {
                if let Err(e) = self.notifier.send_bank_details(&accepted, &bank).await {
                    tracing::warn!("Failed to send bank details for order {}: {}", accepted.id, e);
                }
            }
            None => {
                tracing::warn!("No bank config; order {} accepted without payment details", accepted.id)
            }
        }

        Ok(accepted)
    }

    /// /capturapago: arms the client's latest accepted order so the next
    /// photo they send is taken as the payment proof.
    pub async fn request_payment_proof(&self, client: &User) -> ServiceResult<PurchaseOrder> {
        let order = self
            .orders
            .latest_accepted_for_client(client.tg_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if let Some(expired) = self.expire_if_stale(&order).await? {
            return Err(ServiceError::InvalidState(expired.status));
        }

        self.orders.set_awaiting_proof(order.id).await?;
        Ok(order)
    }

    pub async fn attach_payment_proof(
        &self,
        client: &User,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> ServiceResult<PurchaseOrder> {
        let order = self
            .orders
            .find_awaiting_proof(client.tg_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if let Some(expired) = self.expire_if_stale(&order).await? {
            return Err(ServiceError::InvalidState(expired.status));
        }

        let proof_url = self.storage.upload(file_name, bytes).await?;

        let updated = self
            .orders
            .attach_proof(order.id, &proof_url, file_name)
            .await?
            .ok_or_else(|| ServiceError::InvalidState(order.status.clone()))?;

        tracing::info!("Order {} payment proof attached", updated.id);

        if let Err(e) = self.notifier.notify_admin_payment_proof(&updated, &proof_url).await {
            tracing::warn!("Failed to forward proof for order {}: {}", updated.id, e);
        }

        Ok(updated)
    }

    /// Approves a payment, grants the plan, and ledgers the commission
    /// split. Only the accepting staff member or the owner may approve.
    pub async fn approve_payment(&self, order_id: i64, staff: &User) -> ServiceResult<PurchaseOrder> {
        let order = self.authorize_review(order_id, staff).await?;

        let parts = split(order.price, self.cfg.dev_chat_ids.len());
        let approved = self
            .orders
            .approve_if_payment_sent(order_id, parts.owner, parts.devs_total, parts.seller)
            .await?
            .ok_or_else(|| ServiceError::InvalidState(order.status.clone()))?;

        tracing::info!("Order {} approved by {}", approved.id, staff.tg_id);

        if let Err(e) = self.grant(&approved).await {
            tracing::error!("Failed to grant order {} benefits: {}", approved.id, e);
        }

        if let Err(e) = self.earnings.record_sale(&approved).await {
            tracing::error!("Failed to ledger earnings for order {}: {}", approved.id, e);
        }

        if let Err(e) = self.notifier.notify_client_approved(&approved).await {
            tracing::warn!("Failed to notify approval of order {}: {}", approved.id, e);
        }

        Ok(approved)
    }

    pub async fn reject_payment(
        &self,
        order_id: i64,
        staff: &User,
        reason: &str,
    ) -> ServiceResult<PurchaseOrder> {
        let order = self.authorize_review(order_id, staff).await?;

        let rejected = self
            .orders
            .reject_if_payment_sent(order_id, reason)
            .await?
            .ok_or_else(|| ServiceError::InvalidState(order.status.clone()))?;

        tracing::info!("Order {} rejected by {}", rejected.id, staff.tg_id);

        if let Err(e) = self.notifier.notify_client_rejected(&rejected, reason).await {
            tracing::warn!("Failed to notify rejection of order {}: {}", rejected.id, e);
        }

        Ok(rejected)
    }

    pub async fn confirm_received(
        &self,
        order_id: i64,
        client: &User,
    ) -> ServiceResult<PurchaseOrder> {
        let order = self
            .orders
            .get_by_id(order_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        if order.client_id != client.tg_id {
            return Err(ServiceError::Forbidden);
        }

        let completed = self
            .orders
            .complete_if_approved(order_id, false)
            .await?
            .ok_or_else(|| ServiceError::InvalidState(order.status.clone()))?;

        tracing::info!("Order {} confirmed received", completed.id);
        Ok(completed)
    }

    /// "Not received" claim: the order goes to dispute either way, and a
    /// cross-check against the account decides whether the claim looks
    /// fraudulent. Fraudulent claims get their grant rolled back.
    pub async fn report_not_received(
        &self,
        order_id: i64,
        client: &User,
    ) -> ServiceResult<PurchaseOrder> {
        let order = self
            .orders
            .get_by_id(order_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        if order.client_id != client.tg_id {
            return Err(ServiceError::Forbidden);
        }

        let account = self
            .users
            .get_by_tg_id(client.tg_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        let verdict = classify(&order, &account, Utc::now());

        let disputed = match verdict {
            FraudVerdict::Fraud => {
                let reason = match order.plan_type.as_str() {
                    "days" => format!(
                        "Reclama no haber recibido el plan '{}' pero lo tiene activo",
                        order.plan_code
                    ),
                    _ => format!(
                        "Reclama no haber recibido {} créditos pero su saldo los cubre",
                        order.credits.unwrap_or(0)
                    ),
                };
                let disputed = self
                    .orders
                    .dispute_if_approved(order_id, true, Some(&reason))
                    .await?
                    .ok_or_else(|| ServiceError::InvalidState(order.status.clone()))?;

                tracing::warn!("Order {} disputed as fraud: {}", disputed.id, reason);

                if let Err(e) = self.revoke(&disputed).await {
                    tracing::error!("Failed to revoke order {} grants: {}", disputed.id, e);
                }
                if let Err(e) = self.notifier.notify_fraud(&disputed, &reason).await {
                    tracing::warn!("Failed to notify fraud on order {}: {}", disputed.id, e);
                }
                disputed
            }
            FraudVerdict::Legitimate => {
                let disputed = self
                    .orders
                    .dispute_if_approved(order_id, false, None)
                    .await?
                    .ok_or_else(|| ServiceError::InvalidState(order.status.clone()))?;

                tracing::info!("Order {} disputed, claim looks legitimate", disputed.id);

                if let Err(e) = self.notifier.notify_complaint(&disputed).await {
                    tracing::warn!("Failed to notify complaint on order {}: {}", disputed.id, e);
                }
                disputed
            }
        };

        Ok(disputed)
    }

    /// Expires a stale pending/accepted order on touch. Returns the expired
    /// row if the flip happened.
    async fn expire_if_stale(
        &self,
        order: &PurchaseOrder,
    ) -> ServiceResult<Option<PurchaseOrder>> {
        if !order.is_expired(Utc::now()) {
            return Ok(None);
        }
        let expired = self.orders.expire(order.id).await?;
        if let Some(ref expired) = expired {
            tracing::info!("Order {} expired after {}h window", expired.id, ORDER_TTL_HOURS);
        }
        Ok(expired)
    }

    /// Any staff member may review a payment, not just the accepting
    /// seller; the commission still goes to whoever accepted.
    async fn authorize_review(&self, order_id: i64, staff: &User) -> ServiceResult<PurchaseOrder> {
        if !staff.role().is_staff() {
            return Err(ServiceError::Forbidden);
        }
        self.orders
            .get_by_id(order_id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    async fn grant(&self, order: &PurchaseOrder) -> anyhow::Result<()> {
        match order.plan_type.as_str() {
            t if t == PlanType::Days.as_str() => {
                let days = order
                    .duration_days
                    .ok_or_else(|| anyhow::anyhow!("days order {} missing duration", order.id))?;
                self.users
                    .grant_days_plan(order.client_id, &order.plan_code, days)
                    .await?;
            }
            t if t == PlanType::Credits.as_str() => {
                let credits = order
                    .credits
                    .ok_or_else(|| anyhow::anyhow!("credit order {} missing amount", order.id))?;
                self.users.add_credits(order.client_id, credits).await?;
            }
            other => anyhow::bail!("order {} has unknown plan type '{}'", order.id, other),
        }
        Ok(())
    }

    /// Rolls back a fraudulent order's grant: days plans drop to free,
    /// credit balances are clamped at zero.
    async fn revoke(&self, order: &PurchaseOrder) -> anyhow::Result<()> {
        match order.plan_type.as_str() {
            t if t == PlanType::Days.as_str() => {
                self.users.reset_plan(order.client_id).await?;
            }
            t if t == PlanType::Credits.as_str() => {
                let credits = order.credits.unwrap_or(0);
                self.users
                    .subtract_credits_clamped(order.client_id, credits)
                    .await?;
            }
            _ => {}
        }
        Ok(())
    }
}
