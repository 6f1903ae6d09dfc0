use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;

use chk_db::models::earnings::month_key;
use chk_db::models::order::PurchaseOrder;
use chk_db::repositories::earnings_repo::EarningsRepository;
use chk_shared::commission::split;

use crate::config::BotConfig;

#[derive(Clone)]
pub struct EarningsService {
    earnings: EarningsRepository,
    cfg: Arc<BotConfig>,
}

impl EarningsService {
    pub fn new(earnings: EarningsRepository, cfg: Arc<BotConfig>) -> Self {
        Self { earnings, cfg }
    }

    /// Ledgers the commission split for an approved order. The seller's
    /// entry also carries the gross sale amount and the sale counter; owner
    /// and dev entries only accrue commission. A seller who is also in the
    /// dev pool receives both their seller cut and their dev share.
    pub async fn record_sale(&self, order: &PurchaseOrder) -> Result<()> {
        let seller_id = match order.admin_id {
            Some(id) => id,
            None => {
                anyhow::bail!("order {} approved without a seller", order.id)
            }
        };

        let parts = split(order.price, self.cfg.dev_chat_ids.len());
        let month = month_key(Utc::now());

        self.earnings
            .record(seller_id, &month, order.price, parts.seller, true)
            .await?;

        self.earnings
            .record(self.cfg.owner_chat_id, &month, 0, parts.owner, false)
            .await?;

        for (dev_id, share) in self.cfg.dev_chat_ids.iter().zip(parts.dev_shares.iter()) {
            self.earnings.record(*dev_id, &month, 0, *share, false).await?;
        }

        Ok(())
    }
}
