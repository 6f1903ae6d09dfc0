use anyhow::{Context, Result};
use std::env;

/// Commission recipients and proof-storage endpoints. All of this is
/// required at startup; a missing variable halts the process.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Receives the fixed 60% cut of every sale.
    pub owner_chat_id: i64,
    /// Fixed dev list; the 20% pool is split evenly across it.
    pub dev_chat_ids: Vec<i64>,
    /// Base URL payment-proof images are PUT to.
    pub storage_url: String,
    /// Public base URL the stored images are served from.
    pub storage_public_url: String,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        let owner_chat_id = env::var("OWNER_CHAT_ID")
            .context("OWNER_CHAT_ID is not set")?
            .parse::<i64>()
            .context("OWNER_CHAT_ID must be a chat id")?;

        let dev_chat_ids = env::var("DEV_CHAT_IDS")
            .context("DEV_CHAT_IDS is not set")?
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse::<i64>()
                    .with_context(|| format!("Invalid dev chat id: {s}"))
            })
            .collect::<Result<Vec<i64>>>()?;

        if dev_chat_ids.is_empty() {
            return Err(anyhow::anyhow!("DEV_CHAT_IDS must list at least one dev"));
        }

        let storage_url = env::var("PROOF_STORAGE_URL").context("PROOF_STORAGE_URL is not set")?;
        let storage_public_url =
            env::var("PROOF_PUBLIC_URL").unwrap_or_else(|_| storage_url.clone());

        Ok(Self {
            owner_chat_id,
            dev_chat_ids,
            storage_url,
            storage_public_url,
        })
    }
}
