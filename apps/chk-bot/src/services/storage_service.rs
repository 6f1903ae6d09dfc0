use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::BotConfig;

/// Uploads payment proof photos to the object store over plain HTTP PUT
/// and hands back the public URL admins can open.
#[derive(Clone)]
pub struct ProofStorage {
    client: reqwest::Client,
    cfg: Arc<BotConfig>,
}

impl ProofStorage {
    pub fn new(cfg: Arc<BotConfig>) -> Self {
        Self {
            client: reqwest::Client::new(),
            cfg,
        }
    }

    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let put_url = format!(
            "{}/{}",
            self.cfg.storage_url.trim_end_matches('/'),
            file_name
        );

        let resp = self
            .client
            .put(&put_url)
            .header("Content-Type", "image/jpeg")
            .body(bytes)
            .send()
            .await
            .context("Failed to upload payment proof")?;

        if !resp.status().is_success() {
            anyhow::bail!("Proof storage returned status {}", resp.status());
        }

        Ok(format!(
            "{}/{}",
            self.cfg.storage_public_url.trim_end_matches('/'),
            file_name
        ))
    }
}
