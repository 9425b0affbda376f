//! One campaign: a staggered burst of paid requests, one per wallet.

use core_logic::WorkerRunner;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, info_span};

use crate::client::ResourceRequester;
use crate::error::CampaignError;
use crate::outcome::RequestOutcome;
use crate::summary::CampaignSummary;
use crate::wallet::WalletRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CampaignConfig {
    /// Wallets `0..wallet_count` of the registry take part.
    pub wallet_count: usize,
    /// Launch offset between consecutive wallets.
    pub stagger_delay_ms: u64,
}

impl CampaignConfig {
    pub fn new(wallet_count: usize, stagger_delay_ms: u64) -> Self {
        Self {
            wallet_count,
            stagger_delay_ms,
        }
    }

    pub fn stagger_delay(&self) -> Duration {
        Duration::from_millis(self.stagger_delay_ms)
    }
}

#[derive(Clone)]
pub struct CampaignRunner {
    registry: WalletRegistry,
    requester: Arc<dyn ResourceRequester>,
}

impl CampaignRunner {
    pub fn new(registry: WalletRegistry, requester: Arc<dyn ResourceRequester>) -> Self {
        Self {
            registry,
            requester,
        }
    }

    pub fn registry(&self) -> &WalletRegistry {
        &self.registry
    }

    /// Runs one campaign and waits for every request.
    ///
    /// Fails before any request is sent if the registry is too small.
    pub async fn run_campaign(
        &self,
        config: &CampaignConfig,
    ) -> Result<CampaignSummary, CampaignError> {
        let wallets = self.registry.select(config.wallet_count)?.to_vec();

        info!(
            "Launching {} request(s), {}ms apart",
            config.wallet_count, config.stagger_delay_ms
        );
        let start = Instant::now();

        let reports = WorkerRunner::run_staggered(config.wallet_count, config.stagger_delay(), |i| {
            let wallet = wallets[i].clone();
            let requester = self.requester.clone();
            let span = info_span!("wallet", index = i + 1, address = %wallet.address);
            (async move { requester.request(&wallet).await }, span)
        })
        .await;

        let outcomes: Vec<RequestOutcome> = reports
            .into_iter()
            .map(|report| {
                let wallet = &wallets[report.index];
                let outcome = report.output.unwrap_or_else(|message| {
                    RequestOutcome::aborted(wallet.index, &wallet.address, message)
                });
                outcome.with_launch_offset(report.launched_after)
            })
            .collect();

        Ok(CampaignSummary::new(*config, outcomes, start.elapsed()))
    }
}
