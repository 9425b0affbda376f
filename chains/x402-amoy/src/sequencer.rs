//! Runs campaigns back to back with cooldowns between them.

use serde::Deserialize;
use std::time::Duration;
use tracing::{Instrument, info, info_span};

use crate::campaign::{CampaignConfig, CampaignRunner};
use crate::error::CampaignError;
use crate::summary::CampaignSummary;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SequenceConfig {
    /// Pause between campaigns with the same wallet count.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Pause before the first campaign of a new wallet count.
    #[serde(default = "default_group_cooldown_ms")]
    pub group_cooldown_ms: u64,
    #[serde(default = "default_campaigns")]
    pub campaigns: Vec<CampaignConfig>,
}

fn default_cooldown_ms() -> u64 {
    5_000
}

fn default_group_cooldown_ms() -> u64 {
    10_000
}

fn default_campaigns() -> Vec<CampaignConfig> {
    [(2, 500), (2, 1000), (2, 2000), (3, 500), (3, 1000), (3, 2000)]
        .into_iter()
        .map(|(wallets, stagger)| CampaignConfig::new(wallets, stagger))
        .collect()
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            group_cooldown_ms: default_group_cooldown_ms(),
            campaigns: default_campaigns(),
        }
    }
}

pub struct CampaignSequencer {
    runner: CampaignRunner,
    cooldown: Duration,
    group_cooldown: Duration,
}

impl CampaignSequencer {
    pub fn new(runner: CampaignRunner, cooldown: Duration, group_cooldown: Duration) -> Self {
        Self {
            runner,
            cooldown,
            group_cooldown,
        }
    }

    pub fn from_config(runner: CampaignRunner, config: &SequenceConfig) -> Self {
        Self::new(
            runner,
            Duration::from_millis(config.cooldown_ms),
            Duration::from_millis(config.group_cooldown_ms),
        )
    }

    /// Runs `campaigns` in order and returns their summaries.
    ///
    /// A campaign that needs more wallets than are registered stops the
    /// sequence before its cooldown and before any of its requests.
    pub async fn run(
        &self,
        campaigns: &[CampaignConfig],
    ) -> Result<Vec<CampaignSummary>, CampaignError> {
        let mut summaries = Vec::with_capacity(campaigns.len());
        let mut previous: Option<&CampaignConfig> = None;

        for (n, config) in campaigns.iter().enumerate() {
            self.runner.registry().ensure_capacity(config.wallet_count)?;

            let new_group = previous.is_none_or(|p| p.wallet_count != config.wallet_count);
            if let Some(p) = previous {
                let pause = if p.wallet_count != config.wallet_count {
                    self.group_cooldown
                } else {
                    self.cooldown
                };
                info!("Cooling down for {}ms", pause.as_millis());
                tokio::time::sleep(pause).await;
            }
            if new_group {
                info!("=== Testing with {} Wallets ===", config.wallet_count);
            }

            info!(
                "Campaign {}/{}: {} wallets, {}ms delay",
                n + 1,
                campaigns.len(),
                config.wallet_count,
                config.stagger_delay_ms
            );
            let summary = self
                .runner
                .run_campaign(config)
                .instrument(info_span!("campaign", n = n + 1))
                .await?;
            summary.log();
            summaries.push(summary);
            previous = Some(config);
        }

        info!("All campaigns completed");
        Ok(summaries)
    }
}
