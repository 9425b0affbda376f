//! Reduction of a campaign's outcomes into a report.

use core_logic::RESULT_TARGET;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::info;

use crate::campaign::CampaignConfig;
use crate::outcome::RequestOutcome;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSummary {
    pub config: CampaignConfig,
    /// In launch order.
    pub outcomes: Vec<RequestOutcome>,
    pub elapsed_ms: u64,
    pub success_count: usize,
    pub failure_count: usize,
}

impl CampaignSummary {
    pub fn new(config: CampaignConfig, outcomes: Vec<RequestOutcome>, elapsed: Duration) -> Self {
        let success_count = outcomes.iter().filter(|o| o.success).count();
        let failure_count = outcomes.len() - success_count;
        Self {
            config,
            outcomes,
            elapsed_ms: elapsed.as_millis() as u64,
            success_count,
            failure_count,
        }
    }

    pub fn successes(&self) -> impl Iterator<Item = &RequestOutcome> {
        self.outcomes.iter().filter(|o| o.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RequestOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }

    /// Fraction of successful requests, `0.0` for an empty campaign.
    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.success_count as f64 / self.outcomes.len() as f64
    }

    /// Writes the report to the result log, one event per line.
    pub fn log(&self) {
        for line in self.to_string().lines() {
            info!(target: RESULT_TARGET, "{}", line);
        }
    }
}

impl fmt::Display for CampaignSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Results: {} wallets, {}ms stagger",
            self.config.wallet_count, self.config.stagger_delay_ms
        )?;
        writeln!(f, "Total time: {} seconds", self.elapsed_ms as f64 / 1000.0)?;
        writeln!(f, "Successful transactions: {}", self.success_count)?;
        write!(f, "Failed transactions: {}", self.failure_count)?;

        for o in &self.outcomes {
            writeln!(f)?;
            if o.success {
                write!(
                    f,
                    "{} ({}): Success - TX: {}",
                    o.label(),
                    o.address,
                    o.tx_hash.as_deref().unwrap_or_default()
                )?;
            } else {
                let kind = o.error_kind.map(|k| k.to_string()).unwrap_or_default();
                write!(
                    f,
                    "{} ({}): Failed - [{}] {}",
                    o.label(),
                    o.address,
                    kind,
                    o.error.as_deref().unwrap_or_default()
                )?;
            }
        }
        Ok(())
    }
}
