//! Configuration loader for the x402 campaign harness

use anyhow::{Context, Result};
use core_logic::{ConfigError, WalletSource};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::client::{ClientOptions, DEFAULT_MAX_PAYMENT_ATOMIC};
use crate::sequencer::SequenceConfig;
use crate::x402::network_chain_id;

/// Upper bound for any configured delay: one hour.
pub const MAX_DELAY_MS: u64 = 3_600_000;

/// Environment variable that replaces `resource_url`.
pub const RESOURCE_URL_ENV: &str = "QUICKSTART_RESOURCE_URL";

/// Harness configuration, usually `config/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    /// Paid endpoint every wallet requests
    #[serde(default = "default_resource_url")]
    pub resource_url: String,
    /// Facilitator the resource server settles through. Informational.
    #[serde(default = "default_facilitator_url")]
    pub facilitator_url: String,
    /// x402 network name the wallets pay on
    #[serde(default = "default_network")]
    pub network: String,
    /// Send an unsigned diagnostic request first
    #[serde(default = "default_true")]
    pub probe: bool,
    /// Send `x-debug` / `x-payment-debug` headers
    #[serde(default = "default_true")]
    pub debug_headers: bool,
    /// Payment ceiling in atomic units of the asset
    #[serde(
        default = "default_max_payment",
        deserialize_with = "deserialize_u128"
    )]
    pub max_payment_atomic: u128,
    /// Transport timeout; unset waits indefinitely
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub wallets: WalletSource,
    #[serde(default)]
    pub sequence: SequenceConfig,
}

fn default_resource_url() -> String {
    "http://127.0.0.1:4021/weather".to_string()
}

fn default_facilitator_url() -> String {
    "https://x402-amoy.polygon.technology".to_string()
}

fn default_network() -> String {
    "polygon-amoy".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_payment() -> u128 {
    DEFAULT_MAX_PAYMENT_ATOMIC
}

fn deserialize_u128<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct U128Visitor;

    impl<'de> serde::de::Visitor<'de> for U128Visitor {
        type Value = u128;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or integer amount in atomic units")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u128::from_str(value).map_err(|_| E::custom(format!("invalid amount '{value}'")))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value as u128)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u128::try_from(value).map_err(|_| E::custom("amount cannot be negative"))
        }
    }

    deserializer.deserialize_any(U128Visitor)
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            resource_url: default_resource_url(),
            facilitator_url: default_facilitator_url(),
            network: default_network(),
            probe: true,
            debug_headers: true,
            max_payment_atomic: DEFAULT_MAX_PAYMENT_ATOMIC,
            request_timeout_secs: None,
            wallets: WalletSource::default(),
            sequence: SequenceConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    ///
    /// Relative wallet paths are resolved against the directory holding the
    /// file, so the harness runs from the workspace root or the crate directory.
    ///
    /// # Example
    /// ```ignore
    /// let config = HarnessConfig::from_path("config/config.toml")?;
    /// ```
    pub fn from_path(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read config from {}", path))?;
        let mut config = Self::from_toml(&content)?;
        if let Some(dir) = Path::new(path).parent() {
            config.wallets = config.wallets.relative_to(dir);
        }
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `QUICKSTART_RESOURCE_URL` if it is set and non-empty.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var(RESOURCE_URL_ENV) {
            if !url.trim().is_empty() {
                self.resource_url = url.trim().to_string();
            }
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("resource_url", &self.resource_url),
            ("facilitator_url", &self.facilitator_url),
        ] {
            let parsed = Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
                field: field.to_string(),
                url: value.clone(),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidUrl {
                    field: field.to_string(),
                    url: value.clone(),
                });
            }
        }

        if network_chain_id(&self.network).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "network".to_string(),
                reason: format!("unknown x402 network '{}'", self.network),
            });
        }

        let delays = [
            ("sequence.cooldown_ms", self.sequence.cooldown_ms),
            ("sequence.group_cooldown_ms", self.sequence.group_cooldown_ms),
        ]
        .into_iter()
        .chain(
            self.sequence
                .campaigns
                .iter()
                .map(|c| ("sequence.campaigns.stagger_delay_ms", c.stagger_delay_ms)),
        );
        for (field, ms) in delays {
            if ms > MAX_DELAY_MS {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("{ms}ms exceeds the {MAX_DELAY_MS}ms limit"),
                });
            }
        }

        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Headers sent with every request.
    pub fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if self.debug_headers {
            headers.push(("x-debug".to_string(), "true".to_string()));
        }
        headers
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            probe: self.probe,
            debug_headers: self.debug_headers,
            max_payment_atomic: self.max_payment_atomic,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
