//! Wallet identities and the registry campaigns draw from.

use anyhow::{Context, Result};
use core_logic::WalletManager;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::error::CampaignError;
use crate::x402::{EvmExactSigner, PaymentSigner};

/// An address plus the ability to sign payments for it.
pub struct WalletIdentity {
    pub index: usize,
    pub address: String,
    pub signer: Arc<dyn PaymentSigner>,
}

impl WalletIdentity {
    pub fn new(index: usize, signer: Arc<dyn PaymentSigner>) -> Self {
        Self {
            index,
            address: signer.address(),
            signer,
        }
    }

    pub fn label(&self) -> String {
        format!("Wallet {}", self.index + 1)
    }
}

impl fmt::Debug for WalletIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletIdentity")
            .field("index", &self.index)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Immutable, ordered set of identities. Cheap to clone.
#[derive(Clone, Debug)]
pub struct WalletRegistry {
    wallets: Arc<[Arc<WalletIdentity>]>,
}

impl WalletRegistry {
    /// Identities are indexed in the order given.
    pub fn new<I>(signers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn PaymentSigner>>,
    {
        let wallets: Vec<Arc<WalletIdentity>> = signers
            .into_iter()
            .enumerate()
            .map(|(i, signer)| Arc::new(WalletIdentity::new(i, signer)))
            .collect();
        Self {
            wallets: wallets.into(),
        }
    }

    /// Decrypts every wallet the manager knows and builds an `exact` signer for `network`.
    pub async fn from_manager(
        manager: &WalletManager,
        password: Option<&str>,
        network: &str,
    ) -> Result<Self> {
        let decrypted = manager
            .load_all(password)
            .await
            .context("Failed to load wallets")?;

        let mut signers: Vec<Arc<dyn PaymentSigner>> = Vec::with_capacity(decrypted.len());
        for (i, wallet) in decrypted.iter().enumerate() {
            let signer = EvmExactSigner::new(&wallet.evm_private_key, network)
                .with_context(|| format!("Wallet {} has an unusable key", i + 1))?;
            signers.push(Arc::new(signer));
        }

        let registry = Self::new(signers);
        info!("Loaded {} wallet(s) for {}", registry.len(), network);
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<WalletIdentity>> {
        self.wallets.get(index)
    }

    pub fn ensure_capacity(&self, requested: usize) -> Result<(), CampaignError> {
        if requested > self.wallets.len() {
            return Err(CampaignError::InsufficientWallets {
                requested,
                available: self.wallets.len(),
            });
        }
        Ok(())
    }

    /// The first `count` identities.
    pub fn select(&self, count: usize) -> Result<&[Arc<WalletIdentity>], CampaignError> {
        self.ensure_capacity(count)?;
        Ok(&self.wallets[..count])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<WalletIdentity>> {
        self.wallets.iter()
    }
}
