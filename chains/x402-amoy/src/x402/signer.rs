//! Payment authorization signing for the x402 `exact` EVM scheme.
//!
//! The scheme pays with an EIP-3009 `transferWithAuthorization`: the payer signs
//! EIP-712 typed data over the transfer, and the facilitator submits it on chain.
//! All cryptography is delegated to alloy.

use alloy::signers::Signer;
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, B256, U256, hex};
use alloy_sol_types::{Eip712Domain, SolStruct, sol};
use async_trait::async_trait;
use std::str::FromStr;

use super::types::{
    EXACT_SCHEME, ExactEvmAuthorization, ExactEvmPayload, PaymentPayload, PaymentRequirements,
    X402_VERSION,
};
use crate::error::SigningError;

sol! {
    #[derive(Debug)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
}

/// Backdating applied to `validAfter` to tolerate clock skew with the facilitator.
const VALID_AFTER_SKEW_SECS: u64 = 600;
/// Lower bound for the authorization lifetime when the server asks for less.
const MIN_VALIDITY_SECS: u64 = 60;

/// The signing capability of a wallet identity.
#[async_trait]
pub trait PaymentSigner: Send + Sync {
    /// Checksummed payer address.
    fn address(&self) -> String;

    /// Whether this signer can pay the given requirement at all.
    fn supports(&self, requirement: &PaymentRequirements) -> bool;

    /// Builds a single-use authorization for `requirement`.
    async fn sign(&self, requirement: &PaymentRequirements)
    -> Result<PaymentPayload, SigningError>;
}

/// x402 network names and their EVM chain ids.
pub fn network_chain_id(network: &str) -> Option<u64> {
    match network {
        "polygon-amoy" => Some(80002),
        "polygon" => Some(137),
        "base-sepolia" => Some(84532),
        "base" => Some(8453),
        "avalanche-fuji" => Some(43113),
        "avalanche" => Some(43114),
        "iotex" => Some(4689),
        "sei" => Some(1329),
        "sei-testnet" => Some(1328),
        _ => None,
    }
}

/// [`PaymentSigner`] for the `exact` scheme backed by a local private key.
#[derive(Clone)]
pub struct EvmExactSigner {
    signer: PrivateKeySigner,
    network: String,
    chain_id: u64,
}

impl std::fmt::Debug for EvmExactSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmExactSigner")
            .field("address", &self.signer.address())
            .field("network", &self.network)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl EvmExactSigner {
    pub fn new(private_key: &str, network: &str) -> Result<Self, SigningError> {
        let chain_id = network_chain_id(network).ok_or_else(|| SigningError::UnsupportedNetwork {
            network: network.to_string(),
        })?;
        let signer: PrivateKeySigner =
            private_key
                .parse()
                .map_err(|e: alloy::signers::local::LocalSignerError| SigningError::InvalidKey {
                    reason: e.to_string(),
                })?;

        Ok(Self {
            signer,
            network: network.to_string(),
            chain_id,
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Typed data for `requirement`, valid from `now - skew` to `now + maxTimeoutSeconds`.
    fn authorization(
        &self,
        requirement: &PaymentRequirements,
        now: u64,
        nonce: B256,
    ) -> Result<(TransferWithAuthorization, Eip712Domain), SigningError> {
        let to = parse_address("payTo", &requirement.pay_to)?;
        let asset = parse_address("asset", &requirement.asset)?;
        let value = U256::from_str_radix(&requirement.max_amount_required, 10).map_err(|_| {
            SigningError::InvalidRequirement {
                field: "maxAmountRequired",
                value: requirement.max_amount_required.clone(),
            }
        })?;
        let (name, version) =
            requirement
                .eip712_domain_info()
                .ok_or_else(|| SigningError::MissingDomain {
                    asset: requirement.asset.clone(),
                })?;

        let valid_after = now.saturating_sub(VALID_AFTER_SKEW_SECS);
        let valid_before = now + requirement.max_timeout_seconds.max(MIN_VALIDITY_SECS);

        let message = TransferWithAuthorization {
            from: self.signer.address(),
            to,
            value,
            validAfter: U256::from(valid_after),
            validBefore: U256::from(valid_before),
            nonce,
        };
        let domain = Eip712Domain::new(
            Some(name.into()),
            Some(version.into()),
            Some(U256::from(self.chain_id)),
            Some(asset),
            None,
        );
        Ok((message, domain))
    }
}

#[async_trait]
impl PaymentSigner for EvmExactSigner {
    fn address(&self) -> String {
        self.signer.address().to_checksum(None)
    }

    fn supports(&self, requirement: &PaymentRequirements) -> bool {
        requirement.scheme == EXACT_SCHEME && requirement.network == self.network
    }

    async fn sign(
        &self,
        requirement: &PaymentRequirements,
    ) -> Result<PaymentPayload, SigningError> {
        if requirement.scheme != EXACT_SCHEME {
            return Err(SigningError::UnsupportedScheme {
                scheme: requirement.scheme.clone(),
            });
        }
        if requirement.network != self.network {
            return Err(SigningError::UnsupportedNetwork {
                network: requirement.network.clone(),
            });
        }

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        // Fresh per authorization; the token contract rejects a reused nonce
        let nonce = B256::from(rand::random::<[u8; 32]>());
        let (message, domain) = self.authorization(requirement, now, nonce)?;

        let hash = message.eip712_signing_hash(&domain);
        let signature = self
            .signer
            .sign_hash(&hash)
            .await
            .map_err(|e| SigningError::Signer {
                reason: e.to_string(),
            })?;

        Ok(PaymentPayload {
            x402_version: X402_VERSION,
            scheme: requirement.scheme.clone(),
            network: requirement.network.clone(),
            payload: ExactEvmPayload {
                signature: hex::encode_prefixed(signature.as_bytes()),
                authorization: ExactEvmAuthorization {
                    from: message.from.to_checksum(None),
                    to: message.to.to_checksum(None),
                    value: message.value.to_string(),
                    valid_after: message.validAfter.to_string(),
                    valid_before: message.validBefore.to_string(),
                    nonce: hex::encode_prefixed(message.nonce),
                },
            },
        })
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, SigningError> {
    Address::from_str(value).map_err(|_| SigningError::InvalidRequirement {
        field,
        value: value.to_string(),
    })
}
