//! x402 Amoy - multi-wallet x402 payment campaign harness
//!
//! Drives concurrent, payment-gated HTTP requests against an x402 resource
//! server. Each wallet fetches the resource, answers the server's `402 Payment
//! Required` challenge with a signed EIP-3009 authorization, and reports the
//! settlement transaction it got back.
//!
//! # Architecture
//!
//! - **[`PaymentAwareClient`]**: one challenge/resubmit cycle per request
//! - **[`WalletRegistry`]**: ordered, immutable wallet identities
//! - **[`CampaignRunner`]**: staggered launch of one request per wallet
//! - **[`CampaignSummary`]**: per-campaign counts and console report
//! - **[`CampaignSequencer`]**: campaigns back to back with cooldowns
//!
//! # Quick Start
//!
//! ```bash
//! # Run the default six-campaign plan against a local resource server
//! cargo run -p x402-amoy --bin x402-campaign
//!
//! # Point at another server and skip the diagnostic probe
//! cargo run -p x402-amoy --bin x402-campaign -- --resource-url http://localhost:4021/weather --no-probe
//! ```
//!
//! # Configuration
//!
//! See `config/config.toml`. `QUICKSTART_RESOURCE_URL` overrides the resource
//! URL and `WALLET_PASSWORD` unlocks encrypted wallet files.

pub mod campaign;
pub mod client;
pub mod config;
pub mod error;
pub mod outcome;
pub mod sequencer;
pub mod summary;
pub mod transport;
pub mod wallet;
pub mod x402;

pub use campaign::{CampaignConfig, CampaignRunner};
pub use client::{ClientOptions, PaymentAwareClient, ResourceRequest, ResourceRequester};
pub use config::HarnessConfig;
pub use error::{CampaignError, DecodeError, ErrorKind, SigningError};
pub use outcome::{FailureDetails, ProbeSnapshot, RequestOutcome, RequestState};
pub use sequencer::{CampaignSequencer, SequenceConfig};
pub use summary::CampaignSummary;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use wallet::{WalletIdentity, WalletRegistry};
