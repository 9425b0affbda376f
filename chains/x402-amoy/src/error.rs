//! Error types for the x402 harness.
//!
//! Only [`CampaignError`] ever escapes a campaign. Everything that goes wrong
//! inside a single paid request is folded into a
//! [`RequestOutcome`](crate::outcome::RequestOutcome) tagged with an
//! [`ErrorKind`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failed request.
///
/// The first three are the protocol-level outcomes. `TaskAborted` is the one
/// extra kind: it never comes from the client itself, only from the campaign
/// runner when a request task panics, so every wallet still gets an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Connection, TLS, timeout or malformed-response failure below the protocol.
    TransportError,
    /// The resource was served but its `x-payment-response` header could not be decoded.
    PaymentResponseDecodeError,
    /// The server never confirmed a payment.
    NoPaymentResponse,
    /// The request task panicked or was aborted before producing an outcome.
    TaskAborted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::TransportError => "TransportError",
            ErrorKind::PaymentResponseDecodeError => "PaymentResponseDecodeError",
            ErrorKind::NoPaymentResponse => "NoPaymentResponse",
            ErrorKind::TaskAborted => "TaskAborted",
        };
        f.write_str(name)
    }
}

/// Fatal, configuration-level errors. These abort a campaign sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CampaignError {
    #[error("Campaign requested {requested} wallets but only {available} are registered")]
    InsufficientWallets { requested: usize, available: usize },
}

/// Failure to build a payment authorization for a requirement.
#[derive(Error, Debug, Clone)]
pub enum SigningError {
    #[error("Unsupported network '{network}'")]
    UnsupportedNetwork { network: String },

    #[error("Unsupported scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    #[error("Invalid {field} in payment requirement: '{value}'")]
    InvalidRequirement { field: &'static str, value: String },

    #[error("Payment requirement for asset {asset} has no EIP-712 name/version in `extra`")]
    MissingDomain { asset: String },

    #[error("Invalid private key: {reason}")]
    InvalidKey { reason: String },

    #[error("Signer failed: {reason}")]
    Signer { reason: String },
}

/// Failure to decode an x402 header.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("header is empty")]
    Empty,

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
