//! Per-request results.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::error::ErrorKind;
use crate::transport::{HttpResponse, TransportError};
use crate::x402::PaymentRequirements;

/// Progress of one paid request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    Init,
    UnsignedProbeSent,
    ChallengeEvaluated,
    PaidAndConfirmed,
    PaymentDeclinedOrFailed,
    TransportFailed,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::PaidAndConfirmed
                | RequestState::PaymentDeclinedOrFailed
                | RequestState::TransportFailed
        )
    }

    /// Moves to `next`, logging the transition.
    pub(crate) fn advance(&mut self, next: RequestState) {
        debug!(from = %self, to = %next, "request state");
        *self = next;
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Init => "INIT",
            RequestState::UnsignedProbeSent => "UNSIGNED_PROBE_SENT",
            RequestState::ChallengeEvaluated => "CHALLENGE_EVALUATED",
            RequestState::PaidAndConfirmed => "PAID_AND_CONFIRMED",
            RequestState::PaymentDeclinedOrFailed => "PAYMENT_DECLINED_OR_FAILED",
            RequestState::TransportFailed => "TRANSPORT_FAILED",
        };
        f.write_str(name)
    }
}

/// What the unsigned diagnostic request saw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeSnapshot {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON when possible, otherwise the raw text.
    pub body: Value,
}

impl From<&HttpResponse> for ProbeSnapshot {
    fn from(resp: &HttpResponse) -> Self {
        Self {
            status: resp.status,
            headers: resp.headers.clone(),
            body: serde_json::from_str(&resp.body).unwrap_or_else(|_| Value::String(resp.body.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoPaymentDetails {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    /// Every requirement offered across the attempt.
    pub requirements: Vec<PaymentRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeDetails {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_payment_response: Option<String>,
}

/// Diagnostics attached to a failed outcome. The variant follows the [`ErrorKind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FailureDetails {
    NoPayment(NoPaymentDetails),
    Decode(DecodeDetails),
    Transport(TransportError),
    Aborted { message: String },
}

impl FailureDetails {
    pub fn status(&self) -> Option<u16> {
        match self {
            FailureDetails::NoPayment(d) => Some(d.status),
            FailureDetails::Decode(d) => Some(d.status),
            FailureDetails::Transport(_) | FailureDetails::Aborted { .. } => None,
        }
    }
}

/// Result of one wallet's request. Exactly one per wallet per campaign.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOutcome {
    pub wallet_index: usize,
    pub address: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FailureDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeSnapshot>,
    pub state: RequestState,
    pub launched_after_ms: u64,
    pub duration_ms: u64,
}

impl RequestOutcome {
    pub fn paid(wallet_index: usize, address: &str, tx_hash: String) -> Self {
        Self {
            wallet_index,
            address: address.to_string(),
            success: true,
            tx_hash: Some(tx_hash),
            error: None,
            error_kind: None,
            details: None,
            probe: None,
            state: RequestState::PaidAndConfirmed,
            launched_after_ms: 0,
            duration_ms: 0,
        }
    }

    pub fn failed(
        wallet_index: usize,
        address: &str,
        kind: ErrorKind,
        error: String,
        details: FailureDetails,
    ) -> Self {
        let state = match kind {
            ErrorKind::TransportError => RequestState::TransportFailed,
            _ => RequestState::PaymentDeclinedOrFailed,
        };
        Self {
            wallet_index,
            address: address.to_string(),
            success: false,
            tx_hash: None,
            error: Some(error),
            error_kind: Some(kind),
            details: Some(details),
            probe: None,
            state,
            launched_after_ms: 0,
            duration_ms: 0,
        }
    }

    /// Outcome for a request task that never returned.
    pub fn aborted(wallet_index: usize, address: &str, message: String) -> Self {
        Self::failed(
            wallet_index,
            address,
            ErrorKind::TaskAborted,
            format!("Request task aborted: {message}"),
            FailureDetails::Aborted { message },
        )
    }

    pub fn with_probe(mut self, probe: Option<ProbeSnapshot>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    pub fn with_launch_offset(mut self, offset: Duration) -> Self {
        self.launched_after_ms = offset.as_millis() as u64;
        self
    }

    /// HTTP status of the final response, when the failure saw one.
    pub fn status(&self) -> Option<u16> {
        self.details.as_ref().and_then(FailureDetails::status)
    }

    pub fn terminal_state(&self) -> RequestState {
        self.state
    }

    /// "Wallet N", one-based like the console report.
    pub fn label(&self) -> String {
        format!("Wallet {}", self.wallet_index + 1)
    }
}
