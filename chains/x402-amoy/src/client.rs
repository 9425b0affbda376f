//! The x402 payment-aware client.
//!
//! [`PaymentAwareClient::request_resource`] performs at most one
//! challenge/resubmit cycle for one wallet and folds every failure into the
//! returned [`RequestOutcome`]. It never returns an error.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::ErrorKind;
use crate::outcome::{
    DecodeDetails, FailureDetails, NoPaymentDetails, ProbeSnapshot, RequestOutcome, RequestState,
};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::wallet::WalletIdentity;
use crate::x402::types::{DEBUG_INFO_HEADER, PAYMENT_HEADER, PAYMENT_RESPONSE_HEADER};
use crate::x402::{
    PaymentRequiredBody, PaymentRequirements, ResponseBody, decode_payment_response,
    encode_payment_header,
};

/// 0.10 USDC in atomic units (6 decimals).
pub const DEFAULT_MAX_PAYMENT_ATOMIC: u128 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Send an unsigned diagnostic request before the protocol request.
    pub probe: bool,
    /// Ask the server for debug output (`x-payment-debug: true`).
    pub debug_headers: bool,
    /// Requirements above this amount are never paid.
    pub max_payment_atomic: u128,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            probe: true,
            debug_headers: true,
            max_payment_atomic: DEFAULT_MAX_PAYMENT_ATOMIC,
        }
    }
}

/// A failed attempt, before it is bound to a wallet.
#[derive(Debug)]
struct Failure {
    kind: ErrorKind,
    error: String,
    details: FailureDetails,
}

impl Failure {
    fn no_payment(
        reason: impl std::fmt::Display,
        response: &HttpResponse,
        body: Value,
        requirements: Vec<PaymentRequirements>,
    ) -> Self {
        Self {
            kind: ErrorKind::NoPaymentResponse,
            error: format!("No payment response: {reason}"),
            details: FailureDetails::NoPayment(NoPaymentDetails {
                status: response.status,
                headers: response.headers.clone(),
                body,
                requirements,
                debug_info: response.header(DEBUG_INFO_HEADER).map(str::to_string),
            }),
        }
    }

    fn decode(reason: impl std::fmt::Display, response: &HttpResponse) -> Self {
        Self {
            kind: ErrorKind::PaymentResponseDecodeError,
            error: format!("Payment response decode failed: {reason}"),
            details: FailureDetails::Decode(DecodeDetails {
                status: response.status,
                headers: response.headers.clone(),
                raw_payment_response: response.header(PAYMENT_RESPONSE_HEADER).map(str::to_string),
            }),
        }
    }
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        let error = if err.message.is_empty() {
            err.error_type.clone()
        } else {
            err.message.clone()
        };
        Self {
            kind: ErrorKind::TransportError,
            error,
            details: FailureDetails::Transport(err),
        }
    }
}

pub struct PaymentAwareClient {
    transport: Arc<dyn HttpTransport>,
    options: ClientOptions,
}

impl PaymentAwareClient {
    pub fn new(transport: Arc<dyn HttpTransport>, options: ClientOptions) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Fetches `url` on behalf of `wallet`, paying if challenged.
    pub async fn request_resource(
        &self,
        url: &str,
        headers: &[(String, String)],
        wallet: &WalletIdentity,
    ) -> RequestOutcome {
        let started = Instant::now();
        let mut state = RequestState::Init;

        let probe = if self.options.probe {
            state.advance(RequestState::UnsignedProbeSent);
            self.probe(url, headers).await
        } else {
            None
        };

        let outcome = match self.pay_for_resource(url, headers, wallet, &mut state).await {
            Ok(tx_hash) => RequestOutcome::paid(wallet.index, &wallet.address, tx_hash),
            Err(f) => RequestOutcome::failed(wallet.index, &wallet.address, f.kind, f.error, f.details),
        };
        state.advance(outcome.terminal_state());

        match &outcome.error {
            None => debug!(
                "{} paid, tx {}",
                wallet.label(),
                outcome.tx_hash.as_deref().unwrap_or_default()
            ),
            Some(error) => debug!("{} failed: {}", wallet.label(), error),
        }

        outcome
            .with_probe(probe)
            .with_duration(started.elapsed())
    }

    /// Unsigned request whose result is only recorded.
    async fn probe(&self, url: &str, headers: &[(String, String)]) -> Option<ProbeSnapshot> {
        match self.transport.send(&HttpRequest::get(url, headers)).await {
            Ok(resp) => {
                debug!(
                    "Probe: status {}, headers {:?}, body {}",
                    resp.status, resp.headers, resp.body
                );
                Some(ProbeSnapshot::from(&resp))
            }
            Err(e) => {
                warn!("Probe request failed: {}", e);
                None
            }
        }
    }

    async fn pay_for_resource(
        &self,
        url: &str,
        headers: &[(String, String)],
        wallet: &WalletIdentity,
        state: &mut RequestState,
    ) -> Result<String, Failure> {
        let mut request = HttpRequest::get(url, headers);
        if self.options.debug_headers {
            request = request.with_header("x-payment-debug", "true");
        }

        let response = self.transport.send(&request).await?;
        log_debug_info(&response);
        let body = response.json()?;

        let challenge = match ResponseBody::classify(&body) {
            ResponseBody::PaidSuccess { .. } => return confirm_payment(&response),
            ResponseBody::Challenge(challenge) if response.status == 402 => challenge,
            other => {
                let seen = match &other {
                    ResponseBody::Challenge(c) => c.accepts.clone(),
                    _ => Vec::new(),
                };
                return Err(unexpected(other, &response, body, seen));
            }
        };
        state.advance(RequestState::ChallengeEvaluated);

        let mut seen = challenge.accepts.clone();
        let Some(requirement) = self.select_requirement(&challenge, wallet) else {
            let reason = format!(
                "none of {} payment requirement(s) can be paid by {} on its network within {} atomic units",
                challenge.accepts.len(),
                wallet.address,
                self.options.max_payment_atomic
            );
            return Err(Failure::no_payment(reason, &response, body, seen));
        };
        debug!(
            "Paying {} of {} to {} on {}",
            requirement.max_amount_required, requirement.asset, requirement.pay_to, requirement.network
        );

        let payment = match wallet.signer.sign(requirement).await {
            Ok(payload) => encode_payment_header(&payload)
                .map_err(|e| format!("failed to encode payment header: {e}")),
            Err(e) => Err(format!("signing failed: {e}")),
        };
        let payment = match payment {
            Ok(header) => header,
            Err(reason) => return Err(Failure::no_payment(reason, &response, body, seen)),
        };

        let paid_request = request
            .with_header(PAYMENT_HEADER, payment)
            .with_header("Access-Control-Expose-Headers", "X-PAYMENT-RESPONSE");
        let response = self.transport.send(&paid_request).await?;
        log_debug_info(&response);
        let body = response.json()?;

        match ResponseBody::classify(&body) {
            ResponseBody::PaidSuccess { .. } => confirm_payment(&response),
            ResponseBody::Challenge(second) => {
                seen.extend(second.accepts);
                Err(Failure::no_payment(
                    "server rejected the payment and challenged again",
                    &response,
                    body,
                    seen,
                ))
            }
            other => Err(unexpected(other, &response, body, seen)),
        }
    }

    /// First requirement the wallet can sign whose amount is within the ceiling.
    fn select_requirement<'a>(
        &self,
        challenge: &'a PaymentRequiredBody,
        wallet: &WalletIdentity,
    ) -> Option<&'a PaymentRequirements> {
        challenge.accepts.iter().find(|r| {
            wallet.signer.supports(r)
                && r
                    .max_amount()
                    .is_some_and(|amount| amount <= self.options.max_payment_atomic)
        })
    }
}

fn confirm_payment(response: &HttpResponse) -> Result<String, Failure> {
    let Some(raw) = response.header(PAYMENT_RESPONSE_HEADER) else {
        return Err(Failure::decode("missing x-payment-response header", response));
    };
    let settlement = decode_payment_response(raw).map_err(|e| Failure::decode(e, response))?;

    if settlement.transaction.is_empty() {
        let reason = match settlement.error_reason.as_deref() {
            Some(r) => format!("settlement has no transaction hash ({r})"),
            None => "settlement has no transaction hash".to_string(),
        };
        return Err(Failure::decode(reason, response));
    }
    if !settlement.success {
        warn!(
            "Settlement for {} reported success=false: {:?}",
            settlement.transaction, settlement.error_reason
        );
    }
    Ok(settlement.transaction)
}

fn unexpected(
    body_kind: ResponseBody,
    response: &HttpResponse,
    body: Value,
    requirements: Vec<PaymentRequirements>,
) -> Failure {
    let reason = match &body_kind {
        ResponseBody::Unknown { error: Some(Value::String(e)) } => e.clone(),
        ResponseBody::Unknown { error: Some(e) } => e.to_string(),
        _ => format!(
            "unexpected {} response with status {}",
            body_kind.variant_name(),
            response.status
        ),
    };
    Failure::no_payment(reason, response, body, requirements)
}

fn log_debug_info(response: &HttpResponse) {
    if let Some(info) = response.header(DEBUG_INFO_HEADER) {
        debug!("Server debug info: {}", info);
    }
}

/// Performs the campaign's request for one wallet.
#[async_trait]
pub trait ResourceRequester: Send + Sync {
    async fn request(&self, wallet: &WalletIdentity) -> RequestOutcome;
}

/// A fixed resource fetched through a shared client.
pub struct ResourceRequest {
    client: Arc<PaymentAwareClient>,
    url: String,
    headers: Vec<(String, String)>,
}

impl ResourceRequest {
    pub fn new(client: Arc<PaymentAwareClient>, url: impl Into<String>, headers: Vec<(String, String)>) -> Self {
        Self {
            client,
            url: url.into(),
            headers,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ResourceRequester for ResourceRequest {
    async fn request(&self, wallet: &WalletIdentity) -> RequestOutcome {
        self.client
            .request_resource(&self.url, &self.headers, wallet)
            .await
    }
}
