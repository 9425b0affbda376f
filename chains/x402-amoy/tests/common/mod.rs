//! Shared fixtures: a scripted in-memory transport, a fake x402 resource
//! server and development wallets.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use x402_amoy::x402::codec::{decode_payment_header, encode_payment_response};
use x402_amoy::x402::{
    EvmExactSigner, ExactEvmAuthorization, ExactEvmPayload, PaymentPayload, PaymentRequirements,
    PaymentSigner, SettlementResponse,
};
use x402_amoy::{
    ClientOptions, HttpRequest, HttpResponse, HttpTransport, PaymentAwareClient, RequestOutcome,
    ResourceRequest, ResourceRequester, SigningError, TransportError, WalletIdentity,
    WalletRegistry,
};

/// Anvil development accounts 0..3.
pub const DEV_KEYS: [&str; 3] = [
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdc4a9b6",
];

pub const RESOURCE_URL: &str = "http://127.0.0.1:4021/weather";
pub const USDC_AMOY: &str = "0x41E94Eb019C0762f9Bfcf9Fb1E58725BfB0e7582";
pub const PAY_TO: &str = "0x90f79bf6eb2c4f870365e785982e1f101e93b906";

pub fn requirement(amount: &str) -> PaymentRequirements {
    PaymentRequirements {
        scheme: "exact".to_string(),
        network: "polygon-amoy".to_string(),
        max_amount_required: amount.to_string(),
        resource: RESOURCE_URL.to_string(),
        description: "Weather report".to_string(),
        mime_type: "application/json".to_string(),
        pay_to: PAY_TO.to_string(),
        max_timeout_seconds: 60,
        asset: USDC_AMOY.to_string(),
        extra: Some(json!({ "name": "USDC", "version": "2" })),
        ..Default::default()
    }
}

pub fn challenge_body(accepts: &[PaymentRequirements]) -> String {
    json!({
        "x402Version": 1,
        "error": "X-PAYMENT header is required",
        "accepts": accepts,
    })
    .to_string()
}

pub fn report_body() -> String {
    json!({ "report": { "weather": "sunny", "temperature": 70 } }).to_string()
}

pub fn settlement_header(transaction: &str) -> String {
    encode_payment_response(&SettlementResponse {
        success: true,
        transaction: transaction.to_string(),
        network: "polygon-amoy".to_string(),
        payer: None,
        error_reason: None,
    })
    .unwrap()
}

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Answers every request from a closure and records what it was sent.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<HttpRequest>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests that carried an `X-PAYMENT` header, decoded.
    pub fn payments(&self) -> Vec<PaymentPayload> {
        self.requests()
            .iter()
            .filter_map(|r| r.header("X-PAYMENT"))
            .map(|raw| decode_payment_header(raw).unwrap())
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

/// A resource server that challenges unpaid requests and settles every paid
/// one. The transaction hash is derived from the authorization nonce, so each
/// payment gets its own.
pub fn paying_server(
    accepts: Vec<PaymentRequirements>,
) -> impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static {
    move |req| match req.header("X-PAYMENT") {
        None => Ok(HttpResponse::new(402, challenge_body(&accepts))),
        Some(raw) => {
            let payload = decode_payment_header(raw)
                .map_err(|e| TransportError::new("TestServer", e.to_string()))?;
            let tx = format!(
                "0x{}",
                payload.payload.authorization.nonce.trim_start_matches("0x")
            );
            Ok(HttpResponse::new(200, report_body())
                .with_header("X-PAYMENT-RESPONSE", settlement_header(&tx)))
        }
    }
}

pub fn no_probe() -> ClientOptions {
    ClientOptions {
        probe: false,
        ..Default::default()
    }
}

pub fn client(transport: Arc<ScriptedTransport>, options: ClientOptions) -> Arc<PaymentAwareClient> {
    Arc::new(PaymentAwareClient::new(transport, options))
}

pub fn headers() -> Vec<(String, String)> {
    vec![
        ("Accept".to_string(), "application/json".to_string()),
        ("x-debug".to_string(), "true".to_string()),
    ]
}

pub fn requester(client: Arc<PaymentAwareClient>) -> Arc<dyn ResourceRequester> {
    Arc::new(ResourceRequest::new(client, RESOURCE_URL, headers()))
}

pub fn dev_registry(count: usize) -> WalletRegistry {
    WalletRegistry::new(DEV_KEYS.iter().take(count).map(|k| {
        Arc::new(EvmExactSigner::new(k, "polygon-amoy").unwrap()) as Arc<dyn PaymentSigner>
    }))
}

pub fn dev_wallet(index: usize) -> WalletIdentity {
    let signer = EvmExactSigner::new(DEV_KEYS[index], "polygon-amoy").unwrap();
    WalletIdentity::new(index, Arc::new(signer))
}

/// Signer that never touches real keys. Optionally refuses to sign.
pub struct FakeSigner {
    pub address: String,
    pub fail: bool,
    signed: AtomicUsize,
}

impl FakeSigner {
    pub fn new(address: &str, fail: bool) -> Self {
        Self {
            address: address.to_string(),
            fail,
            signed: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PaymentSigner for FakeSigner {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn supports(&self, requirement: &PaymentRequirements) -> bool {
        requirement.scheme == "exact" && requirement.network == "polygon-amoy"
    }

    async fn sign(
        &self,
        requirement: &PaymentRequirements,
    ) -> Result<PaymentPayload, SigningError> {
        if self.fail {
            return Err(SigningError::Signer {
                reason: "device locked".to_string(),
            });
        }
        let n = self.signed.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentPayload {
            x402_version: 1,
            scheme: requirement.scheme.clone(),
            network: requirement.network.clone(),
            payload: ExactEvmPayload {
                signature: "0xfake".to_string(),
                authorization: ExactEvmAuthorization {
                    from: self.address.clone(),
                    to: requirement.pay_to.clone(),
                    value: requirement.max_amount_required.clone(),
                    valid_after: "0".to_string(),
                    valid_before: "9999999999".to_string(),
                    nonce: format!("0x{:064x}", n + 1),
                },
            },
        })
    }
}

/// Delays each wallet's request by a fixed amount before delegating.
pub struct DelayedRequester {
    pub inner: Arc<dyn ResourceRequester>,
    pub delays: Vec<Duration>,
}

#[async_trait]
impl ResourceRequester for DelayedRequester {
    async fn request(&self, wallet: &WalletIdentity) -> RequestOutcome {
        tokio::time::sleep(self.delays[wallet.index]).await;
        self.inner.request(wallet).await
    }
}

/// Routes each wallet through its own client, so one wallet's network can fail alone.
pub struct PerWalletRequester {
    pub clients: Vec<Arc<PaymentAwareClient>>,
}

#[async_trait]
impl ResourceRequester for PerWalletRequester {
    async fn request(&self, wallet: &WalletIdentity) -> RequestOutcome {
        self.clients[wallet.index]
            .request_resource(RESOURCE_URL, &headers(), wallet)
            .await
    }
}
