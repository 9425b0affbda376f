//! x402 v1 wire protocol: message types, header codec and the payment signer.
//!
//! The flow consumed by [`PaymentAwareClient`](crate::client::PaymentAwareClient):
//!
//! 1. `GET` the resource; the server answers `402` with a [`PaymentRequiredBody`].
//! 2. A [`PaymentSigner`] turns one [`PaymentRequirements`] into a [`PaymentPayload`].
//! 3. The payload is resent base64-encoded in the `X-PAYMENT` header.
//! 4. The server serves the resource and returns a [`SettlementResponse`] in
//!    `X-PAYMENT-RESPONSE`.

pub mod codec;
pub mod signer;
pub mod types;

pub use codec::{decode_payment_response, encode_payment_header};
pub use signer::{EvmExactSigner, PaymentSigner, network_chain_id};
pub use types::{
    ExactEvmAuthorization, ExactEvmPayload, PaymentPayload, PaymentRequiredBody,
    PaymentRequirements, ResponseBody, SettlementResponse,
};
