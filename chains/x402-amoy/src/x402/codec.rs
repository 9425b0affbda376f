//! Header codec: both x402 headers are base64 (standard alphabet) encoded JSON.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::types::{PaymentPayload, SettlementResponse};
use crate::error::DecodeError;

pub fn encode_payment_header(payload: &PaymentPayload) -> Result<String, DecodeError> {
    let json = serde_json::to_vec(payload)?;
    Ok(STANDARD.encode(json))
}

/// Decodes an `X-PAYMENT-RESPONSE` header value.
pub fn decode_payment_response(raw: &str) -> Result<SettlementResponse, DecodeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DecodeError::Empty);
    }
    let bytes = STANDARD.decode(raw)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Inverse of [`encode_payment_header`], used by test servers and debugging tools.
pub fn decode_payment_header(raw: &str) -> Result<PaymentPayload, DecodeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DecodeError::Empty);
    }
    let bytes = STANDARD.decode(raw)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn encode_payment_response(response: &SettlementResponse) -> Result<String, DecodeError> {
    let json = serde_json::to_vec(response)?;
    Ok(STANDARD.encode(json))
}
