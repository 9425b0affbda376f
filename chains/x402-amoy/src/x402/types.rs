use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const X402_VERSION: u8 = 1;

/// Request header carrying the encoded [`PaymentPayload`].
pub const PAYMENT_HEADER: &str = "X-PAYMENT";
/// Response header carrying the encoded [`SettlementResponse`]. Lowercase, as stored by the transport.
pub const PAYMENT_RESPONSE_HEADER: &str = "x-payment-response";
/// Optional server diagnostics, logged only.
pub const DEBUG_INFO_HEADER: &str = "x-debug-info";

pub const EXACT_SCHEME: &str = "exact";

/// One acceptable way to pay for a resource, as listed in a 402 challenge.
///
/// Every field defaults so that a requirement missing a field still parses and
/// is simply rejected by the signer instead of hiding the whole challenge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub network: String,
    /// Atomic units of `asset`, decimal string.
    #[serde(default)]
    pub max_amount_required: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub pay_to: String,
    #[serde(default)]
    pub max_timeout_seconds: u64,
    #[serde(default)]
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl PaymentRequirements {
    /// EIP-712 domain `name` and `version` of the asset, from `extra`.
    pub fn eip712_domain_info(&self) -> Option<(String, String)> {
        let extra = self.extra.as_ref()?;
        let name = extra.get("name")?.as_str()?;
        let version = extra.get("version")?.as_str()?;
        Some((name.to_string(), version.to_string()))
    }

    pub fn max_amount(&self) -> Option<u128> {
        self.max_amount_required.parse().ok()
    }
}

/// Body of a `402 Payment Required` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredBody {
    #[serde(default)]
    pub x402_version: u8,
    pub accepts: Vec<PaymentRequirements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Signed authorization sent in the `X-PAYMENT` header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: u8,
    pub scheme: String,
    pub network: String,
    pub payload: ExactEvmPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactEvmPayload {
    pub signature: String,
    pub authorization: ExactEvmAuthorization,
}

/// EIP-3009 `transferWithAuthorization` parameters. Numbers are decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmAuthorization {
    pub from: String,
    pub to: String,
    pub value: String,
    pub valid_after: String,
    pub valid_before: String,
    pub nonce: String,
}

/// Payment confirmation decoded from `X-PAYMENT-RESPONSE`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub transaction: String,
    #[serde(default)]
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

/// A response body decoded once at the protocol boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The resource was served; `report` is the domain payload's receipt marker.
    PaidSuccess { report: Value },
    /// The server wants to be paid.
    Challenge(PaymentRequiredBody),
    /// Anything else. `error` is the body's `error` field if it has one.
    Unknown { error: Option<Value> },
}

impl ResponseBody {
    pub fn classify(body: &Value) -> Self {
        if let Some(report) = body.get("report").filter(|r| is_truthy(r)) {
            return ResponseBody::PaidSuccess {
                report: report.clone(),
            };
        }

        if body.get("accepts").is_some_and(Value::is_array) {
            if let Ok(challenge) = serde_json::from_value::<PaymentRequiredBody>(body.clone()) {
                return ResponseBody::Challenge(challenge);
            }
        }

        ResponseBody::Unknown {
            error: body.get("error").cloned(),
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            ResponseBody::PaidSuccess { .. } => "paid",
            ResponseBody::Challenge(_) => "x402",
            ResponseBody::Unknown { .. } => "unknown",
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
