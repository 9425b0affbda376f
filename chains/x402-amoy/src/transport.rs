//! HTTP transport seam.
//!
//! The client only needs "send this GET, give me status, headers and body".
//! Keeping that behind [`HttpTransport`] lets tests script server behaviour
//! without sockets.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Maximum length of the error-chain trace kept in a failure.
pub const TRACE_LIMIT: usize = 512;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: &str, headers: &[(String, String)]) -> Self {
        Self {
            method: reqwest::Method::GET,
            url: url.to_string(),
            headers: headers.to_vec(),
        }
    }

    /// Adds or replaces a header, case-insensitively.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Parses the body as JSON, mapping a non-JSON body to a transport failure.
    pub fn json(&self) -> Result<serde_json::Value, TransportError> {
        serde_json::from_str(&self.body).map_err(|e| TransportError::malformed_body(self.status, &e))
    }
}

/// Innermost cause of a transport failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorCause {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// A failure below the x402 protocol: connect, TLS, timeout, body read or a
/// response that is not JSON.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message}")]
pub struct TransportError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<ErrorCause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl TransportError {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            cause: None,
            trace: None,
        }
    }

    pub fn with_cause(mut self, cause: ErrorCause) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(truncate(trace.into(), TRACE_LIMIT));
        self
    }

    /// Connection refused, as reported by the OS.
    pub fn connection_refused(url: &str) -> Self {
        Self::new("ConnectError", format!("error sending request for url ({url})")).with_cause(
            ErrorCause {
                kind: Some("ConnectionRefused".to_string()),
                message: "Connection refused (os error 111)".to_string(),
                code: Some("ECONNREFUSED".to_string()),
            },
        )
    }

    pub fn malformed_body(status: u16, err: &serde_json::Error) -> Self {
        Self::new(
            "MalformedBody",
            format!("Response body (status {status}) is not valid JSON: {err}"),
        )
        .with_trace(format!("{err:?}"))
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let error_type = if err.is_timeout() {
            "TimeoutError"
        } else if err.is_connect() {
            "ConnectError"
        } else if err.is_body() {
            "BodyError"
        } else if err.is_decode() {
            "DecodeError"
        } else if err.is_redirect() {
            "RedirectError"
        } else if err.is_builder() {
            "BuilderError"
        } else if err.is_request() {
            "RequestError"
        } else {
            "TransportError"
        };

        let mut chain = vec![err.to_string()];
        let mut innermost: Option<&(dyn StdError + 'static)> = None;
        let mut io_kind: Option<io::ErrorKind> = None;
        let mut source = err.source();
        while let Some(e) = source {
            chain.push(e.to_string());
            if io_kind.is_none() {
                io_kind = e.downcast_ref::<io::Error>().map(io::Error::kind);
            }
            innermost = Some(e);
            source = e.source();
        }

        let mut out = Self::new(error_type, err.to_string()).with_trace(chain.join(" <- "));
        if let Some(cause) = innermost {
            out.cause = Some(ErrorCause {
                kind: io_kind.map(|k| format!("{k:?}")),
                message: cause.to_string(),
                code: io_kind.and_then(errno_name).map(str::to_string),
            });
        }
        out
    }
}

fn errno_name(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        io::ErrorKind::ConnectionReset => Some("ECONNRESET"),
        io::ErrorKind::ConnectionAborted => Some("ECONNABORTED"),
        io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
        io::ErrorKind::AddrNotAvailable => Some("EADDRNOTAVAIL"),
        io::ErrorKind::BrokenPipe => Some("EPIPE"),
        io::ErrorKind::NotConnected => Some("ENOTCONN"),
        _ => None,
    }
}

fn truncate(mut s: String, limit: usize) -> String {
    if s.len() > limit {
        let mut cut = limit;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
    }
    s
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// `timeout` bounds the whole request. `None` waits indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| TransportError::from_reqwest(&e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
