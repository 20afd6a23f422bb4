//! Transport abstraction.
//!
//! Adapters build [`OutboundRequest`]s and hand them to a [`Transport`]. The
//! production transport is [`HttpTransport`] (reqwest); tests substitute
//! in-memory fakes.

mod http;

pub use http::HttpTransport;

use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// A single request to send.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

/// Status line and raw body of a response.
#[derive(Debug, Clone)]
pub struct InboundResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl InboundResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail with [`Error::Http`] unless the status is 2xx.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Http {
                status: self.status,
                status_text: self.status_text,
            })
        }
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.body).map_err(|e| Error::Decode(e.to_string()))
    }
}

/// Something that can carry a request to a backend and bring back the response.
pub trait Transport: Send + Sync {
    /// Send the request. Implementations report transport failures as
    /// [`Error::Network`] or [`Error::Timeout`]; non-2xx statuses are not errors here.
    fn execute(&self, request: OutboundRequest)
    -> impl Future<Output = Result<InboundResponse>> + Send;
}

/// Execute a request, giving up once its timeout elapses.
pub async fn execute_bounded<T: Transport>(
    transport: &T,
    request: OutboundRequest,
) -> Result<InboundResponse> {
    let timeout = request.timeout;
    match tokio::time::timeout(timeout, transport.execute(request)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(timeout)),
    }
}
