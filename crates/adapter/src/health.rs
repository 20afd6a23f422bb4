//! Health and status probes.

use crate::transport::{Method, OutboundRequest, Transport, execute_bounded};
use crate::{BackendAdapter, Error, ErrorKind, Result};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

/// Outcome of a health probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub ok: bool,
    /// The body's `status` field, the HTTP reason, or the failure message.
    pub status: String,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl<T: Transport> BackendAdapter<T> {
    /// Probe the health endpoint. Never fails; problems are reported in the report.
    pub async fn health(&self) -> HealthReport {
        let t0 = Instant::now();
        let outcome = match self.profile.health_url() {
            Some(url) => self.get_json(url).await,
            None => Err(Error::Config("no health endpoint configured".into())),
        };
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        match outcome {
            Ok((status_text, body)) => {
                let status = body
                    .get("status")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or(status_text);
                debug!(elapsed_ms, %status, "health probe succeeded");
                HealthReport {
                    ok: true,
                    status,
                    elapsed_ms,
                    error_kind: None,
                    detail: Some(body),
                }
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms, "health probe failed");
                HealthReport {
                    ok: false,
                    status: e.to_string(),
                    elapsed_ms,
                    error_kind: Some(e.kind()),
                    detail: None,
                }
            }
        }
    }

    /// Fetch the status endpoint, optionally for one job id.
    pub async fn status(&self, job_id: Option<&str>) -> Result<Value> {
        let url = self
            .profile
            .status_url()
            .ok_or_else(|| Error::Config("no status endpoint configured".into()))?;
        let url = match job_id {
            Some(id) => format!("{}/{}", url.trim_end_matches('/'), id),
            None => url,
        };
        let (_, body) = self.get_json(url).await?;
        Ok(body)
    }

    async fn get_json(&self, url: String) -> Result<(String, Value)> {
        let request = OutboundRequest {
            method: Method::Get,
            url,
            headers: self.profile.request_headers(),
            body: None,
            timeout: self.profile.timeout(),
        };
        let response = execute_bounded(&self.transport, request)
            .await?
            .error_for_status()?;
        let body = if response.body.trim().is_empty() {
            Value::Null
        } else {
            response.json()?
        };
        Ok((response.status_text, body))
    }
}
