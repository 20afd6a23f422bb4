//! Serverless hosts.

use super::{Provider, ProviderKind};
use crate::envelope::{ChatPayload, unwrap_output};
use crate::{Error, Result};
use serde_json::Value;

/// Serverless GPU workers behind a `/runsync` job API.
///
/// Responses carry a job `status` next to the `output`. A synchronous run
/// that outlives the provider's own wait window comes back still queued or
/// in progress, which is what a cold start looks like from here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerlessGpu;

impl Provider for ServerlessGpu {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ServerlessGpu
    }

    fn unwrap_response(&self, envelope: Value) -> Result<ChatPayload> {
        let status = envelope
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_ascii_uppercase);

        match status.as_deref() {
            Some(s @ ("IN_QUEUE" | "IN_PROGRESS" | "TIMED_OUT")) => {
                return Err(Error::Pending(s.to_string()));
            }
            Some(s @ ("FAILED" | "CANCELLED")) => {
                let detail = match envelope.get("error") {
                    Some(Value::String(msg)) => msg.clone(),
                    Some(other) if !other.is_null() => other.to_string(),
                    _ => format!("job {}", s.to_ascii_lowercase()),
                };
                return Err(Error::Provider(detail));
            }
            _ => {}
        }

        ChatPayload::from_value(unwrap_output(envelope))?.into_checked()
    }
}

/// An always-on CPU web service exposing a job-compatible route.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerlessCpu;

impl Provider for ServerlessCpu {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ServerlessCpu
    }
}
