//! Provider-agnostic result handed to the UI layer.

use crate::envelope::ChatPayload;
use crate::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Answer used when the backend response carries none.
pub const DEFAULT_ANSWER: &str = "I couldn't generate an answer.";
pub const DEFAULT_CONFIDENCE: &str = "medium";
pub const FAILURE_CONFIDENCE: &str = "low";

/// Outcome of one chat call, identical in shape for every provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    pub answer: String,
    pub sources: Vec<Value>,
    pub confidence: String,
    pub timing: BTreeMap<String, f64>,
    pub documents_searched: u64,
    pub elapsed_ms: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl NormalizedResult {
    /// Build a successful result, filling defaults for absent fields.
    pub fn success(payload: ChatPayload, elapsed_ms: u64) -> Self {
        let timing = payload
            .timing
            .map(|t| {
                t.into_iter()
                    .filter_map(|(k, v)| v.as_f64().map(|n| (k, n)))
                    .collect()
            })
            .unwrap_or_else(|| default_timing(elapsed_ms));

        Self {
            answer: payload.answer.unwrap_or_else(|| DEFAULT_ANSWER.to_string()),
            sources: payload.sources.unwrap_or_default(),
            confidence: payload
                .confidence
                .map(|c| c.label())
                .unwrap_or_else(|| DEFAULT_CONFIDENCE.to_string()),
            timing,
            documents_searched: payload.documents_searched.unwrap_or(0),
            elapsed_ms,
            ok: true,
            error_kind: None,
        }
    }

    /// Build a failed result carrying the user-facing message as the answer.
    pub fn failure(error: &Error, elapsed_ms: u64) -> Self {
        Self {
            answer: error.user_message(),
            sources: Vec::new(),
            confidence: FAILURE_CONFIDENCE.to_string(),
            timing: default_timing(elapsed_ms),
            documents_searched: 0,
            elapsed_ms,
            ok: false,
            error_kind: Some(error.kind()),
        }
    }

    /// Elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }
}

fn default_timing(elapsed_ms: u64) -> BTreeMap<String, f64> {
    BTreeMap::from([("total".to_string(), elapsed_ms as f64 / 1000.0)])
}
