//! Wire envelopes for chat requests and responses.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Retrieval width requested from the backend. Fixed, not user-configurable.
pub const N_RESULTS: u32 = 10;

/// Outbound body: `{"input": {"question": ..., "n_results": 10}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequestEnvelope {
    pub input: ChatInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatInput {
    pub question: String,
    pub n_results: u32,
}

impl ChatRequestEnvelope {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            input: ChatInput {
                question: question.into(),
                n_results: N_RESULTS,
            },
        }
    }
}

/// Confidence as reported by a backend: a label, or a score in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Confidence {
    Label(String),
    Score(f64),
}

impl Confidence {
    /// Read a label or a score; any other JSON type yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(label) => Some(Self::Label(label)),
            Value::Number(n) => n.as_f64().map(Self::Score),
            _ => None,
        }
    }

    /// Label form; scores are bucketed into high/medium/low.
    pub fn label(&self) -> String {
        match self {
            Self::Label(label) => label.clone(),
            Self::Score(score) if *score > 0.7 => "high".to_string(),
            Self::Score(score) if *score > 0.5 => "medium".to_string(),
            Self::Score(_) => "low".to_string(),
        }
    }
}

/// The fields of interest inside a response envelope, all optional.
///
/// A field of the wrong JSON type is treated as absent so one odd field
/// never costs the answer.
#[derive(Debug, Clone, Default)]
pub struct ChatPayload {
    pub answer: Option<String>,
    pub sources: Option<Vec<Value>>,
    pub confidence: Option<Confidence>,
    pub timing: Option<Map<String, Value>>,
    pub documents_searched: Option<u64>,
    pub error: Option<Value>,
    pub status: Option<String>,
}

impl ChatPayload {
    /// Decode a payload object. Anything but a JSON object is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(Error::Decode(format!(
                    "expected a JSON object payload, got {}",
                    json_type(&other)
                )));
            }
        };

        Ok(Self {
            answer: fields.remove("answer").and_then(into_string),
            sources: match fields.remove("sources") {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            },
            confidence: fields.remove("confidence").and_then(Confidence::from_value),
            timing: match fields.remove("timing") {
                Some(Value::Object(timing)) => Some(timing),
                _ => None,
            },
            documents_searched: fields.get("documents_searched").and_then(as_count),
            error: fields.remove("error"),
            status: fields.remove("status").and_then(into_string),
        })
    }

    /// Fail if the backend reported an error inside a successful response.
    ///
    /// Handlers answer `{"error": "...", "status": "error"}` when they blow up.
    pub fn into_checked(self) -> Result<Self> {
        match &self.error {
            None | Some(Value::Null) => Ok(self),
            Some(Value::String(msg)) => Err(Error::Provider(msg.clone())),
            Some(other) => Err(Error::Provider(other.to_string())),
        }
    }
}

fn into_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

/// Non-negative integer, accepting whole-valued floats such as `10.0`.
fn as_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as u64)
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Take the payload out of an envelope: `output` when present, else the envelope.
///
/// A string `output` is treated as the answer text.
pub fn unwrap_output(mut envelope: Value) -> Value {
    match envelope.get_mut("output").map(Value::take) {
        Some(output @ Value::Object(_)) => output,
        Some(Value::String(answer)) => json!({ "answer": answer }),
        _ => envelope,
    }
}
