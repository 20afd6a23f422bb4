//! Adapter error types and their classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to a chat backend.
///
/// These never cross the [`MessageSender`](crate::MessageSender) boundary:
/// every variant is folded into a failed
/// [`NormalizedResult`](crate::NormalizedResult) via [`Error::kind`] and
/// [`Error::user_message`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No response arrived within the profile timeout.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// A serverless job was still queued or running when the backend answered.
    #[error("job not finished: {0}")]
    Pending(String),

    /// Transport-level failure (connection refused, DNS, offline).
    #[error("network error reaching {url}: {message}")]
    Network { url: String, message: String },

    /// The backend answered with a non-success status code.
    #[error("HTTP {status} {status_text}")]
    Http { status: u16, status_text: String },

    /// The response body was not the JSON we expected.
    #[error("invalid backend response: {0}")]
    Decode(String),

    /// The backend reported a failure inside a successful envelope.
    #[error("backend error: {0}")]
    Provider(String),

    /// The backend profile is unusable.
    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Provider-agnostic failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Timeout,
    Network,
    Http,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Timeout => "TIMEOUT",
            Self::Network => "NETWORK",
            Self::Http => "HTTP",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl Error {
    /// Category used in the normalized result.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) | Self::Pending(_) => ErrorKind::Timeout,
            Self::Network { .. } => ErrorKind::Network,
            Self::Http { .. } => ErrorKind::Http,
            Self::Decode(_) | Self::Provider(_) | Self::Config(_) | Self::Other(_) => {
                ErrorKind::Unknown
            }
        }
    }

    /// Text shown to the end user in place of an answer.
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout(after) => format!(
                "The request timed out after {:.1}s. The backend may still be starting up \
                 (cold start can take a minute or two); please try again shortly.",
                after.as_secs_f64()
            ),
            Self::Pending(status) => format!(
                "The backend has not finished processing yet (job status: {status}). \
                 It may be warming up after a cold start; please try again shortly."
            ),
            Self::Network { url, .. } => format!(
                "Could not reach the chatbot backend. Check your network connection and \
                 that the endpoint URL is correct ({url})."
            ),
            Self::Http {
                status,
                status_text,
            } => {
                if status_text.is_empty() {
                    format!("The chatbot backend returned an error (HTTP {status}).")
                } else {
                    format!("The chatbot backend returned an error (HTTP {status} {status_text}).")
                }
            }
            other => format!("Sorry, something went wrong: {other}"),
        }
    }
}
