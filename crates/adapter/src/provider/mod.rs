//! Hosting provider strategies.
//!
//! Every provider accepts the same request envelope; they differ in where
//! their endpoints live and in how their responses wrap the chat payload.

mod direct;
mod serverless;

pub use direct::{Direct, Tunnel};
pub use serverless::{ServerlessCpu, ServerlessGpu};

use crate::envelope::{ChatPayload, unwrap_output};
use crate::profile::Endpoints;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Response handling for one hosting provider.
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Extract the chat payload from a decoded response envelope.
    fn unwrap_response(&self, envelope: Value) -> Result<ChatPayload> {
        ChatPayload::from_value(unwrap_output(envelope))?.into_checked()
    }
}

/// The supported hosting providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// A server reached on its own IP and port.
    #[default]
    Direct,
    /// A local server exposed through a tunnel (cloudflared, ngrok, ...).
    Tunnel,
    /// Serverless GPU workers with a synchronous run endpoint.
    ServerlessGpu,
    /// An always-on CPU web service.
    ServerlessCpu,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Direct,
        ProviderKind::Tunnel,
        ProviderKind::ServerlessGpu,
        ProviderKind::ServerlessCpu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Tunnel => "tunnel",
            Self::ServerlessGpu => "serverless-gpu",
            Self::ServerlessCpu => "serverless-cpu",
        }
    }

    /// Endpoint paths the provider's deployments expose by default.
    pub fn preset_endpoints(&self) -> Endpoints {
        let (chat, health, status) = match self {
            Self::Direct | Self::Tunnel => ("/runpod", Some("/health"), Some("/stats")),
            Self::ServerlessGpu => ("/runsync", Some("/health"), Some("/status")),
            Self::ServerlessCpu => ("/runpod", Some("/"), None),
        };
        Endpoints {
            chat: Some(chat.to_string()),
            health: health.map(str::to_string),
            status: status.map(str::to_string),
        }
    }

    /// The response strategy for this provider.
    pub fn strategy(&self) -> Box<dyn Provider> {
        match self {
            Self::Direct => Box::new(Direct),
            Self::Tunnel => Box::new(Tunnel),
            Self::ServerlessGpu => Box::new(ServerlessGpu),
            Self::ServerlessCpu => Box::new(ServerlessCpu),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                Error::Config(format!(
                    "unknown provider '{s}' (expected one of: direct, tunnel, serverless-gpu, serverless-cpu)"
                ))
            })
    }
}
