//! Self-hosted servers, reached directly or through a tunnel.

use super::{Provider, ProviderKind};

/// A server reached on its own address.
#[derive(Debug, Clone, Copy, Default)]
pub struct Direct;

impl Provider for Direct {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Direct
    }
}

/// A server exposed through a tunnel. Same wire format as [`Direct`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Tunnel;

impl Provider for Tunnel {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tunnel
    }
}
