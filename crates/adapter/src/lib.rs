//! Chat backend adapter.
//!
//! Turns a user message and a [`BackendProfile`] into a provider-agnostic
//! [`NormalizedResult`], whatever hosting provider sits behind the profile.
//!
//! # Overview
//!
//! - **BackendProfile**: connection parameters for one deployment target.
//! - **Provider**: how a hosting provider wraps its responses.
//! - **MessageSender**: the send capability; [`BackendAdapter`] implements it
//!   on top of a [`Transport`].
//!
//! # Example
//!
//! ```ignore
//! use adapter::{BackendAdapter, BackendProfile, MessageSender, ProviderKind};
//!
//! # async fn example() -> adapter::Result<()> {
//! let profile = BackendProfile::builder(ProviderKind::ServerlessGpu, "https://api.runpod.ai/v2/abc123")
//!     .preset_endpoints()
//!     .api_key("rp_...")
//!     .build()?;
//! let adapter = BackendAdapter::from_profile(profile);
//!
//! if let Some(result) = adapter.send("What programs are offered?").await {
//!     println!("{}", result.answer);
//! }
//! # Ok(())
//! # }
//! ```

pub mod envelope;
mod error;
mod health;
pub mod profile;
pub mod provider;
mod result;
mod sender;
pub mod transport;

pub use error::{Error, ErrorKind, Result};
pub use health::HealthReport;
pub use profile::{BackendProfile, BackendProfileBuilder, Endpoints};
pub use provider::{Provider, ProviderKind};
pub use result::NormalizedResult;
pub use sender::{BackendAdapter, MessageSender, RESPONSE_TIME_TARGET};
pub use transport::{HttpTransport, Transport};
