//! Remote negotiation session seam
//!
//! The negotiation engine is consumed by a remote-imaging transport layer
//! that lives outside this crate. This module defines the interfaces that
//! layer needs and nothing more:
//!
//! 1. **[`CapabilitySource`]** - how a server's capability description is
//!    obtained. Implemented by the transport (RMI-style proxy, socket
//!    client, test fixture); this crate never dials anything itself.
//!
//! 2. **[`RetryPolicy`]** - backoff applied to *transport* failures while
//!    fetching that description. A failed negotiation is never retried:
//!    once both descriptions are in hand the engine is pure, so re-running
//!    it cannot change the outcome.
//!
//! 3. **[`NegotiationSession`]** - ties a source, a retry policy, the local
//!    client capabilities and optional user preferences together and
//!    answers negotiation queries. Results are computed per call; only the
//!    fetched server description is kept.

mod retry;
mod session;

use async_trait::async_trait;

use crate::capabilities::CapabilitySet;
use crate::Result;

pub use retry::RetryPolicy;
pub use session::NegotiationSession;

/// Supplies the capability description of a remote peer.
///
/// Implementations should map their transport failures to
/// [`Error::Transport`](crate::Error::Transport) — that is the only error
/// class the session's retry loop will retry.
#[async_trait]
pub trait CapabilitySource: Send + Sync {
    /// Fetch the peer's capability description.
    async fn fetch(&self) -> Result<CapabilitySet>;
}
