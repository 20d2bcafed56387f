//! Bridge Traits
//!
//! The seam both surfaces are written against. A surface only needs to post
//! outbound messages and await inbound ones; whether the other side lives in
//! the same process or behind a relay is invisible to it.

use async_trait::async_trait;
use thiserror::Error;

/// Errors a bridge send can report
///
/// Only [`BridgeEndpoint::try_post`] surfaces these; the fire-and-forget
/// [`BridgeEndpoint::post`] logs and swallows them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The receiving side has been torn down
    #[error("Bridge closed: {0} receiver is gone")]
    Closed(&'static str),

    /// The receiving side is not draining fast enough
    #[error("Bridge full: {0} receiver is backlogged")]
    Full(&'static str),
}

/// One end of a bridge connection
#[async_trait]
pub trait BridgeEndpoint: Send {
    /// Messages this end receives
    type Inbound: Send;
    /// Messages this end sends
    type Outbound: Send;

    /// Send without waiting; failures are logged and dropped
    fn post(&self, msg: Self::Outbound);

    /// Send without waiting, reporting failure to the caller
    fn try_post(&self, msg: Self::Outbound) -> Result<(), BridgeError>;

    /// Wait for the next inbound message (`None` once the peer is gone)
    async fn recv(&mut self) -> Option<Self::Inbound>;

    /// Take an inbound message if one is queued
    fn try_recv(&mut self) -> Option<Self::Inbound>;

    /// Whether the peer's receiver still exists
    fn is_open(&self) -> bool;
}
