//! In-Process Bridge
//!
//! Channel-based bridge for surfaces living in the same process. Each
//! direction is a bounded tokio channel, which gives FIFO ordering per
//! direction for free.
//!
//! # Usage
//!
//! ```ignore
//! let (control, display) = InProcessBridge::new_pair(&BridgeConfig::default());
//!
//! control.post(DisplayCommand::Play);
//! let cmd = display.recv().await;
//! ```

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::events::DisplayEvent;
use crate::messages::DisplayCommand;

use super::config::BridgeConfig;
use super::traits::{BridgeEndpoint, BridgeError};

/// Sending half of one bridge direction
pub struct BridgeSender<M> {
    tx: mpsc::Sender<M>,
    peer: &'static str,
}

impl<M> Clone for BridgeSender<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            peer: self.peer,
        }
    }
}

impl<M> fmt::Debug for BridgeSender<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeSender")
            .field("peer", &self.peer)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<M: Send> BridgeSender<M> {
    /// Try to enqueue a message for the peer
    pub fn try_post(&self, msg: M) -> Result<(), BridgeError> {
        self.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => BridgeError::Full(self.peer),
            TrySendError::Closed(_) => BridgeError::Closed(self.peer),
        })
    }

    /// Enqueue a message, dropping it if the peer is gone or backlogged
    pub fn post(&self, msg: M) {
        match self.try_post(msg) {
            Ok(()) => {}
            // A torn-down receiver is expected (window closed); stay quiet.
            Err(BridgeError::Closed(peer)) => {
                tracing::trace!(peer = peer, "Dropped message for closed peer");
            }
            Err(e @ BridgeError::Full(_)) => {
                tracing::warn!(error = %e, "Dropped bridge message");
            }
        }
    }

    /// Whether the peer's receiver still exists
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// One end of a bridge: posts `Out`, receives `In`
pub struct Endpoint<In, Out> {
    tx: BridgeSender<Out>,
    rx: mpsc::Receiver<In>,
}

impl<In, Out> fmt::Debug for Endpoint<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").field("tx", &self.tx).finish()
    }
}

impl<In, Out> Endpoint<In, Out> {
    /// Clone of the sending half, for tasks that only post
    #[must_use]
    pub fn sender(&self) -> BridgeSender<Out> {
        self.tx.clone()
    }
}

/// Control surface end: sends commands, receives events
pub type ControlEndpoint = Endpoint<DisplayEvent, DisplayCommand>;

/// Display surface end: sends events, receives commands
pub type DisplayEndpoint = Endpoint<DisplayCommand, DisplayEvent>;

#[async_trait]
impl<In: Send, Out: Send> BridgeEndpoint for Endpoint<In, Out> {
    type Inbound = In;
    type Outbound = Out;

    fn post(&self, msg: Out) {
        self.tx.post(msg);
    }

    fn try_post(&self, msg: Out) -> Result<(), BridgeError> {
        self.tx.try_post(msg)
    }

    async fn recv(&mut self) -> Option<In> {
        self.rx.recv().await
    }

    fn try_recv(&mut self) -> Option<In> {
        self.rx.try_recv().ok()
    }

    fn is_open(&self) -> bool {
        self.tx.is_open()
    }
}

/// Factory for connected endpoint pairs
pub struct InProcessBridge;

impl InProcessBridge {
    /// Create a directly connected control/display pair
    #[must_use]
    pub fn new_pair(config: &BridgeConfig) -> (ControlEndpoint, DisplayEndpoint) {
        Self::link("display", "control", config.capacity)
    }

    /// Create a connected pair with explicit peer labels
    ///
    /// `a_peer` labels the receiver `a` posts to (used in logs and errors).
    #[must_use]
    pub fn link<A, B>(
        a_peer: &'static str,
        b_peer: &'static str,
        capacity: usize,
    ) -> (Endpoint<A, B>, Endpoint<B, A>) {
        let capacity = capacity.max(1);
        let (a_to_b_tx, a_to_b_rx) = mpsc::channel(capacity);
        let (b_to_a_tx, b_to_a_rx) = mpsc::channel(capacity);

        let a = Endpoint {
            tx: BridgeSender {
                tx: a_to_b_tx,
                peer: a_peer,
            },
            rx: b_to_a_rx,
        };
        let b = Endpoint {
            tx: BridgeSender {
                tx: b_to_a_tx,
                peer: b_peer,
            },
            rx: a_to_b_rx,
        };
        (a, b)
    }
}
