//! Transport Bridge
//!
//! Bidirectional, asynchronous, fire-and-forget message channel between the
//! control surface, the display surface and the relay that owns both.
//!
//! ```text
//!   ControlSurface ──DisplayCommand──▶ Relay ──DisplayCommand──▶ DisplayRuntime
//!        ▲                               │                            │
//!        └─────────DisplayEvent──────────┴────────DisplayEvent────────┘
//! ```
//!
//! # Guarantees
//!
//! - FIFO per direction; nothing is promised across directions
//! - No acknowledgement, no retry: a send to a torn-down receiver is dropped
//! - Sends never block the sender's event loop

pub mod config;
pub mod in_process;
pub mod relay;
pub mod traits;

pub use config::BridgeConfig;
pub use in_process::{BridgeSender, ControlEndpoint, DisplayEndpoint, Endpoint, InProcessBridge};
pub use relay::{Relay, RelayState};
pub use traits::{BridgeEndpoint, BridgeError};
