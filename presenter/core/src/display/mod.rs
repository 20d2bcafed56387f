//! Display Presentation Engine
//!
//! Audience-facing surface. Renders exactly one item at a time over two
//! alternating visual layers plus a shared audio channel.
//!
//! # Design Philosophy
//!
//! The engine is a synchronous state machine. Commands, element signals and
//! expired timers go in; a [`Reaction`] (events to emit, timers to schedule)
//! comes out. Nothing in the engine waits. The async [`DisplayRuntime`]
//! feeds it from the bridge, from the elements, and from a delay queue.
//!
//! Stale work is neutralized with a [`PlaybackToken`]: every `show-item`
//! bumps it, and any signal or timer carrying an older token is dropped.
//!
//! # Module Structure
//!
//! - `element`: capability interface implemented by image/video/audio elements
//! - `engine`: the state machine
//! - `headless`: simulated elements driven by a virtual clock
//! - `runtime`: async event loop around the engine

pub mod element;
pub mod engine;
pub mod headless;
pub mod runtime;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use element::{
    ElementError, ElementId, ElementSignal, LayerElements, LayerId, MediaElement, PlaybackToken,
    RenderTargets, SignalKind,
};
pub use engine::{
    DisplayEngine, EnginePhase, LayerContent, Presentation, Reaction, ScheduledTimer, TimerKind,
    TimerTask, Visible,
};
pub use headless::{HeadlessBackend, HeadlessElement, HeadlessSnapshot, PlayRejection};
pub use runtime::DisplayRuntime;

/// Default delay before a demoted layer is torn down
pub const DEFAULT_SWAP_DELAY_MS: u64 = 300;

/// Display engine configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Crossfade duration; also the delay before teardown and ended-fallback
    pub swap_delay_ms: u64,
    /// Repeat flag at start-up
    pub repeat: bool,
    /// Background image at start-up
    pub background: Option<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            swap_delay_ms: DEFAULT_SWAP_DELAY_MS,
            repeat: false,
            background: None,
        }
    }
}

impl DisplayConfig {
    /// Swap delay as a [`Duration`]
    #[must_use]
    pub fn swap_delay(&self) -> Duration {
        Duration::from_millis(self.swap_delay_ms)
    }
}

/// Display construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DisplayError {
    /// A required render target was not supplied
    #[error("Display render target missing: {0}")]
    MissingTarget(&'static str),
}
