//! Staging Pipeline
//!
//! Operator-side state: the media catalog and the three slots content passes
//! through on its way to the audience.
//!
//! ```text
//!   catalog ──stage──▶ Next-Up ──(backfill)──▶ Preview ──push──▶ Program
//!           └─────────────preview─────────────▶
//! ```
//!
//! # Design Philosophy
//!
//! [`StagingPipeline`] is plain state plus operations that return the
//! commands to send. It knows nothing about channels; [`ControlSurface`]
//! pairs it with a bridge endpoint and feeds display events back in.
//! Program is only ever written by `push` (directly, through navigation or
//! through auto-advance).

pub mod control;
pub mod pipeline;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::{MediaId, MediaKind};

pub use control::ControlSurface;
pub use pipeline::{AddReport, PlaybackStatus, PreviewMonitor, Slot, StagingPipeline};

/// Whether the operator's preview monitor plays sound
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewAudioPolicy {
    /// Preview is silent
    Muted,
    /// Preview plays with sound
    #[default]
    Audible,
}

/// Staging behavior switches
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Push automatically when the display reports `ended`
    pub auto_advance: bool,
    /// Preview monitor audio
    pub preview_audio: PreviewAudioPolicy,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            auto_advance: true,
            preview_audio: PreviewAudioPolicy::default(),
        }
    }
}

/// Staging operation failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StagingError {
    /// Id not in the catalog
    #[error("Unknown media item: {0}")]
    UnknownItem(MediaId),

    /// Push with Preview and Next-Up both empty
    #[error("Nothing staged: Preview and Next-Up are empty")]
    NothingStaged,

    /// Catalog position out of range
    #[error("Catalog position {index} out of range (catalog has {len} items)")]
    OutOfRange {
        /// Requested position
        index: usize,
        /// Catalog length
        len: usize,
    },

    /// Companion images are for audio items only
    #[error("Cannot attach a companion image to {kind} item {id}")]
    NotAudio {
        /// Item id
        id: MediaId,
        /// Its kind
        kind: MediaKind,
    },

    /// Navigation ran off either end of the catalog
    #[error("No {0} item in the catalog")]
    EndOfCatalog(&'static str),
}
