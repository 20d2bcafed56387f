//! Media Element Capability Interface
//!
//! The engine is written once against [`MediaElement`], not three times
//! against image/video/audio quirks. Images implement it too: `play` and
//! `seek` are meaningless for them and the engine never calls them on an
//! image element.
//!
//! Element operations that complete asynchronously (load, play, decode)
//! report back through [`ElementSignal`]s. Every signal carries the
//! [`PlaybackToken`] the element was loaded under, which lets the engine
//! drop signals from loads that have since been superseded.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Monotonically increasing token, bumped on every `show-item`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlaybackToken(u64);

impl PlaybackToken {
    /// The token following this one
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Raw counter value
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlaybackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the two alternating visual buffers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerId {
    /// Layer A
    A,
    /// Layer B
    B,
}

impl LayerId {
    /// The opposite layer
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// Identifies one concrete element owned by the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementId {
    /// Image element of a layer
    Image(LayerId),
    /// Video element of a layer
    Video(LayerId),
    /// The shared audio channel
    Audio,
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(l) => write!(f, "image{l:?}"),
            Self::Video(l) => write!(f, "video{l:?}"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

/// Synchronous element failures
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ElementError {
    /// Operation needs a loaded source
    #[error("no source loaded")]
    NoSource,

    /// Playback was refused (autoplay policy, still loading, ...)
    #[error("play rejected: {0}")]
    PlayRejected(String),

    /// Position could not be changed
    #[error("seek failed: {0}")]
    SeekFailed(String),
}

/// Capability interface shared by image, video and audio elements
pub trait MediaElement: Send {
    /// Set the source; signals for this load carry `token`
    fn load(&mut self, source: &str, token: PlaybackToken);

    /// Drop the source and reset the element
    fn release(&mut self);

    /// Start or resume playback
    fn play(&mut self) -> Result<(), ElementError>;

    /// Pause playback; no-op when already paused or empty
    fn pause(&mut self);

    /// Jump to `time` seconds
    fn seek(&mut self, time: f64) -> Result<(), ElementError>;

    /// Loop on natural end
    fn set_looping(&mut self, looping: bool);

    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Duration in seconds, once known
    fn duration(&self) -> Option<f64>;

    /// Loaded source, if any
    fn source(&self) -> Option<String>;

    /// Whether the element is paused (or empty)
    fn is_paused(&self) -> bool;
}

/// What an element reported
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalKind {
    /// Content decoded enough to be shown
    Ready,
    /// Timed media metadata (duration) available
    MetadataLoaded,
    /// Duration changed
    DurationChange,
    /// Playback position advanced
    TimeUpdate,
    /// Natural end of media
    Ended,
    /// Load or decode failure
    Error(String),
    /// An asynchronous play attempt was refused
    PlayRejected(String),
}

/// Notification from an element to the engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementSignal {
    /// Which element
    pub element: ElementId,
    /// Token of the load this signal belongs to
    pub token: PlaybackToken,
    /// What happened
    pub kind: SignalKind,
}

/// Image and video element of one layer
#[derive(Debug)]
pub struct LayerElements<E> {
    /// Still image element
    pub image: E,
    /// Video element
    pub video: E,
}

/// Elements handed to the engine at construction
///
/// Fields are optional so a misconfigured surface is caught when the engine
/// is built rather than at first use.
#[derive(Debug)]
pub struct RenderTargets<E> {
    /// Layer A elements
    pub layer_a: Option<LayerElements<E>>,
    /// Layer B elements
    pub layer_b: Option<LayerElements<E>>,
    /// Shared audio element
    pub audio: Option<E>,
}

impl<E> RenderTargets<E> {
    /// Targets with every element present
    pub fn complete(layer_a: LayerElements<E>, layer_b: LayerElements<E>, audio: E) -> Self {
        Self {
            layer_a: Some(layer_a),
            layer_b: Some(layer_b),
            audio: Some(audio),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_monotonic() {
        let t = PlaybackToken::default();
        assert!(t.next() > t);
        assert_eq!(t.next().next().as_u64(), 2);
    }

    #[test]
    fn test_layer_other() {
        assert_eq!(LayerId::A.other(), LayerId::B);
        assert_eq!(LayerId::B.other().other(), LayerId::B);
    }

    #[test]
    fn test_element_display() {
        assert_eq!(ElementId::Video(LayerId::A).to_string(), "videoA");
        assert_eq!(ElementId::Audio.to_string(), "audio");
    }
}
