//! Display Events
//!
//! Events sent from the display surface back to the control surface. The
//! display reports what actually happened; the staging pipeline decides how
//! to react (auto-advance on `ended`, operator banner on `error`).

use serde::{Deserialize, Serialize};

use crate::media::MediaItem;

/// Events from display surface to control surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum DisplayEvent {
    /// Current media reached its natural end (repeat disabled)
    Ended,

    /// Playback or load failure
    Error {
        /// Human-readable description
        message: String,
        /// Item that was being shown, if any
        item: Option<MediaItem>,
    },

    /// Best-effort progress tick from the active media element
    #[serde(rename_all = "camelCase")]
    PlaybackProgress {
        /// Current position in seconds
        current_time: f64,
        /// Duration in seconds (0 when unknown)
        duration: f64,
    },
}

impl DisplayEvent {
    /// Protocol channel name
    #[must_use]
    pub fn channel(&self) -> &'static str {
        match self {
            Self::Ended => "ended",
            Self::Error { .. } => "error",
            Self::PlaybackProgress { .. } => "playback-progress",
        }
    }

    /// Zeroed progress, sent when nothing timed is on air
    #[must_use]
    pub fn progress_reset() -> Self {
        Self::PlaybackProgress {
            current_time: 0.0,
            duration: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_wire_shape() {
        let event = DisplayEvent::PlaybackProgress {
            current_time: 3.0,
            duration: 120.0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["channel"], "playback-progress");
        assert_eq!(json["payload"]["currentTime"], 3.0);
        assert_eq!(json["payload"]["duration"], 120.0);
    }

    #[test]
    fn test_error_without_item() {
        let event: DisplayEvent = serde_json::from_str(
            r#"{"channel":"error","payload":{"message":"boom","item":null}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            DisplayEvent::Error {
                message: "boom".into(),
                item: None
            }
        );
        assert_eq!(event.channel(), "error");
    }

    #[test]
    fn test_progress_reset_is_zeroed() {
        assert_eq!(
            DisplayEvent::progress_reset(),
            DisplayEvent::PlaybackProgress {
                current_time: 0.0,
                duration: 0.0
            }
        );
    }
}
