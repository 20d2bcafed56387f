//! Display Commands
//!
//! Messages sent from the control surface to the display surface. These are
//! the only way the operator side can influence what the audience sees.
//!
//! # Design Philosophy
//!
//! The display is a renderer with a state machine, not a decision maker.
//! The staging pipeline decides *what* goes on air; the display decides
//! *how* to get it there without a visible pop to black.
//!
//! On the wire every command is an object `{"channel": "...", "payload": ...}`
//! where `channel` uses the kebab-case names of the protocol table
//! (`show-item`, `set-repeat`, ...).

use serde::{Deserialize, Serialize};

use crate::media::MediaItem;

/// Commands from control surface to display surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum DisplayCommand {
    /// Replace displayed content; `None` clears to idle
    ShowItem(Option<MediaItem>),

    /// Resume the active media
    Play,

    /// Pause all media elements
    Pause,

    /// Force blackout over everything
    Black,

    /// Release blackout
    Unblack,

    /// Seek the active media element
    Seek {
        /// Target time in seconds (clamped by the display)
        time: f64,
    },

    /// Toggle loop-on-end
    SetRepeat {
        /// Whether repeat is enabled
        enabled: bool,
    },

    /// Configure the fallback background image (`None` removes it)
    SetBackground {
        /// Background image locator
        locator: Option<String>,
    },

    /// Request the current background (answered with `SetBackground`)
    GetBackground,
}

impl DisplayCommand {
    /// Protocol channel name
    #[must_use]
    pub fn channel(&self) -> &'static str {
        match self {
            Self::ShowItem(_) => "show-item",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Black => "black",
            Self::Unblack => "unblack",
            Self::Seek { .. } => "seek",
            Self::SetRepeat { .. } => "set-repeat",
            Self::SetBackground { .. } => "set-background",
            Self::GetBackground => "get-background",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaId, MediaKind};

    #[test]
    fn test_channel_names_on_the_wire() {
        let json = serde_json::to_value(DisplayCommand::SetRepeat { enabled: true }).unwrap();
        assert_eq!(json["channel"], "set-repeat");
        assert_eq!(json["payload"]["enabled"], true);

        let json = serde_json::to_value(DisplayCommand::Seek { time: 12.5 }).unwrap();
        assert_eq!(json["channel"], "seek");
        assert_eq!(json["payload"]["time"], 12.5);
    }

    #[test]
    fn test_show_item_null_clears() {
        let cmd: DisplayCommand =
            serde_json::from_str(r#"{"channel":"show-item","payload":null}"#).unwrap();
        assert_eq!(cmd, DisplayCommand::ShowItem(None));
    }

    #[test]
    fn test_show_item_carries_item() {
        let item = MediaItem {
            id: MediaId::new("m1"),
            kind: MediaKind::Video,
            source: "intro.mp4".into(),
            display_name: "intro.mp4".into(),
            companion_image: None,
        };
        let cmd = DisplayCommand::ShowItem(Some(item.clone()));
        let text = serde_json::to_string(&cmd).unwrap();
        let back: DisplayCommand = serde_json::from_str(&text).unwrap();
        assert_eq!(back, DisplayCommand::ShowItem(Some(item)));
        assert_eq!(cmd.channel(), "show-item");
    }

    #[test]
    fn test_unit_channels() {
        let cmd: DisplayCommand = serde_json::from_str(r#"{"channel":"get-background"}"#).unwrap();
        assert_eq!(cmd, DisplayCommand::GetBackground);
        assert_eq!(DisplayCommand::Black.channel(), "black");
    }
}
