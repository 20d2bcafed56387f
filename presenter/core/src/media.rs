//! Media Item Model
//!
//! Value types describing one piece of presentable content. Every other
//! component consumes these; none of them carry behavior beyond
//! classification.
//!
//! A [`MediaItem`] is created when a locator is added to the catalog and is
//! immutable afterwards, with one exception: audio items may get a companion
//! image attached later (shown on the program output while the audio plays).

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Opaque unique identifier for a catalog entry
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub String);

impl MediaId {
    /// Generate a new unique media ID
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("media_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Create a media ID from an existing string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of content an item carries
///
/// `Unsupported` never comes out of [`classify`]; it exists so that an item
/// with an unknown `type` on the wire still decodes and can be rejected by the
/// display engine with a proper error instead of a deserialization failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image
    Image,
    /// Video clip (visual + embedded audio)
    Video,
    /// Audio-only track
    Audio,
    /// Anything else
    #[serde(other)]
    Unsupported,
}

impl MediaKind {
    /// Whether the content has a timeline (can play, pause, seek, end)
    #[must_use]
    pub fn is_timed(self) -> bool {
        matches!(self, Self::Video | Self::Audio)
    }

    /// Short uppercase badge for operator lists
    #[must_use]
    pub fn badge(self) -> &'static str {
        match self {
            Self::Image => "IMAGE",
            Self::Video => "VIDEO",
            Self::Audio => "AUDIO",
            Self::Unsupported => "?",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// Extensions accepted for each kind (lowercase, without the dot)
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm"];
/// Audio extensions
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a"];
/// Image extensions
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Classify a locator by its file extension
///
/// Returns `None` for unrecognized or missing extensions. Matching is
/// case-insensitive.
#[must_use]
pub fn classify(locator: &str) -> Option<MediaKind> {
    let ext = Path::new(locator)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();

    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Audio)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else {
        None
    }
}

/// Derive a display name from a locator (last path component)
///
/// Both `/` and `\` count as separators so Windows paths dropped onto a
/// non-Windows host still get a sensible name.
#[must_use]
pub fn display_name(locator: &str) -> String {
    locator
        .rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or(locator)
        .to_string()
}

/// One piece of content in the catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Unique identifier
    pub id: MediaId,
    /// Content kind
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Local path or resolved URL
    pub source: String,
    /// Human-readable name
    pub display_name: String,
    /// Still image shown while an audio item plays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion_image: Option<String>,
}

impl MediaItem {
    /// Build an item from a locator, classifying it by extension
    ///
    /// Returns `None` when the extension is not recognized.
    #[must_use]
    pub fn from_locator(locator: &str) -> Option<Self> {
        let kind = classify(locator)?;
        Some(Self::new(kind, locator))
    }

    /// Build an item of a known kind
    pub fn new(kind: MediaKind, source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            id: MediaId::generate(),
            kind,
            display_name: display_name(&source),
            source,
            companion_image: None,
        }
    }

    /// Attach a companion image (builder form)
    #[must_use]
    pub fn with_companion_image(mut self, locator: impl Into<String>) -> Self {
        self.companion_image = Some(locator.into());
        self
    }

    /// Companion image, only when it is meaningful (audio items)
    #[must_use]
    pub fn effective_companion(&self) -> Option<&str> {
        match self.kind {
            MediaKind::Audio => self.companion_image.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(classify("/shows/intro.mp4"), Some(MediaKind::Video));
        assert_eq!(classify("clip.MOV"), Some(MediaKind::Video));
        assert_eq!(classify("song.m4a"), Some(MediaKind::Audio));
        assert_eq!(classify("slide.JPEG"), Some(MediaKind::Image));
        assert_eq!(classify("notes.txt"), None);
        assert_eq!(classify("no_extension"), None);
    }

    #[test]
    fn test_display_name_handles_both_separators() {
        assert_eq!(display_name("/a/b/intro.mp4"), "intro.mp4");
        assert_eq!(display_name("C:\\media\\song.mp3"), "song.mp3");
        assert_eq!(display_name("bare.png"), "bare.png");
    }

    #[test]
    fn test_media_id_unique() {
        assert_ne!(MediaId::generate(), MediaId::generate());
    }

    #[test]
    fn test_companion_only_meaningful_for_audio() {
        let audio = MediaItem::new(MediaKind::Audio, "a.mp3").with_companion_image("c.png");
        let video = MediaItem::new(MediaKind::Video, "v.mp4").with_companion_image("c.png");
        assert_eq!(audio.effective_companion(), Some("c.png"));
        assert_eq!(video.effective_companion(), None);
    }

    #[test]
    fn test_wire_shape() {
        let item = MediaItem {
            id: MediaId::new("m1"),
            kind: MediaKind::Audio,
            source: "/x/a.mp3".into(),
            display_name: "a.mp3".into(),
            companion_image: Some("/x/c.png".into()),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "audio");
        assert_eq!(json["displayName"], "a.mp3");
        assert_eq!(json["companionImage"], "/x/c.png");
    }

    #[test]
    fn test_unknown_type_decodes_as_unsupported() {
        let json = r#"{"id":"m2","type":"hologram","source":"x","displayName":"x"}"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind, MediaKind::Unsupported);
        assert_eq!(item.companion_image, None);
    }
}
