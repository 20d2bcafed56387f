//! Relay
//!
//! The relay owns both surfaces' connections and forwards between them. It
//! is deliberately thin, but it is also the only place that:
//!
//! - resolves local paths into loadable URLs before they reach the display
//! - remembers the background image and repeat flag, so a display that
//!   (re)attaches starts in the state the operator last chose
//! - answers `get-background`
//!
//! Forwarding is best-effort in both directions; a closed side simply stops
//! receiving.

use std::sync::Arc;

use serde_json::json;

use crate::diagnostics::{DiagnosticsSink, LogEntry, LogLevel, LogSource};
use crate::events::DisplayEvent;
use crate::locator::LocatorResolver;
use crate::messages::DisplayCommand;

use super::config::BridgeConfig;
use super::in_process::{ControlEndpoint, DisplayEndpoint, InProcessBridge};
use super::traits::BridgeEndpoint;

/// State the relay keeps on behalf of the display
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelayState {
    /// Background image as chosen by the operator (unresolved)
    pub background: Option<String>,
    /// Whether repeat is enabled
    pub repeat: bool,
}

/// Forwarder between control and display
pub struct Relay {
    /// Relay side of the control connection (receives commands)
    control: DisplayEndpoint,
    /// Relay side of the display connection (receives events)
    display: ControlEndpoint,
    resolver: Arc<dyn LocatorResolver>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    state: RelayState,
}

impl Relay {
    /// Create a relay and the two surface endpoints it serves
    ///
    /// Returns:
    /// - `Relay`: spawn [`Relay::run`] on it
    /// - `ControlEndpoint`: hand to the control surface
    /// - `DisplayEndpoint`: hand to the display runtime
    #[must_use]
    pub fn new(
        config: &BridgeConfig,
        resolver: Arc<dyn LocatorResolver>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> (Self, ControlEndpoint, DisplayEndpoint) {
        let (control_end, relay_control) = InProcessBridge::link("relay", "control", config.capacity);
        let (relay_display, display_end) = InProcessBridge::link("display", "relay", config.capacity);

        let relay = Self {
            control: relay_control,
            display: relay_display,
            resolver,
            diagnostics,
            state: RelayState::default(),
        };
        (relay, control_end, display_end)
    }

    /// Seed the state replayed to the display on start
    #[must_use]
    pub fn with_state(mut self, state: RelayState) -> Self {
        self.state = state;
        self
    }

    /// Current cached state
    #[must_use]
    pub fn state(&self) -> &RelayState {
        &self.state
    }

    /// Forward until the control side goes away
    pub async fn run(mut self) {
        self.replay_state();

        let mut display_open = true;
        loop {
            tokio::select! {
                cmd = self.control.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        tracing::info!("Control surface closed, relay stopping");
                        break;
                    }
                },
                event = self.display.recv(), if display_open => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        tracing::info!("Display surface closed; commands will be dropped");
                        display_open = false;
                    }
                },
            }
        }
    }

    /// Push cached repeat and background state to the display
    pub fn replay_state(&self) {
        self.display.post(DisplayCommand::SetRepeat {
            enabled: self.state.repeat,
        });
        if let Some(background) = &self.state.background {
            self.display.post(DisplayCommand::SetBackground {
                locator: Some(self.resolver.resolve(background)),
            });
        }
    }

    /// Handle one command from the control surface
    pub fn handle_command(&mut self, cmd: DisplayCommand) {
        match cmd {
            DisplayCommand::ShowItem(Some(item)) if item.source.trim().is_empty() => {
                tracing::warn!(item = %item.id, "Ignored show-item without source");
                self.log(LogLevel::Warn, "Ignored show-item without source", json!({ "id": item.id }));
            }
            DisplayCommand::ShowItem(Some(mut item)) => {
                item.source = self.resolver.resolve(&item.source);
                item.companion_image = item
                    .companion_image
                    .as_deref()
                    .map(|c| self.resolver.resolve(c));
                let kind = item.kind;
                if self.display.is_open() {
                    self.display.post(DisplayCommand::ShowItem(Some(item)));
                    self.log(LogLevel::Info, "Forwarded item to display", json!({ "type": kind }));
                } else {
                    self.log(LogLevel::Warn, "Cannot forward item, display unavailable", json!(null));
                }
            }
            DisplayCommand::SetBackground { locator } => {
                self.state.background = locator.clone();
                let resolved = locator.as_deref().map(|l| self.resolver.resolve(l));
                self.display
                    .post(DisplayCommand::SetBackground { locator: resolved });
            }
            DisplayCommand::SetRepeat { enabled } => {
                self.state.repeat = enabled;
                self.display.post(DisplayCommand::SetRepeat { enabled });
            }
            DisplayCommand::GetBackground => {
                if let Some(background) = &self.state.background {
                    self.display.post(DisplayCommand::SetBackground {
                        locator: Some(self.resolver.resolve(background)),
                    });
                }
            }
            other => {
                tracing::debug!(channel = other.channel(), "Forwarding to display");
                self.display.post(other);
            }
        }
    }

    /// Handle one event from the display surface
    pub fn handle_event(&mut self, event: DisplayEvent) {
        match &event {
            DisplayEvent::Ended => {
                self.log(LogLevel::Info, "Display reported playback ended", json!(null));
            }
            DisplayEvent::Error { message, item } => {
                self.log(
                    LogLevel::Error,
                    "Display error forwarded to control",
                    json!({ "message": message, "item": item }),
                );
            }
            DisplayEvent::PlaybackProgress { .. } => {}
        }
        self.control.post(event);
    }

    fn log(&self, level: LogLevel, msg: &str, data: serde_json::Value) {
        self.diagnostics
            .record(LogEntry::new(level, LogSource::Relay, msg).with_data(data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ChannelSink;
    use crate::locator::FileServerResolver;
    use crate::media::{MediaItem, MediaKind};

    fn relay() -> (Relay, ControlEndpoint, DisplayEndpoint) {
        let (sink, _rx) = ChannelSink::new(16);
        Relay::new(
            &BridgeConfig::default(),
            Arc::new(FileServerResolver::new(9000)),
            Arc::new(sink),
        )
    }

    #[test]
    fn test_show_item_is_resolved() {
        let (mut relay, _control, mut display) = relay();
        let item = MediaItem::new(MediaKind::Audio, "/m/song.mp3").with_companion_image("/m/art.png");

        relay.handle_command(DisplayCommand::ShowItem(Some(item)));

        match display.try_recv() {
            Some(DisplayCommand::ShowItem(Some(forwarded))) => {
                assert!(forwarded.source.starts_with("http://127.0.0.1:9000/file/"));
                assert!(forwarded
                    .companion_image
                    .as_deref()
                    .is_some_and(|c| c.starts_with("http://127.0.0.1:9000/file/")));
            }
            other => panic!("Expected resolved show-item, got {other:?}"),
        }
    }

    #[test]
    fn test_show_item_without_source_is_ignored() {
        let (mut relay, _control, mut display) = relay();
        let mut item = MediaItem::new(MediaKind::Image, "x.png");
        item.source = String::new();

        relay.handle_command(DisplayCommand::ShowItem(Some(item)));
        assert_eq!(display.try_recv(), None);
    }

    #[test]
    fn test_show_item_null_is_forwarded() {
        let (mut relay, _control, mut display) = relay();
        relay.handle_command(DisplayCommand::ShowItem(None));
        assert_eq!(display.try_recv(), Some(DisplayCommand::ShowItem(None)));
    }

    #[test]
    fn test_get_background_answers_with_cached_value() {
        let (mut relay, _control, mut display) = relay();

        // Nothing cached yet: no answer
        relay.handle_command(DisplayCommand::GetBackground);
        assert_eq!(display.try_recv(), None);

        relay.handle_command(DisplayCommand::SetBackground {
            locator: Some("/m/bg.png".into()),
        });
        let _ = display.try_recv();
        assert_eq!(relay.state().background.as_deref(), Some("/m/bg.png"));

        relay.handle_command(DisplayCommand::GetBackground);
        assert!(matches!(
            display.try_recv(),
            Some(DisplayCommand::SetBackground { locator: Some(_) })
        ));
    }

    #[test]
    fn test_replay_state_on_attach() {
        let (relay, _control, mut display) = relay();
        let relay = relay.with_state(RelayState {
            background: Some("/m/bg.png".into()),
            repeat: true,
        });

        relay.replay_state();
        assert_eq!(
            display.try_recv(),
            Some(DisplayCommand::SetRepeat { enabled: true })
        );
        assert!(matches!(
            display.try_recv(),
            Some(DisplayCommand::SetBackground { locator: Some(_) })
        ));
    }

    #[test]
    fn test_events_forwarded_to_control() {
        let (mut relay, mut control, _display) = relay();
        relay.handle_event(DisplayEvent::Ended);
        relay.handle_event(DisplayEvent::PlaybackProgress {
            current_time: 1.0,
            duration: 2.0,
        });
        assert_eq!(control.try_recv(), Some(DisplayEvent::Ended));
        assert!(matches!(
            control.try_recv(),
            Some(DisplayEvent::PlaybackProgress { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_stops_when_control_closes() {
        let (relay, control, _display) = relay();
        let handle = tokio::spawn(relay.run());
        drop(control);
        handle.await.unwrap();
    }
}
