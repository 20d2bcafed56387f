//! Display Runtime
//!
//! Async loop hosting a [`DisplayEngine`]. Three inputs are multiplexed:
//!
//! - commands from the bridge
//! - element signals
//! - expired timers from a [`DelayQueue`]
//!
//! Pending element signals are always handled before the next command, so
//! a closing bridge never strands signals from items already shown.
//!
//! Every input runs the engine synchronously to completion before the next
//! one is taken, so the engine never sees interleaved handlers.
//!
//! Errors the engine reports upstream are also recorded in the diagnostics
//! sink under [`LogSource::Display`].

use std::sync::Arc;

use futures::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::time::delay_queue::{DelayQueue, Key};

use crate::bridge::{BridgeEndpoint, DisplayEndpoint};
use crate::diagnostics::{DiagnosticsSink, LogEntry, LogLevel, LogSource};
use crate::events::DisplayEvent;
use crate::messages::DisplayCommand;

use super::element::{ElementSignal, MediaElement};
use super::engine::{DisplayEngine, Reaction, TimerTask};

/// Event loop around a display engine
pub struct DisplayRuntime<E: MediaElement> {
    engine: DisplayEngine<E>,
    endpoint: DisplayEndpoint,
    signals: mpsc::UnboundedReceiver<ElementSignal>,
    timers: DelayQueue<TimerTask>,
    pending: Vec<(TimerTask, Key)>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl<E: MediaElement> DisplayRuntime<E> {
    /// Wire an engine to its bridge endpoint, element signals and log sink
    pub fn new(
        engine: DisplayEngine<E>,
        endpoint: DisplayEndpoint,
        signals: mpsc::UnboundedReceiver<ElementSignal>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            engine,
            endpoint,
            signals,
            timers: DelayQueue::new(),
            pending: Vec::new(),
            diagnostics,
        }
    }

    /// The hosted engine
    #[must_use]
    pub fn engine(&self) -> &DisplayEngine<E> {
        &self.engine
    }

    /// Run until the bridge closes; hands the engine back for inspection
    pub async fn run(mut self) -> DisplayEngine<E> {
        tracing::info!("Display runtime started");
        self.diagnostics
            .log(LogLevel::Info, LogSource::Display, "Display runtime started");
        let reaction = self.engine.start();
        self.apply(reaction);

        loop {
            tokio::select! {
                biased;
                Some(signal) = self.signals.recv() => {
                    let reaction = self.engine.handle_signal(signal);
                    self.apply(reaction);
                }
                cmd = self.endpoint.recv() => match cmd {
                    Some(cmd) => self.on_command(cmd),
                    None => {
                        tracing::info!("Bridge closed, display runtime stopping");
                        break;
                    }
                },
                Some(expired) = self.timers.next(), if !self.timers.is_empty() => {
                    let key = expired.key();
                    self.pending.retain(|(_, k)| *k != key);
                    let reaction = self.engine.handle_timer(expired.into_inner());
                    self.apply(reaction);
                }
            }
        }

        self.engine
    }

    fn on_command(&mut self, cmd: DisplayCommand) {
        tracing::debug!(channel = cmd.channel(), "Display command");
        let is_show = matches!(cmd, DisplayCommand::ShowItem(_));
        let before = self.engine.token();
        let reaction = self.engine.handle_command(cmd);
        if is_show || self.engine.token() != before {
            self.cancel_stale();
        }
        self.apply(reaction);
    }

    /// Drop queued timers whose token is no longer current
    fn cancel_stale(&mut self) {
        let token = self.engine.token();
        let timers = &mut self.timers;
        self.pending.retain(|(task, key)| {
            if task.token == token {
                return true;
            }
            timers.try_remove(key);
            false
        });
    }

    fn apply(&mut self, reaction: Reaction) {
        for event in reaction.events {
            if let DisplayEvent::Error { message, item } = &event {
                let data = json!({ "source": item.as_ref().map(|i| i.source.as_str()) });
                self.diagnostics.record(
                    LogEntry::new(LogLevel::Error, LogSource::Display, message).with_data(data),
                );
            }
            self.endpoint.post(event);
        }
        for timer in reaction.timers {
            let key = self.timers.insert(timer.task, timer.delay);
            self.pending.push((timer.task, key));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeConfig, InProcessBridge};
    use crate::diagnostics::{ChannelSink, TracingSink};
    use crate::display::{DisplayConfig, HeadlessBackend, LayerContent, Visible};
    use crate::events::DisplayEvent;
    use crate::media::{MediaItem, MediaKind};

    #[tokio::test]
    async fn test_runtime_shows_item_and_stops() {
        let (backend, signals) = HeadlessBackend::new();
        let engine = DisplayEngine::new(backend.render_targets(), DisplayConfig::default()).unwrap();
        let (control, display) = InProcessBridge::new_pair(&BridgeConfig::default());

        let handle = tokio::spawn(
            DisplayRuntime::new(engine, display, signals, Arc::new(TracingSink)).run(),
        );
        control.post(DisplayCommand::ShowItem(Some(MediaItem::new(
            MediaKind::Image,
            "slide.png",
        ))));
        drop(control);

        let engine = handle.await.unwrap();
        assert_eq!(
            engine.presentation().visible,
            Visible::Layer {
                layer: crate::display::LayerId::B,
                content: LayerContent::Image("slide.png".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_runtime_reports_end_of_media() {
        let (backend, signals) = HeadlessBackend::new();
        backend.set_duration("clip.mp4", 1.0);
        let engine = DisplayEngine::new(backend.render_targets(), DisplayConfig::default()).unwrap();
        let (mut control, display) = InProcessBridge::new_pair(&BridgeConfig::default());
        tokio::spawn(
            DisplayRuntime::new(engine, display, signals, Arc::new(TracingSink)).run(),
        );

        control.post(DisplayCommand::ShowItem(Some(MediaItem::new(
            MediaKind::Video,
            "clip.mp4",
        ))));

        // Metadata progress arrives once the load signals are processed
        let first = control.recv().await;
        assert!(matches!(first, Some(DisplayEvent::PlaybackProgress { .. })));

        backend.tick(1.5);
        let mut saw_ended = false;
        while let Some(event) = control.recv().await {
            if event == DisplayEvent::Ended {
                saw_ended = true;
                break;
            }
        }
        assert!(saw_ended);
    }

    #[tokio::test]
    async fn test_runtime_records_display_errors() {
        let (backend, signals) = HeadlessBackend::new();
        backend.fail_source("broken.mp4");
        let engine = DisplayEngine::new(backend.render_targets(), DisplayConfig::default()).unwrap();
        let (mut control, display) = InProcessBridge::new_pair(&BridgeConfig::default());
        let (sink, mut logs) = ChannelSink::new(16);
        let handle =
            tokio::spawn(DisplayRuntime::new(engine, display, signals, Arc::new(sink)).run());

        control.post(DisplayCommand::ShowItem(Some(MediaItem::new(
            MediaKind::Video,
            "broken.mp4",
        ))));
        while let Some(event) = control.recv().await {
            if matches!(event, DisplayEvent::Error { .. }) {
                break;
            }
        }
        drop(control);
        handle.await.unwrap();

        let mut errors = Vec::new();
        while let Ok(entry) = logs.try_recv() {
            assert_eq!(entry.source, LogSource::Display);
            if entry.level == LogLevel::Error {
                errors.push(entry);
            }
        }
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].data["source"], "broken.mp4");
    }
}
