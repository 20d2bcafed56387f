//! Control Surface
//!
//! Operator-facing surface: a [`StagingPipeline`] wired to the control end
//! of the bridge. Operations update the pipeline and post whatever commands
//! it produced; display events flow back in through
//! [`ControlSurface::next_event`] or [`ControlSurface::pump`].

use std::sync::Arc;

use serde_json::json;

use crate::bridge::{BridgeEndpoint, ControlEndpoint};
use crate::diagnostics::{DiagnosticsSink, LogEntry, LogLevel, LogSource};
use crate::events::DisplayEvent;
use crate::media::MediaId;
use crate::messages::DisplayCommand;

use super::pipeline::{AddReport, Slot, StagingPipeline};
use super::StagingError;

/// Staging pipeline bound to a bridge endpoint
pub struct ControlSurface {
    pipeline: StagingPipeline,
    endpoint: ControlEndpoint,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl ControlSurface {
    /// Bind a pipeline to its endpoint
    pub fn new(
        pipeline: StagingPipeline,
        endpoint: ControlEndpoint,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            pipeline,
            endpoint,
            diagnostics,
        }
    }

    /// Read-only view of the staging state
    #[must_use]
    pub fn pipeline(&self) -> &StagingPipeline {
        &self.pipeline
    }

    /// Add locators to the catalog
    pub fn add_items<I, S>(&mut self, locators: I) -> AddReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let report = self.pipeline.add_items(locators);
        if report.rejected > 0 {
            self.log(
                LogLevel::Warn,
                "Some files were not recognized as media",
                json!({ "rejected": report.rejected }),
            );
        }
        report
    }

    /// See [`StagingPipeline::stage`]
    ///
    /// # Errors
    ///
    /// Unknown id.
    pub fn stage(&mut self, id: &MediaId) -> Result<(), StagingError> {
        self.pipeline.stage(id)
    }

    /// See [`StagingPipeline::preview`]
    ///
    /// # Errors
    ///
    /// Unknown id.
    pub fn preview(&mut self, id: &MediaId) -> Result<(), StagingError> {
        self.pipeline.preview(id)
    }

    /// Empty a slot
    pub fn clear_slot(&mut self, slot: Slot) {
        self.pipeline.clear_slot(slot);
    }

    /// See [`StagingPipeline::reorder`]
    ///
    /// # Errors
    ///
    /// Position out of range.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), StagingError> {
        self.pipeline.reorder(from, to)
    }

    /// Remove catalog entries
    pub fn remove_selected(&mut self, ids: &[MediaId]) -> usize {
        self.pipeline.remove_selected(ids)
    }

    /// See [`StagingPipeline::attach_companion_image`]
    ///
    /// # Errors
    ///
    /// Unknown id or non-audio item.
    pub fn attach_companion_image(
        &mut self,
        id: &MediaId,
        locator: impl Into<String>,
    ) -> Result<(), StagingError> {
        self.pipeline.attach_companion_image(id, locator)
    }

    /// Go live and send the item to the display
    ///
    /// # Errors
    ///
    /// Nothing staged.
    pub fn push(&mut self) -> Result<(), StagingError> {
        let commands = self.pipeline.push()?;
        self.dispatch(commands);
        Ok(())
    }

    /// Go live with the catalog entry after Program
    ///
    /// # Errors
    ///
    /// End of catalog.
    pub fn next(&mut self) -> Result<(), StagingError> {
        let commands = self.pipeline.next()?;
        self.dispatch(commands);
        Ok(())
    }

    /// Go live with the catalog entry before Program
    ///
    /// # Errors
    ///
    /// Start of catalog.
    pub fn previous(&mut self) -> Result<(), StagingError> {
        let commands = self.pipeline.previous()?;
        self.dispatch(commands);
        Ok(())
    }

    /// Resume playback on air
    pub fn play(&mut self) {
        match self.pipeline.play() {
            Some(cmd) => self.endpoint.post(cmd),
            None => tracing::debug!("Play ignored, nothing on air"),
        }
    }

    /// Pause playback
    pub fn pause(&mut self) {
        self.endpoint.post(self.pipeline.pause());
    }

    /// Blank the output
    pub fn black(&mut self) {
        self.endpoint.post(self.pipeline.black());
    }

    /// Lift blackout
    pub fn unblack(&mut self) {
        self.endpoint.post(self.pipeline.unblack());
    }

    /// Seek the item on air
    pub fn seek(&mut self, time: f64) {
        self.endpoint.post(self.pipeline.seek(time));
    }

    /// Toggle repeat
    pub fn set_repeat(&mut self, enabled: bool) {
        let cmd = self.pipeline.set_repeat(enabled);
        self.endpoint.post(cmd);
    }

    /// Set or clear the background
    pub fn set_background(&mut self, locator: Option<String>) {
        let cmd = self.pipeline.set_background(locator);
        self.endpoint.post(cmd);
    }

    /// Ask the relay to resend the current background to the display
    pub fn get_background(&mut self) {
        self.endpoint.post(DisplayCommand::GetBackground);
    }

    /// Absorb one display event, sending any follow-up commands
    pub fn handle_event(&mut self, event: DisplayEvent) {
        if let DisplayEvent::Error { message, .. } = &event {
            self.log(LogLevel::Error, message, json!(null));
        }
        let commands = self.pipeline.handle_display_event(event);
        self.dispatch(commands);
    }

    /// Wait for the next display event and handle it
    ///
    /// Returns `false` once the bridge is closed.
    pub async fn next_event(&mut self) -> bool {
        match self.endpoint.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Handle every event already queued, without waiting
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.endpoint.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    fn dispatch(&self, commands: Vec<DisplayCommand>) {
        for cmd in commands {
            self.endpoint.post(cmd);
        }
    }

    fn log(&self, level: LogLevel, msg: &str, data: serde_json::Value) {
        self.diagnostics
            .record(LogEntry::new(level, LogSource::Control, msg).with_data(data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeConfig, InProcessBridge};
    use crate::diagnostics::TracingSink;
    use crate::staging::StagingConfig;

    fn surface() -> (ControlSurface, crate::bridge::DisplayEndpoint) {
        let (control, display) = InProcessBridge::new_pair(&BridgeConfig::default());
        let surface = ControlSurface::new(
            StagingPipeline::new(StagingConfig::default()),
            control,
            Arc::new(TracingSink),
        );
        (surface, display)
    }

    #[test]
    fn test_push_posts_show_and_play() {
        let (mut surface, mut display) = surface();
        surface.add_items(["intro.mp4"]);
        surface.push().unwrap();

        assert!(matches!(
            display.try_recv(),
            Some(DisplayCommand::ShowItem(Some(_)))
        ));
        assert_eq!(display.try_recv(), Some(DisplayCommand::Play));
    }

    #[test]
    fn test_failed_push_posts_nothing() {
        let (mut surface, mut display) = surface();
        assert_eq!(surface.push(), Err(StagingError::NothingStaged));
        assert_eq!(display.try_recv(), None);
    }

    #[test]
    fn test_play_only_with_program() {
        let (mut surface, mut display) = surface();
        surface.play();
        assert_eq!(display.try_recv(), None);
    }

    #[test]
    fn test_pump_auto_advances() {
        let (mut surface, mut display) = surface();
        let added = surface.add_items(["a.mp4", "b.mp4"]).added;
        surface.push().unwrap();
        surface.stage(&added[1]).unwrap();
        while display.try_recv().is_some() {}

        display.post(DisplayEvent::Ended);
        assert_eq!(surface.pump(), 1);
        assert!(matches!(
            display.try_recv(),
            Some(DisplayCommand::ShowItem(Some(item))) if item.id == added[1]
        ));
    }

    #[test]
    fn test_get_background_posts_request() {
        let (mut surface, mut display) = surface();
        surface.get_background();
        assert_eq!(display.try_recv(), Some(DisplayCommand::GetBackground));
    }

    #[tokio::test]
    async fn test_next_event_returns_false_when_closed() {
        let (mut surface, display) = surface();
        drop(display);
        assert!(!surface.next_event().await);
    }
}
