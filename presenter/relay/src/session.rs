//! Presenter Session
//!
//! Wires every piece in one process:
//!
//! ```text
//!   stdin ─▶ ControlSurface ◀══bridge══▶ Relay ◀══bridge══▶ DisplayRuntime
//!                                                             (headless)
//! ```
//!
//! The session owns the control surface; relay, display runtime and the
//! headless clock run as tasks. Dropping the control surface closes the
//! bridge, which stops the relay and then the display.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use presenter_core::diagnostics::TracingSink;
use presenter_core::display::{HeadlessElement, Presentation};
use presenter_core::{
    ControlSurface, DisplayConfig, DisplayEngine, DisplayRuntime, HeadlessBackend, MediaId,
    MediaItem, PresenterConfig, Relay, RelayState, StagingError, StagingPipeline, Visible,
};

use crate::console::{ConsoleCommand, HELP};

/// Headless clock resolution
const CLOCK_PERIOD: Duration = Duration::from_millis(250);

/// A running control surface plus its relay and display tasks
pub struct Session {
    control: ControlSurface,
    relay: JoinHandle<()>,
    display: JoinHandle<DisplayEngine<HeadlessElement>>,
    clock: JoinHandle<()>,
}

impl Session {
    /// Spawn relay, display and clock tasks for `config`
    ///
    /// # Errors
    ///
    /// The display engine could not be built.
    pub fn start(config: &PresenterConfig) -> Result<Self> {
        let sink = Arc::new(TracingSink);
        let (relay, control_end, display_end) =
            Relay::new(&config.bridge, config.resolver(), sink.clone());

        // The relay replays background and repeat with resolved locators
        let relay = relay.with_state(RelayState {
            background: config.display.background.clone(),
            repeat: config.display.repeat,
        });
        let display_config = DisplayConfig {
            background: None,
            ..config.display.clone()
        };

        let (backend, signals) = HeadlessBackend::new();
        let engine = DisplayEngine::new(backend.render_targets(), display_config)
            .context("Failed to build display engine")?;

        let display =
            tokio::spawn(DisplayRuntime::new(engine, display_end, signals, sink.clone()).run());
        let relay = tokio::spawn(relay.run());
        let clock = backend.spawn_clock(CLOCK_PERIOD);

        let control = ControlSurface::new(
            StagingPipeline::new(config.staging.clone()),
            control_end,
            sink,
        );

        info!(
            swap_delay_ms = config.display.swap_delay_ms,
            capacity = config.bridge.capacity,
            "Session started"
        );

        Ok(Self {
            control,
            relay,
            display,
            clock,
        })
    }

    /// Add media paths to the catalog
    pub fn add_media<I, S>(&mut self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let report = self.control.add_items(paths);
        info!(
            added = report.added.len(),
            rejected = report.rejected,
            "Media added to catalog"
        );
    }

    /// Read console commands until EOF, `quit` or Ctrl-C
    ///
    /// # Errors
    ///
    /// Reading stdin failed.
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        println!("{HELP}");
        self.print_list();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read stdin")? else {
                        info!("Console closed");
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<ConsoleCommand>() {
                        Ok(ConsoleCommand::Quit) => break,
                        Ok(cmd) => self.execute(cmd),
                        Err(e) => println!("{e}"),
                    }
                }
                open = self.control.next_event() => {
                    if !open {
                        warn!("Bridge closed unexpectedly");
                        break;
                    }
                }
                _ = &mut ctrl_c => {
                    info!("Received Ctrl-C, shutting down");
                    break;
                }
            }
        }

        self.shutdown().await?;
        Ok(())
    }

    /// Run one console command against the control surface
    pub fn execute(&mut self, cmd: ConsoleCommand) {
        let result = match cmd {
            ConsoleCommand::Push => self.control.push(),
            ConsoleCommand::Stage(index) => self
                .item_at(index)
                .and_then(|id| self.control.stage(&id)),
            ConsoleCommand::Preview(index) => self
                .item_at(index)
                .and_then(|id| self.control.preview(&id)),
            ConsoleCommand::Clear(slot) => {
                self.control.clear_slot(slot);
                Ok(())
            }
            ConsoleCommand::Next => self.control.next(),
            ConsoleCommand::Previous => self.control.previous(),
            ConsoleCommand::Play => {
                self.control.play();
                Ok(())
            }
            ConsoleCommand::Pause => {
                self.control.pause();
                Ok(())
            }
            ConsoleCommand::Black => {
                self.control.black();
                Ok(())
            }
            ConsoleCommand::Unblack => {
                self.control.unblack();
                Ok(())
            }
            ConsoleCommand::Seek(time) => {
                self.control.seek(time);
                Ok(())
            }
            ConsoleCommand::Repeat(enabled) => {
                self.control.set_repeat(enabled);
                Ok(())
            }
            ConsoleCommand::Background(locator) => {
                self.control.set_background(locator);
                Ok(())
            }
            ConsoleCommand::RefreshBackground => {
                self.control.get_background();
                Ok(())
            }
            ConsoleCommand::List => {
                self.print_list();
                Ok(())
            }
            ConsoleCommand::Help => {
                println!("{HELP}");
                Ok(())
            }
            ConsoleCommand::Quit => Ok(()),
        };

        if let Err(e) = result {
            warn!(error = %e, "Command rejected");
            println!("{e}");
        }
    }

    /// The staging state, for inspection
    #[must_use]
    pub fn control(&self) -> &ControlSurface {
        &self.control
    }

    /// Close the bridge and wait for every task
    ///
    /// # Errors
    ///
    /// A task panicked.
    pub async fn shutdown(self) -> Result<Presentation> {
        drop(self.control);
        self.relay.await.context("Relay task failed")?;
        let engine = self.display.await.context("Display task failed")?;
        self.clock.abort();

        let presentation = engine.presentation();
        info!(
            phase = ?presentation.phase,
            blanked = matches!(presentation.visible, Visible::Blackout),
            "Session stopped"
        );
        Ok(presentation)
    }

    fn item_at(&self, index: usize) -> Result<MediaId, StagingError> {
        let catalog = self.control.pipeline().catalog();
        catalog
            .get(index)
            .map(|item| item.id.clone())
            .ok_or(StagingError::OutOfRange {
                index,
                len: catalog.len(),
            })
    }

    fn print_list(&self) {
        let pipeline = self.control().pipeline();
        let marks = |id: &MediaId| {
            let is = |slot: Option<&MediaItem>| slot.is_some_and(|i| &i.id == id);
            format!(
                "{}{}{}",
                if is(pipeline.program()) { 'P' } else { ' ' },
                if is(pipeline.preview_item()) { 'V' } else { ' ' },
                if is(pipeline.next_up()) { 'N' } else { ' ' },
            )
        };

        if pipeline.catalog().is_empty() {
            println!("catalog is empty");
        }
        for (n, item) in pipeline.catalog().iter().enumerate() {
            println!(
                "{:>3} {} {:<5} {}",
                n + 1,
                marks(&item.id),
                item.kind.badge(),
                item.display_name
            );
        }

        let status = pipeline.status();
        println!(
            "repeat {} | {:.1}/{:.1}s | ended {}",
            if pipeline.repeat() { "on" } else { "off" },
            status.current_time,
            status.duration,
            status.ended_count
        );
        if let Some(ref error) = status.last_error {
            println!("last error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presenter_core::display::LayerContent;

    #[tokio::test]
    async fn test_console_commands_reach_display() {
        let mut session = Session::start(&PresenterConfig::default()).unwrap();
        session.add_media(["/show/one.png", "/show/two.png"]);

        session.execute(ConsoleCommand::Push);
        session.execute(ConsoleCommand::Stage(1));
        session.execute(ConsoleCommand::Push);
        assert_eq!(
            session.control().pipeline().program().map(|i| i.display_name.as_str()),
            Some("two.png")
        );

        let presentation = session.shutdown().await.unwrap();
        assert!(matches!(
            presentation.visible,
            Visible::Layer {
                content: LayerContent::Image(ref src),
                ..
            } if src.ends_with("two.png")
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_position_is_rejected() {
        let mut session = Session::start(&PresenterConfig::default()).unwrap();
        session.add_media(["/show/one.png"]);
        session.execute(ConsoleCommand::Stage(4));
        assert_eq!(
            session.control().pipeline().next_up().map(|i| i.display_name.as_str()),
            Some("one.png")
        );
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_configured_background_is_replayed() {
        let mut config = PresenterConfig::default();
        config.display.background = Some("/show/bg.png".into());
        let session = Session::start(&config).unwrap();

        let presentation = session.shutdown().await.unwrap();
        assert!(matches!(
            presentation.visible,
            Visible::Layer {
                content: LayerContent::Background(ref src),
                ..
            } if src.ends_with("bg.png")
        ));
    }
}
