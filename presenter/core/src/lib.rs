//! Presenter Core - Staging, Transport and Display for a Two-Surface Presenter
//!
//! An operator stages media on a control surface and pushes it live to an
//! audience display. This crate holds all of that logic, with no rendering
//! or windowing dependency: the display drives abstract media elements, and
//! a headless element backend lets the whole pipeline run without a screen.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐        ┌──────────────────────────────┐
//! │        CONTROL SURFACE       │        │        DISPLAY SURFACE       │
//! │  ┌────────────────────────┐  │        │  ┌────────────────────────┐  │
//! │  │    StagingPipeline     │  │        │  │     DisplayEngine      │  │
//! │  │ catalog, Next-Up,      │  │        │  │ layer A / layer B,     │  │
//! │  │ Preview, Program       │  │        │  │ audio, token, timers   │  │
//! │  └───────────┬────────────┘  │        │  └───────────▲────────────┘  │
//! │              │               │        │              │               │
//! │       ControlSurface         │        │       DisplayRuntime         │
//! └──────────────┬───────────────┘        └──────────────┬───────────────┘
//!                │  DisplayCommand (down)                │
//!                └──────────────────▶ Relay ─────────────┘
//!                   DisplayEvent (up) ◀──┘
//!                                   (resolves locators, caches
//!                                    background and repeat)
//! ```
//!
//! # Key Types
//!
//! - [`StagingPipeline`]: catalog and slots, pure state
//! - [`ControlSurface`]: pipeline bound to the bridge
//! - [`Relay`]: forwarder between the surfaces
//! - [`DisplayEngine`]: dual-layer presentation state machine
//! - [`DisplayRuntime`]: async loop hosting the engine
//! - [`DisplayCommand`] / [`DisplayEvent`]: the wire vocabulary
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use presenter_core::{
//!     config::load_config, diagnostics::TracingSink, ControlSurface, DisplayEngine,
//!     DisplayRuntime, HeadlessBackend, Relay, StagingPipeline,
//! };
//!
//! let config = load_config()?;
//! let (relay, control_end, display_end) =
//!     Relay::new(&config.bridge, config.resolver(), Arc::new(TracingSink));
//!
//! let (backend, signals) = HeadlessBackend::new();
//! let engine = DisplayEngine::new(backend.render_targets(), config.display.clone())?;
//! tokio::spawn(DisplayRuntime::new(engine, display_end, signals, Arc::new(TracingSink)).run());
//! tokio::spawn(relay.run());
//!
//! let mut control = ControlSurface::new(
//!     StagingPipeline::new(config.staging.clone()),
//!     control_end,
//!     Arc::new(TracingSink),
//! );
//! control.add_items(["/show/intro.mp4"]);
//! control.push()?;
//! ```
//!
//! # Module Overview
//!
//! - [`media`]: media items and extension classification
//! - [`messages`]: commands from control to display
//! - [`events`]: events from display to control
//! - [`staging`]: staging pipeline and control surface
//! - [`bridge`]: transport bridge and relay
//! - [`display`]: presentation engine, element interface, runtime
//! - [`locator`]: path to URL resolution
//! - [`diagnostics`]: structured log entries from all surfaces
//! - [`config`]: TOML / environment configuration

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bridge;
pub mod config;
pub mod diagnostics;
pub mod display;
pub mod events;
pub mod locator;
pub mod media;
pub mod messages;
pub mod staging;

// Re-exports for convenience
pub use bridge::{
    BridgeConfig, BridgeEndpoint, BridgeError, ControlEndpoint, DisplayEndpoint, InProcessBridge,
    Relay, RelayState,
};
pub use config::{ConfigError, ConfigOverrides, PresenterConfig};
pub use diagnostics::{DiagnosticsSink, LogEntry, LogLevel, LogSource};
pub use display::{
    DisplayConfig, DisplayEngine, DisplayError, DisplayRuntime, ElementError, HeadlessBackend,
    MediaElement, Presentation, Visible,
};
pub use events::DisplayEvent;
pub use locator::{FileServerResolver, FileUrlResolver, LocatorResolver};
pub use media::{MediaId, MediaItem, MediaKind};
pub use messages::DisplayCommand;
pub use staging::{ControlSurface, Slot, StagingConfig, StagingError, StagingPipeline};
